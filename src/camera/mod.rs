//! Camera capture module
//!
//! Cross-platform webcam capture via nokhwa. Frames are grabbed on a
//! background thread; the render thread polls for the latest complete frame
//! each tick. Session bookkeeping (which device, open/closed, swap order)
//! lives in [`session::CameraSession`].

pub mod session;

pub use session::{CameraSession, SwapOutcome};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use parking_lot::Mutex;

/// Camera permission, resolved asynchronously on platforms that gate access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionState {
    Unknown,
    Pending,
    Granted,
    Denied,
}

/// Next step for a session-open request under the current permission state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenRequest {
    /// Granted: open now.
    Proceed,
    /// Never asked: request permission and defer the open.
    RequestPermission,
    /// An answer is still in flight: defer the open.
    Defer,
    /// Denied: the session stays unopened, with no retry.
    Refuse,
}

impl PermissionState {
    /// Gate an open attempt. Every path that can open a session answers to
    /// this, whichever button it came from.
    pub fn open_request(self) -> OpenRequest {
        match self {
            PermissionState::Granted => OpenRequest::Proceed,
            PermissionState::Unknown => OpenRequest::RequestPermission,
            PermissionState::Pending => OpenRequest::Defer,
            PermissionState::Denied => OpenRequest::Refuse,
        }
    }
}

/// Kick off the platform permission request. The returned channel delivers
/// the user's answer; on platforms without a permission dialog it resolves
/// immediately.
pub fn request_permission() -> Receiver<bool> {
    let (tx, rx) = crossbeam_channel::bounded(1);

    #[cfg(target_os = "macos")]
    nokhwa::nokhwa_initialize(move |granted| {
        let _ = tx.send(granted);
    });

    #[cfg(not(target_os = "macos"))]
    let _ = tx.send(true);

    rx
}

/// One decoded RGBA frame from the capture thread.
#[derive(Clone)]
pub struct CameraFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub frame_number: u64,
}

/// Information about an available camera
#[derive(Clone, Debug)]
pub struct CameraInfo {
    pub index: u32,
    pub name: String,
}

/// Enumerate attached cameras. Failure to enumerate reads as "no devices";
/// camera actions then no-op.
pub fn list_cameras() -> Vec<CameraInfo> {
    match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
        Ok(camera_list) => camera_list
            .iter()
            .enumerate()
            .map(|(idx, info)| CameraInfo {
                index: idx as u32,
                name: info.human_name().to_string(),
            })
            .collect(),
        Err(e) => {
            log::warn!("Failed to enumerate cameras: {:?}", e);
            Vec::new()
        }
    }
}

/// A running capture for one device.
pub struct CameraCapture {
    latest: Arc<Mutex<Option<CameraFrame>>>,
    running: Arc<AtomicBool>,
    thread_handle: Option<std::thread::JoinHandle<()>>,
    /// Rotation the display pass must apply, in degrees. Desktop backends
    /// deliver frames already upright, so this is zero there; kept as state
    /// so the present pass has a single source for orientation.
    rotation_degrees: f32,
}

impl CameraCapture {
    /// Spawn the capture thread for `camera_index`.
    pub fn new(camera_index: u32) -> Result<Self, String> {
        let latest = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));

        let latest_clone = latest.clone();
        let running_clone = running.clone();

        let thread_handle = std::thread::Builder::new()
            .name("camera-capture".to_string())
            .spawn(move || {
                Self::capture_thread(camera_index, latest_clone, running_clone);
            })
            .map_err(|e| format!("Failed to spawn capture thread: {}", e))?;

        Ok(Self {
            latest,
            running,
            thread_handle: Some(thread_handle),
            rotation_degrees: 0.0,
        })
    }

    fn open_device(camera_index: u32) -> Result<Camera, String> {
        let index = CameraIndex::Index(camera_index);

        // Prefer the device's best resolution, fall back to letting the
        // backend pick.
        let attempts = [
            RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestResolution),
            RequestedFormat::new::<RgbAFormat>(RequestedFormatType::None),
        ];

        let mut last_err = String::new();
        for requested in attempts {
            match Camera::new(index.clone(), requested) {
                Ok(camera) => return Ok(camera),
                Err(e) => last_err = format!("{:?}", e),
            }
        }
        Err(last_err)
    }

    fn capture_thread(
        camera_index: u32,
        latest: Arc<Mutex<Option<CameraFrame>>>,
        running: Arc<AtomicBool>,
    ) {
        log::info!("Starting camera capture thread (camera {})", camera_index);

        let mut camera = match Self::open_device(camera_index) {
            Ok(c) => c,
            Err(e) => {
                log::error!("Failed to open camera {}: {}", camera_index, e);
                return;
            }
        };

        if let Err(e) = camera.open_stream() {
            log::error!("Failed to open camera stream: {:?}", e);
            return;
        }

        log::info!(
            "Camera opened: {} ({}x{})",
            camera.info().human_name(),
            camera.resolution().width(),
            camera.resolution().height()
        );

        let mut frame_number: u64 = 0;

        while running.load(Ordering::Acquire) {
            match camera.frame() {
                Ok(frame) => match frame.decode_image::<RgbAFormat>() {
                    Ok(image) => {
                        frame_number += 1;
                        let camera_frame = CameraFrame {
                            width: image.width(),
                            height: image.height(),
                            data: image.into_raw(),
                            frame_number,
                        };
                        *latest.lock() = Some(camera_frame);
                    }
                    Err(e) => {
                        log::warn!("Failed to decode frame: {:?}", e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to capture frame: {:?}", e);
                    std::thread::sleep(std::time::Duration::from_millis(10));
                }
            }
        }

        log::info!("Camera capture thread stopped");
    }

    /// Latest decoded frame, if any has arrived yet.
    pub fn latest_frame(&self) -> Option<CameraFrame> {
        self.latest.lock().clone()
    }

    pub fn rotation_degrees(&self) -> f32 {
        self.rotation_degrees
    }

    /// Stop capturing and join the thread.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_permission_refuses_every_open_attempt() {
        // Denial is final: repeated presses never proceed or re-request.
        for _ in 0..3 {
            assert_eq!(PermissionState::Denied.open_request(), OpenRequest::Refuse);
        }
    }

    #[test]
    fn open_gate_matches_permission_state() {
        assert_eq!(PermissionState::Granted.open_request(), OpenRequest::Proceed);
        assert_eq!(
            PermissionState::Unknown.open_request(),
            OpenRequest::RequestPermission
        );
        assert_eq!(PermissionState::Pending.open_request(), OpenRequest::Defer);
    }
}
