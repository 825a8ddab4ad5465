//! Camera session controller
//!
//! Pure open/close/swap state over the enumerated device list. The capture
//! thread itself lives in [`super::CameraCapture`]; the app translates the
//! outcomes returned here into spawning or dropping a capture. At most one
//! session is ever open.

/// What a `swap` call requires of the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapOutcome {
    /// No devices enumerable; nothing to do.
    NoDevices,
    /// Session was closed; only the index advanced.
    IndexAdvanced(usize),
    /// Session was open: release the current capture and reopen at this
    /// index.
    Reopen(usize),
}

/// Tracks which device is selected and whether a session is open.
#[derive(Debug, Default)]
pub struct CameraSession {
    device_index: usize,
    open: bool,
    rotation_degrees: f32,
}

impl CameraSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session starting at a previously saved device index. The index is
    /// wrapped against the live device count on `start`.
    pub fn with_device_index(device_index: usize) -> Self {
        Self {
            device_index,
            ..Self::default()
        }
    }

    pub fn device_index(&self) -> usize {
        self.device_index
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Display rotation correction for the open session, in degrees.
    pub fn rotation_degrees(&self) -> f32 {
        self.rotation_degrees
    }

    /// Open a session at the current index. Returns the device index to
    /// open, or `None` when no devices exist or a session is already open.
    pub fn start(&mut self, device_count: usize) -> Option<usize> {
        if device_count == 0 || self.open {
            return None;
        }
        self.device_index %= device_count;
        self.open = true;
        Some(self.device_index)
    }

    /// Record the device-reported rotation once the capture is live.
    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation_degrees = degrees;
    }

    /// Close the session. Returns whether one was open.
    pub fn stop(&mut self) -> bool {
        let was_open = self.open;
        self.open = false;
        self.rotation_degrees = 0.0;
        was_open
    }

    /// Advance to the next device, wrapping at the device count. An open
    /// session must be released and reopened by the caller.
    pub fn swap(&mut self, device_count: usize) -> SwapOutcome {
        if device_count == 0 {
            return SwapOutcome::NoDevices;
        }
        self.device_index = (self.device_index + 1) % device_count;
        if self.open {
            SwapOutcome::Reopen(self.device_index)
        } else {
            SwapOutcome::IndexAdvanced(self.device_index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_with_no_devices_is_a_no_op() {
        let mut session = CameraSession::new();
        assert_eq!(session.start(0), None);
        assert!(!session.is_open());
    }

    #[test]
    fn start_opens_once() {
        let mut session = CameraSession::new();
        assert_eq!(session.start(2), Some(0));
        assert!(session.is_open());
        // Second start while open is a no-op.
        assert_eq!(session.start(2), None);
    }

    #[test]
    fn swap_cycles_back_after_full_round() {
        let mut session = CameraSession::new();
        let device_count = 3;
        session.start(device_count);
        let original = session.device_index();
        for _ in 0..device_count {
            session.swap(device_count);
        }
        assert_eq!(session.device_index(), original);
        assert!(session.is_open());
    }

    #[test]
    fn swap_with_no_devices_is_a_no_op() {
        let mut session = CameraSession::new();
        assert_eq!(session.swap(0), SwapOutcome::NoDevices);
        assert_eq!(session.device_index(), 0);
    }

    #[test]
    fn swap_while_open_requires_reopen() {
        let mut session = CameraSession::new();
        session.start(2);
        assert_eq!(session.swap(2), SwapOutcome::Reopen(1));
        assert!(session.is_open());
    }

    #[test]
    fn swap_while_closed_only_advances() {
        let mut session = CameraSession::new();
        assert_eq!(session.swap(2), SwapOutcome::IndexAdvanced(1));
        assert!(!session.is_open());
    }

    #[test]
    fn stop_clears_rotation() {
        let mut session = CameraSession::new();
        session.start(1);
        session.set_rotation(90.0);
        assert!(session.stop());
        assert_eq!(session.rotation_degrees(), 0.0);
        // Stopping again reports nothing was open.
        assert!(!session.stop());
    }

    #[test]
    fn start_wraps_stale_index() {
        // Device list shrank between sessions: index must wrap, not panic.
        let mut session = CameraSession::new();
        session.start(4);
        for _ in 0..3 {
            session.swap(4);
        }
        session.stop();
        assert_eq!(session.start(2), Some(1));
    }
}
