//! Application state holding the wgpu graphics context
//!
//! Owns the render surface, the camera session, the effect layer stack and
//! the settings UI. Everything runs on the main thread's per-frame callback;
//! the only background work is the camera capture thread and the deferred
//! camera-permission continuation.

use std::sync::Arc;
use std::time::Instant;

use bytemuck::{Pod, Zeroable};
use crossbeam_channel::Receiver;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::camera::{
    self, CameraCapture, CameraSession, OpenRequest, PermissionState, SwapOutcome,
};
use crate::effects::{
    apply_profile, EffectParam, EffectProfile, FlickerTimer, FloaterField, LayerStack,
};
use crate::prefs::AppPreferences;
use crate::ui::{ControlId, SettingsPanel};

/// Uniform block for the present pass.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct DisplayParams {
    rotation: f32,
    _pad: [f32; 3],
}

const OUTPUT_WIDTH: u32 = 1280;
const OUTPUT_HEIGHT: u32 = 720;
const FLOATER_COUNT: usize = 6;

/// Main application state
pub struct App {
    /// Reference to the window
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,

    // Camera session
    session: CameraSession,
    capture: Option<CameraCapture>,
    camera_texture: Option<wgpu::Texture>,
    snow_bind_group: Option<wgpu::BindGroup>,
    last_camera_frame: u64,
    permission: PermissionState,
    permission_rx: Option<Receiver<bool>>,
    /// Start was pressed while the permission dialog was still up; resume
    /// the open sequence when it resolves.
    pending_start: bool,

    // Effects
    layers: LayerStack,
    profile: EffectProfile,
    flicker: FlickerTimer,
    floaters: FloaterField,
    prefs: AppPreferences,

    // Settings UI
    panel: SettingsPanel,

    // Snow pass
    snow_pipeline: wgpu::RenderPipeline,
    snow_bind_group_layout: wgpu::BindGroupLayout,
    snow_params_buffer: wgpu::Buffer,
    /// Bind group over the black fallback texture, used before the camera
    /// delivers its first frame so the grain still shows.
    fallback_bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,

    // Present pass
    output_texture_view: wgpu::TextureView,
    display_pipeline: wgpu::RenderPipeline,
    display_bind_group: wgpu::BindGroup,
    display_params_buffer: wgpu::Buffer,

    // egui integration
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,

    // Frame timing
    start_time: Instant,
    last_frame_time: Instant,
}

impl App {
    /// Create a new App instance with initialized wgpu context
    pub async fn new(window: Arc<Window>) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .expect("Failed to create surface");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("Failed to find suitable GPU adapter");

        log::info!("Using GPU: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Snowcam Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .expect("Failed to create device");

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &config);

        // Intermediate output: the snow pass renders here, the present pass
        // draws it to the window with rotation correction.
        let output_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Output Texture"),
            size: wgpu::Extent3d {
                width: OUTPUT_WIDTH,
                height: OUTPUT_HEIGHT,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Bgra8UnormSrgb,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let output_texture_view =
            output_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        // Snow pass: camera texture + sampler + effect params.
        let snow_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Snow Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/snow.wgsl").into()),
        });

        let snow_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Snow Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let snow_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Snow Pipeline Layout"),
                bind_group_layouts: &[&snow_bind_group_layout],
                push_constant_ranges: &[],
            });

        let snow_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Snow Pipeline"),
            layout: Some(&snow_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &snow_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &snow_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: wgpu::TextureFormat::Bgra8UnormSrgb,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let snow_params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Snow Params Buffer"),
            size: std::mem::size_of::<crate::effects::SnowParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Black fallback texture for before the first camera frame.
        let fallback_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Fallback Texture"),
            size: wgpu::Extent3d {
                width: 4,
                height: 4,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let black_pixels = vec![0u8; 4 * 4 * 4];
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &fallback_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &black_pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * 4),
                rows_per_image: Some(4),
            },
            wgpu::Extent3d {
                width: 4,
                height: 4,
                depth_or_array_layers: 1,
            },
        );
        let fallback_view = fallback_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let fallback_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Fallback Bind Group"),
            layout: &snow_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&fallback_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: snow_params_buffer.as_entire_binding(),
                },
            ],
        });

        // Present pass: output texture to window with rotation correction.
        let display_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Display Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/display.wgsl").into()),
        });

        let display_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Display Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let display_params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Display Params Buffer"),
            size: std::mem::size_of::<DisplayParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let display_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Display Pipeline Layout"),
                bind_group_layouts: &[&display_bind_group_layout],
                push_constant_ranges: &[],
            });

        let display_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Display Pipeline"),
            layout: Some(&display_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &display_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &display_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let display_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Display Bind Group"),
            layout: &display_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&output_texture_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: display_params_buffer.as_entire_binding(),
                },
            ],
        });

        // egui
        let egui_ctx = egui::Context::default();
        let mut style = (*egui_ctx.style()).clone();
        style.visuals.window_shadow = egui::epaint::Shadow::NONE;
        egui_ctx.set_style(style);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        // Load the saved profile (or defaults) and push it through the
        // parameter bridge.
        let prefs = AppPreferences::load();
        let profile = prefs.profile.clone().unwrap_or_default().clamped();
        let mut layers = LayerStack::full();
        apply_profile(&mut layers, &profile);

        let session = CameraSession::with_device_index(prefs.camera_index);

        let now = Instant::now();

        Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            session,
            capture: None,
            camera_texture: None,
            snow_bind_group: None,
            last_camera_frame: 0,
            permission: PermissionState::Unknown,
            permission_rx: None,
            pending_start: false,
            layers,
            profile,
            flicker: FlickerTimer::new(),
            floaters: FloaterField::new(FLOATER_COUNT),
            prefs,
            panel: SettingsPanel::new(),
            snow_pipeline,
            snow_bind_group_layout,
            snow_params_buffer,
            fallback_bind_group,
            sampler,
            output_texture_view,
            display_pipeline,
            display_bind_group,
            display_params_buffer,
            egui_ctx,
            egui_state,
            egui_renderer,
            start_time: now,
            last_frame_time: now,
        }
    }

    /// Handle a window event, returning true if egui consumed it
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(&self.window, event);
        response.consumed
    }

    /// Resize the surface
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    // --- Camera session ---

    /// Start was pressed. Requests permission on first use; the open
    /// sequence resumes when the answer arrives.
    pub fn on_start_pressed(&mut self) {
        self.panel.mark_started();
        self.request_open();
    }

    /// Run an open attempt through the permission gate. Both start buttons
    /// land here; after a denial the session stays unopened, no retry.
    fn request_open(&mut self) {
        match self.permission.open_request() {
            OpenRequest::Proceed => self.open_camera(),
            OpenRequest::RequestPermission => {
                log::info!("Requesting camera permission");
                self.permission = PermissionState::Pending;
                self.permission_rx = Some(camera::request_permission());
                self.pending_start = true;
            }
            OpenRequest::Defer => {
                self.pending_start = true;
            }
            OpenRequest::Refuse => {}
        }
    }

    /// Poll the deferred permission continuation.
    fn poll_permission(&mut self) {
        let Some(rx) = &self.permission_rx else { return };
        let Ok(granted) = rx.try_recv() else { return };
        self.permission_rx = None;
        if granted {
            log::info!("Camera permission granted");
            self.permission = PermissionState::Granted;
            if self.pending_start {
                self.pending_start = false;
                self.open_camera();
            }
        } else {
            log::warn!("Camera permission denied");
            self.permission = PermissionState::Denied;
            self.pending_start = false;
        }
    }

    fn open_camera(&mut self) {
        let device_count = camera::list_cameras().len();
        let Some(index) = self.session.start(device_count) else {
            if device_count == 0 {
                log::warn!("No camera devices found");
            }
            return;
        };

        match CameraCapture::new(index as u32) {
            Ok(capture) => {
                self.session.set_rotation(capture.rotation_degrees());
                self.write_display_rotation();
                self.capture = Some(capture);
                self.last_camera_frame = 0;
            }
            Err(e) => {
                log::error!("Failed to open camera {}: {}", index, e);
                self.session.stop();
            }
        }
    }

    /// Release the capture and the display binding. The old handle is
    /// dropped before any new one is installed.
    pub fn close_camera(&mut self) {
        if !self.session.stop() {
            return;
        }
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        self.camera_texture = None;
        self.snow_bind_group = None;
        self.last_camera_frame = 0;
        self.write_display_rotation();
        log::info!("Camera session closed");
    }

    /// Toggle the session open/closed (the start/stop action).
    pub fn toggle_camera(&mut self) {
        if self.session.is_open() {
            self.close_camera();
        } else {
            self.request_open();
        }
    }

    /// Advance to the next device, reopening if a session is live.
    pub fn swap_camera(&mut self) {
        let device_count = camera::list_cameras().len();
        match self.session.swap(device_count) {
            SwapOutcome::NoDevices | SwapOutcome::IndexAdvanced(_) => {}
            SwapOutcome::Reopen(index) => {
                if let Some(mut capture) = self.capture.take() {
                    capture.stop();
                }
                self.camera_texture = None;
                self.snow_bind_group = None;
                self.last_camera_frame = 0;

                match CameraCapture::new(index as u32) {
                    Ok(capture) => {
                        self.session.set_rotation(capture.rotation_degrees());
                        self.write_display_rotation();
                        self.capture = Some(capture);
                    }
                    Err(e) => {
                        log::error!("Failed to reopen camera {}: {}", index, e);
                        self.session.stop();
                    }
                }
            }
        }
    }

    fn write_display_rotation(&self) {
        let params = DisplayParams {
            rotation: -self.session.rotation_degrees().to_radians(),
            _pad: [0.0; 3],
        };
        self.queue
            .write_buffer(&self.display_params_buffer, 0, bytemuck::bytes_of(&params));
    }

    /// Poll for a new camera frame and upload it to the GPU.
    pub fn update_camera(&mut self) {
        self.poll_permission();

        let Some(capture) = &self.capture else { return };
        let Some(frame) = capture.latest_frame() else { return };
        if frame.frame_number <= self.last_camera_frame {
            return;
        }
        self.last_camera_frame = frame.frame_number;

        let needs_new_texture = match &self.camera_texture {
            None => true,
            Some(tex) => {
                let size = tex.size();
                size.width != frame.width || size.height != frame.height
            }
        };

        if needs_new_texture {
            log::info!("Creating camera texture: {}x{}", frame.width, frame.height);

            let camera_texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Camera Texture"),
                size: wgpu::Extent3d {
                    width: frame.width,
                    height: frame.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let camera_view = camera_texture.create_view(&wgpu::TextureViewDescriptor::default());

            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Camera Snow Bind Group"),
                layout: &self.snow_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&camera_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: self.snow_params_buffer.as_entire_binding(),
                    },
                ],
            });

            self.camera_texture = Some(camera_texture);
            self.snow_bind_group = Some(bind_group);
        }

        if let Some(camera_texture) = &self.camera_texture {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: camera_texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &frame.data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(frame.width * 4),
                    rows_per_image: Some(frame.height),
                },
                wgpu::Extent3d {
                    width: frame.width,
                    height: frame.height,
                    depth_or_array_layers: 1,
                },
            );
        }
    }

    /// Per-frame effect update: flicker tick, floater drift, uniform upload.
    pub fn update_effects(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;

        let elapsed = now.duration_since(self.start_time).as_secs_f64();

        let displayed_grain = self.flicker.tick(
            elapsed,
            self.profile.flicker_rate as f64,
            self.layers.grain_intensity(),
        );
        self.floaters.update(elapsed as f32, dt);

        let params = self
            .layers
            .snow_params(elapsed as f32, displayed_grain, &self.floaters);
        self.queue
            .write_buffer(&self.snow_params_buffer, 0, bytemuck::bytes_of(&params));
    }

    /// Render a frame
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // Snow pass: camera (or black fallback) through the effect stack
        // into the output texture.
        {
            let bind_group = self
                .snow_bind_group
                .as_ref()
                .unwrap_or(&self.fallback_bind_group);

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Snow Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.output_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(&self.snow_pipeline);
            render_pass.set_bind_group(0, bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        // Present pass with rotation correction.
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Present Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(&self.display_pipeline);
            render_pass.set_bind_group(0, &self.display_bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        self.render_ui(&mut encoder, &view);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn render_ui(&mut self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let raw_input = self.egui_state.take_egui_input(&self.window);

        // Copy UI state so the closure doesn't borrow self.
        let mut profile = self.profile.clone();
        let camera_open = self.session.is_open();
        let panel_open = self.panel.is_open();
        let start_visible = self.panel.start_button_visible();
        let entry_visible = self.panel.entry_button_visible();
        let background_visible = self.panel.background_visible();
        let opacities: Vec<(ControlId, f32, bool)> = [
            ControlId::Intensity,
            ControlId::Size,
            ControlId::Flicker,
            ControlId::Trail,
            ControlId::Halo,
            ControlId::Contrast,
            ControlId::Colored,
            ControlId::Entoptic,
        ]
        .into_iter()
        .map(|id| {
            (
                id,
                self.panel.control_opacity(id),
                self.panel.control_interactive(id),
            )
        })
        .collect();
        let control_state = |id: ControlId| {
            opacities
                .iter()
                .find(|(c, _, _)| *c == id)
                .map(|(_, o, e)| (*o, *e))
                .unwrap_or((1.0, true))
        };

        let mut start_pressed = false;
        let mut open_settings = false;
        let mut close_settings = false;
        let mut save_pressed = false;
        let mut swap_pressed = false;
        let mut stop_pressed = false;
        let mut focus_request: Option<ControlId> = None;

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            if start_visible {
                egui::Area::new(egui::Id::new("start"))
                    .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                    .show(ctx, |ui| {
                        if ui.button(egui::RichText::new("Start").size(24.0)).clicked() {
                            start_pressed = true;
                        }
                    });
            }

            if entry_visible {
                egui::Area::new(egui::Id::new("open_settings"))
                    .anchor(egui::Align2::LEFT_TOP, [12.0, 12.0])
                    .show(ctx, |ui| {
                        if ui.button("Settings").clicked() {
                            open_settings = true;
                        }
                    });
            }

            if panel_open {
                let frame = if background_visible {
                    egui::Frame::window(&ctx.style())
                } else {
                    egui::Frame::NONE
                };

                egui::Window::new("Visual Snow Settings")
                    .frame(frame)
                    .resizable(false)
                    .collapsible(false)
                    .title_bar(background_visible)
                    .show(ctx, |ui| {
                        let mut slider = |ui: &mut egui::Ui,
                                          id: ControlId,
                                          value: &mut f32,
                                          range: std::ops::RangeInclusive<f32>,
                                          label: &str| {
                            ui.scope(|ui| {
                                let (opacity, interactive) = control_state(id);
                                ui.set_opacity(opacity);
                                let response = ui.add_enabled(
                                    interactive,
                                    egui::Slider::new(value, range).text(label),
                                );
                                if response.is_pointer_button_down_on() {
                                    focus_request = Some(id);
                                }
                            });
                        };

                        slider(ui, ControlId::Intensity, &mut profile.intensity, 0.0..=1.0, "Intensity");
                        slider(ui, ControlId::Size, &mut profile.size, 0.3..=3.0, "Size");
                        slider(ui, ControlId::Flicker, &mut profile.flicker_rate, 1.0..=60.0, "Flicker (Hz)");
                        slider(ui, ControlId::Trail, &mut profile.trail_amount, 0.0..=1.0, "Trail");
                        slider(ui, ControlId::Halo, &mut profile.halo_amount, 0.0..=30.0, "Halo");
                        slider(ui, ControlId::Contrast, &mut profile.contrast, -100.0..=100.0, "Contrast");

                        ui.scope(|ui| {
                            let (opacity, interactive) = control_state(ControlId::Colored);
                            ui.set_opacity(opacity);
                            ui.add_enabled(
                                interactive,
                                egui::Checkbox::new(&mut profile.colored, "Colored grain"),
                            );
                        });
                        ui.scope(|ui| {
                            let (opacity, interactive) = control_state(ControlId::Entoptic);
                            ui.set_opacity(opacity);
                            ui.add_enabled(
                                interactive,
                                egui::Checkbox::new(
                                    &mut profile.entoptic_enabled,
                                    "Entoptic floaters",
                                ),
                            );
                        });

                        if background_visible {
                            ui.separator();
                            ui.horizontal(|ui| {
                                if ui.button("Save").clicked() {
                                    save_pressed = true;
                                }
                                if ui.button("Swap camera").clicked() {
                                    swap_pressed = true;
                                }
                                let toggle_label = if camera_open { "Stop" } else { "Start" };
                                if ui.button(toggle_label).clicked() {
                                    stop_pressed = true;
                                }
                                if ui.button("Close").clicked() {
                                    close_settings = true;
                                }
                            });
                        }
                    });
            }
        });

        // Apply UI actions.
        if profile != self.profile {
            self.apply_profile_changes(&profile);
        }
        if start_pressed {
            self.on_start_pressed();
        }
        if open_settings {
            self.panel.open();
        }
        if close_settings {
            self.panel.close();
        }
        if save_pressed {
            self.save_preferences();
        }
        if swap_pressed {
            self.swap_camera();
        }
        if stop_pressed {
            self.toggle_camera();
        }

        // Focus mode follows whether a control is held this frame; exit is
        // also forced by panel close inside SettingsPanel.
        match focus_request {
            Some(id) => self.panel.begin_focus(id),
            None => self.panel.end_focus(),
        }

        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let render_pass_static: &mut wgpu::RenderPass<'static> =
                unsafe { std::mem::transmute(&mut render_pass) };

            self.egui_renderer
                .render(render_pass_static, &paint_jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }

    /// Route edited profile values through the parameter bridge.
    fn apply_profile_changes(&mut self, edited: &EffectProfile) {
        if edited.intensity != self.profile.intensity {
            self.layers.set(EffectParam::Intensity, edited.intensity);
        }
        if edited.size != self.profile.size {
            self.layers.set(EffectParam::Size, edited.size);
        }
        if edited.trail_amount != self.profile.trail_amount {
            self.layers.set(EffectParam::Trail, edited.trail_amount);
        }
        if edited.halo_amount != self.profile.halo_amount {
            self.layers.set(EffectParam::Halo, edited.halo_amount);
        }
        if edited.contrast != self.profile.contrast {
            self.layers.set(EffectParam::Contrast, edited.contrast);
        }
        if edited.colored != self.profile.colored {
            self.layers.set_colored(edited.colored);
        }
        if edited.entoptic_enabled != self.profile.entoptic_enabled {
            self.layers.set_entoptic(edited.entoptic_enabled);
        }
        self.profile = edited.clone();
    }

    /// Persist the current profile and device selection.
    fn save_preferences(&mut self) {
        self.prefs.profile = Some(self.profile.clone());
        self.prefs.camera_index = self.session.device_index();
        if let Err(e) = self.prefs.save() {
            log::warn!("Failed to save preferences: {}", e);
        } else {
            log::info!("Preferences saved");
        }
    }
}
