use core_graphics_types::geometry::CGSize;
use log::info;
use metal::*;
use objc::rc::autoreleasepool;
use objc::runtime::{Object, YES};
use objc::{msg_send, sel, sel_impl};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::raw_window_handle::{HasWindowHandle, RawWindowHandle};
use winit::window::{Window, WindowId};

use crate::compute::run_compute_shader;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::program::{create_compute_program, create_render_program};
use crate::shaders;
use crate::texture::{create_output_texture, create_texture, read_texture};
use crate::utils::{load_image, save_image, to_rgba};

const SURFACE_FORMAT: MTLPixelFormat = MTLPixelFormat::BGRA8Unorm;

struct Viewer {
    window: Window,
    layer: MetalLayer,
    command_queue: CommandQueue,
    output: Texture,
    // None when the preview is disabled: redraws only clear.
    present: Option<RenderPipelineState>,
}

impl Viewer {
    fn new(event_loop: &ActiveEventLoop, config: &Config) -> Result<Self> {
        let attributes = Window::default_attributes()
            .with_title(config.title.as_str())
            .with_inner_size(LogicalSize::new(config.width, config.height))
            .with_maximized(config.maximized);
        let window = event_loop.create_window(attributes)?;

        let device = Device::system_default().ok_or(Error::NoDevice)?;
        info!("using GPU {}", device.name());
        let command_queue = device.new_command_queue();
        let layer = attach_layer(&window, &device)?;

        let input = load_image(&config.input)?;
        let (width, height) = input.dimensions();
        info!("loaded {} ({width}x{height})", config.input.display());
        let input_texture = create_texture(&device, &to_rgba(&input))?;
        let output = create_output_texture(&device, width, height)?;

        let pipeline = create_compute_program(
            &device,
            "compute",
            shaders::COMPUTE_SRC,
            shaders::COMPUTE_ENTRY,
        )?;
        run_compute_shader(
            &command_queue,
            &pipeline,
            &input_texture,
            &output,
            width,
            height,
        )?;

        let result = read_texture(&device, &command_queue, &output, width, height)?;
        save_image(&result, &config.output)?;
        info!("wrote {}", config.output.display());

        let present = if config.preview {
            Some(create_render_program(
                &device,
                "present",
                (shaders::PRESENT_VERT_SRC, shaders::PRESENT_VERT_ENTRY),
                (shaders::PRESENT_FRAG_SRC, shaders::PRESENT_FRAG_ENTRY),
                SURFACE_FORMAT,
            )?)
        } else {
            None
        };

        Ok(Self {
            window,
            layer,
            command_queue,
            output,
            present,
        })
    }

    fn resize(&self, size: PhysicalSize<u32>) {
        self.layer
            .set_drawable_size(CGSize::new(size.width as f64, size.height as f64));
        self.window.request_redraw();
    }

    // Moving to a display with another backing scale.
    fn rescale(&self, scale: f64) {
        set_contents_scale(&self.layer, scale);
        self.resize(self.window.inner_size());
    }

    fn draw(&self) {
        autoreleasepool(|| {
            let Some(drawable) = self.layer.next_drawable() else {
                return;
            };

            let pass = RenderPassDescriptor::new();
            let Some(color) = pass.color_attachments().object_at(0) else {
                return;
            };
            color.set_texture(Some(drawable.texture()));
            color.set_load_action(MTLLoadAction::Clear);
            color.set_clear_color(MTLClearColor::new(0.1, 0.1, 0.1, 0.0));
            color.set_store_action(MTLStoreAction::Store);

            let command_buffer = self.command_queue.new_command_buffer();
            let encoder = command_buffer.new_render_command_encoder(pass);
            if let Some(present) = &self.present {
                encoder.set_render_pipeline_state(present);
                encoder.set_fragment_texture(0, Some(self.output.as_ref()));
                encoder.draw_primitives(MTLPrimitiveType::Triangle, 0, 3);
            }
            encoder.end_encoding();

            command_buffer.present_drawable(drawable);
            command_buffer.commit();
        });
    }
}

// Backs the window's NSView with a vsynced CAMetalLayer.
fn attach_layer(window: &Window, device: &DeviceRef) -> Result<MetalLayer> {
    let RawWindowHandle::AppKit(handle) = window.window_handle()?.as_raw() else {
        return Err(Error::NotAppKit);
    };

    let layer = MetalLayer::new();
    layer.set_device(device);
    layer.set_pixel_format(SURFACE_FORMAT);
    layer.set_presents_with_transaction(false);
    layer.set_display_sync_enabled(true);
    let size = window.inner_size();
    layer.set_drawable_size(CGSize::new(size.width as f64, size.height as f64));

    set_contents_scale(&layer, window.scale_factor());

    unsafe {
        let view = handle.ns_view.as_ptr() as *mut Object;
        let _: () = msg_send![view, setWantsLayer: YES];
        let _: () = msg_send![view, setLayer: layer_ptr(&layer)];
    }
    Ok(layer)
}

fn layer_ptr(layer: &MetalLayerRef) -> *mut Object {
    layer as *const MetalLayerRef as *mut Object
}

fn set_contents_scale(layer: &MetalLayerRef, scale: f64) {
    unsafe {
        let _: () = msg_send![layer_ptr(layer), setContentsScale: scale];
    }
}

fn contents_scale(layer: &MetalLayerRef) -> f64 {
    unsafe { msg_send![layer_ptr(layer), contentsScale] }
}

struct App {
    config: Config,
    viewer: Option<Viewer>,
    error: Option<Error>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() || self.error.is_some() {
            return;
        }
        match Viewer::new(event_loop, &self.config) {
            Ok(viewer) => self.viewer = Some(viewer),
            Err(err) => {
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(viewer) = &self.viewer else {
            return;
        };
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(size) => viewer.resize(size),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => viewer.rescale(scale_factor),
            WindowEvent::RedrawRequested => viewer.draw(),
            _ => {}
        }
    }
}

/// Opens the window, performs the conversion and idles until closed.
pub fn run(config: Config) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App {
        config,
        viewer: None,
        error: None,
    };
    event_loop.run_app(&mut app)?;

    app.error.take().map_or(Ok(()), Err)
}
