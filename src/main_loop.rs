use std::cell::RefCell;
use std::collections::HashSet;
use std::ffi::CString;
use std::num::NonZeroU32;
use std::rc::Rc;

use anyhow::Context as _;
use glutin::config::{Config, ConfigTemplateBuilder};
use glutin::context::{ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasRawWindowHandle;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use gl_resources::backend::opengl::GlBackend;
use gl_resources::{Context, ContextConfig, InputPoller, Surface};


pub trait MainLoop {
	fn present(&mut self, ctx: &mut Context) -> anyhow::Result<()>;
}


/// Creates a window with an OpenGL 4.5 core context, then drives `M` until the window closes.
pub fn run<M, F>(title: &str, config: ContextConfig, init: F) -> anyhow::Result<()>
	where M: MainLoop + 'static
		, F: FnOnce(&mut Context, InputState) -> anyhow::Result<M>
{
	let event_loop = EventLoop::new();

	let window_builder = WindowBuilder::new()
		.with_title(title)
		.with_inner_size(LogicalSize::new(1024.0, 768.0));

	let template = ConfigTemplateBuilder::new()
		.with_depth_size(24)
		.with_stencil_size(8);

	let (window, gl_config) = DisplayBuilder::new()
		.with_window_builder(Some(window_builder))
		.build(&event_loop, template, pick_config)
		.map_err(|error| anyhow::anyhow!("Failed to create window: {error}"))?;

	let window = window.context("Display builder didn't create a window")?;
	let display = gl_config.display();

	let context_attributes = ContextAttributesBuilder::new()
		.with_context_api(ContextApi::OpenGl(Some(Version::new(4, 5))))
		.with_profile(GlProfile::Core)
		.build(Some(window.raw_window_handle()));

	let not_current = unsafe { display.create_context(&gl_config, &context_attributes)? };

	let surface_attributes = window.build_surface_attributes(Default::default());
	let gl_surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes)? };
	let gl_context = not_current.make_current(&gl_surface)?;

	if let Err(error) = gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN)) {
		log::warn!("Couldn't enable vsync: {error}");
	}

	let backend = GlBackend::load(|symbol| match CString::new(symbol) {
		Ok(symbol) => display.get_proc_address(&symbol),
		Err(_) => std::ptr::null(),
	})?;

	let size = window.inner_size();

	let mut ctx = Context::new(backend, config);
	ctx.bind_surface(Box::new(GlutinSurface {
		surface: gl_surface,
		context: gl_context,
		size: (size.width, size.height),
	}))?;

	let input = InputState::default();
	let pending = Rc::new(RefCell::new(Vec::new()));
	ctx.set_input_poller(Box::new(WinitInput {
		pending: pending.clone(),
		state: input.clone(),
	}));

	let mut main_loop = init(&mut ctx, input)?;

	event_loop.run(move |event, _, control_flow| {
		*control_flow = ControlFlow::Poll;

		match event {
			Event::WindowEvent { event, .. } => match event {
				WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,

				WindowEvent::Resized(size) => {
					if let Err(error) = ctx.resize_surface(size.width, size.height) {
						log::error!("Failed to resize surface: {error}");
					}
				}

				WindowEvent::KeyboardInput { input: KeyboardInput { virtual_keycode: Some(key), state, .. }, .. } => {
					if key == VirtualKeyCode::Escape {
						*control_flow = ControlFlow::Exit;
					}

					pending.borrow_mut().push(RawInput::Key(key, state == ElementState::Pressed));
				}

				WindowEvent::CursorMoved { position, .. } => {
					pending.borrow_mut().push(RawInput::Cursor(position.x, position.y));
				}

				_ => {}
			}

			Event::MainEventsCleared => window.request_redraw(),

			Event::RedrawRequested(_) => {
				if let Err(error) = main_loop.present(&mut ctx) {
					log::error!("Frame failed: {error:?}");
					*control_flow = ControlFlow::ExitWithCode(1);
				}
			}

			_ => {}
		}
	})
}


// glutin never hands the picker an empty set.
fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
	configs
		.reduce(|best, config| if config.num_samples() > best.num_samples() { config } else { best })
		.expect("no matching GL config")
}


struct GlutinSurface {
	surface: glutin::surface::Surface<WindowSurface>,
	context: PossiblyCurrentContext,
	size: (u32, u32),
}

impl Surface for GlutinSurface {
	fn make_current(&mut self) -> anyhow::Result<()> {
		self.context.make_current(&self.surface)?;
		Ok(())
	}

	fn swap_buffers(&mut self) -> anyhow::Result<()> {
		self.surface.swap_buffers(&self.context)?;
		Ok(())
	}

	fn size(&self) -> (u32, u32) {
		self.size
	}

	fn resize(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
		// Minimised windows report a zero size.
		if let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) {
			self.surface.resize(&self.context, w, h);
			self.size = (width, height);
		}

		Ok(())
	}
}


enum RawInput {
	Key(VirtualKeyCode, bool),
	Cursor(f64, f64),
}


/// Input as of the last `start_frame`.
#[derive(Debug, Clone, Default)]
pub struct InputState(Rc<RefCell<InputFrame>>);

#[derive(Debug, Default)]
struct InputFrame {
	keys_down: HashSet<VirtualKeyCode>,
	cursor: Option<(f64, f64)>,
}

impl InputState {
	pub fn is_down(&self, key: VirtualKeyCode) -> bool {
		self.0.borrow().keys_down.contains(&key)
	}

	pub fn cursor(&self) -> Option<(f64, f64)> {
		self.0.borrow().cursor
	}
}


struct WinitInput {
	pending: Rc<RefCell<Vec<RawInput>>>,
	state: InputState,
}

impl InputPoller for WinitInput {
	fn poll(&mut self) {
		let mut frame = self.state.0.borrow_mut();

		for input in self.pending.borrow_mut().drain(..) {
			match input {
				RawInput::Key(key, true) => { frame.keys_down.insert(key); }
				RawInput::Key(key, false) => { frame.keys_down.remove(&key); }
				RawInput::Cursor(x, y) => frame.cursor = Some((x, y)),
			}
		}
	}
}
