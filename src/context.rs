mod factory;
mod binding;
mod uniforms;

use crate::backend::{Backend, ClearMask};
use crate::bind_state::BindState;
use crate::config::ContextConfig;
use crate::error::{GfxError, Result};
use crate::lighting::Lighting;
use crate::resource_manager::*;
use crate::surface::{InputPoller, Surface};


/// Owns the backend, every resource created through it, and what is currently bound.
///
/// A context is tied to the thread its native context is current on and is deliberately not
/// `Send`.
pub struct Context {
	backend: Box<dyn Backend>,
	resource_manager: ResourceManager,

	binds: BindState,
	framebuffer: Option<FramebufferHandle>,
	texture_units: u32,

	surface: Option<Box<dyn Surface>>,
	input: Option<Box<dyn InputPoller>>,

	pub(crate) lighting: Lighting,

	// Per-frame scratch for upload payloads.
	scratch: bumpalo::Bump,

	// Shader, vertex buffer and input generation the attribute pointers were last set up for.
	applied_layout: Option<(ShaderHandle, BufferHandle, u64)>,
	// Attribute slots enabled by the last applied layout, always `0..enabled_attributes`.
	enabled_attributes: u32,

	config: ContextConfig,
}

impl std::fmt::Debug for Context {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Context")
			.field("resource_manager", &self.resource_manager)
			.field("binds", &self.binds)
			.field("framebuffer", &self.framebuffer)
			.field("texture_units", &self.texture_units)
			.field("has_surface", &self.surface.is_some())
			.field("lighting", &self.lighting)
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

impl Context {
	pub fn new(backend: impl Backend + 'static, config: ContextConfig) -> Self {
		let mut backend: Box<dyn Backend> = Box::new(backend);

		let texture_units = config.texture_units(backend.max_texture_units());
		backend.clear_color(config.clear_color);

		log::debug!("created context with {texture_units} texture units");

		Context {
			backend,
			resource_manager: ResourceManager::new(),

			binds: BindState::with_texture_units(texture_units),
			framebuffer: None,
			texture_units,

			surface: None,
			input: None,

			lighting: Lighting::default(),
			scratch: bumpalo::Bump::new(),
			applied_layout: None,
			enabled_attributes: 0,

			config,
		}
	}

	pub fn config(&self) -> &ContextConfig {
		&self.config
	}

	pub fn backend(&self) -> &dyn Backend {
		&*self.backend
	}

	pub fn backend_mut(&mut self) -> &mut dyn Backend {
		&mut *self.backend
	}

	pub fn resource_manager(&self) -> &ResourceManager {
		&self.resource_manager
	}

	pub fn bind_state(&self) -> &BindState {
		&self.binds
	}

	/// Texture units usable for binding.
	pub fn texture_units(&self) -> u32 {
		self.texture_units
	}


	/// Makes `surface` current for this context. The viewport follows its size while no
	/// framebuffer is bound.
	pub fn bind_surface(&mut self, mut surface: Box<dyn Surface>) -> Result<()> {
		surface.make_current()?;

		if self.framebuffer.is_none() {
			let (width, height) = surface.size();
			self.backend.viewport(width, height);
		}

		self.surface = Some(surface);
		Ok(())
	}

	/// Resizes the bound surface and, while no framebuffer is bound, the viewport.
	pub fn resize_surface(&mut self, width: u32, height: u32) -> Result<()> {
		let surface = self.surface.as_mut().ok_or(GfxError::NoSurface)?;
		surface.resize(width, height)?;

		if self.framebuffer.is_none() {
			self.restore_surface_viewport();
		}

		Ok(())
	}

	pub fn set_input_poller(&mut self, input: Box<dyn InputPoller>) {
		self.input = Some(input);
	}

	pub fn surface_size(&self) -> Option<(u32, u32)> {
		self.surface.as_ref().map(|surface| surface.size())
	}

	pub fn start_frame(&mut self) {
		self.scratch.reset();

		if let Some(input) = self.input.as_mut() {
			input.poll();
		}
	}

	pub fn finish_frame(&mut self) -> Result<()> {
		let surface = self.surface.as_mut().ok_or(GfxError::NoSurface)?;
		surface.swap_buffers()?;
		Ok(())
	}


	pub fn set_clear_color(&mut self, color: impl Into<[f32; 4]>) {
		self.backend.clear_color(color.into());
	}

	pub fn clear(&mut self, mask: ClearMask) {
		self.backend.clear(mask);
	}


	pub fn is_valid(&self, handle: impl Into<ResourceHandle>) -> bool {
		let handle = handle.into();
		let backend = &*self.backend;
		let rm = &self.resource_manager;

		match handle.kind {
			ResourceKind::Buffer => rm.live::<BufferObject>(BufferHandle(handle.id), backend).is_ok(),
			ResourceKind::ShaderStage => rm.live::<SeparatedShaderObject>(ShaderStageHandle(handle.id), backend).is_ok(),
			ResourceKind::Shader => rm.live::<ShaderObject>(ShaderHandle(handle.id), backend).is_ok(),
			ResourceKind::Texture => rm.live::<TextureObject>(TextureHandle(handle.id), backend).is_ok(),
			ResourceKind::Framebuffer => rm.live::<FramebufferObject>(FramebufferHandle(handle.id), backend).is_ok(),
		}
	}

	pub fn label_of(&self, handle: impl Into<ResourceHandle>) -> Option<&str> {
		self.resource_manager.label_of(handle.into())
	}

	/// Disposes any kind of resource, clearing every bind slot that held it.
	///
	/// Returns false if it had already been disposed.
	pub fn dispose(&mut self, handle: impl Into<ResourceHandle>) -> Result<bool> {
		let handle = handle.into();
		let backend = &mut *self.backend;
		let rm = &mut self.resource_manager;

		let disposed = match handle.kind {
			ResourceKind::Buffer => rm.dispose::<BufferObject>(BufferHandle(handle.id), backend)?,
			ResourceKind::ShaderStage => rm.dispose::<SeparatedShaderObject>(ShaderStageHandle(handle.id), backend)?,
			ResourceKind::Shader => rm.dispose::<ShaderObject>(ShaderHandle(handle.id), backend)?,
			ResourceKind::Texture => rm.dispose::<TextureObject>(TextureHandle(handle.id), backend)?,
			ResourceKind::Framebuffer => rm.dispose::<FramebufferObject>(FramebufferHandle(handle.id), backend)?,
		};

		self.forget_binding(handle);
		Ok(disposed)
	}

	fn forget_binding(&mut self, handle: ResourceHandle) {
		let binds = &mut self.binds;

		if binds.shader.map_or(false, |shader| handle.same_object(shader)) {
			binds.shader = None;
		}

		for slot in binds.buffers.iter_mut() {
			if slot.map_or(false, |buffer| handle.same_object(buffer)) {
				*slot = None;
			}
		}

		for slot in binds.textures.iter_mut() {
			if slot.map_or(false, |texture| handle.same_object(texture)) {
				*slot = None;
			}
		}

		if self.framebuffer.map_or(false, |framebuffer| handle.same_object(framebuffer)) {
			self.framebuffer = None;
			self.restore_surface_viewport();
		}

		if let Some((shader, buffer, _)) = self.applied_layout {
			if handle.same_object(shader) || handle.same_object(buffer) {
				self.applied_layout = None;
			}
		}
	}

	fn restore_surface_viewport(&mut self) {
		if let Some((width, height)) = self.surface_size() {
			self.backend.viewport(width, height);
		}
	}

	/// Attaches `label` to the native object when the backend supports debug labels.
	fn label_native(&mut self, kind: ResourceKind, name: u32, label: &str) {
		if let Some(labels) = self.backend.object_labels() {
			labels.set_label(kind, name, label);
		}
	}

	fn unsupported(&self, handle: ResourceHandle, operation: &'static str) -> GfxError {
		GfxError::Unsupported {
			kind: handle.kind,
			label: self.label_of(handle).map_or_else(|| format!("#{}", handle.id), str::to_owned),
			operation,
		}
	}
}



#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::backend::headless::{Call, CallLog, HeadlessBackend};
	use crate::backend::{BufferTarget, ShaderStage};
	use crate::semantics::VertexInputType;

	pub(crate) fn headless_context() -> (Context, CallLog) {
		let backend = HeadlessBackend::new();
		let log = backend.log();
		(Context::new(backend, ContextConfig::default()), log)
	}

	pub(crate) const FLAT_VERTEX: &str = "\
#version 450 core
in vec3 aPosition;
uniform mat4 uModel;
uniform vec3 uLightPos[4];
void main() { gl_Position = uModel * vec4(aPosition, 1.0); }
";

	pub(crate) const FLAT_FRAGMENT: &str = "\
#version 450 core
uniform vec3 uAmbientColor;
uniform float uAmbient;
uniform int uLightCount;
uniform vec3 uLightColor[4];
out vec4 oColor;
void main() { oColor = vec4(uAmbientColor * uAmbient, 1.0); }
";

	/// A linked program with a single position input.
	pub(crate) fn flat_shader(ctx: &mut Context) -> ShaderHandle {
		let vertex = ctx.create_shader_stage("flat.vert", ShaderStage::Vertex, FLAT_VERTEX).unwrap();
		let fragment = ctx.create_shader_stage("flat.frag", ShaderStage::Fragment, FLAT_FRAGMENT).unwrap();

		let shader = ctx.create_shader("flat").unwrap();
		ctx.attach_stage(shader, vertex).unwrap();
		ctx.attach_stage(shader, fragment).unwrap();
		ctx.register_input(shader, "aPosition", VertexInputType::Position3).unwrap();
		ctx.register_output(shader, "oColor", 0).unwrap();
		ctx.link_shader(shader).unwrap();
		shader
	}

	struct FakeSurface {
		swaps: std::rc::Rc<std::cell::Cell<u32>>,
		size: (u32, u32),
	}

	impl Surface for FakeSurface {
		fn make_current(&mut self) -> anyhow::Result<()> { Ok(()) }

		fn swap_buffers(&mut self) -> anyhow::Result<()> {
			self.swaps.set(self.swaps.get() + 1);
			Ok(())
		}

		fn size(&self) -> (u32, u32) { self.size }

		fn resize(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
			self.size = (width, height);
			Ok(())
		}
	}

	struct CountingInput(std::rc::Rc<std::cell::Cell<u32>>);

	impl InputPoller for CountingInput {
		fn poll(&mut self) {
			self.0.set(self.0.get() + 1);
		}
	}


	#[test]
	fn finishing_a_frame_needs_a_surface() {
		let (mut ctx, log) = headless_context();
		assert!(matches!(ctx.finish_frame(), Err(GfxError::NoSurface)));

		let swaps = std::rc::Rc::new(std::cell::Cell::new(0));
		ctx.bind_surface(Box::new(FakeSurface { swaps: swaps.clone(), size: (640, 480) })).unwrap();

		assert!(log.calls().contains(&Call::Viewport(640, 480)));

		ctx.start_frame();
		ctx.finish_frame().unwrap();
		assert_eq!(swaps.get(), 1);
	}

	#[test]
	fn resizing_the_surface_moves_the_viewport() {
		let (mut ctx, log) = headless_context();
		assert!(matches!(ctx.resize_surface(10, 10), Err(GfxError::NoSurface)));

		let swaps = std::rc::Rc::new(std::cell::Cell::new(0));
		ctx.bind_surface(Box::new(FakeSurface { swaps, size: (640, 480) })).unwrap();

		ctx.resize_surface(800, 600).unwrap();
		assert_eq!(ctx.surface_size(), Some((800, 600)));
		assert_eq!(log.calls().last(), Some(&Call::Viewport(800, 600)));
	}

	#[test]
	fn input_is_polled_once_per_frame() {
		let (mut ctx, _) = headless_context();
		let polls = std::rc::Rc::new(std::cell::Cell::new(0));
		ctx.set_input_poller(Box::new(CountingInput(polls.clone())));

		ctx.start_frame();
		ctx.start_frame();
		assert_eq!(polls.get(), 2);
	}

	#[test]
	fn clear_color_is_applied_at_creation_and_on_request() {
		let (mut ctx, log) = headless_context();
		assert_eq!(log.calls()[0], Call::ClearColor([0.0, 0.0, 0.0, 1.0]));

		ctx.set_clear_color(glam::Vec4::new(1.0, 0.5, 1.0, 1.0));
		ctx.clear(ClearMask::COLOR_DEPTH);

		let calls = log.calls();
		assert_eq!(calls[calls.len() - 2], Call::ClearColor([1.0, 0.5, 1.0, 1.0]));
		assert_eq!(calls[calls.len() - 1], Call::Clear(ClearMask::COLOR_DEPTH));
	}

	#[test]
	fn disposing_a_bound_buffer_clears_its_slot() {
		let (mut ctx, _) = headless_context();
		let buffer = ctx.create_buffer("quad", BufferTarget::VertexArray).unwrap();
		ctx.bind_buffer(buffer).unwrap();
		assert_eq!(ctx.bind_state().buffer(BufferTarget::VertexArray), Some(buffer));

		assert!(ctx.dispose(buffer).unwrap());
		assert_eq!(ctx.bind_state().buffer(BufferTarget::VertexArray), None);
		assert!(!ctx.is_valid(buffer));

		assert!(!ctx.dispose(buffer).unwrap());
		assert!(matches!(ctx.bind_buffer(buffer), Err(GfxError::InvalidObject { .. })));
	}

	#[test]
	fn disposing_a_bound_shader_clears_it() {
		let (mut ctx, _) = headless_context();
		let shader = flat_shader(&mut ctx);
		ctx.bind_shader(shader).unwrap();

		ctx.dispose(shader).unwrap();
		assert_eq!(ctx.current_shader(), None);
	}

	#[test]
	fn validity_follows_the_backend() {
		let (mut ctx, log) = headless_context();
		let texture = ctx.create_texture("white", TextureDesc::color(1, 1), Some(&[255; 4])).unwrap();
		assert!(ctx.is_valid(texture));

		let name = ctx.resource_manager().get::<TextureObject>(texture).unwrap().native_name();
		log.lose_object(name);

		assert!(!ctx.is_valid(texture));
		assert!(matches!(ctx.bind_texture(texture, 0), Err(GfxError::InvalidObject { kind: ResourceKind::Texture, .. })));
	}

	#[test]
	fn native_objects_receive_labels() {
		let (mut ctx, log) = headless_context();
		let buffer = ctx.create_buffer("terrain vertices", BufferTarget::VertexArray).unwrap();
		let name = ctx.resource_manager().get::<BufferObject>(buffer).unwrap().native_name();

		assert_eq!(log.label(ResourceKind::Buffer, name).as_deref(), Some("terrain vertices"));
		assert_eq!(ctx.label_of(buffer), Some("terrain vertices"));
	}
}
