use super::Context;
use crate::backend::{BufferTarget, PrimitiveType, ScalarType};
use crate::bind_state::BindDiff;
use crate::error::{GfxError, Result};
use crate::resource_manager::*;


impl Context {
	pub fn current_shader(&self) -> Option<ShaderHandle> {
		self.binds.shader
	}

	pub fn current_framebuffer(&self) -> Option<FramebufferHandle> {
		self.framebuffer
	}

	/// Binds any bindable resource. Textures go to unit 0.
	pub fn bind(&mut self, handle: impl Into<ResourceHandle>) -> Result<()> {
		let handle = handle.into();

		match handle.kind {
			ResourceKind::Buffer => self.bind_buffer(BufferHandle(handle.id)),
			ResourceKind::Shader => self.bind_shader(ShaderHandle(handle.id)),
			ResourceKind::Texture => self.bind_texture(TextureHandle(handle.id), 0),
			ResourceKind::Framebuffer => self.bind_framebuffer(Some(FramebufferHandle(handle.id))),
			ResourceKind::ShaderStage => Err(self.unsupported(handle, "bind")),
		}
	}

	/// Unbinds `handle` from wherever it is currently bound.
	pub fn unbind(&mut self, handle: impl Into<ResourceHandle>) -> Result<()> {
		let handle = handle.into();

		match handle.kind {
			ResourceKind::Buffer => {
				let buffer = BufferHandle(handle.id);
				let target = self.resource_manager.live::<BufferObject>(buffer, &*self.backend)?.target();

				if self.binds.buffer(target) == Some(buffer) {
					self.unbind_buffer(target);
				}
			}

			ResourceKind::Shader => {
				if self.binds.shader == Some(ShaderHandle(handle.id)) {
					self.unbind_shader();
				}
			}

			ResourceKind::Texture => {
				let texture = Some(TextureHandle(handle.id));

				for unit in 0..self.texture_units {
					if self.binds.texture(unit) == texture {
						self.unbind_texture(unit)?;
					}
				}
			}

			ResourceKind::Framebuffer => {
				if self.framebuffer == Some(FramebufferHandle(handle.id)) {
					self.bind_framebuffer(None)?;
				}
			}

			ResourceKind::ShaderStage => return Err(self.unsupported(handle, "unbind")),
		}

		Ok(())
	}


	/// Makes `handle` the current program. It must be linked.
	pub fn bind_shader(&mut self, handle: ShaderHandle) -> Result<()> {
		let name = self.linked_program_name(handle)?;

		if self.binds.shader != Some(handle) {
			self.backend.use_program(Some(name));
			self.binds.shader = Some(handle);
		}

		Ok(())
	}

	pub fn unbind_shader(&mut self) {
		self.backend.use_program(None);
		self.binds.shader = None;
	}

	/// Binds a buffer to the target it was created for.
	pub fn bind_buffer(&mut self, handle: BufferHandle) -> Result<()> {
		let buffer = self.resource_manager.live::<BufferObject>(handle, &*self.backend)?;
		let (target, name) = (buffer.target(), buffer.native_name());

		if self.binds.buffer(target) != Some(handle) {
			self.backend.bind_buffer(target, Some(name));
			self.binds.set_buffer(target, Some(handle));
		}

		Ok(())
	}

	pub fn unbind_buffer(&mut self, target: BufferTarget) {
		self.backend.bind_buffer(target, None);
		self.binds.set_buffer(target, None);
	}

	pub fn bind_texture(&mut self, handle: TextureHandle, unit: u32) -> Result<()> {
		self.check_texture_unit(unit)?;
		let name = self.resource_manager.live::<TextureObject>(handle, &*self.backend)?.native_name();

		if self.binds.texture(unit) != Some(handle) {
			self.backend.bind_texture_unit(unit, Some(name));
			self.binds.textures[unit as usize] = Some(handle);
		}

		Ok(())
	}

	pub fn unbind_texture(&mut self, unit: u32) -> Result<()> {
		self.check_texture_unit(unit)?;

		self.backend.bind_texture_unit(unit, None);
		self.binds.textures[unit as usize] = None;
		Ok(())
	}

	/// Redirects rendering into `framebuffer`, or back to the surface with `None`.
	///
	/// The viewport follows the new target's size.
	pub fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) -> Result<()> {
		if self.framebuffer == framebuffer {
			if let Some(handle) = framebuffer {
				self.resource_manager.live::<FramebufferObject>(handle, &*self.backend)?;
			}

			return Ok(())
		}

		match framebuffer {
			Some(handle) => {
				let object = self.resource_manager.live::<FramebufferObject>(handle, &*self.backend)?;
				let (name, (width, height)) = (object.native_name(), object.size());

				self.backend.bind_framebuffer(Some(name));
				self.backend.viewport(width, height);
			}

			None => {
				self.backend.bind_framebuffer(None);
				self.restore_surface_viewport();
			}
		}

		self.framebuffer = framebuffer;
		Ok(())
	}

	fn check_texture_unit(&self, unit: u32) -> Result<()> {
		if unit >= self.texture_units {
			return Err(GfxError::OutOfRange {
				what: "texture unit",
				index: unit,
				limit: self.texture_units,
			})
		}

		Ok(())
	}

	fn linked_program_name(&self, handle: ShaderHandle) -> Result<u32> {
		let shader = self.resource_manager.live::<ShaderObject>(handle, &*self.backend)?;

		if !shader.is_linked() {
			return Err(GfxError::NotLinked { label: shader.label().to_owned() })
		}

		Ok(shader.native_name())
	}


	/// Issues exactly the binds in `diff` and records them as current.
	///
	/// Every object is resolved before anything is issued, so an invalid object leaves the bind
	/// state untouched.
	pub(crate) fn apply_diff(&mut self, diff: &BindDiff) -> Result<()> {
		let shader = match diff.shader {
			Some(Some(handle)) => Some(Some(self.linked_program_name(handle)?)),
			Some(None) => Some(None),
			None => None,
		};

		let mut buffers = Vec::with_capacity(diff.buffers.len());
		for &(target, handle) in diff.buffers.iter() {
			let name = handle
				.map(|handle| self.resource_manager.live::<BufferObject>(handle, &*self.backend).map(Resource::native_name))
				.transpose()?;
			buffers.push((target, name));
		}

		let mut textures = Vec::with_capacity(diff.textures.len());
		for &(unit, handle) in diff.textures.iter() {
			self.check_texture_unit(unit)?;

			let name = handle
				.map(|handle| self.resource_manager.live::<TextureObject>(handle, &*self.backend).map(Resource::native_name))
				.transpose()?;
			textures.push((unit, name));
		}

		if let Some(name) = shader {
			self.backend.use_program(name);
		}

		for (target, name) in buffers {
			self.backend.bind_buffer(target, name);
		}

		for (unit, name) in textures {
			self.backend.bind_texture_unit(unit, name);
		}

		if let Some(handle) = diff.shader {
			self.binds.shader = handle;
		}

		for &(target, handle) in diff.buffers.iter() {
			self.binds.set_buffer(target, handle);
		}

		for &(unit, handle) in diff.textures.iter() {
			self.binds.textures[unit as usize] = handle;
		}

		Ok(())
	}

	/// Points the attributes of the current program at the current vertex buffer, unless they
	/// already are.
	pub(crate) fn prepare_vertex_input(&mut self) -> Result<()> {
		let shader = self.binds.shader.ok_or(GfxError::NoShaderBound)?;
		let Some(vertex_buffer) = self.binds.buffer(BufferTarget::VertexArray) else {
			return Ok(())
		};

		let program = self.resource_manager.live_mut::<ShaderObject>(shader, &*self.backend)?;
		let generation = program.registry().input_generation();
		let key = Some((shader, vertex_buffer, generation));

		if self.applied_layout == key {
			return Ok(())
		}

		let layout = program.vertex_layout();
		layout.apply(&mut *self.backend, self.enabled_attributes);

		self.enabled_attributes = layout.attributes().len() as u32;
		self.applied_layout = key;

		Ok(())
	}

	/// Draws from the current binds. `count` is a vertex count, or an index count when an element
	/// buffer is bound.
	pub(crate) fn issue_draw(&mut self, primitive: PrimitiveType, count: u32, instances: u32) -> Result<()> {
		self.prepare_vertex_input()?;

		let Some(element_buffer) = self.binds.buffer(BufferTarget::ElementArray) else {
			self.backend.draw_arrays(primitive, 0, count, instances);
			return Ok(())
		};

		let elements = self.resource_manager.live::<BufferObject>(element_buffer, &*self.backend)?;

		let index_type = match elements.scalar() {
			Some(scalar @ (ScalarType::Int | ScalarType::UnsignedInt)) => scalar,
			_ => return Err(GfxError::Unsupported {
				kind: ResourceKind::Buffer,
				label: elements.label().to_owned(),
				operation: "draw with non-integer indices",
			}),
		};

		self.backend.draw_elements(primitive, count, index_type, instances);
		Ok(())
	}
}



#[cfg(test)]
mod tests {
	use crate::context::tests::*;
	use crate::backend::headless::Call;
	use crate::backend::{BufferTarget, PrimitiveType, ShaderStage};
	use crate::bind_state::BindState;
	use crate::semantics::VertexInputType;
	use crate::error::GfxError;
	use crate::resource_manager::*;

	#[test]
	fn stage_units_cannot_be_bound() {
		let (mut ctx, _) = headless_context();
		let stage = ctx.create_shader_stage("flat.vert", ShaderStage::Vertex, FLAT_VERTEX).unwrap();

		assert!(matches!(ctx.bind(stage), Err(GfxError::Unsupported { operation: "bind", .. })));
		assert!(matches!(ctx.unbind(stage), Err(GfxError::Unsupported { operation: "unbind", .. })));
	}

	#[test]
	fn unlinked_programs_cannot_be_bound() {
		let (mut ctx, _) = headless_context();
		let shader = ctx.create_shader("empty").unwrap();

		assert!(matches!(ctx.bind(shader), Err(GfxError::NotLinked { .. })));
		assert_eq!(ctx.current_shader(), None);
	}

	#[test]
	fn rebinding_the_same_object_is_free() {
		let (mut ctx, log) = headless_context();
		let shader = flat_shader(&mut ctx);
		let buffer = ctx.create_buffer("quad", BufferTarget::VertexArray).unwrap();
		log.clear();

		ctx.bind(shader).unwrap();
		ctx.bind(shader).unwrap();
		ctx.bind(buffer).unwrap();
		ctx.bind(buffer).unwrap();

		assert_eq!(log.count(|call| call.is_bind()), 2);

		ctx.unbind(buffer).unwrap();
		assert_eq!(ctx.bind_state().buffer(BufferTarget::VertexArray), None);
		assert_eq!(log.calls().last(), Some(&Call::BindBuffer(BufferTarget::VertexArray, None)));
	}

	#[test]
	fn texture_units_are_range_checked() {
		let (mut ctx, _) = headless_context();
		let texture = ctx.create_texture("white", TextureDesc::color(1, 1), None).unwrap();
		let limit = ctx.texture_units();

		assert!(matches!(
			ctx.bind_texture(texture, limit),
			Err(GfxError::OutOfRange { what: "texture unit", index, .. }) if index == limit
		));

		ctx.bind_texture(texture, 3).unwrap();
		ctx.bind_texture(texture, 5).unwrap();
		ctx.unbind(texture).unwrap();
		assert!(ctx.bind_state().textures.iter().all(Option::is_none));
	}

	#[test]
	fn framebuffer_binding_sets_viewport() {
		let (mut ctx, log) = headless_context();
		let color = ctx.create_texture("color", TextureDesc::render_target(128, 64, TextureFormat::Rgba8), None).unwrap();
		let framebuffer = ctx.create_framebuffer("offscreen", &FramebufferDesc::color(color)).unwrap();

		ctx.bind(framebuffer).unwrap();
		assert_eq!(ctx.current_framebuffer(), Some(framebuffer));
		assert_eq!(log.calls().last(), Some(&Call::Viewport(128, 64)));

		ctx.dispose(framebuffer).unwrap();
		assert_eq!(ctx.current_framebuffer(), None);
	}

	#[test]
	fn rebinding_the_same_framebuffer_is_free() {
		let (mut ctx, log) = headless_context();
		let color = ctx.create_texture("color", TextureDesc::render_target(32, 32, TextureFormat::Rgba8), None).unwrap();
		let framebuffer = ctx.create_framebuffer("offscreen", &FramebufferDesc::color(color)).unwrap();
		log.clear();

		ctx.bind_framebuffer(Some(framebuffer)).unwrap();
		ctx.bind_framebuffer(Some(framebuffer)).unwrap();
		ctx.bind(framebuffer).unwrap();

		assert_eq!(log.count(|call| matches!(call, Call::BindFramebuffer(_))), 1);
		assert_eq!(log.count(|call| matches!(call, Call::Viewport(..))), 1);

		ctx.bind_framebuffer(None).unwrap();
		ctx.bind_framebuffer(None).unwrap();
		assert_eq!(log.count(|call| matches!(call, Call::BindFramebuffer(None))), 1);
	}

	#[test]
	fn attributes_past_a_shorter_layout_are_disabled() {
		let (mut ctx, log) = headless_context();

		let vertex = ctx.create_shader_stage("lit.vert", ShaderStage::Vertex, FLAT_VERTEX).unwrap();
		let fragment = ctx.create_shader_stage("lit.frag", ShaderStage::Fragment, FLAT_FRAGMENT).unwrap();
		let wide = ctx.create_shader("wide").unwrap();
		ctx.attach_stage(wide, vertex).unwrap();
		ctx.attach_stage(wide, fragment).unwrap();
		ctx.register_input(wide, "aPosition", VertexInputType::Position3).unwrap();
		ctx.register_input(wide, "aNormal", VertexInputType::Normal3).unwrap();
		ctx.link_shader(wide).unwrap();

		let narrow = flat_shader(&mut ctx);
		let buffer = ctx.create_buffer("quad", BufferTarget::VertexArray).unwrap();
		ctx.upload(buffer, &[0.0f32; 24]).unwrap();
		ctx.bind(buffer).unwrap();

		ctx.bind_shader(wide).unwrap();
		ctx.issue_draw(PrimitiveType::Triangles, 4, 1).unwrap();
		assert_eq!(log.count(|call| matches!(call, Call::EnableVertexAttrib(_))), 2);
		assert_eq!(log.count(|call| matches!(call, Call::DisableVertexAttrib(_))), 0);

		log.clear();
		ctx.bind_shader(narrow).unwrap();
		ctx.issue_draw(PrimitiveType::Triangles, 4, 1).unwrap();
		assert_eq!(log.count(|call| matches!(call, Call::EnableVertexAttrib(_))), 1);
		assert!(log.calls().contains(&Call::DisableVertexAttrib(1)));

		log.clear();
		ctx.bind_shader(wide).unwrap();
		ctx.issue_draw(PrimitiveType::Triangles, 4, 1).unwrap();
		assert!(log.calls().contains(&Call::EnableVertexAttrib(1)));
		assert_eq!(log.count(|call| matches!(call, Call::DisableVertexAttrib(_))), 0);
	}

	#[test]
	fn invalid_objects_in_a_diff_leave_state_untouched() {
		let (mut ctx, log) = headless_context();
		let shader = flat_shader(&mut ctx);
		let buffer = ctx.create_buffer("gone", BufferTarget::VertexArray).unwrap();
		ctx.dispose(buffer).unwrap();
		log.clear();

		let mut required = BindState::with_texture_units(ctx.texture_units());
		required.shader = Some(shader);
		required.set_buffer(BufferTarget::VertexArray, Some(buffer));

		let diff = required.diff(ctx.bind_state());
		assert!(ctx.apply_diff(&diff).is_err());
		assert_eq!(log.count(|call| call.is_bind()), 0);
		assert_eq!(ctx.current_shader(), None);
	}
}
