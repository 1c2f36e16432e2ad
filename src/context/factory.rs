use super::Context;
use crate::backend::{BufferTarget, PrimitiveType, ShaderStage};
use crate::drawable::Drawable;
use crate::error::{GfxError, Result};
use crate::registry::ShaderRegistry;
use crate::resource_manager::*;
use crate::resource_manager::{buffer, framebuffer, shader};
use crate::semantics::{UniformType, VertexInputType};
use crate::vertex_layout::VertexLayout;


impl Context {
	pub fn create_buffer(&mut self, label: &str, target: BufferTarget) -> Result<BufferHandle> {
		let name = self.backend.create_buffer();
		self.label_native(ResourceKind::Buffer, name, label);

		Ok(self.resource_manager.insert(BufferObject::new(label, name, target)))
	}

	/// Replaces the whole payload of `handle` with `data`.
	pub fn upload<T: BufferScalar>(&mut self, handle: BufferHandle, data: &[T]) -> Result<()> {
		let name = self.resource_manager.live::<BufferObject>(handle, &*self.backend)?.native_name();

		let bytes = buffer::normalize_payload(&self.scratch, data);
		self.backend.buffer_data(name, bytes);

		if let Some(buffer) = self.resource_manager.get_mut::<BufferObject>(handle) {
			buffer.record_upload(bytes.len(), T::SCALAR);
		}

		Ok(())
	}

	/// Byte length of the last upload.
	pub fn buffer_len(&self, handle: BufferHandle) -> Result<usize> {
		Ok(self.resource_manager.live::<BufferObject>(handle, &*self.backend)?.byte_len())
	}


	/// Compiles a single stage. `origin` labels the stage in diagnostics.
	pub fn create_shader_stage(&mut self, origin: &str, stage: ShaderStage, source: &str) -> Result<ShaderStageHandle> {
		let object = shader::compile_stage(&mut *self.backend, origin, stage, source)?;
		self.label_native(ResourceKind::ShaderStage, object.native_name(), origin);

		Ok(self.resource_manager.insert(object))
	}

	/// Creates an empty program in the assembled state.
	pub fn create_shader(&mut self, label: &str) -> Result<ShaderHandle> {
		let name = self.backend.create_program();
		self.label_native(ResourceKind::Shader, name, label);

		Ok(self.resource_manager.insert(ShaderObject::new(label, name)))
	}

	pub fn attach_stage(&mut self, shader: ShaderHandle, stage: ShaderStageHandle) -> Result<()> {
		let stage_name = self.resource_manager.live::<SeparatedShaderObject>(stage, &*self.backend)?.native_name();
		let program = self.assembled_shader(shader)?;
		let program_name = program.native_name();
		program.push_stage(stage);

		self.backend.attach_shader(program_name, stage_name);
		Ok(())
	}

	pub fn register_input(&mut self, shader: ShaderHandle, name: &str, ty: VertexInputType) -> Result<()> {
		self.assembled_shader(shader)?.registry_mut().register_input(name, ty)
	}

	pub fn register_output(&mut self, shader: ShaderHandle, name: &str, color_index: u32) -> Result<()> {
		self.assembled_shader(shader)?.registry_mut().register_output(name, color_index)
	}

	/// Also allowed once the program is linked.
	pub fn register_uniform(&mut self, shader: ShaderHandle, name: &str, ty: UniformType) -> Result<()> {
		self.live_shader_mut(shader)?.registry_mut().register_uniform(name, ty)
	}

	pub fn register_uniform_array(&mut self, shader: ShaderHandle, name: &str, ty: UniformType, len: u32) -> Result<()> {
		self.live_shader_mut(shader)?.registry_mut().register_uniform_array(name, ty, len)
	}

	pub fn link_shader(&mut self, shader: ShaderHandle) -> Result<()> {
		shader::link(&mut self.resource_manager, &mut *self.backend, shader)
	}

	pub fn shader_registry(&self, shader: ShaderHandle) -> Result<&ShaderRegistry> {
		Ok(self.resource_manager.live::<ShaderObject>(shader, &*self.backend)?.registry())
	}

	pub fn vertex_layout(&mut self, shader: ShaderHandle) -> Result<VertexLayout> {
		Ok(self.live_shader_mut(shader)?.vertex_layout().clone())
	}

	fn live_shader_mut(&mut self, shader: ShaderHandle) -> Result<&mut ShaderObject> {
		self.resource_manager.live_mut::<ShaderObject>(shader, &*self.backend)
	}

	fn assembled_shader(&mut self, shader: ShaderHandle) -> Result<&mut ShaderObject> {
		let object = self.live_shader_mut(shader)?;

		if object.is_linked() {
			return Err(GfxError::AlreadyLinked { label: object.label().to_owned() })
		}

		Ok(object)
	}


	/// `pixels` must hold exactly `desc.byte_len()` bytes when given.
	pub fn create_texture(&mut self, label: &str, desc: TextureDesc, pixels: Option<&[u8]>) -> Result<TextureHandle> {
		if let Some(pixels) = pixels {
			if pixels.len() != desc.byte_len() {
				return Err(GfxError::PayloadSize {
					label: label.to_owned(),
					expected: desc.byte_len(),
					found: pixels.len(),
				})
			}
		}

		let name = self.backend.create_texture(&desc, pixels);
		self.label_native(ResourceKind::Texture, name, label);

		Ok(self.resource_manager.insert(TextureObject::new(label, name, desc)))
	}

	/// Uploads a decoded image as an sRGB texture, flipped so the first row is at the bottom.
	pub fn create_texture_from_image(&mut self, label: &str, image: &image::RgbaImage) -> Result<TextureHandle> {
		let flipped = image::imageops::flip_vertical(image);
		let desc = TextureDesc::color(image.width(), image.height());

		self.create_texture(label, desc, Some(flipped.as_raw().as_slice()))
	}

	pub fn create_framebuffer(&mut self, label: &str, desc: &FramebufferDesc) -> Result<FramebufferHandle> {
		let object = framebuffer::create(&self.resource_manager, &mut *self.backend, label, desc)?;
		self.label_native(ResourceKind::Framebuffer, object.native_name(), label);

		Ok(self.resource_manager.insert(object))
	}


	/// Wraps buffers into a drawable that takes ownership of them.
	pub fn create_drawable(&mut self, vertex_buffer: BufferHandle, element_buffer: Option<BufferHandle>, vertex_count: u32)
		-> Result<Drawable>
	{
		self.expect_target(vertex_buffer, BufferTarget::VertexArray)?;

		if let Some(element_buffer) = element_buffer {
			self.expect_target(element_buffer, BufferTarget::ElementArray)?;
		}

		Ok(Drawable {
			vertex_buffer,
			element_buffer,
			vertex_count,
			primitive: PrimitiveType::default(),
		})
	}

	pub fn dispose_drawable(&mut self, drawable: Drawable) -> Result<()> {
		self.dispose(drawable.vertex_buffer)?;

		if let Some(element_buffer) = drawable.element_buffer {
			self.dispose(element_buffer)?;
		}

		Ok(())
	}

	fn expect_target(&self, handle: BufferHandle, expected: BufferTarget) -> Result<()> {
		let buffer = self.resource_manager.live::<BufferObject>(handle, &*self.backend)?;

		if buffer.target() != expected {
			return Err(GfxError::TargetMismatch {
				label: buffer.label().to_owned(),
				expected,
				found: buffer.target(),
			})
		}

		Ok(())
	}
}
