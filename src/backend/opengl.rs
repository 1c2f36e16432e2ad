use super::{Attachment, Backend, BufferTarget, ClearMask, ObjectLabels, PrimitiveType, ScalarType, ShaderStage, UniformValue};
use crate::resource_manager::{AddressingMode, FilterMode, ResourceKind, TextureDesc, TextureFormat};

use std::ffi::{c_void, CString};
use std::marker::PhantomData;


/// Backend issuing calls against the OpenGL 4.5 context current on this thread.
#[derive(Debug)]
pub struct GlBackend {
	vao_name: u32,
	max_texture_units: u32,

	// GL contexts are bound to the thread that made them current.
	_not_send: PhantomData<*const ()>,
}

impl GlBackend {
	/// Loads function pointers through `loader` and sets up the single shared vertex array.
	pub fn load(loader: impl FnMut(&'static str) -> *const c_void) -> anyhow::Result<Self> {
		gl::load_with(loader);

		anyhow::ensure!(gl::CreateVertexArrays::is_loaded(), "OpenGL 4.5 direct state access is unavailable");

		let mut vao_name = 0;
		let mut max_texture_units = 0;

		unsafe {
			gl::CreateVertexArrays(1, &mut vao_name);
			gl::BindVertexArray(vao_name);

			gl::GetIntegerv(gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS, &mut max_texture_units);
		}

		log::info!("OpenGL backend ready, {max_texture_units} texture units");

		Ok(GlBackend {
			vao_name,
			max_texture_units: max_texture_units.max(0) as u32,
			_not_send: PhantomData,
		})
	}
}

impl Drop for GlBackend {
	fn drop(&mut self) {
		unsafe {
			gl::DeleteVertexArrays(1, &self.vao_name);
		}
	}
}


impl Backend for GlBackend {
	fn create_buffer(&mut self) -> u32 {
		let mut name = 0;
		unsafe {
			gl::CreateBuffers(1, &mut name);
		}
		name
	}

	fn buffer_data(&mut self, name: u32, data: &[u8]) {
		unsafe {
			gl::NamedBufferData(name, data.len() as isize, data.as_ptr() as *const _, gl::STATIC_DRAW);
		}
	}

	fn delete_buffer(&mut self, name: u32) {
		unsafe {
			gl::DeleteBuffers(1, &name);
		}
	}

	fn is_buffer(&self, name: u32) -> bool {
		unsafe { gl::IsBuffer(name) == gl::TRUE }
	}

	fn bind_buffer(&mut self, target: BufferTarget, name: Option<u32>) {
		let target = match target {
			BufferTarget::VertexArray => gl::ARRAY_BUFFER,
			BufferTarget::ElementArray => gl::ELEMENT_ARRAY_BUFFER,
		};

		unsafe {
			gl::BindBuffer(target, name.unwrap_or(0));
		}
	}


	fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<u32, String> {
		let source = CString::new(source)
			.map_err(|_| "shader source contains a nul byte".to_owned())?;

		let shader_type = match stage {
			ShaderStage::Vertex => gl::VERTEX_SHADER,
			ShaderStage::Fragment => gl::FRAGMENT_SHADER,
		};

		unsafe {
			let name = gl::CreateShader(shader_type);
			gl::ShaderSource(name, 1, &source.as_ptr(), std::ptr::null());
			gl::CompileShader(name);

			let mut status = 0;
			gl::GetShaderiv(name, gl::COMPILE_STATUS, &mut status);

			if status == 0 {
				let log = shader_info_log(name);
				gl::DeleteShader(name);
				return Err(log)
			}

			Ok(name)
		}
	}

	fn delete_shader(&mut self, name: u32) {
		unsafe {
			gl::DeleteShader(name);
		}
	}

	fn is_shader(&self, name: u32) -> bool {
		unsafe { gl::IsShader(name) == gl::TRUE }
	}


	fn create_program(&mut self) -> u32 {
		unsafe { gl::CreateProgram() }
	}

	fn attach_shader(&mut self, program: u32, shader: u32) {
		unsafe {
			gl::AttachShader(program, shader);
		}
	}

	fn detach_shader(&mut self, program: u32, shader: u32) {
		unsafe {
			gl::DetachShader(program, shader);
		}
	}

	fn bind_attrib_location(&mut self, program: u32, slot: u32, name: &str) {
		let Ok(name) = CString::new(name) else {
			log::error!("Attribute name {name:?} contains a nul byte, slot {slot} left unbound");
			return
		};

		unsafe {
			gl::BindAttribLocation(program, slot, name.as_ptr());
		}
	}

	fn bind_frag_data_location(&mut self, program: u32, color_index: u32, name: &str) {
		let Ok(name) = CString::new(name) else {
			log::error!("Output name {name:?} contains a nul byte, color index {color_index} left unbound");
			return
		};

		unsafe {
			gl::BindFragDataLocation(program, color_index, name.as_ptr());
		}
	}

	fn link_program(&mut self, program: u32) -> Result<(), String> {
		unsafe {
			gl::LinkProgram(program);

			let mut status = 0;
			gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);

			if status == 0 {
				return Err(program_info_log(program))
			}
		}

		Ok(())
	}

	fn delete_program(&mut self, program: u32) {
		unsafe {
			gl::DeleteProgram(program);
		}
	}

	fn is_program(&self, name: u32) -> bool {
		unsafe { gl::IsProgram(name) == gl::TRUE }
	}

	fn use_program(&mut self, program: Option<u32>) {
		unsafe {
			gl::UseProgram(program.unwrap_or(0));
		}
	}

	fn uniform_location(&mut self, program: u32, name: &str) -> Option<i32> {
		let name = CString::new(name).ok()?;
		let location = unsafe { gl::GetUniformLocation(program, name.as_ptr()) };

		(location >= 0).then_some(location)
	}

	fn set_uniform(&mut self, program: u32, location: i32, value: &UniformValue) {
		let (p, l) = (program, location);

		unsafe {
			match value {
				UniformValue::Float(v) => gl::ProgramUniform1f(p, l, *v),
				UniformValue::Vec2(v) => gl::ProgramUniform2fv(p, l, 1, v.as_ptr()),
				UniformValue::Vec3(v) => gl::ProgramUniform3fv(p, l, 1, v.as_ptr()),
				UniformValue::Vec4(v) => gl::ProgramUniform4fv(p, l, 1, v.as_ptr()),

				UniformValue::Int(v) => gl::ProgramUniform1i(p, l, *v),
				UniformValue::IVec2(v) => gl::ProgramUniform2iv(p, l, 1, v.as_ptr()),
				UniformValue::IVec3(v) => gl::ProgramUniform3iv(p, l, 1, v.as_ptr()),
				UniformValue::IVec4(v) => gl::ProgramUniform4iv(p, l, 1, v.as_ptr()),

				UniformValue::UInt(v) => gl::ProgramUniform1ui(p, l, *v),
				UniformValue::UVec2(v) => gl::ProgramUniform2uiv(p, l, 1, v.as_ptr()),
				UniformValue::UVec3(v) => gl::ProgramUniform3uiv(p, l, 1, v.as_ptr()),
				UniformValue::UVec4(v) => gl::ProgramUniform4uiv(p, l, 1, v.as_ptr()),

				UniformValue::Double(v) => gl::ProgramUniform1d(p, l, *v),
				UniformValue::DVec2(v) => gl::ProgramUniform2dv(p, l, 1, v.as_ptr()),
				UniformValue::DVec3(v) => gl::ProgramUniform3dv(p, l, 1, v.as_ptr()),
				UniformValue::DVec4(v) => gl::ProgramUniform4dv(p, l, 1, v.as_ptr()),

				UniformValue::Mat2(v) => gl::ProgramUniformMatrix2fv(p, l, 1, gl::FALSE, v.as_ptr()),
				UniformValue::Mat3(v) => gl::ProgramUniformMatrix3fv(p, l, 1, gl::FALSE, v.as_ptr()),
				UniformValue::Mat4(v) => gl::ProgramUniformMatrix4fv(p, l, 1, gl::FALSE, v.as_ptr()),

				UniformValue::Sampler(unit) => gl::ProgramUniform1i(p, l, *unit),
			}
		}
	}


	fn vertex_attrib_pointer(&mut self, slot: u32, components: u32, stride: u32, offset: u32) {
		unsafe {
			gl::VertexAttribPointer(slot, components as i32, gl::FLOAT, gl::FALSE,
				stride as i32, offset as usize as *const _);
		}
	}

	fn enable_vertex_attrib(&mut self, slot: u32) {
		unsafe {
			gl::EnableVertexAttribArray(slot);
		}
	}

	fn disable_vertex_attrib(&mut self, slot: u32) {
		unsafe {
			gl::DisableVertexAttribArray(slot);
		}
	}


	fn create_texture(&mut self, desc: &TextureDesc, pixels: Option<&[u8]>) -> u32 {
		let (internal_format, format, component_type) = texture_format(desc.format);
		let (width, height) = (desc.width as i32, desc.height as i32);

		let mut name = 0;

		unsafe {
			gl::CreateTextures(gl::TEXTURE_2D, 1, &mut name);
			gl::TextureStorage2D(name, 1, internal_format, width, height);

			gl::TextureParameteri(name, gl::TEXTURE_MIN_FILTER, filter_mode(desc.minify_filter));
			gl::TextureParameteri(name, gl::TEXTURE_MAG_FILTER, filter_mode(desc.magnify_filter));
			gl::TextureParameteri(name, gl::TEXTURE_WRAP_S, addressing_mode(desc.addressing_mode));
			gl::TextureParameteri(name, gl::TEXTURE_WRAP_T, addressing_mode(desc.addressing_mode));

			if let Some(pixels) = pixels {
				let (level, offset_x, offset_y) = (0, 0, 0);

				gl::TextureSubImage2D(name, level, offset_x, offset_y,
					width, height,
					format,
					component_type,
					pixels.as_ptr() as *const _);
			}
		}

		name
	}

	fn delete_texture(&mut self, name: u32) {
		unsafe {
			gl::DeleteTextures(1, &name);
		}
	}

	fn is_texture(&self, name: u32) -> bool {
		unsafe { gl::IsTexture(name) == gl::TRUE }
	}

	fn bind_texture_unit(&mut self, unit: u32, name: Option<u32>) {
		unsafe {
			gl::BindTextureUnit(unit, name.unwrap_or(0));
		}
	}

	fn max_texture_units(&self) -> u32 {
		self.max_texture_units
	}


	fn create_framebuffer(&mut self) -> u32 {
		let mut name = 0;
		unsafe {
			gl::CreateFramebuffers(1, &mut name);
		}
		name
	}

	fn framebuffer_attach(&mut self, framebuffer: u32, attachment: Attachment, texture: u32) {
		let attachment = match attachment {
			Attachment::Color => gl::COLOR_ATTACHMENT0,
			Attachment::Depth => gl::DEPTH_ATTACHMENT,
			Attachment::Stencil => gl::STENCIL_ATTACHMENT,
			Attachment::DepthStencil => gl::DEPTH_STENCIL_ATTACHMENT,
		};

		unsafe {
			gl::NamedFramebufferTexture(framebuffer, attachment, texture, 0);
		}
	}

	fn framebuffer_complete(&self, framebuffer: u32) -> bool {
		let status = unsafe { gl::CheckNamedFramebufferStatus(framebuffer, gl::DRAW_FRAMEBUFFER) };
		status == gl::FRAMEBUFFER_COMPLETE
	}

	fn delete_framebuffer(&mut self, name: u32) {
		unsafe {
			gl::DeleteFramebuffers(1, &name);
		}
	}

	fn is_framebuffer(&self, name: u32) -> bool {
		unsafe { gl::IsFramebuffer(name) == gl::TRUE }
	}

	fn bind_framebuffer(&mut self, name: Option<u32>) {
		unsafe {
			gl::BindFramebuffer(gl::DRAW_FRAMEBUFFER, name.unwrap_or(0));
		}
	}


	fn viewport(&mut self, width: u32, height: u32) {
		unsafe {
			gl::Viewport(0, 0, width as i32, height as i32);
		}
	}

	fn clear_color(&mut self, [r, g, b, a]: [f32; 4]) {
		unsafe {
			gl::ClearColor(r, g, b, a);
		}
	}

	fn clear(&mut self, mask: ClearMask) {
		let mut bits = 0;
		if mask.color { bits |= gl::COLOR_BUFFER_BIT }
		if mask.depth { bits |= gl::DEPTH_BUFFER_BIT }
		if mask.stencil { bits |= gl::STENCIL_BUFFER_BIT }

		unsafe {
			gl::Clear(bits);
		}
	}


	fn draw_arrays(&mut self, primitive: PrimitiveType, first: u32, count: u32, instances: u32) {
		unsafe {
			gl::DrawArraysInstanced(primitive_mode(primitive), first as i32, count as i32, instances as i32);
		}
	}

	fn draw_elements(&mut self, primitive: PrimitiveType, count: u32, index_type: ScalarType, instances: u32) {
		let index_type = match index_type {
			ScalarType::Int | ScalarType::UnsignedInt => gl::UNSIGNED_INT,
			ScalarType::Float | ScalarType::Double => {
				log::error!("{index_type:?} can't be used as an element index type");
				return
			}
		};

		unsafe {
			gl::DrawElementsInstanced(primitive_mode(primitive), count as i32, index_type,
				std::ptr::null(), instances as i32);
		}
	}


	fn object_labels(&mut self) -> Option<&mut dyn ObjectLabels> {
		gl::ObjectLabel::is_loaded().then_some(self as &mut dyn ObjectLabels)
	}
}


impl ObjectLabels for GlBackend {
	fn set_label(&mut self, kind: ResourceKind, name: u32, label: &str) {
		let identifier = match kind {
			ResourceKind::Buffer => gl::BUFFER,
			ResourceKind::ShaderStage => gl::SHADER,
			ResourceKind::Shader => gl::PROGRAM,
			ResourceKind::Texture => gl::TEXTURE,
			ResourceKind::Framebuffer => gl::FRAMEBUFFER,
		};

		unsafe {
			gl::ObjectLabel(identifier, name, label.len() as i32, label.as_ptr() as *const _);
		}
	}
}



unsafe fn shader_info_log(name: u32) -> String {
	let mut length = 0;
	gl::GetShaderiv(name, gl::INFO_LOG_LENGTH, &mut length);

	let mut buf = vec![0u8; length.max(1) as usize];
	let mut written = 0;
	gl::GetShaderInfoLog(name, buf.len() as _, &mut written, buf.as_mut_ptr() as _);

	buf.truncate(written.max(0) as usize);
	String::from_utf8_lossy(&buf).into_owned()
}

unsafe fn program_info_log(name: u32) -> String {
	let mut length = 0;
	gl::GetProgramiv(name, gl::INFO_LOG_LENGTH, &mut length);

	let mut buf = vec![0u8; length.max(1) as usize];
	let mut written = 0;
	gl::GetProgramInfoLog(name, buf.len() as _, &mut written, buf.as_mut_ptr() as _);

	buf.truncate(written.max(0) as usize);
	String::from_utf8_lossy(&buf).into_owned()
}


/// Internal format, upload format and upload component type.
fn texture_format(format: TextureFormat) -> (u32, u32, u32) {
	match format {
		TextureFormat::R8 => (gl::R8, gl::RED, gl::UNSIGNED_BYTE),
		TextureFormat::Rgba8 => (gl::RGBA8, gl::RGBA, gl::UNSIGNED_BYTE),
		TextureFormat::Srgb8Alpha8 => (gl::SRGB8_ALPHA8, gl::RGBA, gl::UNSIGNED_BYTE),
		TextureFormat::Rgba16F => (gl::RGBA16F, gl::RGBA, gl::FLOAT),
		TextureFormat::Rgba32F => (gl::RGBA32F, gl::RGBA, gl::FLOAT),
		TextureFormat::Depth32F => (gl::DEPTH_COMPONENT32F, gl::DEPTH_COMPONENT, gl::FLOAT),
		TextureFormat::Depth24Stencil8 => (gl::DEPTH24_STENCIL8, gl::DEPTH_STENCIL, gl::UNSIGNED_INT_24_8),
		TextureFormat::Stencil8 => (gl::STENCIL_INDEX8, gl::STENCIL_INDEX, gl::UNSIGNED_BYTE),
	}
}

fn filter_mode(mode: FilterMode) -> i32 {
	let mode = match mode {
		FilterMode::Nearest => gl::NEAREST,
		FilterMode::Linear => gl::LINEAR,
	};

	mode as i32
}

fn addressing_mode(mode: AddressingMode) -> i32 {
	let mode = match mode {
		AddressingMode::Repeat => gl::REPEAT,
		AddressingMode::ClampToEdge => gl::CLAMP_TO_EDGE,
		AddressingMode::MirroredRepeat => gl::MIRRORED_REPEAT,
	};

	mode as i32
}

fn primitive_mode(primitive: PrimitiveType) -> u32 {
	match primitive {
		PrimitiveType::Points => gl::POINTS,
		PrimitiveType::Lines => gl::LINES,
		PrimitiveType::LineStrip => gl::LINE_STRIP,
		PrimitiveType::Triangles => gl::TRIANGLES,
		PrimitiveType::TriangleStrip => gl::TRIANGLE_STRIP,
		PrimitiveType::TriangleFan => gl::TRIANGLE_FAN,
	}
}
