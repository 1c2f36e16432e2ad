//! The narrow boundary between the resource layer and a native rasterization API.
//!
//! Everything above this module speaks in plain `u32` object names and safe slices. The only
//! `unsafe` code in the library lives in [`opengl`]; [`headless`] records calls instead of issuing them.

pub mod opengl;
pub mod headless;

use crate::resource_manager::{ResourceKind, TextureDesc};
use serde::Deserialize;


#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Deserialize)]
pub enum ShaderStage {
	Vertex,
	Fragment,
}

impl ShaderStage {
	pub fn label(self) -> &'static str {
		match self {
			ShaderStage::Vertex => "vertex",
			ShaderStage::Fragment => "fragment",
		}
	}
}


#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum BufferTarget {
	VertexArray,
	ElementArray,
}

impl BufferTarget {
	pub const ALL: [BufferTarget; 2] = [BufferTarget::VertexArray, BufferTarget::ElementArray];

	pub fn index(self) -> usize {
		match self {
			BufferTarget::VertexArray => 0,
			BufferTarget::ElementArray => 1,
		}
	}
}


/// Element type of an uploaded buffer payload.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum ScalarType {
	Float,
	Int,
	UnsignedInt,
	Double,
}

impl ScalarType {
	pub fn size_bytes(self) -> usize {
		match self {
			ScalarType::Float | ScalarType::Int | ScalarType::UnsignedInt => 4,
			ScalarType::Double => 8,
		}
	}
}


#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Default)]
pub enum PrimitiveType {
	Points,
	Lines,
	LineStrip,
	#[default]
	Triangles,
	TriangleStrip,
	TriangleFan,
}


#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum Attachment {
	Color,
	Depth,
	Stencil,
	DepthStencil,
}


#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ClearMask {
	pub color: bool,
	pub depth: bool,
	pub stencil: bool,
}

impl ClearMask {
	pub const ALL: ClearMask = ClearMask { color: true, depth: true, stencil: true };
	pub const COLOR: ClearMask = ClearMask { color: true, depth: false, stencil: false };
	pub const COLOR_DEPTH: ClearMask = ClearMask { color: true, depth: true, stencil: false };
}


#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
	Float(f32),
	Vec2([f32; 2]),
	Vec3([f32; 3]),
	Vec4([f32; 4]),

	Int(i32),
	IVec2([i32; 2]),
	IVec3([i32; 3]),
	IVec4([i32; 4]),

	UInt(u32),
	UVec2([u32; 2]),
	UVec3([u32; 3]),
	UVec4([u32; 4]),

	Double(f64),
	DVec2([f64; 2]),
	DVec3([f64; 3]),
	DVec4([f64; 4]),

	/// Column major.
	Mat2([f32; 4]),
	Mat3([f32; 9]),
	Mat4([f32; 16]),

	/// Texture unit a sampler uniform reads from.
	Sampler(i32),
}

macro_rules! impl_uniform_from {
	($($ty:ty => |$v:ident| $e:expr),* $(,)?) => {
		$(
			impl From<$ty> for UniformValue {
				fn from($v: $ty) -> UniformValue { $e }
			}
		)*
	};
}

impl_uniform_from! {
	f32 => |v| UniformValue::Float(v),
	[f32; 2] => |v| UniformValue::Vec2(v),
	[f32; 3] => |v| UniformValue::Vec3(v),
	[f32; 4] => |v| UniformValue::Vec4(v),
	glam::Vec2 => |v| UniformValue::Vec2(v.to_array()),
	glam::Vec3 => |v| UniformValue::Vec3(v.to_array()),
	glam::Vec4 => |v| UniformValue::Vec4(v.to_array()),

	i32 => |v| UniformValue::Int(v),
	glam::IVec2 => |v| UniformValue::IVec2(v.to_array()),
	glam::IVec3 => |v| UniformValue::IVec3(v.to_array()),
	glam::IVec4 => |v| UniformValue::IVec4(v.to_array()),

	u32 => |v| UniformValue::UInt(v),
	glam::UVec2 => |v| UniformValue::UVec2(v.to_array()),
	glam::UVec3 => |v| UniformValue::UVec3(v.to_array()),
	glam::UVec4 => |v| UniformValue::UVec4(v.to_array()),

	f64 => |v| UniformValue::Double(v),
	glam::DVec2 => |v| UniformValue::DVec2(v.to_array()),
	glam::DVec3 => |v| UniformValue::DVec3(v.to_array()),
	glam::DVec4 => |v| UniformValue::DVec4(v.to_array()),

	glam::Mat2 => |v| UniformValue::Mat2(v.to_cols_array()),
	glam::Mat3 => |v| UniformValue::Mat3(v.to_cols_array()),
	glam::Mat4 => |v| UniformValue::Mat4(v.to_cols_array()),
}



/// Core operations every backend provides.
///
/// Object names are the backend's own; zero is never a valid name. Compilation and linking
/// return the backend's info log on failure.
pub trait Backend {
	fn create_buffer(&mut self) -> u32;
	/// Replaces the whole payload.
	fn buffer_data(&mut self, name: u32, data: &[u8]);
	fn delete_buffer(&mut self, name: u32);
	fn is_buffer(&self, name: u32) -> bool;
	fn bind_buffer(&mut self, target: BufferTarget, name: Option<u32>);

	fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<u32, String>;
	fn delete_shader(&mut self, name: u32);
	fn is_shader(&self, name: u32) -> bool;

	fn create_program(&mut self) -> u32;
	fn attach_shader(&mut self, program: u32, shader: u32);
	fn detach_shader(&mut self, program: u32, shader: u32);
	fn bind_attrib_location(&mut self, program: u32, slot: u32, name: &str);
	fn bind_frag_data_location(&mut self, program: u32, color_index: u32, name: &str);
	fn link_program(&mut self, program: u32) -> Result<(), String>;
	fn delete_program(&mut self, program: u32);
	fn is_program(&self, name: u32) -> bool;
	fn use_program(&mut self, program: Option<u32>);
	fn uniform_location(&mut self, program: u32, name: &str) -> Option<i32>;
	fn set_uniform(&mut self, program: u32, location: i32, value: &UniformValue);

	/// Attribute components are always 32 bit floats.
	fn vertex_attrib_pointer(&mut self, slot: u32, components: u32, stride: u32, offset: u32);
	fn enable_vertex_attrib(&mut self, slot: u32);
	fn disable_vertex_attrib(&mut self, slot: u32);

	fn create_texture(&mut self, desc: &TextureDesc, pixels: Option<&[u8]>) -> u32;
	fn delete_texture(&mut self, name: u32);
	fn is_texture(&self, name: u32) -> bool;
	fn bind_texture_unit(&mut self, unit: u32, name: Option<u32>);
	fn max_texture_units(&self) -> u32;

	fn create_framebuffer(&mut self) -> u32;
	fn framebuffer_attach(&mut self, framebuffer: u32, attachment: Attachment, texture: u32);
	fn framebuffer_complete(&self, framebuffer: u32) -> bool;
	fn delete_framebuffer(&mut self, name: u32);
	fn is_framebuffer(&self, name: u32) -> bool;
	fn bind_framebuffer(&mut self, name: Option<u32>);

	fn viewport(&mut self, width: u32, height: u32);
	fn clear_color(&mut self, color: [f32; 4]);
	fn clear(&mut self, mask: ClearMask);

	fn draw_arrays(&mut self, primitive: PrimitiveType, first: u32, count: u32, instances: u32);
	fn draw_elements(&mut self, primitive: PrimitiveType, count: u32, index_type: ScalarType, instances: u32);

	/// Optional capability, `None` when the backend can't attach debug labels.
	fn object_labels(&mut self) -> Option<&mut dyn ObjectLabels> {
		None
	}
}


/// Attaches human readable labels to native objects for graphics debuggers.
pub trait ObjectLabels {
	fn set_label(&mut self, kind: ResourceKind, name: u32, label: &str);
}
