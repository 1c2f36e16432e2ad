use crate::backend::PrimitiveType;
use crate::resource_manager::BufferHandle;


/// Geometry ready to be queued on a draw batch.
///
/// Owns its buffers: [`Context::dispose_drawable`](crate::Context::dispose_drawable) consumes it
/// and disposes both.
#[derive(Debug, PartialEq, Eq)]
pub struct Drawable {
	pub(crate) vertex_buffer: BufferHandle,
	pub(crate) element_buffer: Option<BufferHandle>,
	pub(crate) vertex_count: u32,
	pub(crate) primitive: PrimitiveType,
}

impl Drawable {
	pub fn vertex_buffer(&self) -> BufferHandle {
		self.vertex_buffer
	}

	pub fn element_buffer(&self) -> Option<BufferHandle> {
		self.element_buffer
	}

	/// Number of vertices drawn, or of indices when an element buffer is present.
	pub fn vertex_count(&self) -> u32 {
		self.vertex_count
	}

	pub fn primitive(&self) -> PrimitiveType {
		self.primitive
	}

	pub fn with_primitive(mut self, primitive: PrimitiveType) -> Drawable {
		self.primitive = primitive;
		self
	}

	pub fn set_vertex_count(&mut self, vertex_count: u32) {
		self.vertex_count = vertex_count;
	}
}
