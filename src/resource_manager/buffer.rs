use super::{BufferHandle, Resource, ResourceHeader, ResourceManager, impl_resource_store};
use crate::backend::{Backend, BufferTarget, ScalarType};
use std::collections::HashMap;


#[derive(Debug)]
pub struct BufferObject {
	header: ResourceHeader,
	target: BufferTarget,

	byte_len: usize,
	// Scalar type of the last upload, `None` until something is uploaded.
	scalar: Option<ScalarType>,
}

impl BufferObject {
	pub fn new(label: impl Into<String>, name: u32, target: BufferTarget) -> Self {
		BufferObject {
			header: ResourceHeader::new(label, name),
			target,
			byte_len: 0,
			scalar: None,
		}
	}

	pub fn target(&self) -> BufferTarget {
		self.target
	}

	pub fn byte_len(&self) -> usize {
		self.byte_len
	}

	pub fn scalar(&self) -> Option<ScalarType> {
		self.scalar
	}

	/// Number of scalars in the current payload.
	pub fn element_count(&self) -> usize {
		self.scalar
			.map(|scalar| self.byte_len / scalar.size_bytes())
			.unwrap_or(0)
	}

	pub(crate) fn record_upload(&mut self, byte_len: usize, scalar: ScalarType) {
		self.byte_len = byte_len;
		self.scalar = Some(scalar);
	}
}

impl Resource for BufferObject {
	type Handle = BufferHandle;

	fn header(&self) -> &ResourceHeader { &self.header }
	fn header_mut(&mut self) -> &mut ResourceHeader { &mut self.header }

	fn backend_alive(&self, backend: &dyn Backend) -> bool {
		backend.is_buffer(self.header.name)
	}

	fn delete_native(&self, backend: &mut dyn Backend) {
		backend.delete_buffer(self.header.name);
	}

	impl_resource_store!(BufferObject, BufferHandle, buffers);
}



/// Scalar types that can be uploaded into a buffer.
///
/// Every type serializes in host byte order, which is what the backend reads.
pub trait BufferScalar: Copy {
	const SCALAR: ScalarType;

	fn write_bytes(self, out: &mut [u8]);
}

macro_rules! impl_buffer_scalar {
	($($ty:ty => $scalar:ident),* $(,)?) => {
		$(
			impl BufferScalar for $ty {
				const SCALAR: ScalarType = ScalarType::$scalar;

				fn write_bytes(self, out: &mut [u8]) {
					out.copy_from_slice(&self.to_ne_bytes());
				}
			}
		)*
	};
}

impl_buffer_scalar! {
	f32 => Float,
	i32 => Int,
	u32 => UnsignedInt,
	f64 => Double,
}


/// Copies `data` into `arena` as a flat byte payload.
pub(crate) fn normalize_payload<'a, T: BufferScalar>(arena: &'a bumpalo::Bump, data: &[T]) -> &'a [u8] {
	let element_size = T::SCALAR.size_bytes();
	let bytes = arena.alloc_slice_fill_copy(data.len() * element_size, 0u8);

	for (value, chunk) in data.iter().zip(bytes.chunks_exact_mut(element_size)) {
		value.write_bytes(chunk);
	}

	bytes
}
