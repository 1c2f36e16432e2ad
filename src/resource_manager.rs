pub mod buffer;
pub mod shader;
pub mod texture;
pub mod framebuffer;

use std::collections::HashMap;
use std::hash::Hash;

use crate::backend::Backend;
use crate::error::{GfxError, Result};

pub use self::buffer::{BufferObject, BufferScalar};
pub use self::shader::{SeparatedShaderObject, ShaderObject, ShaderState};
pub use self::texture::{TextureObject, TextureDesc, TextureFormat, AddressingMode, FilterMode};
pub use self::framebuffer::{FramebufferObject, FramebufferDesc};



#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum ResourceKind {
	Buffer,
	ShaderStage,
	Shader,
	Texture,
	Framebuffer,
}


#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct BufferHandle(pub u32);

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct ShaderStageHandle(pub u32);

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct ShaderHandle(pub u32);

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct TextureHandle(pub u32);

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct FramebufferHandle(pub u32);


/// Kind-erased handle for operations that accept any resource.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct ResourceHandle {
	pub id: u32,
	pub kind: ResourceKind,
}

impl ResourceHandle {
	pub fn same_object(self, other: impl Into<ResourceHandle>) -> bool {
		self == other.into()
	}
}


pub trait Handle: Copy + Eq + Hash + std::fmt::Debug + Into<ResourceHandle> {
	const KIND: ResourceKind;

	fn from_id(id: u32) -> Self;
	fn id(self) -> u32;
}

macro_rules! impl_handle {
	($($handle:ident => $kind:ident),* $(,)?) => {
		$(
			impl Handle for $handle {
				const KIND: ResourceKind = ResourceKind::$kind;

				fn from_id(id: u32) -> Self { $handle(id) }
				fn id(self) -> u32 { self.0 }
			}

			impl From<$handle> for ResourceHandle {
				fn from(handle: $handle) -> ResourceHandle {
					ResourceHandle { id: handle.0, kind: ResourceKind::$kind }
				}
			}
		)*
	};
}

impl_handle! {
	BufferHandle => Buffer,
	ShaderStageHandle => ShaderStage,
	ShaderHandle => Shader,
	TextureHandle => Texture,
	FramebufferHandle => Framebuffer,
}



/// State every concrete resource carries.
#[derive(Debug, Clone)]
pub struct ResourceHeader {
	pub label: String,
	/// Backend object name.
	pub name: u32,
	pub destroyed: bool,
}

impl ResourceHeader {
	pub fn new(label: impl Into<String>, name: u32) -> Self {
		ResourceHeader {
			label: label.into(),
			name,
			destroyed: false,
		}
	}
}


/// Common contract of every resource kind.
///
/// `valid` asks the backend whether the native object still exists; a disposed resource is
/// never valid and the backend is not consulted.
pub trait Resource: Sized {
	type Handle: Handle;

	fn header(&self) -> &ResourceHeader;
	fn header_mut(&mut self) -> &mut ResourceHeader;

	fn backend_alive(&self, backend: &dyn Backend) -> bool;
	fn delete_native(&self, backend: &mut dyn Backend);

	fn store(manager: &ResourceManager) -> &HashMap<Self::Handle, Self>;
	fn store_mut(manager: &mut ResourceManager) -> &mut HashMap<Self::Handle, Self>;

	fn label(&self) -> &str {
		&self.header().label
	}

	fn native_name(&self) -> u32 {
		self.header().name
	}

	fn is_destroyed(&self) -> bool {
		self.header().destroyed
	}

	fn valid(&self, backend: &dyn Backend) -> bool {
		!self.is_destroyed() && self.backend_alive(backend)
	}
}



#[derive(Debug, Default)]
pub struct ResourceManager {
	buffers: HashMap<BufferHandle, BufferObject>,
	shader_stages: HashMap<ShaderStageHandle, SeparatedShaderObject>,
	shaders: HashMap<ShaderHandle, ShaderObject>,
	textures: HashMap<TextureHandle, TextureObject>,
	framebuffers: HashMap<FramebufferHandle, FramebufferObject>,

	counter: u32,
}

impl ResourceManager {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert<T: Resource>(&mut self, object: T) -> T::Handle {
		let handle = T::Handle::from_id(self.counter);
		self.counter += 1;

		log::debug!("created {:?} '{}' ({:?})", T::Handle::KIND, object.label(), handle);

		T::store_mut(self).insert(handle, object);
		handle
	}

	pub fn get<T: Resource>(&self, handle: T::Handle) -> Option<&T> {
		T::store(self).get(&handle)
	}

	pub fn get_mut<T: Resource>(&mut self, handle: T::Handle) -> Option<&mut T> {
		T::store_mut(self).get_mut(&handle)
	}

	/// Resolves a handle to an object the backend still considers valid.
	pub fn live<T: Resource>(&self, handle: T::Handle, backend: &dyn Backend) -> Result<&T> {
		let object = self.get::<T>(handle)
			.ok_or_else(|| unknown_object(handle))?;

		if !object.valid(backend) {
			return Err(invalid_object(object))
		}

		Ok(object)
	}

	pub fn live_mut<T: Resource>(&mut self, handle: T::Handle, backend: &dyn Backend) -> Result<&mut T> {
		let object = T::store_mut(self).get_mut(&handle)
			.ok_or_else(|| unknown_object(handle))?;

		if !object.valid(backend) {
			return Err(invalid_object(object))
		}

		Ok(object)
	}

	pub fn label_of(&self, handle: ResourceHandle) -> Option<&str> {
		match handle.kind {
			ResourceKind::Buffer => self.get::<BufferObject>(BufferHandle(handle.id)).map(Resource::label),
			ResourceKind::ShaderStage => self.get::<SeparatedShaderObject>(ShaderStageHandle(handle.id)).map(Resource::label),
			ResourceKind::Shader => self.get::<ShaderObject>(ShaderHandle(handle.id)).map(Resource::label),
			ResourceKind::Texture => self.get::<TextureObject>(TextureHandle(handle.id)).map(Resource::label),
			ResourceKind::Framebuffer => self.get::<FramebufferObject>(FramebufferHandle(handle.id)).map(Resource::label),
		}
	}

	/// Flips `destroyed` and deletes the native object. Returns false if it was already disposed.
	pub fn dispose<T: Resource>(&mut self, handle: T::Handle, backend: &mut dyn Backend) -> Result<bool> {
		let object = T::store_mut(self).get_mut(&handle)
			.ok_or_else(|| unknown_object(handle))?;

		if object.is_destroyed() {
			return Ok(false)
		}

		object.delete_native(backend);
		object.header_mut().destroyed = true;

		log::debug!("disposed {:?} '{}'", T::Handle::KIND, object.label());

		Ok(true)
	}
}


fn unknown_object<H: Handle>(handle: H) -> GfxError {
	GfxError::InvalidObject {
		kind: H::KIND,
		label: format!("#{}", handle.id()),
	}
}

pub(crate) fn invalid_object<T: Resource>(object: &T) -> GfxError {
	GfxError::InvalidObject {
		kind: T::Handle::KIND,
		label: object.label().to_owned(),
	}
}


macro_rules! impl_resource_store {
	($object:ty, $handle:ty, $field:ident) => {
		fn store(manager: &ResourceManager) -> &HashMap<$handle, $object> {
			&manager.$field
		}

		fn store_mut(manager: &mut ResourceManager) -> &mut HashMap<$handle, $object> {
			&mut manager.$field
		}
	};
}

pub(crate) use impl_resource_store;
