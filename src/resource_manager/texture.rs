use super::{TextureHandle, Resource, ResourceHeader, ResourceManager, impl_resource_store};
use crate::backend::Backend;
use std::collections::HashMap;


#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Default)]
pub enum AddressingMode {
	#[default]
	Repeat,
	ClampToEdge,
	MirroredRepeat,
}

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Default)]
pub enum FilterMode {
	Nearest,
	#[default]
	Linear,
}


#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum TextureFormat {
	R8,
	Rgba8,
	Srgb8Alpha8,
	Rgba16F,
	Rgba32F,
	Depth32F,
	Depth24Stencil8,
	Stencil8,
}

impl TextureFormat {
	/// Size of one texel as uploaded by the caller.
	pub fn bytes_per_texel(self) -> usize {
		match self {
			TextureFormat::R8 | TextureFormat::Stencil8 => 1,
			TextureFormat::Rgba8 | TextureFormat::Srgb8Alpha8 => 4,
			TextureFormat::Depth32F | TextureFormat::Depth24Stencil8 => 4,
			// Half float storage is still uploaded from 32 bit floats.
			TextureFormat::Rgba16F | TextureFormat::Rgba32F => 16,
		}
	}

	pub fn has_depth(self) -> bool {
		matches!(self, TextureFormat::Depth32F | TextureFormat::Depth24Stencil8)
	}

	pub fn has_stencil(self) -> bool {
		matches!(self, TextureFormat::Stencil8 | TextureFormat::Depth24Stencil8)
	}
}


#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct TextureDesc {
	pub width: u32,
	pub height: u32,
	pub format: TextureFormat,

	pub addressing_mode: AddressingMode,
	pub minify_filter: FilterMode,
	pub magnify_filter: FilterMode,
}

impl TextureDesc {
	pub fn new(width: u32, height: u32, format: TextureFormat) -> TextureDesc {
		TextureDesc {
			width,
			height,
			format,
			addressing_mode: AddressingMode::default(),
			minify_filter: FilterMode::default(),
			magnify_filter: FilterMode::default(),
		}
	}

	/// sRGB color texture, the format decoded images are uploaded as.
	pub fn color(width: u32, height: u32) -> TextureDesc {
		TextureDesc::new(width, height, TextureFormat::Srgb8Alpha8)
	}

	pub fn render_target(width: u32, height: u32, format: TextureFormat) -> TextureDesc {
		TextureDesc::new(width, height, format)
			.clamped()
	}

	pub fn depth_stencil(width: u32, height: u32) -> TextureDesc {
		TextureDesc::render_target(width, height, TextureFormat::Depth24Stencil8)
			.nearest()
	}

	pub fn clamped(mut self) -> TextureDesc {
		self.addressing_mode = AddressingMode::ClampToEdge;
		self
	}

	pub fn nearest(mut self) -> TextureDesc {
		self.minify_filter = FilterMode::Nearest;
		self.magnify_filter = FilterMode::Nearest;
		self
	}

	pub fn size(&self) -> (u32, u32) {
		(self.width, self.height)
	}

	pub fn byte_len(&self) -> usize {
		self.width as usize * self.height as usize * self.format.bytes_per_texel()
	}
}


#[derive(Debug)]
pub struct TextureObject {
	header: ResourceHeader,
	desc: TextureDesc,
}

impl TextureObject {
	pub fn new(label: impl Into<String>, name: u32, desc: TextureDesc) -> Self {
		TextureObject {
			header: ResourceHeader::new(label, name),
			desc,
		}
	}

	pub fn desc(&self) -> &TextureDesc {
		&self.desc
	}

	pub fn size(&self) -> (u32, u32) {
		self.desc.size()
	}
}

impl Resource for TextureObject {
	type Handle = TextureHandle;

	fn header(&self) -> &ResourceHeader { &self.header }
	fn header_mut(&mut self) -> &mut ResourceHeader { &mut self.header }

	fn backend_alive(&self, backend: &dyn Backend) -> bool {
		backend.is_texture(self.header.name)
	}

	fn delete_native(&self, backend: &mut dyn Backend) {
		backend.delete_texture(self.header.name);
	}

	impl_resource_store!(TextureObject, TextureHandle, textures);
}



#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn byte_len_follows_format() {
		assert_eq!(TextureDesc::color(4, 2).byte_len(), 32);
		assert_eq!(TextureDesc::new(4, 2, TextureFormat::R8).byte_len(), 8);
		assert_eq!(TextureDesc::new(1, 1, TextureFormat::Rgba32F).byte_len(), 16);
	}

	#[test]
	fn depth_stencil_targets_are_clamped_and_nearest() {
		let desc = TextureDesc::depth_stencil(64, 64);

		assert!(desc.format.has_depth());
		assert!(desc.format.has_stencil());
		assert_eq!(desc.addressing_mode, AddressingMode::ClampToEdge);
		assert_eq!(desc.minify_filter, FilterMode::Nearest);
	}
}
