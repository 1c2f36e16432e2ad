use super::{FramebufferHandle, TextureHandle, TextureObject, Resource, ResourceHeader, ResourceManager, impl_resource_store};
use crate::backend::{Attachment, Backend};
use crate::error::{GfxError, Result};
use std::collections::HashMap;


#[derive(Hash, Clone, Debug, Eq, PartialEq)]
pub struct FramebufferDesc {
	pub color: TextureHandle,
	pub depth: Option<TextureHandle>,
	pub stencil: Option<TextureHandle>,
}

impl FramebufferDesc {
	pub fn color(color: TextureHandle) -> FramebufferDesc {
		FramebufferDesc {
			color,
			depth: None,
			stencil: None,
		}
	}

	pub fn with_depth(mut self, depth: TextureHandle) -> FramebufferDesc {
		self.depth = Some(depth);
		self
	}

	pub fn with_stencil(mut self, stencil: TextureHandle) -> FramebufferDesc {
		self.stencil = Some(stencil);
		self
	}
}


#[derive(Debug)]
pub struct FramebufferObject {
	header: ResourceHeader,
	desc: FramebufferDesc,
	size: (u32, u32),
}

impl FramebufferObject {
	pub fn desc(&self) -> &FramebufferDesc {
		&self.desc
	}

	/// Size shared by every attachment.
	pub fn size(&self) -> (u32, u32) {
		self.size
	}
}

impl Resource for FramebufferObject {
	type Handle = FramebufferHandle;

	fn header(&self) -> &ResourceHeader { &self.header }
	fn header_mut(&mut self) -> &mut ResourceHeader { &mut self.header }

	fn backend_alive(&self, backend: &dyn Backend) -> bool {
		backend.is_framebuffer(self.header.name)
	}

	fn delete_native(&self, backend: &mut dyn Backend) {
		backend.delete_framebuffer(self.header.name);
	}

	impl_resource_store!(FramebufferObject, FramebufferHandle, framebuffers);
}


pub(crate) fn create(resource_manager: &ResourceManager, backend: &mut dyn Backend, label: &str, desc: &FramebufferDesc)
	-> Result<FramebufferObject>
{
	// Same texture for depth and stencil goes in the combined attachment point.
	let combined_depth_stencil = desc.depth.is_some() && desc.depth == desc.stencil;

	let mut attachments = vec![(Attachment::Color, desc.color)];

	if combined_depth_stencil {
		attachments.extend(desc.depth.map(|handle| (Attachment::DepthStencil, handle)));
	} else {
		attachments.extend(desc.depth.map(|handle| (Attachment::Depth, handle)));
		attachments.extend(desc.stencil.map(|handle| (Attachment::Stencil, handle)));
	}

	let mut resolved = Vec::with_capacity(attachments.len());
	let mut common_size = None;

	for (attachment, handle) in attachments {
		let texture = resource_manager.live::<TextureObject>(handle, backend)?;
		let size = texture.size();

		if let Some(expected) = common_size {
			if expected != size {
				return Err(GfxError::AttachmentMismatch {
					label: label.to_owned(),
					expected,
					found: size,
				})
			}
		}

		common_size = Some(size);
		resolved.push((attachment, texture.native_name()));
	}

	let name = backend.create_framebuffer();

	for (attachment, texture_name) in resolved {
		backend.framebuffer_attach(name, attachment, texture_name);
	}

	if !backend.framebuffer_complete(name) {
		backend.delete_framebuffer(name);
		return Err(GfxError::IncompleteFramebuffer { label: label.to_owned() })
	}

	Ok(FramebufferObject {
		header: ResourceHeader::new(label, name),
		desc: desc.clone(),
		size: common_size.unwrap_or((0, 0)),
	})
}
