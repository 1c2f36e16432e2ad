//! Which objects are bound, and what changes between two bind states.

use crate::backend::BufferTarget;
use crate::resource_manager::{BufferHandle, ShaderHandle, TextureHandle};


#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BindState {
	pub shader: Option<ShaderHandle>,
	/// Indexed by [`BufferTarget::index`].
	pub buffers: [Option<BufferHandle>; 2],
	/// Indexed by texture unit.
	pub textures: Vec<Option<TextureHandle>>,
}

impl BindState {
	pub fn with_texture_units(units: u32) -> BindState {
		BindState {
			shader: None,
			buffers: [None; 2],
			textures: vec![None; units as usize],
		}
	}

	pub fn buffer(&self, target: BufferTarget) -> Option<BufferHandle> {
		self.buffers[target.index()]
	}

	pub fn set_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>) {
		self.buffers[target.index()] = buffer;
	}

	pub fn texture(&self, unit: u32) -> Option<TextureHandle> {
		self.textures.get(unit as usize).copied().flatten()
	}

	/// Binds needed to go from `previous` to `self`.
	///
	/// Every slot is compared on its own; a slot that is empty here but occupied in `previous`
	/// produces an unbind.
	pub fn diff(&self, previous: &BindState) -> BindDiff {
		let mut diff = BindDiff::default();

		if self.shader != previous.shader {
			diff.shader = Some(self.shader);
		}

		for target in BufferTarget::ALL {
			if self.buffer(target) != previous.buffer(target) {
				diff.buffers.push((target, self.buffer(target)));
			}
		}

		let units = self.textures.len().max(previous.textures.len()) as u32;
		for unit in 0..units {
			if self.texture(unit) != previous.texture(unit) {
				diff.textures.push((unit, self.texture(unit)));
			}
		}

		diff
	}
}


#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BindDiff {
	/// `Some(None)` unbinds the program.
	pub shader: Option<Option<ShaderHandle>>,
	pub buffers: Vec<(BufferTarget, Option<BufferHandle>)>,
	pub textures: Vec<(u32, Option<TextureHandle>)>,
}

impl BindDiff {
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Number of native bind calls this diff turns into.
	pub fn len(&self) -> usize {
		self.shader.iter().count() + self.buffers.len() + self.textures.len()
	}
}
