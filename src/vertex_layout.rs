//! Per-attribute byte layout derived from a program's registered vertex inputs.
//!
//! Attributes are tightly packed, interleaved 32 bit floats in registration order. The slot of
//! each attribute is its registration index, which is bound to the name before linking.

use crate::backend::Backend;
use crate::registry::ShaderRegistry;
use crate::semantics::VertexInputType;


/// Size of a single attribute component.
pub const COMPONENT_SIZE: u32 = 4;


#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VertexAttribute {
	pub name: String,
	pub input: VertexInputType,
	pub slot: u32,
	pub components: u32,
	pub offset: u32,
}


#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VertexLayout {
	attributes: Vec<VertexAttribute>,
	stride: u32,
	generation: u64,
}

impl VertexLayout {
	pub fn compute(registry: &ShaderRegistry) -> VertexLayout {
		let mut layout = VertexLayout::from_inputs(registry.inputs());
		layout.generation = registry.input_generation();
		layout
	}

	pub fn from_inputs<'n>(inputs: impl IntoIterator<Item = (&'n str, VertexInputType)>) -> VertexLayout {
		let mut attributes = Vec::new();
		let mut offset = 0;

		for (slot, (name, input)) in inputs.into_iter().enumerate() {
			let components = input.components();

			attributes.push(VertexAttribute {
				name: name.to_owned(),
				input,
				slot: slot as u32,
				components,
				offset,
			});

			offset += components * COMPONENT_SIZE;
		}

		VertexLayout {
			attributes,
			stride: offset,
			generation: 0,
		}
	}

	pub fn attributes(&self) -> &[VertexAttribute] {
		&self.attributes
	}

	pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
		self.attributes.iter().find(|attribute| attribute.name == name)
	}

	pub fn stride(&self) -> u32 {
		self.stride
	}

	/// Whether this layout still matches the inputs `registry` holds.
	pub fn is_current(&self, registry: &ShaderRegistry) -> bool {
		self.generation == registry.input_generation()
	}

	/// Points every attribute at the currently bound vertex buffer, and disables the slots past
	/// this layout that were left enabled by one with `enabled` attributes.
	pub fn apply(&self, backend: &mut dyn Backend, enabled: u32) {
		for attribute in self.attributes.iter() {
			backend.vertex_attrib_pointer(attribute.slot, attribute.components, self.stride, attribute.offset);
			backend.enable_vertex_attrib(attribute.slot);
		}

		for slot in self.attributes.len() as u32 .. enabled {
			backend.disable_vertex_attrib(slot);
		}
	}
}



#[cfg(test)]
mod tests {
	use super::*;
	use crate::backend::headless::{Call, HeadlessBackend};
	use VertexInputType::*;

	#[test]
	fn position_then_color() {
		let layout = VertexLayout::from_inputs([("aPosition", Position3), ("aColor", ColorRgb)]);

		assert_eq!(layout.stride(), 24);
		assert_eq!(layout.attribute("aPosition").unwrap().offset, 0);
		assert_eq!(layout.attribute("aColor").unwrap().offset, 12);
		assert_eq!(layout.attribute("aColor").unwrap().slot, 1);
	}

	#[test]
	fn offsets_are_running_sums() {
		let inputs = [Position2, ColorRgba, Normal3, TexCoord1, TexCoord2, ColorGrayscale, TexCoord3, Normal2];
		let names: Vec<String> = (0..inputs.len()).map(|i| format!("a{i}")).collect();
		let layout = VertexLayout::from_inputs(names.iter().map(String::as_str).zip(inputs));

		let total: u32 = inputs.iter().map(|input| input.components()).sum();
		assert_eq!(layout.stride(), total * COMPONENT_SIZE);

		let mut expected_offset = 0;
		let mut previous = None;

		for (attribute, input) in layout.attributes().iter().zip(inputs) {
			assert_eq!(attribute.offset, expected_offset);
			assert_eq!(attribute.components, input.components());

			if let Some(previous) = previous {
				assert!(attribute.offset > previous);
			}

			previous = Some(attribute.offset);
			expected_offset += input.components() * COMPONENT_SIZE;
		}
	}

	#[test]
	fn empty_layout_has_zero_stride() {
		let layout = VertexLayout::from_inputs(std::iter::empty());
		assert_eq!(layout.stride(), 0);
		assert!(layout.attributes().is_empty());
	}

	#[test]
	fn goes_stale_when_inputs_change() {
		let mut registry = ShaderRegistry::new();
		registry.register_input("aPosition", Position3).unwrap();

		let layout = VertexLayout::compute(&registry);
		assert!(layout.is_current(&registry));

		registry.register_input("aUv", TexCoord2).unwrap();
		assert!(!layout.is_current(&registry));

		let layout = VertexLayout::compute(&registry);
		assert_eq!(layout.stride(), 20);
	}

	#[test]
	fn apply_points_and_enables_each_attribute() {
		let mut backend = HeadlessBackend::new();
		let log = backend.log();
		let layout = VertexLayout::from_inputs([("aPosition", Position3), ("aUv", TexCoord2)]);

		layout.apply(&mut backend, 0);

		assert_eq!(log.take(), [
			Call::VertexAttribPointer { slot: 0, components: 3, stride: 20, offset: 0 },
			Call::EnableVertexAttrib(0),
			Call::VertexAttribPointer { slot: 1, components: 2, stride: 20, offset: 12 },
			Call::EnableVertexAttrib(1),
		]);
	}
}
