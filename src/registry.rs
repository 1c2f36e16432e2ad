//! Per-program maps from attribute, output and uniform names to semantic roles.

use crate::error::{GfxError, Result};
use crate::semantics::{UniformType, VertexInputType, INDEX_TOKEN};


/// How a caller addresses a uniform of the bound program.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum UniformTarget {
	Name(String),
	Semantic(UniformType),
	Indexed(UniformType, u32),
}

impl From<&str> for UniformTarget {
	fn from(name: &str) -> Self {
		UniformTarget::Name(name.to_owned())
	}
}

impl From<String> for UniformTarget {
	fn from(name: String) -> Self {
		UniformTarget::Name(name)
	}
}

impl From<UniformType> for UniformTarget {
	fn from(ty: UniformType) -> Self {
		UniformTarget::Semantic(ty)
	}
}

impl From<(UniformType, u32)> for UniformTarget {
	fn from((ty, index): (UniformType, u32)) -> Self {
		UniformTarget::Indexed(ty, index)
	}
}


#[derive(Debug, Clone)]
struct UniformEntry {
	name: String,
	ty: UniformType,
	// Array length for indexed entries, when known.
	capacity: Option<u32>,
}


#[derive(Debug, Clone, Default)]
pub struct ShaderRegistry {
	inputs: Vec<(String, VertexInputType)>,
	outputs: Vec<(String, u32)>,
	uniforms: Vec<UniformEntry>,

	input_generation: u64,
	uniform_generation: u64,
}

impl ShaderRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register_input(&mut self, name: &str, ty: VertexInputType) -> Result<()> {
		check_name("input", name)?;

		if self.inputs.iter().any(|(existing, _)| existing == name) {
			return Err(conflict("input", name))
		}

		self.inputs.push((name.to_owned(), ty));
		self.input_generation += 1;
		Ok(())
	}

	pub fn register_output(&mut self, name: &str, color_index: u32) -> Result<()> {
		check_name("output", name)?;

		if self.outputs.iter().any(|(existing, _)| existing == name) {
			return Err(conflict("output", name))
		}

		if self.outputs.iter().any(|&(_, index)| index == color_index) {
			return Err(conflict("output color index", name))
		}

		self.outputs.push((name.to_owned(), color_index));
		Ok(())
	}

	/// Registers `name` under `ty`.
	///
	/// Indexed roles need a name template containing `$INDEX`. Only one name may hold any given
	/// semantic role; `Custom` may be registered any number of times.
	pub fn register_uniform(&mut self, name: &str, ty: UniformType) -> Result<()> {
		self.insert_uniform(name.to_owned(), ty, None)
	}

	/// Registers a uniform array. Indexed roles store the template `name[$INDEX]` and reject
	/// indices at or past `len` when resolved.
	pub fn register_uniform_array(&mut self, name: &str, ty: UniformType, len: u32) -> Result<()> {
		if ty.is_indexed() {
			self.insert_uniform(format!("{name}[{INDEX_TOKEN}]"), ty, Some(len))
		} else {
			self.insert_uniform(name.to_owned(), ty, None)
		}
	}

	fn insert_uniform(&mut self, name: String, ty: UniformType, capacity: Option<u32>) -> Result<()> {
		check_name("uniform", &name)?;

		if self.uniforms.iter().any(|entry| entry.name == name) {
			return Err(conflict("uniform", &name))
		}

		if ty.is_indexed() && !name.contains(INDEX_TOKEN) {
			return Err(GfxError::MissingIndexToken { name })
		}

		if ty != UniformType::Custom && self.uniforms.iter().any(|entry| entry.ty == ty) {
			return Err(conflict("semantic uniform", &name))
		}

		self.uniforms.push(UniformEntry { name, ty, capacity });
		self.uniform_generation += 1;
		Ok(())
	}

	/// Inputs in registration order.
	pub fn inputs(&self) -> impl Iterator<Item = (&str, VertexInputType)> + '_ {
		self.inputs.iter().map(|(name, ty)| (name.as_str(), *ty))
	}

	pub fn outputs(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
		self.outputs.iter().map(|(name, index)| (name.as_str(), *index))
	}

	pub fn uniforms(&self) -> impl Iterator<Item = (&str, UniformType)> + '_ {
		self.uniforms.iter().map(|entry| (entry.name.as_str(), entry.ty))
	}

	/// Bumped whenever an input is registered.
	pub fn input_generation(&self) -> u64 {
		self.input_generation
	}

	/// Bumped whenever a uniform is registered.
	pub fn uniform_generation(&self) -> u64 {
		self.uniform_generation
	}

	pub fn input_type(&self, name: &str) -> Option<VertexInputType> {
		self.inputs.iter()
			.find(|(existing, _)| existing == name)
			.map(|(_, ty)| *ty)
	}

	pub fn output_index(&self, name: &str) -> Option<u32> {
		self.outputs.iter()
			.find(|(existing, _)| existing == name)
			.map(|(_, index)| *index)
	}

	pub fn uniform_type(&self, name: &str) -> Option<UniformType> {
		self.uniforms.iter()
			.find(|entry| entry.name == name)
			.map(|entry| entry.ty)
	}

	/// The name registered under `ty`. `Custom` never resolves, and neither do indexed roles,
	/// which only name an element through [`ShaderRegistry::resolve_uniform_indexed`].
	pub fn resolve_uniform(&self, ty: UniformType) -> Option<&str> {
		if ty == UniformType::Custom || ty.is_indexed() {
			return None
		}

		self.uniforms.iter()
			.find(|entry| entry.ty == ty)
			.map(|entry| entry.name.as_str())
	}

	/// Resolves one element of an indexed role, e.g. the position of point light `index`.
	pub fn resolve_uniform_indexed(&self, ty: UniformType, index: u32) -> Result<Option<String>> {
		if ty == UniformType::Custom {
			return Ok(None)
		}

		let Some(entry) = self.uniforms.iter().find(|entry| entry.ty == ty) else {
			return Ok(None)
		};

		if let Some(capacity) = entry.capacity {
			if index >= capacity {
				return Err(GfxError::OutOfRange { what: "indexed uniform", index, limit: capacity })
			}
		}

		if entry.name.contains(INDEX_TOKEN) {
			Ok(Some(entry.name.replace(INDEX_TOKEN, &index.to_string())))
		} else {
			Ok(Some(format!("{}[{index}]", entry.name)))
		}
	}

	pub fn resolve(&self, target: &UniformTarget) -> Result<Option<String>> {
		match target {
			UniformTarget::Name(name) => Ok(Some(name.clone())),
			UniformTarget::Semantic(ty) => Ok(self.resolve_uniform(*ty).map(str::to_owned)),
			UniformTarget::Indexed(ty, index) => self.resolve_uniform_indexed(*ty, *index),
		}
	}
}


// Names end up as C strings at the backend.
fn check_name(map: &'static str, name: &str) -> Result<()> {
	if name.is_empty() || name.contains('\0') {
		return Err(GfxError::InvalidName { map, name: name.to_owned() })
	}

	Ok(())
}

fn conflict(map: &'static str, name: &str) -> GfxError {
	GfxError::RegistrationConflict {
		map,
		name: name.to_owned(),
	}
}



#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resolves_registered_semantics() {
		let mut registry = ShaderRegistry::new();
		registry.register_uniform("tPersp", UniformType::TransformPerspective).unwrap();
		registry.register_uniform("tModel", UniformType::TransformModel).unwrap();

		assert_eq!(registry.resolve_uniform(UniformType::TransformPerspective), Some("tPersp"));
		assert_eq!(registry.resolve_uniform(UniformType::TransformModel), Some("tModel"));
		assert_eq!(registry.resolve_uniform(UniformType::TransformView), None);
	}

	#[test]
	fn duplicate_names_conflict_per_map() {
		let mut registry = ShaderRegistry::new();
		registry.register_input("aPosition", VertexInputType::Position3).unwrap();
		registry.register_uniform("aPosition", UniformType::Custom).unwrap();

		assert!(matches!(
			registry.register_input("aPosition", VertexInputType::Position2),
			Err(GfxError::RegistrationConflict { map: "input", .. })
		));
		assert!(matches!(
			registry.register_uniform("aPosition", UniformType::Custom),
			Err(GfxError::RegistrationConflict { map: "uniform", .. })
		));

		registry.register_output("fColor", 0).unwrap();
		assert!(registry.register_output("fColor", 1).is_err());
		assert!(registry.register_output("fBright", 0).is_err());
		assert_eq!(registry.output_index("fColor"), Some(0));
	}

	#[test]
	fn second_name_for_same_role_is_rejected() {
		let mut registry = ShaderRegistry::new();
		registry.register_uniform("uView", UniformType::TransformView).unwrap();

		assert!(matches!(
			registry.register_uniform("uView2", UniformType::TransformView),
			Err(GfxError::RegistrationConflict { map: "semantic uniform", .. })
		));

		registry.register_uniform("uTint", UniformType::Custom).unwrap();
		registry.register_uniform("uFade", UniformType::Custom).unwrap();
		assert_eq!(registry.resolve_uniform(UniformType::Custom), None);
	}

	#[test]
	fn resolution_is_case_sensitive() {
		let mut registry = ShaderRegistry::new();
		registry.register_uniform("uScale", UniformType::UiScale).unwrap();

		assert_eq!(registry.uniform_type("uScale"), Some(UniformType::UiScale));
		assert_eq!(registry.uniform_type("uscale"), None);
	}

	#[test]
	fn indexed_templates_substitute_index() {
		let mut registry = ShaderRegistry::new();
		registry.register_uniform("uLights[$INDEX].position", UniformType::PointLightPosition).unwrap();
		registry.register_uniform_array("uLightColors", UniformType::PointLightColor, 4).unwrap();

		assert_eq!(
			registry.resolve_uniform_indexed(UniformType::PointLightPosition, 7).unwrap().as_deref(),
			Some("uLights[7].position")
		);
		assert_eq!(
			registry.resolve_uniform_indexed(UniformType::PointLightColor, 3).unwrap().as_deref(),
			Some("uLightColors[3]")
		);
		assert!(matches!(
			registry.resolve_uniform_indexed(UniformType::PointLightColor, 4),
			Err(GfxError::OutOfRange { index: 4, limit: 4, .. })
		));
		assert_eq!(registry.resolve_uniform_indexed(UniformType::ViewPosition, 0).unwrap(), None);
	}

	#[test]
	fn indexed_roles_only_resolve_with_an_index() {
		let mut registry = ShaderRegistry::new();
		registry.register_uniform_array("uLightPos", UniformType::PointLightPosition, 4).unwrap();

		assert_eq!(registry.resolve_uniform(UniformType::PointLightPosition), None);
		assert_eq!(registry.resolve(&UniformType::PointLightPosition.into()).unwrap(), None);
		assert_eq!(
			registry.resolve(&(UniformType::PointLightPosition, 1).into()).unwrap().as_deref(),
			Some("uLightPos[1]")
		);
	}

	#[test]
	fn names_with_nul_bytes_are_rejected() {
		let mut registry = ShaderRegistry::new();

		assert!(matches!(
			registry.register_input("aPos\0ition", VertexInputType::Position3),
			Err(GfxError::InvalidName { map: "input", .. })
		));
		assert!(matches!(
			registry.register_output("oColor\0", 0),
			Err(GfxError::InvalidName { map: "output", .. })
		));
		assert!(matches!(
			registry.register_uniform("", UniformType::Custom),
			Err(GfxError::InvalidName { map: "uniform", .. })
		));

		assert_eq!(registry.inputs().count(), 0);
		assert_eq!(registry.input_generation(), 0);
		assert_eq!(registry.uniform_generation(), 0);
	}

	#[test]
	fn uniform_registration_bumps_generation() {
		let mut registry = ShaderRegistry::new();
		registry.register_uniform("uTint", UniformType::Custom).unwrap();
		registry.register_uniform_array("uLightPos", UniformType::PointLightPosition, 4).unwrap();
		assert_eq!(registry.uniform_generation(), 2);

		assert!(registry.register_uniform("uTint", UniformType::Custom).is_err());
		assert_eq!(registry.uniform_generation(), 2);
		assert_eq!(registry.input_generation(), 0);
	}

	#[test]
	fn indexed_role_requires_token() {
		let mut registry = ShaderRegistry::new();

		assert!(matches!(
			registry.register_uniform("uLightPos", UniformType::PointLightPosition),
			Err(GfxError::MissingIndexToken { .. })
		));
	}

	#[test]
	fn inputs_keep_registration_order_and_bump_generation() {
		let mut registry = ShaderRegistry::new();
		assert_eq!(registry.input_generation(), 0);

		registry.register_input("aPosition", VertexInputType::Position3).unwrap();
		registry.register_input("aColor", VertexInputType::ColorRgb).unwrap();

		let names: Vec<_> = registry.inputs().map(|(name, _)| name).collect();
		assert_eq!(names, ["aPosition", "aColor"]);
		assert_eq!(registry.input_generation(), 2);
	}

	#[test]
	fn targets_resolve_through_registry() {
		let mut registry = ShaderRegistry::new();
		registry.register_uniform("uAmbient", UniformType::AmbientLightStrength).unwrap();

		assert_eq!(registry.resolve(&"uRaw".into()).unwrap().as_deref(), Some("uRaw"));
		assert_eq!(registry.resolve(&UniformType::AmbientLightStrength.into()).unwrap().as_deref(), Some("uAmbient"));
		assert_eq!(registry.resolve(&UniformType::UiScale.into()).unwrap(), None);
	}
}
