//! Closed sets of roles a shader parameter can play.

use serde::Deserialize;


/// Placeholder substituted with a decimal index when resolving indexed uniforms.
pub const INDEX_TOKEN: &str = "$INDEX";


#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Default, Deserialize)]
pub enum UniformType {
	TransformPerspective,
	TransformView,
	TransformModel,

	AmbientLightStrength,
	AmbientLightColor,

	PointLightCount,
	/// Indexed.
	PointLightPosition,
	/// Indexed.
	PointLightColor,

	ViewPosition,
	FramebufferSize,
	UiScale,

	/// Only addressable by raw name.
	#[default]
	Custom,
}

impl UniformType {
	pub fn is_indexed(self) -> bool {
		matches!(self, UniformType::PointLightPosition | UniformType::PointLightColor)
	}

	/// GLSL type used when a definition binds this role without naming a type.
	pub fn glsl_type(self) -> Option<&'static str> {
		use UniformType::*;

		match self {
			TransformPerspective | TransformView | TransformModel => Some("mat4"),
			AmbientLightStrength | UiScale => Some("float"),
			AmbientLightColor | PointLightPosition | PointLightColor | ViewPosition => Some("vec3"),
			PointLightCount => Some("int"),
			FramebufferSize => Some("vec2"),
			Custom => None,
		}
	}
}


/// Transform roles available to the `Transform` shorthand node.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Deserialize)]
pub enum TransformRole {
	Perspective,
	View,
	Model,
}

impl From<TransformRole> for UniformType {
	fn from(role: TransformRole) -> UniformType {
		match role {
			TransformRole::Perspective => UniformType::TransformPerspective,
			TransformRole::View => UniformType::TransformView,
			TransformRole::Model => UniformType::TransformModel,
		}
	}
}


#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Deserialize)]
pub enum VertexInputType {
	Position2,
	Position3,
	ColorGrayscale,
	ColorRgb,
	ColorRgba,
	Normal2,
	Normal3,
	TexCoord1,
	TexCoord2,
	TexCoord3,
}

impl VertexInputType {
	pub fn components(self) -> u32 {
		use VertexInputType::*;

		match self {
			ColorGrayscale | TexCoord1 => 1,
			Position2 | Normal2 | TexCoord2 => 2,
			Position3 | ColorRgb | Normal3 | TexCoord3 => 3,
			ColorRgba => 4,
		}
	}

	pub fn glsl_type(self) -> &'static str {
		match self.components() {
			1 => "float",
			2 => "vec2",
			3 => "vec3",
			_ => "vec4",
		}
	}
}
