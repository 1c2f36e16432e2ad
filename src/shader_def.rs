//! Declarative shader descriptions, usually authored as RON.
//!
//! ```ron
//! (
//!     name: "flat",
//!     vertex: [
//!         Input(name: "aPosition", from: Position3),
//!         Transform(name: "uModel", matrix: Model),
//!         Function(name: "main", body: "gl_Position = uModel * vec4(aPosition, 1.0);"),
//!     ],
//!     fragment: [
//!         Output(name: "oColor", to: 0),
//!         Function(name: "main", body: "oColor = vec4(1.0);"),
//!     ],
//! )
//! ```

use serde::Deserialize;

use crate::backend::ShaderStage;
use crate::error::{GfxError, Result};
use crate::semantics::{TransformRole, UniformType, VertexInputType};


#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShaderDefinition {
	pub name: String,
	pub vertex: StageDefinition,
	pub fragment: StageDefinition,
}

impl ShaderDefinition {
	/// `origin` names the source in errors, usually a path. Optional fields are written bare,
	/// without `Some(..)`.
	pub fn from_ron(source: &str, origin: &str) -> Result<ShaderDefinition> {
		ron::Options::default()
			.with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
			.from_str(source)
			.map_err(|error| GfxError::Definition {
				label: origin.to_owned(),
				reason: error.to_string(),
			})
	}

	pub fn stage(&self, stage: ShaderStage) -> &StageDefinition {
		match stage {
			ShaderStage::Vertex => &self.vertex,
			ShaderStage::Fragment => &self.fragment,
		}
	}
}


#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct StageDefinition {
	pub nodes: Vec<ShaderNode>,
}

impl From<Vec<ShaderNode>> for StageDefinition {
	fn from(nodes: Vec<ShaderNode>) -> Self {
		StageDefinition { nodes }
	}
}


/// Where generated text lands in a stage's source. Sections are emitted in declaration order.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Deserialize)]
pub enum Section {
	Prelude,
	Start,
	Structs,
	Constants,
	Inputs,
	Outputs,
	Uniforms,
	Variables,
	Functions,
	End,
}

impl Section {
	pub const ALL: [Section; 10] = [
		Section::Prelude,
		Section::Start,
		Section::Structs,
		Section::Constants,
		Section::Inputs,
		Section::Outputs,
		Section::Uniforms,
		Section::Variables,
		Section::Functions,
		Section::End,
	];

	pub fn label(self) -> &'static str {
		match self {
			Section::Prelude => "prelude",
			Section::Start => "start",
			Section::Structs => "structs",
			Section::Constants => "constants",
			Section::Inputs => "inputs",
			Section::Outputs => "outputs",
			Section::Uniforms => "uniforms",
			Section::Variables => "variables",
			Section::Functions => "functions",
			Section::End => "end",
		}
	}
}


#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum ShaderNode {
	/// Either a full `#version` line or just the version, e.g. `"330 core"`.
	Version(String),

	Struct {
		name: String,
		body: String,
	},

	Const {
		name: String,
		#[serde(rename = "type")]
		ty: String,
		value: String,
	},

	/// Vertex inputs take their type from `from`, fragment inputs need `type`.
	Input {
		name: String,
		#[serde(default)]
		from: Option<VertexInputType>,
		#[serde(rename = "type", default)]
		ty: Option<String>,
		#[serde(default)]
		qual: Option<String>,
	},

	/// Fragment outputs need `to`, the color index they write. Their type defaults to `vec4`.
	Output {
		name: String,
		#[serde(rename = "type", default)]
		ty: Option<String>,
		#[serde(default)]
		to: Option<u32>,
		#[serde(default)]
		qual: Option<String>,
	},

	/// A uniform only addressable by name.
	Uniform {
		name: String,
		#[serde(rename = "type", default)]
		ty: Option<String>,
		#[serde(default)]
		size: Option<u32>,
		#[serde(default)]
		value: Option<String>,
	},

	/// A uniform bound to a semantic role. Indexed roles need `size`.
	UniformFrom {
		name: String,
		from: UniformType,
		#[serde(rename = "type", default)]
		ty: Option<String>,
		#[serde(default)]
		size: Option<u32>,
		#[serde(default)]
		value: Option<String>,
	},

	/// Shorthand for a `mat4` uniform bound to a transform role.
	Transform {
		name: String,
		matrix: TransformRole,
	},

	Var {
		name: String,
		#[serde(rename = "type")]
		ty: String,
		#[serde(default)]
		qual: Option<String>,
		#[serde(default)]
		value: Option<String>,
	},

	Array {
		name: String,
		#[serde(rename = "type")]
		ty: String,
		#[serde(default)]
		size: Option<u32>,
		#[serde(default)]
		value: Option<String>,
	},

	Function {
		name: String,
		#[serde(rename = "type", default = "void_type")]
		ty: String,
		#[serde(default)]
		params: String,
		body: String,
	},

	Raw {
		slot: Section,
		source: String,
	},
}

fn void_type() -> String {
	"void".to_owned()
}

impl ShaderNode {
	pub fn name(&self) -> Option<&str> {
		match self {
			ShaderNode::Version(_) | ShaderNode::Raw { .. } => None,

			ShaderNode::Struct { name, .. }
			| ShaderNode::Const { name, .. }
			| ShaderNode::Input { name, .. }
			| ShaderNode::Output { name, .. }
			| ShaderNode::Uniform { name, .. }
			| ShaderNode::UniformFrom { name, .. }
			| ShaderNode::Transform { name, .. }
			| ShaderNode::Var { name, .. }
			| ShaderNode::Array { name, .. }
			| ShaderNode::Function { name, .. } => Some(name),
		}
	}

	/// The section this node's text is emitted into.
	pub fn section(&self) -> Section {
		match self {
			ShaderNode::Version(_) => Section::Prelude,
			ShaderNode::Struct { .. } => Section::Structs,
			ShaderNode::Const { .. } => Section::Constants,
			ShaderNode::Input { .. } => Section::Inputs,
			ShaderNode::Output { .. } => Section::Outputs,
			ShaderNode::Uniform { .. } | ShaderNode::UniformFrom { .. } | ShaderNode::Transform { .. } => Section::Uniforms,
			ShaderNode::Var { .. } | ShaderNode::Array { .. } => Section::Variables,
			ShaderNode::Function { .. } => Section::Functions,
			ShaderNode::Raw { slot, .. } => *slot,
		}
	}
}
