//! Turns a [`ShaderDefinition`] into GLSL and then into a linked program.
//!
//! Generation is a pure function of the definition and the default version line: node text is
//! bucketed into fixed [`Section`]s, sections are concatenated in order, and the result is hashed
//! with xxh3 for the annotation comment. The hash is never used as a cache key.

use std::fmt::Write as _;
use xxhash_rust::xxh3::xxh3_64;

use crate::backend::ShaderStage;
use crate::context::Context;
use crate::error::{GfxError, Result};
use crate::resource_manager::{ResourceHandle, ShaderHandle, ShaderStageHandle};
use crate::semantics::{UniformType, VertexInputType};
use crate::shader_def::{Section, ShaderDefinition, ShaderNode, StageDefinition};


/// A name registration replayed into the program's registry before linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
	Input { name: String, ty: VertexInputType },
	Output { name: String, color_index: u32 },
	Uniform { name: String, ty: UniformType },
	UniformArray { name: String, ty: UniformType, len: u32 },
}

impl Registration {
	fn describe(&self) -> String {
		match self {
			Registration::Input { name, ty } => format!("input {name}: {ty:?}"),
			Registration::Output { name, color_index } => format!("output {name}: color {color_index}"),
			Registration::Uniform { name, ty } => format!("uniform {name}: {ty:?}"),
			Registration::UniformArray { name, ty, len } => format!("uniform {name}[{len}]: {ty:?}"),
		}
	}
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedStage {
	pub stage: ShaderStage,
	pub source: String,
	/// xxh3-64 of the section text, excluding the annotation header.
	pub hash: u64,
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedShader {
	pub name: String,
	pub vertex: GeneratedStage,
	pub fragment: GeneratedStage,
	pub registrations: Vec<Registration>,
}


/// Generates both stages. `default_version` is used by stages without a `Version` node.
pub fn generate(definition: &ShaderDefinition, default_version: &str) -> Result<GeneratedShader> {
	let mut registrations = Vec::new();

	let vertex = generate_stage(definition, ShaderStage::Vertex, default_version, &mut registrations)?;
	let fragment = generate_stage(definition, ShaderStage::Fragment, default_version, &mut registrations)?;

	Ok(GeneratedShader {
		name: definition.name.clone(),
		vertex,
		fragment,
		registrations,
	})
}


fn generate_stage(definition: &ShaderDefinition, stage: ShaderStage, default_version: &str, registrations: &mut Vec<Registration>)
	-> Result<GeneratedStage>
{
	let stage_definition = definition.stage(stage);
	let label = format!("{} ({})", definition.name, stage.label());

	let invalid = |reason: String| GfxError::Definition { label: label.clone(), reason };

	let mut sections: [Vec<String>; Section::ALL.len()] = Default::default();
	let mut stage_registrations = Vec::new();

	emit_version(stage_definition, default_version, &mut sections[Section::Prelude as usize]).map_err(invalid)?;

	for node in stage_definition.nodes.iter() {
		if matches!(node, ShaderNode::Version(_)) {
			continue
		}

		let line = emit_node(node, stage, &mut stage_registrations).map_err(invalid)?;
		sections[node.section() as usize].push(line);
	}

	let mut body = String::new();

	for section in Section::ALL {
		let lines = &sections[section as usize];
		if lines.is_empty() {
			continue
		}

		let _ = writeln!(body, "// ---- {} ----", section.label());
		for line in lines.iter() {
			let _ = writeln!(body, "{line}");
		}
		body.push('\n');
	}

	let hash = xxh3_64(body.as_bytes());

	let mut source = String::new();
	let _ = writeln!(source, "// shader: {label}");
	let _ = writeln!(source, "// hash: {hash:016x}");
	for registration in stage_registrations.iter() {
		let _ = writeln!(source, "// {}", registration.describe());
	}
	source.push_str(&body);

	for registration in stage_registrations {
		// Uniforms shared between stages are registered once.
		if !registrations.contains(&registration) {
			registrations.push(registration);
		}
	}

	Ok(GeneratedStage { stage, source, hash })
}


fn emit_version(stage_definition: &StageDefinition, default_version: &str, prelude: &mut Vec<String>) -> std::result::Result<(), String> {
	let mut versions = stage_definition.nodes.iter()
		.filter_map(|node| match node {
			ShaderNode::Version(version) => Some(version.trim()),
			_ => None,
		});

	let version = versions.next();
	if versions.next().is_some() {
		return Err("more than one Version node".to_owned())
	}

	let line = match version {
		Some(version) if version.starts_with("#version") => version.to_owned(),
		Some(version) => format!("#version {version}"),
		None => default_version.to_owned(),
	};

	prelude.push(line);
	Ok(())
}


fn emit_node(node: &ShaderNode, stage: ShaderStage, registrations: &mut Vec<Registration>) -> std::result::Result<String, String> {
	if let Some(name) = node.name() {
		if name.trim().is_empty() {
			return Err(format!("{:?} node with an empty name", node.section()))
		}
	}

	let line = match node {
		ShaderNode::Version(_) => return Err("Version nodes only belong in the prelude".to_owned()),

		ShaderNode::Struct { name, body } => format!("struct {name} {{\n{}\n}};", body.trim_end()),

		ShaderNode::Const { name, ty, value } => format!("const {ty} {name} = {value};"),

		ShaderNode::Input { name, from, ty, qual } => {
			let glsl_type = match stage {
				ShaderStage::Vertex => {
					let from = from.ok_or_else(|| format!("vertex input '{name}' needs 'from'"))?;
					registrations.push(Registration::Input { name: name.clone(), ty: from });

					ty.clone().unwrap_or_else(|| from.glsl_type().to_owned())
				}

				ShaderStage::Fragment => ty.clone()
					.ok_or_else(|| format!("fragment input '{name}' needs 'type'"))?,
			};

			format!("{}in {glsl_type} {name};", qualifiers(qual))
		}

		ShaderNode::Output { name, ty, to, qual } => {
			let glsl_type = match stage {
				ShaderStage::Fragment => {
					let color_index = to.ok_or_else(|| format!("fragment output '{name}' needs 'to'"))?;
					registrations.push(Registration::Output { name: name.clone(), color_index });

					ty.clone().unwrap_or_else(|| "vec4".to_owned())
				}

				ShaderStage::Vertex => {
					if to.is_some() {
						return Err(format!("vertex output '{name}' can't target a color index"))
					}

					ty.clone().ok_or_else(|| format!("vertex output '{name}' needs 'type'"))?
				}
			};

			format!("{}out {glsl_type} {name};", qualifiers(qual))
		}

		ShaderNode::Uniform { name, ty, size, value } => {
			let ty = ty.as_ref().ok_or_else(|| format!("uniform '{name}' needs 'type'"))?;
			uniform_declaration(name, ty, *size, value.as_deref())
		}

		ShaderNode::UniformFrom { name, from, ty, size, value } => {
			let ty = ty.as_deref()
				.or_else(|| from.glsl_type())
				.ok_or_else(|| format!("uniform '{name}' bound to {from:?} needs 'type'"))?;

			let registration = match (from.is_indexed(), *size) {
				(true, Some(len)) => Registration::UniformArray { name: name.clone(), ty: *from, len },
				(true, None) => return Err(format!("uniform '{name}' bound to indexed {from:?} needs 'size'")),
				(false, _) => Registration::Uniform { name: name.clone(), ty: *from },
			};

			registrations.push(registration);
			uniform_declaration(name, ty, *size, value.as_deref())
		}

		ShaderNode::Transform { name, matrix } => {
			registrations.push(Registration::Uniform { name: name.clone(), ty: (*matrix).into() });
			format!("uniform mat4 {name};")
		}

		ShaderNode::Var { name, ty, qual, value } => match value {
			Some(value) => format!("{}{ty} {name} = {value};", qualifiers(qual)),
			None => format!("{}{ty} {name};", qualifiers(qual)),
		},

		ShaderNode::Array { name, ty, size, value } => {
			let size = size.ok_or_else(|| format!("array '{name}' needs 'size'"))?;

			match value {
				Some(value) => format!("{ty} {name}[{size}] = {value};"),
				None => format!("{ty} {name}[{size}];"),
			}
		}

		ShaderNode::Function { name, ty, params, body } => {
			format!("{ty} {name}({params}) {{\n{}\n}}", indent(body.trim()))
		}

		ShaderNode::Raw { source, .. } => source.trim_end().to_owned(),
	};

	Ok(line)
}


fn uniform_declaration(name: &str, ty: &str, size: Option<u32>, value: Option<&str>) -> String {
	let array = size.map(|size| format!("[{size}]")).unwrap_or_default();

	match value {
		Some(value) => format!("uniform {ty} {name}{array} = {value};"),
		None => format!("uniform {ty} {name}{array};"),
	}
}

/// `"flat, centroid"` becomes `"flat centroid "`.
fn qualifiers(qual: &Option<String>) -> String {
	let Some(qual) = qual else { return String::new() };

	qual.split(',')
		.map(str::trim)
		.filter(|qualifier| !qualifier.is_empty())
		.map(|qualifier| format!("{qualifier} "))
		.collect()
}

fn indent(body: &str) -> String {
	body.lines()
		.map(|line| format!("\t{}", line.trim_start()))
		.collect::<Vec<_>>()
		.join("\n")
}



/// Generates, compiles and links `definition`.
///
/// Nothing created along the way survives a failure.
pub fn build(ctx: &mut Context, definition: &ShaderDefinition) -> Result<ShaderHandle> {
	let generated = generate(definition, &ctx.config().glsl_version)?;

	if ctx.config().log_generated_sources {
		log::debug!("generated vertex stage of '{}':\n{}", generated.name, generated.vertex.source);
		log::debug!("generated fragment stage of '{}':\n{}", generated.name, generated.fragment.source);
	}

	let vertex_origin = format!("{} (vertex)", generated.name);
	let fragment_origin = format!("{} (fragment)", generated.name);

	let vertex = ctx.create_shader_stage(&vertex_origin, ShaderStage::Vertex, &generated.vertex.source)?;

	let fragment = match ctx.create_shader_stage(&fragment_origin, ShaderStage::Fragment, &generated.fragment.source) {
		Ok(fragment) => fragment,
		Err(error) => {
			discard(ctx, [vertex.into()]);
			return Err(error)
		}
	};

	let shader = match ctx.create_shader(&generated.name) {
		Ok(shader) => shader,
		Err(error) => {
			discard(ctx, [vertex.into(), fragment.into()]);
			return Err(error)
		}
	};

	if let Err(error) = assemble(ctx, shader, [vertex, fragment], &generated.registrations) {
		discard(ctx, [shader.into(), vertex.into(), fragment.into()]);
		return Err(error)
	}

	log::debug!("built shader '{}' (vertex {:016x}, fragment {:016x})",
		generated.name, generated.vertex.hash, generated.fragment.hash);

	Ok(shader)
}


fn assemble(ctx: &mut Context, shader: ShaderHandle, stages: [ShaderStageHandle; 2], registrations: &[Registration]) -> Result<()> {
	for stage in stages {
		ctx.attach_stage(shader, stage)?;
	}

	for registration in registrations {
		match registration {
			Registration::Input { name, ty } => ctx.register_input(shader, name, *ty)?,
			Registration::Output { name, color_index } => ctx.register_output(shader, name, *color_index)?,
			Registration::Uniform { name, ty } => ctx.register_uniform(shader, name, *ty)?,
			Registration::UniformArray { name, ty, len } => ctx.register_uniform_array(shader, name, *ty, *len)?,
		}
	}

	ctx.link_shader(shader)
}


fn discard<const N: usize>(ctx: &mut Context, handles: [ResourceHandle; N]) {
	for handle in handles {
		if let Err(error) = ctx.dispose(handle) {
			log::warn!("Failed to clean up {handle:?} after a failed shader build: {error}");
		}
	}
}



#[cfg(test)]
mod tests {
	use super::*;
	use crate::backend::headless::Call;
	use crate::context::tests::headless_context;

	const LIT: &str = r##"(
		name: "lit",
		vertex: [
			Input(name: "aPosition", from: Position3),
			Input(name: "aNormal", from: Normal3),
			Output(name: "vNormal", type: "vec3"),
			Transform(name: "uProjection", matrix: Perspective),
			Transform(name: "uModel", matrix: Model),
			Function(name: "main", body: "
				vNormal = aNormal;
				gl_Position = uProjection * uModel * vec4(aPosition, 1.0);
			"),
		],
		fragment: [
			Struct(name: "Light", body: "vec3 position;\nvec3 color;"),
			Const(name: "MAX_LIGHTS", type: "int", value: "4"),
			Input(name: "vNormal", type: "vec3", qual: "smooth"),
			Output(name: "oColor", to: 0),
			UniformFrom(name: "uAmbient", from: AmbientLightStrength),
			UniformFrom(name: "uLightPos", from: PointLightPosition, size: 4),
			Uniform(name: "uTint", type: "vec3", value: "vec3(1.0)"),
			Raw(slot: Start, source: "#define LIT 1"),
			Function(name: "main", body: "oColor = vec4(uTint * uAmbient, 1.0);"),
		],
	)"##;

	fn lit() -> ShaderDefinition {
		ShaderDefinition::from_ron(LIT, "lit.ron").unwrap()
	}

	#[test]
	fn generation_is_deterministic() {
		let first = generate(&lit(), "#version 450 core").unwrap();
		let second = generate(&lit(), "#version 450 core").unwrap();

		assert_eq!(first, second);
		assert_eq!(first.fragment.hash, second.fragment.hash);
		assert_ne!(first.vertex.hash, first.fragment.hash);
	}

	#[test]
	fn sections_appear_in_fixed_order() {
		let generated = generate(&lit(), "#version 450 core").unwrap();
		let source = &generated.fragment.source;

		let position = |needle: &str| source.find(needle).unwrap_or_else(|| panic!("missing {needle} in\n{source}"));

		let order = [
			position("// ---- prelude ----"),
			position("#version 450 core"),
			position("// ---- start ----"),
			position("#define LIT 1"),
			position("// ---- structs ----"),
			position("struct Light {"),
			position("// ---- constants ----"),
			position("const int MAX_LIGHTS = 4;"),
			position("// ---- inputs ----"),
			position("smooth in vec3 vNormal;"),
			position("// ---- outputs ----"),
			position("out vec4 oColor;"),
			position("// ---- uniforms ----"),
			position("uniform float uAmbient;"),
			position("uniform vec3 uLightPos[4];"),
			position("uniform vec3 uTint = vec3(1.0);"),
			position("// ---- functions ----"),
			position("void main() {"),
		];

		assert!(order.windows(2).all(|pair| pair[0] < pair[1]), "{source}");
		assert!(!source.contains("// ---- variables ----"));
		assert!(!source.contains("// ---- end ----"));
	}

	#[test]
	fn header_summarises_registrations_and_hash() {
		let generated = generate(&lit(), "#version 450 core").unwrap();
		let lines: Vec<_> = generated.vertex.source.lines().collect();

		assert_eq!(lines[0], "// shader: lit (vertex)");
		assert_eq!(lines[1], format!("// hash: {:016x}", generated.vertex.hash));
		assert_eq!(lines[2], "// input aPosition: Position3");
		assert_eq!(lines[3], "// input aNormal: Normal3");
		assert_eq!(lines[4], "// uniform uProjection: TransformPerspective");
		assert_eq!(lines[5], "// uniform uModel: TransformModel");
		assert_eq!(lines[6], "// ---- prelude ----");

		assert!(generated.fragment.source.contains("// uniform uLightPos[4]: PointLightPosition"));
		assert!(generated.fragment.source.contains("// output oColor: color 0"));
	}

	#[test]
	fn version_node_overrides_default() {
		let mut definition = lit();
		definition.vertex.nodes.insert(0, ShaderNode::Version("330 core".into()));

		let generated = generate(&definition, "#version 450 core").unwrap();
		assert!(generated.vertex.source.contains("\n#version 330 core\n"));
		assert!(generated.fragment.source.contains("\n#version 450 core\n"));
	}

	#[test]
	fn invalid_nodes_are_reported() {
		let cases = [
			(ShaderStage::Vertex, ShaderNode::Input { name: "aPos".into(), from: None, ty: None, qual: None }, "needs 'from'"),
			(ShaderStage::Fragment, ShaderNode::Input { name: "vUv".into(), from: None, ty: None, qual: None }, "needs 'type'"),
			(ShaderStage::Fragment, ShaderNode::Output { name: "oColor".into(), ty: None, to: None, qual: None }, "needs 'to'"),
			(ShaderStage::Fragment, ShaderNode::Uniform { name: "uTint".into(), ty: None, size: None, value: None }, "needs 'type'"),
			(ShaderStage::Vertex, ShaderNode::Array { name: "weights".into(), ty: "float".into(), size: None, value: None }, "needs 'size'"),
			(ShaderStage::Vertex, ShaderNode::UniformFrom {
				name: "uLightColor".into(), from: UniformType::PointLightColor, ty: None, size: None, value: None,
			}, "needs 'size'"),
		];

		for (stage, node, expected) in cases {
			let mut definition = lit();
			match stage {
				ShaderStage::Vertex => definition.vertex.nodes.push(node),
				ShaderStage::Fragment => definition.fragment.nodes.push(node),
			}

			match generate(&definition, "#version 450 core") {
				Err(GfxError::Definition { reason, .. }) => assert!(reason.contains(expected), "{reason}"),
				other => panic!("expected a definition error, got {other:?}"),
			}
		}
	}

	#[test]
	fn built_programs_carry_the_registry() {
		let (mut ctx, _) = headless_context();
		let shader = build(&mut ctx, &lit()).unwrap();

		let registry = ctx.shader_registry(shader).unwrap();
		assert_eq!(registry.resolve_uniform(UniformType::TransformModel), Some("uModel"));
		assert_eq!(registry.resolve_uniform_indexed(UniformType::PointLightPosition, 2).unwrap().as_deref(), Some("uLightPos[2]"));
		assert_eq!(registry.output_index("oColor"), Some(0));

		let layout = ctx.vertex_layout(shader).unwrap();
		assert_eq!(layout.stride(), 24);
		assert_eq!(layout.attribute("aNormal").map(|attribute| attribute.offset), Some(12));

		ctx.bind_shader(shader).unwrap();
	}

	#[test]
	fn compile_failure_cleans_up() {
		let (mut ctx, log) = headless_context();
		let mut definition = lit();
		definition.fragment.nodes.push(ShaderNode::Raw { slot: Section::End, source: "#error unfinished".into() });

		match build(&mut ctx, &definition) {
			Err(GfxError::CompileFailure { stage, listing, .. }) => {
				assert_eq!(stage, ShaderStage::Fragment);
				assert!(listing.lines().any(|line| line.ends_with("| #error unfinished")), "{listing}");
			}
			other => panic!("unexpected {other:?}"),
		}

		assert_eq!(log.count(|call| matches!(call, Call::CreateProgram(_))), 0);
		assert_eq!(log.count(|call| matches!(call, Call::DeleteShader(_))), 1);
	}

	#[test]
	fn link_failure_cleans_up() {
		let (mut ctx, log) = headless_context();
		let mut definition = lit();
		definition.fragment.nodes.retain(|node| !matches!(node, ShaderNode::Function { .. }));

		assert!(matches!(build(&mut ctx, &definition), Err(GfxError::LinkFailure { .. })));

		let programs: Vec<u32> = log.calls().into_iter()
			.filter_map(|call| match call { Call::CreateProgram(name) => Some(name), _ => None })
			.collect();

		assert_eq!(programs.len(), 1);
		assert!(!ctx.backend().is_program(programs[0]));
		assert_eq!(log.count(|call| matches!(call, Call::DeleteShader(_))), 2);
	}
}
