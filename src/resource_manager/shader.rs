use super::{ShaderHandle, ShaderStageHandle, Resource, ResourceHeader, ResourceManager, impl_resource_store};
use crate::backend::{Backend, ShaderStage};
use crate::error::{GfxError, Result};
use crate::registry::ShaderRegistry;
use crate::vertex_layout::VertexLayout;
use std::collections::HashMap;


/// A single compiled pipeline stage, waiting to be linked into a program.
#[derive(Debug)]
pub struct SeparatedShaderObject {
	header: ResourceHeader,
	stage: ShaderStage,
	source: String,
}

impl SeparatedShaderObject {
	pub fn stage(&self) -> ShaderStage {
		self.stage
	}

	pub fn source(&self) -> &str {
		&self.source
	}

	/// Where the source came from, usually a file path or definition name.
	pub fn origin(&self) -> &str {
		&self.header.label
	}
}

impl Resource for SeparatedShaderObject {
	type Handle = ShaderStageHandle;

	fn header(&self) -> &ResourceHeader { &self.header }
	fn header_mut(&mut self) -> &mut ResourceHeader { &mut self.header }

	fn backend_alive(&self, backend: &dyn Backend) -> bool {
		backend.is_shader(self.header.name)
	}

	fn delete_native(&self, backend: &mut dyn Backend) {
		backend.delete_shader(self.header.name);
	}

	impl_resource_store!(SeparatedShaderObject, ShaderStageHandle, shader_stages);
}


/// Compiles `source` eagerly. On failure the numbered source is logged and returned.
pub(crate) fn compile_stage(backend: &mut dyn Backend, origin: &str, stage: ShaderStage, source: &str)
	-> Result<SeparatedShaderObject>
{
	match backend.compile_shader(stage, source) {
		Ok(name) => Ok(SeparatedShaderObject {
			header: ResourceHeader::new(origin, name),
			stage,
			source: source.to_owned(),
		}),

		Err(log) => {
			let listing = numbered_listing(source);
			log::error!("Failed to compile {} stage of '{origin}':\n{log}\n{listing}", stage.label());

			Err(GfxError::CompileFailure {
				label: origin.to_owned(),
				stage,
				listing,
				log,
			})
		}
	}
}


/// Prefixes every line of `source` with its 1-based line number.
pub fn numbered_listing(source: &str) -> String {
	let line_count = source.lines().count();
	let width = line_count.to_string().len();

	source.lines()
		.enumerate()
		.map(|(index, line)| format!("{:>width$} | {line}", index + 1))
		.collect::<Vec<_>>()
		.join("\n")
}



#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderState {
	Assembled,
	Linked,
}


/// A shader program.
#[derive(Debug)]
pub struct ShaderObject {
	header: ResourceHeader,
	state: ShaderState,
	stages: Vec<ShaderStageHandle>,
	registry: ShaderRegistry,

	uniform_locations: HashMap<String, Option<i32>>,
	vertex_layout: Option<VertexLayout>,
}

impl ShaderObject {
	pub fn new(label: impl Into<String>, name: u32) -> Self {
		ShaderObject {
			header: ResourceHeader::new(label, name),
			state: ShaderState::Assembled,
			stages: Vec::new(),
			registry: ShaderRegistry::new(),
			uniform_locations: HashMap::new(),
			vertex_layout: None,
		}
	}

	pub fn state(&self) -> ShaderState {
		self.state
	}

	pub fn is_linked(&self) -> bool {
		self.state == ShaderState::Linked
	}

	/// Stage units still attached. Empty once linked.
	pub fn stages(&self) -> &[ShaderStageHandle] {
		&self.stages
	}

	pub fn registry(&self) -> &ShaderRegistry {
		&self.registry
	}

	pub fn registry_mut(&mut self) -> &mut ShaderRegistry {
		&mut self.registry
	}

	/// Layout of the registered inputs, recomputed whenever they have changed.
	pub fn vertex_layout(&mut self) -> &VertexLayout {
		let registry = &self.registry;
		let layout = self.vertex_layout.get_or_insert_with(|| VertexLayout::compute(registry));

		if !layout.is_current(registry) {
			*layout = VertexLayout::compute(registry);
		}

		layout
	}

	pub(crate) fn uniform_location(&mut self, backend: &mut dyn Backend, name: &str) -> Option<i32> {
		if let Some(location) = self.uniform_locations.get(name) {
			return *location
		}

		let location = backend.uniform_location(self.header.name, name);
		self.uniform_locations.insert(name.to_owned(), location);
		location
	}

	pub(crate) fn push_stage(&mut self, stage: ShaderStageHandle) {
		self.stages.push(stage);
	}
}

impl Resource for ShaderObject {
	type Handle = ShaderHandle;

	fn header(&self) -> &ResourceHeader { &self.header }
	fn header_mut(&mut self) -> &mut ResourceHeader { &mut self.header }

	fn backend_alive(&self, backend: &dyn Backend) -> bool {
		backend.is_program(self.header.name)
	}

	fn delete_native(&self, backend: &mut dyn Backend) {
		backend.delete_program(self.header.name);
	}

	impl_resource_store!(ShaderObject, ShaderHandle, shaders);
}


/// Binds attribute and output locations, links, and discards the stage units.
///
/// On failure the program and every attached stage are disposed, so nothing from the attempt
/// remains usable.
pub(crate) fn link(resource_manager: &mut ResourceManager, backend: &mut dyn Backend, handle: ShaderHandle) -> Result<()> {
	let shader = resource_manager.live::<ShaderObject>(handle, backend)?;

	if shader.is_linked() {
		return Err(GfxError::AlreadyLinked { label: shader.label().to_owned() })
	}

	let program_name = shader.native_name();
	let label = shader.label().to_owned();
	let stage_handles = shader.stages.clone();

	let mut stage_names = Vec::with_capacity(stage_handles.len());
	for &stage in stage_handles.iter() {
		stage_names.push(resource_manager.live::<SeparatedShaderObject>(stage, backend)?.native_name());
	}

	for (slot, (name, _)) in shader.registry.inputs().enumerate() {
		backend.bind_attrib_location(program_name, slot as u32, name);
	}

	for (name, color_index) in shader.registry.outputs() {
		backend.bind_frag_data_location(program_name, color_index, name);
	}

	let result = backend.link_program(program_name);

	for &stage_name in stage_names.iter() {
		backend.detach_shader(program_name, stage_name);
	}

	for &stage in stage_handles.iter() {
		resource_manager.dispose::<SeparatedShaderObject>(stage, backend)?;
	}

	if let Err(log) = result {
		log::error!("Failed to link shader program '{label}':\n{log}");
		resource_manager.dispose::<ShaderObject>(handle, backend)?;
		return Err(GfxError::LinkFailure { label, log })
	}

	if let Some(shader) = resource_manager.get_mut::<ShaderObject>(handle) {
		shader.state = ShaderState::Linked;
		shader.stages.clear();
		shader.uniform_locations.clear();
	}

	log::debug!("linked shader program '{label}'");

	Ok(())
}
