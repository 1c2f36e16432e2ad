//! A backend that records every call instead of talking to a GPU.
//!
//! Object names are handed out from a counter and tracked so that `is_*` queries behave like a
//! real driver. Compilation rejects sources containing an `#error` directive and linking rejects
//! programs whose stages lack a `main` function, which is enough to exercise failure paths.

use super::{Attachment, Backend, BufferTarget, ClearMask, ObjectLabels, PrimitiveType, ScalarType, ShaderStage, UniformValue};
use crate::resource_manager::{ResourceKind, TextureDesc};

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;


pub const HEADLESS_TEXTURE_UNITS: u32 = 16;


#[derive(Debug, Clone, PartialEq)]
pub enum Call {
	CreateBuffer(u32),
	BufferData { name: u32, len: usize },
	DeleteBuffer(u32),
	BindBuffer(BufferTarget, Option<u32>),

	CompileShader { stage: ShaderStage, name: Option<u32> },
	DeleteShader(u32),

	CreateProgram(u32),
	AttachShader { program: u32, shader: u32 },
	DetachShader { program: u32, shader: u32 },
	BindAttribLocation { program: u32, slot: u32, name: String },
	BindFragDataLocation { program: u32, color_index: u32, name: String },
	LinkProgram { program: u32, success: bool },
	DeleteProgram(u32),
	UseProgram(Option<u32>),
	SetUniform { program: u32, location: i32, value: UniformValue },

	VertexAttribPointer { slot: u32, components: u32, stride: u32, offset: u32 },
	EnableVertexAttrib(u32),
	DisableVertexAttrib(u32),

	CreateTexture(u32),
	DeleteTexture(u32),
	BindTextureUnit { unit: u32, name: Option<u32> },

	CreateFramebuffer(u32),
	FramebufferAttach { framebuffer: u32, attachment: Attachment, texture: u32 },
	DeleteFramebuffer(u32),
	BindFramebuffer(Option<u32>),

	Viewport(u32, u32),
	ClearColor([f32; 4]),
	Clear(ClearMask),

	DrawArrays { primitive: PrimitiveType, first: u32, count: u32, instances: u32 },
	DrawElements { primitive: PrimitiveType, count: u32, index_type: ScalarType, instances: u32 },
}

impl Call {
	/// Calls that change native bind state.
	pub fn is_bind(&self) -> bool {
		matches!(self,
			Call::BindBuffer(..)
			| Call::UseProgram(_)
			| Call::BindTextureUnit { .. }
			| Call::BindFramebuffer(_))
	}

	pub fn is_draw(&self) -> bool {
		matches!(self, Call::DrawArrays { .. } | Call::DrawElements { .. })
	}
}


#[derive(Debug, Default)]
struct HeadlessProgram {
	attached: Vec<u32>,
	linked: bool,
	// Sources captured at link time, used to decide which uniforms exist.
	linked_sources: Vec<String>,
	locations: HashMap<String, i32>,
}


#[derive(Debug, Default)]
struct HeadlessState {
	calls: Vec<Call>,
	next_name: u32,

	buffers: HashMap<u32, Vec<u8>>,
	shaders: HashMap<u32, (ShaderStage, String)>,
	programs: HashMap<u32, HeadlessProgram>,
	textures: HashMap<u32, TextureDesc>,
	framebuffers: HashMap<u32, Vec<(Attachment, u32)>>,

	labels: HashMap<(ResourceKind, u32), String>,
}

impl HeadlessState {
	fn allocate_name(&mut self) -> u32 {
		self.next_name += 1;
		self.next_name
	}
}


/// Shared view of a [`HeadlessBackend`]'s recorded calls and object tables.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<HeadlessState>>);

impl CallLog {
	pub fn calls(&self) -> Vec<Call> {
		self.0.borrow().calls.clone()
	}

	/// Drains the recorded calls.
	pub fn take(&self) -> Vec<Call> {
		std::mem::take(&mut self.0.borrow_mut().calls)
	}

	pub fn clear(&self) {
		self.0.borrow_mut().calls.clear();
	}

	pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
		self.0.borrow().calls.iter().filter(|call| predicate(call)).count()
	}

	pub fn buffer_contents(&self, name: u32) -> Option<Vec<u8>> {
		self.0.borrow().buffers.get(&name).cloned()
	}

	pub fn label(&self, kind: ResourceKind, name: u32) -> Option<String> {
		self.0.borrow().labels.get(&(kind, name)).cloned()
	}

	/// Forgets a native object as if the driver had dropped it.
	pub fn lose_object(&self, name: u32) {
		let mut state = self.0.borrow_mut();
		state.buffers.remove(&name);
		state.shaders.remove(&name);
		state.programs.remove(&name);
		state.textures.remove(&name);
		state.framebuffers.remove(&name);
	}
}


#[derive(Debug, Default)]
pub struct HeadlessBackend {
	log: CallLog,
}

impl HeadlessBackend {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn log(&self) -> CallLog {
		self.log.clone()
	}

	fn record(&self, call: Call) {
		self.log.0.borrow_mut().calls.push(call);
	}

	fn state(&self) -> std::cell::RefMut<'_, HeadlessState> {
		self.log.0.borrow_mut()
	}
}


impl Backend for HeadlessBackend {
	fn create_buffer(&mut self) -> u32 {
		let name = {
			let mut state = self.state();
			let name = state.allocate_name();
			state.buffers.insert(name, Vec::new());
			name
		};

		self.record(Call::CreateBuffer(name));
		name
	}

	fn buffer_data(&mut self, name: u32, data: &[u8]) {
		if let Some(contents) = self.state().buffers.get_mut(&name) {
			*contents = data.to_vec();
		}

		self.record(Call::BufferData { name, len: data.len() });
	}

	fn delete_buffer(&mut self, name: u32) {
		self.state().buffers.remove(&name);
		self.record(Call::DeleteBuffer(name));
	}

	fn is_buffer(&self, name: u32) -> bool {
		self.log.0.borrow().buffers.contains_key(&name)
	}

	fn bind_buffer(&mut self, target: BufferTarget, name: Option<u32>) {
		self.record(Call::BindBuffer(target, name));
	}


	fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<u32, String> {
		let error_line = source.lines()
			.position(|line| line.trim_start().starts_with("#error"));

		if let Some(line) = error_line {
			self.record(Call::CompileShader { stage, name: None });
			return Err(format!("0:{}: '#error' : error directive encountered", line + 1))
		}

		let name = {
			let mut state = self.state();
			let name = state.allocate_name();
			state.shaders.insert(name, (stage, source.to_owned()));
			name
		};

		self.record(Call::CompileShader { stage, name: Some(name) });
		Ok(name)
	}

	fn delete_shader(&mut self, name: u32) {
		self.state().shaders.remove(&name);
		self.record(Call::DeleteShader(name));
	}

	fn is_shader(&self, name: u32) -> bool {
		self.log.0.borrow().shaders.contains_key(&name)
	}


	fn create_program(&mut self) -> u32 {
		let name = {
			let mut state = self.state();
			let name = state.allocate_name();
			state.programs.insert(name, HeadlessProgram::default());
			name
		};

		self.record(Call::CreateProgram(name));
		name
	}

	fn attach_shader(&mut self, program: u32, shader: u32) {
		if let Some(object) = self.state().programs.get_mut(&program) {
			object.attached.push(shader);
		}

		self.record(Call::AttachShader { program, shader });
	}

	fn detach_shader(&mut self, program: u32, shader: u32) {
		if let Some(object) = self.state().programs.get_mut(&program) {
			object.attached.retain(|&attached| attached != shader);
		}

		self.record(Call::DetachShader { program, shader });
	}

	fn bind_attrib_location(&mut self, program: u32, slot: u32, name: &str) {
		self.record(Call::BindAttribLocation { program, slot, name: name.to_owned() });
	}

	fn bind_frag_data_location(&mut self, program: u32, color_index: u32, name: &str) {
		self.record(Call::BindFragDataLocation { program, color_index, name: name.to_owned() });
	}

	fn link_program(&mut self, program: u32) -> Result<(), String> {
		let result = {
			let mut state = self.state();
			let state = &mut *state;

			match state.programs.get_mut(&program) {
				None => Err(format!("program {program} does not exist")),
				Some(object) => {
					let sources: Vec<String> = object.attached.iter()
						.filter_map(|shader| state.shaders.get(shader))
						.map(|(_, source)| source.clone())
						.collect();

					if sources.is_empty() {
						Err("no shaders attached".to_owned())
					} else if let Some(missing) = sources.iter().position(|source| !source.contains("main(")) {
						Err(format!("attached shader {missing} has no main function"))
					} else {
						object.linked = true;
						object.linked_sources = sources;
						Ok(())
					}
				}
			}
		};

		self.record(Call::LinkProgram { program, success: result.is_ok() });
		result
	}

	fn delete_program(&mut self, program: u32) {
		self.state().programs.remove(&program);
		self.record(Call::DeleteProgram(program));
	}

	fn is_program(&self, name: u32) -> bool {
		self.log.0.borrow().programs.contains_key(&name)
	}

	fn use_program(&mut self, program: Option<u32>) {
		self.record(Call::UseProgram(program));
	}

	fn uniform_location(&mut self, program: u32, name: &str) -> Option<i32> {
		let mut state = self.state();
		let object = state.programs.get_mut(&program)?;

		if !object.linked {
			return None
		}

		let base = name.split(['[', '.']).next().unwrap_or(name);
		if !object.linked_sources.iter().any(|source| source.contains(base)) {
			return None
		}

		let next_location = object.locations.len() as i32;
		Some(*object.locations.entry(name.to_owned()).or_insert(next_location))
	}

	fn set_uniform(&mut self, program: u32, location: i32, value: &UniformValue) {
		self.record(Call::SetUniform { program, location, value: value.clone() });
	}


	fn vertex_attrib_pointer(&mut self, slot: u32, components: u32, stride: u32, offset: u32) {
		self.record(Call::VertexAttribPointer { slot, components, stride, offset });
	}

	fn enable_vertex_attrib(&mut self, slot: u32) {
		self.record(Call::EnableVertexAttrib(slot));
	}

	fn disable_vertex_attrib(&mut self, slot: u32) {
		self.record(Call::DisableVertexAttrib(slot));
	}


	fn create_texture(&mut self, desc: &TextureDesc, _pixels: Option<&[u8]>) -> u32 {
		let name = {
			let mut state = self.state();
			let name = state.allocate_name();
			state.textures.insert(name, desc.clone());
			name
		};

		self.record(Call::CreateTexture(name));
		name
	}

	fn delete_texture(&mut self, name: u32) {
		self.state().textures.remove(&name);
		self.record(Call::DeleteTexture(name));
	}

	fn is_texture(&self, name: u32) -> bool {
		self.log.0.borrow().textures.contains_key(&name)
	}

	fn bind_texture_unit(&mut self, unit: u32, name: Option<u32>) {
		self.record(Call::BindTextureUnit { unit, name });
	}

	fn max_texture_units(&self) -> u32 {
		HEADLESS_TEXTURE_UNITS
	}


	fn create_framebuffer(&mut self) -> u32 {
		let name = {
			let mut state = self.state();
			let name = state.allocate_name();
			state.framebuffers.insert(name, Vec::new());
			name
		};

		self.record(Call::CreateFramebuffer(name));
		name
	}

	fn framebuffer_attach(&mut self, framebuffer: u32, attachment: Attachment, texture: u32) {
		if let Some(attachments) = self.state().framebuffers.get_mut(&framebuffer) {
			attachments.push((attachment, texture));
		}

		self.record(Call::FramebufferAttach { framebuffer, attachment, texture });
	}

	fn framebuffer_complete(&self, framebuffer: u32) -> bool {
		let state = self.log.0.borrow();

		state.framebuffers.get(&framebuffer)
			.map(|attachments| {
				attachments.iter().any(|&(attachment, texture)| {
					attachment == Attachment::Color && state.textures.contains_key(&texture)
				})
			})
			.unwrap_or(false)
	}

	fn delete_framebuffer(&mut self, name: u32) {
		self.state().framebuffers.remove(&name);
		self.record(Call::DeleteFramebuffer(name));
	}

	fn is_framebuffer(&self, name: u32) -> bool {
		self.log.0.borrow().framebuffers.contains_key(&name)
	}

	fn bind_framebuffer(&mut self, name: Option<u32>) {
		self.record(Call::BindFramebuffer(name));
	}


	fn viewport(&mut self, width: u32, height: u32) {
		self.record(Call::Viewport(width, height));
	}

	fn clear_color(&mut self, color: [f32; 4]) {
		self.record(Call::ClearColor(color));
	}

	fn clear(&mut self, mask: ClearMask) {
		self.record(Call::Clear(mask));
	}

	fn draw_arrays(&mut self, primitive: PrimitiveType, first: u32, count: u32, instances: u32) {
		self.record(Call::DrawArrays { primitive, first, count, instances });
	}

	fn draw_elements(&mut self, primitive: PrimitiveType, count: u32, index_type: ScalarType, instances: u32) {
		self.record(Call::DrawElements { primitive, count, index_type, instances });
	}

	fn object_labels(&mut self) -> Option<&mut dyn ObjectLabels> {
		Some(self)
	}
}

impl ObjectLabels for HeadlessBackend {
	fn set_label(&mut self, kind: ResourceKind, name: u32, label: &str) {
		self.state().labels.insert((kind, name), label.to_owned());
	}
}



#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn compile_reports_error_line() {
		let mut backend = HeadlessBackend::new();
		let error = backend.compile_shader(ShaderStage::Vertex, "#version 450\n#error nope\n").unwrap_err();
		assert!(error.starts_with("0:2:"), "{error}");
	}

	#[test]
	fn link_requires_main() {
		let mut backend = HeadlessBackend::new();
		let program = backend.create_program();
		let shader = backend.compile_shader(ShaderStage::Fragment, "void helper() {}").unwrap();
		backend.attach_shader(program, shader);

		assert!(backend.link_program(program).is_err());
	}

	#[test]
	fn uniform_locations_only_exist_for_referenced_names() {
		let mut backend = HeadlessBackend::new();
		let program = backend.create_program();
		let shader = backend.compile_shader(ShaderStage::Vertex, "uniform mat4 uModel;\nvoid main() {}").unwrap();
		backend.attach_shader(program, shader);

		assert_eq!(backend.uniform_location(program, "uModel"), None);

		backend.link_program(program).unwrap();
		let location = backend.uniform_location(program, "uModel");
		assert!(location.is_some());
		assert_eq!(backend.uniform_location(program, "uModel"), location);
		assert_eq!(backend.uniform_location(program, "uMissing"), None);
	}

	#[test]
	fn lost_objects_stop_existing() {
		let mut backend = HeadlessBackend::new();
		let texture = backend.create_texture(&TextureDesc::color(4, 4), None);
		assert!(backend.is_texture(texture));

		backend.log().lose_object(texture);
		assert!(!backend.is_texture(texture));
	}
}
