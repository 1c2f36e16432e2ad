use super::{Command, DrawBatch};
use crate::backend::{PrimitiveType, UniformValue};
use crate::bind_state::BindState;
use crate::registry::UniformTarget;


#[derive(Debug, Clone)]
pub struct DrawCmd {
	/// Everything that must be bound when the draw is issued. Empty slots are unbound.
	pub required: BindState,

	pub primitive: PrimitiveType,

	// Vertices, or indices if an element buffer is required
	pub count: u32,
	pub instances: u32,

	/// Set on the required program just before drawing.
	pub uniforms: Vec<(UniformTarget, UniformValue)>,
}


/// Adjusts a queued draw. The command is queued when the builder is dropped.
pub struct DrawCmdBuilder<'b> {
	batch: &'b mut DrawBatch,
	// Only taken in drop.
	cmd: Option<DrawCmd>,
}

impl<'b> DrawCmdBuilder<'b> {
	pub fn count(&mut self, count: u32) -> &mut Self {
		if let Some(cmd) = &mut self.cmd {
			cmd.count = count;
		}
		self
	}

	pub fn instances(&mut self, instances: u32) -> &mut Self {
		if let Some(cmd) = &mut self.cmd {
			cmd.instances = instances;
		}
		self
	}

	pub fn primitive(&mut self, ty: PrimitiveType) -> &mut Self {
		if let Some(cmd) = &mut self.cmd {
			cmd.primitive = ty;
		}
		self
	}

	pub fn uniform(&mut self, target: impl Into<UniformTarget>, value: impl Into<UniformValue>) -> &mut Self {
		if let Some(cmd) = &mut self.cmd {
			cmd.uniforms.push((target.into(), value.into()));
		}
		self
	}
}

impl<'b> DrawCmdBuilder<'b> {
	pub(super) fn new(batch: &'b mut DrawBatch, cmd: DrawCmd) -> Self {
		DrawCmdBuilder {
			batch,
			cmd: Some(cmd),
		}
	}
}

impl<'b> Drop for DrawCmdBuilder<'b> {
	fn drop(&mut self) {
		if let Some(cmd) = self.cmd.take() {
			self.batch.push_cmd(Command::Draw(cmd));
		}
	}
}
