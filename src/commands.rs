//! Deferred draws, replayed in order with only the binds that change between them.

use std::collections::VecDeque;

use crate::backend::BufferTarget;
use crate::context::Context;
use crate::drawable::Drawable;
use crate::error::{GfxError, Result};

pub mod draw_cmd;

pub use draw_cmd::*;


#[derive(Debug)]
pub enum Command {
	Draw(DrawCmd),
}

impl From<DrawCmd> for Command {
	fn from(cmd: DrawCmd) -> Command {
		Command::Draw(cmd)
	}
}


/// What a [`DrawBatch::run`] issued.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct BatchStats {
	pub draws: u32,
	/// Native bind calls, including unbinds.
	pub binds: u32,
	pub light_uploads: u32,
}


#[derive(Debug, Default)]
pub struct DrawBatch {
	commands: VecDeque<Command>,
	push_lights: bool,
}

impl DrawBatch {
	pub fn new() -> Self {
		Self::default()
	}

	/// Pushes the context's lighting before each draw. Pushes are skipped while the lighting and
	/// program are unchanged.
	pub fn with_lights() -> Self {
		DrawBatch {
			commands: VecDeque::new(),
			push_lights: true,
		}
	}

	pub fn request_lights(&mut self, push_lights: bool) {
		self.push_lights = push_lights;
	}

	pub fn len(&self) -> usize {
		self.commands.len()
	}

	pub fn is_empty(&self) -> bool {
		self.commands.is_empty()
	}

	pub fn clear(&mut self) {
		self.commands.clear();
	}

	pub fn push_cmd(&mut self, cmd: impl Into<Command>) {
		self.commands.push_back(cmd.into());
	}

	/// Queues `drawable` with the program and textures currently bound on `ctx`.
	pub fn draw(&mut self, ctx: &Context, drawable: &Drawable) -> Result<DrawCmdBuilder<'_>> {
		if ctx.current_shader().is_none() {
			return Err(GfxError::NoShaderBound)
		}

		let mut required = ctx.bind_state().clone();
		required.set_buffer(BufferTarget::VertexArray, Some(drawable.vertex_buffer));
		required.set_buffer(BufferTarget::ElementArray, drawable.element_buffer);

		Ok(DrawCmdBuilder::new(self, DrawCmd {
			required,
			primitive: drawable.primitive,
			count: drawable.vertex_count,
			instances: 1,
			uniforms: Vec::new(),
		}))
	}

	/// Drains the queue in order.
	///
	/// On error the remaining commands are dropped and the context keeps whatever was bound by
	/// the commands before the failing one.
	pub fn run(&mut self, ctx: &mut Context) -> Result<BatchStats> {
		let result = self.run_commands(ctx);
		self.commands.clear();
		result
	}

	fn run_commands(&mut self, ctx: &mut Context) -> Result<BatchStats> {
		let mut stats = BatchStats::default();
		let mut previous = ctx.bind_state().clone();

		while let Some(Command::Draw(cmd)) = self.commands.pop_front() {
			let diff = cmd.required.diff(&previous);
			ctx.apply_diff(&diff)?;
			stats.binds += diff.len() as u32;

			if self.push_lights {
				stats.light_uploads += ctx.push_lights()?;
			}

			for (target, value) in cmd.uniforms.iter() {
				ctx.set_uniform(target.clone(), value.clone())?;
			}

			ctx.issue_draw(cmd.primitive, cmd.count, cmd.instances)?;
			stats.draws += 1;

			previous = cmd.required;
		}

		log::trace!("ran draw batch: {stats:?}");

		Ok(stats)
	}
}
