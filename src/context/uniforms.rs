use super::Context;
use crate::backend::UniformValue;
use crate::error::{GfxError, Result};
use crate::registry::UniformTarget;
use crate::resource_manager::{ShaderObject, TextureHandle, Resource};


impl Context {
	/// Sets a uniform of the bound program, addressed by raw name or by semantic role.
	///
	/// Returns whether anything was uploaded. A role the program never registered, or a name the
	/// program doesn't use, is a no-op.
	pub fn set_uniform(&mut self, target: impl Into<UniformTarget>, value: impl Into<UniformValue>) -> Result<bool> {
		let target = target.into();
		let shader = self.binds.shader.ok_or(GfxError::NoShaderBound)?;

		let program = self.resource_manager.live_mut::<ShaderObject>(shader, &*self.backend)?;

		let Some(name) = program.registry().resolve(&target)? else {
			log::trace!("{target:?} is not registered on '{}', ignoring", program.label());
			return Ok(false)
		};

		let Some(location) = program.uniform_location(&mut *self.backend, &name) else {
			log::trace!("'{name}' is not an active uniform of '{}', ignoring", program.label());
			return Ok(false)
		};

		let program_name = program.native_name();
		self.backend.set_uniform(program_name, location, &value.into());

		Ok(true)
	}

	/// Binds `texture` to `unit` and points a sampler uniform at it.
	pub fn set_uniform_texture(&mut self, target: impl Into<UniformTarget>, texture: TextureHandle, unit: u32) -> Result<bool> {
		self.bind_texture(texture, unit)?;
		self.set_uniform(target, UniformValue::Sampler(unit as i32))
	}
}
