//! Scene lighting pushed into the semantic uniforms of the bound program.

use glam::Vec3;

use crate::context::Context;
use crate::error::{GfxError, Result};
use crate::resource_manager::ShaderHandle;
use crate::semantics::UniformType;


/// Ambient strengths closer than this are considered unchanged.
pub const AMBIENT_EPSILON: f32 = 1.0e-4;


#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointLight {
	pub position: Vec3,
	pub color: Vec3,
}

impl PointLight {
	pub fn new(position: impl Into<Vec3>, color: impl Into<Vec3>) -> PointLight {
		PointLight {
			position: position.into(),
			color: color.into(),
		}
	}
}


#[derive(Debug, Clone, PartialEq)]
struct LightSnapshot {
	shader: ShaderHandle,
	// Uniform generation of the program's registry at push time.
	uniforms: u64,
	point_lights: Vec<PointLight>,
	ambient_strength: f32,
	ambient_color: Vec3,
}


/// Lighting state owned by a [`Context`].
#[derive(Debug, Clone)]
pub struct Lighting {
	pub point_lights: Vec<PointLight>,
	pub ambient_strength: f32,
	pub ambient_color: Vec3,

	// State and target of the last successful push.
	last_push: Option<LightSnapshot>,
}

impl Default for Lighting {
	fn default() -> Self {
		Lighting {
			point_lights: Vec::new(),
			ambient_strength: 0.1,
			ambient_color: Vec3::ONE,
			last_push: None,
		}
	}
}

impl Lighting {
	pub fn add_point_light(&mut self, light: PointLight) {
		self.point_lights.push(light);
	}

	pub fn clear_point_lights(&mut self) {
		self.point_lights.clear();
	}

	pub fn set_ambient(&mut self, strength: f32, color: impl Into<Vec3>) {
		self.ambient_strength = strength;
		self.ambient_color = color.into();
	}

	/// Forces the next push to upload everything.
	pub fn invalidate(&mut self) {
		self.last_push = None;
	}

	fn is_pushed_to(&self, shader: ShaderHandle, uniforms: u64) -> bool {
		let Some(last) = &self.last_push else { return false };

		last.shader == shader
			&& last.uniforms == uniforms
			&& last.point_lights == self.point_lights
			&& (last.ambient_strength - self.ambient_strength).abs() <= AMBIENT_EPSILON
			&& last.ambient_color == self.ambient_color
	}

	fn snapshot(&self, shader: ShaderHandle, uniforms: u64) -> LightSnapshot {
		LightSnapshot {
			shader,
			uniforms,
			point_lights: self.point_lights.clone(),
			ambient_strength: self.ambient_strength,
			ambient_color: self.ambient_color,
		}
	}
}


impl Context {
	pub fn lighting(&self) -> &Lighting {
		&self.lighting
	}

	pub fn lighting_mut(&mut self) -> &mut Lighting {
		&mut self.lighting
	}

	/// Uploads lighting into the bound program unless it already holds the current state.
	/// Registering a uniform on the program after a push makes the next push upload again.
	///
	/// Returns the number of uniforms uploaded.
	pub fn push_lights(&mut self) -> Result<u32> {
		let shader = self.current_shader().ok_or(GfxError::NoShaderBound)?;
		let uniforms = self.shader_registry(shader)?.uniform_generation();

		if self.lighting.is_pushed_to(shader, uniforms) {
			log::trace!("lighting unchanged for {shader:?}, skipping push");
			return Ok(0)
		}

		let snapshot = self.lighting.snapshot(shader, uniforms);
		let mut uploads = 0;

		uploads += self.set_uniform(UniformType::AmbientLightStrength, snapshot.ambient_strength)? as u32;
		uploads += self.set_uniform(UniformType::AmbientLightColor, snapshot.ambient_color)? as u32;
		uploads += self.set_uniform(UniformType::PointLightCount, snapshot.point_lights.len() as i32)? as u32;

		for (index, light) in snapshot.point_lights.iter().enumerate() {
			let index = index as u32;
			uploads += self.set_uniform((UniformType::PointLightPosition, index), light.position)? as u32;
			uploads += self.set_uniform((UniformType::PointLightColor, index), light.color)? as u32;
		}

		log::debug!("pushed {} point lights to {shader:?} ({uploads} uniforms)", snapshot.point_lights.len());

		self.lighting.last_push = Some(snapshot);
		Ok(uploads)
	}
}



#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::backend::headless::Call;
	use crate::context::tests::*;
	use crate::resource_manager::Resource;

	/// A linked program with every lighting role registered.
	pub(crate) fn lit_shader(ctx: &mut Context) -> ShaderHandle {
		let shader = flat_shader(ctx);
		ctx.register_uniform(shader, "uAmbient", UniformType::AmbientLightStrength).unwrap();
		ctx.register_uniform(shader, "uAmbientColor", UniformType::AmbientLightColor).unwrap();
		ctx.register_uniform(shader, "uLightCount", UniformType::PointLightCount).unwrap();
		ctx.register_uniform_array(shader, "uLightPos", UniformType::PointLightPosition, 4).unwrap();
		ctx.register_uniform_array(shader, "uLightColor", UniformType::PointLightColor, 4).unwrap();
		shader
	}

	fn two_lights(ctx: &mut Context) {
		let lighting = ctx.lighting_mut();
		lighting.add_point_light(PointLight::new([0.0, 1.0, 0.0], [1.0, 1.0, 1.0]));
		lighting.add_point_light(PointLight::new([5.0, 0.0, 0.0], [1.0, 0.0, 0.0]));
		lighting.set_ambient(0.2, Vec3::ONE);
	}

	#[test]
	fn second_push_with_same_state_uploads_nothing() {
		let (mut ctx, log) = headless_context();
		let shader = lit_shader(&mut ctx);
		ctx.bind_shader(shader).unwrap();
		two_lights(&mut ctx);
		log.clear();

		// ambient strength and color, count, then position and color per light
		assert_eq!(ctx.push_lights().unwrap(), 7);
		assert!(log.calls().contains(&Call::SetUniform {
			program: ctx.resource_manager().get::<crate::resource_manager::ShaderObject>(shader).unwrap().native_name(),
			location: 2,
			value: crate::backend::UniformValue::Int(2),
		}));

		log.clear();
		assert_eq!(ctx.push_lights().unwrap(), 0);
		assert!(log.calls().is_empty());
	}

	#[test]
	fn switching_shader_forces_a_push() {
		let (mut ctx, _) = headless_context();
		let first = lit_shader(&mut ctx);
		let second = lit_shader(&mut ctx);
		two_lights(&mut ctx);

		ctx.bind_shader(first).unwrap();
		assert_eq!(ctx.push_lights().unwrap(), 7);

		ctx.bind_shader(second).unwrap();
		assert_eq!(ctx.push_lights().unwrap(), 7);
	}

	#[test]
	fn changing_a_light_forces_a_push() {
		let (mut ctx, _) = headless_context();
		let shader = lit_shader(&mut ctx);
		ctx.bind_shader(shader).unwrap();
		two_lights(&mut ctx);
		ctx.push_lights().unwrap();

		ctx.lighting_mut().point_lights[1].color = Vec3::new(0.0, 1.0, 0.0);
		assert_eq!(ctx.push_lights().unwrap(), 7);

		ctx.lighting_mut().ambient_strength += AMBIENT_EPSILON / 2.0;
		assert_eq!(ctx.push_lights().unwrap(), 0);

		ctx.lighting_mut().ambient_strength += 0.5;
		assert_eq!(ctx.push_lights().unwrap(), 7);
	}

	#[test]
	fn roles_registered_after_a_push_are_uploaded() {
		let (mut ctx, log) = headless_context();
		let shader = flat_shader(&mut ctx);
		ctx.bind_shader(shader).unwrap();

		assert_eq!(ctx.push_lights().unwrap(), 0);

		ctx.register_uniform(shader, "uAmbient", UniformType::AmbientLightStrength).unwrap();
		log.clear();
		assert_eq!(ctx.push_lights().unwrap(), 1);
		assert_eq!(log.count(|call| matches!(call, Call::SetUniform { .. })), 1);

		assert_eq!(ctx.push_lights().unwrap(), 0);
	}

	#[test]
	fn pushing_needs_a_program() {
		let (mut ctx, _) = headless_context();
		assert!(matches!(ctx.push_lights(), Err(GfxError::NoShaderBound)));
	}

	#[test]
	fn too_many_lights_fail_without_recording() {
		let (mut ctx, _) = headless_context();
		let shader = lit_shader(&mut ctx);
		ctx.bind_shader(shader).unwrap();

		for i in 0..5 {
			ctx.lighting_mut().add_point_light(PointLight::new([i as f32, 0.0, 0.0], Vec3::ONE));
		}

		assert!(matches!(ctx.push_lights(), Err(GfxError::OutOfRange { index: 4, limit: 4, .. })));

		ctx.lighting_mut().point_lights.pop();
		assert_eq!(ctx.push_lights().unwrap(), 3 + 8);
	}
}
