mod main_loop;

use std::path::Path;

use glam::{Mat4, Vec3};
use winit::event::VirtualKeyCode;

use gl_resources::*;
use main_loop::InputState;


fn main() -> anyhow::Result<()> {
	std::env::set_var("RUST_BACKTRACE", "1");

	init_logging(LoggingConfig::default());

	let assets = FsAssets::new("resource")?;

	let config = match assets.load_text(Path::new("config.ron")) {
		Ok(text) => ContextConfig::from_ron(&text)?,
		Err(error) => {
			log::info!("Using default context config: {error}");
			ContextConfig::default()
		}
	};

	main_loop::run("gl-resources", config, |ctx, input| Demo::new(ctx, input, &assets))
}



struct Demo {
	input: InputState,
	shader: ShaderHandle,

	cube: Drawable,
	floor: Drawable,
	batch: DrawBatch,

	time: f32,
}

impl Demo {
	fn new(ctx: &mut Context, input: InputState, assets: &FsAssets) -> anyhow::Result<Self> {
		let mut library = ShaderLibrary::new();
		let loaded = library.load_dir(assets, Path::new("shaders"))?;
		log::info!("Loaded shader definitions: {loaded:?}");

		let shader = library.get(ctx, "lit")?;

		let cube = cube(ctx)?;
		let floor = floor(ctx)?;

		let lighting = ctx.lighting_mut();
		lighting.set_ambient(0.15, Vec3::new(0.6, 0.7, 1.0));
		lighting.add_point_light(PointLight::new([2.0, 2.0, 2.0], [1.0, 0.8, 0.6]));
		lighting.add_point_light(PointLight::new([-2.0, 1.0, -1.0], [0.3, 0.4, 1.0]));

		Ok(Demo {
			input,
			shader,

			cube,
			floor,
			batch: DrawBatch::with_lights(),

			time: 0.0,
		})
	}
}

impl main_loop::MainLoop for Demo {
	fn present(&mut self, ctx: &mut Context) -> anyhow::Result<()> {
		ctx.start_frame();

		let speed = if self.input.is_down(VirtualKeyCode::Space) { 4.0 } else { 1.0 };
		self.time += speed / 60.0;

		ctx.set_clear_color([0.1, 0.1, 0.12, 1.0]);
		ctx.clear(ClearMask::ALL);

		let (width, height) = ctx.surface_size().unwrap_or((1, 1));
		let aspect = width.max(1) as f32 / height.max(1) as f32;

		let orbit = match self.input.cursor() {
			Some((x, _)) => (x as f32 / width.max(1) as f32 - 0.5) * std::f32::consts::PI,
			None => 0.0,
		};

		let projection = Mat4::perspective_rh_gl(std::f32::consts::PI / 3.0, aspect, 0.1, 100.0);
		let view = Mat4::look_at_rh(Vec3::new(4.0 * orbit.sin(), 2.5, 4.0 * orbit.cos()), Vec3::ZERO, Vec3::Y);

		ctx.bind_shader(self.shader)?;
		ctx.set_uniform(UniformType::TransformPerspective, projection)?;
		ctx.set_uniform(UniformType::TransformView, view)?;

		self.batch.draw(ctx, &self.floor)?
			.uniform(UniformType::TransformModel, Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)));

		self.batch.draw(ctx, &self.cube)?
			.uniform(UniformType::TransformModel, Mat4::from_rotation_y(self.time) * Mat4::from_scale(Vec3::splat(0.6)));

		let stats = self.batch.run(ctx)?;
		log::trace!("{stats:?}");

		ctx.finish_frame()?;
		Ok(())
	}
}


// Interleaved position and normal.
fn cube(ctx: &mut Context) -> anyhow::Result<Drawable> {
	let faces = [
		(Vec3::X, Vec3::Y),
		(Vec3::NEG_X, Vec3::Y),
		(Vec3::Y, Vec3::Z),
		(Vec3::NEG_Y, Vec3::Z),
		(Vec3::Z, Vec3::Y),
		(Vec3::NEG_Z, Vec3::Y),
	];

	let mut vertices = Vec::with_capacity(6 * 4 * 6);
	let mut indices = Vec::with_capacity(6 * 6);

	for (normal, up) in faces {
		let right = up.cross(normal);
		let base = (vertices.len() / 6) as u32;

		for (u, v) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
			let position = normal + right * u + up * v;
			vertices.extend_from_slice(&position.to_array());
			vertices.extend_from_slice(&normal.to_array());
		}

		indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
	}

	mesh(ctx, "cube", &vertices, &indices)
}

fn floor(ctx: &mut Context) -> anyhow::Result<Drawable> {
	let vertices = [
		-5.0, 0.0, -5.0,  0.0, 1.0, 0.0,
		-5.0, 0.0,  5.0,  0.0, 1.0, 0.0,
		 5.0, 0.0,  5.0,  0.0, 1.0, 0.0,
		 5.0, 0.0, -5.0,  0.0, 1.0, 0.0f32,
	];

	mesh(ctx, "floor", &vertices, &[0u32, 1, 2, 0, 2, 3])
}

fn mesh(ctx: &mut Context, label: &str, vertices: &[f32], indices: &[u32]) -> anyhow::Result<Drawable> {
	let vertex_buffer = ctx.create_buffer(label, BufferTarget::VertexArray)?;
	ctx.upload(vertex_buffer, vertices)?;

	let element_buffer = ctx.create_buffer(&format!("{label} indices"), BufferTarget::ElementArray)?;
	ctx.upload(element_buffer, indices)?;

	Ok(ctx.create_drawable(vertex_buffer, Some(element_buffer), indices.len() as u32)?)
}
