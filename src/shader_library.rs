use std::collections::HashMap;
use std::path::Path;

use crate::assets::{AssetProvider, FsAssets};
use crate::context::Context;
use crate::error::{GfxError, Result};
use crate::resource_manager::ShaderHandle;
use crate::shader_compiler;
use crate::shader_def::ShaderDefinition;


/// Named shader definitions, compiled on first use.
#[derive(Debug, Default)]
pub struct ShaderLibrary {
	definitions: HashMap<String, ShaderDefinition>,
	compiled: HashMap<String, ShaderHandle>,
}

impl ShaderLibrary {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `definition` under its own name, replacing any previous definition of that name.
	pub fn register(&mut self, definition: ShaderDefinition) {
		let name = definition.name.clone();

		if self.definitions.insert(name.clone(), definition).is_some() {
			log::debug!("replaced shader definition '{name}'");
		}

		// A stale program stays alive until its owner disposes it.
		self.compiled.remove(&name);
	}

	pub fn register_ron(&mut self, source: &str, origin: &str) -> Result<String> {
		let definition = ShaderDefinition::from_ron(source, origin)?;
		let name = definition.name.clone();
		self.register(definition);
		Ok(name)
	}

	pub fn load(&mut self, assets: &dyn AssetProvider, path: &Path) -> Result<String> {
		let source = assets.load_text(path)?;
		self.register_ron(&source, &path.display().to_string())
	}

	/// Loads every `.ron` file in `dir`, in path order.
	pub fn load_dir(&mut self, assets: &FsAssets, dir: &Path) -> Result<Vec<String>> {
		assets.list(dir, "ron")?
			.iter()
			.map(|path| self.load(assets, path))
			.collect()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.definitions.contains_key(name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
		self.definitions.keys().map(String::as_str)
	}

	pub fn definition(&self, name: &str) -> Option<&ShaderDefinition> {
		self.definitions.get(name)
	}

	/// The compiled program for `name`, building it if it was never built or has since become
	/// invalid.
	pub fn get(&mut self, ctx: &mut Context, name: &str) -> Result<ShaderHandle> {
		if let Some(&handle) = self.compiled.get(name) {
			if ctx.is_valid(handle) {
				return Ok(handle)
			}

			log::debug!("cached program for '{name}' is no longer valid, rebuilding");
		}

		let definition = self.definitions.get(name)
			.ok_or_else(|| GfxError::UnknownShader(name.to_owned()))?;

		let handle = shader_compiler::build(ctx, definition)?;
		self.compiled.insert(name.to_owned(), handle);
		Ok(handle)
	}
}



#[cfg(test)]
mod tests {
	use super::*;
	use crate::backend::headless::Call;
	use crate::context::tests::headless_context;

	const FLAT: &str = r#"(
		name: "flat",
		vertex: [
			Input(name: "aPosition", from: Position3),
			Function(name: "main", body: "gl_Position = vec4(aPosition, 1.0);"),
		],
		fragment: [
			Output(name: "oColor", to: 0),
			Function(name: "main", body: "oColor = vec4(1.0);"),
		],
	)"#;

	fn program_count(log: &crate::backend::headless::CallLog) -> usize {
		log.count(|call| matches!(call, Call::CreateProgram(_)))
	}

	#[test]
	fn programs_are_built_once() {
		let (mut ctx, log) = headless_context();
		let mut library = ShaderLibrary::new();
		assert_eq!(library.register_ron(FLAT, "flat.ron").unwrap(), "flat");

		let first = library.get(&mut ctx, "flat").unwrap();
		let second = library.get(&mut ctx, "flat").unwrap();

		assert_eq!(first, second);
		assert_eq!(program_count(&log), 1);
	}

	#[test]
	fn disposed_programs_are_rebuilt() {
		let (mut ctx, log) = headless_context();
		let mut library = ShaderLibrary::new();
		library.register_ron(FLAT, "flat.ron").unwrap();

		let first = library.get(&mut ctx, "flat").unwrap();
		ctx.dispose(first).unwrap();

		let second = library.get(&mut ctx, "flat").unwrap();
		assert_ne!(first, second);
		assert!(ctx.is_valid(second));
		assert_eq!(program_count(&log), 2);
	}

	#[test]
	fn unknown_names_are_reported() {
		let (mut ctx, _) = headless_context();
		let mut library = ShaderLibrary::new();

		match library.get(&mut ctx, "missing") {
			Err(GfxError::UnknownShader(name)) => assert_eq!(name, "missing"),
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn loads_definitions_from_a_directory() {
		let root = std::env::temp_dir().join(format!("gl-resources-library-{}", std::process::id()));
		std::fs::create_dir_all(root.join("shaders")).unwrap();
		std::fs::write(root.join("shaders/flat.ron"), FLAT).unwrap();
		std::fs::write(root.join("shaders/readme.md"), "not a shader").unwrap();

		let assets = FsAssets::new(&root).unwrap();
		let mut library = ShaderLibrary::new();
		let loaded = library.load_dir(&assets, Path::new("shaders")).unwrap();

		assert_eq!(loaded, ["flat"]);
		assert!(library.contains("flat"));
		assert!(library.definition("flat").is_some());

		std::fs::remove_dir_all(&root).unwrap();
	}

	#[test]
	fn malformed_files_name_their_path() {
		let root = std::env::temp_dir().join(format!("gl-resources-library-bad-{}", std::process::id()));
		std::fs::create_dir_all(&root).unwrap();
		std::fs::write(root.join("broken.ron"), "(name: ").unwrap();

		let assets = FsAssets::new(&root).unwrap();
		let mut library = ShaderLibrary::new();

		match library.load(&assets, Path::new("broken.ron")) {
			Err(GfxError::Definition { label, .. }) => assert_eq!(label, "broken.ron"),
			other => panic!("unexpected {other:?}"),
		}

		std::fs::remove_dir_all(&root).unwrap();
	}
}
