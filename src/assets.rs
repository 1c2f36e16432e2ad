//! Where shader definitions and other text assets come from.

use std::path::{Path, PathBuf};


pub trait AssetProvider {
	fn load_bytes(&self, path: &Path) -> anyhow::Result<Vec<u8>>;

	fn load_text(&self, path: &Path) -> anyhow::Result<String> {
		let bytes = self.load_bytes(path)?;
		Ok(String::from_utf8(bytes)?)
	}
}


/// Reads assets from a directory on disk.
#[derive(Debug, Clone)]
pub struct FsAssets {
	root: PathBuf,
}

impl FsAssets {
	pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
		let root = root.into();

		anyhow::ensure!(root.is_dir(), "Couldn't find resource path '{}'", root.display());

		Ok(FsAssets { root })
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn resolve_path(&self, path: &Path) -> PathBuf {
		self.root.join(path)
	}

	/// Paths relative to the root of every file in `dir` with the given extension.
	pub fn list(&self, dir: &Path, extension: &str) -> anyhow::Result<Vec<PathBuf>> {
		let mut paths = Vec::new();

		for entry in std::fs::read_dir(self.resolve_path(dir))? {
			let path = entry?.path();

			if path.extension().map_or(false, |ext| ext == extension) {
				paths.push(path.strip_prefix(&self.root)?.to_owned());
			}
		}

		paths.sort();
		Ok(paths)
	}
}

impl AssetProvider for FsAssets {
	fn load_bytes(&self, path: &Path) -> anyhow::Result<Vec<u8>> {
		let full_path = self.resolve_path(path);

		std::fs::read(&full_path)
			.map_err(|error| anyhow::anyhow!("Failed to read '{}': {error}", full_path.display()))
	}
}



#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_root_is_rejected() {
		assert!(FsAssets::new("definitely/not/a/resource/dir").is_err());
	}

	#[test]
	fn reads_and_lists_files_under_root() {
		let root = std::env::temp_dir().join(format!("gl-resources-assets-{}", std::process::id()));
		std::fs::create_dir_all(root.join("shaders")).unwrap();
		std::fs::write(root.join("shaders/flat.ron"), "(name: \"flat\")").unwrap();
		std::fs::write(root.join("shaders/notes.txt"), "ignored").unwrap();

		let assets = FsAssets::new(&root).unwrap();
		let listed = assets.list(Path::new("shaders"), "ron").unwrap();

		assert_eq!(listed, [PathBuf::from("shaders/flat.ron")]);
		assert_eq!(assets.load_text(&listed[0]).unwrap(), "(name: \"flat\")");
		assert!(assets.load_text(Path::new("shaders/missing.ron")).is_err());

		std::fs::remove_dir_all(&root).unwrap();
	}
}
