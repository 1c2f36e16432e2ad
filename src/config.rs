use serde::Deserialize;
use crate::error::{GfxError, Result};


/// Context wide settings, usually loaded from a RON file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
	/// Prelude line used by definitions without a `Version` node.
	pub glsl_version: String,
	pub clear_color: [f32; 4],
	/// Log every generated shader source at debug level.
	pub log_generated_sources: bool,
	/// Caps the texture units used, never raising the backend's own limit.
	pub max_texture_units: Option<u32>,
}

impl Default for ContextConfig {
	fn default() -> Self {
		ContextConfig {
			glsl_version: "#version 450 core".to_owned(),
			clear_color: [0.0, 0.0, 0.0, 1.0],
			log_generated_sources: false,
			max_texture_units: None,
		}
	}
}

impl ContextConfig {
	pub fn from_ron(text: &str) -> Result<ContextConfig> {
		ron::from_str(text)
			.map_err(|error| GfxError::Collaborator(anyhow::anyhow!("Invalid context config: {error}")))
	}

	pub(crate) fn texture_units(&self, backend_limit: u32) -> u32 {
		self.max_texture_units
			.map_or(backend_limit, |cap| cap.min(backend_limit))
	}
}
