//! Error types surfaced by every fallible operation in the crate.
//!
//! None of these are retried internally. Each variant carries enough context (object kind and
//! label, or generated source and backend log) to diagnose a failure without re-running.

use crate::resource_manager::ResourceKind;
use crate::backend::{BufferTarget, ShaderStage};
use thiserror::Error;


pub type Result<T> = std::result::Result<T, GfxError>;


#[derive(Error, Debug)]
pub enum GfxError {
	/// The backend rejected a stage's source.
	#[error("Failed to compile {stage:?} stage of '{label}':\n{log}\n{listing}")]
	CompileFailure {
		label: String,
		stage: ShaderStage,
		/// Generated source with 1-based line numbers.
		listing: String,
		log: String,
	},

	#[error("Failed to link shader program '{label}':\n{log}")]
	LinkFailure {
		label: String,
		log: String,
	},

	/// The resource was disposed, never existed, or the backend no longer recognises it.
	#[error("Invalid {kind:?} object '{label}'")]
	InvalidObject {
		kind: ResourceKind,
		label: String,
	},

	#[error("Expected a {expected:?} object but '{label}' is a {found:?}")]
	WrongKind {
		expected: ResourceKind,
		found: ResourceKind,
		label: String,
	},

	#[error("Operation '{operation}' is not supported on {kind:?} object '{label}'")]
	Unsupported {
		kind: ResourceKind,
		label: String,
		operation: &'static str,
	},

	#[error("Shader program '{label}' must be linked before it can be bound")]
	NotLinked {
		label: String,
	},

	#[error("Shader program '{label}' is already linked")]
	AlreadyLinked {
		label: String,
	},

	#[error("No shader program is bound")]
	NoShaderBound,

	#[error("No surface is bound to this context")]
	NoSurface,

	#[error("{what} index {index} is out of range (limit {limit})")]
	OutOfRange {
		what: &'static str,
		index: u32,
		limit: u32,
	},

	#[error("'{name}' conflicts with an existing {map} registration")]
	RegistrationConflict {
		map: &'static str,
		name: String,
	},

	#[error("'{name}' is not a valid {map} name")]
	InvalidName {
		map: &'static str,
		name: String,
	},

	#[error("Indexed uniform name '{name}' does not contain the '$INDEX' token")]
	MissingIndexToken {
		name: String,
	},

	#[error("Framebuffer '{label}' attachments have mismatched sizes: {expected:?} vs {found:?}")]
	AttachmentMismatch {
		label: String,
		expected: (u32, u32),
		found: (u32, u32),
	},

	#[error("Framebuffer '{label}' is incomplete")]
	IncompleteFramebuffer {
		label: String,
	},

	#[error("Invalid shader definition '{label}': {reason}")]
	Definition {
		label: String,
		reason: String,
	},

	#[error("No shader definition registered under '{0}'")]
	UnknownShader(String),

	#[error("Buffer '{label}' is bound to {found:?} but {expected:?} was required")]
	TargetMismatch {
		label: String,
		expected: BufferTarget,
		found: BufferTarget,
	},

	#[error("Payload for '{label}' is {found} bytes, expected {expected}")]
	PayloadSize {
		label: String,
		expected: usize,
		found: usize,
	},

	/// Failure reported by an external collaborator (surface, asset provider).
	#[error(transparent)]
	Collaborator(#[from] anyhow::Error),
}
