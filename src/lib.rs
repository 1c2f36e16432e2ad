//! Backend-agnostic GPU resources, shader generation and batched drawing on top of OpenGL 4.5.

pub mod error;
pub mod backend;
pub mod resource_manager;
pub mod semantics;
pub mod registry;
pub mod vertex_layout;
pub mod bind_state;
pub mod context;
pub mod drawable;
pub mod shader_def;
pub mod shader_compiler;
pub mod shader_library;
pub mod commands;
pub mod lighting;
pub mod config;
pub mod logging;
pub mod assets;
pub mod surface;

pub use crate::error::{GfxError, Result};
pub use crate::backend::{Backend, BufferTarget, ClearMask, PrimitiveType, ShaderStage, UniformValue};
pub use crate::resource_manager::{
	BufferHandle, FramebufferHandle, ResourceHandle, ResourceKind, ShaderHandle, ShaderStageHandle, TextureHandle,
	TextureDesc, FramebufferDesc,
};
pub use crate::semantics::{UniformType, VertexInputType, TransformRole};
pub use crate::registry::{ShaderRegistry, UniformTarget};
pub use crate::context::Context;
pub use crate::drawable::Drawable;
pub use crate::shader_def::ShaderDefinition;
pub use crate::shader_library::ShaderLibrary;
pub use crate::commands::{DrawBatch, BatchStats};
pub use crate::lighting::{Lighting, PointLight};
pub use crate::config::ContextConfig;
pub use crate::logging::{init_logging, LoggingConfig};
pub use crate::assets::{AssetProvider, FsAssets};
pub use crate::surface::{InputPoller, Surface};
