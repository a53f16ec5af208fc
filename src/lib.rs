pub mod assets;
pub mod camera;
pub mod config;
pub mod context;
pub mod core;
pub mod geometry;
pub mod ply;
pub mod render;
pub mod render_loop;
pub mod runtime;
pub mod scene;
pub mod viewport;

#[cfg(target_arch = "wasm32")]
pub mod wasm_api;

use thiserror::Error;

/// Top-level error kinds. Details (paths, parser messages) travel as
/// attachments on the `error_stack::Report`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("asset not found")]
    AssetNotFound,
    #[error("asset could not be decoded")]
    AssetDecode,
    #[error("output surface could not be initialized")]
    SurfaceInit,
    #[error("invalid scene configuration")]
    Config,
}

pub type Result<T> = std::result::Result<T, error_stack::Report<SceneError>>;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

pub mod prelude {
    pub use crate::assets::*;
    pub use crate::camera::*;
    pub use crate::config::*;
    pub use crate::context::*;
    pub use crate::core::*;
    pub use crate::geometry::*;
    pub use crate::render::*;
    pub use crate::render_loop::*;
    pub use crate::runtime::*;
    pub use crate::scene::*;
    pub use crate::viewport::*;
    pub use crate::{Result, SceneError};
}
