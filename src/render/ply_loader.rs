//! Bevy asset loader for `.ply` files.
//!
//! Parsing and normalization run on the asset task pool, so the render
//! tick only ever sees a finished mesh.

use bevy::asset::io::Reader;
use bevy::asset::{Asset, AssetLoader, LoadContext};
use bevy::reflect::TypePath;
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;

use crate::assets::MeshSettings;
use crate::geometry::MeshData;
use crate::ply::{self, PlyError};

/// Parsed, scaled and re-lit PLY geometry.
#[derive(Asset, TypePath, Debug, Clone)]
pub struct PlyMesh(pub Arc<MeshData>);

#[derive(Debug, Error)]
pub enum PlyLoaderError {
    #[error("could not read PLY data: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse PLY data: {0}")]
    Parse(#[from] PlyError),
}

pub struct PlyLoader {
    settings: Arc<RwLock<MeshSettings>>,
}

impl PlyLoader {
    pub fn new(settings: Arc<RwLock<MeshSettings>>) -> Self {
        Self { settings }
    }
}

impl AssetLoader for PlyLoader {
    type Asset = PlyMesh;
    type Settings = ();
    type Error = PlyLoaderError;

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &(),
        _load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        let data = ply::parse(&bytes)?;
        let settings = self.settings.read().clone();
        Ok(PlyMesh(Arc::new(settings.normalize(data))))
    }

    fn extensions(&self) -> &[&str] {
        &["ply"]
    }
}
