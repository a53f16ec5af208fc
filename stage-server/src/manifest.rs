//! Asset manifest: what the viewer will request, and whether it is on disk.

use std::path::Path;

use serde::{Deserialize, Serialize};
use spotlight_stage::config::SceneConfig;

use crate::config::Config;
use crate::error::Result;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AssetEntry {
    pub name: String,
    pub url: String,
    pub available: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Manifest {
    pub textures: Vec<AssetEntry>,
    pub mesh: AssetEntry,
    /// Scene description handed to the viewer unchanged.
    pub scene: SceneConfig,
}

impl Manifest {
    pub fn missing(&self) -> impl Iterator<Item = &AssetEntry> {
        self.textures
            .iter()
            .chain(std::iter::once(&self.mesh))
            .filter(|entry| !entry.available)
    }
}

async fn exists(path: &Path) -> Result<bool> {
    Ok(tokio::fs::try_exists(path).await?)
}

/// Both the texture base path and the mesh path are relative to the page,
/// so they double as URLs and as paths under the asset directory.
pub async fn build(config: &Config, scene: &SceneConfig) -> Result<Manifest> {
    let mut textures = Vec::with_capacity(scene.textures.files.len());
    for name in &scene.textures.files {
        let url = scene.texture_path(name);
        textures.push(AssetEntry {
            name: name.clone(),
            available: exists(&config.asset_dir.join(&url)).await?,
            url: format!("/{url}"),
        });
    }

    let mesh_path = &scene.mesh.path;
    let mesh_name = Path::new(mesh_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| mesh_path.clone());
    let mesh = AssetEntry {
        name: mesh_name,
        url: format!("/{mesh_path}"),
        available: exists(&config.asset_dir.join(mesh_path)).await?,
    };

    Ok(Manifest {
        textures,
        mesh,
        scene: scene.clone(),
    })
}
