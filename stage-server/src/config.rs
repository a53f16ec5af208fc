//! Server configuration

use std::path::PathBuf;

use clap::Parser;

/// Serves the spotlight stage page, its wasm bundle and its assets
#[derive(Parser, Clone, Debug)]
#[command(name = "stage-server")]
#[command(about = "Serves the spotlight stage wasm viewer and its assets")]
pub struct Config {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Directory holding `textures/` and `models/`
    #[arg(long, default_value = "assets")]
    pub asset_dir: PathBuf,

    /// Directory holding the wasm-bindgen output
    #[arg(long, default_value = "stage-server/wasm")]
    pub wasm_dir: PathBuf,
}

impl Config {
    pub fn textures_dir(&self) -> PathBuf {
        self.asset_dir.join("textures")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.asset_dir.join("models")
    }
}
