//! Native viewer. Takes an optional path to a JSON scene description;
//! assets are read from `assets/` next to the working directory.

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    use error_stack::ResultExt;
    use spotlight_stage::prelude::*;

    let config = match std::env::args().nth(1) {
        None => Ok(SceneConfig::default()),
        Some(path) => std::fs::read_to_string(&path)
            .change_context(SceneError::Config)
            .attach(format!("reading {path}"))
            .and_then(|json| SceneConfig::from_json(&json)),
    };

    match config {
        Ok(config) => match run_scene(config) {
            bevy::app::AppExit::Success => std::process::ExitCode::SUCCESS,
            bevy::app::AppExit::Error(_) => std::process::ExitCode::FAILURE,
        },
        Err(report) => {
            eprintln!("{report:?}");
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}
