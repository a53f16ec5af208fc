//! `#[wasm_bindgen]` exports for mounting the scene from JavaScript.
//! Only compiled for wasm32.

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use wasm_bindgen::prelude::*;

use crate::config::SceneConfig;
use crate::render::HostSignal;
use crate::runtime::run_scene;

thread_local! {
    /// The page's Bevy app: its canvas and the signal that remounts it.
    /// winit allows one event loop per page, so the app outlives unmount.
    static PAGE_APP: RefCell<Option<(String, HostSignal)>> = const { RefCell::new(None) };
}

#[wasm_bindgen]
pub struct JsScene {
    config: SceneConfig,
    /// Canvas element id, without `#`.
    canvas_id: String,
    mounted: bool,
}

#[wasm_bindgen]
impl JsScene {
    /// Build from a JSON scene description; an empty string or `{}` gives
    /// the default scene.
    #[wasm_bindgen(constructor)]
    pub fn new(json: &str, canvas_id: &str) -> Result<JsScene, JsValue> {
        let config = if json.trim().is_empty() {
            SceneConfig::default()
        } else {
            SceneConfig::from_json(json)
                .map_err(|report| JsValue::from_str(&format!("{report:?}")))?
        };

        Ok(JsScene {
            config,
            canvas_id: canvas_id.to_string(),
            mounted: false,
        })
    }

    /// Mount the scene and start the render loop. The first mount on a page
    /// starts the Bevy app; later mounts rebuild the scene inside it.
    #[wasm_bindgen]
    pub fn start(&mut self) {
        if self.mounted {
            web_sys::console::warn_1(&"Scene already started".into());
            return;
        }
        self.mounted = true;

        let running = PAGE_APP.with(|app| app.borrow().clone());
        match running {
            Some((canvas_id, signal)) => {
                if canvas_id != self.canvas_id {
                    web_sys::console::warn_1(
                        &format!("Page already renders into #{canvas_id}; mounting there").into(),
                    );
                }
                signal.request_mount(self.config.clone());
            }
            None => {
                let signal = HostSignal::default();
                PAGE_APP.with(|app| {
                    *app.borrow_mut() = Some((self.canvas_id.clone(), signal.clone()));
                });
                run_scene(self.config.clone(), &self.canvas_id, signal);
            }
        }
    }

    /// Stop the render loop and release the scene. Loads still in flight
    /// are discarded when they finish. `start` may be called again.
    #[wasm_bindgen]
    pub fn unmount(&mut self) {
        if !self.mounted {
            web_sys::console::warn_1(&"Scene is not mounted".into());
            return;
        }
        self.mounted = false;
        PAGE_APP.with(|app| {
            if let Some((_, signal)) = app.borrow().as_ref() {
                signal.request_unmount();
            }
        });
    }

    #[wasm_bindgen]
    pub fn config_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.config)
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize scene config: {}", e)))
    }

    #[wasm_bindgen(getter)]
    pub fn canvas_id(&self) -> String {
        self.canvas_id.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }
}
