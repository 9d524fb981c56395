//! wasm-bindgen handle held by the page

use glam::Vec2;
use wasm_bindgen::prelude::*;

use super::{FrameTimer, KeyTagger};
use crate::audio::WebAudioPort;
use crate::games::{GameId, launch};
use crate::host::{Arcade, HostHooks};
use crate::persistence::LocalStorageStore;
use crate::settings::Settings;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"logger already initialised".into());
    }
}

#[wasm_bindgen]
pub struct WebCabinet {
    cabinet: Box<dyn Arcade>,
    keys: KeyTagger,
    timer: FrameTimer,
}

#[wasm_bindgen]
impl WebCabinet {
    /// `on_close()` and `on_top_score(game, score, initials)` are page callbacks
    #[wasm_bindgen(constructor)]
    pub fn new(
        game: &str,
        width: f32,
        height: f32,
        on_close: js_sys::Function,
        on_top_score: js_sys::Function,
    ) -> Result<WebCabinet, JsValue> {
        let id = GameId::from_str(game).ok_or_else(|| JsValue::from_str(&format!("unknown game {game:?}")))?;
        let store = LocalStorageStore::new();
        let settings = Settings::load(&store);
        let hooks = HostHooks {
            on_close: Box::new(move || {
                if let Err(err) = on_close.call0(&JsValue::NULL) {
                    log::warn!("close callback failed: {err:?}");
                }
            }),
            on_top_score: Box::new(move |id, score, initials| {
                let result = on_top_score.call3(
                    &JsValue::NULL,
                    &JsValue::from_str(id.as_str()),
                    &JsValue::from_f64(score as f64),
                    &JsValue::from_str(initials.as_str()),
                );
                if let Err(err) = result {
                    log::warn!("top score callback failed: {err:?}");
                }
            }),
        };
        let keys = KeyTagger::new(settings.key_bindings.clone());
        let cabinet = launch(
            id,
            Vec2::new(width, height),
            &settings,
            hooks,
            Box::new(store),
            Box::new(WebAudioPort::new()),
        );
        Ok(Self {
            cabinet,
            keys,
            timer: FrameTimer::new(),
        })
    }

    /// Call from `requestAnimationFrame` with its timestamp
    pub fn frame(&mut self, now_ms: f64) -> u32 {
        let elapsed = self.timer.elapsed(now_ms);
        self.cabinet.frame(elapsed)
    }

    /// Forward a `KeyboardEvent.code`; false if unbound or dropped
    pub fn key(&mut self, code: &str, down: bool) -> bool {
        match self.keys.tag(code, down) {
            Some(intent) => self.cabinet.push(intent),
            None => false,
        }
    }

    pub fn focus(&mut self, focused: bool) {
        if focused {
            self.timer.reset();
        }
        self.cabinet.set_focused(focused);
    }

    pub fn snapshot(&self) -> String {
        self.cabinet.snapshot_json().unwrap_or_else(|err| {
            log::warn!("snapshot failed: {err}");
            String::from("{}")
        })
    }

    pub fn hud(&self) -> String {
        serde_json::to_string(&self.cabinet.hud()).unwrap_or_else(|err| {
            log::warn!("hud failed: {err}");
            String::from("{}")
        })
    }

    pub fn terminate(&mut self) {
        self.cabinet.terminate();
    }

    #[wasm_bindgen(js_name = isClosed)]
    pub fn is_closed(&self) -> bool {
        self.cabinet.is_closed()
    }
}
