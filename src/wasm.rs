//! Browser bindings: a `Host` backed by the DOM and the `FlipbookViewer` class
//! exported to JavaScript.
//!
//! JavaScript owns the page-flip animation library and the render loop. It calls
//! `tick()` every frame, forwards DOM events, reports flips with `reportFlip`, and
//! polls `takeTurn` for flips the viewer wants. Network work runs as local futures
//! (see `loader::web_fetch`) whose results `tick()` picks up.

use std::collections::VecDeque;
use std::sync::Arc;

use wasm_bindgen::prelude::*;
use web_sys::KeyboardEvent;
use web_time::Instant;

use crate::action::ViewerAction;
use crate::config::AppConfig;
use crate::error::{FlipbookError, Result};
use crate::flip::PageFlipEngine;
use crate::host::Host;
use crate::input::{Key, Modifiers};
use crate::loader::{PageRender, web_fetch};
use crate::logging;
use crate::overlay::Rect;
use crate::provider::HttpPageDataProvider;
use crate::viewer::{ClickOutcome, Viewer};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let config = AppConfig::load_from_local_storage().unwrap_or_default();
    logging::init(config.viewer.log_level);
    web_fetch::purge_stale_versions();
    log::info!("Flipbook viewer module loaded");
}

fn js_message(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

/// The hosting browser window.
pub struct BrowserHost {
    window: web_sys::Window,
}

impl BrowserHost {
    pub fn new() -> Option<Self> {
        web_sys::window().map(|window| Self { window })
    }
}

impl Host for BrowserHost {
    fn current_url(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    fn replace_url(&mut self, url: &str) {
        let result = self
            .window
            .history()
            .and_then(|history| history.replace_state_with_url(&JsValue::NULL, "", Some(url)));
        if let Err(e) = result {
            log::warn!("Could not update the URL: {}", js_message(&e));
        }
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<()> {
        let document = self
            .window
            .document()
            .ok_or_else(|| FlipbookError::Host("no document".to_string()))?;
        if !fullscreen {
            document.exit_fullscreen();
            return Ok(());
        }
        let element = document
            .document_element()
            .ok_or_else(|| FlipbookError::Host("no document element".to_string()))?;
        element
            .request_fullscreen()
            .map_err(|e| FlipbookError::Host(js_message(&e)))
    }

    fn navigate(&mut self, url: &str) {
        if let Err(e) = self.window.location().assign(url) {
            log::error!("Navigation to {} failed: {}", url, js_message(&e));
        }
    }

    fn open_new_context(&mut self, url: &str) {
        let result =
            self.window
                .open_with_url_and_target_and_features(url, "_blank", "noopener,noreferrer");
        if let Err(e) = result {
            log::error!("Opening {} failed: {}", url, js_message(&e));
        }
    }
}

/// Flip engine proxy: turn requests are queued for JavaScript, flips come back
/// through `reportFlip`.
#[derive(Debug, Default)]
pub struct JsFlipEngine {
    requests: VecDeque<usize>,
    flips: Vec<usize>,
}

impl PageFlipEngine for JsFlipEngine {
    fn turn_to_page(&mut self, index: usize) {
        self.requests.push_back(index);
    }

    fn take_flip_events(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.flips)
    }
}

fn to_js_error(e: FlipbookError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
pub struct FlipbookViewer {
    inner: Viewer<BrowserHost, JsFlipEngine>,
}

#[wasm_bindgen]
impl FlipbookViewer {
    /// Create a viewer for `catalog_id`, or the featured catalog when omitted.
    /// Options come from localStorage.
    #[wasm_bindgen(constructor)]
    pub fn new(catalog_id: Option<String>) -> std::result::Result<FlipbookViewer, JsValue> {
        let config = AppConfig::load_from_local_storage().unwrap_or_default().viewer;
        let host = BrowserHost::new().ok_or_else(|| JsValue::from_str("no window"))?;
        let provider = HttpPageDataProvider::endpoints_only(config.api_origin());

        let mut inner = Viewer::new(config, Arc::new(provider), host, JsFlipEngine::default());
        if let Some(id) = catalog_id {
            inner = inner.with_catalog_id(id);
        }
        Ok(Self { inner })
    }

    /// Start loading. Poll `progress()` / `isReady()` after each `tick()`.
    pub fn load(&mut self) -> std::result::Result<(), JsValue> {
        self.inner.load(Instant::now()).map_err(to_js_error)
    }

    pub fn retry(&mut self) -> std::result::Result<(), JsValue> {
        self.inner.retry(Instant::now()).map_err(to_js_error)
    }

    pub fn tick(&mut self) {
        self.inner.tick(Instant::now());
    }

    /// Persist the current options to localStorage.
    #[wasm_bindgen(js_name = saveConfig)]
    pub fn save_config(&self) -> std::result::Result<(), JsValue> {
        let config = AppConfig {
            viewer: self.inner.config().clone(),
            ..AppConfig::new()
        };
        config
            .save_to_local_storage()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    // --- loading state ---

    pub fn progress(&self) -> u8 {
        self.inner.phase().progress()
    }

    #[wasm_bindgen(js_name = statusText)]
    pub fn status_text(&self) -> String {
        self.inner.phase().status_text()
    }

    #[wasm_bindgen(js_name = isReady)]
    pub fn is_ready(&self) -> bool {
        self.inner.phase().is_ready()
    }

    #[wasm_bindgen(js_name = isError)]
    pub fn is_error(&self) -> bool {
        self.inner.phase().is_error()
    }

    // --- pages ---

    #[wasm_bindgen(js_name = currentPage)]
    pub fn current_page(&self) -> u32 {
        self.inner.navigation().current_page() as u32
    }

    #[wasm_bindgen(js_name = totalPages)]
    pub fn total_pages(&self) -> u32 {
        self.inner.navigation().total_pages() as u32
    }

    /// Image URL to draw for page `index`, or `None` for a placeholder.
    #[wasm_bindgen(js_name = pageImage)]
    pub fn page_image(&self, index: u32) -> Option<String> {
        match self.inner.render_plan().into_iter().nth(index as usize)? {
            PageRender::Image { url, .. } => Some(url),
            PageRender::Placeholder { .. } | PageRender::Failed { .. } => None,
        }
    }

    #[wasm_bindgen(js_name = pageFailed)]
    pub fn page_failed(&self, index: u32) -> bool {
        matches!(
            self.inner.render_plan().get(index as usize),
            Some(PageRender::Failed { .. })
        )
    }

    /// Page number badge for page `index`, once its image is in.
    #[wasm_bindgen(js_name = pageBadge)]
    pub fn page_badge(&self, index: u32) -> Option<u32> {
        self.inner.page_badge(index as usize)
    }

    #[wasm_bindgen(js_name = retryPage)]
    pub fn retry_page(&mut self, index: u32) -> bool {
        self.inner
            .dispatch(ViewerAction::RetryPage(index as usize), Instant::now())
    }

    pub fn indicator(&self) -> String {
        self.inner.toolbar().indicator
    }

    #[wasm_bindgen(js_name = zoomLabel)]
    pub fn zoom_label(&self) -> String {
        self.inner.toolbar().zoom_label
    }

    pub fn cursor(&self) -> String {
        self.inner.cursor().to_string()
    }

    // --- flip engine ---

    /// Next page the flip library should turn to.
    #[wasm_bindgen(js_name = takeTurn)]
    pub fn take_turn(&mut self) -> Option<u32> {
        self.inner
            .engine_mut()
            .requests
            .pop_front()
            .map(|i| i as u32)
    }

    /// The flip library finished a flip (programmatic or user-dragged).
    #[wasm_bindgen(js_name = reportFlip)]
    pub fn report_flip(&mut self, index: u32) {
        self.inner.engine_mut().flips.push(index as usize);
    }

    // --- input ---

    /// Handle a keydown. Prevents the browser default when the key did something.
    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&mut self, event: &KeyboardEvent, input_focused: bool) -> bool {
        let Some(key) = Key::from_name(&event.key()) else {
            return false;
        };
        let modifiers = Modifiers {
            shift: event.shift_key(),
            ctrl: event.ctrl_key(),
            alt: event.alt_key(),
            meta: event.meta_key(),
        };
        let handled = self
            .inner
            .handle_key(key, modifiers, input_focused, Instant::now())
            .is_some();
        if handled {
            event.prevent_default();
        }
        handled
    }

    /// Toolbar button by name. Returns whether it did anything.
    pub fn command(&mut self, name: &str) -> bool {
        let action = match name {
            "first" => ViewerAction::FirstPage,
            "previous" => ViewerAction::PreviousPage,
            "next" => ViewerAction::NextPage,
            "last" => ViewerAction::LastPage,
            "autoplay" => ViewerAction::ToggleAutoPlay,
            "fullscreen" => ViewerAction::ToggleFullscreen,
            "thumbnails" => ViewerAction::ToggleThumbnails,
            "toc" => ViewerAction::ToggleToc,
            "zoom-in" => ViewerAction::ZoomIn,
            "zoom-out" => ViewerAction::ZoomOut,
            "reset-zoom" => ViewerAction::ResetZoom,
            other => {
                log::warn!("Unknown command '{}'", other);
                return false;
            }
        };
        self.inner.dispatch(action, Instant::now())
    }

    #[wasm_bindgen(js_name = goToPage)]
    pub fn go_to_page(&mut self, index: u32) -> bool {
        self.inner
            .dispatch(ViewerAction::GoToPage(index as usize), Instant::now())
    }

    /// Submit the jump-to-page box.
    pub fn jump(&mut self, text: &str) -> bool {
        self.inner.submit_jump(text, Instant::now())
    }

    /// Click at `(px, py)` on page `page` drawn in the given box. Returns true
    /// when the click was consumed (flip, cover, hotspot or stabilization).
    pub fn click(
        &mut self,
        page: u32,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        px: f32,
        py: f32,
    ) -> bool {
        let outcome = self.inner.click_at(
            page as usize,
            Rect::new(x, y, width, height),
            px,
            py,
            Instant::now(),
        );
        outcome != ClickOutcome::Ignored
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f32, y: f32) -> bool {
        self.inner.pointer_down((x, y))
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.inner.pointer_move((x, y));
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self) {
        self.inner.pointer_up();
    }

    #[wasm_bindgen(js_name = setContainerSize)]
    pub fn set_container_size(&mut self, width: f32, height: f32) {
        self.inner.set_container_size(width, height);
    }

    // --- platform ---

    #[wasm_bindgen(js_name = setFocused)]
    pub fn set_focused(&mut self, focused: bool) {
        self.inner.set_focused(focused);
    }

    #[wasm_bindgen(js_name = visibilityChanged)]
    pub fn visibility_changed(&mut self, hidden: bool) {
        self.inner.on_visibility_change(hidden);
    }

    #[wasm_bindgen(js_name = windowBlurred)]
    pub fn window_blurred(&mut self) {
        self.inner.on_window_blur();
    }

    #[wasm_bindgen(js_name = fullscreenChanged)]
    pub fn fullscreen_changed(&mut self, fullscreen: bool) {
        self.inner.on_fullscreen_change(fullscreen);
    }
}
