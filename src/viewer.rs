//! The viewer: one mounted flipbook.
//!
//! `Viewer` ties the pieces together. It loads the catalog from the page data
//! provider, seeds navigation from the URL and drives page loading from the current
//! page. It also feeds the cache coordinator and executes input actions. Everything
//! time-based advances in [`Viewer::tick`], which the embedder calls every frame.
//!
//! With the background worker enabled (always in the browser) the catalog and page
//! images are fetched off the UI thread and their results are applied by `tick`.
//! Inline mode fetches the catalog in `load` and page images in `tick`.

use std::collections::BTreeSet;
#[cfg(not(target_arch = "wasm32"))]
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
use flipbook_cache::Fetcher;
use flipbook_cache::{CacheCommand, CacheError, CacheHandle, CacheStatus};
use web_time::Instant;

use crate::action::ViewerAction;
use crate::config::ViewerConfig;
use crate::error::{FlipbookError, Result};
use crate::flip::{FlipSync, PageFlipEngine};
use crate::host::Host;
use crate::input::{
    JumpInput, Key, KeyContext, Modifiers, Thumbnail, ThumbnailStrip, TocPanel, TocRow,
    Toolbar, ToolbarOptions, map_key, resolve_page_number,
};
#[cfg(not(target_arch = "wasm32"))]
use crate::loader::fetch_page;
use crate::loader::{
    CatalogRequest, CatalogResult, LazyPageLoader, LoadPhase, PageBox, PageLoadState, PageRender,
    PreloadEvent, PreloadWorker, ViewportTracker,
};
use crate::model::Catalog;
use crate::overlay::{self, EventDisposition, HotspotAction, HotspotRegion, Rect};
use crate::provider::PageDataProvider;
use crate::state::{
    AutoPlayTimer, CoverTransition, JumpAnimator, NavigationEvent, NavigationState, PanGesture,
    PanOffset, UrlSync, constrain_pan,
};

/// What a click on the page area did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Consumed by stabilization after the viewer regained focus.
    Swallowed,
    /// Started the cover transition.
    CoverOpened,
    Flipped,
    /// Landed on a hotspot.
    Hotspot(HotspotAction),
    Ignored,
}

/// Host callback for navigation events.
pub type EventCallback = Box<dyn FnMut(NavigationEvent)>;

pub struct Viewer<H: Host, E: PageFlipEngine> {
    provider: Arc<dyn PageDataProvider>,
    /// Page images are fetched through this (usually a cache handle).
    #[cfg(not(target_arch = "wasm32"))]
    fetcher: Arc<dyn Fetcher>,
    cache: Option<CacheHandle>,
    host: H,
    engine: E,

    /// Catalog to load; the featured one when `None`.
    catalog_id: Option<String>,
    phase: LoadPhase,
    /// Catalog fetch in flight.
    pending_catalog: Option<CatalogRequest>,
    catalog: Option<Catalog>,
    /// Id of the last catalog that loaded, to detect catalog switches.
    loaded_catalog_id: Option<String>,

    nav: NavigationState,
    loader: LazyPageLoader,
    viewport: ViewportTracker,
    worker: Option<PreloadWorker>,
    /// Pages waiting for an inline fetch (no worker).
    #[cfg(not(target_arch = "wasm32"))]
    inline_queue: VecDeque<usize>,
    /// Pages that must settle before the viewer is ready.
    initial_pages: BTreeSet<usize>,

    autoplay: AutoPlayTimer,
    jump: JumpAnimator,
    cover: CoverTransition,
    url_sync: UrlSync,
    flip: FlipSync,
    /// Page the flip engine shows, as far as we know.
    engine_page: Option<usize>,
    pan: PanGesture,
    container: (f32, f32),
    /// A swallowed press also swallows the click it ends in.
    swallow_click: bool,

    jump_input: JumpInput,
    toc: TocPanel,
    thumbnails: ThumbnailStrip,
    prefetched_from: Option<usize>,
    on_event: Option<EventCallback>,
    config: ViewerConfig,
}

impl<H: Host, E: PageFlipEngine> Viewer<H, E> {
    /// The browser build has no `fetcher`: everything goes through `fetch()`.
    pub fn new(
        config: ViewerConfig,
        provider: Arc<dyn PageDataProvider>,
        #[cfg(not(target_arch = "wasm32"))] fetcher: Arc<dyn Fetcher>,
        host: H,
        engine: E,
    ) -> Self {
        Self {
            provider,
            #[cfg(not(target_arch = "wasm32"))]
            fetcher,
            cache: None,
            host,
            engine,
            catalog_id: None,
            phase: LoadPhase::Idle,
            pending_catalog: None,
            catalog: None,
            loaded_catalog_id: None,
            nav: NavigationState::new(0, 0),
            loader: LazyPageLoader::new(0, config.preload_pages),
            viewport: ViewportTracker::new(config.preload_pages),
            worker: None,
            #[cfg(not(target_arch = "wasm32"))]
            inline_queue: VecDeque::new(),
            initial_pages: BTreeSet::new(),
            autoplay: AutoPlayTimer::new(config.auto_play_interval()),
            jump: JumpAnimator::new(config.jump_step_delay()),
            cover: CoverTransition::new(config.show_cover),
            url_sync: UrlSync::new(config.enable_url_sync),
            flip: FlipSync::new(),
            engine_page: None,
            pan: PanGesture::new(),
            container: (0.0, 0.0),
            swallow_click: false,
            jump_input: JumpInput::new(),
            toc: TocPanel::default(),
            thumbnails: ThumbnailStrip::default(),
            prefetched_from: None,
            on_event: None,
            config,
        }
    }

    /// Route cache commands to a running coordinator.
    pub fn with_cache(mut self, cache: CacheHandle) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Load this catalog instead of the featured one.
    pub fn with_catalog_id(mut self, id: impl Into<String>) -> Self {
        self.catalog_id = Some(id.into());
        self
    }

    /// Forward navigation events to the host.
    pub fn on_event(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn phase(&self) -> &LoadPhase {
        &self.phase
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.nav
    }

    pub fn loader(&self) -> &LazyPageLoader {
        &self.loader
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn jump_input_mut(&mut self) -> &mut JumpInput {
        &mut self.jump_input
    }

    pub fn is_jumping(&self) -> bool {
        self.jump.is_busy()
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Run the load sequence: fetch the catalog, warm the cache, seed navigation
    /// from the URL and start loading the pages around the starting page.
    ///
    /// With the background worker the catalog request is only started here and the
    /// viewer stays in [`LoadPhase::FetchingData`] until a later `tick` applies the
    /// answer. A provider failure leaves the viewer in [`LoadPhase::Error`]; inline
    /// mode also returns it.
    pub fn load(&mut self, now: Instant) -> Result<()> {
        self.phase = LoadPhase::FetchingData;
        self.pending_catalog = None;
        if self.background_loading() {
            match CatalogRequest::spawn(Arc::clone(&self.provider), self.catalog_id.clone()) {
                Ok(request) => {
                    self.pending_catalog = Some(request);
                    return Ok(());
                }
                Err(e) => log::warn!("{}; fetching the catalog inline", e),
            }
        }
        let result = self.provider.fetch(self.catalog_id.as_deref());
        self.finish_load(result, now)
    }

    fn background_loading(&self) -> bool {
        cfg!(target_arch = "wasm32") || self.config.use_background_worker
    }

    fn finish_load(&mut self, result: CatalogResult, now: Instant) -> Result<()> {
        match result {
            Ok(catalog) => {
                self.install(catalog, now);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to load catalog: {}", e);
                self.phase = LoadPhase::Error(e.to_string());
                Err(FlipbookError::Provider(e))
            }
        }
    }

    /// Apply the answer of the catalog request, if it has come in.
    fn poll_catalog(&mut self, now: Instant) {
        let Some(result) = self.pending_catalog.as_mut().and_then(CatalogRequest::poll) else {
            return;
        };
        self.pending_catalog = None;
        if let Err(e) = self.finish_load(result, now) {
            log::debug!("Catalog request finished with {}", e);
        }
    }

    /// Re-run the whole load sequence from scratch.
    pub fn retry(&mut self, now: Instant) -> Result<()> {
        log::info!("Retrying catalog load");
        self.load(now)
    }

    /// Switch to another catalog.
    pub fn load_catalog(&mut self, id: impl Into<String>, now: Instant) -> Result<()> {
        self.catalog_id = Some(id.into());
        self.load(now)
    }

    fn install(&mut self, mut catalog: Catalog, now: Instant) {
        // Providers are expected to sort, but navigation and the jump box rely on it.
        catalog.pages.sort_by_key(|p| p.page_number);

        let first_install = self.loaded_catalog_id.is_none();
        let switched = self
            .loaded_catalog_id
            .as_deref()
            .is_some_and(|id| id != catalog.id);
        if switched {
            log::info!("Catalog changed to {}, clearing caches", catalog.id);
            self.post_cache(CacheCommand::ClearCache);
        }
        self.cancel_loads();

        if self.config.precache_first_pages > 0 {
            self.post_cache(CacheCommand::PrecacheFirstPages {
                api_url: self.config.api_origin().to_string(),
                flipbook_id: catalog.id.clone(),
                count: self.config.precache_first_pages,
            });
        }

        let total = catalog.len();
        let initial = self.url_sync.initial_page(&self.host, total, 0);
        log::info!(
            "Showing '{}' ({} pages) from page {}",
            catalog.title,
            total,
            initial + 1
        );

        // Panels start as configured; after that the user's choice and the
        // platform's fullscreen state outlive a reload.
        let (thumbnails, toc) = if first_install {
            (self.config.show_thumbnails, self.config.show_toc)
        } else {
            (self.nav.show_thumbnails(), self.nav.show_toc())
        };
        let focused = self.nav.is_focused();
        self.nav = NavigationState::new(total, initial)
            .with_auto_play(self.config.auto_play_on_mount)
            .with_thumbnails(thumbnails)
            .with_toc(toc)
            .with_fullscreen(self.nav.is_fullscreen());
        self.nav.set_focused(focused);
        self.loader = LazyPageLoader::new(total, self.config.preload_pages);
        self.viewport = ViewportTracker::new(self.config.preload_pages);
        self.toc = TocPanel::new(catalog.toc_or_default());
        self.cover = CoverTransition::new(self.config.show_cover);
        self.jump.cancel();
        self.flip.reset();
        self.engine_page = None;
        self.pan.end_drag();
        self.swallow_click = false;
        self.jump_input.clear();
        self.url_sync.reset();
        self.prefetched_from = None;
        self.autoplay.disarm();
        self.autoplay.sync(self.nav.is_playing(), now);

        self.loaded_catalog_id = Some(catalog.id.clone());
        self.catalog = Some(catalog);
        self.ensure_worker();

        let due = self.loader.update(initial);
        self.initial_pages = due.iter().copied().collect();
        self.phase = LoadPhase::PreloadingImages {
            loaded: 0,
            total: due.len(),
        };
        self.start_loads(&due);

        self.url_sync.sync(&mut self.host, initial);
        self.prefetch_ahead(initial);
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn ensure_worker(&mut self) {
        if !self.config.use_background_worker || self.worker.is_some() {
            return;
        }
        match PreloadWorker::spawn(Arc::clone(&self.fetcher)) {
            Ok(worker) => self.worker = Some(worker),
            Err(e) => log::warn!("{}; loading pages inline", e),
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn ensure_worker(&mut self) {
        if self.worker.is_none() {
            self.worker = Some(PreloadWorker::new());
        }
    }

    fn cancel_loads(&mut self) {
        if let Some(worker) = self.worker.as_mut() {
            worker.cancel();
        }
        #[cfg(not(target_arch = "wasm32"))]
        self.inline_queue.clear();
        self.loader.reset_in_flight();
    }

    fn start_loads(&mut self, indices: &[usize]) {
        if indices.is_empty() {
            return;
        }
        if let (Some(worker), Some(catalog)) = (self.worker.as_mut(), self.catalog.as_ref()) {
            let urls = indices
                .iter()
                .filter_map(|&i| catalog.image_url(i).map(str::to_string))
                .collect();
            worker.preload(urls);
            return;
        }
        #[cfg(not(target_arch = "wasm32"))]
        self.inline_queue.extend(indices.iter().copied());
    }

    /// Apply finished page loads.
    fn process_loads(&mut self) {
        let mut events = Vec::new();
        if let Some(worker) = self.worker.as_mut() {
            while let Some(event) = worker.take_one_event() {
                events.push(event);
            }
        }
        for event in events {
            match event {
                PreloadEvent::Loaded { url, width, height } => {
                    self.settle(&url, Ok((width, height)))
                }
                PreloadEvent::Error { url, error } => self.settle(&url, Err(error)),
                PreloadEvent::Progress { loaded, total } => {
                    log::trace!("Preload progress {}/{}", loaded, total)
                }
            }
        }

        #[cfg(not(target_arch = "wasm32"))]
        self.process_inline_queue();
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn process_inline_queue(&mut self) {
        let Some(catalog) = self.catalog.as_ref() else {
            return;
        };
        while let Some(index) = self.inline_queue.pop_front() {
            if self.loader.state(index) != PageLoadState::Loading {
                continue;
            }
            let Some(url) = catalog.image_url(index) else {
                continue;
            };
            match fetch_page(self.fetcher.as_ref(), url) {
                Ok(page) => self.loader.mark_loaded(index, (page.width, page.height)),
                Err(e) => self.loader.mark_failed(index, e),
            }
        }
    }

    /// Record a worker result for every loading page showing `url`.
    fn settle(&mut self, url: &str, result: std::result::Result<(u32, u32), String>) {
        let Some(catalog) = self.catalog.as_ref() else {
            return;
        };
        for index in 0..catalog.len() {
            if catalog.image_url(index) != Some(url)
                || self.loader.state(index) != PageLoadState::Loading
            {
                continue;
            }
            match &result {
                Ok(size) => self.loader.mark_loaded(index, *size),
                Err(e) => self.loader.mark_failed(index, e.clone()),
            }
        }
    }

    fn update_phase(&mut self) {
        if !matches!(self.phase, LoadPhase::PreloadingImages { .. }) {
            return;
        }
        let total = self.initial_pages.len();
        let loaded = self
            .initial_pages
            .iter()
            .filter(|&&i| {
                matches!(
                    self.loader.state(i),
                    PageLoadState::Loaded | PageLoadState::Failed(_)
                )
            })
            .count();
        if loaded < total {
            self.phase = LoadPhase::PreloadingImages { loaded, total };
            return;
        }

        let current = self.nav.current_page();
        self.engine_page = Some(current);
        self.engine.turn_to_page(current);
        self.phase = LoadPhase::Ready;
        log::info!("Viewer ready ({} pages loaded)", self.loader.loaded_count());
    }

    /// Whether cache commands go anywhere. The browser cache is always there.
    fn has_cache(&self) -> bool {
        cfg!(target_arch = "wasm32") || self.cache.is_some()
    }

    fn post_cache(&self, command: CacheCommand) {
        #[cfg(target_arch = "wasm32")]
        crate::loader::web_fetch::post(command);

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.post(command) {
                log::debug!("Cache coordinator unavailable: {}", e);
            }
        }
    }

    /// Ask the cache to fetch the next few page images.
    fn prefetch_ahead(&mut self, index: usize) {
        if !self.has_cache()
            || self.config.prefetch_ahead == 0
            || self.prefetched_from == Some(index)
        {
            return;
        }
        let Some(catalog) = self.catalog.as_ref() else {
            return;
        };
        let pages: Vec<String> = (index + 1..)
            .take(self.config.prefetch_ahead)
            .filter_map(|i| catalog.image_url(i).map(str::to_string))
            .collect();
        self.prefetched_from = Some(index);
        if !pages.is_empty() {
            self.post_cache(CacheCommand::CacheFlipbookPages { pages });
        }
    }

    pub fn cache_status(&self, timeout: Duration) -> Result<CacheStatus> {
        let cache = self
            .cache
            .as_ref()
            .ok_or(FlipbookError::Cache(CacheError::Disconnected))?;
        Ok(cache.status(timeout)?)
    }

    // ------------------------------------------------------------------
    // Frame update
    // ------------------------------------------------------------------

    /// Advance timers, apply finished loads and follow the flip engine.
    pub fn tick(&mut self, now: Instant) {
        self.poll_catalog(now);
        if self.catalog.is_none() {
            return;
        }
        self.process_loads();
        self.update_phase();

        if self.cover.tick(now) {
            self.nav.go_to_page(1);
        }
        if let Some(next) = self.jump.tick(self.nav.current_page(), now) {
            self.nav.go_to_page(next);
        }
        self.autoplay.sync(self.nav.is_playing(), now);
        if self.autoplay.tick(now) {
            self.nav.advance_auto_play();
        }

        for index in self.engine.take_flip_events() {
            if self.cover.is_transitioning() {
                log::trace!("Ignoring flip to {} during cover transition", index);
                continue;
            }
            if let Some(index) = self.flip.on_flip(index) {
                self.engine_page = Some(index);
                self.nav.go_to_page(index);
            }
        }

        self.after_change();
    }

    /// React to queued navigation events and forward them to the host callback.
    fn after_change(&mut self) {
        for event in self.nav.drain_events() {
            match event {
                NavigationEvent::PageChanged(index) => self.on_page_changed(index),
                NavigationEvent::ZoomChanged(level) if level <= 1.0 => {
                    self.nav.set_pan_offset(PanOffset::ZERO);
                    self.pan.end_drag();
                }
                _ => {}
            }
            if let Some(callback) = self.on_event.as_mut() {
                callback(event);
            }
        }
    }

    fn on_page_changed(&mut self, index: usize) {
        log::debug!("Page changed to {}", index + 1);
        self.cover.on_page_changed(index);
        if self.engine_page != Some(index) {
            self.engine_page = Some(index);
            self.flip.turn(&mut self.engine, index);
        }
        self.url_sync.sync(&mut self.host, index);
        self.prefetch_ahead(index);
        let due = self.loader.update(index);
        self.start_loads(&due);
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Execute one action. Returns whether it had any effect to apply.
    pub fn dispatch(&mut self, action: ViewerAction, now: Instant) -> bool {
        if self.catalog.is_none() {
            return false;
        }
        log::trace!("Dispatch {:?}", action);

        let handled = match action {
            ViewerAction::NextPage => {
                self.nav.next_page();
                true
            }
            ViewerAction::PreviousPage => {
                self.nav.previous_page();
                true
            }
            ViewerAction::FirstPage => self.start_jump(0, now),
            ViewerAction::LastPage => self.start_jump(self.nav.last_index(), now),
            ViewerAction::GoToPage(index) => self.nav.go_to_page(index),
            ViewerAction::ToggleAutoPlay => {
                self.nav.toggle_auto_play();
                self.autoplay.sync(self.nav.is_playing(), now);
                true
            }
            ViewerAction::ToggleFullscreen => {
                self.nav.toggle_fullscreen(&mut self.host);
                true
            }
            ViewerAction::ExitFullscreen => {
                let fullscreen = self.nav.is_fullscreen();
                if fullscreen {
                    self.nav.toggle_fullscreen(&mut self.host);
                }
                fullscreen
            }
            ViewerAction::ToggleThumbnails => {
                self.nav.toggle_thumbnails();
                true
            }
            ViewerAction::ToggleToc => {
                self.nav.toggle_toc();
                true
            }
            ViewerAction::ZoomIn => {
                self.nav.zoom_in();
                true
            }
            ViewerAction::ZoomOut => {
                self.nav.zoom_out();
                true
            }
            ViewerAction::ResetZoom => {
                self.nav.reset_zoom();
                self.pan.end_drag();
                true
            }
            ViewerAction::SetZoom(level) => {
                self.nav.set_zoom(level);
                true
            }
            ViewerAction::RetryPage(index) => {
                let retried = self.loader.retry_page(index);
                if retried {
                    let due = self.loader.update(self.nav.current_page());
                    self.start_loads(&due);
                }
                retried
            }
        };

        self.after_change();
        handled
    }

    /// Start an animated walk to `target` and take its first step right away.
    fn start_jump(&mut self, target: usize, now: Instant) -> bool {
        let current = self.nav.current_page();
        if !self.jump.start(current, target, now) {
            return false;
        }
        if let Some(next) = self.jump.tick(current, now) {
            self.nav.go_to_page(next);
        }
        true
    }

    /// Keyboard entry point. Returns the action taken; the caller suppresses the
    /// browser default only then.
    pub fn handle_key(
        &mut self,
        key: Key,
        modifiers: Modifiers,
        input_focused: bool,
        now: Instant,
    ) -> Option<ViewerAction> {
        let ctx = KeyContext {
            enabled: self.config.enable_keyboard,
            viewer_focused: self.nav.is_focused(),
            input_focused,
            fullscreen: self.nav.is_fullscreen(),
        };
        let action = map_key(key, modifiers, &ctx)?;
        self.dispatch(action.clone(), now);
        Some(action)
    }

    /// Submit the jump box. Unresolvable input is ignored.
    pub fn submit_jump(&mut self, text: &str, now: Instant) -> bool {
        let Some(catalog) = self.catalog.as_ref() else {
            return false;
        };
        match resolve_page_number(text, &catalog.page_numbers()) {
            Some(index) => {
                self.jump_input.clear();
                self.dispatch(ViewerAction::GoToPage(index), now)
            }
            None => {
                log::debug!("Ignoring jump to '{}'", text);
                false
            }
        }
    }

    /// Submit whatever is typed in the jump box.
    pub fn submit_jump_input(&mut self, now: Instant) -> bool {
        let text = self.jump_input.text().to_string();
        self.submit_jump(&text, now)
    }

    pub fn select_toc(&mut self, path: &[usize], now: Instant) -> bool {
        match self.toc.select(path) {
            Some(action) => self.dispatch(action, now),
            None => false,
        }
    }

    pub fn toggle_toc_entry(&mut self, path: &[usize]) -> bool {
        self.toc.toggle(path)
    }

    pub fn select_thumbnail(&mut self, index: usize, now: Instant) -> bool {
        let action = self.thumbnails.select(index);
        self.dispatch(action, now)
    }

    // ------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------

    /// Pointer pressed on the page area. Returns `true` if stabilization
    /// swallowed it.
    pub fn pointer_down(&mut self, pos: (f32, f32)) -> bool {
        self.nav.set_focused(true);
        if self.nav.needs_stabilization() {
            log::debug!("Press swallowed after regaining focus");
            self.nav.stabilize();
            self.swallow_click = true;
            return true;
        }
        self.pan
            .start_drag(pos, self.nav.pan_offset(), self.nav.zoom_level());
        false
    }

    pub fn pointer_move(&mut self, pos: (f32, f32)) {
        if let Some(offset) = self
            .pan
            .update_drag(pos, self.container, self.nav.zoom_level())
        {
            self.nav.set_pan_offset(offset);
        }
    }

    /// Pointer or touch released.
    pub fn pointer_up(&mut self) {
        self.pan.end_drag();
    }

    pub fn cursor(&self) -> &'static str {
        self.pan.cursor(self.nav.zoom_level())
    }

    /// Size of the zoom container in pixels. The pan offset is re-clamped.
    pub fn set_container_size(&mut self, width: f32, height: f32) {
        self.container = (width, height);
        let offset = constrain_pan(self.nav.pan_offset(), self.container, self.nav.zoom_level());
        self.nav.set_pan_offset(offset);
    }

    /// Click on the page area away from any hotspot. `x_fraction` is the click
    /// position across the page area (0 = left edge); the left half flips back.
    pub fn handle_click(&mut self, x_fraction: f32, now: Instant) -> ClickOutcome {
        if self.catalog.is_none() {
            return ClickOutcome::Ignored;
        }
        self.nav.set_focused(true);
        if self.swallow_click {
            self.swallow_click = false;
            return ClickOutcome::Swallowed;
        }
        if self.nav.needs_stabilization() {
            log::debug!("Click swallowed after regaining focus");
            self.nav.stabilize();
            return ClickOutcome::Swallowed;
        }

        let current = self.nav.current_page();
        if self.cover.click(current, now) {
            return ClickOutcome::CoverOpened;
        }
        if self.cover.is_transitioning() {
            return ClickOutcome::Ignored;
        }

        if x_fraction < 0.5 {
            self.nav.previous_page();
        } else {
            self.nav.next_page();
        }
        self.after_change();
        if self.nav.current_page() != current {
            ClickOutcome::Flipped
        } else {
            ClickOutcome::Ignored
        }
    }

    /// Click at pixel `(px, py)` on page `page_index` drawn in `page_box`.
    /// Hotspots get the click first.
    pub fn click_at(
        &mut self,
        page_index: usize,
        page_box: Rect,
        px: f32,
        py: f32,
        now: Instant,
    ) -> ClickOutcome {
        let hit = overlay::hit_test(&self.hotspot_regions(page_index, page_box), px, py)
            .map(|region| region.index);
        if let Some(hotspot_index) = hit {
            return match self.activate_hotspot(page_index, hotspot_index) {
                Some(action) => ClickOutcome::Hotspot(action),
                None => ClickOutcome::Ignored,
            };
        }
        let x_fraction = if page_box.width > 0.0 {
            (px - page_box.x) / page_box.width
        } else {
            0.5
        };
        self.handle_click(x_fraction, now)
    }

    /// Whether a pointer event at `(px, py)` must stop at a hotspot.
    pub fn pointer_disposition(
        &self,
        page_index: usize,
        page_box: Rect,
        px: f32,
        py: f32,
    ) -> EventDisposition {
        overlay::pointer_disposition(&self.hotspot_regions(page_index, page_box), px, py)
    }

    // ------------------------------------------------------------------
    // Hotspots
    // ------------------------------------------------------------------

    /// Clickable regions of a page drawn in `page_box`. Empty until the page image
    /// has loaded and its size is known.
    pub fn hotspot_regions(&self, page_index: usize, page_box: Rect) -> Vec<HotspotRegion> {
        let Some(page) = self.catalog.as_ref().and_then(|c| c.page(page_index)) else {
            return Vec::new();
        };
        if !self.loader.is_page_loaded(page_index) {
            return Vec::new();
        }
        let Some(size) = self.loader.page_size(page_index) else {
            return Vec::new();
        };
        overlay::layout(&page.hotspots, overlay::fit_image(page_box, size))
    }

    /// Activate a hotspot and carry out its navigation through the host.
    pub fn activate_hotspot(
        &mut self,
        page_index: usize,
        hotspot_index: usize,
    ) -> Option<HotspotAction> {
        let hotspot = self
            .catalog
            .as_ref()?
            .page(page_index)?
            .hotspots
            .get(hotspot_index)?;
        let action = overlay::activate(hotspot, &self.host.current_url(), &self.config.search_path)?;
        log::info!("Hotspot {} activated: {:?}", hotspot.id, action);
        match &action {
            HotspotAction::NavigateInternal(url) | HotspotAction::NavigateSearch(url) => {
                self.host.navigate(url)
            }
            HotspotAction::OpenExternal(url) => self.host.open_new_context(url),
        }
        Some(action)
    }

    // ------------------------------------------------------------------
    // Platform notifications
    // ------------------------------------------------------------------

    /// Document visibility changed.
    pub fn on_visibility_change(&mut self, hidden: bool) {
        if hidden {
            self.nav.request_stabilization();
            self.pan.end_drag();
        }
    }

    pub fn on_window_blur(&mut self) {
        self.nav.request_stabilization();
        self.pan.end_drag();
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.nav.set_focused(focused);
    }

    /// Fullscreen change reported by the platform.
    pub fn on_fullscreen_change(&mut self, fullscreen: bool) {
        self.nav.on_fullscreen_change(fullscreen);
        self.after_change();
    }

    /// Viewport moved or resized; pages near it start loading.
    pub fn observe_viewport(&mut self, top: f32, height: f32, boxes: &[PageBox]) {
        let current = self.nav.current_page();
        let visible = self.viewport.observe(top, height, boxes, current).clone();
        self.loader.set_viewport_visible(visible);
        let due = self.loader.update(current);
        self.start_loads(&due);
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// What to draw for every page.
    pub fn render_plan(&self) -> Vec<PageRender> {
        let Some(catalog) = self.catalog.as_ref() else {
            return Vec::new();
        };
        (0..catalog.len())
            .filter_map(|i| self.loader.render_plan(catalog, i))
            .collect()
    }

    /// Page number to show on page `index`: only once its image has loaded, and
    /// only when page numbers are enabled.
    pub fn page_badge(&self, index: usize) -> Option<u32> {
        if !self.config.show_page_numbers || !self.loader.is_page_loaded(index) {
            return None;
        }
        self.catalog.as_ref()?.page(index).map(|p| p.page_number)
    }

    pub fn toolbar(&self) -> Toolbar {
        Toolbar::build(
            &self.nav,
            ToolbarOptions {
                thumbnails_toggle: self.config.show_thumbnails,
                toc_toggle: self.config.show_toc && !self.toc.is_empty(),
            },
        )
    }

    pub fn toc_rows(&self) -> Vec<TocRow> {
        self.toc.rows(self.nav.current_page())
    }

    pub fn thumbnails(&self) -> Vec<Thumbnail> {
        match self.catalog.as_ref() {
            Some(catalog) => self.thumbnails.items(catalog, self.nav.current_page()),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flip::RecordingFlipEngine;
    use crate::host::MemoryHost;
    use crate::links::query_param;
    use crate::loader::png_bytes;
    use crate::model::{Hotspot, Page};
    use crate::provider::StaticPageDataProvider;
    use crate::error::ProviderError;
    use flipbook_cache::{
        CacheCoordinator, CoordinatorConfig, HttpResponse, MemoryFetcher, MemoryStore,
    };
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type TestViewer = Viewer<MemoryHost, RecordingFlipEngine>;

    fn image_url(id: &str, n: u32) -> String {
        format!("http://cdn.test/uploads/flipbooks/{}/{}.png", id, n)
    }

    fn catalog_with_numbers(id: &str, numbers: &[u32]) -> Catalog {
        Catalog::new(
            id,
            format!("Catalog {}", id),
            numbers
                .iter()
                .map(|&n| Page::new(n, image_url(id, n)))
                .collect(),
        )
    }

    fn catalog(id: &str, pages: u32) -> Catalog {
        catalog_with_numbers(id, &(1..=pages).collect::<Vec<_>>())
    }

    fn serve(fetcher: &MemoryFetcher, catalog: &Catalog) {
        for page in &catalog.pages {
            fetcher.respond(&page.image_url, HttpResponse::ok(png_bytes(4, 6)));
        }
    }

    fn inline_config() -> ViewerConfig {
        ViewerConfig {
            use_background_worker: false,
            show_cover: false,
            precache_first_pages: 0,
            ..ViewerConfig::default()
        }
    }

    fn viewer_with(config: ViewerConfig, catalogs: Vec<Catalog>, url: &str) -> (TestViewer, Arc<MemoryFetcher>) {
        let fetcher = Arc::new(MemoryFetcher::new());
        for c in &catalogs {
            serve(&fetcher, c);
        }
        let viewer = Viewer::new(
            config,
            Arc::new(StaticPageDataProvider::new(catalogs)),
            fetcher.clone(),
            MemoryHost::new(url),
            RecordingFlipEngine::new(),
        );
        (viewer, fetcher)
    }

    /// Tick until the load sequence is over (or five seconds pass).
    fn settle(viewer: &mut TestViewer) {
        let deadline = Instant::now() + Duration::from_secs(5);
        viewer.tick(Instant::now());
        while viewer.phase().is_loading() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            viewer.tick(Instant::now());
        }
    }

    fn ready_viewer(pages: u32, url: &str) -> TestViewer {
        let (mut viewer, _) = viewer_with(inline_config(), vec![catalog("c1", pages)], url);
        let now = Instant::now();
        viewer.load(now).unwrap();
        viewer.tick(now);
        viewer
    }

    #[test]
    fn test_url_round_trip() {
        let mut viewer = ready_viewer(20, "http://localhost:3000/catalog?page=7");
        assert_eq!(viewer.navigation().current_page(), 6);

        let now = Instant::now();
        viewer.dispatch(ViewerAction::NextPage, now);
        viewer.dispatch(ViewerAction::NextPage, now);
        let url = viewer.host().current_url();
        assert_eq!(query_param(&url, "page").as_deref(), Some("9"));
        assert!(url.starts_with("http://localhost:3000/catalog?"));
    }

    #[test]
    fn test_out_of_range_url_falls_back() {
        let viewer = ready_viewer(5, "http://localhost:3000/catalog?page=40");
        assert_eq!(viewer.navigation().current_page(), 0);
        assert_eq!(
            query_param(&viewer.host().current_url(), "page").as_deref(),
            Some("1")
        );
    }

    #[test]
    fn test_load_sequence_reaches_ready() {
        let (mut viewer, _) =
            viewer_with(inline_config(), vec![catalog("c1", 20)], "http://localhost/?page=7");
        let now = Instant::now();
        viewer.load(now).unwrap();
        assert_eq!(
            viewer.phase(),
            &LoadPhase::PreloadingImages { loaded: 0, total: 7 }
        );

        viewer.tick(now);
        assert!(viewer.phase().is_ready());
        assert_eq!(viewer.loader().loaded_count(), 7);
        assert_eq!(viewer.engine().turns, vec![6]);

        let plan = viewer.render_plan();
        assert_eq!(plan.len(), 20);
        assert_eq!(
            plan[6],
            PageRender::Image {
                url: image_url("c1", 7),
                page_number: 7,
                loaded: true
            }
        );
        assert_eq!(plan[0], PageRender::Placeholder { page_number: 1 });
    }

    #[test]
    fn test_failed_image_is_local() {
        let (mut viewer, fetcher) =
            viewer_with(inline_config(), vec![catalog("c1", 5)], "http://localhost/");
        fetcher.respond(&image_url("c1", 2), HttpResponse::with_status(404, Vec::new()));
        let now = Instant::now();
        viewer.load(now).unwrap();
        viewer.tick(now);

        assert!(viewer.phase().is_ready());
        assert_eq!(viewer.render_plan()[1], PageRender::Failed { page_number: 2 });

        fetcher.respond(&image_url("c1", 2), HttpResponse::ok(png_bytes(2, 2)));
        assert!(viewer.dispatch(ViewerAction::RetryPage(1), now));
        viewer.tick(now);
        assert!(viewer.loader().is_page_loaded(1));
        assert!(viewer.dispatch(ViewerAction::NextPage, now));
    }

    #[test]
    fn test_navigation_boundaries() {
        let mut viewer = ready_viewer(3, "http://localhost/");
        let now = Instant::now();
        viewer.dispatch(ViewerAction::PreviousPage, now);
        assert_eq!(viewer.navigation().current_page(), 0);

        assert!(!viewer.dispatch(ViewerAction::GoToPage(3), now));
        assert!(viewer.dispatch(ViewerAction::GoToPage(2), now));
        viewer.dispatch(ViewerAction::NextPage, now);
        assert_eq!(viewer.navigation().current_page(), 2);
    }

    #[test]
    fn test_auto_play_wraps_to_first_page() {
        let mut viewer = ready_viewer(5, "http://localhost/?page=5");
        let start = Instant::now();
        viewer.dispatch(ViewerAction::ToggleAutoPlay, start);
        assert!(viewer.navigation().is_playing());

        viewer.tick(start + Duration::from_millis(2999));
        assert_eq!(viewer.navigation().current_page(), 4);
        viewer.tick(start + Duration::from_millis(3000));
        assert_eq!(viewer.navigation().current_page(), 0);

        viewer.dispatch(ViewerAction::ToggleAutoPlay, start);
        viewer.tick(start + Duration::from_millis(9000));
        assert_eq!(viewer.navigation().current_page(), 0);
    }

    #[test]
    fn test_animated_jump_blocks_new_jumps() {
        let mut viewer = ready_viewer(10, "http://localhost/");
        let start = Instant::now();
        assert!(viewer.dispatch(ViewerAction::LastPage, start));
        assert_eq!(viewer.navigation().current_page(), 1);
        assert!(!viewer.dispatch(ViewerAction::FirstPage, start));

        for step in 2..=9u64 {
            viewer.tick(start + Duration::from_millis(80 * (step - 1)));
            assert_eq!(viewer.navigation().current_page(), step as usize);
        }
        assert!(!viewer.is_jumping());
        assert!(viewer.dispatch(ViewerAction::FirstPage, start));
    }

    #[test]
    fn test_jump_box_with_page_gap() {
        let (mut viewer, _) = viewer_with(
            inline_config(),
            vec![catalog_with_numbers("gap", &[1, 2, 5, 6])],
            "http://localhost/",
        );
        let now = Instant::now();
        viewer.load(now).unwrap();

        viewer.jump_input_mut().insert("4");
        assert!(viewer.submit_jump_input(now));
        assert_eq!(viewer.navigation().current_page(), 2);
        assert_eq!(viewer.catalog().unwrap().pages[2].page_number, 5);

        assert!(!viewer.submit_jump("abc", now));
        assert!(!viewer.submit_jump("", now));
        assert_eq!(viewer.navigation().current_page(), 2);
    }

    fn hotspot_catalog() -> Catalog {
        let page = Page::new(1, image_url("h", 1))
            .with_hotspot(Hotspot::new("int", 10.0, 10.0, 20.0, 10.0).with_link("/shop/abc123"))
            .with_hotspot(
                Hotspot::new("ext", 50.0, 50.0, 20.0, 20.0).with_link("https://example.com"),
            )
            .with_hotspot(Hotspot::new("sku", 0.0, 80.0, 10.0, 10.0).with_sku("abc123"))
            .with_hotspot(Hotspot::new("inert", 0.0, 0.0, 5.0, 5.0));
        Catalog::new("h", "Hotspots", vec![page, Page::new(2, image_url("h", 2))])
    }

    #[test]
    fn test_hotspot_activation() {
        let (mut viewer, _) = viewer_with(
            inline_config(),
            vec![hotspot_catalog()],
            "http://localhost:3000/catalog",
        );
        let now = Instant::now();
        viewer.load(now).unwrap();
        viewer.tick(now);

        assert_eq!(
            viewer.activate_hotspot(0, 0),
            Some(HotspotAction::NavigateInternal("/shop/abc123".to_string()))
        );
        assert_eq!(
            viewer.activate_hotspot(0, 1),
            Some(HotspotAction::OpenExternal("https://example.com".to_string()))
        );
        assert!(matches!(
            viewer.activate_hotspot(0, 2),
            Some(HotspotAction::NavigateSearch(url)) if url.contains("abc123")
        ));
        assert_eq!(viewer.activate_hotspot(0, 3), None);

        let host = viewer.host();
        assert_eq!(host.navigations, vec!["/shop/abc123", "/shop?search=abc123"]);
        assert_eq!(host.opened, vec!["https://example.com"]);
        assert_eq!(viewer.navigation().current_page(), 0);
    }

    #[test]
    fn test_click_prefers_hotspots() {
        let (mut viewer, _) = viewer_with(
            inline_config(),
            vec![hotspot_catalog()],
            "http://localhost:3000/catalog",
        );
        let now = Instant::now();
        viewer.load(now).unwrap();
        viewer.tick(now);

        let page_box = Rect::new(0.0, 0.0, 400.0, 600.0);
        assert_eq!(viewer.hotspot_regions(0, page_box).len(), 3);
        assert_eq!(
            viewer.pointer_disposition(0, page_box, 80.0, 90.0),
            EventDisposition::StopPropagation
        );
        assert_eq!(
            viewer.click_at(0, page_box, 80.0, 90.0, now),
            ClickOutcome::Hotspot(HotspotAction::NavigateInternal("/shop/abc123".to_string()))
        );
        assert_eq!(viewer.navigation().current_page(), 0);

        assert_eq!(
            viewer.click_at(0, page_box, 350.0, 20.0, now),
            ClickOutcome::Flipped
        );
        assert_eq!(viewer.navigation().current_page(), 1);
    }

    #[test]
    fn test_overlay_waits_for_image() {
        let (mut viewer, _) = viewer_with(
            inline_config(),
            vec![hotspot_catalog()],
            "http://localhost:3000/catalog",
        );
        viewer.load(Instant::now()).unwrap();
        assert!(viewer
            .hotspot_regions(0, Rect::new(0.0, 0.0, 400.0, 600.0))
            .is_empty());
    }

    #[test]
    fn test_stabilization_swallows_one_click() {
        let mut viewer = ready_viewer(5, "http://localhost/");
        let now = Instant::now();
        viewer.set_focused(true);

        viewer.on_visibility_change(true);
        viewer.on_visibility_change(false);
        assert!(viewer.navigation().needs_stabilization());

        assert_eq!(viewer.handle_click(0.9, now), ClickOutcome::Swallowed);
        assert_eq!(viewer.navigation().current_page(), 0);
        assert_eq!(viewer.handle_click(0.9, now), ClickOutcome::Flipped);
        assert_eq!(viewer.navigation().current_page(), 1);
    }

    #[test]
    fn test_swallowed_press_swallows_its_click() {
        let mut viewer = ready_viewer(5, "http://localhost/");
        let now = Instant::now();
        viewer.on_window_blur();

        assert!(viewer.pointer_down((10.0, 10.0)));
        viewer.pointer_up();
        assert_eq!(viewer.handle_click(0.9, now), ClickOutcome::Swallowed);
        assert!(!viewer.pointer_down((10.0, 10.0)));
        assert_eq!(viewer.handle_click(0.9, now), ClickOutcome::Flipped);
    }

    #[test]
    fn test_cover_transition() {
        let config = ViewerConfig {
            show_cover: true,
            ..inline_config()
        };
        let (mut viewer, _) = viewer_with(config, vec![catalog("c1", 6)], "http://localhost/");
        let start = Instant::now();
        viewer.load(start).unwrap();
        viewer.tick(start);

        assert_eq!(viewer.handle_click(0.9, start), ClickOutcome::CoverOpened);
        assert_eq!(viewer.navigation().current_page(), 0);

        // Flips reported while the cover opens are dropped.
        viewer.engine_mut().user_flip(3);
        viewer.tick(start + Duration::from_millis(100));
        assert_eq!(viewer.navigation().current_page(), 0);
        assert_eq!(viewer.handle_click(0.9, start), ClickOutcome::Ignored);

        viewer.tick(start + Duration::from_millis(600));
        assert_eq!(viewer.navigation().current_page(), 1);
    }

    #[test]
    fn test_manual_flip_followed() {
        let mut viewer = ready_viewer(6, "http://localhost/");
        let now = Instant::now();
        viewer.engine_mut().user_flip(3);
        viewer.tick(now);
        assert_eq!(viewer.navigation().current_page(), 3);
        // Following a manual flip does not drive the engine again.
        assert_eq!(viewer.engine().turns, vec![0]);

        viewer.dispatch(ViewerAction::NextPage, now);
        assert_eq!(viewer.engine().turns, vec![0, 4]);
        viewer.tick(now);
        assert_eq!(viewer.navigation().current_page(), 4);
    }

    #[test]
    fn test_keyboard_needs_focus() {
        let mut viewer = ready_viewer(5, "http://localhost/");
        let now = Instant::now();
        let none = Modifiers::default();
        assert_eq!(viewer.handle_key(Key::Right, none, false, now), None);

        viewer.set_focused(true);
        assert_eq!(
            viewer.handle_key(Key::Right, none, false, now),
            Some(ViewerAction::NextPage)
        );
        assert_eq!(viewer.navigation().current_page(), 1);

        assert_eq!(viewer.handle_key(Key::Escape, none, false, now), None);
        viewer.handle_key(Key::Char('f'), none, false, now);
        assert!(viewer.navigation().is_fullscreen());
        assert!(viewer.host().fullscreen);
        assert_eq!(
            viewer.handle_key(Key::Escape, none, true, now),
            Some(ViewerAction::ExitFullscreen)
        );
        assert!(!viewer.navigation().is_fullscreen());
    }

    #[test]
    fn test_fullscreen_reconciles_with_platform() {
        let mut viewer = ready_viewer(3, "http://localhost/");
        let now = Instant::now();
        viewer.host_mut().refuse_fullscreen = true;
        viewer.dispatch(ViewerAction::ToggleFullscreen, now);
        assert!(!viewer.navigation().is_fullscreen());

        viewer.on_fullscreen_change(true);
        assert!(viewer.navigation().is_fullscreen());
    }

    #[test]
    fn test_zoom_and_pan() {
        let mut viewer = ready_viewer(3, "http://localhost/");
        let now = Instant::now();
        viewer.set_container_size(800.0, 600.0);

        assert!(!viewer.pointer_down((0.0, 0.0)));
        viewer.pointer_move((50.0, 50.0));
        assert_eq!(viewer.navigation().pan_offset(), PanOffset::ZERO);
        viewer.pointer_up();

        viewer.dispatch(ViewerAction::SetZoom(2.0), now);
        assert_eq!(viewer.cursor(), "grab");
        viewer.pointer_down((0.0, 0.0));
        viewer.pointer_move((1000.0, -50.0));
        assert_eq!(viewer.navigation().pan_offset(), PanOffset::new(400.0, -50.0));

        // Blur releases the drag.
        viewer.on_window_blur();
        viewer.pointer_move((0.0, 0.0));
        assert_eq!(viewer.navigation().pan_offset(), PanOffset::new(400.0, -50.0));

        viewer.dispatch(ViewerAction::ZoomOut, now);
        viewer.dispatch(ViewerAction::ZoomOut, now);
        viewer.dispatch(ViewerAction::ZoomOut, now);
        viewer.dispatch(ViewerAction::ZoomOut, now);
        assert_eq!(viewer.navigation().zoom_level(), 1.0);
        assert_eq!(viewer.navigation().pan_offset(), PanOffset::ZERO);

        for _ in 0..2 {
            viewer.dispatch(ViewerAction::ResetZoom, now);
            assert_eq!(viewer.navigation().zoom_level(), 1.0);
            assert_eq!(viewer.navigation().pan_offset(), PanOffset::ZERO);
        }
    }

    #[test]
    fn test_events_reach_callback() {
        let (viewer, _) = viewer_with(inline_config(), vec![catalog("c1", 4)], "http://localhost/");
        let seen = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&seen);
        let mut viewer = viewer.on_event(Box::new(move |event| {
            if matches!(
                event,
                NavigationEvent::ZoomChanged(_) | NavigationEvent::AutoPlayChanged(_)
            ) {
                counter.set(counter.get() + 1);
            }
        }));
        let now = Instant::now();
        viewer.load(now).unwrap();
        viewer.dispatch(ViewerAction::ZoomIn, now);
        viewer.dispatch(ViewerAction::ToggleAutoPlay, now);
        assert_eq!(seen.get(), 2);
    }

    struct FlakyProvider {
        failures: AtomicUsize,
        catalog: Catalog,
    }

    impl FlakyProvider {
        fn new(failures: usize, catalog: Catalog) -> Self {
            Self {
                failures: AtomicUsize::new(failures),
                catalog,
            }
        }
    }

    impl PageDataProvider for FlakyProvider {
        fn featured_catalog(&self) -> std::result::Result<Catalog, ProviderError> {
            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(ProviderError::Network("connection refused".to_string()));
            }
            Ok(self.catalog.clone())
        }

        fn catalog(&self, _id: &str) -> std::result::Result<Catalog, ProviderError> {
            self.featured_catalog()
        }
    }

    #[test]
    fn test_catalog_error_and_retry() {
        let catalog = catalog("c1", 3);
        let fetcher = Arc::new(MemoryFetcher::new());
        serve(&fetcher, &catalog);
        let mut viewer = Viewer::new(
            inline_config(),
            Arc::new(FlakyProvider::new(1, catalog)),
            fetcher,
            MemoryHost::new("http://localhost/"),
            RecordingFlipEngine::new(),
        );
        let now = Instant::now();

        assert!(viewer.load(now).is_err());
        assert!(viewer.phase().is_error());
        assert!(!viewer.dispatch(ViewerAction::NextPage, now));

        viewer.retry(now).unwrap();
        viewer.tick(now);
        assert!(viewer.phase().is_ready());
    }

    #[test]
    fn test_toolbar_and_panels() {
        let config = ViewerConfig {
            show_thumbnails: true,
            show_toc: true,
            ..inline_config()
        };
        let (mut viewer, _) = viewer_with(config, vec![catalog("c1", 12)], "http://localhost/");
        let now = Instant::now();
        viewer.load(now).unwrap();

        let toolbar = viewer.toolbar();
        assert_eq!(toolbar.indicator, "1 / 12");
        assert!(toolbar.item(crate::input::ToolbarButton::Toc).is_some());

        let rows = viewer.toc_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Cover");
        assert!(rows[0].active);

        assert!(viewer.select_thumbnail(8, now));
        assert_eq!(viewer.navigation().current_page(), 8);
        let thumbs = viewer.thumbnails();
        assert!(thumbs.iter().any(|t| t.index == 8 && t.active));
        assert!(viewer.select_toc(&[0], now));
        assert_eq!(viewer.navigation().current_page(), 0);
    }

    #[test]
    fn test_viewport_expands_loading() {
        let mut viewer = ready_viewer(20, "http://localhost/");
        let boxes: Vec<PageBox> = (0..20)
            .map(|i| PageBox::new(i, i as f32 * 1000.0, 1000.0))
            .collect();
        viewer.observe_viewport(10_000.0, 1000.0, &boxes);
        viewer.tick(Instant::now());
        assert!(viewer.loader().is_page_loaded(10));
        assert!(viewer.loader().is_page_loaded(11));
        assert!(!viewer.loader().is_page_loaded(15));
    }

    #[test]
    fn test_prefetch_and_clear_on_catalog_switch() {
        let fetcher = Arc::new(MemoryFetcher::new());
        let first = catalog("c1", 6);
        let second = catalog("c2", 1);
        serve(&fetcher, &first);
        serve(&fetcher, &second);

        let coordinator = CacheCoordinator::spawn(
            Arc::new(MemoryStore::new()),
            fetcher.clone(),
            CoordinatorConfig::default(),
        )
        .unwrap();
        let cache = coordinator.handle();
        let bucket = cache.config().image_bucket();

        let mut viewer = Viewer::new(
            inline_config(),
            Arc::new(StaticPageDataProvider::new(vec![first, second])),
            fetcher.clone(),
            MemoryHost::new("http://localhost/"),
            RecordingFlipEngine::new(),
        )
        .with_cache(cache.clone());
        let now = Instant::now();
        let wait = Duration::from_secs(5);

        viewer.load(now).unwrap();
        assert!(cache.wait_idle(wait));
        let status = viewer.cache_status(wait).unwrap();
        assert_eq!(status.get(&bucket).copied(), Some(2));

        viewer.dispatch(ViewerAction::NextPage, now);
        assert!(cache.wait_idle(wait));
        let status = viewer.cache_status(wait).unwrap();
        assert_eq!(status.get(&bucket).copied(), Some(3));

        viewer.load_catalog("c2", now).unwrap();
        assert!(cache.wait_idle(wait));
        let status = viewer.cache_status(wait).unwrap();
        assert_eq!(status.get(&bucket).copied().unwrap_or(0), 0);
        assert_eq!(viewer.catalog().map(|c| c.id.as_str()), Some("c2"));
    }

    #[test]
    fn test_cache_status_without_coordinator() {
        let viewer = ready_viewer(2, "http://localhost/");
        assert!(viewer.cache_status(Duration::from_millis(10)).is_err());
    }

    #[test]
    fn test_background_worker_loads_pages() {
        let config = ViewerConfig {
            use_background_worker: true,
            ..inline_config()
        };
        let (mut viewer, _) = viewer_with(config, vec![catalog("c1", 8)], "http://localhost/");
        viewer.load(Instant::now()).unwrap();
        // Nothing is applied before a tick, so the fetch phase is always visible.
        assert_eq!(viewer.phase(), &LoadPhase::FetchingData);
        assert_eq!(viewer.phase().progress(), 10);
        assert!(viewer.catalog().is_none());

        settle(&mut viewer);
        assert!(viewer.phase().is_ready());
        assert_eq!(viewer.loader().loaded_count(), 4);
    }

    #[test]
    fn test_background_catalog_error_and_retry() {
        let catalog = catalog("c1", 3);
        let fetcher = Arc::new(MemoryFetcher::new());
        serve(&fetcher, &catalog);
        let config = ViewerConfig {
            use_background_worker: true,
            ..inline_config()
        };
        let mut viewer = Viewer::new(
            config,
            Arc::new(FlakyProvider::new(1, catalog)),
            fetcher,
            MemoryHost::new("http://localhost/"),
            RecordingFlipEngine::new(),
        );

        assert!(viewer.load(Instant::now()).is_ok());
        settle(&mut viewer);
        assert!(viewer.phase().is_error());
        assert_eq!(
            viewer.phase().status_text(),
            "Failed to load catalog: Network error: connection refused"
        );

        viewer.retry(Instant::now()).unwrap();
        assert_eq!(viewer.phase(), &LoadPhase::FetchingData);
        settle(&mut viewer);
        assert!(viewer.phase().is_ready());
        assert_eq!(viewer.engine().turns, vec![0]);
    }

    #[test]
    fn test_unsorted_catalog_is_sorted_on_load() {
        let (mut viewer, _) = viewer_with(
            inline_config(),
            vec![catalog_with_numbers("mixed", &[5, 1, 2, 6])],
            "http://localhost/",
        );
        let now = Instant::now();
        viewer.load(now).unwrap();
        assert_eq!(viewer.catalog().unwrap().page_numbers(), vec![1, 2, 5, 6]);

        assert!(viewer.submit_jump("4", now));
        assert_eq!(viewer.navigation().current_page(), 2);
        assert_eq!(viewer.catalog().unwrap().pages[2].page_number, 5);
    }

    #[test]
    fn test_fullscreen_survives_reload() {
        let (mut viewer, _) = viewer_with(
            inline_config(),
            vec![catalog("a", 3), catalog("b", 3)],
            "http://localhost/",
        );
        let now = Instant::now();
        viewer.load(now).unwrap();
        viewer.set_focused(true);
        viewer.dispatch(ViewerAction::ToggleFullscreen, now);
        assert!(viewer.host().fullscreen);

        viewer.load_catalog("b", now).unwrap();
        assert!(viewer.navigation().is_fullscreen());
        assert_eq!(
            viewer.handle_key(Key::Escape, Modifiers::default(), false, now),
            Some(ViewerAction::ExitFullscreen)
        );
        assert!(!viewer.host().fullscreen);
        assert!(!viewer.navigation().is_fullscreen());
    }

    #[test]
    fn test_panels_start_from_config_then_follow_user() {
        let config = ViewerConfig {
            show_thumbnails: true,
            show_toc: true,
            ..inline_config()
        };
        let (mut viewer, _) =
            viewer_with(config, vec![catalog("a", 3), catalog("b", 3)], "http://localhost/");
        let now = Instant::now();
        viewer.load(now).unwrap();
        assert!(viewer.navigation().show_thumbnails());
        assert!(viewer.navigation().show_toc());

        viewer.dispatch(ViewerAction::ToggleToc, now);
        viewer.load_catalog("b", now).unwrap();
        assert!(viewer.navigation().show_thumbnails());
        assert!(!viewer.navigation().show_toc());

        let (mut plain, _) = viewer_with(inline_config(), vec![catalog("a", 3)], "http://localhost/");
        plain.load(now).unwrap();
        assert!(!plain.navigation().show_thumbnails());
        assert!(!plain.navigation().show_toc());
    }

    #[test]
    fn test_page_badge_after_load() {
        let mut viewer = ready_viewer(10, "http://localhost/");
        assert_eq!(viewer.page_badge(0), Some(1));
        assert_eq!(viewer.page_badge(9), None);
        assert_eq!(viewer.page_badge(40), None);

        viewer.config.show_page_numbers = false;
        assert_eq!(viewer.page_badge(0), None);
    }
}
