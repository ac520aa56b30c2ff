//! Global constants for the flipbook viewer

/// Minimum zoom level
pub const MIN_ZOOM: f32 = 0.5;

/// Maximum zoom level
pub const MAX_ZOOM: f32 = 3.0;

/// Zoom change per zoom-in/zoom-out step
pub const ZOOM_STEP: f32 = 0.25;

/// Default auto-play interval in milliseconds
pub const DEFAULT_AUTO_PLAY_INTERVAL_MS: u64 = 3000;

/// Default lazy-loading buffer radius (pages on each side of the current one)
pub const DEFAULT_PRELOAD_PAGES: usize = 3;

/// Default number of upcoming pages handed to the cache coordinator on each flip
pub const DEFAULT_PREFETCH_AHEAD: usize = 2;

/// Default number of pages pre-warmed when a catalog loads
pub const DEFAULT_PRECACHE_FIRST_PAGES: usize = 3;

/// Default delay between steps of an animated jump, in milliseconds
pub const DEFAULT_JUMP_STEP_DELAY_MS: u64 = 80;

/// Duration of the cover-opening transition, in milliseconds
pub const COVER_TRANSITION_MS: u64 = 600;

/// Viewport margin for visibility tracking, as a fraction of viewport height
pub const VIEWPORT_ROOT_MARGIN: f32 = 0.5;

/// Images fetched concurrently by the preload worker
pub const PRELOAD_CHUNK_SIZE: usize = 3;

/// Default backend origin
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Default product search route used for SKU-only hotspots
pub const DEFAULT_SEARCH_PATH: &str = "/shop";

/// Query parameter holding the 1-based page number
pub const PAGE_QUERY_PARAM: &str = "page";

/// Load progress after catalog metadata arrives
pub const PROGRESS_DATA_FETCHED: u8 = 10;

/// Load progress once all initial images are in
pub const PROGRESS_IMAGES_DONE: u8 = 90;

/// Load progress when the viewer is ready
pub const PROGRESS_READY: u8 = 100;

/// Thumbnails shown at once in the thumbnail strip
pub const THUMBNAIL_WINDOW: usize = 7;
