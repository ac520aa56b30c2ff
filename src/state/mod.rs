//! Viewer state: navigation, timers, gestures, and URL sync.

mod autoplay;
mod cover;
mod jump;
mod navigation;
mod pan;
mod url_sync;

pub use autoplay::AutoPlayTimer;
pub use cover::CoverTransition;
pub use jump::{JumpAnimator, JumpState};
pub use navigation::{NavigationEvent, NavigationState, PanOffset};
pub use pan::{PanGesture, constrain as constrain_pan, max_pan};
pub use url_sync::{UrlSync, initial_page_from_url};
