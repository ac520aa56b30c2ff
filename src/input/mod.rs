//! Input adapters that turn clicks, key presses and typed text into viewer actions.

pub mod jump_input;
pub mod keyboard;
pub mod thumbnails;
pub mod toc;
pub mod toolbar;

pub use jump_input::{JumpInput, resolve_page_number};
pub use keyboard::{Key, KeyContext, Modifiers, map_key};
pub use thumbnails::{Thumbnail, ThumbnailStrip};
pub use toc::{TocPanel, TocRow};
pub use toolbar::{Toolbar, ToolbarButton, ToolbarItem, ToolbarOptions};
