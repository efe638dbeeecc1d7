pub mod download_watcher;
pub mod tagger;
pub mod traits;

pub use download_watcher::{PollingWatcher, StabilityTracker};
pub use tagger::Id3Tagger;
pub use traits::{BrowserAutomation, BrowserSession, DirSnapshot, DownloadWatcher, TagMap, Tagger};
