pub mod batch;
pub mod job;
pub mod loaders;
pub mod run_result;

pub use batch::{BatchSnapshot, BatchState, BatchStatus, BatchSummary, RowError};
pub use job::{is_video_url, parse_track_number, JobDescriptor, JobDraft, TagFields};
pub use loaders::load_batch_file;
pub use run_result::RunResult;
