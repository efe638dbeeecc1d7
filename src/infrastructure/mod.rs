pub mod completion;
pub mod page_driver;

pub use completion::{completion_signal, CompletionNotifier, CompletionSignal, SignalOutcome, WatchOutcome};
pub use page_driver::PageDriver;
