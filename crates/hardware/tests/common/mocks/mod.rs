//! Mock collaborators for the core.



/// Recording code prefetcher.
pub mod prefetcher;

pub use memory::ScriptedMemory;
pub use oracle::ScriptedOracle;
pub use prefetcher::RecordingPrefetcher;
