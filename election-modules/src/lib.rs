#[macro_use]
extern crate log;
extern crate crossbeam_channel;
extern crate zk_election;

mod identity;
mod sink;
mod store;

pub use identity::process_identity;
pub use sink::file_sink::FileRecordSink;
pub use sink::memory_sink::MemoryRecordSink;
pub use store::{InMemoryCoordinationStore, InMemorySession};
