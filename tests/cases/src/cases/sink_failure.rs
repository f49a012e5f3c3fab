use election_modules::{InMemoryCoordinationStore, MemoryRecordSink};

use crate::steps;
use crate::steps::records::FailingRecordSink;

pub fn run() {
	let message = "sink failure msg";
	let mut cluster = steps::cluster::start_cluster(InMemoryCoordinationStore::new(), message, Vec::new());

	// a leader that cannot write reports the failure and leaves the election
	cluster.start_with_sink("Speaker-A", FailingRecordSink, MemoryRecordSink::new());
	let failure = cluster.wait_for_failure("Speaker-A");
	assert_eq!("Cannot append record", failure.text());

	let released = steps::wait_until(steps::get_wait_timeout(), || cluster.candidate_node("Speaker-A").is_none());
	assert!(released, "failed leader still holds its candidate node");
	assert!(cluster.leaders().is_empty());

	// the next candidate is not blocked
	cluster.add_candidate("Speaker-B");
	cluster.wait_for_leader("Speaker-B");

	let speaker_b = cluster.candidate("Speaker-B");
	let spoken = steps::wait_until(steps::get_wait_timeout(), || !speaker_b.sink.is_empty());
	assert!(spoken, "new leader wrote nothing");
	steps::records::assert_numbered_records(speaker_b, message);

	cluster.terminate();
}
