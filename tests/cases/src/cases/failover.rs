use election_modules::InMemoryCoordinationStore;

use crate::steps;

pub fn run() {
	let message = "failover msg";
	let store = InMemoryCoordinationStore::with_first_sequence(10);
	let cluster = steps::cluster::start_cluster(store, message, vec!["Speaker-A", "Speaker-B", "Speaker-C"]);

	assert_eq!(Some(10), cluster.candidate_sequence("Speaker-A"));
	assert_eq!(Some(11), cluster.candidate_sequence("Speaker-B"));
	assert_eq!(Some(12), cluster.candidate_sequence("Speaker-C"));

	cluster.wait_for_leader("Speaker-A");

	// the leader's session expires; the next lowest sequence takes over
	cluster.expire_session_of("Speaker-A");
	cluster.wait_for_leader("Speaker-B");

	// the old leader rejoins at the end of the line
	let rejoined = steps::wait_until(steps::get_wait_timeout(), || cluster.candidate_sequence("Speaker-A") == Some(13));
	assert!(rejoined, "Speaker-A did not rejoin");

	steps::sleep_millis(200);
	assert_eq!(vec!["Speaker-B".to_string()], cluster.leaders());

	let speaker_b = cluster.candidate("Speaker-B");
	let spoken = steps::wait_until(steps::get_wait_timeout(), || !speaker_b.sink.is_empty());
	assert!(spoken, "new leader wrote nothing");

	assert!(cluster.candidate("Speaker-C").sink.is_empty());
	for candidate in &cluster.candidates {
		steps::records::assert_numbered_records(candidate, message);
	}
	cluster.assert_no_failures();

	cluster.terminate();
}
