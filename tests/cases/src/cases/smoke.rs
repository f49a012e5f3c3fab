use election_modules::InMemoryCoordinationStore;

use crate::steps;

pub fn run() {
	let message = "a Speaker msg, being written to file";
	let cluster = steps::cluster::start_cluster(InMemoryCoordinationStore::new(), message, vec!["Speaker-pid-1"]);

	// a lone candidate elects itself
	cluster.wait_for_leader("Speaker-pid-1");

	let speaker = cluster.candidate("Speaker-pid-1");
	let spoken = steps::wait_until(steps::get_wait_timeout(), || speaker.sink.len() >= 3);
	assert!(spoken, "leader wrote {} records", speaker.sink.len());

	assert_eq!("a Speaker msg, being written to file: 0 Speaker-pid-1\n", speaker.sink.records()[0]);
	steps::records::assert_numbered_records(speaker, message);
	cluster.assert_no_failures();

	let store = cluster.store.clone();
	cluster.terminate();

	// the closed session takes its candidate node along
	assert!(store.children_of("/ELECTION").is_empty());
	assert_eq!(0, store.session_count());
}
