use election_modules::InMemoryCoordinationStore;

use crate::steps;

pub fn run() {
	let message = "disconnect msg";
	let cluster = steps::cluster::start_cluster(InMemoryCoordinationStore::new(), message, vec!["Speaker-A", "Speaker-B"]);

	cluster.wait_for_leader("Speaker-A");
	let node = cluster.candidate_node("Speaker-A").expect("leader has a candidate node");
	let session_id = cluster.session_of("Speaker-A");

	// connection loss: the leader steps down, its node stays and blocks the follower
	assert!(cluster.store.disconnect(session_id));
	let stepped_down = steps::wait_until(steps::get_wait_timeout(), || cluster.leaders().is_empty());
	assert!(stepped_down, "leaders after disconnect: {:?}", cluster.leaders());

	steps::sleep_millis(100);
	let written = cluster.candidate("Speaker-A").sink.len();
	steps::sleep_millis(300);

	assert!(cluster.leaders().is_empty());
	assert_eq!(written, cluster.candidate("Speaker-A").sink.len());
	assert_eq!(Some(node.clone()), cluster.candidate_node("Speaker-A"));

	// the resumed session keeps its node and its leadership
	assert!(cluster.store.reconnect(session_id));
	cluster.wait_for_leader("Speaker-A");

	assert_eq!(Some(node), cluster.candidate_node("Speaker-A"));
	assert_eq!(2, cluster.store.children_of("/ELECTION").len());
	steps::records::assert_numbered_records(cluster.candidate("Speaker-A"), message);
	cluster.assert_no_failures();

	cluster.terminate();
}
