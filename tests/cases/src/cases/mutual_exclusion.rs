use election_modules::InMemoryCoordinationStore;

use crate::steps;

const ROUNDS: usize = 6;

pub fn run() {
	let message = "exclusive msg";
	let identities = vec!["Speaker-A", "Speaker-B", "Speaker-C"];
	let cluster = steps::cluster::start_cluster(InMemoryCoordinationStore::new(), message, identities.clone());

	for round in 0..ROUNDS {
		let leader = cluster.expected_leader().expect("some candidate is registered");
		cluster.wait_for_leader(&leader);

		// in steady state only the leader writes
		steps::sleep_millis(100);
		let before: Vec<usize> = cluster.candidates.iter().map(|candidate| candidate.sink.len()).collect();
		steps::sleep_millis(300);

		for (candidate, written) in cluster.candidates.iter().zip(before) {
			if candidate.identity == leader {
				assert!(candidate.sink.len() > written, "leader {} is silent", leader);
			} else {
				assert_eq!(written, candidate.sink.len(), "follower {} wrote records", candidate.identity);
			}
		}

		info!("Round {}: expiring leader {}", round, leader);
		let old_sequence = cluster.candidate_sequence(&leader);
		cluster.expire_session_of(&leader);

		let rejoined = steps::wait_until(steps::get_wait_timeout(), || {
			let sequence = cluster.candidate_sequence(&leader);
			sequence.is_some() && sequence != old_sequence
		});
		assert!(rejoined, "{} did not rejoin", leader);
	}

	// every candidate led twice
	for identity in identities {
		assert!(!cluster.candidate(identity).sink.is_empty());
		steps::records::assert_numbered_records(cluster.candidate(identity), message);
	}
	cluster.assert_no_failures();

	cluster.terminate();
}
