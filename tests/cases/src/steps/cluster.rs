use election_modules::{InMemoryCoordinationStore, MemoryRecordSink};
use zk_election::{parse_sequence_number, start_candidate, CandidateConfiguration, CandidateWorker, ElectionConfiguration, ElectionError, RecordSink};

use crate::steps;

pub struct CaseCandidate {
	pub identity: String,
	pub sink: MemoryRecordSink,
	worker: CandidateWorker,
}

pub struct CaseCluster {
	pub store: InMemoryCoordinationStore,
	pub election: ElectionConfiguration,
	pub message: String,
	pub candidates: Vec<CaseCandidate>,
}

pub fn start_cluster(store: InMemoryCoordinationStore, message: &str, identities: Vec<&str>) -> CaseCluster {
	let mut cluster = CaseCluster {
		store,
		election: steps::get_election_configuration(),
		message: message.to_string(),
		candidates: Vec::new(),
	};

	for identity in identities {
		cluster.add_candidate(identity);
	}

	cluster
}

impl CaseCluster {
	/// Starts a candidate and waits for its node, so candidates get sequence numbers in start order.
	pub fn add_candidate(&mut self, identity: &str) {
		let sink = MemoryRecordSink::new();
		self.start_with_sink(identity, sink.clone(), sink);

		let registered = steps::wait_until(steps::get_wait_timeout(), || self.candidate_node(identity).is_some());
		assert!(registered, "candidate {} did not register", identity);
	}

	/// Starts a candidate writing to the given sink. `records` is what the case inspects.
	pub fn start_with_sink<S: RecordSink>(&mut self, identity: &str, sink: S, records: MemoryRecordSink) {
		let worker = start_candidate(CandidateConfiguration {
			election: self.election.clone(),
			timings: steps::get_gate_timings(),
			connector: self.store.clone(),
			sink,
			message: self.message.clone(),
			identity: identity.to_string(),
		}).expect("candidate starts");

		self.candidates.push(CaseCandidate { identity: identity.to_string(), sink: records, worker });
	}

	pub fn candidate(&self, identity: &str) -> &CaseCandidate {
		self.candidates
			.iter()
			.find(|candidate| candidate.identity == identity)
			.expect("candidate is known")
	}

	pub fn leaders(&self) -> Vec<String> {
		self.candidates
			.iter()
			.filter(|candidate| candidate.worker.is_leader())
			.map(|candidate| candidate.identity.clone())
			.collect()
	}

	/// Waits until the given candidate is the only one acting as leader.
	pub fn wait_for_leader(&self, identity: &str) {
		let elected = steps::wait_until(steps::get_wait_timeout(), || self.leaders() == vec![identity.to_string()]);

		assert!(elected, "expected leader {}, current leaders: {:?}", identity, self.leaders());
		info!("Leader elected: {}", identity);
	}

	/// Full path of the candidate node currently registered for the identity.
	pub fn candidate_node(&self, identity: &str) -> Option<String> {
		let node_prefix = format!("{}{}", identity, self.election.delimiter);

		self.store
			.children_of(&self.election.election_root)
			.into_iter()
			.find(|node| node.starts_with(&node_prefix))
			.map(|node| format!("{}/{}", self.election.election_root, node))
	}

	pub fn candidate_sequence(&self, identity: &str) -> Option<u64> {
		self.candidate_node(identity)
			.and_then(|node| parse_sequence_number(&node, self.election.delimiter).ok())
	}

	/// Identity owning the lowest registered sequence number.
	pub fn expected_leader(&self) -> Option<String> {
		self.candidates
			.iter()
			.filter_map(|candidate| {
				self.candidate_sequence(&candidate.identity)
					.map(|sequence| (sequence, candidate.identity.clone()))
			})
			.min()
			.map(|(_, identity)| identity)
	}

	pub fn session_of(&self, identity: &str) -> u64 {
		self.candidate_node(identity)
			.and_then(|node| self.store.ephemeral_owner(&node))
			.expect("candidate has a session")
	}

	pub fn expire_session_of(&self, identity: &str) {
		let session_id = self.session_of(identity);
		info!("Expiring session {} of {}", session_id, identity);

		assert!(self.store.expire(session_id));
	}

	pub fn wait_for_failure(&self, identity: &str) -> ElectionError {
		self.candidate(identity)
			.worker
			.failure_rx()
			.recv_timeout(steps::get_wait_timeout())
			.expect("candidate reports a failure")
	}

	pub fn assert_no_failures(&self) {
		for candidate in &self.candidates {
			if let Ok(err) = candidate.worker.failure_rx().try_recv() {
				panic!("candidate {} failed: {}", candidate.identity, err);
			}
		}
	}

	pub fn terminate(self) {
		for candidate in &self.candidates {
			candidate.worker.terminate();
		}

		for candidate in self.candidates {
			candidate.worker.join();
		}
	}
}
