#[macro_use] extern crate log;
extern crate env_logger;
extern crate chrono;
extern crate crossbeam_channel;

use std::io::Write;
use std::process;
use std::time::Duration;

use chrono::prelude::{DateTime, Local};
use crossbeam_channel::Select;

extern crate zk_election;
extern crate election_modules;

use zk_election::{start_candidate, CandidateConfiguration, CandidateWorker, ElectionConfiguration, GateTimings};
use election_modules::{process_identity, FileRecordSink, InMemoryCoordinationStore};

mod settings;

use settings::Settings;

const CONFIG_FILE: &str = "speaker.config";

fn init_logger() {
    env_logger::builder()
        .format(|buf, record| {
            let now: DateTime<Local> = Local::now();
            writeln!(buf, "{:5}: {} - {}", record.level(), now.format("%H:%M:%S.%3f").to_string(), record.args())
        })
        .init();
}

fn main() {
    init_logger();

    let settings = match settings::load(CONFIG_FILE) {
        Ok(settings) => settings,
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        }
    };

    info!("Speaker started: {:?}", settings);

    let store = InMemoryCoordinationStore::new();
    let election = ElectionConfiguration {
        endpoint: settings.connection_string.clone(),
        ..ElectionConfiguration::default()
    };

    let mut candidates = Vec::new();
    for index in 0..settings.candidates {
        let identity = format!("{}-{}", process_identity("Speaker"), index);

        match start_speaker(&settings, &store, &election, identity.clone()) {
            Ok(candidate) => candidates.push((identity, candidate)),
            Err(err) => {
                error!("Cannot start candidate {}: {}", identity, err);
                shutdown(candidates);
                process::exit(1);
            }
        }
    }

    for round in 0..settings.failover_rounds {
        if let Some(failure) = wait_for_failure(&candidates, settings.failover_period) {
            error!("{}", failure);
            shutdown(candidates);
            process::exit(1);
        }

        match candidates.iter().find(|(_, candidate)| candidate.is_leader()) {
            Some((identity, _)) => {
                info!("Failover round {}: expiring the session of leader {}", round, identity);
                expire_leader_session(&store, &election, identity);
            }
            None => warn!("Failover round {}: no leader elected yet", round),
        }
    }

    if let Some(failure) = wait_for_failure(&candidates, Duration::from_millis(0)) {
        error!("{}", failure);
        shutdown(candidates);
        process::exit(1);
    }

    shutdown(candidates);
    info!("Speaker stopped");
}

/// Blocks until a candidate reports a failure or the timeout elapses.
fn wait_for_failure(candidates: &[(String, CandidateWorker)], timeout: Duration) -> Option<String> {
    let mut select = Select::new();
    for (_, candidate) in candidates {
        select.recv(candidate.failure_rx());
    }

    let operation = match select.select_timeout(timeout) {
        Ok(operation) => operation,
        Err(_) => return None,
    };

    let (identity, candidate) = &candidates[operation.index()];
    match operation.recv(candidate.failure_rx()) {
        Ok(err) => Some(format!("Candidate {} failed: {}", identity, err)),
        Err(_) => Some(format!("Candidate {} stopped unexpectedly", identity)),
    }
}

fn start_speaker(
    settings: &Settings,
    store: &InMemoryCoordinationStore,
    election: &ElectionConfiguration,
    identity: String,
) -> Result<CandidateWorker, zk_election::ElectionError> {
    let sink = FileRecordSink::open(&settings.output)?;

    start_candidate(CandidateConfiguration {
        election: election.clone(),
        timings: GateTimings::default(),
        connector: store.clone(),
        sink,
        message: settings.message.clone(),
        identity,
    })
}

fn expire_leader_session(store: &InMemoryCoordinationStore, election: &ElectionConfiguration, identity: &str) {
    let node_prefix = format!("{}{}", identity, election.delimiter);

    let owner = store
        .children_of(&election.election_root)
        .into_iter()
        .find(|node| node.starts_with(&node_prefix))
        .and_then(|node| store.ephemeral_owner(&format!("{}/{}", election.election_root, node)));

    match owner {
        Some(session_id) => {
            store.expire(session_id);
        }
        None => warn!("Leader {} has no candidate node", identity),
    }
}

fn shutdown(candidates: Vec<(String, CandidateWorker)>) {
    for (_, candidate) in candidates.iter() {
        candidate.terminate();
    }
    for (_, candidate) in candidates {
        candidate.join();
    }
}
