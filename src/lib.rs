//! # Leader election over a ZooKeeper-style coordination store
//!
//! Every candidate registers an ephemeral sequential node under a shared election root.
//! The candidate owning the lowest sequence number among the live nodes is the leader.
//! The `ElectionMonitor` reacts to store notifications and toggles a `LeadershipListener`;
//! the `GatedWorker` is such a listener, performing its periodic operation only while
//! leadership is held.

#![warn(missing_debug_implementations, unsafe_code)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate crossbeam_channel;
#[macro_use]
extern crate derive_more;

mod common;
mod configuration;
mod coordination;
mod errors;
mod gate;
mod leadership;

use crossbeam_channel::{Receiver, Sender};

pub use configuration::{CandidateConfiguration, ElectionConfiguration, ExpiryPolicy, GateTimings};
pub use coordination::{
    CoordinationClient, CoordinationConnector, CreateMode, NodeEvent, NodeEventKind,
    SessionEvent, StoreError, StoreEvent,
};
pub use errors::{new_err, ElectionError};
pub use gate::ticker::{run_ticker, TickerParams};
pub use gate::{GatedWorker, MayActFlag, RecordSink};
pub use leadership::monitor::{ElectionMonitor, MonitorWorker};
pub use leadership::sequence::{
    holds_lowest_sequence, lowest_sequence_number, parse_sequence_number, MalformedNodeName,
};
pub use leadership::{CandidateNode, LeadershipListener, LeadershipStatus, MonitorState, SessionState};

/// Running candidate: the election monitor plus the ticker of its gated worker.
#[derive(Debug)]
pub struct CandidateWorker {
    workers: common::WorkerPool,
    failure_rx: Receiver<ElectionError>,
    may_act: MayActFlag,
}

impl CandidateWorker {
    /// Whether the gated worker currently may act, i.e. this candidate is the leader.
    pub fn is_leader(&self) -> bool {
        self.may_act.get()
    }

    /// Fatal errors of the monitor or the ticker. The owner decides how to exit.
    ///
    /// After a ticker failure the monitor is stopped as well: the candidate steps down
    /// and its session is closed, so other candidates can take over.
    pub fn failure_rx(&self) -> &Receiver<ElectionError> {
        &self.failure_rx
    }

    pub fn terminate(&self) {
        self.workers.terminate()
    }

    pub fn join(self) {
        self.workers.join()
    }
}

/// Starts one candidate: attaches a `GatedWorker` to an `ElectionMonitor`, starts the
/// monitor and the fixed-delay ticker.
pub fn start_candidate<Cn, S>(config: CandidateConfiguration<Cn, S>) -> Result<CandidateWorker, ElectionError>
where
    Cn: CoordinationConnector,
    S: RecordSink,
{
    let (failure_tx, failure_rx): (Sender<ElectionError>, Receiver<ElectionError>) =
        crossbeam_channel::unbounded();

    let gated_worker = GatedWorker::new(config.message, config.identity, config.sink);
    let may_act = gated_worker.may_act_flag();

    let mut monitor = ElectionMonitor::new(config.election, config.connector);
    monitor.attach_listener(gated_worker.clone());
    let monitor_worker = monitor.start_reporting_to(failure_tx.clone())?;

    let ticker_worker = common::run_worker(
        run_ticker,
        TickerParams {
            gated_worker,
            tick_delay: config.timings.tick_delay,
            failure_tx,
            election_terminate_tx: Some(monitor_worker.terminate_worker_tx.clone()),
        },
    );

    info!("Candidate started");

    Ok(CandidateWorker {
        workers: common::WorkerPool::new(vec![monitor_worker, ticker_worker]),
        failure_rx,
        may_act,
    })
}
