use crossbeam_channel::{Receiver, Sender};
use std::time::Duration;

use crate::errors::ElectionError;
use crate::gate::{GatedWorker, RecordSink};

#[derive(Debug)]
pub struct TickerParams<S: RecordSink> {
    pub gated_worker: GatedWorker<S>,
    pub tick_delay: Duration,
    pub failure_tx: Sender<ElectionError>,
    /// Terminates the election monitor of this candidate when the worker fails, so a
    /// leader that can no longer act releases its candidate node.
    pub election_terminate_tx: Option<Sender<()>>,
}

/// Drives `GatedWorker::tick` with a fixed delay, starting immediately. Independent of
/// the election: a follower's tick is a no-op and never waits for leadership.
pub fn run_ticker<S: RecordSink>(params: TickerParams<S>, terminate_worker_rx: Receiver<()>) {
    info!("Gated worker ticker started");
    loop {
        if let Err(err) = params.gated_worker.tick() {
            error!("Gated worker tick failed: {}", err);
            params.gated_worker.set_may_act(false);
            if let Some(election_terminate_tx) = params.election_terminate_tx.as_ref() {
                if election_terminate_tx.send(()).is_err() {
                    trace!("Election monitor already stopped");
                }
            }
            if params.failure_tx.send(err).is_err() {
                error!("Cannot report gated worker failure");
            }
            break;
        }

        let timeout = crossbeam_channel::after(params.tick_delay);
        select!(
            recv(terminate_worker_rx) -> res  => {
                if res.is_err() {
                    error!("Abnormal exit for gated worker ticker");
                }
                break
            },
            recv(timeout) -> _  => {}
        );
    }
    info!("Gated worker ticker stopped");
}
