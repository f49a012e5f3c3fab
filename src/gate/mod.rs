use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::ElectionError;
use crate::leadership::LeadershipListener;

pub mod ticker;

/// Append-only destination of the records produced by the gated worker.
pub trait RecordSink: Send + 'static {
    /// Appends one newline-terminated record. Existing content is never truncated.
    fn append_record(&mut self, record: &str) -> Result<(), ElectionError>;
}

/// Shared "may act" flag: written by the election monitor, read by the ticker.
#[derive(Clone, Debug, Default)]
pub struct MayActFlag {
    flag: Arc<AtomicBool>,
}

impl MayActFlag {
    pub fn new() -> MayActFlag {
        MayActFlag::default()
    }

    pub fn set(&self, may_act: bool) {
        self.flag.store(may_act, Ordering::Release);
    }

    pub fn get(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
struct Speech<S: RecordSink> {
    counter: u64,
    sink: S,
}

/// Performs the side-effecting operation on each tick, but only while leadership is held.
#[derive(Debug)]
pub struct GatedWorker<S: RecordSink> {
    message: String,
    identity: String,
    may_act: MayActFlag,
    speech: Arc<Mutex<Speech<S>>>,
}

impl<S: RecordSink> Clone for GatedWorker<S> {
    fn clone(&self) -> Self {
        GatedWorker {
            message: self.message.clone(),
            identity: self.identity.clone(),
            may_act: self.may_act.clone(),
            speech: self.speech.clone(),
        }
    }
}

impl<S: RecordSink> GatedWorker<S> {
    pub fn new(message: String, identity: String, sink: S) -> GatedWorker<S> {
        GatedWorker {
            message,
            identity,
            may_act: MayActFlag::new(),
            speech: Arc::new(Mutex::new(Speech { counter: 0, sink })),
        }
    }

    pub fn set_may_act(&self, may_act: bool) {
        self.may_act.set(may_act);
    }

    pub fn may_act(&self) -> bool {
        self.may_act.get()
    }

    pub fn may_act_flag(&self) -> MayActFlag {
        self.may_act.clone()
    }

    /// Appends `"<message>: <counter> <identity>\n"` while the flag is set, no-op otherwise.
    /// Returns whether a record was written.
    pub fn tick(&self) -> Result<bool, ElectionError> {
        if !self.may_act() {
            return Ok(false);
        }

        let mut speech = self.speech.lock();

        let record = format!("{}: {} {}\n", self.message, speech.counter, self.identity);
        speech.sink.append_record(&record)?;
        speech.counter += 1;

        info!("{}", record.trim_end());

        Ok(true)
    }
}

impl<S: RecordSink> LeadershipListener for GatedWorker<S> {
    fn on_become_leader(&self) {
        self.set_may_act(true);
    }

    fn on_become_follower(&self) {
        self.set_may_act(false);
    }

    fn identity(&self) -> String {
        self.identity.clone()
    }
}
