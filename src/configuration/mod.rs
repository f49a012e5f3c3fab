use std::time::Duration;

use crate::coordination::CoordinationConnector;
use crate::gate::RecordSink;

/// Reaction to a coordination store session expiry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ExpiryPolicy {
    /// Report the expiry upward and stop the monitor.
    Terminate,
    /// Open a brand-new session and join the election again with a fresh candidate node.
    Rejoin,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ElectionConfiguration {
    pub endpoint: String,
    pub session_timeout: Duration,
    pub election_root: String,
    /// Separates the candidate identity from the store-assigned sequence suffix.
    pub delimiter: char,
    pub expiry_policy: ExpiryPolicy,
}

impl Default for ElectionConfiguration {
    fn default() -> Self {
        ElectionConfiguration {
            endpoint: "localhost:2181".to_string(),
            session_timeout: Duration::from_millis(5000),
            election_root: "/ELECTION".to_string(),
            delimiter: '-',
            expiry_policy: ExpiryPolicy::Rejoin,
        }
    }
}

impl ElectionConfiguration {
    /// Path prefix of the candidate node; the store appends the sequence number to it.
    pub fn candidate_prefix(&self, identity: &str) -> String {
        format!("{}/{}{}", self.election_root, identity, self.delimiter)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct GateTimings {
    /// Fixed delay between the end of one tick and the start of the next.
    pub tick_delay: Duration,
}

impl Default for GateTimings {
    fn default() -> Self {
        GateTimings {
            tick_delay: Duration::from_millis(300),
        }
    }
}

#[derive(Debug)]
pub struct CandidateConfiguration<Cn, S>
where
    Cn: CoordinationConnector,
    S: RecordSink,
{
    pub election: ElectionConfiguration,
    pub timings: GateTimings,
    pub connector: Cn,
    pub sink: S,
    pub message: String,
    pub identity: String,
}
