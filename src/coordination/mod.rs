//! Store-agnostic view of a ZooKeeper-style coordination service.
//!
//! A session delivers its notifications through the `Sender<StoreEvent>` handed to
//! `CoordinationConnector::connect`. The receiving end is the event queue drained by
//! the election monitor worker, so all notifications of a session are processed one
//! at a time on a single thread.

use crossbeam_channel::Sender;
use std::time::Duration;

/// Failures reported by coordination store requests.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum StoreError {
    /// Transient: the session is alive but currently disconnected.
    #[display(fmt = "Connection to the coordination store lost")]
    ConnectionLoss,

    /// The session is gone together with its ephemeral nodes.
    #[display(fmt = "Coordination store session expired")]
    SessionExpired,

    #[display(fmt = "Node already exists")]
    NodeExists,

    #[display(fmt = "Node does not exist")]
    NoNode,

    #[display(fmt = "Authentication with the coordination store failed")]
    AuthFailed,

    #[display(fmt = "Bad arguments: {}", _0)]
    BadArguments(String),
}

impl StoreError {
    /// Errors after which the process cannot take part in the election.
    pub fn is_fatal(&self) -> bool {
        match self {
            StoreError::AuthFailed | StoreError::BadArguments(_) => true,
            _ => false,
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CreateMode {
    Persistent,
    PersistentSequential,
    Ephemeral,
    EphemeralSequential,
}

impl CreateMode {
    pub fn is_ephemeral(self) -> bool {
        match self {
            CreateMode::Ephemeral | CreateMode::EphemeralSequential => true,
            _ => false,
        }
    }

    pub fn is_sequential(self) -> bool {
        match self {
            CreateMode::PersistentSequential | CreateMode::EphemeralSequential => true,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SessionEvent {
    Connected,
    Disconnected,
    Expired,
    AuthFailed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum NodeEventKind {
    Created,
    Deleted,
    DataChanged,
    ChildrenChanged,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeEvent {
    pub kind: NodeEventKind,
    pub path: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StoreEvent {
    Session(SessionEvent),
    Node(NodeEvent),
}

impl StoreEvent {
    pub fn node(kind: NodeEventKind, path: &str) -> StoreEvent {
        StoreEvent::Node(NodeEvent {
            kind,
            path: path.to_string(),
        })
    }
}

/// Synchronous request/response operations of one session.
///
/// Watches requested through `children` and `exists` are one-shot: each fires at most
/// once and has to be requested again to observe further changes.
pub trait CoordinationClient: Send + 'static {
    /// Creates a node and returns its actual path (with the sequence suffix appended
    /// for sequential modes).
    fn create(&self, path: &str, mode: CreateMode) -> Result<String, StoreError>;

    /// Returns the child names of `path`, optionally leaving a children watch on it.
    fn children(&self, path: &str, watch: bool) -> Result<Vec<String>, StoreError>;

    /// Checks node existence, optionally leaving a created/deleted watch on `path`.
    fn exists(&self, path: &str, watch: bool) -> Result<bool, StoreError>;

    /// Closes the session. The store reclaims the session's ephemeral nodes.
    fn close(&self) -> Result<(), StoreError>;
}

/// Opens sessions. The connection attempt is asynchronous: a successful return only
/// means the attempt was issued, `SessionEvent::Connected` arrives on `events_tx` later.
pub trait CoordinationConnector: Send + 'static {
    type Client: CoordinationClient;

    fn connect(
        &self,
        endpoint: &str,
        session_timeout: Duration,
        events_tx: Sender<StoreEvent>,
    ) -> Result<Self::Client, StoreError>;
}
