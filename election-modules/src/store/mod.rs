use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use zk_election::{
    CoordinationClient, CoordinationConnector, CreateMode, NodeEventKind, SessionEvent,
    StoreError, StoreEvent,
};


/// In-memory coordination store shared by all sessions of one process.
///
/// Keeps a node tree with ephemeral and sequential nodes and one-shot watches, and
/// delivers notifications on each session's event channel. Faults are injected through
/// `disconnect`, `reconnect`, `expire` and `delete_node`.
#[derive(Clone, Debug)]
pub struct InMemoryCoordinationStore {
    store: Arc<Mutex<StoreInternal>>,
}

/// A session opened on an `InMemoryCoordinationStore`.
#[derive(Clone, Debug)]
pub struct InMemorySession {
    store: InMemoryCoordinationStore,
    session_id: u64,
}

#[derive(Debug)]
struct NodeEntry {
    ephemeral_owner: Option<u64>,
}

#[derive(Debug)]
struct SessionEntry {
    events_tx: Sender<StoreEvent>,
    connected: bool,
}

#[derive(Debug)]
struct StoreInternal {
    nodes: BTreeMap<String, NodeEntry>,
    next_sequences: HashMap<String, u64>,
    first_sequence: u64,
    sessions: HashMap<u64, SessionEntry>,
    next_session_id: u64,
    children_watches: HashMap<String, HashSet<u64>>,
    exists_watches: HashMap<String, HashSet<u64>>,
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(position) => &path[..position],
    }
}

fn validate_path(path: &str) -> Result<(), StoreError> {
    if !path.starts_with('/') || path.contains("//") || (path.len() > 1 && path.ends_with('/')) {
        return Err(StoreError::BadArguments(format!("invalid path: '{}'", path)));
    }
    Ok(())
}

impl StoreInternal {
    fn new(first_sequence: u64) -> StoreInternal {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "/".to_string(),
            NodeEntry {
                ephemeral_owner: None,
            },
        );

        StoreInternal {
            nodes,
            next_sequences: HashMap::new(),
            first_sequence,
            sessions: HashMap::new(),
            next_session_id: 1,
            children_watches: HashMap::new(),
            exists_watches: HashMap::new(),
        }
    }

    fn check_session(&self, session_id: u64) -> Result<(), StoreError> {
        match self.sessions.get(&session_id) {
            None => Err(StoreError::SessionExpired),
            Some(session) if !session.connected => Err(StoreError::ConnectionLoss),
            Some(_) => Ok(()),
        }
    }

    fn notify(&self, session_id: u64, event: StoreEvent) {
        if let Some(session) = self.sessions.get(&session_id) {
            if session.events_tx.send(event).is_err() {
                trace!("Session {} no longer receives notifications", session_id);
            }
        }
    }

    fn fire(&mut self, kind: NodeEventKind, path: &str) {
        let watches = match kind {
            NodeEventKind::ChildrenChanged => &mut self.children_watches,
            _ => &mut self.exists_watches,
        };

        if let Some(sessions) = watches.remove(path) {
            for session_id in sessions {
                self.notify(session_id, StoreEvent::node(kind, path));
            }
        }
    }

    fn children_names(&self, path: &str) -> Vec<String> {
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path)
        };

        self.nodes
            .range(prefix.clone()..)
            .take_while(|(node, _)| node.starts_with(&prefix))
            .map(|(node, _)| &node[prefix.len()..])
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .map(|name| name.to_string())
            .collect()
    }

    fn create(&mut self, session_id: u64, path: &str, mode: CreateMode) -> Result<String, StoreError> {
        self.check_session(session_id)?;
        validate_path(path)?;

        let parent = parent_of(path).to_string();
        if !self.nodes.contains_key(&parent) {
            return Err(StoreError::NoNode);
        }

        let actual_path = if mode.is_sequential() {
            let first_sequence = self.first_sequence;
            let next_sequence = self.next_sequences.entry(parent.clone()).or_insert(first_sequence);
            let sequence = *next_sequence;
            *next_sequence += 1;

            format!("{}{:010}", path, sequence)
        } else {
            path.to_string()
        };

        if self.nodes.contains_key(&actual_path) {
            return Err(StoreError::NodeExists);
        }

        let ephemeral_owner = if mode.is_ephemeral() {
            Some(session_id)
        } else {
            None
        };
        self.nodes.insert(actual_path.clone(), NodeEntry { ephemeral_owner });

        trace!("Session {} created {:?} node {}", session_id, mode, actual_path);

        self.fire(NodeEventKind::Created, &actual_path);
        self.fire(NodeEventKind::ChildrenChanged, &parent);

        Ok(actual_path)
    }

    fn remove_node(&mut self, path: &str) -> Result<(), StoreError> {
        if path == "/" {
            return Err(StoreError::BadArguments("cannot delete the root node".to_string()));
        }
        if !self.nodes.contains_key(path) {
            return Err(StoreError::NoNode);
        }
        if !self.children_names(path).is_empty() {
            return Err(StoreError::BadArguments(format!("node {} has children", path)));
        }

        self.nodes.remove(path);

        self.fire(NodeEventKind::Deleted, path);
        self.fire(NodeEventKind::ChildrenChanged, parent_of(path));

        Ok(())
    }

    /// Drops the session with its watches and ephemeral nodes. Returns its event channel.
    fn end_session(&mut self, session_id: u64) -> Option<Sender<StoreEvent>> {
        let session = self.sessions.remove(&session_id)?;

        for watchers in self.children_watches.values_mut() {
            watchers.remove(&session_id);
        }
        for watchers in self.exists_watches.values_mut() {
            watchers.remove(&session_id);
        }

        let owned: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, entry)| entry.ephemeral_owner == Some(session_id))
            .map(|(path, _)| path.clone())
            .collect();

        for path in owned {
            if let Err(err) = self.remove_node(&path) {
                warn!("Cannot remove ephemeral node {}: {}", path, err);
            }
        }

        Some(session.events_tx)
    }
}

impl Default for InMemoryCoordinationStore {
    fn default() -> Self {
        InMemoryCoordinationStore::new()
    }
}

impl InMemoryCoordinationStore {
    pub fn new() -> InMemoryCoordinationStore {
        InMemoryCoordinationStore::with_first_sequence(0)
    }

    /// Creates a store whose sequential nodes are numbered from `first_sequence`.
    pub fn with_first_sequence(first_sequence: u64) -> InMemoryCoordinationStore {
        InMemoryCoordinationStore {
            store: Arc::new(Mutex::new(StoreInternal::new(first_sequence))),
        }
    }

    /// Transient connection loss: the session and its ephemeral nodes survive.
    pub fn disconnect(&self, session_id: u64) -> bool {
        let mut store = self.store.lock();
        match store.sessions.get_mut(&session_id) {
            Some(session) => session.connected = false,
            None => return false,
        }
        info!("Session {} disconnected", session_id);

        store.notify(session_id, StoreEvent::Session(SessionEvent::Disconnected));
        true
    }

    /// Resumes a disconnected session.
    pub fn reconnect(&self, session_id: u64) -> bool {
        let mut store = self.store.lock();
        match store.sessions.get_mut(&session_id) {
            Some(session) => session.connected = true,
            None => return false,
        }
        info!("Session {} reconnected", session_id);

        store.notify(session_id, StoreEvent::Session(SessionEvent::Connected));
        true
    }

    /// Ends the session as if its timeout elapsed: ephemeral nodes are deleted, watchers
    /// of those nodes are notified and the session receives `SessionEvent::Expired`.
    pub fn expire(&self, session_id: u64) -> bool {
        let mut store = self.store.lock();
        match store.end_session(session_id) {
            Some(events_tx) => {
                info!("Session {} expired", session_id);
                if events_tx.send(StoreEvent::Session(SessionEvent::Expired)).is_err() {
                    trace!("Expired session {} no longer receives notifications", session_id);
                }
                true
            }
            None => false,
        }
    }

    /// Deletes a childless node regardless of its owner.
    pub fn delete_node(&self, path: &str) -> Result<(), StoreError> {
        self.store.lock().remove_node(path)
    }

    pub fn children_of(&self, path: &str) -> Vec<String> {
        self.store.lock().children_names(path)
    }

    pub fn ephemeral_owner(&self, path: &str) -> Option<u64> {
        self.store
            .lock()
            .nodes
            .get(path)
            .and_then(|entry| entry.ephemeral_owner)
    }

    pub fn session_count(&self) -> usize {
        self.store.lock().sessions.len()
    }
}

impl CoordinationConnector for InMemoryCoordinationStore {
    type Client = InMemorySession;

    fn connect(
        &self,
        endpoint: &str,
        session_timeout: Duration,
        events_tx: Sender<StoreEvent>,
    ) -> Result<InMemorySession, StoreError> {
        if endpoint.is_empty() {
            return Err(StoreError::BadArguments("empty endpoint".to_string()));
        }
        if session_timeout == Duration::from_millis(0) {
            return Err(StoreError::BadArguments("zero session timeout".to_string()));
        }

        let mut store = self.store.lock();

        let session_id = store.next_session_id;
        store.next_session_id += 1;

        store.sessions.insert(
            session_id,
            SessionEntry {
                events_tx,
                connected: true,
            },
        );
        info!("Session {} opened for {}", session_id, endpoint);

        store.notify(session_id, StoreEvent::Session(SessionEvent::Connected));

        Ok(InMemorySession {
            store: self.clone(),
            session_id,
        })
    }
}

impl InMemorySession {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }
}

impl CoordinationClient for InMemorySession {
    fn create(&self, path: &str, mode: CreateMode) -> Result<String, StoreError> {
        self.store.store.lock().create(self.session_id, path, mode)
    }

    fn children(&self, path: &str, watch: bool) -> Result<Vec<String>, StoreError> {
        let mut store = self.store.store.lock();
        store.check_session(self.session_id)?;

        if !store.nodes.contains_key(path) {
            return Err(StoreError::NoNode);
        }
        if watch {
            store
                .children_watches
                .entry(path.to_string())
                .or_insert_with(HashSet::new)
                .insert(self.session_id);
        }

        Ok(store.children_names(path))
    }

    fn exists(&self, path: &str, watch: bool) -> Result<bool, StoreError> {
        let mut store = self.store.store.lock();
        store.check_session(self.session_id)?;

        if watch {
            store
                .exists_watches
                .entry(path.to_string())
                .or_insert_with(HashSet::new)
                .insert(self.session_id);
        }

        Ok(store.nodes.contains_key(path))
    }

    fn close(&self) -> Result<(), StoreError> {
        let mut store = self.store.store.lock();
        match store.end_session(self.session_id) {
            Some(_) => {
                info!("Session {} closed", self.session_id);
                Ok(())
            }
            None => Err(StoreError::SessionExpired),
        }
    }
}
