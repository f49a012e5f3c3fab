use crossbeam_channel::{Receiver, Sender};

use crate::common::{self, Worker};
use crate::configuration::{ElectionConfiguration, ExpiryPolicy};
use crate::coordination::{
    CoordinationClient, CoordinationConnector, CreateMode, NodeEvent, NodeEventKind,
    SessionEvent, StoreError, StoreEvent,
};
use crate::errors::{new_err, ElectionError, Result};
use crate::leadership::sequence::{holds_lowest_sequence, parse_sequence_number};
use crate::leadership::{
    CandidateNode, LeadershipListener, LeadershipStatus, MonitorState, SessionState,
};

/// Takes part in the election on behalf of one `LeadershipListener`.
#[derive(Debug)]
pub struct ElectionMonitor<Cn, L>
where
    Cn: CoordinationConnector,
    L: LeadershipListener,
{
    config: ElectionConfiguration,
    connector: Cn,
    listener: Option<L>,
}

impl<Cn, L> ElectionMonitor<Cn, L>
where
    Cn: CoordinationConnector,
    L: LeadershipListener,
{
    pub fn new(config: ElectionConfiguration, connector: Cn) -> ElectionMonitor<Cn, L> {
        ElectionMonitor {
            config,
            connector,
            listener: None,
        }
    }

    /// Binds the listener. Must be called before `start`.
    pub fn attach_listener(&mut self, listener: L) {
        if self.listener.is_some() {
            warn!("Leadership listener replaced before election monitor start");
        }
        self.listener = Some(listener);
    }

    /// Issues the connection attempt and starts the monitor worker.
    ///
    /// Returns as soon as the attempt is issued; the election itself proceeds on the
    /// worker. Fails when no listener is attached or the store rejects the attempt.
    pub fn start(self) -> Result<MonitorWorker> {
        let (failure_tx, failure_rx): (Sender<ElectionError>, Receiver<ElectionError>) =
            crossbeam_channel::unbounded();

        let worker = self.start_reporting_to(failure_tx)?;

        Ok(MonitorWorker { worker, failure_rx })
    }

    pub(crate) fn start_reporting_to(self, failure_tx: Sender<ElectionError>) -> Result<Worker> {
        let listener = match self.listener {
            Some(listener) => listener,
            None => {
                return new_err(
                    "Cannot start election monitor".to_string(),
                    "no leadership listener attached".to_string(),
                )
            }
        };

        let candidacy = Candidacy::connect(self.config, self.connector, listener)?;

        Ok(common::run_worker(
            watch_election,
            MonitorParams {
                candidacy,
                failure_tx,
            },
        ))
    }
}

/// Handle of a running election monitor.
#[derive(Debug)]
pub struct MonitorWorker {
    worker: Worker,
    failure_rx: Receiver<ElectionError>,
}

impl MonitorWorker {
    /// Fatal errors. The monitor stops after reporting one.
    pub fn failure_rx(&self) -> &Receiver<ElectionError> {
        &self.failure_rx
    }

    pub fn terminate(&self) {
        self.worker.terminate()
    }

    pub fn join(self) {
        self.worker.join()
    }
}

struct MonitorParams<Cn, L>
where
    Cn: CoordinationConnector,
    L: LeadershipListener,
{
    candidacy: Candidacy<Cn, L>,
    failure_tx: Sender<ElectionError>,
}

fn watch_election<Cn, L>(params: MonitorParams<Cn, L>, terminate_worker_rx: Receiver<()>)
where
    Cn: CoordinationConnector,
    L: LeadershipListener,
{
    let MonitorParams {
        mut candidacy,
        failure_tx,
    } = params;

    info!("Election monitor worker started for {}", candidacy.identity);

    let mut failure = None;
    loop {
        let events_rx = candidacy.events_rx.clone();
        select!(
            recv(terminate_worker_rx) -> res  => {
                if res.is_err() {
                    error!("Abnormal exit for election monitor worker");
                }
                break
            },
            recv(events_rx) -> event_result => {
                let result = match event_result {
                    Ok(event) => candidacy.process_event(event),
                    Err(err) => new_err(
                        "Coordination store notification channel closed".to_string(),
                        err.to_string(),
                    ),
                };
                if let Err(err) = result {
                    failure = Some(err);
                    break
                }
            }
        );
    }

    candidacy.shutdown();

    if let Some(err) = failure {
        error!("Election monitor for {} failed: {}", candidacy.identity, err);
        if failure_tx.send(err).is_err() {
            error!("Cannot report election monitor failure");
        }
    }

    info!("Election monitor worker stopped for {}", candidacy.identity);
}

fn open_session<Cn: CoordinationConnector>(
    config: &ElectionConfiguration,
    connector: &Cn,
) -> Result<(Cn::Client, Receiver<StoreEvent>)> {
    let (events_tx, events_rx): (Sender<StoreEvent>, Receiver<StoreEvent>) =
        crossbeam_channel::unbounded();

    match connector.connect(&config.endpoint, config.session_timeout, events_tx) {
        Ok(client) => Ok((client, events_rx)),
        Err(err) => new_err(
            format!("Cannot connect to the coordination store at {}", config.endpoint),
            err.to_string(),
        ),
    }
}

/// Election protocol state of one candidate. Driven by store notifications, one at a time.
pub(crate) struct Candidacy<Cn, L>
where
    Cn: CoordinationConnector,
    L: LeadershipListener,
{
    config: ElectionConfiguration,
    connector: Cn,
    listener: L,
    identity: String,
    candidate_prefix: String,

    client: Option<Cn::Client>,
    events_rx: Receiver<StoreEvent>,

    state: MonitorState,
    session_state: SessionState,
    status: LeadershipStatus,
    candidate: Option<CandidateNode>,
}

impl<Cn, L> Candidacy<Cn, L>
where
    Cn: CoordinationConnector,
    L: LeadershipListener,
{
    pub(crate) fn connect(
        config: ElectionConfiguration,
        connector: Cn,
        listener: L,
    ) -> Result<Candidacy<Cn, L>> {
        let identity = listener.identity();
        let candidate_prefix = config.candidate_prefix(&identity);
        let (client, events_rx) = open_session(&config, &connector)?;

        info!("Candidate {} is connecting to {}", identity, config.endpoint);

        Ok(Candidacy {
            config,
            connector,
            listener,
            identity,
            candidate_prefix,
            client: Some(client),
            events_rx,
            state: MonitorState::Unconnected,
            session_state: SessionState::Disconnected,
            status: LeadershipStatus::Follower,
            candidate: None,
        })
    }

    #[cfg(test)]
    pub(crate) fn status(&self) -> LeadershipStatus {
        self.status
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> MonitorState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn session_state(&self) -> SessionState {
        self.session_state
    }

    #[cfg(test)]
    pub(crate) fn candidate(&self) -> Option<&CandidateNode> {
        self.candidate.as_ref()
    }

    /// Handles one notification. An error means the candidate cannot continue.
    pub(crate) fn process_event(&mut self, event: StoreEvent) -> Result<()> {
        trace!("Candidate {} received {:?}", self.identity, event);

        match event {
            StoreEvent::Session(SessionEvent::Connected) => self.on_connected(),
            StoreEvent::Session(SessionEvent::Disconnected) => {
                self.on_disconnected();
                Ok(())
            }
            StoreEvent::Session(SessionEvent::Expired) => self.on_expired(),
            StoreEvent::Session(SessionEvent::AuthFailed) => {
                self.session_state = SessionState::Disconnected;
                self.state = MonitorState::Unconnected;
                self.demote();
                new_err(
                    format!("Candidate {} cannot join the election", self.identity),
                    StoreError::AuthFailed.to_string(),
                )
            }
            StoreEvent::Node(event) => self.on_node_event(event),
        }
    }

    fn on_connected(&mut self) -> Result<()> {
        info!("Candidate {} is connected to the coordination store", self.identity);

        self.session_state = SessionState::Connected;
        self.state = MonitorState::Watching;

        self.ensure_root_exists()?;
        self.ensure_candidate_node()?;
        self.recompute_leadership()
    }

    fn on_disconnected(&mut self) {
        warn!("Candidate {} is disconnected from the coordination store", self.identity);

        self.session_state = SessionState::Disconnected;
        self.state = MonitorState::Unconnected;
        self.demote();
    }

    fn on_expired(&mut self) -> Result<()> {
        warn!("Session of candidate {} expired", self.identity);

        self.session_state = SessionState::Expired;
        self.state = MonitorState::ShuttingDown;
        self.demote();

        if let Some(candidate) = self.candidate.take() {
            info!("Candidate node {} is gone with the expired session", candidate.path);
        }
        self.client = None;

        match self.config.expiry_policy {
            ExpiryPolicy::Terminate => new_err(
                format!("Candidate {} left the election", self.identity),
                StoreError::SessionExpired.to_string(),
            ),
            ExpiryPolicy::Rejoin => self.rejoin(),
        }
    }

    fn rejoin(&mut self) -> Result<()> {
        let (client, events_rx) = open_session(&self.config, &self.connector)?;

        self.client = Some(client);
        self.events_rx = events_rx;
        self.session_state = SessionState::Disconnected;
        self.state = MonitorState::Unconnected;

        info!("Candidate {} is rejoining the election with a new session", self.identity);

        Ok(())
    }

    fn on_node_event(&mut self, event: NodeEvent) -> Result<()> {
        if self.state != MonitorState::Watching {
            trace!("Candidate {} ignored {:?}: not watching", self.identity, event);
            return Ok(());
        }

        let own_node = self
            .candidate
            .as_ref()
            .map_or(false, |candidate| candidate.path == event.path);

        match event.kind {
            NodeEventKind::ChildrenChanged if event.path == self.config.election_root => {
                debug!("Candidate {}: election root children changed", self.identity);

                if self.candidate.is_none() {
                    self.ensure_candidate_node()?;
                }
                self.recompute_leadership()
            }
            NodeEventKind::Created | NodeEventKind::Deleted if own_node => {
                warn!(
                    "Candidate {}: own candidate node {} event {:?}",
                    self.identity, event.path, event.kind
                );

                self.demote();
                self.ensure_candidate_node()?;
                self.recompute_leadership()
            }
            _ => {
                trace!("Candidate {} ignored {:?}", self.identity, event);
                Ok(())
            }
        }
    }

    fn client(&self) -> Result<&Cn::Client> {
        match self.client.as_ref() {
            Some(client) => Ok(client),
            None => new_err(
                format!("Candidate {} has no coordination store session", self.identity),
                String::new(),
            ),
        }
    }

    /// Transient errors are logged and retried on the next notification; fatal ones are returned.
    fn absorb(&self, err: StoreError, operation: &str) -> Result<()> {
        if err.is_fatal() {
            return new_err(
                format!("Candidate {} cannot {}", self.identity, operation),
                err.to_string(),
            );
        }

        warn!(
            "Candidate {} cannot {}: {}. Retrying on the next notification",
            self.identity, operation, err
        );

        Ok(())
    }

    fn ensure_root_exists(&mut self) -> Result<()> {
        let root = self.config.election_root.clone();

        match self.client()?.create(&root, CreateMode::Persistent) {
            Ok(path) => info!("Election root {} created", path),
            Err(StoreError::NodeExists) => trace!("Election root {} already exists", root),
            Err(err) => self.absorb(err, "create the election root")?,
        }

        Ok(())
    }

    /// Keeps the current candidate node while it exists, creates a new one otherwise.
    /// Leaves an existence watch on the candidate node either way.
    fn ensure_candidate_node(&mut self) -> Result<()> {
        if let Some(candidate) = self.candidate.clone() {
            let exists = self.client()?.exists(&candidate.path, true);
            match exists {
                Ok(true) => {
                    debug!("Candidate node {} is still present", candidate.path);
                    return Ok(());
                }
                Ok(false) => {
                    info!("Candidate node {} no longer exists", candidate.path);
                    self.candidate = None;
                }
                Err(err) => return self.absorb(err, "check the candidate node"),
            }
        }

        let path = match self
            .client()?
            .create(&self.candidate_prefix, CreateMode::EphemeralSequential)
        {
            Ok(path) => path,
            Err(err) => return self.absorb(err, "create the candidate node"),
        };

        let sequence = match parse_sequence_number(&path, self.config.delimiter) {
            Ok(sequence) => sequence,
            Err(err) => {
                return new_err(
                    "Coordination store returned an unexpected candidate node path".to_string(),
                    err.to_string(),
                )
            }
        };

        info!("Created candidate node {} with sequence number {}", path, sequence);

        if let Err(err) = self.client()?.exists(&path, true) {
            self.absorb(err, "watch the candidate node")?;
        }

        self.candidate = Some(CandidateNode { path, sequence });

        Ok(())
    }

    /// Re-arms the children watch on the election root and derives leadership from
    /// the returned child list.
    fn recompute_leadership(&mut self) -> Result<()> {
        let root = self.config.election_root.clone();

        let children = match self.client()?.children(&root, true) {
            Ok(children) => children,
            Err(StoreError::NoNode) => {
                warn!("Election root {} does not exist", root);
                Vec::new()
            }
            Err(err) => {
                self.absorb(err, "watch the election root")?;
                Vec::new()
            }
        };

        debug!("Candidate {} observed candidates {:?}", self.identity, children);

        let holds_lowest = self.candidate.as_ref().map_or(false, |candidate| {
            holds_lowest_sequence(&children, candidate.name(), self.config.delimiter)
        });

        if holds_lowest && self.session_state == SessionState::Connected {
            self.promote();
        } else {
            self.demote();
        }

        Ok(())
    }

    fn promote(&mut self) {
        if self.status == LeadershipStatus::Leader {
            trace!("Candidate {} is already the leader", self.identity);
            return;
        }

        self.status = LeadershipStatus::Leader;
        info!("Candidate {} status changed to Leader", self.identity);
        self.listener.on_become_leader();
    }

    fn demote(&mut self) {
        if self.status == LeadershipStatus::Follower {
            return;
        }

        self.status = LeadershipStatus::Follower;
        info!("Candidate {} status changed to Follower", self.identity);
        self.listener.on_become_follower();
    }

    /// Steps down and closes the session; the store reclaims the candidate node.
    pub(crate) fn shutdown(&mut self) {
        self.state = MonitorState::ShuttingDown;
        self.demote();

        if let Some(client) = self.client.take() {
            if let Err(err) = client.close() {
                warn!("Cannot close session of candidate {}: {}", self.identity, err);
            }
        }
        self.candidate = None;
    }
}
