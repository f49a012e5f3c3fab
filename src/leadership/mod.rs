pub mod monitor;
pub mod sequence;


/// Receives leadership transitions of one candidate.
///
/// Callbacks are edge-triggered: `on_become_leader` is invoked once per Follower to
/// Leader transition and `on_become_follower` once per Leader to Follower transition.
/// Both run on the election monitor worker thread and must not block.
pub trait LeadershipListener: Send + 'static {
    fn on_become_leader(&self);
    fn on_become_follower(&self);

    /// Identity of the candidate, used to name its candidate node.
    fn identity(&self) -> String;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LeadershipStatus {
    Follower,
    Leader,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Expired,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MonitorState {
    Unconnected,
    Watching,
    ShuttingDown,
}

/// Candidate node owned by the current session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateNode {
    pub path: String,
    pub sequence: u64,
}

impl CandidateNode {
    /// Node name relative to the election root, as listed among its children.
    pub fn name(&self) -> &str {
        match self.path.rfind('/') {
            Some(position) => &self.path[position + 1..],
            None => &self.path,
        }
    }
}
