use chrono::{ DateTime, Utc };
use log::{ debug, warn };
use uuid::Uuid;

use crate::models::chat::PriorTurn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }
}

/// How a stream session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    /// The transport finished without any content; a fallback notice was shown.
    Empty,
    UpstreamError(String),
    TransportError(String),
    Abandoned,
}

impl StreamOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StreamOutcome::UpstreamError(_) | StreamOutcome::TransportError(_) | StreamOutcome::Abandoned
        )
    }

    fn terminal_state(&self) -> SessionState {
        if self.is_failure() { SessionState::Failed } else { SessionState::Completed }
    }
}

#[derive(Debug, Clone)]
pub struct StreamSession {
    pub id: Uuid,
    pub conversation_id: i64,
    pub character_id: i64,
    pub prior_turns: Vec<PriorTurn>,
    accumulated_text: String,
    state: SessionState,
    outcome: Option<StreamOutcome>,
    started_at: DateTime<Utc>,
}

impl StreamSession {
    pub fn new(conversation_id: i64, character_id: i64, prior_turns: Vec<PriorTurn>) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            character_id,
            prior_turns,
            accumulated_text: String::new(),
            state: SessionState::Idle,
            outcome: None,
            started_at: Utc::now(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn outcome(&self) -> Option<&StreamOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Streaming
    }

    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn start(&mut self) -> bool {
        if self.state != SessionState::Idle {
            warn!("Session {} cannot start from {:?}", self.id, self.state);
            return false;
        }
        self.state = SessionState::Streaming;
        self.started_at = Utc::now();
        debug!("Session {} streaming (conversation {})", self.id, self.conversation_id);
        true
    }

    /// Appends a fragment. Ignored once the session left the streaming state.
    pub fn append(&mut self, fragment: &str) -> bool {
        if !self.is_active() {
            return false;
        }
        self.accumulated_text.push_str(fragment);
        true
    }

    pub fn finish(&mut self, outcome: StreamOutcome) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = outcome.terminal_state();
        self.outcome = Some(outcome);
        true
    }
}
