pub mod session;
pub mod view;

use uuid::Uuid;

use crate::models::chat::TranscriptEntry;
use self::session::StreamOutcome;

pub use self::session::{ SessionState, StreamSession };
pub use self::view::ChatView;

/// Notifications published by a chat view to whatever renders it.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    EntryAppended {
        index: usize,
        entry: TranscriptEntry,
    },
    EntryUpdated {
        index: usize,
        text: String,
    },
    ComposerChanged {
        enabled: bool,
    },
    SessionFinished {
        session_id: Uuid,
        outcome: StreamOutcome,
    },
}
