use chrono::Utc;
use futures::{ Stream, StreamExt };
use log::{ debug, error, info, warn };
use tokio::sync::broadcast;

use super::{ parse_frame, LineDecoder, StreamFrame };
use crate::chat::session::{ StreamOutcome, StreamSession };
use crate::chat::ViewEvent;
use crate::config::notices::Notices;
use crate::error::ClientError;
use crate::models::chat::{ ConversationTranscript, TranscriptEntry };

enum Step {
    Continue,
    Done,
    Failed(StreamOutcome),
}

/// Feeds one completion stream into the transcript of an active session.
pub struct StreamIngestor<'a> {
    session: &'a mut StreamSession,
    transcript: &'a mut ConversationTranscript,
    notices: &'a Notices,
    events: &'a broadcast::Sender<ViewEvent>,
    assistant_index: Option<usize>,
    fragments: usize,
}

impl<'a> StreamIngestor<'a> {
    pub fn new(
        session: &'a mut StreamSession,
        transcript: &'a mut ConversationTranscript,
        notices: &'a Notices,
        events: &'a broadcast::Sender<ViewEvent>
    ) -> Self {
        Self {
            session,
            transcript,
            notices,
            events,
            assistant_index: None,
            fragments: 0,
        }
    }

    /// Reads the stream to its end, an explicit `done` frame, or the first
    /// failure. Every failure is turned into a transcript annotation.
    pub async fn run<S>(mut self, mut stream: S) -> StreamOutcome
        where S: Stream<Item = Result<Vec<u8>, ClientError>> + Unpin
    {
        if !self.session.is_active() {
            warn!("Session {} is not streaming; ignoring stream", self.session.id);
            return self.session.outcome().cloned().unwrap_or(StreamOutcome::Abandoned);
        }

        let mut lines = LineDecoder::new();
        let mut explicit_done = false;

        'read: while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    error!("Stream transport failed for session {}: {}", self.session.id, e);
                    return self.fail(StreamOutcome::TransportError(e.to_string()));
                }
            };
            for line in lines.push(&chunk) {
                match self.apply_line(&line) {
                    Step::Continue => {}
                    Step::Done => {
                        explicit_done = true;
                        break 'read;
                    }
                    Step::Failed(outcome) => {
                        return self.fail(outcome);
                    }
                }
            }
        }

        if !explicit_done {
            if let Some(line) = lines.finish() {
                if let Step::Failed(outcome) = self.apply_line(&line) {
                    return self.fail(outcome);
                }
            }
        }

        self.complete()
    }

    fn apply_line(&mut self, line: &str) -> Step {
        match parse_frame(line) {
            Ok(None) | Ok(Some(StreamFrame::KeepAlive)) => Step::Continue,
            Ok(Some(StreamFrame::Content(fragment))) => {
                self.apply_content(&fragment);
                Step::Continue
            }
            Ok(Some(StreamFrame::Done)) => {
                debug!("Session {} received done marker", self.session.id);
                Step::Done
            }
            Ok(Some(StreamFrame::Error(message))) => {
                error!("Completion service reported an error: {}", message);
                Step::Failed(StreamOutcome::UpstreamError(message))
            }
            Err(e) => {
                warn!("Skipping malformed frame ({}): {}", e, line);
                Step::Continue
            }
        }
    }

    fn apply_content(&mut self, fragment: &str) {
        if !self.session.append(fragment) {
            return;
        }
        self.fragments += 1;
        let text = self.session.accumulated_text().to_string();

        match self.assistant_index {
            Some(index) if index + 1 == self.transcript.len() => {
                self.transcript.replace_text(index, &text);
                let _ = self.events.send(ViewEvent::EntryUpdated { index, text });
            }
            _ => {
                let index = self.append_entry(TranscriptEntry::assistant(text));
                self.assistant_index = Some(index);
            }
        }
    }

    fn append_entry(&mut self, entry: TranscriptEntry) -> usize {
        let index = self.transcript.push(entry.clone());
        let _ = self.events.send(ViewEvent::EntryAppended { index, entry });
        index
    }

    fn complete(mut self) -> StreamOutcome {
        let outcome = if self.session.accumulated_text().is_empty() {
            warn!("Session {} finished without any content", self.session.id);
            let notice = self.notices.no_response.clone();
            self.append_entry(TranscriptEntry::assistant(notice));
            StreamOutcome::Empty
        } else {
            StreamOutcome::Completed
        };

        let elapsed = Utc::now() - self.session.started_at();
        info!(
            "Session {} completed: {} fragments, {} chars in {}ms",
            self.session.id,
            self.fragments,
            self.session.accumulated_text().chars().count(),
            elapsed.num_milliseconds()
        );
        self.finish(outcome)
    }

    fn fail(mut self, outcome: StreamOutcome) -> StreamOutcome {
        let notice = match &outcome {
            StreamOutcome::UpstreamError(message) => self.notices.upstream_error(message),
            _ => self.notices.send_failure.clone(),
        };
        self.append_entry(TranscriptEntry::assistant(notice));
        self.finish(outcome)
    }

    fn finish(self, outcome: StreamOutcome) -> StreamOutcome {
        self.session.finish(outcome.clone());
        let _ = self.events.send(ViewEvent::SessionFinished {
            session_id: self.session.id,
            outcome: outcome.clone(),
        });
        outcome
    }
}
