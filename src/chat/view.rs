use futures::Stream;
use log::{ info, warn };
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::session::{ StreamOutcome, StreamSession };
use super::ViewEvent;
use crate::api::{ CatalogApi, ChatStreamRequest, CompletionApi, ConversationApi, CredentialProvider };
use crate::config::CompletionSettings;
use crate::config::notices::{ reload_notices_if_changed, NoticeError, Notices };
use crate::error::{ ClientError, SendRejected };
use crate::markup::{ segment, MarkupSegment };
use crate::models::catalog::{ CharacterDetail, Message, MessageRole };
use crate::models::chat::{ ConversationTranscript, Role, TranscriptEntry };
use crate::stream::StreamIngestor;

const EVENT_CAPACITY: usize = 256;

/// Controller behind one chat screen. Owns the transcript and allows at most
/// one streaming reply at a time; the composer is disabled while it runs.
pub struct ChatView {
    character: Option<CharacterDetail>,
    conversation_id: Option<i64>,
    transcript: ConversationTranscript,
    session: Option<StreamSession>,
    composer_enabled: bool,
    notices: Arc<Notices>,
    settings: CompletionSettings,
    events: broadcast::Sender<ViewEvent>,
}

fn entry_from_message(message: Message) -> TranscriptEntry {
    let role = match message.role {
        MessageRole::Assistant => Role::Assistant,
        MessageRole::User => Role::User,
        MessageRole::System => Role::SystemChoice,
    };
    TranscriptEntry { role, text: message.content }
}

impl ChatView {
    pub fn new(notices: Arc<Notices>, settings: CompletionSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            character: None,
            conversation_id: None,
            transcript: ConversationTranscript::new(),
            session: None,
            composer_enabled: true,
            notices,
            settings,
            events,
        }
    }

    /// Binds the view to an existing conversation.
    pub fn attach(
        &mut self,
        character: CharacterDetail,
        conversation_id: i64,
        transcript: ConversationTranscript
    ) {
        self.character = Some(character);
        self.conversation_id = Some(conversation_id);
        self.transcript = transcript;
        self.session = None;
        self.set_composer(true);
    }

    /// Loads the character, resumes its latest conversation or starts a new
    /// one seeded with the character's greeting.
    pub async fn open(
        requested_character: Option<i64>,
        catalog: &dyn CatalogApi,
        conversations: &dyn ConversationApi,
        credentials: &dyn CredentialProvider,
        notices: Arc<Notices>,
        settings: CompletionSettings
    ) -> Result<Self, ClientError> {
        let token = credentials.token();
        let token = token.as_deref();

        let characters = catalog.visible_characters(token).await?;
        let selected = requested_character
            .and_then(|id| characters.iter().find(|c| c.id == id))
            .or_else(|| characters.first())
            .map(|c| c.id)
            .ok_or(ClientError::NoCharacters)?;
        if let Some(requested) = requested_character.filter(|id| *id != selected) {
            warn!("Character {} not found, opening {} instead", requested, selected);
        }

        let character = catalog.character(selected).await?;
        let existing = conversations
            .my_conversations(token).await?
            .into_iter()
            .find(|c| c.character == selected);

        let mut view = Self::new(notices, settings);
        match existing {
            Some(conversation) => {
                let messages = conversations.messages(token, conversation.id).await?;
                info!(
                    "Resuming conversation {} with {} ({} messages)",
                    conversation.id,
                    character.character.name,
                    messages.len()
                );
                let transcript = messages.into_iter().map(entry_from_message).collect();
                view.attach(character, conversation.id, transcript);
            }
            None => {
                let conversation = conversations.create_conversation(token, selected, None, None).await?;
                let greeting = view.notices.greeting_or_default(&character.greeting_message).to_string();
                info!("Started conversation {} with {}", conversation.id, character.character.name);
                let transcript = std::iter::once(TranscriptEntry::assistant(greeting)).collect();
                view.attach(character, conversation.id, transcript);
            }
        }
        Ok(view)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    pub fn character(&self) -> Option<&CharacterDetail> {
        self.character.as_ref()
    }

    pub fn conversation_id(&self) -> Option<i64> {
        self.conversation_id
    }

    pub fn transcript(&self) -> &ConversationTranscript {
        &self.transcript
    }

    pub fn session(&self) -> Option<&StreamSession> {
        self.session.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.session.as_ref().map(|s| s.is_active()).unwrap_or(false)
    }

    pub fn composer_enabled(&self) -> bool {
        self.composer_enabled
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    /// Re-reads the notice file at `path` if it changed since it was loaded.
    /// Returns whether the catalog was replaced. Skipped while a reply streams.
    pub fn refresh_notices<P: AsRef<Path>>(&mut self, path: P) -> Result<bool, NoticeError> {
        if self.is_streaming() {
            return Ok(false);
        }
        match reload_notices_if_changed(path, &self.notices)? {
            Some(notices) => {
                self.notices = notices;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Display-time segmentation of one entry; nothing is stored.
    pub fn segments(&self, index: usize) -> Option<Vec<MarkupSegment>> {
        self.transcript.get(index).map(|entry| segment(&entry.text))
    }

    fn set_composer(&mut self, enabled: bool) {
        if self.composer_enabled != enabled {
            self.composer_enabled = enabled;
            let _ = self.events.send(ViewEvent::ComposerChanged { enabled });
        }
    }

    fn append(&mut self, entry: TranscriptEntry) -> usize {
        let index = self.transcript.push(entry.clone());
        let _ = self.events.send(ViewEvent::EntryAppended { index, entry });
        index
    }

    /// Records a choice the user picked without starting a stream.
    pub fn push_choice(&mut self, text: &str) -> Result<usize, SendRejected> {
        if self.is_streaming() {
            return Err(SendRejected::SessionActive);
        }
        Ok(self.append(TranscriptEntry::choice(text)))
    }

    /// Validates and records a user message, opens a stream session and
    /// returns the request to send. A rejected message leaves the transcript
    /// untouched.
    pub fn submit(
        &mut self,
        text: &str,
        credentials: &dyn CredentialProvider
    ) -> Result<ChatStreamRequest, SendRejected> {
        if self.is_streaming() {
            return Err(SendRejected::SessionActive);
        }
        let user_message = text.trim();
        if user_message.is_empty() {
            return Err(SendRejected::EmptyMessage);
        }
        let (character_id, conversation_id) = match (&self.character, self.conversation_id) {
            (Some(character), Some(conversation_id)) => (character.character.id, conversation_id),
            _ => return Err(SendRejected::NoConversation),
        };

        let prior_turns = self.transcript.prior_turns();
        self.append(TranscriptEntry::user(user_message));

        let mut session = StreamSession::new(conversation_id, character_id, prior_turns.clone());
        session.start();
        info!("Session {} opened for conversation {}", session.id, conversation_id);
        self.session = Some(session);
        self.set_composer(false);

        Ok(ChatStreamRequest {
            conversation_id,
            character_id,
            user_message: user_message.to_string(),
            user_token: credentials.token().unwrap_or_default(),
            messages: prior_turns,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            save_to_db: true,
        })
    }

    /// Consumes the completion stream of the active session.
    pub async fn ingest<S>(&mut self, stream: S) -> StreamOutcome
        where S: Stream<Item = Result<Vec<u8>, ClientError>> + Unpin
    {
        let outcome = match self.session.as_mut() {
            Some(session) => {
                StreamIngestor::new(session, &mut self.transcript, &self.notices, &self.events)
                    .run(stream).await
            }
            None => {
                warn!("Received a stream with no session open");
                StreamOutcome::Abandoned
            }
        };
        self.set_composer(true);
        outcome
    }

    /// The completion request itself failed, so no stream exists.
    pub fn fail_before_stream(&mut self, err: &ClientError) -> StreamOutcome {
        let outcome = StreamOutcome::TransportError(err.to_string());
        if let Some(session) = self.session.as_mut().filter(|s| s.is_active()) {
            session.finish(outcome.clone());
            let session_id = session.id;
            let notice = self.notices.send_failure.clone();
            self.append(TranscriptEntry::assistant(notice));
            let _ = self.events.send(ViewEvent::SessionFinished { session_id, outcome: outcome.clone() });
        }
        self.set_composer(true);
        outcome
    }

    pub async fn send_message(
        &mut self,
        text: &str,
        completion: &dyn CompletionApi,
        credentials: &dyn CredentialProvider
    ) -> Result<StreamOutcome, SendRejected> {
        let request = self.submit(text, credentials)?;
        let outcome = match completion.stream_chat(&request).await {
            Ok(stream) => self.ingest(stream).await,
            Err(e) => {
                warn!("Completion request failed: {}", e);
                self.fail_before_stream(&e)
            }
        };
        Ok(outcome)
    }

    /// Leaves the view mid-stream. The transport is not told; it closes once
    /// its stream is dropped.
    pub fn abandon(&mut self) {
        if let Some(session) = self.session.as_mut().filter(|s| s.is_active()) {
            info!("Session {} abandoned", session.id);
            session.finish(StreamOutcome::Abandoned);
            let session_id = session.id;
            let _ = self.events.send(ViewEvent::SessionFinished {
                session_id,
                outcome: StreamOutcome::Abandoned,
            });
        }
        self.set_composer(true);
    }
}
