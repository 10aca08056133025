use async_trait::async_trait;
use character_chat::api::{ ByteStream, CatalogApi, ChatStreamRequest, CompletionApi, ConversationApi, StaticCredentials };
use character_chat::chat::session::{ SessionState, StreamOutcome };
use character_chat::chat::{ ChatView, ViewEvent };
use character_chat::config::CompletionSettings;
use character_chat::config::notices::Notices;
use character_chat::error::ClientError;
use character_chat::markup::{ MarkupSegment, SegmentKind };
use character_chat::models::catalog::{ Character, CharacterDetail, Conversation, Message, MessageRole };
use character_chat::models::chat::{ Role, TranscriptEntry };
use futures::stream;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One backend fake: a single science tutor with no prior conversations whose
/// completion stream replays `frames` split into small chunks.
struct FakeBackend {
    frames: String,
    chunk_size: usize,
}

fn tutor() -> CharacterDetail {
    serde_json::from_value(serde_json::json!({
        "id": 12,
        "name": "Professor Oak",
        "subject": "science",
        "greeting_message": "*looks up from a microscope* [a cluttered lab] Oh, a visitor!",
    })).unwrap()
}

#[async_trait]
impl CatalogApi for FakeBackend {
    async fn list_characters(&self, _token: Option<&str>) -> Result<Vec<Character>, ClientError> {
        Ok(vec![tutor().character])
    }

    async fn public_characters(&self) -> Result<BTreeMap<String, Vec<Character>>, ClientError> {
        Ok(BTreeMap::new())
    }

    async fn character(&self, _id: i64) -> Result<CharacterDetail, ClientError> {
        Ok(tutor())
    }
}

#[async_trait]
impl ConversationApi for FakeBackend {
    async fn my_conversations(&self, _token: Option<&str>) -> Result<Vec<Conversation>, ClientError> {
        Ok(Vec::new())
    }

    async fn create_conversation(
        &self,
        _token: Option<&str>,
        character_id: i64,
        _title: Option<&str>,
        _subject: Option<&str>
    ) -> Result<Conversation, ClientError> {
        Ok(serde_json::from_value(serde_json::json!({
            "id": 501,
            "character": character_id,
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z",
        })).unwrap())
    }

    async fn messages(&self, _token: Option<&str>, _conversation_id: i64) -> Result<Vec<Message>, ClientError> {
        Ok(Vec::new())
    }

    async fn add_message(
        &self,
        _token: Option<&str>,
        _conversation_id: i64,
        _role: MessageRole,
        _content: &str
    ) -> Result<Message, ClientError> {
        Err(ClientError::Transport("not used".into()))
    }
}

#[async_trait]
impl CompletionApi for FakeBackend {
    async fn stream_chat(&self, _request: &ChatStreamRequest) -> Result<ByteStream, ClientError> {
        let chunks: Vec<Result<Vec<u8>, ClientError>> = self.frames
            .as_bytes()
            .chunks(self.chunk_size)
            .map(|c| Ok(c.to_vec()))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

fn frames(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| format!("data: {}\n\n", p))
        .collect()
}

async fn open(backend: &FakeBackend) -> ChatView {
    ChatView::open(
        None,
        backend,
        backend,
        &StaticCredentials::anonymous(),
        Arc::new(Notices::default()),
        CompletionSettings::default()
    ).await.unwrap()
}

#[tokio::test]
async fn full_exchange_is_streamed_and_segmented() {
    let backend = FakeBackend {
        frames: frames(&[
            r#"{"content":"*adjusts glasses* "}"#,
            r#"{"content":"광합성은 "}"#,
            r#"{"content":"빛 에너지를 쓰는 과정이야. "}"#,
            r#"{"content":"(이해했을까?)"}"#,
            r#"{"done":true}"#,
        ]),
        // small chunks split both frames and multi-byte characters
        chunk_size: 5,
    };
    let mut view = open(&backend).await;
    let mut events = view.subscribe();

    let outcome = view
        .send_message("광합성이 뭐예요?", &backend, &StaticCredentials::anonymous()).await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::Completed);
    assert_eq!(view.session().unwrap().state(), SessionState::Completed);
    let entries = view.transcript().entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[1], TranscriptEntry::user("광합성이 뭐예요?"));
    assert_eq!(entries[2].role, Role::Assistant);
    assert_eq!(entries[2].text, "*adjusts glasses* 광합성은 빛 에너지를 쓰는 과정이야. (이해했을까?)");

    assert_eq!(
        view.segments(2).unwrap(),
        vec![
            MarkupSegment { kind: SegmentKind::Narration, content: "adjusts glasses".into() },
            MarkupSegment { kind: SegmentKind::Dialogue, content: "광합성은 빛 에너지를 쓰는 과정이야.".into() },
            MarkupSegment { kind: SegmentKind::Thought, content: "이해했을까?".into() },
        ]
    );

    let mut updates = 0;
    while let Ok(event) = events.try_recv() {
        if let ViewEvent::EntryUpdated { index, .. } = event {
            assert_eq!(index, 2);
            updates += 1;
        }
    }
    assert_eq!(updates, 3);
}

#[tokio::test]
async fn greeting_seeds_a_new_conversation() {
    let backend = FakeBackend { frames: String::new(), chunk_size: 8 };
    let view = open(&backend).await;

    assert_eq!(view.conversation_id(), Some(501));
    let kinds: Vec<SegmentKind> = view
        .segments(0)
        .unwrap()
        .into_iter()
        .map(|s| s.kind)
        .collect();
    assert_eq!(kinds, vec![SegmentKind::Narration, SegmentKind::Background, SegmentKind::Dialogue]);
}

#[tokio::test]
async fn upstream_error_after_partial_reply() {
    let backend = FakeBackend {
        frames: frames(&[r#"{"content":"Hi"}"#, r#"{"error":"rate limited"}"#]),
        chunk_size: 64,
    };
    let mut view = open(&backend).await;

    let outcome = view.send_message("hello", &backend, &StaticCredentials::anonymous()).await.unwrap();

    assert_eq!(outcome, StreamOutcome::UpstreamError("rate limited".into()));
    assert_eq!(view.session().unwrap().state(), SessionState::Failed);
    assert!(view.composer_enabled());
    let texts: Vec<&str> = view
        .transcript()
        .entries()
        .iter()
        .skip(2)
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(texts, vec!["Hi", "⚠️ 오류: rate limited"]);
}

#[tokio::test]
async fn silent_stream_gets_exactly_one_fallback() {
    let backend = FakeBackend { frames: frames(&[r#"{"done":true}"#]), chunk_size: 64 };
    let mut view = open(&backend).await;

    let outcome = view.send_message("anyone?", &backend, &StaticCredentials::anonymous()).await.unwrap();

    assert_eq!(outcome, StreamOutcome::Empty);
    assert_eq!(view.session().unwrap().state(), SessionState::Completed);
    assert_eq!(view.transcript().len(), 3);
    assert_eq!(view.transcript().last().unwrap(), &TranscriptEntry::assistant(Notices::default().no_response));
}
