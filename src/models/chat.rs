use serde::{ Serialize, Deserialize };

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    #[serde(rename = "choice")]
    SystemChoice,
}

impl Role {
    /// Role name sent to the completion service as conversation history.
    pub fn as_turn_role(&self) -> &'static str {
        match self {
            Role::Assistant => "assistant",
            Role::User | Role::SystemChoice => "user",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
}

impl TranscriptEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, text: text.into() }
    }

    pub fn choice(text: impl Into<String>) -> Self {
        Self { role: Role::SystemChoice, text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorTurn {
    pub role: String,
    pub content: String,
}

/// Ordered chat turns of one conversation. Entries are only ever appended;
/// the text of the in-progress assistant entry is the single mutable slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationTranscript {
    entries: Vec<TranscriptEntry>,
}

impl ConversationTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TranscriptEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    pub fn replace_text(&mut self, index: usize, text: &str) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.text.clear();
                entry.text.push_str(text);
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&TranscriptEntry> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn prior_turns(&self) -> Vec<PriorTurn> {
        self.entries
            .iter()
            .map(|e| PriorTurn {
                role: e.role.as_turn_role().to_string(),
                content: e.text.clone(),
            })
            .collect()
    }
}

impl FromIterator<TranscriptEntry> for ConversationTranscript {
    fn from_iter<I: IntoIterator<Item = TranscriptEntry>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prior_turns_send_choices_as_user_turns() {
        let transcript: ConversationTranscript = vec![
            TranscriptEntry::assistant("안녕!"),
            TranscriptEntry::user("hi"),
            TranscriptEntry::choice("option B"),
        ]
            .into_iter()
            .collect();

        let roles: Vec<String> = transcript
            .prior_turns()
            .into_iter()
            .map(|t| t.role)
            .collect();
        assert_eq!(roles, vec!["assistant", "user", "user"]);
    }

    #[test]
    fn replace_text_only_touches_existing_entries() {
        let mut transcript = ConversationTranscript::new();
        let idx = transcript.push(TranscriptEntry::assistant("He"));
        assert!(transcript.replace_text(idx, "Hello"));
        assert!(!transcript.replace_text(idx + 1, "nope"));
        assert_eq!(transcript.entries(), &[TranscriptEntry::assistant("Hello")]);
    }

    #[test]
    fn choice_role_serializes_as_choice() {
        let json = serde_json::to_string(&TranscriptEntry::choice("a")).unwrap();
        assert_eq!(json, r#"{"role":"choice","text":"a"}"#);
    }
}
