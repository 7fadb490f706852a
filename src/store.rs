//! Conversation store: owns every conversation, the active selection, and the
//! loading flag, and exposes the only operations allowed to mutate them.

use chrono::{DateTime, Utc};

use crate::events::Sender;

/// Maximum title length before truncation, in characters.
const TITLE_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationId(pub u64);

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One turn in a conversation
#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    /// True when this message stands in for a failed reply
    pub is_error: bool,
    /// True until the settle timer has processed this message
    pub should_animate: bool,
    pub created_at: DateTime<Utc>,
}

/// An ordered thread of messages with a title fixed at creation
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub messages: Vec<Message>,
}

/// Session state: all conversations plus the active selection.
///
/// The store is owned by the main loop task; every mutation goes through the
/// methods below, so read-modify-write never interleaves.
#[derive(Debug)]
pub struct Store {
    /// Newest-created first
    conversations: Vec<Conversation>,
    active_id: Option<ConversationId>,
    is_loading: bool,
    /// Session-monotonic id counter shared by messages and conversations
    next_id: u64,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            conversations: Vec::new(),
            active_id: None,
            is_loading: false,
            next_id: 1,
        }
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deselect the active conversation so the next message starts a fresh one
    pub fn start_new_chat(&mut self) {
        self.active_id = None;
    }

    /// Make an existing conversation active. Unknown ids are ignored, and
    /// reselecting the current conversation is a no-op.
    pub fn select_conversation(&mut self, id: ConversationId) {
        if self.active_id == Some(id) {
            return;
        }
        if self.conversations.iter().any(|c| c.id == id) {
            self.active_id = Some(id);
        } else {
            tracing::warn!(%id, "ignoring selection of unknown conversation");
        }
    }

    /// Record a user message and return the conversation it landed in.
    ///
    /// Expects trimmed, non-empty text; the composer enforces that before
    /// calling. The returned id must be captured by the caller and used as the
    /// reply target, even if the active conversation changes before the reply
    /// arrives.
    pub fn submit_user_message(&mut self, text: impl Into<String>) -> ConversationId {
        let message = Message {
            id: self.allocate_message_id(),
            text: text.into(),
            sender: Sender::User,
            is_error: false,
            should_animate: true,
            created_at: Utc::now(),
        };

        self.is_loading = true;

        match self.active_id {
            Some(id) => {
                // The active conversation always exists: select_conversation
                // validates ids and conversations are never deleted.
                if let Some(convo) = self.conversation_mut(id) {
                    convo.messages.push(message);
                }
                id
            }
            None => {
                let id = ConversationId(self.bump_id());
                let conversation = Conversation {
                    id,
                    title: derive_title(&message.text),
                    messages: vec![message],
                };
                self.conversations.insert(0, conversation);
                self.active_id = Some(id);
                id
            }
        }
    }

    /// File an assistant reply against the conversation captured at submission
    /// time. A reply whose conversation cannot be found is dropped rather than
    /// misfiled.
    pub fn append_reply(&mut self, conversation_id: ConversationId, text: String, is_error: bool) {
        let message = Message {
            id: self.allocate_message_id(),
            text,
            sender: Sender::Assistant,
            is_error,
            should_animate: true,
            created_at: Utc::now(),
        };

        match self.conversation_mut(conversation_id) {
            Some(convo) => convo.messages.push(message),
            None => {
                tracing::warn!(id = %conversation_id, "dropping reply for unknown conversation");
            }
        }
    }

    /// Clear the loading flag. Called exactly once per fetch, on every exit path.
    pub fn finish_loading(&mut self) {
        self.is_loading = false;
    }

    /// Clear the animation flag on every message of the active conversation
    pub fn settle_active(&mut self) {
        if let Some(id) = self.active_id {
            if let Some(convo) = self.conversation_mut(id) {
                for message in &mut convo.messages {
                    message.should_animate = false;
                }
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn active_id(&self) -> Option<ConversationId> {
        self.active_id
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active_id
            .and_then(|id| self.conversations.iter().find(|c| c.id == id))
    }

    fn conversation_mut(&mut self, id: ConversationId) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    fn allocate_message_id(&mut self) -> MessageId {
        MessageId(self.bump_id())
    }

    fn bump_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Title rule: the first user message verbatim if short enough, otherwise the
/// first 30 characters plus an ellipsis. Char-based so multibyte text cannot be
/// split mid code point.
fn derive_title(text: &str) -> String {
    if text.chars().count() <= TITLE_MAX_CHARS {
        text.to_string()
    } else {
        let mut title: String = text.chars().take(TITLE_MAX_CHARS).collect();
        title.push_str("...");
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_shorter_than_limit_is_kept_verbatim() {
        assert_eq!(derive_title("Hello"), "Hello");
        let exactly_thirty = "a".repeat(30);
        assert_eq!(derive_title(&exactly_thirty), exactly_thirty);
    }

    #[test]
    fn title_longer_than_limit_is_truncated_with_ellipsis() {
        let text = "a".repeat(31);
        let title = derive_title(&text);
        assert_eq!(title, format!("{}...", "a".repeat(30)));
    }

    #[test]
    fn title_truncation_counts_characters_not_bytes() {
        let text = "é".repeat(31);
        let title = derive_title(&text);
        assert_eq!(title, format!("{}...", "é".repeat(30)));
    }

    #[test]
    fn first_message_creates_a_conversation_and_makes_it_active() {
        let mut store = Store::new();
        let id = store.submit_user_message("Hello");

        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.active_id(), Some(id));
        assert!(store.is_loading());

        let convo = store.active_conversation().unwrap();
        assert_eq!(convo.title, "Hello");
        assert_eq!(convo.messages.len(), 1);
        assert_eq!(convo.messages[0].sender, Sender::User);
        assert!(convo.messages[0].should_animate);
    }

    #[test]
    fn second_message_appends_instead_of_creating() {
        let mut store = Store::new();
        let first = store.submit_user_message("one");
        store.finish_loading();
        let second = store.submit_user_message("two");

        assert_eq!(first, second);
        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.active_conversation().unwrap().messages.len(), 2);
    }

    #[test]
    fn new_conversations_are_prepended() {
        let mut store = Store::new();
        let older = store.submit_user_message("older");
        store.finish_loading();
        store.start_new_chat();
        let newer = store.submit_user_message("newer");

        assert_eq!(store.conversations()[0].id, newer);
        assert_eq!(store.conversations()[1].id, older);
    }

    #[test]
    fn submissions_and_replies_preserve_order() {
        let mut store = Store::new();
        let id = store.submit_user_message("q1");
        store.append_reply(id, "a1".to_string(), false);
        store.finish_loading();
        store.submit_user_message("q2");
        store.append_reply(id, "a2".to_string(), false);
        store.finish_loading();

        let texts: Vec<&str> = store.active_conversation().unwrap().messages
            .iter()
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(texts, ["q1", "a1", "q2", "a2"]);
    }

    #[test]
    fn message_ids_are_strictly_increasing() {
        let mut store = Store::new();
        let id = store.submit_user_message("q");
        store.append_reply(id, "a".to_string(), false);
        let messages = &store.active_conversation().unwrap().messages;
        assert!(messages[0].id < messages[1].id);
    }

    #[test]
    fn reply_follows_the_captured_conversation_not_the_active_one() {
        let mut store = Store::new();
        let captured = store.submit_user_message("question");
        store.start_new_chat();
        let other = store.submit_user_message("unrelated");
        assert_ne!(captured, other);

        store.append_reply(captured, "answer".to_string(), false);

        let original = store.conversations().iter().find(|c| c.id == captured).unwrap();
        assert_eq!(original.messages.len(), 2);
        assert_eq!(original.messages[1].text, "answer");
        // The currently active conversation is untouched.
        assert_eq!(store.active_conversation().unwrap().messages.len(), 1);
    }

    #[test]
    fn reply_for_unknown_conversation_is_dropped() {
        let mut store = Store::new();
        store.submit_user_message("hello");
        store.append_reply(ConversationId(9999), "lost".to_string(), false);

        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.conversations()[0].messages.len(), 1);
    }

    #[test]
    fn selecting_an_unknown_id_is_ignored() {
        let mut store = Store::new();
        let id = store.submit_user_message("hello");
        store.select_conversation(ConversationId(9999));
        assert_eq!(store.active_id(), Some(id));
    }

    #[test]
    fn selecting_an_existing_conversation_switches_to_it() {
        let mut store = Store::new();
        let first = store.submit_user_message("first");
        store.finish_loading();
        store.start_new_chat();
        store.submit_user_message("second");
        store.finish_loading();

        store.select_conversation(first);
        assert_eq!(store.active_id(), Some(first));
    }

    #[test]
    fn start_new_chat_deselects_without_clearing_history() {
        let mut store = Store::new();
        store.submit_user_message("hello");
        store.start_new_chat();

        assert_eq!(store.active_id(), None);
        assert!(store.active_conversation().is_none());
        assert_eq!(store.conversations().len(), 1);
    }

    #[test]
    fn settle_clears_animation_flags_on_the_active_conversation_only() {
        let mut store = Store::new();
        let background = store.submit_user_message("background");
        store.finish_loading();
        store.start_new_chat();
        let active = store.submit_user_message("active");
        store.append_reply(active, "reply".to_string(), false);
        store.finish_loading();

        store.settle_active();

        let active_convo = store.active_conversation().unwrap();
        assert!(active_convo.messages.iter().all(|m| !m.should_animate));

        let background_convo = store.conversations().iter().find(|c| c.id == background).unwrap();
        assert!(background_convo.messages.iter().all(|m| m.should_animate));
    }

    #[test]
    fn settle_without_an_active_conversation_is_a_no_op() {
        let mut store = Store::new();
        store.submit_user_message("hello");
        store.start_new_chat();
        store.settle_active();

        assert!(store.conversations()[0].messages[0].should_animate);
    }

    #[test]
    fn error_replies_carry_the_error_flag() {
        let mut store = Store::new();
        let id = store.submit_user_message("hello");
        store.append_reply(id, "something broke".to_string(), true);
        store.finish_loading();

        let messages = &store.active_conversation().unwrap().messages;
        assert!(messages[1].is_error);
        assert!(!store.is_loading());
    }
}
