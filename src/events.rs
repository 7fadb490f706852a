use crate::store::ConversationId;

/// Internal application events delivered to the main loop
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A reply fetch finished (success or failure) for the captured conversation
    ReplyArrived {
        conversation_id: ConversationId,
        text: String,
        is_error: bool,
    },

    /// The settle delay elapsed for the conversation the timer was armed on
    Settle { conversation_id: ConversationId },
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn display_name(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "Assistant",
        }
    }
}
