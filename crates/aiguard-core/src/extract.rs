//! Message extraction.
//!
//! Flattens a host envelope into the ordered role/content list sent for
//! evaluation, and exposes the same messages mutably so rewrites can be
//! merged back in the same order.

use crate::envelope::{Message, RequestInput, ResponseOutput};
use crate::types::ConversationMessage;

/// An envelope whose messages can be evaluated and rewritten.
///
/// `conversation` and `messages_mut` must visit messages in the same order;
/// position is the only key used to pair originals with rewrites.
pub trait Envelope {
    /// Mutable access to the messages, in envelope order.
    fn messages_mut(&mut self) -> impl Iterator<Item = &mut Message>;

    /// Flatten into plain role/content records, in envelope order.
    fn conversation(&self) -> Vec<ConversationMessage>;
}

impl Envelope for RequestInput {
    fn messages_mut(&mut self) -> impl Iterator<Item = &mut Message> {
        self.messages.iter_mut()
    }

    fn conversation(&self) -> Vec<ConversationMessage> {
        extract(self.messages.iter())
    }
}

impl Envelope for ResponseOutput {
    fn messages_mut(&mut self) -> impl Iterator<Item = &mut Message> {
        self.choices.iter_mut().map(|choice| &mut choice.message)
    }

    fn conversation(&self) -> Vec<ConversationMessage> {
        extract(self.choices.iter().map(|choice| &choice.message))
    }
}

/// Convert host messages to conversation records.
///
/// Roles are not validated.
pub fn extract<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Vec<ConversationMessage> {
    messages
        .into_iter()
        .map(|m| ConversationMessage::new(m.role.clone(), m.content.clone()))
        .collect()
}
