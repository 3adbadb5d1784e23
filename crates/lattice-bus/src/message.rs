//! Bus messages.

/// One delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Subject the message was published on.
    pub subject: String,
    /// Where a reply should be published, if the sender wants one.
    pub reply: Option<String>,
    /// Opaque payload.
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(subject: impl Into<String>, reply: Option<String>, payload: Vec<u8>) -> Self {
        Self {
            subject: subject.into(),
            reply,
            payload,
        }
    }
}
