use doomstack::{here, Doom, ResultExt, Top};
use std::str::{self, Utf8Error};

pub const REGISTER_TAG: &str = "name";
pub const DONE_TAG: &str = "done";
pub const SEPARATOR: char = ':';

/// A decoded inbound payload.
///
/// The wire format has no framing: a payload is matched by substring and
/// its name is the second `:`-separated field, taken verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Register { name: String },
    Done { name: String },
    Unknown,
}

#[derive(Doom)]
pub enum MessageError {
    #[doom(description("Payload is not valid UTF-8: {:?}", source))]
    #[doom(wrap(not_utf8))]
    NotUtf8 { source: Utf8Error },
    #[doom(description("Tagged payload has no `:`-separated name field"))]
    MissingSeparator,
}

impl Message {
    /// Decodes every message carried by `payload`. Registration and
    /// completion checks both run, so a single payload can yield both.
    pub fn decode(payload: &[u8]) -> Result<Vec<Message>, Top<MessageError>> {
        let text = str::from_utf8(payload)
            .map_err(MessageError::not_utf8)
            .map_err(MessageError::into_top)
            .spot(here!())?;

        let mut messages = Vec::new();

        if text.contains(REGISTER_TAG) {
            let name = Message::name_field(text)?;
            messages.push(Message::Register { name });
        }

        if text.contains(DONE_TAG) {
            let name = Message::name_field(text)?;
            messages.push(Message::Done { name });
        }

        if messages.is_empty() {
            messages.push(Message::Unknown);
        }

        Ok(messages)
    }

    pub fn encode(&self) -> String {
        match self {
            Message::Register { name } => format!("{}{}{}", REGISTER_TAG, SEPARATOR, name),
            Message::Done { name } => format!("{}{}{}", DONE_TAG, SEPARATOR, name),
            Message::Unknown => String::new(),
        }
    }

    fn name_field(text: &str) -> Result<String, Top<MessageError>> {
        text.split(SEPARATOR)
            .nth(1)
            .map(|name| name.to_string())
            .ok_or(MessageError::MissingSeparator.into_top())
            .spot(here!())
    }
}
