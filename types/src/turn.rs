use serde::{Deserialize, Serialize};

use crate::image::{GeneratedImage, ImageAttachment};
use crate::text::NonEmptyString;

/// Who authored a turn. Mirrors the roles on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    User,
    Model,
}

impl Speaker {
    #[must_use]
    pub fn role_str(self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Model => "model",
        }
    }
}

/// A grounding source attached to a research report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,
    pub title: Option<String>,
}

impl Citation {
    /// Link label for display: the title when present, the URI otherwise.
    #[must_use]
    pub fn label(&self) -> &str {
        self.title.as_deref().filter(|t| !t.is_empty()).unwrap_or(&self.uri)
    }
}

/// The payload of a model turn, one variant per response mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReply {
    Plain(NonEmptyString),
    GeneratedImage {
        /// Human-readable caption echoing the prompt.
        caption: NonEmptyString,
        image: GeneratedImage,
    },
    ResearchReport {
        text: NonEmptyString,
        citations: Vec<Citation>,
    },
}

impl ModelReply {
    /// The textual face of the reply, whatever the variant.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            ModelReply::Plain(text) => text.as_str(),
            ModelReply::GeneratedImage { caption, .. } => caption.as_str(),
            ModelReply::ResearchReport { text, .. } => text.as_str(),
        }
    }
}

/// A user turn as appended to the conversation.
///
/// The attachment is kept for display only; histories sent back to the
/// backend carry text exclusively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTurn {
    text: String,
    attachment: Option<ImageAttachment>,
}

impl UserTurn {
    /// Text may be empty only when an attachment is present; the
    /// composer enforces that before a turn is ever built.
    #[must_use]
    pub fn new(text: String, attachment: Option<ImageAttachment>) -> Self {
        debug_assert!(!text.trim().is_empty() || attachment.is_some());
        Self { text, attachment }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn attachment(&self) -> Option<&ImageAttachment> {
        self.attachment.as_ref()
    }
}

/// A settled model turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTurn {
    reply: ModelReply,
}

impl ModelTurn {
    #[must_use]
    pub fn new(reply: ModelReply) -> Self {
        Self { reply }
    }

    #[must_use]
    pub fn reply(&self) -> &ModelReply {
        &self.reply
    }
}

/// One exchange unit in the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    User(UserTurn),
    Model(ModelTurn),
}

impl Turn {
    #[must_use]
    pub fn user(text: String, attachment: Option<ImageAttachment>) -> Self {
        Self::User(UserTurn::new(text, attachment))
    }

    #[must_use]
    pub fn model(reply: ModelReply) -> Self {
        Self::Model(ModelTurn::new(reply))
    }

    #[must_use]
    pub fn speaker(&self) -> Speaker {
        match self {
            Turn::User(_) => Speaker::User,
            Turn::Model(_) => Speaker::Model,
        }
    }

    /// The text face of the turn, used when rebuilding wire histories.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Turn::User(turn) => turn.text(),
            Turn::Model(turn) => turn.reply().text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Citation, ModelReply, Speaker, Turn};
    use crate::text::NonEmptyString;

    #[test]
    fn citation_label_prefers_title() {
        let cited = Citation {
            uri: "https://x.org".to_string(),
            title: Some("X".to_string()),
        };
        assert_eq!(cited.label(), "X");

        let untitled = Citation {
            uri: "https://y.org".to_string(),
            title: None,
        };
        assert_eq!(untitled.label(), "https://y.org");

        let blank_title = Citation {
            uri: "https://z.org".to_string(),
            title: Some(String::new()),
        };
        assert_eq!(blank_title.label(), "https://z.org");
    }

    #[test]
    fn turn_speakers_and_roles() {
        let user = Turn::user("hi".to_string(), None);
        assert_eq!(user.speaker(), Speaker::User);
        assert_eq!(user.speaker().role_str(), "user");

        let model = Turn::model(ModelReply::Plain(NonEmptyString::new("hello").unwrap()));
        assert_eq!(model.speaker(), Speaker::Model);
        assert_eq!(model.speaker().role_str(), "model");
    }

    #[test]
    fn reply_text_covers_every_variant() {
        let report = ModelReply::ResearchReport {
            text: NonEmptyString::new("# Title").unwrap(),
            citations: vec![],
        };
        assert_eq!(report.text(), "# Title");

        let plain = ModelReply::Plain(NonEmptyString::new("ok").unwrap());
        assert_eq!(plain.text(), "ok");
    }
}
