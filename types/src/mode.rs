use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the next submission is interpreted.
///
/// The mode is process-local UI state; the mode actually used for a
/// request is captured at submit time, so switching while a request is
/// in flight never affects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResponseMode {
    #[default]
    Chat,
    ImageGeneration,
    Research,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModeParseError {
    #[error("unknown response mode: {0:?}")]
    Unknown(String),
}

impl ResponseMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Chat => "chat",
            ResponseMode::ImageGeneration => "image",
            ResponseMode::Research => "research",
        }
    }

    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            ResponseMode::Chat => "Chat",
            ResponseMode::ImageGeneration => "Image",
            ResponseMode::Research => "Research",
        }
    }

    /// Parse a mode name as typed in the `:mode` command.
    pub fn parse(raw: &str) -> Result<Self, ModeParseError> {
        match raw.trim().to_lowercase().as_str() {
            "chat" | "c" => Ok(ResponseMode::Chat),
            "image" | "img" | "i" | "imagine" => Ok(ResponseMode::ImageGeneration),
            "research" | "r" | "web" => Ok(ResponseMode::Research),
            other => Err(ModeParseError::Unknown(other.to_string())),
        }
    }

    #[must_use]
    pub fn all() -> &'static [ResponseMode] {
        &[
            ResponseMode::Chat,
            ResponseMode::ImageGeneration,
            ResponseMode::Research,
        ]
    }

    /// The next mode in display order, wrapping. Bound to Tab in the TUI.
    #[must_use]
    pub fn cycled(self) -> Self {
        match self {
            ResponseMode::Chat => ResponseMode::ImageGeneration,
            ResponseMode::ImageGeneration => ResponseMode::Research,
            ResponseMode::Research => ResponseMode::Chat,
        }
    }

    /// Image attachments are only meaningful when chatting.
    #[must_use]
    pub const fn accepts_attachment(self) -> bool {
        matches!(self, ResponseMode::Chat)
    }
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::{ModeParseError, ResponseMode};

    #[test]
    fn parse_aliases() {
        assert_eq!(ResponseMode::parse("chat").unwrap(), ResponseMode::Chat);
        assert_eq!(ResponseMode::parse("Chat").unwrap(), ResponseMode::Chat);
        assert_eq!(
            ResponseMode::parse("img").unwrap(),
            ResponseMode::ImageGeneration
        );
        assert_eq!(
            ResponseMode::parse("imagine").unwrap(),
            ResponseMode::ImageGeneration
        );
        assert_eq!(ResponseMode::parse("web").unwrap(), ResponseMode::Research);
        assert!(matches!(
            ResponseMode::parse("draw"),
            Err(ModeParseError::Unknown(_))
        ));
    }

    #[test]
    fn cycle_visits_every_mode_once() {
        let start = ResponseMode::Chat;
        let mut seen = vec![start];
        let mut mode = start.cycled();
        while mode != start {
            seen.push(mode);
            mode = mode.cycled();
        }
        assert_eq!(seen.len(), ResponseMode::all().len());
    }

    #[test]
    fn only_chat_accepts_attachments() {
        assert!(ResponseMode::Chat.accepts_attachment());
        assert!(!ResponseMode::ImageGeneration.accepts_attachment());
        assert!(!ResponseMode::Research.accepts_attachment());
    }
}
