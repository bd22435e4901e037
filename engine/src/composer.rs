use thiserror::Error;

use atelier_gateway::HistoryTurn;
use atelier_types::{ImageAttachment, ResponseMode};

use crate::store::Conversation;

/// The editable input line: text plus a character-indexed cursor.
#[derive(Debug, Default)]
pub struct Draft {
    text: String,
    cursor: usize,
}

impl Draft {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Byte offset of the cursor into the text.
    fn byte_index(&self) -> usize {
        self.text
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    pub fn take_text(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    pub fn enter_char(&mut self, ch: char) {
        let index = self.byte_index();
        self.text.insert(index, ch);
        self.cursor += 1;
    }

    pub fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let index = self.byte_index();
        self.text.remove(index);
    }

    pub fn delete_char_forward(&mut self) {
        if self.cursor < self.char_count() {
            let index = self.byte_index();
            self.text.remove(index);
        }
    }

    pub fn delete_word_backwards(&mut self) {
        let trailing_ws = |d: &Draft| {
            d.cursor > 0
                && d.text
                    .chars()
                    .nth(d.cursor - 1)
                    .is_some_and(char::is_whitespace)
        };
        let trailing_word = |d: &Draft| {
            d.cursor > 0
                && d.text
                    .chars()
                    .nth(d.cursor - 1)
                    .is_some_and(|c| !c.is_whitespace())
        };

        while trailing_ws(self) {
            self.delete_char();
        }
        while trailing_word(self) {
            self.delete_char();
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor = self.char_count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("nothing to send - type a message or attach an image")]
    EmptyDraft,
    #[error("{0} mode needs a text prompt")]
    TextRequired(ResponseMode),
}

/// A validated, submittable request.
///
/// Carries the mode captured at composition time and a text-only
/// snapshot of the history taken *before* the new turn is appended.
#[derive(Debug)]
pub struct Submission {
    pub mode: ResponseMode,
    pub text: String,
    pub attachment: Option<ImageAttachment>,
    pub history: Vec<HistoryTurn>,
}

/// Staged input: the draft line plus at most one image attachment.
#[derive(Debug, Default)]
pub struct Composer {
    draft: Draft,
    attachment: Option<ImageAttachment>,
}

impl Composer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    #[must_use]
    pub fn attachment(&self) -> Option<&ImageAttachment> {
        self.attachment.as_ref()
    }

    /// Stage an attachment, replacing any previous one.
    pub fn stage_attachment(&mut self, attachment: ImageAttachment) {
        self.attachment = Some(attachment);
    }

    /// Drop the staged attachment. Also invoked when the response mode
    /// leaves chat, where attachments are meaningless.
    pub fn discard_attachment(&mut self) -> Option<ImageAttachment> {
        self.attachment.take()
    }

    /// Build a [`Submission`] from the staged input.
    ///
    /// Validation happens before anything is consumed: on error both the
    /// draft and the attachment stay staged for retry; on success both
    /// are cleared together.
    pub fn compose(
        &mut self,
        mode: ResponseMode,
        conversation: &Conversation,
    ) -> Result<Submission, ComposeError> {
        let has_text = !self.draft.text().trim().is_empty();

        if !has_text {
            if !mode.accepts_attachment() {
                return Err(ComposeError::TextRequired(mode));
            }
            if self.attachment.is_none() {
                return Err(ComposeError::EmptyDraft);
            }
        }

        let history = conversation
            .iter()
            .map(|turn| HistoryTurn::new(turn.speaker(), turn.text()))
            .collect();

        // Non-chat modes never carry an image; a stale stage is dropped
        // here rather than smuggled into the submission.
        let attachment = self.attachment.take().filter(|_| mode.accepts_attachment());

        Ok(Submission {
            mode,
            text: self.draft.take_text(),
            attachment,
            history,
        })
    }
}
