use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use atelier_engine::{Composer, Session, SubmitError};
use atelier_gateway::GeminiGateway;
use atelier_tui::{FrameState, InputMode, ScrollState};
use atelier_types::{GeneratedImage, ImageAttachment, ModelReply, ResponseMode, Turn};

use crate::config::Settings;

const HELP_NOTICE: &str =
    ":q quit │ :mode <name> │ :attach <path> │ :detach │ :save [path] │ :model <name>";

pub struct App {
    session: Session,
    composer: Composer,
    mode: ResponseMode,
    input_mode: InputMode,
    command: String,
    scroll: ScrollState,
    scroll_max: u16,
    should_quit: bool,
    notice: Option<String>,
    tick: usize,
    api_key: Option<String>,
    chat_model: String,
    image_model: String,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        let gateway = build_gateway(&settings);

        Self {
            session: Session::new(gateway),
            composer: Composer::new(),
            mode: ResponseMode::Chat,
            input_mode: InputMode::Normal,
            command: String::new(),
            scroll: ScrollState::AutoBottom,
            scroll_max: 0,
            should_quit: false,
            notice: None,
            tick: 0,
            api_key: settings.api_key,
            chat_model: settings.chat_model,
            image_model: settings.image_model,
        }
    }

    /// Increment animation tick and settle any finished request.
    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        if self.session.poll_settled() {
            self.scroll = ScrollState::AutoBottom;
        }
    }

    pub fn frame_state(&self) -> FrameState<'_> {
        FrameState {
            conversation: self.session.conversation(),
            mode: self.mode,
            in_flight: self.session.in_flight_mode(),
            input_mode: self.input_mode,
            draft_text: self.composer.draft().text(),
            draft_cursor: self.composer.draft().cursor(),
            command_text: &self.command,
            attachment: self.composer.attachment(),
            notice: self.notice.as_deref(),
            model_name: &self.chat_model,
            has_api_key: self.api_key.is_some(),
            tick: self.tick,
            scroll: self.scroll,
            scroll_max: self.scroll_max,
        }
    }

    pub fn update_scroll_max(&mut self, max: u16) {
        self.scroll_max = max;

        if let ScrollState::Manual { offset_from_top } = self.scroll
            && offset_from_top >= max
        {
            self.scroll = ScrollState::AutoBottom;
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn request_quit(&mut self) {
        self.should_quit = true;
    }

    pub fn set_notice(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub fn enter_normal_mode(&mut self) {
        self.command.clear();
        self.input_mode = InputMode::Normal;
    }

    pub fn enter_insert_mode(&mut self) {
        self.input_mode = InputMode::Insert;
    }

    pub fn enter_insert_mode_at_end(&mut self) {
        self.composer.draft_mut().move_cursor_end();
        self.enter_insert_mode();
    }

    pub fn enter_insert_mode_with_clear(&mut self) {
        self.composer.draft_mut().clear();
        self.enter_insert_mode();
    }

    pub fn enter_command_mode(&mut self) {
        self.command.clear();
        self.input_mode = InputMode::Command;
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    pub fn command_push(&mut self, ch: char) {
        self.command.push(ch);
    }

    pub fn command_backspace(&mut self) {
        self.command.pop();
    }

    /// Take the typed command line and return to normal mode.
    pub fn take_command(&mut self) -> String {
        let command = std::mem::take(&mut self.command);
        self.input_mode = InputMode::Normal;
        command
    }

    /// `Tab` in normal mode. Leaving chat discards any staged
    /// attachment, since only chat turns can carry one.
    pub fn cycle_mode(&mut self) {
        self.mode = self.mode.cycled();
        if !self.mode.accepts_attachment() && self.composer.discard_attachment().is_some() {
            self.set_notice("Attachment discarded: images only apply in Chat mode");
        }
    }

    /// Validate the staged input and hand it to the session.
    pub fn submit(&mut self) {
        if self.api_key.is_none() {
            self.set_notice("No API key: set GEMINI_API_KEY or add one to ~/.atelier/config.toml");
            return;
        }

        let submission = match self.composer.compose(self.mode, self.session.conversation()) {
            Ok(submission) => submission,
            Err(err) => {
                self.set_notice(err.to_string());
                return;
            }
        };

        match self.session.submit(submission) {
            Ok(()) => {
                self.clear_notice();
                self.scroll = ScrollState::AutoBottom;
                self.enter_normal_mode();
            }
            Err(SubmitError::Busy) => {
                self.set_notice("A request is already in flight");
            }
        }
    }

    pub fn process_command(&mut self, raw: &str) {
        let parts: Vec<&str> = raw.split_whitespace().collect();

        match parts.first().copied() {
            Some("q" | "quit") => {
                self.request_quit();
            }
            Some("mode") => match parts.get(1) {
                Some(name) => match ResponseMode::parse(name) {
                    Ok(mode) => {
                        if mode != self.mode {
                            self.mode = mode;
                            if !mode.accepts_attachment() {
                                self.composer.discard_attachment();
                            }
                        }
                        self.set_notice(format!("Mode: {}", mode.display_name()));
                    }
                    Err(err) => self.set_notice(err.to_string()),
                },
                None => self.set_notice(format!("Mode: {}", self.mode.display_name())),
            },
            Some("attach") => match parts.get(1) {
                Some(path) => self.attach(Path::new(path)),
                None => self.set_notice("Usage: :attach <path>"),
            },
            Some("detach") => {
                if self.composer.discard_attachment().is_some() {
                    self.set_notice("Attachment removed");
                } else {
                    self.set_notice("Nothing attached");
                }
            }
            Some("save") => {
                let target = parts.get(1).map(PathBuf::from);
                match self.save_last_image(target) {
                    Ok(Some(path)) => self.set_notice(format!("Saved to {}", path.display())),
                    Ok(None) => self.set_notice("No generated image to save"),
                    Err(err) => self.set_notice(format!("Save failed: {err}")),
                }
            }
            Some("model") => match parts.get(1) {
                Some(name) => self.set_chat_model((*name).to_string()),
                None => self.set_notice(format!(
                    "Chat: {} │ Image: {}",
                    self.chat_model, self.image_model
                )),
            },
            Some("help") => {
                self.set_notice(HELP_NOTICE);
            }
            Some(other) => {
                self.set_notice(format!("Unknown command: :{other}  (:help for the list)"));
            }
            None => {}
        }
    }

    fn attach(&mut self, path: &Path) {
        if !self.mode.accepts_attachment() {
            self.set_notice(format!(
                "{} mode does not take attachments; switch to Chat first",
                self.mode.display_name()
            ));
            return;
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.set_notice(format!("Cannot read {}: {err}", path.display()));
                return;
            }
        };

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        match ImageAttachment::from_bytes(&file_name, &bytes) {
            Ok(attachment) => {
                self.set_notice(format!("Attached {file_name}"));
                self.composer.stage_attachment(attachment);
            }
            Err(err) => self.set_notice(err.to_string()),
        }
    }

    /// Write the most recent generated image to disk. `None` when the
    /// conversation holds no generated image.
    fn save_last_image(&self, target: Option<PathBuf>) -> Result<Option<PathBuf>> {
        let Some(image) = last_generated_image(self.session.conversation().turns()) else {
            return Ok(None);
        };

        let path = target.unwrap_or_else(|| default_image_path(image));
        let bytes = image.decode().context("image payload is not valid base64")?;
        std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;

        tracing::info!(path = %path.display(), bytes = image.byte_len(), "saved generated image");
        Ok(Some(path))
    }

    fn set_chat_model(&mut self, model: String) {
        let settings = Settings {
            api_key: self.api_key.clone(),
            chat_model: model,
            image_model: self.image_model.clone(),
        };

        match self.session.set_gateway(build_gateway(&settings)) {
            Ok(()) => {
                self.chat_model = settings.chat_model;
                self.set_notice(format!("Model set to {}", self.chat_model));
            }
            Err(SubmitError::Busy) => {
                self.set_notice("Cannot change model while a request is in flight");
            }
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll.scroll_up(self.scroll_max);
    }

    pub fn scroll_down(&mut self) {
        self.scroll.scroll_down(self.scroll_max);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll.scroll_to_top();
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll.scroll_to_bottom();
    }
}

fn build_gateway(settings: &Settings) -> Arc<GeminiGateway> {
    Arc::new(GeminiGateway::new(
        settings.api_key.clone().unwrap_or_default(),
        settings.chat_model.clone(),
        settings.image_model.clone(),
    ))
}

fn last_generated_image(turns: &[Turn]) -> Option<&GeneratedImage> {
    turns.iter().rev().find_map(|turn| match turn {
        Turn::Model(model) => match model.reply() {
            ModelReply::GeneratedImage { image, .. } => Some(image),
            _ => None,
        },
        Turn::User(_) => None,
    })
}

fn default_image_path(image: &GeneratedImage) -> PathBuf {
    let ext = match image.mime() {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    };
    PathBuf::from(format!("atelier-{}.{ext}", uuid::Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::{App, default_image_path, last_generated_image};
    use crate::config::Settings;
    use atelier_tui::InputMode;
    use atelier_types::{GeneratedImage, ModelReply, NonEmptyString, ResponseMode, Turn};

    fn app() -> App {
        App::new(Settings {
            api_key: Some("test-key".to_string()),
            chat_model: "gemini-2.5-flash".to_string(),
            image_model: "imagen-4.0-generate-001".to_string(),
        })
    }

    fn generated_turn(data: &str, mime: &str) -> Turn {
        Turn::model(ModelReply::GeneratedImage {
            caption: NonEmptyString::new("caption".to_string()).unwrap(),
            image: GeneratedImage::new(data.to_string(), mime.to_string()),
        })
    }

    #[test]
    fn tab_cycles_all_three_modes() {
        let mut app = app();
        assert_eq!(app.mode, ResponseMode::Chat);
        app.cycle_mode();
        assert_eq!(app.mode, ResponseMode::ImageGeneration);
        app.cycle_mode();
        assert_eq!(app.mode, ResponseMode::Research);
        app.cycle_mode();
        assert_eq!(app.mode, ResponseMode::Chat);
    }

    #[test]
    fn unknown_command_sets_notice() {
        let mut app = app();
        app.process_command("frobnicate");
        assert!(app.notice.unwrap().contains("Unknown command"));
    }

    #[test]
    fn mode_command_parses_aliases() {
        let mut app = app();
        app.process_command("mode research");
        assert_eq!(app.mode, ResponseMode::Research);
        app.process_command("mode img");
        assert_eq!(app.mode, ResponseMode::ImageGeneration);
        app.process_command("mode nonsense");
        assert_eq!(app.mode, ResponseMode::ImageGeneration);
        assert!(app.notice.unwrap().contains("nonsense"));
    }

    #[test]
    fn command_buffer_roundtrip() {
        let mut app = app();
        app.enter_command_mode();
        assert_eq!(app.input_mode(), InputMode::Command);
        for ch in "mode chat".chars() {
            app.command_push(ch);
        }
        app.command_backspace();
        assert_eq!(app.take_command(), "mode cha");
        assert_eq!(app.input_mode(), InputMode::Normal);
    }

    #[test]
    fn finds_newest_generated_image() {
        let turns = vec![
            generated_turn("old", "image/png"),
            Turn::user("hello".to_string(), None),
            generated_turn("new", "image/jpeg"),
        ];
        let image = last_generated_image(&turns).unwrap();
        assert_eq!(image.data(), "new");
    }

    #[test]
    fn no_generated_image_in_plain_conversation() {
        let turns = vec![Turn::user("hello".to_string(), None)];
        assert!(last_generated_image(&turns).is_none());
    }

    #[test]
    fn default_path_extension_follows_mime() {
        let jpeg = GeneratedImage::new("aGk=".to_string(), "image/jpeg".to_string());
        assert!(default_image_path(&jpeg).to_string_lossy().ends_with(".jpg"));
        let png = GeneratedImage::new("aGk=".to_string(), "image/png".to_string());
        assert!(default_image_path(&png).to_string_lossy().ends_with(".png"));
    }

    #[test]
    fn save_on_empty_conversation_reports_nothing_to_save() {
        let app = app();
        assert!(app.save_last_image(None).unwrap().is_none());
    }
}
