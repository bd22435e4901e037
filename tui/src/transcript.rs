//! Rendering of the conversation transcript.

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use atelier_engine::Conversation;
use atelier_types::{ModelReply, ResponseMode, Turn, UserTurn};

use crate::report::render_report;
use crate::theme::{colors, mode_accent, spinner_frame, styles};

/// Render the whole conversation to lines, newest last.
#[must_use]
pub fn render_transcript(conversation: &Conversation) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for (index, turn) in conversation.iter().enumerate() {
        if index > 0 {
            lines.push(Line::from(""));
            lines.push(Line::from(""));
        }
        match turn {
            Turn::User(user) => render_user_turn(user, &mut lines),
            Turn::Model(model) => render_model_reply(model.reply(), &mut lines),
        }
    }

    lines
}

/// The "waiting on the backend" block appended below the transcript
/// while a request is in flight.
#[must_use]
pub fn render_pending(mode: ResponseMode, tick: usize) -> Vec<Line<'static>> {
    let verb = match mode {
        ResponseMode::Chat => "Thinking...",
        ResponseMode::ImageGeneration => "Painting...",
        ResponseMode::Research => "Researching...",
    };

    vec![
        Line::from(""),
        Line::from(""),
        header_line("◆", "Atelier", styles::model_name()),
        Line::from(""),
        Line::from(vec![
            Span::raw("    "),
            Span::styled(
                spinner_frame(tick).to_string(),
                Style::default().fg(mode_accent(mode)),
            ),
            Span::styled(format!(" {verb}"), Style::default().fg(colors::TEXT_MUTED)),
        ]),
    ]
}

fn header_line(icon: &str, name: &str, style: Style) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!(" {icon} "), style),
        Span::styled(name.to_string(), style),
    ])
}

fn render_user_turn(user: &UserTurn, lines: &mut Vec<Line<'static>>) {
    lines.push(header_line("▶", "You", styles::user_name()));
    lines.push(Line::from(""));

    if let Some(attachment) = user.attachment() {
        lines.push(Line::from(vec![
            Span::raw("    "),
            Span::styled(
                format!(
                    "🖼 {} ({}, {})",
                    attachment.file_name(),
                    attachment.mime(),
                    format_bytes(attachment.raw_len())
                ),
                Style::default().fg(colors::PEACH),
            ),
        ]));
    }

    for text_line in user.text().lines().filter(|l| !l.is_empty()) {
        lines.push(Line::from(vec![
            Span::raw("    "),
            Span::styled(
                text_line.to_string(),
                Style::default().fg(colors::TEXT_PRIMARY),
            ),
        ]));
    }
}

fn render_model_reply(reply: &ModelReply, lines: &mut Vec<Line<'static>>) {
    lines.push(header_line("◆", "Atelier", styles::model_name()));
    lines.push(Line::from(""));

    match reply {
        ModelReply::Plain(text) => {
            for text_line in text.as_str().lines().filter(|l| !l.is_empty()) {
                lines.push(Line::from(vec![
                    Span::raw("    "),
                    Span::styled(
                        text_line.to_string(),
                        Style::default().fg(colors::TEXT_SECONDARY),
                    ),
                ]));
            }
        }
        ModelReply::GeneratedImage { caption, image } => {
            lines.push(Line::from(vec![
                Span::raw("    "),
                Span::styled(
                    format!(
                        "▦ Generated image ({}, {})",
                        image.mime(),
                        format_bytes(image.byte_len())
                    ),
                    Style::default()
                        .fg(colors::PEACH)
                        .add_modifier(Modifier::BOLD),
                ),
            ]));
            lines.push(Line::from(vec![
                Span::raw("    "),
                Span::styled(
                    caption.as_str().to_string(),
                    Style::default().fg(colors::TEXT_SECONDARY),
                ),
            ]));
            lines.push(Line::from(vec![
                Span::raw("    "),
                Span::styled(
                    "Use :save [path] to write it to disk.",
                    Style::default().fg(colors::TEXT_MUTED),
                ),
            ]));
        }
        ModelReply::ResearchReport { text, citations } => {
            lines.extend(render_report(text.as_str(), citations));
        }
    }
}

fn format_bytes(len: usize) -> String {
    if len >= 1024 * 1024 {
        format!("{:.1} MiB", len as f64 / (1024.0 * 1024.0))
    } else if len >= 1024 {
        format!("{:.1} KiB", len as f64 / 1024.0)
    } else {
        format!("{len} B")
    }
}

#[cfg(test)]
mod tests {
    use super::{format_bytes, render_pending, render_transcript};
    use atelier_engine::Conversation;
    use atelier_types::{
        GeneratedImage, ImageAttachment, ModelReply, NonEmptyString, ResponseMode, Turn,
    };

    fn flat(lines: &[ratatui::text::Line<'_>]) -> String {
        lines
            .iter()
            .flat_map(|line| line.spans.iter())
            .map(|span| span.content.as_ref())
            .collect()
    }

    #[test]
    fn transcript_shows_both_speakers() {
        let mut conversation = Conversation::new();
        conversation.append(Turn::user("hello there".to_string(), None));
        conversation.append(Turn::model(ModelReply::Plain(
            NonEmptyString::new("hi!").unwrap(),
        )));

        let text = flat(&render_transcript(&conversation));
        assert!(text.contains("You"));
        assert!(text.contains("hello there"));
        assert!(text.contains("Atelier"));
        assert!(text.contains("hi!"));
    }

    #[test]
    fn attachment_chip_appears_on_user_turn() {
        let mut conversation = Conversation::new();
        let attachment = ImageAttachment::from_bytes("photo.png", &[0u8; 2048]).unwrap();
        conversation.append(Turn::user(String::new(), Some(attachment)));

        let text = flat(&render_transcript(&conversation));
        assert!(text.contains("photo.png"));
        assert!(text.contains("image/png"));
        assert!(text.contains("2.0 KiB"));
    }

    #[test]
    fn generated_image_renders_placeholder_and_save_hint() {
        let mut conversation = Conversation::new();
        conversation.append(Turn::model(ModelReply::GeneratedImage {
            caption: NonEmptyString::new("Generated image for: \"a cat\"").unwrap(),
            image: GeneratedImage::new("aGVsbG8=".to_string(), "image/png".to_string()),
        }));

        let text = flat(&render_transcript(&conversation));
        assert!(text.contains("Generated image"));
        assert!(text.contains("a cat"));
        assert!(text.contains(":save"));
    }

    #[test]
    fn pending_block_names_the_in_flight_mode() {
        let text = flat(&render_pending(ResponseMode::Research, 0));
        assert!(text.contains("Researching..."));
        let text = flat(&render_pending(ResponseMode::ImageGeneration, 3));
        assert!(text.contains("Painting..."));
    }

    #[test]
    fn byte_formatting() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }
}
