//! TUI rendering for Atelier.
//!
//! The binary crate owns application state and event handling; this
//! crate is rendering only. Each frame the binary builds a [`FrameState`]
//! view over its state and calls [`draw`].

pub mod report;
pub mod theme;
pub mod transcript;

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Padding, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
};
use unicode_width::UnicodeWidthStr;

use atelier_engine::Conversation;
use atelier_types::{ImageAttachment, ResponseMode};

use crate::theme::{colors, mode_accent, spinner_frame, styles};

/// Modal input state, vim-flavored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Insert,
    Command,
}

/// Scroll position for the transcript view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollState {
    /// Keep the newest content visible.
    #[default]
    AutoBottom,
    /// Manual offset from the top of the rendered transcript.
    Manual { offset_from_top: u16 },
}

impl ScrollState {
    #[must_use]
    pub fn offset_from_top(self, max: u16) -> u16 {
        match self {
            ScrollState::AutoBottom => max,
            ScrollState::Manual { offset_from_top } => offset_from_top.min(max),
        }
    }

    pub fn scroll_up(&mut self, max: u16) {
        let current = self.offset_from_top(max);
        *self = ScrollState::Manual {
            offset_from_top: current.saturating_sub(1),
        };
    }

    pub fn scroll_down(&mut self, max: u16) {
        let next = self.offset_from_top(max).saturating_add(1);
        *self = if next >= max {
            ScrollState::AutoBottom
        } else {
            ScrollState::Manual {
                offset_from_top: next,
            }
        };
    }

    pub fn scroll_to_top(&mut self) {
        *self = ScrollState::Manual { offset_from_top: 0 };
    }

    pub fn scroll_to_bottom(&mut self) {
        *self = ScrollState::AutoBottom;
    }
}

/// Read view over the application state for one frame.
///
/// `scroll_max` is written back by [`draw`] so the event handlers can
/// clamp scrolling to the rendered content height.
pub struct FrameState<'a> {
    pub conversation: &'a Conversation,
    pub mode: ResponseMode,
    pub in_flight: Option<ResponseMode>,
    pub input_mode: InputMode,
    pub draft_text: &'a str,
    pub draft_cursor: usize,
    pub command_text: &'a str,
    pub attachment: Option<&'a ImageAttachment>,
    pub notice: Option<&'a str>,
    pub model_name: &'a str,
    pub has_api_key: bool,
    pub tick: usize,
    pub scroll: ScrollState,
    pub scroll_max: u16,
}

/// Main draw function.
pub fn draw(frame: &mut Frame, state: &mut FrameState<'_>) {
    let bg = Block::default().style(Style::default().bg(colors::BG_DARK));
    frame.render_widget(bg, frame.area());

    let input_height = if state.attachment.is_some() { 6 } else { 5 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(input_height),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_transcript(frame, state, chunks[0]);
    draw_input(frame, state, chunks[1]);
    draw_status_bar(frame, state, chunks[2]);
}

fn draw_transcript(frame: &mut Frame, state: &mut FrameState<'_>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(colors::TEXT_MUTED))
        .padding(Padding::horizontal(1));

    if state.conversation.is_empty() && state.in_flight.is_none() {
        state.scroll_max = 0;
        frame.render_widget(welcome_screen(state).block(block), area);
        return;
    }

    let mut lines = transcript::render_transcript(state.conversation);
    if let Some(mode) = state.in_flight {
        lines.extend(transcript::render_pending(mode, state.tick));
    }

    let inner = block.inner(area);
    let total_lines = wrapped_line_count(&lines, inner.width);
    state.scroll_max = total_lines.saturating_sub(inner.height);
    let offset = state.scroll.offset_from_top(state.scroll_max);

    let transcript_widget = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    frame.render_widget(transcript_widget, area);

    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("↑"))
        .end_symbol(Some("↓"))
        .track_symbol(Some("│"))
        .thumb_symbol("█")
        .style(Style::default().fg(colors::TEXT_MUTED));
    let mut scrollbar_state = ScrollbarState::new(total_lines as usize).position(offset as usize);
    frame.render_stateful_widget(
        scrollbar,
        area.inner(Margin {
            vertical: 1,
            horizontal: 0,
        }),
        &mut scrollbar_state,
    );
}

fn draw_input(frame: &mut Frame, state: &FrameState<'_>, area: Rect) {
    let accent = mode_accent(state.mode);
    let (mode_text, border_style, prompt_char) = match state.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().fg(colors::TEXT_MUTED), "│"),
        InputMode::Insert => (" INSERT ", Style::default().fg(colors::GREEN), "❯"),
        InputMode::Command => (" COMMAND ", Style::default().fg(colors::YELLOW), ":"),
    };

    let mut content: Vec<Line<'_>> = Vec::new();
    if let Some(attachment) = state.attachment {
        content.push(Line::from(vec![
            Span::styled(" 🖼 ", Style::default().fg(colors::PEACH)),
            Span::styled(
                attachment.file_name().to_string(),
                Style::default().fg(colors::PEACH),
            ),
            Span::styled(
                "  (:detach to remove)",
                Style::default().fg(colors::TEXT_MUTED),
            ),
        ]));
    }
    content.push(match state.input_mode {
        InputMode::Command => Line::from(vec![
            Span::styled(" : ", Style::default().fg(colors::YELLOW)),
            Span::styled(
                state.command_text.to_string(),
                Style::default().fg(colors::TEXT_PRIMARY),
            ),
        ]),
        InputMode::Normal | InputMode::Insert => Line::from(vec![
            Span::styled(format!(" {prompt_char} "), Style::default().fg(accent)),
            Span::styled(
                state.draft_text.to_string(),
                Style::default().fg(colors::TEXT_PRIMARY),
            ),
        ]),
    });

    let hints = match state.input_mode {
        InputMode::Normal => vec![
            Span::styled("i", styles::key_highlight()),
            Span::styled(" insert  ", styles::key_hint()),
            Span::styled("Tab", styles::key_highlight()),
            Span::styled(" mode  ", styles::key_hint()),
            Span::styled(":", styles::key_highlight()),
            Span::styled(" command  ", styles::key_hint()),
            Span::styled("q", styles::key_highlight()),
            Span::styled(" quit ", styles::key_hint()),
        ],
        InputMode::Insert => vec![
            Span::styled("Enter", styles::key_highlight()),
            Span::styled(" send  ", styles::key_hint()),
            Span::styled("Esc", styles::key_highlight()),
            Span::styled(" normal ", styles::key_hint()),
        ],
        InputMode::Command => vec![
            Span::styled("Enter", styles::key_highlight()),
            Span::styled(" run  ", styles::key_hint()),
            Span::styled("Esc", styles::key_highlight()),
            Span::styled(" cancel ", styles::key_hint()),
        ],
    };

    let title = Line::from(vec![
        Span::styled(mode_text, Style::default().fg(colors::TEXT_PRIMARY)),
        Span::styled(
            format!(" {} ", state.mode.display_name()),
            styles::mode_badge(accent),
        ),
    ]);

    let input = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title(title)
            .title_bottom(Line::from(hints).alignment(Alignment::Right))
            .padding(Padding::vertical(1)),
    );
    frame.render_widget(input, area);

    // Cursor on the editable line.
    let text_row = area.y + 2 + u16::from(state.attachment.is_some());
    match state.input_mode {
        InputMode::Insert => {
            let before: String = state
                .draft_text
                .chars()
                .take(state.draft_cursor)
                .collect();
            frame.set_cursor_position((area.x + 4 + before.width() as u16, text_row));
        }
        InputMode::Command => {
            frame.set_cursor_position((
                area.x + 4 + state.command_text.width() as u16,
                text_row,
            ));
        }
        InputMode::Normal => {}
    }
}

fn draw_status_bar(frame: &mut Frame, state: &FrameState<'_>, area: Rect) {
    let (status_text, status_style) = if let Some(notice) = state.notice {
        (notice.to_string(), styles::notice())
    } else if let Some(mode) = state.in_flight {
        (
            format!(
                "{} {} request in flight...",
                spinner_frame(state.tick),
                mode.display_name()
            ),
            Style::default().fg(mode_accent(mode)),
        )
    } else if state.has_api_key {
        (
            format!("● {}", state.model_name),
            Style::default().fg(colors::GREEN),
        )
    } else {
        (
            "○ No API key │ Set GEMINI_API_KEY".to_string(),
            Style::default().fg(colors::RED),
        )
    };

    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(status_text, status_style),
    ]));

    let mode_str = format!(" {} ", state.mode.display_name());
    let mode_width = mode_str.len() as u16 + 1;
    let status_area = Rect {
        width: area.width.saturating_sub(mode_width),
        ..area
    };
    let mode_area = Rect {
        x: area.x + area.width.saturating_sub(mode_width),
        width: mode_width,
        ..area
    };

    frame.render_widget(status, status_area);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            mode_str,
            styles::mode_badge(mode_accent(state.mode)),
        )))
        .alignment(Alignment::Right),
        mode_area,
    );
}

fn welcome_screen(state: &FrameState<'_>) -> Paragraph<'static> {
    let mut lines = vec![
        Line::from(""),
        Line::from(vec![Span::styled(
            "  ╭──────────────────────────────────────╮",
            Style::default().fg(colors::PRIMARY_DIM),
        )]),
        Line::from(vec![
            Span::styled("  │", Style::default().fg(colors::PRIMARY_DIM)),
            Span::styled(
                "          ✦ Atelier ✦                 ",
                Style::default()
                    .fg(colors::PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("│", Style::default().fg(colors::PRIMARY_DIM)),
        ]),
        Line::from(vec![
            Span::styled("  │", Style::default().fg(colors::PRIMARY_DIM)),
            Span::styled(
                "   Chat · Image studio · Research     ",
                Style::default().fg(colors::TEXT_SECONDARY),
            ),
            Span::styled("│", Style::default().fg(colors::PRIMARY_DIM)),
        ]),
        Line::from(vec![Span::styled(
            "  ╰──────────────────────────────────────╯",
            Style::default().fg(colors::PRIMARY_DIM),
        )]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  Quick start:",
            Style::default()
                .fg(colors::TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        hint_line("i", "Enter insert mode and type a prompt"),
        hint_line("Enter", "Send the prompt"),
        hint_line("Tab", "Cycle Chat → Image → Research"),
        hint_line(":attach <path>", "Stage an image for a chat turn"),
        hint_line(":help", "List all commands"),
        hint_line("q", "Quit"),
        Line::from(""),
    ];

    if state.has_api_key {
        lines.push(Line::from(vec![
            Span::styled("  ● ", Style::default().fg(colors::GREEN)),
            Span::styled(
                state.model_name.to_string(),
                Style::default().fg(colors::GREEN),
            ),
            Span::styled(" - Ready", Style::default().fg(colors::TEXT_MUTED)),
        ]));
    } else {
        lines.push(Line::from(vec![
            Span::styled("  ○ ", Style::default().fg(colors::TEXT_MUTED)),
            Span::styled("No API key - set ", Style::default().fg(colors::TEXT_MUTED)),
            Span::styled("GEMINI_API_KEY", Style::default().fg(colors::PEACH)),
        ]));
    }

    Paragraph::new(lines).alignment(Alignment::Left)
}

fn hint_line(key: &str, description: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("    {key}"),
            Style::default()
                .fg(colors::GREEN)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {description}"),
            Style::default().fg(colors::TEXT_SECONDARY),
        ),
    ])
}

fn wrapped_line_count(lines: &[Line<'_>], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let mut total: u16 = 0;
    for line in lines {
        let line_width = line.width();
        let rows = if line_width == 0 {
            1
        } else {
            (line_width - 1) / width + 1
        };
        total = total.saturating_add(rows as u16);
    }
    total
}
