//! Color palette and shared styles for the Atelier TUI.

use ratatui::style::{Color, Modifier, Style};

pub mod colors {
    use super::Color;

    // Backgrounds
    pub const BG_DARK: Color = Color::Rgb(24, 24, 31);
    pub const BG_PANEL: Color = Color::Rgb(34, 34, 44);

    // Foregrounds
    pub const TEXT_PRIMARY: Color = Color::Rgb(222, 218, 196);
    pub const TEXT_SECONDARY: Color = Color::Rgb(198, 192, 158);
    pub const TEXT_MUTED: Color = Color::Rgb(118, 116, 108);

    // Brand
    pub const PRIMARY: Color = Color::Rgb(140, 130, 196);
    pub const PRIMARY_DIM: Color = Color::Rgb(120, 114, 158);

    // Accents
    pub const GREEN: Color = Color::Rgb(154, 188, 112);
    pub const YELLOW: Color = Color::Rgb(228, 196, 134);
    pub const RED: Color = Color::Rgb(246, 96, 100);
    pub const CYAN: Color = Color::Rgb(128, 178, 200);
    pub const PEACH: Color = Color::Rgb(250, 162, 106);

    // Per-mode accents
    pub const MODE_CHAT: Color = CYAN;
    pub const MODE_IMAGE: Color = PEACH;
    pub const MODE_RESEARCH: Color = GREEN;
}

pub mod styles {
    use super::{Color, Modifier, Style, colors};

    #[must_use]
    pub fn user_name() -> Style {
        Style::default()
            .fg(colors::CYAN)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn model_name() -> Style {
        Style::default()
            .fg(colors::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn mode_badge(accent: Color) -> Style {
        Style::default()
            .fg(colors::BG_DARK)
            .bg(accent)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_highlight() -> Style {
        Style::default()
            .fg(colors::YELLOW)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_hint() -> Style {
        Style::default().fg(colors::TEXT_MUTED)
    }

    #[must_use]
    pub fn notice() -> Style {
        Style::default().fg(colors::YELLOW)
    }
}

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Pick a spinner glyph for the current tick.
#[must_use]
pub fn spinner_frame(tick: usize) -> &'static str {
    SPINNER_FRAMES[tick % SPINNER_FRAMES.len()]
}

/// Accent color for a response mode, used by badges and spinners.
#[must_use]
pub fn mode_accent(mode: atelier_types::ResponseMode) -> Color {
    use atelier_types::ResponseMode;
    match mode {
        ResponseMode::Chat => colors::MODE_CHAT,
        ResponseMode::ImageGeneration => colors::MODE_IMAGE,
        ResponseMode::Research => colors::MODE_RESEARCH,
    }
}
