use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

use atelier_tui::InputMode;

use crate::app::App;

/// Handle terminal events.
/// Returns true if the app should quit.
pub async fn handle_events(app: &mut App) -> Result<bool> {
    // Poll for events with a timeout
    if event::poll(Duration::from_millis(100))?
        && let Event::Key(key) = event::read()?
    {
        // Only handle key press events (not release) - important for Windows
        if key.kind != KeyEventKind::Press {
            return Ok(app.should_quit());
        }

        // Handle Ctrl+C globally
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(true);
        }

        match app.input_mode() {
            InputMode::Normal => handle_normal_mode(app, key),
            InputMode::Insert => handle_insert_mode(app, key),
            InputMode::Command => handle_command_mode(app, key),
        }
    }

    Ok(app.should_quit())
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => {
            app.request_quit();
        }
        // Enter insert mode
        KeyCode::Char('i') => {
            app.enter_insert_mode();
            app.clear_notice();
        }
        // Enter insert mode at end
        KeyCode::Char('a') => {
            app.enter_insert_mode_at_end();
            app.clear_notice();
        }
        // Enter insert mode with a fresh draft
        KeyCode::Char('o') => {
            app.enter_insert_mode_with_clear();
            app.clear_notice();
        }
        // Enter command mode
        KeyCode::Char(':') => {
            app.enter_command_mode();
        }
        // Cycle response mode
        KeyCode::Tab => {
            app.cycle_mode();
        }
        // Scroll up
        KeyCode::Char('k') | KeyCode::Up => {
            app.scroll_up();
        }
        // Scroll down
        KeyCode::Char('j') => {
            app.scroll_down();
        }
        // Jump to bottom
        KeyCode::Down => {
            app.scroll_to_bottom();
        }
        // Go to top
        KeyCode::Char('g') => {
            app.scroll_to_top();
        }
        // Go to bottom
        KeyCode::Char('G') => {
            app.scroll_to_bottom();
        }
        _ => {}
    }
}

fn handle_insert_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Exit insert mode
        KeyCode::Esc => {
            app.enter_normal_mode();
        }
        // Submit the staged input
        KeyCode::Enter => {
            app.submit();
        }
        // Cycle response mode
        KeyCode::Tab => {
            app.cycle_mode();
        }
        _ => {
            let draft = app.composer_mut().draft_mut();

            match key.code {
                // Delete character
                KeyCode::Backspace => {
                    draft.delete_char();
                }
                // Delete character forward
                KeyCode::Delete => {
                    draft.delete_char_forward();
                }
                // Move cursor left
                KeyCode::Left => {
                    draft.move_cursor_left();
                }
                // Move cursor right
                KeyCode::Right => {
                    draft.move_cursor_right();
                }
                // Move to start
                KeyCode::Home => {
                    draft.move_cursor_home();
                }
                // Move to end
                KeyCode::End => {
                    draft.move_cursor_end();
                }
                // Clear line
                KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    draft.clear();
                }
                // Delete word backwards
                KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    draft.delete_word_backwards();
                }
                // Insert character
                KeyCode::Char(c) => {
                    draft.enter_char(c);
                }
                _ => {}
            }
        }
    }
}

fn handle_command_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Exit command mode
        KeyCode::Esc => {
            app.enter_normal_mode();
        }
        // Execute command
        KeyCode::Enter => {
            let command = app.take_command();
            app.process_command(&command);
        }
        // Delete character
        KeyCode::Backspace => {
            app.command_backspace();
        }
        // Insert character
        KeyCode::Char(c) => {
            app.command_push(c);
        }
        _ => {}
    }
}
