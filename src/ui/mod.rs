pub mod widgets;

use crate::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

pub fn render(frame: &mut Frame, app: &App) {
    // Width available for text is total width - 2 (for borders)
    let available_width = frame.area().width.saturating_sub(2).max(1) as usize;

    let input_lines: usize = if app.input.current_text().is_empty() {
        1
    } else {
        // Approximate wrapping per logical line; pasted posts often contain newlines
        app.input
            .current_text()
            .split('\n')
            .map(|line| line.chars().count().div_ceil(available_width).max(1))
            .sum()
    };

    // Clamp lines: Min 1, Max a third of the screen
    let max_lines = (frame.area().height as usize / 3).saturating_sub(2).max(1);
    let actual_lines = input_lines.clamp(1, max_lines);

    #[allow(clippy::cast_possible_truncation)]
    let input_height = (actual_lines + 2) as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Title + tagline
            Constraint::Length(input_height), // Post input (dynamic height)
            Constraint::Length(1),            // Trigger / status line
            Constraint::Min(0),               // Reply cards
            Constraint::Length(1),            // Bottom keymap bar
        ])
        .split(frame.area());

    widgets::render_header(frame, chunks[0]);
    widgets::render_input_field(frame, app, chunks[1]);
    widgets::render_status_bar(frame, app, chunks[2]);
    widgets::render_reply_cards(frame, app, chunks[3]);
    widgets::render_bottom_bar(frame, app, chunks[4]);

    if app.show_help {
        widgets::render_help_window(frame, frame.area());
    }
}
