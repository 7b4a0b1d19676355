use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::models::{Category, ReplyResult, SessionStatus};

pub const fn category_color(category: Category) -> Color {
    match category {
        Category::Conversational => Color::Magenta,
        Category::Curious => Color::Green,
        Category::Provocative => Color::Yellow,
    }
}

pub fn render_header(frame: &mut Frame, area: Rect) {
    let header = vec![
        Line::from(Span::styled(
            "REPLY ROULETTE",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Roll the dice on witty replies • Conversation • Curiosity • Chaos",
            Style::default().fg(Color::LightMagenta),
        )),
    ];

    let paragraph = Paragraph::new(header).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

pub fn render_input_field(frame: &mut Frame, app: &App, area: Rect) {
    let text = app.input.current_text();
    let (input_text, input_style) = if text.is_empty() {
        (
            "Paste any tweet, post, or thread here...",
            Style::default().fg(Color::Gray),
        )
    } else {
        (
            text,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )
    };

    let input = Paragraph::new(input_text)
        .style(input_style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Paste your tweet or post ")
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(input, area);
}

/// Squashes newlines and indentation so an error body fits the one-row status line
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trigger state on the left, model on the right
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (message, color) = if let Some(notice) = &app.notice {
        (format!("Copy failed: {}", single_line(notice)), Color::Red)
    } else {
        match app.board.status() {
            SessionStatus::InProgress => ("Generating...".to_string(), Color::Yellow),
            SessionStatus::Failed(reason) => {
                (format!("Roll failed: {}", single_line(&reason)), Color::Red)
            }
            _ if app.is_rolling() => ("Finishing previous roll...".to_string(), Color::DarkGray),
            _ if !app.has_api_key => (
                "No API key set (REPLY_ROULETTE_API_KEY or GOOGLE_API_KEY)".to_string(),
                Color::Yellow,
            ),
            _ if app.can_generate() => ("Roll the Dice [Enter]".to_string(), Color::Green),
            _ => ("Roll the Dice".to_string(), Color::DarkGray),
        }
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(u16::try_from(app.model.len()).unwrap_or(u16::MAX).saturating_add(1)),
        ])
        .split(area);

    let status = Paragraph::new(message)
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD));
    let model = Paragraph::new(app.model.as_str())
        .alignment(Alignment::Right)
        .style(Style::default().fg(Color::DarkGray));

    frame.render_widget(status, chunks[0]);
    frame.render_widget(model, chunks[1]);
}

pub fn render_reply_cards(frame: &mut Frame, app: &App, area: Rect) {
    let Some(session) = app.board.session() else {
        let hint = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "Paste a post above and press Enter to roll three replies.",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .alignment(Alignment::Center);
        frame.render_widget(hint, area);
        return;
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(area);

    for (index, category) in Category::ALL.into_iter().enumerate() {
        let reply = session.results.get(index);
        match reply {
            Some(reply) => render_reply_card(frame, app, index, reply, columns[index]),
            None => render_pending_card(
                frame,
                category,
                session.status.is_in_progress(),
                columns[index],
            ),
        }
    }
}

fn render_reply_card(frame: &mut Frame, app: &App, index: usize, reply: &ReplyResult, area: Rect) {
    let color = category_color(reply.category);
    let selected = app.selected == index;
    let copied = app.board.copied() == Some(index);

    let mut lines = vec![Line::from("")];
    lines.extend(reply.text.lines().map(|l| Line::from(l.to_string())));
    lines.push(Line::from(""));

    let (copy_label, copy_style) = if copied {
        (
            "Copied!".to_string(),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )
    } else {
        (
            format!("Copy Reply [F{}]", index + 1),
            Style::default().fg(Color::DarkGray),
        )
    };
    lines.push(Line::from(Span::styled(copy_label, copy_style)));

    let border_style = if selected {
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(color)
    };

    let card = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(if selected {
                    BorderType::Thick
                } else {
                    BorderType::Rounded
                })
                .border_style(border_style)
                .title(Span::styled(
                    format!(" {} ", reply.category.label()),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(card, area);
}

fn render_pending_card(frame: &mut Frame, category: Category, rolling: bool, area: Rect) {
    let text = if rolling { "Rolling..." } else { "Not rolled" };

    let card = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            text,
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(format!(" {} ", category.label())),
    );

    frame.render_widget(card, area);
}

pub fn render_bottom_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (text, style) = if app.exit_pending {
        (
            "Press Ctrl+C again to exit, Esc to cancel",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else {
        (
            "Enter: Roll | Tab: Select | Ctrl+Y: Copy | Ctrl+R: Reset | Ctrl+H: Help | Ctrl+C: Quit",
            Style::default().fg(Color::DarkGray),
        )
    };

    let bar = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(style);

    frame.render_widget(bar, area);
}

pub fn render_help_window(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        Line::from(Span::styled(
            "Reply Roulette - Keyboard Shortcuts",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("Post:", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  Typing/Paste  - Edit the post"),
        Line::from("  Alt+Enter     - New line"),
        Line::from("  Enter         - Roll the dice"),
        Line::from("  Ctrl+R        - Reset post and replies"),
        Line::from(""),
        Line::from(Span::styled("Replies:", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  Tab/Shift+Tab - Select reply"),
        Line::from("  Ctrl+Y        - Copy selected reply"),
        Line::from("  F1/F2/F3      - Copy reply 1/2/3"),
        Line::from(""),
        Line::from(Span::styled("General:", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  Ctrl+H        - Show/hide this help"),
        Line::from("  Ctrl+Q        - Quit application"),
        Line::from("  Ctrl+C        - Quit application"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Ctrl+H or Esc to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let help_paragraph = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    // Calculate centered position
    let popup_width = 50;
    let popup_height = 22;
    let x = (area.width.saturating_sub(popup_width)) / 2;
    let y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect {
        x: area.x + x,
        y: area.y + y,
        width: popup_width.min(area.width),
        height: popup_height.min(area.height),
    };

    frame.render_widget(Clear, popup_area);
    frame.render_widget(help_paragraph, popup_area);
}
