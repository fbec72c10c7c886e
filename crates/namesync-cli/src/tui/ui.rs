//! UI rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use namesync_core::LiveStatus;

use super::app::{App, InputMode};
use crate::output::format_created;

/// Main UI rendering function
pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Length(4), // add field + error
            Constraint::Length(1), // counters
            Constraint::Min(3),    // list
            Constraint::Length(1), // status bar
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);
    draw_add_field(frame, app, chunks[1]);
    draw_counters(frame, app, chunks[2]);
    draw_list(frame, app, chunks[3]);
    draw_status_bar(frame, app, chunks[4]);

    if app.show_help {
        draw_help_overlay(frame);
    }
}

/// Greeting on the left, live indicator on the right
fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let greeting = app
        .session
        .state()
        .greeting()
        .unwrap_or("Press g to fetch the greeting");

    let (icon, label, style) = match app.live_status() {
        LiveStatus::Connected => ("●", "live", Style::default().fg(Color::Green)),
        LiveStatus::Connecting => ("↻", "connecting", Style::default().fg(Color::Yellow)),
        LiveStatus::Closed => ("○", "offline", Style::default().add_modifier(Modifier::DIM)),
    };
    let indicator = format!("{} {}", icon, label);

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(indicator.chars().count() as u16 + 1),
        ])
        .split(area);

    frame.render_widget(
        Paragraph::new(Span::styled(
            greeting,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        halves[0],
    );
    frame.render_widget(Paragraph::new(Span::styled(indicator, style)), halves[1]);
}

fn draw_add_field(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.session.state();
    let is_active = app.input_mode == InputMode::Add;

    let border_style = if is_active {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let block = Block::default()
        .title(" Add name (a) ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let mut lines = vec![Line::from(state.pending_submission())];
    if let Some(error) = state.submit_error() {
        lines.push(Line::from(Span::styled(
            error,
            Style::default().fg(Color::Red),
        )));
    }

    let inner = block.inner(area);
    frame.render_widget(Paragraph::new(lines).block(block), area);

    if is_active {
        frame.set_cursor_position((inner.x + app.cursor as u16, inner.y));
    }
}

fn draw_counters(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.session.state();
    let line = Line::from(vec![
        Span::raw(format!(" Total: {}", state.cache().len())),
        Span::raw("   "),
        Span::raw(format!("Sent: {}", state.success_count())),
        Span::raw("   "),
        Span::styled(
            format!("Sort: {} (s)", state.sort_mode().label()),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_list(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.session.state();
    let records = app.records();

    let items: Vec<ListItem> = records
        .iter()
        .map(|record| {
            let date = Span::styled(
                format!("{}  ", format_created(record)),
                Style::default().add_modifier(Modifier::DIM),
            );

            if state.is_editing(&record.id) {
                let mut lines = vec![Line::from(vec![
                    date,
                    Span::styled(
                        state.draft().to_string(),
                        Style::default().fg(Color::Yellow),
                    ),
                    Span::styled("  (editing)", Style::default().add_modifier(Modifier::DIM)),
                ])];
                if let Some(error) = state.edit_error() {
                    lines.push(Line::from(Span::styled(
                        format!("  {}", error),
                        Style::default().fg(Color::Red),
                    )));
                }
                ListItem::new(lines)
            } else {
                ListItem::new(Line::from(vec![date, Span::raw(record.name.clone())]))
            }
        })
        .collect();

    let is_active = app.input_mode != InputMode::Add;
    let border_style = if is_active {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let block = Block::default()
        .title(format!(" Names ({}) ", records.len()))
        .borders(Borders::ALL)
        .border_style(border_style);

    let empty = records.is_empty();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut list_state = ListState::default();
    if !empty {
        list_state.select(Some(app.selected));
    }

    frame.render_stateful_widget(list, area, &mut list_state);
}

/// Draw the status bar at the bottom
///
/// In edit mode it doubles as the edit prompt so the cursor has a fixed home.
fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if app.input_mode == InputMode::Edit {
        let prefix = "rename: ";
        let line = Line::from(vec![
            Span::styled(prefix, Style::default().fg(Color::Yellow)),
            Span::raw(app.current_input()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        frame.set_cursor_position((area.x + prefix.len() as u16 + app.cursor as u16, area.y));
        return;
    }

    let content = if let Some(msg) = &app.status_message {
        msg.clone()
    } else if let Some(reply) = app.session.state().reply() {
        reply.to_string()
    } else {
        match app.input_mode {
            InputMode::Add => "Enter:send  Esc:leave".to_string(),
            _ => "a:add  e:edit  r:refresh  D:delete all  s:sort  ?:help  q:quit".to_string(),
        }
    };

    let paragraph = Paragraph::new(content).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Draw help overlay
fn draw_help_overlay(frame: &mut Frame) {
    let area = frame.area();

    // Calculate centered popup area
    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = 20.min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  j/k, ↑/↓    Move up/down"),
        Line::from(""),
        Line::from("Commands:"),
        Line::from("  a           Add a name"),
        Line::from("  e, Enter    Edit selected name"),
        Line::from("  r           Refresh list"),
        Line::from("  D           Delete all names"),
        Line::from("  g           Fetch greeting"),
        Line::from("  s           Cycle sort mode"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from("In a field: Enter sends, Esc leaves"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));

    let paragraph = Paragraph::new(help_text).block(block);
    frame.render_widget(paragraph, popup_area);
}
