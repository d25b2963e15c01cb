//! Terminal UI using ratatui

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::app::{App, AppState, PageView};
use crate::links::LinkDisposition;

/// Draw the main UI
pub fn draw_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Chapter header
            Constraint::Min(10),   // Text and links
            Constraint::Length(3), // Help bar
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);

    match app.state {
        AppState::Loading => draw_loading(f, app, chunks[1]),
        AppState::Error => draw_error(f, app, chunks[1]),
        _ => draw_reading(f, app, chunks[1]),
    }

    draw_help_bar(f, app, chunks[2]);

    if app.state == AppState::PickingChapter {
        draw_picker(f, app, f.area());
    } else if app.overlay.is_visible() {
        draw_overlay(f, app, f.area());
    }
}

/// Panel the overlay occupies; clicks outside it close the overlay
pub fn overlay_rect(area: Rect) -> Rect {
    centered_rect(80, 70, area)
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let title = app
        .chapter
        .as_ref()
        .map(|chapter| chapter.view.title.as_str())
        .unwrap_or("Ada or Ardor");

    let position = if app.chapters.is_empty() {
        String::new()
    } else {
        format!(" {}/{} ", app.selected_chapter + 1, app.chapters.len())
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            title,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(&app.status_message, Style::default().fg(Color::Gray)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                " Ada Online ",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ))
            .title_bottom(Line::from(position).right_aligned())
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn draw_reading(f: &mut Frame, app: &App, area: Rect) {
    let Some(chapter) = app.chapter.as_ref() else {
        let paragraph = Paragraph::new("Press c to choose a chapter")
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::ALL).title(" Text "));
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    let focused = !app.overlay.is_visible();
    let title = format!(" Text [{}] ", chapter.id);
    draw_page_text(f, &chapter.view, &title, chunks[0], focused);
    draw_links(f, &chapter.view, chunks[1], focused);
}

fn draw_page_text(f: &mut Frame, view: &PageView, title: &str, area: Rect, focused: bool) {
    let border = if focused { Color::Cyan } else { Color::DarkGray };
    let paragraph = Paragraph::new(view.text.as_str())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(border)),
        )
        .wrap(Wrap { trim: false })
        .scroll((view.scroll, 0));

    f.render_widget(paragraph, area);
}

fn draw_links(f: &mut Frame, view: &PageView, area: Rect, focused: bool) {
    let items: Vec<ListItem> = view
        .links
        .iter()
        .map(|link| {
            let (tag, color) = match link.disposition {
                LinkDisposition::Annotation { .. } => ("note", Color::Yellow),
                LinkDisposition::Chapter { .. } => ("chap", Color::Green),
                LinkDisposition::SourceDocument { .. } => ("src ", Color::Blue),
                LinkDisposition::External { .. } => ("web ", Color::Magenta),
            };
            ListItem::new(Line::from(vec![
                Span::styled(tag, Style::default().fg(color)),
                Span::raw(" "),
                Span::raw(truncate(link.label(), 60)),
            ]))
        })
        .collect();

    let border = if focused { Color::Cyan } else { Color::DarkGray };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Links ({}) ", view.links.len()))
                .border_style(Style::default().fg(border)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Rgb(35, 35, 45))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if !view.links.is_empty() {
        state.select(Some(view.selected_link));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_overlay(f: &mut Frame, app: &App, area: Rect) {
    let Some(view) = app.overlay_view.as_ref() else {
        return;
    };

    // dim everything behind the panel
    f.buffer_mut()
        .set_style(area, Style::default().fg(Color::DarkGray));

    let panel = overlay_rect(area);
    f.render_widget(Clear, panel);

    let title = if app.overlay.state().shows_back() {
        format!(" < {} (Esc: back) ", view.title)
    } else {
        format!(" {} ", view.title)
    };

    let link_rows = view.links.len().min(5) as u16;
    let constraints = if link_rows == 0 {
        vec![Constraint::Min(3)]
    } else {
        vec![Constraint::Min(3), Constraint::Length(link_rows + 2)]
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(panel);

    draw_page_text(f, view, &title, chunks[0], true);
    if link_rows > 0 {
        draw_links(f, view, chunks[1], true);
    }
}

fn draw_picker(f: &mut Frame, app: &App, area: Rect) {
    let panel = centered_rect(50, 80, area);
    f.render_widget(Clear, panel);

    let items: Vec<ListItem> = app
        .chapters
        .iter()
        .map(|chapter| {
            let marker = if chapter.notes_url.is_some() { "* " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Yellow)),
                Span::raw(chapter.title.as_str()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(
                    " Chapters ",
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ))
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Rgb(35, 35, 45))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.picker_index));
    f.render_stateful_widget(list, panel, &mut state);
}

fn draw_loading(f: &mut Frame, app: &App, area: Rect) {
    let paragraph = Paragraph::new(app.status_message.as_str())
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Status ")
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, area);
}

/// Draw error message
fn draw_error(f: &mut Frame, app: &App, area: Rect) {
    let error_text = app.error_message.as_deref().unwrap_or("Unknown error");

    let paragraph = Paragraph::new(format!(
        "Error: {}\n\nPress any key to continue...",
        error_text
    ))
    .style(Style::default().fg(Color::Red))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                " Error ",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ))
            .border_style(Style::default().fg(Color::Red)),
    )
    .wrap(Wrap { trim: true });

    f.render_widget(paragraph, area);
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let help_text = match app.state {
        AppState::PickingChapter => "j/k: Move │ Enter: Open │ Esc: Cancel │ Ctrl+Q: Quit",
        AppState::Error => "Press any key to continue │ Ctrl+Q: Quit",
        AppState::Loading => "Please wait... │ Ctrl+Q: Quit",
        AppState::Reading if app.overlay.is_visible() => {
            "Tab/j/k: Links │ Enter: Follow │ PgUp/PgDn: Scroll │ Esc: Back │ x: Close │ Ctrl+Q: Quit"
        }
        AppState::Reading => {
            "Tab/j/k: Links │ Enter: Follow │ r: Preview │ PgUp/PgDn: Scroll │ c: Chapters │ n/p: Next/Prev │ Ctrl+Q: Quit"
        }
    };

    let paragraph = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Cyan))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );

    f.render_widget(paragraph, area);
}

/// Truncate string to max length
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
