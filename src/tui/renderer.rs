use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph};

use crate::app::{App, Mode};
use crate::buffer::StreamKind;
use crate::tui::DownloadStatus;

/// TUI rendering handler
pub struct Renderer;

impl Renderer {
    /// Render application state
    pub fn render(frame: &mut Frame, app: &App) {
        let [help_area, url_area, settings_area, log_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        render_help(frame, app, help_area);
        render_url(frame, app, url_area);
        render_settings(frame, app, settings_area);
        render_log(frame, app, log_area);
        render_status(frame, app, status_area);

        if app.mode() == Mode::CookiePrompt {
            render_cookie_prompt(frame, app, log_area);
        }
    }
}

fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let text = match app.mode() {
        Mode::Normal => {
            " q quit · e edit url · Enter download · x cancel · o format · b cookies · f follow · j/k scroll"
        }
        Mode::EditUrl => " Esc done · Enter download",
        Mode::CookiePrompt => " paste cookies · Enter save & retry · Esc cancel",
    };
    let help = Paragraph::new(text).style(Style::new().fg(Color::DarkGray));
    frame.render_widget(help, area);
}

fn render_url(frame: &mut Frame, app: &App, area: Rect) {
    let width = area.width.max(3) - 3;
    let scroll = app.url().visual_scroll(width as usize);
    let block = Block::bordered().title("URL");
    let input = Paragraph::new(app.url().value())
        .scroll((0, scroll as u16))
        .block(block);
    frame.render_widget(input, area);

    if app.mode() == Mode::EditUrl {
        let cursor = (app.url().visual_cursor().max(scroll) - scroll) as u16;
        frame.set_cursor_position((area.x + cursor + 1, area.y + 1));
    }
}

fn render_settings(frame: &mut Frame, app: &App, area: Rect) {
    let settings = app.settings();
    let line = Line::from(vec![
        Span::styled(" Format: ", Style::new().fg(Color::DarkGray)),
        Span::raw(settings.format.label()),
        Span::styled("  Cookies: ", Style::new().fg(Color::DarkGray)),
        Span::raw(settings.cookie_source.label()),
        Span::styled("  Dir: ", Style::new().fg(Color::DarkGray)),
        Span::raw(settings.download_dir.to_string_lossy().into_owned()),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_log(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::bordered().title("Log");
    let inner_height = area.height.saturating_sub(2) as usize;

    let view = app.view();
    let lines: Vec<Line> = view
        .buffer()
        .get_range(view.scroll_offset(), inner_height)
        .into_iter()
        .map(|log_line| {
            let line = Line::from(log_line.spans().to_vec());
            match log_line.kind {
                StreamKind::Notice => line.style(Style::new().fg(Color::Cyan)),
                _ => line,
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let (text, color) = match app.view().status() {
        DownloadStatus::Idle => ("idle".to_string(), Color::DarkGray),
        DownloadStatus::Running => ("downloading".to_string(), Color::Yellow),
        DownloadStatus::Finished { exit_code: 0 } => ("completed".to_string(), Color::Green),
        DownloadStatus::Finished { exit_code } => {
            (format!("failed (exit code {exit_code})"), Color::Red)
        }
        DownloadStatus::Failed { reason } => (format!("failed: {reason}"), Color::Red),
        DownloadStatus::Canceled => ("canceled".to_string(), Color::DarkGray),
    };

    let mut spans = vec![
        Span::raw(" "),
        Span::styled(text, Style::new().fg(color)),
        Span::styled(
            if app.view().auto_scroll() {
                "  [follow]"
            } else {
                "  [scroll]"
            },
            Style::new().fg(Color::DarkGray),
        ),
    ];
    if let Some(notice) = app.update_notice() {
        spans.push(Span::styled(
            format!("  {notice}"),
            Style::new().fg(Color::Magenta),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_cookie_prompt(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect(area, 70, 7);
    frame.render_widget(Clear, popup);

    let entry = app.cookie_entry();
    let lines = vec![
        Line::raw("This video needs you to be signed in."),
        Line::raw("Paste the contents of a cookies.txt export below."),
        Line::raw(""),
        Line::from(Span::styled(
            format!(
                "captured: {} lines, {} chars",
                entry.lines().count(),
                entry.chars().count()
            ),
            Style::new().fg(Color::Yellow),
        )),
        Line::from(Span::styled(
            "Enter save & retry · Esc cancel",
            Style::new().fg(Color::DarkGray),
        )),
    ];

    let block = Block::bordered().title("Cookies required");
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

/// Fixed-height rect centered in `area`, `percent_x` wide
fn centered_rect(area: Rect, percent_x: u16, height: u16) -> Rect {
    let [_, vertical, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height),
        Constraint::Fill(1),
    ])
    .areas(area);
    let [_, horizontal, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(vertical);
    horizontal
}
