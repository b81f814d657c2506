use crate::app::App;
use crate::constants::{REGION_GUTTER_WIDTH, TOAST_WIDTH, TOOLBAR_HEIGHT};
use crate::controller::ToolbarButton;
use crate::models::InputMode;
use crate::rich_text::{GROUPS, RichTextToolbar, SEPARATOR};
use crate::session::SessionState;
use crate::toast::Severity;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

/// Viewport row (relative to the first content line) where the rich text
/// toolbar floats: just above the active region, or just below it when the
/// region starts at the top of the viewport. `None` when neither row is
/// free on screen.
pub fn rich_toolbar_row(app: &App, viewport_height: usize) -> Option<usize> {
    let toolbar = app.session.rich_toolbar()?;
    let span = app.span_of(toolbar.region())?;
    let visible_end = app.scroll + viewport_height;
    if span.line_end <= app.scroll || span.line_start >= visible_end {
        return None;
    }
    if span.line_start > app.scroll {
        return Some(span.line_start - app.scroll - 1);
    }
    (span.line_end < visible_end).then(|| span.line_end - app.scroll)
}

pub fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(TOOLBAR_HEIGHT), // Global toolbar
                Constraint::Min(0),                 // Page content
            ]
            .as_ref(),
        )
        .split(f.area());

    render_toolbar(f, app, chunks[0]);

    // PAGE CONTENT
    let content_area_height = chunks[1].height.saturating_sub(2) as usize;
    let start_index = app.scroll;
    let total_lines = app.rendered_content.len();
    let end_index = (start_index + content_area_height).min(total_lines);

    let viewport_content = if start_index < total_lines {
        app.rendered_content[start_index..end_index].to_vec()
    } else {
        Vec::new()
    };

    let status = if app.editor_enabled() && app.session.state() != SessionState::Viewing {
        app.session.status()
    } else {
        app.status_message.as_str()
    };
    let content = Paragraph::new(viewport_content).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("{} - [{}]", app.page_title, status)),
    );

    f.render_widget(Clear, chunks[1]);
    f.render_widget(content, chunks[1]);

    render_rich_toolbar(f, app, chunks[1], content_area_height);
    render_link_prompt(f, app, chunks[1]);
    render_toasts(f, app, chunks[1]);
}

fn render_toolbar(f: &mut Frame, app: &App, area: Rect) {
    let Some(controller) = &app.controller else {
        let title = Paragraph::new(Line::from(vec![
            Span::styled(
                app.page_title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled("  (read-only)", Style::default().fg(Color::DarkGray)),
        ]))
        .block(Block::default().borders(Borders::ALL).title(app.page_url.as_str()));
        f.render_widget(title, area);
        return;
    };

    let mut spans = Vec::new();
    for (i, slot) in controller.layout(&app.session).iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" "));
        }
        let style = match slot.button {
            ToolbarButton::Save => Style::default().fg(Color::Black).bg(Color::Green),
            ToolbarButton::Cancel => Style::default().fg(Color::White).bg(Color::Red),
            ToolbarButton::EditMode => Style::default().fg(Color::Black).bg(Color::Cyan),
            _ => Style::default().fg(Color::Gray),
        };
        spans.push(Span::styled(format!("[ {} ]", slot.button.label()), style));
    }
    if controller.is_visible() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            app.session.status().to_string(),
            Style::default().fg(Color::Yellow),
        ));
    }

    let block = if controller.is_visible() {
        Block::default().borders(Borders::ALL).title(" Inline Editor ")
    } else {
        Block::default().borders(Borders::ALL)
    };
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_rich_toolbar(f: &mut Frame, app: &App, area: Rect, viewport_height: usize) {
    let Some(row) = rich_toolbar_row(app, viewport_height) else {
        return;
    };

    let mut spans = Vec::new();
    for (i, group) in GROUPS.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(SEPARATOR, Style::default().fg(Color::DarkGray)));
        }
        for command in group.iter() {
            spans.push(Span::styled(
                format!(" {} ", command.label()),
                Style::default().fg(Color::White).bg(Color::DarkGray),
            ));
        }
    }

    let width = RichTextToolbar::width() as u16;
    let x = area.x + 1 + REGION_GUTTER_WIDTH as u16;
    let toolbar_area = Rect {
        x,
        y: area.y + 1 + row as u16,
        width: width.min(area.right().saturating_sub(x + 1)),
        height: 1,
    };
    f.render_widget(Clear, toolbar_area);
    f.render_widget(Paragraph::new(Line::from(spans)), toolbar_area);
}

fn render_link_prompt(f: &mut Frame, app: &App, area: Rect) {
    let InputMode::LinkPrompt(buffer) = &app.input_mode else {
        return;
    };

    let width = (area.width * 2 / 3).max(20).min(area.width);
    let popup_area = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + area.height.saturating_sub(3) / 2,
        width,
        height: 3.min(area.height),
    };

    f.render_widget(Clear, popup_area);
    let prompt = Paragraph::new(format!("{buffer}_"))
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Enter URL ")
                .title_bottom(" Enter to apply, Esc to cancel "),
        );
    f.render_widget(prompt, popup_area);
}

fn render_toasts(f: &mut Frame, app: &App, area: Rect) {
    let width = TOAST_WIDTH.min(area.width);
    let mut bottom = area.bottom().saturating_sub(1);

    // Newest toast sits at the bottom of the stack.
    for toast in app.session.toasts().visible().collect::<Vec<_>>().into_iter().rev() {
        if bottom < area.y + 3 {
            break;
        }
        let color = match toast.severity {
            Severity::Success => Color::Green,
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
            Severity::Info => Color::Cyan,
        };
        let toast_area = Rect {
            x: area.right().saturating_sub(width + 1),
            y: bottom - 3,
            width,
            height: 3,
        };
        f.render_widget(Clear, toast_area);
        f.render_widget(
            Paragraph::new(toast.text.as_str())
                .style(Style::default().fg(color))
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(color)),
                ),
            toast_area,
        );
        bottom -= 3;
    }
}
