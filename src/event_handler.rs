use crate::app::App;
use crate::constants::{MOUSE_SCROLL_LINES, REGION_GUTTER_WIDTH, TOOLBAR_HEIGHT, UI_HEIGHT_OFFSET, UI_ROW_OFFSET};
use crate::controller::{Dispatch, ToolbarButton};
use crate::models::InputMode;
use crate::region::{RegionId, RegionSurface};
use crate::renderer::offset_at;
use crate::rich_text::{FormatCommand, RichTextToolbar};
use crate::session::SessionState;
use crate::ui::rich_toolbar_row;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use std::io::Result;

/// Returns `Ok(true)` when the user asked to quit.
pub fn handle_key_event(app: &mut App, key: KeyEvent, terminal_height: u16) -> Result<bool> {
    // Save/cancel shortcuts come first, whatever has focus.
    if let Some(controller) = app.controller.as_mut() {
        let dispatch = controller.handle_shortcut(&key, &mut app.session);
        if dispatch != Dispatch::Ignored {
            app.apply_dispatch(dispatch);
            return Ok(false);
        }
    }

    if let InputMode::LinkPrompt(_) = app.input_mode {
        handle_link_prompt(app, key);
        return Ok(false);
    }

    if app.session.state() == SessionState::Editing {
        handle_editing_mode(app, key, terminal_height);
        return Ok(false);
    }

    handle_normal_mode(app, key, terminal_height)
}

fn press(app: &mut App, button: ToolbarButton) {
    if let Some(controller) = app.controller.as_mut() {
        let dispatch = controller.press(button, &mut app.session);
        app.apply_dispatch(dispatch);
    }
}

fn viewport_height(terminal_height: u16) -> usize {
    terminal_height.saturating_sub(UI_HEIGHT_OFFSET) as usize
}

/// Scrolls just enough to bring `line_index` into view.
fn reveal_line(app: &mut App, line_index: usize, terminal_height: u16) {
    let viewport_height = viewport_height(terminal_height).max(1);
    if line_index < app.scroll {
        app.scroll = line_index;
    } else if line_index >= app.scroll + viewport_height {
        app.scroll = line_index - viewport_height + 1;
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent, terminal_height: u16) -> Result<bool> {
    match key.code {
        KeyCode::Char('q') => return Ok(true),
        KeyCode::F(2) => press(app, ToolbarButton::EditMode),
        KeyCode::Char('m') => press(app, ToolbarButton::Minimize),
        KeyCode::Char('M') => press(app, ToolbarButton::Restore),
        KeyCode::Char('r') if !app.session.is_edit_mode() => app.load_page(),

        // REGION SELECTION (Tab), only meaningful in edit mode
        KeyCode::Tab | KeyCode::BackTab if app.session.is_edit_mode() => {
            // only regions that were actually drawn can be selected
            let ids: Vec<usize> = app.region_spans.iter().map(|span| span.region.0).collect();
            let count = ids.len();
            if count > 0 {
                let current = ids.iter().position(|&id| id == app.selected_region);
                let next = match (key.code == KeyCode::Tab, current) {
                    (true, Some(pos)) => (pos + 1) % count,
                    (true, None) => 0,
                    (false, Some(pos)) if pos > 0 => pos - 1,
                    (false, _) => count - 1,
                };
                app.selected_region = ids[next];
                app.rerender();
                if let Some(line) = app
                    .span_of(RegionId(app.selected_region))
                    .map(|span| span.line_start)
                {
                    reveal_line(app, line, terminal_height);
                }
            }
        }
        KeyCode::Enter if app.session.is_edit_mode() => {
            app.click_region(RegionId(app.selected_region));
        }

        KeyCode::Down => app.scroll = app.scroll.saturating_add(1),
        KeyCode::Up => app.scroll = app.scroll.saturating_sub(1),
        KeyCode::PageDown => {
            app.scroll = app.scroll.saturating_add(viewport_height(terminal_height))
        }
        KeyCode::PageUp => {
            app.scroll = app.scroll.saturating_sub(viewport_height(terminal_height))
        }
        KeyCode::Home => app.scroll = 0,
        _ => {}
    }
    Ok(false)
}

fn handle_editing_mode(app: &mut App, key: KeyEvent, terminal_height: u16) {
    let Some(region) = app.session.active_region() else {
        return;
    };
    let extend = key.modifiers.contains(KeyModifiers::SHIFT);

    match key.code {
        KeyCode::F(2) => {
            press(app, ToolbarButton::EditMode);
            return;
        }

        // RICH TEXT COMMANDS (Alt + key)
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::ALT) => {
            if let Some(command) = FormatCommand::from_accelerator(c) {
                run_command(app, command);
            }
        }

        KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.session.surface_mut().select_all(region);
        }
        // COPY SELECTION
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(text) = app.session.surface().selected_text(region) {
                if let Some(clipboard) = app.clipboard.as_mut() {
                    if let Err(e) = clipboard.set_text(text) {
                        tracing::warn!(error = %e, "copy to clipboard failed");
                    }
                }
            }
        }
        // PASTE
        KeyCode::Char('v') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(text) = app.clipboard.as_mut().and_then(|c| c.get_text().ok()) {
                let text = text.replace("\r\n", "\n");
                app.session.surface_mut().insert_str(region, &text);
            }
        }
        KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => {}
        KeyCode::Char(c) => {
            app.session.surface_mut().insert_char(region, c);
        }
        KeyCode::Enter => {
            app.session.surface_mut().insert_char(region, '\n');
        }
        KeyCode::Backspace => {
            app.session.surface_mut().backspace(region);
        }
        KeyCode::Delete => {
            app.session.surface_mut().delete_forward(region);
        }
        KeyCode::Left => app.session.surface_mut().move_left(region, extend),
        KeyCode::Right => app.session.surface_mut().move_right(region, extend),
        KeyCode::Home => app.session.surface_mut().move_line_start(region, extend),
        KeyCode::End => app.session.surface_mut().move_line_end(region, extend),
        KeyCode::Up => app.scroll = app.scroll.saturating_sub(1),
        KeyCode::Down => app.scroll = app.scroll.saturating_add(1),
        _ => {}
    }

    app.rerender();
    keep_caret_visible(app, terminal_height);
}

fn keep_caret_visible(app: &mut App, terminal_height: u16) {
    let Some(region) = app.session.active_region() else {
        return;
    };
    let Some((caret, _)) = app.session.surface().caret(region) else {
        return;
    };
    let line = app
        .markup_lines
        .iter()
        .find(|l| caret >= l.byte_start && caret <= l.byte_end)
        .map(|l| l.line_index);
    if let Some(line) = line {
        reveal_line(app, line, terminal_height);
    }
}

/// Link creation asks for a URL first; everything else runs immediately.
fn run_command(app: &mut App, command: FormatCommand) {
    if app.session.rich_toolbar().is_none() {
        return;
    }
    if command.needs_value() {
        app.input_mode = InputMode::LinkPrompt(String::new());
    } else {
        app.session.apply_format(command, None);
    }
    app.rerender();
}

fn handle_link_prompt(app: &mut App, key: KeyEvent) {
    let InputMode::LinkPrompt(buffer) = &mut app.input_mode else {
        return;
    };
    match key.code {
        KeyCode::Enter => {
            let url = std::mem::take(buffer);
            app.input_mode = InputMode::Normal;
            app.session.apply_format(FormatCommand::CreateLink, Some(&url));
        }
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.session.apply_format(FormatCommand::CreateLink, None);
        }
        KeyCode::Char('v') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(text) = app.clipboard.as_mut().and_then(|c| c.get_text().ok()) {
                let sanitized = text.replace(['\n', '\r'], "");
                buffer.push_str(&sanitized);
            }
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => buffer.clear(),
        KeyCode::Char(c) => buffer.push(c),
        KeyCode::Backspace => {
            buffer.pop();
        }
        _ => {}
    }
    app.rerender();
}

pub fn handle_mouse_event(
    app: &mut App,
    mouse: MouseEvent,
    terminal_height: u16,
) -> Result<()> {
    match mouse.kind {
        MouseEventKind::ScrollDown => {
            app.scroll = app.scroll.saturating_add(MOUSE_SCROLL_LINES);
        }
        MouseEventKind::ScrollUp => {
            app.scroll = app.scroll.saturating_sub(MOUSE_SCROLL_LINES);
        }
        MouseEventKind::Down(MouseButton::Left) => {
            if matches!(app.input_mode, InputMode::LinkPrompt(_)) {
                return Ok(());
            }

            // 1. Global toolbar buttons (row inside the toolbar border)
            if mouse.row < TOOLBAR_HEIGHT {
                if mouse.row == 1 {
                    let x = (mouse.column as usize).saturating_sub(1);
                    let button = app
                        .controller
                        .as_ref()
                        .and_then(|c| c.button_at(&app.session, x));
                    if let Some(button) = button {
                        press(app, button);
                    }
                }
                return Ok(());
            }
            if mouse.row < UI_ROW_OFFSET {
                return Ok(());
            }

            let visual_line = (mouse.row - UI_ROW_OFFSET) as usize;
            let content_x = (mouse.column as usize).saturating_sub(1 + REGION_GUTTER_WIDTH);

            // 2. Rich text toolbar floating above the active content region
            if rich_toolbar_row(app, viewport_height(terminal_height)) == Some(visual_line) {
                if let Some(command) = RichTextToolbar::command_at(content_x) {
                    run_command(app, command);
                    return Ok(());
                }
            }

            // 3. Caret placement inside the region being edited
            let line_index = visual_line + app.scroll;
            if let Some(region) = app.session.active_region() {
                let hit = app
                    .markup_lines
                    .iter()
                    .find(|l| l.line_index == line_index)
                    .cloned();
                if let Some(line) = hit {
                    let markup = app.session.surface().markup(region).unwrap_or_default();
                    let offset = offset_at(&markup, &line, content_x);
                    let extend = mouse.modifiers.contains(KeyModifiers::SHIFT);
                    app.session.surface_mut().set_caret(region, offset, extend);
                    app.rerender();
                    return Ok(());
                }
            }

            // 4. Region click
            if app.session.is_edit_mode() {
                if let Some(region) = app.region_at_line(line_index) {
                    app.click_region(region);
                }
            }
        }
        _ => {}
    }
    Ok(())
}
