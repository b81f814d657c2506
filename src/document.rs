//! In-memory page surface.
//!
//! Holds the fetched page source plus the live markup of every editable
//! region. The renderer re-renders the page from here, substituting each
//! region's current markup, and the active region is edited in place through
//! a caret and an optional selection.

use crate::region::{Marker, RegionId, RegionSurface};
use crate::rich_text::{BlockFormat, FormatCommand};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

pub const EDITABLE_ATTR: &str = "data-editable";

#[derive(Clone, Debug)]
struct RegionState {
    label: String,
    markup: String,
    editable: bool,
    hover: bool,
    active: bool,
    caret: usize,
    anchor: Option<usize>,
}

pub struct DocumentSurface {
    source: String,
    regions: Vec<RegionState>,
    focused: Option<RegionId>,
}

/// Nested editable elements belong to their outermost editable ancestor.
pub fn inside_other_region(element: &ElementRef) -> bool {
    let mut node = element.parent();
    while let Some(n) = node {
        if let Some(e) = n.value().as_element() {
            if e.attr(EDITABLE_ATTR).is_some() {
                return true;
            }
        }
        node = n.parent();
    }
    false
}

impl DocumentSurface {
    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);
        static EDITABLE_SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector =
            EDITABLE_SELECTOR.get_or_init(|| Selector::parse("[data-editable]").unwrap());

        let regions: Vec<RegionState> = document
            .select(selector)
            .filter(|el| !inside_other_region(el))
            .map(|el| {
                let markup = el.inner_html();
                RegionState {
                    label: el.value().attr(EDITABLE_ATTR).unwrap_or_default().to_string(),
                    caret: markup.len(),
                    markup,
                    editable: false,
                    hover: false,
                    active: false,
                    anchor: None,
                }
            })
            .collect();

        tracing::debug!(regions = regions.len(), "document surface built");
        Self {
            source: html.to_string(),
            regions,
            focused: None,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn focused(&self) -> Option<RegionId> {
        self.focused
    }

    /// Caret offset and ordered selection range for rendering.
    pub fn caret(&self, id: RegionId) -> Option<(usize, Option<(usize, usize)>)> {
        let state = self.regions.get(id.0)?;
        Some((state.caret, state.selection()))
    }

    fn editing(&mut self, id: RegionId) -> Option<&mut RegionState> {
        self.regions.get_mut(id.0).filter(|r| r.editable)
    }

    pub fn insert_str(&mut self, id: RegionId, text: &str) -> bool {
        let Some(state) = self.editing(id) else {
            return false;
        };
        state.delete_selection();
        state.markup.insert_str(state.caret, text);
        state.caret += text.len();
        true
    }

    pub fn insert_char(&mut self, id: RegionId, c: char) -> bool {
        let mut buf = [0u8; 4];
        self.insert_str(id, c.encode_utf8(&mut buf))
    }

    pub fn backspace(&mut self, id: RegionId) -> bool {
        let Some(state) = self.editing(id) else {
            return false;
        };
        if state.delete_selection() {
            return true;
        }
        if state.caret == 0 {
            return false;
        }
        let start = prev_boundary(&state.markup, state.caret);
        state.markup.replace_range(start..state.caret, "");
        state.caret = start;
        true
    }

    pub fn delete_forward(&mut self, id: RegionId) -> bool {
        let Some(state) = self.editing(id) else {
            return false;
        };
        if state.delete_selection() {
            return true;
        }
        if state.caret >= state.markup.len() {
            return false;
        }
        let end = next_boundary(&state.markup, state.caret);
        state.markup.replace_range(state.caret..end, "");
        true
    }

    pub fn move_left(&mut self, id: RegionId, extend: bool) {
        if let Some(state) = self.editing(id) {
            if !extend {
                if let Some((start, _)) = state.selection() {
                    state.collapse_to(start);
                    return;
                }
            }
            let target = prev_boundary(&state.markup, state.caret);
            state.move_caret(target, extend);
        }
    }

    pub fn move_right(&mut self, id: RegionId, extend: bool) {
        if let Some(state) = self.editing(id) {
            if !extend {
                if let Some((_, end)) = state.selection() {
                    state.collapse_to(end);
                    return;
                }
            }
            let target = next_boundary(&state.markup, state.caret);
            state.move_caret(target, extend);
        }
    }

    pub fn move_line_start(&mut self, id: RegionId, extend: bool) {
        if let Some(state) = self.editing(id) {
            let (start, _) = line_bounds(&state.markup, state.caret);
            state.move_caret(start, extend);
        }
    }

    pub fn move_line_end(&mut self, id: RegionId, extend: bool) {
        if let Some(state) = self.editing(id) {
            let (_, end) = line_bounds(&state.markup, state.caret);
            state.move_caret(end, extend);
        }
    }

    pub fn set_caret(&mut self, id: RegionId, offset: usize, extend: bool) {
        if let Some(state) = self.editing(id) {
            let offset = clamp_boundary(&state.markup, offset);
            state.move_caret(offset, extend);
        }
    }

    pub fn select_all(&mut self, id: RegionId) {
        if let Some(state) = self.editing(id) {
            state.anchor = Some(0);
            state.caret = state.markup.len();
        }
    }

    pub fn selected_text(&self, id: RegionId) -> Option<String> {
        let state = self.regions.get(id.0)?;
        state.selection().map(|(s, e)| state.markup[s..e].to_string())
    }
}

impl RegionState {
    fn selection(&self) -> Option<(usize, usize)> {
        match self.anchor {
            Some(anchor) if anchor != self.caret => {
                Some((anchor.min(self.caret), anchor.max(self.caret)))
            }
            _ => None,
        }
    }

    fn collapse_to(&mut self, offset: usize) {
        self.caret = offset;
        self.anchor = None;
    }

    fn move_caret(&mut self, target: usize, extend: bool) {
        if extend {
            self.anchor.get_or_insert(self.caret);
        } else {
            self.anchor = None;
        }
        self.caret = target;
    }

    fn delete_selection(&mut self) -> bool {
        match self.selection() {
            Some((s, e)) => {
                self.markup.replace_range(s..e, "");
                self.collapse_to(s);
                true
            }
            None => {
                self.anchor = None;
                false
            }
        }
    }

    fn select(&mut self, start: usize, end: usize) {
        self.anchor = Some(start);
        self.caret = end;
    }

    /// The selection, or the caret's line when the selection is collapsed.
    fn target_range(&self) -> (usize, usize) {
        self.selection()
            .unwrap_or_else(|| line_bounds(&self.markup, self.caret))
    }

    fn toggle_inline(&mut self, tag: &str) -> bool {
        let Some((s, e)) = self.selection() else {
            return false;
        };
        let open = format!("<{tag}>");
        let close = format!("</{tag}>");

        if self.markup[..s].ends_with(&open) && self.markup[e..].starts_with(&close) {
            self.markup.replace_range(e..e + close.len(), "");
            self.markup.replace_range(s - open.len()..s, "");
            self.select(s - open.len(), e - open.len());
        } else {
            self.markup.insert_str(e, &close);
            self.markup.insert_str(s, &open);
            self.select(s + open.len(), e + open.len());
        }
        true
    }

    fn format_block(&mut self, format: BlockFormat) -> bool {
        static BLOCK_OPEN: OnceLock<Regex> = OnceLock::new();
        let block_open = BLOCK_OPEN
            .get_or_init(|| Regex::new(r"(?i)<(p|h[1-6]|div|blockquote)(\s[^>]*)?>").unwrap());

        let new_tag = format.tag();
        let had_selection = self.selection().is_some();
        let (s, e) = self.target_range();
        let lowered = self.markup.to_ascii_lowercase();
        // A collapsed caret sits inside a block up to and including the end
        // of its closing tag.
        let search_end = if had_selection { s } else { self.caret };

        let candidates: Vec<(usize, usize, usize)> = block_open
            .captures_iter(&lowered[..search_end])
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.get(1)?;
                Some((name.start(), name.end(), whole.end()))
            })
            .collect();

        for (name_start, name_end, open_end) in candidates.into_iter().rev() {
            let name = lowered[name_start..name_end].to_string();
            let close = format!("</{name}>");
            let Some(rel) = lowered[open_end..].find(&close) else {
                continue;
            };
            let close_start = open_end + rel;
            let encloses = if had_selection {
                close_start >= e
            } else {
                close_start + close.len() >= self.caret
            };
            if !encloses {
                continue;
            }
            if name == new_tag {
                return false;
            }
            self.markup
                .replace_range(close_start..close_start + close.len(), &format!("</{new_tag}>"));
            self.markup.replace_range(name_start..name_end, new_tag);
            let shift = |pos: usize| pos + new_tag.len() - name.len();
            if had_selection {
                self.select(shift(s), shift(e));
            } else if self.caret > close_start {
                self.caret = shift(shift(self.caret));
            } else {
                self.caret = shift(self.caret);
            }
            return true;
        }

        let open = format!("<{new_tag}>");
        self.markup.insert_str(e, &format!("</{new_tag}>"));
        self.markup.insert_str(s, &open);
        self.select(s + open.len(), e + open.len());
        true
    }

    fn insert_list(&mut self, tag: &str) -> bool {
        let (s, e) = self.target_range();
        let items: Vec<String> = self.markup[s..e]
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| format!("<li>{line}</li>"))
            .collect();
        if items.is_empty() {
            return false;
        }
        let list = format!("<{tag}>\n{}\n</{tag}>", items.join("\n"));
        self.markup.replace_range(s..e, &list);
        self.select(s, s + list.len());
        true
    }

    fn create_link(&mut self, url: &str) -> bool {
        let href = url.replace('&', "&amp;").replace('"', "&quot;");
        let open = format!("<a href=\"{href}\">");
        match self.selection() {
            Some((s, e)) => {
                self.markup.insert_str(e, "</a>");
                self.markup.insert_str(s, &open);
                self.select(s + open.len(), e + open.len());
            }
            None => {
                let text = url
                    .replace('&', "&amp;")
                    .replace('<', "&lt;")
                    .replace('>', "&gt;");
                let link = format!("{open}{text}</a>");
                self.markup.insert_str(self.caret, &link);
                self.collapse_to(self.caret + link.len());
            }
        }
        true
    }

    fn unlink(&mut self) -> bool {
        static ANCHOR: OnceLock<Regex> = OnceLock::new();
        let anchor = ANCHOR.get_or_init(|| Regex::new(r"(?is)<a\b[^>]*>(.*?)</a>").unwrap());

        let selection = self.selection();
        let (s, e) = selection.unwrap_or((self.caret, self.caret));
        let overlaps = |start: usize, end: usize| match selection {
            Some(_) => start < e && s < end,
            None => start < s && s < end,
        };

        let mut rebuilt = String::with_capacity(self.markup.len());
        let mut removed: Vec<(usize, usize)> = Vec::new();
        let mut last = 0;
        for caps in anchor.captures_iter(&self.markup) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if !overlaps(whole.start(), whole.end()) {
                continue;
            }
            rebuilt.push_str(&self.markup[last..whole.start()]);
            rebuilt.push_str(inner.as_str());
            removed.push((whole.start(), inner.start()));
            removed.push((inner.end(), whole.end()));
            last = whole.end();
        }
        if removed.is_empty() {
            return false;
        }
        rebuilt.push_str(&self.markup[last..]);

        let map = |pos: usize| {
            let mut mapped = pos;
            for &(start, end) in &removed {
                if pos >= end {
                    mapped -= end - start;
                } else if pos > start {
                    mapped -= pos - start;
                }
            }
            mapped
        };
        self.markup = rebuilt;
        match selection {
            Some((s, e)) => self.select(map(s), map(e)),
            None => self.collapse_to(map(self.caret)),
        }
        true
    }
}

impl RegionSurface for DocumentSurface {
    fn regions(&self) -> Vec<RegionId> {
        (0..self.regions.len()).map(RegionId).collect()
    }

    fn label(&self, id: RegionId) -> Option<&str> {
        self.regions.get(id.0).map(|r| r.label.as_str())
    }

    fn markup(&self, id: RegionId) -> Option<String> {
        self.regions.get(id.0).map(|r| r.markup.clone())
    }

    fn set_markup(&mut self, id: RegionId, markup: &str) {
        if let Some(state) = self.regions.get_mut(id.0) {
            state.markup = markup.to_string();
            state.caret = clamp_boundary(&state.markup, state.caret);
            state.anchor = None;
        }
    }

    fn set_editable(&mut self, id: RegionId, editable: bool) {
        if let Some(state) = self.regions.get_mut(id.0) {
            state.editable = editable;
            state.anchor = None;
            if editable {
                state.caret = state.markup.len();
            } else if self.focused == Some(id) {
                self.focused = None;
            }
        }
    }

    fn is_editable(&self, id: RegionId) -> bool {
        self.regions.get(id.0).is_some_and(|r| r.editable)
    }

    fn set_marker(&mut self, id: RegionId, marker: Marker, on: bool) {
        if let Some(state) = self.regions.get_mut(id.0) {
            match marker {
                Marker::EditableHover => state.hover = on,
                Marker::EditingActive => state.active = on,
            }
        }
    }

    fn has_marker(&self, id: RegionId, marker: Marker) -> bool {
        self.regions.get(id.0).is_some_and(|r| match marker {
            Marker::EditableHover => r.hover,
            Marker::EditingActive => r.active,
        })
    }

    fn focus(&mut self, id: RegionId) {
        if id.0 < self.regions.len() {
            self.focused = Some(id);
        }
    }

    fn exec_command(&mut self, id: RegionId, command: FormatCommand, value: Option<&str>) -> bool {
        let Some(state) = self.editing(id) else {
            return false;
        };
        match command {
            FormatCommand::Bold => state.toggle_inline("strong"),
            FormatCommand::Italic => state.toggle_inline("em"),
            FormatCommand::Underline => state.toggle_inline("u"),
            FormatCommand::FormatBlock(format) => state.format_block(format),
            FormatCommand::InsertUnorderedList => state.insert_list("ul"),
            FormatCommand::InsertOrderedList => state.insert_list("ol"),
            FormatCommand::CreateLink => match value {
                Some(url) => state.create_link(url),
                None => false,
            },
            FormatCommand::Unlink => state.unlink(),
        }
    }
}

fn prev_boundary(s: &str, i: usize) -> usize {
    s[..i].char_indices().next_back().map(|(idx, _)| idx).unwrap_or(0)
}

fn next_boundary(s: &str, i: usize) -> usize {
    s[i..].chars().next().map(|c| i + c.len_utf8()).unwrap_or(s.len())
}

fn clamp_boundary(s: &str, i: usize) -> usize {
    let mut i = i.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn line_bounds(s: &str, i: usize) -> (usize, usize) {
    let start = s[..i].rfind('\n').map(|p| p + 1).unwrap_or(0);
    let end = s[i..].find('\n').map(|p| i + p).unwrap_or(s.len());
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body data-content-id="7">
        <h1 data-editable="title">Hello</h1>
        <div data-editable="content"><p>First <a href="/x">link</a> here</p><span data-editable="title">nested</span></div>
        <aside data-editable="sidebar">Side</aside>
    </body></html>"#;

    fn editing(markup: &str) -> (DocumentSurface, RegionId) {
        let html = format!(r#"<div data-editable="content">{markup}</div>"#);
        let mut doc = DocumentSurface::from_html(&html);
        let id = RegionId(0);
        doc.set_editable(id, true);
        (doc, id)
    }

    fn select(doc: &mut DocumentSurface, id: RegionId, start: usize, end: usize) {
        doc.set_caret(id, start, false);
        doc.set_caret(id, end, true);
    }

    #[test]
    fn extracts_outermost_regions_in_document_order() {
        let doc = DocumentSurface::from_html(PAGE);
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.label(RegionId(0)), Some("title"));
        assert_eq!(doc.label(RegionId(1)), Some("content"));
        assert_eq!(doc.label(RegionId(2)), Some("sidebar"));
        assert_eq!(doc.markup(RegionId(0)).as_deref(), Some("Hello"));
        assert!(doc.markup(RegionId(1)).unwrap().contains("nested"));
        assert_eq!(doc.find_by_label("content"), Some(RegionId(1)));
    }

    #[test]
    fn unknown_region_ids_are_ignored() {
        let mut doc = DocumentSurface::from_html(PAGE);
        doc.set_markup(RegionId(9), "x");
        doc.focus(RegionId(9));
        assert_eq!(doc.markup(RegionId(9)), None);
        assert_eq!(doc.focused(), None);
        assert!(!doc.has_marker(RegionId(9), Marker::EditableHover));
    }

    #[test]
    fn typing_requires_native_editing() {
        let mut doc = DocumentSurface::from_html(PAGE);
        assert!(!doc.insert_char(RegionId(0), '!'));
        doc.set_editable(RegionId(0), true);
        assert!(doc.insert_char(RegionId(0), '!'));
        assert_eq!(doc.markup(RegionId(0)).as_deref(), Some("Hello!"));
    }

    #[test]
    fn backspace_and_delete_respect_char_boundaries() {
        let (mut doc, id) = editing("añb");
        doc.move_left(id, false);
        assert!(doc.backspace(id));
        assert_eq!(doc.markup(id).as_deref(), Some("ab"));
        doc.move_line_start(id, false);
        assert!(doc.delete_forward(id));
        assert_eq!(doc.markup(id).as_deref(), Some("b"));
    }

    #[test]
    fn typing_replaces_the_selection() {
        let (mut doc, id) = editing("Hello world");
        select(&mut doc, id, 6, 11);
        assert_eq!(doc.selected_text(id).as_deref(), Some("world"));
        doc.insert_str(id, "there");
        assert_eq!(doc.markup(id).as_deref(), Some("Hello there"));
        assert_eq!(doc.selected_text(id), None);
    }

    #[test]
    fn bold_wraps_and_then_unwraps_the_selection() {
        let (mut doc, id) = editing("make this bold");
        select(&mut doc, id, 5, 9);
        assert!(doc.exec_command(id, FormatCommand::Bold, None));
        assert_eq!(doc.markup(id).as_deref(), Some("make <strong>this</strong> bold"));
        assert_eq!(doc.selected_text(id).as_deref(), Some("this"));

        assert!(doc.exec_command(id, FormatCommand::Bold, None));
        assert_eq!(doc.markup(id).as_deref(), Some("make this bold"));
    }

    #[test]
    fn inline_style_without_selection_is_a_no_op() {
        let (mut doc, id) = editing("plain");
        assert!(!doc.exec_command(id, FormatCommand::Italic, None));
        assert_eq!(doc.markup(id).as_deref(), Some("plain"));
    }

    #[test]
    fn format_block_retags_the_enclosing_paragraph() {
        let (mut doc, id) = editing(r#"<p class="lead">Intro text</p>"#);
        select(&mut doc, id, 16, 21);
        assert!(doc.exec_command(id, FormatCommand::FormatBlock(BlockFormat::H2), None));
        assert_eq!(doc.markup(id).as_deref(), Some(r#"<h2 class="lead">Intro text</h2>"#));
        assert_eq!(doc.selected_text(id).as_deref(), Some("Intro"));
        assert!(!doc.exec_command(id, FormatCommand::FormatBlock(BlockFormat::H2), None));
    }

    #[test]
    fn format_block_with_caret_retags_the_paragraph_it_sits_in() {
        let (mut doc, id) = editing("<p>Body</p>");
        doc.set_caret(id, 5, false);
        assert!(doc.exec_command(id, FormatCommand::FormatBlock(BlockFormat::H2), None));
        assert_eq!(doc.markup(id).as_deref(), Some("<h2>Body</h2>"));
        assert_eq!(doc.caret(id), Some((6, None)));
    }

    #[test]
    fn format_block_with_caret_at_the_end_retags_the_last_block() {
        let (mut doc, id) = editing("<p>Body</p>");
        assert!(doc.exec_command(id, FormatCommand::FormatBlock(BlockFormat::H3), None));
        assert_eq!(doc.markup(id).as_deref(), Some("<h3>Body</h3>"));
        assert_eq!(doc.caret(id), Some((13, None)));
    }

    #[test]
    fn format_block_with_caret_in_second_paragraph_leaves_the_first() {
        let (mut doc, id) = editing("<p>A</p>\n<p>B</p>");
        doc.set_caret(id, 13, false);
        assert!(doc.exec_command(id, FormatCommand::FormatBlock(BlockFormat::H2), None));
        assert_eq!(doc.markup(id).as_deref(), Some("<p>A</p>\n<h2>B</h2>"));
    }

    #[test]
    fn format_block_wraps_bare_text_on_the_caret_line() {
        let (mut doc, id) = editing("one\ntwo");
        assert!(doc.exec_command(id, FormatCommand::FormatBlock(BlockFormat::H3), None));
        assert_eq!(doc.markup(id).as_deref(), Some("one\n<h3>two</h3>"));
    }

    #[test]
    fn lists_turn_each_selected_line_into_an_item() {
        let (mut doc, id) = editing("apples\n\npears");
        doc.select_all(id);
        assert!(doc.exec_command(id, FormatCommand::InsertOrderedList, None));
        assert_eq!(
            doc.markup(id).as_deref(),
            Some("<ol>\n<li>apples</li>\n<li>pears</li>\n</ol>")
        );
    }

    #[test]
    fn create_link_wraps_selection_or_inserts_url() {
        let (mut doc, id) = editing("see docs");
        select(&mut doc, id, 4, 8);
        assert!(doc.exec_command(id, FormatCommand::CreateLink, Some("https://a.b/?q=\"x\"")));
        assert_eq!(
            doc.markup(id).as_deref(),
            Some(r#"see <a href="https://a.b/?q=&quot;x&quot;">docs</a>"#)
        );

        let (mut doc, id) = editing("go ");
        assert!(doc.exec_command(id, FormatCommand::CreateLink, Some("https://x.y")));
        assert_eq!(doc.markup(id).as_deref(), Some(r#"go <a href="https://x.y">https://x.y</a>"#));
        assert!(!doc.exec_command(id, FormatCommand::CreateLink, None));
    }

    #[test]
    fn unlink_removes_anchors_under_the_caret_only() {
        let (mut doc, id) = editing(r#"<a href="/1">one</a> and <a href="/2">two</a>"#);
        doc.set_caret(id, 15, false);
        assert!(doc.exec_command(id, FormatCommand::Unlink, None));
        assert_eq!(doc.markup(id).as_deref(), Some(r#"one and <a href="/2">two</a>"#));

        doc.move_line_start(id, false);
        assert!(!doc.exec_command(id, FormatCommand::Unlink, None));
    }

    #[test]
    fn unlink_keeps_selection_on_the_same_text() {
        let (mut doc, id) = editing(r#"x <a href="/1">one</a> y"#);
        doc.select_all(id);
        assert!(doc.exec_command(id, FormatCommand::Unlink, None));
        assert_eq!(doc.markup(id).as_deref(), Some("x one y"));
        assert_eq!(doc.selected_text(id).as_deref(), Some("x one y"));
    }
}
