use crate::constants::{REGION_GUTTER_WIDTH, UI_BORDER_WIDTH};
use crate::document::{DocumentSurface, EDITABLE_ATTR, inside_other_region};
use crate::models::{MarkupLine, RegionSpan};
use crate::region::{Marker, RegionId, RegionSurface};

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use scraper::{ElementRef, Html, Node};
use unicode_width::UnicodeWidthChar;

pub struct DomRenderer<'a> {
    pub lines: Vec<Line<'static>>,
    current_line: Vec<Span<'static>>,
    current_style: Style,
    pub regions: Vec<RegionSpan>,
    pub markup_lines: Vec<MarkupLine>,
    max_width: usize,
    current_line_width: usize,
    preserve_whitespace: bool,
    list_depth: usize,
    surface: &'a DocumentSurface,
    selected: Option<RegionId>,
    next_region: usize,
    gutter: Option<Span<'static>>,
}

/// Gutter drawn in front of every line of a region, keyed on its markers.
fn gutter_for(surface: &DocumentSurface, id: RegionId, selected: bool) -> Span<'static> {
    if surface.has_marker(id, Marker::EditingActive) {
        Span::styled("▌ ", Style::default().fg(Color::Green))
    } else if surface.has_marker(id, Marker::EditableHover) {
        if selected {
            Span::styled("▌ ", Style::default().fg(Color::Yellow))
        } else {
            Span::styled("┊ ", Style::default().fg(Color::DarkGray))
        }
    } else {
        Span::raw("  ")
    }
}

/// Byte offset in `markup` under display column `x` of a rendered markup line.
pub fn offset_at(markup: &str, line: &MarkupLine, x: usize) -> usize {
    let Some(slice) = markup.get(line.byte_start..line.byte_end) else {
        return markup.len();
    };
    let mut col = 0;
    for (i, c) in slice.char_indices() {
        let w = c.width().unwrap_or(0).max(1);
        if x < col + w {
            return line.byte_start + i;
        }
        col += w;
    }
    line.byte_end
}

impl<'a> DomRenderer<'a> {
    pub fn new(width: usize, surface: &'a DocumentSurface, selected: Option<RegionId>) -> Self {
        Self {
            lines: Vec::new(),
            current_line: Vec::new(),
            current_style: Style::default(),
            regions: Vec::new(),
            markup_lines: Vec::new(),
            max_width: width.saturating_sub(UI_BORDER_WIDTH),
            current_line_width: 0,
            preserve_whitespace: false,
            list_depth: 0,
            surface,
            selected,
            next_region: 0,
            gutter: None,
        }
    }

    pub fn render(&mut self, document: &Html) {
        for node in document.tree.root().children() {
            self.walk(node);
        }
        self.flush_line();
    }

    fn flush_line(&mut self) {
        if !self.current_line.is_empty() {
            let mut spans = Vec::with_capacity(self.current_line.len() + 1);
            if let Some(gutter) = &self.gutter {
                spans.push(gutter.clone());
            }
            spans.append(&mut self.current_line);
            self.lines.push(Line::from(spans));
            self.current_line_width = 0;
        }
    }

    fn add_vertical_space(&mut self) {
        self.flush_line();
        if let Some(last) = self.lines.last() {
            if !last.spans.is_empty() {
                self.lines.push(Line::from(""));
            }
        }
    }

    fn push_word(&mut self, word: &str) {
        let span = Span::styled(word.to_string(), self.current_style);
        let word_len = span.width();

        if self.current_line_width + word_len > self.max_width {
            self.flush_line();
            // Maintain indentation for lists when wrapping
            if self.list_depth > 0 {
                let indent = "  ".repeat(self.list_depth);
                self.current_line_width = indent.len();
                self.current_line.push(Span::from(indent));
            }
        }

        self.current_line.push(span);
        self.current_line_width += word_len;
    }

    /// Styling and spacing when entering an element.
    fn open_tag(&mut self, tag: &str, elem: &scraper::node::Element) {
        match tag {
            "b" | "strong" => self.current_style = self.current_style.add_modifier(Modifier::BOLD),
            "i" | "em" => self.current_style = self.current_style.add_modifier(Modifier::ITALIC),
            "u" => self.current_style = self.current_style.add_modifier(Modifier::UNDERLINED),
            "a" => {
                self.current_style = self
                    .current_style
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::UNDERLINED)
            }
            "h1" | "h2" | "h3" => {
                self.add_vertical_space();
                self.current_style = self
                    .current_style
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD);
            }
            "pre" | "code" => {
                self.flush_line();
                self.preserve_whitespace = true;
                self.current_style = self.current_style.fg(Color::Magenta);
            }
            "ul" | "ol" => {
                self.flush_line();
                self.list_depth += 1;
            }
            "li" => {
                self.flush_line();
                let bullet = format!("{}• ", "  ".repeat(self.list_depth.saturating_sub(1)));
                self.push_word(&bullet);
            }
            "img" => {
                let alt = elem.attr("alt").unwrap_or("IMAGE");
                let old_style = self.current_style;
                self.current_style = self.current_style.fg(Color::DarkGray);
                self.push_word(&format!("[{}] ", alt));
                self.current_style = old_style;
            }
            "br" => self.flush_line(),
            "p" | "main" | "article" | "section" | "table" | "aside" => self.add_vertical_space(),
            "div" | "header" | "footer" | "nav" | "tr" => self.flush_line(),
            "td" | "th" => self.push_word("  "),
            "hr" => {
                self.add_vertical_space();
                self.push_word(&"-".repeat(self.max_width));
                self.add_vertical_space();
            }
            _ => {}
        }
    }

    fn close_tag(&mut self, tag: &str) {
        match tag {
            "ul" | "ol" => {
                self.list_depth = self.list_depth.saturating_sub(1);
                self.flush_line();
            }
            "h1" | "h2" | "h3" | "p" | "main" | "article" | "section" | "table" | "aside"
            | "pre" => self.add_vertical_space(),
            "div" | "li" | "header" | "footer" | "nav" | "tr" => self.flush_line(),
            _ => {}
        }
    }

    fn walk(&mut self, node: ego_tree::NodeRef<scraper::node::Node>) {
        match node.value() {
            Node::Text(text) => {
                if self.preserve_whitespace {
                    for line in text.text.lines() {
                        self.push_word(line);
                        self.flush_line();
                    }
                } else {
                    let content = text.text.split_whitespace().collect::<Vec<_>>().join(" ");
                    if !content.is_empty() {
                        let trailing = if text.text.ends_with(char::is_whitespace) {
                            " "
                        } else {
                            ""
                        };
                        self.push_word(&format!("{}{}", content, trailing));
                    }
                }
            }
            Node::Element(elem) => {
                let tag = elem.name();

                if tag == "script" || tag == "style" || tag == "head" || tag == "meta" || tag == "link" {
                    self.skip_regions(node);
                    return;
                }
                if elem.attr("hidden").is_some() || elem.attr("aria-hidden") == Some("true") {
                    self.skip_regions(node);
                    return;
                }

                let old_style = self.current_style;
                let old_preserve = self.preserve_whitespace;

                self.open_tag(tag, elem);
                // nested markers belong to the enclosing region
                if elem.attr(EDITABLE_ATTR).is_some() && self.gutter.is_none() {
                    self.render_region();
                } else {
                    for child in node.children() {
                        self.walk(child);
                    }
                }

                self.current_style = old_style;
                self.preserve_whitespace = old_preserve;
                self.close_tag(tag);
            }
            _ => {}
        }
    }

    /// Regions inside a subtree that is not drawn still hold their ids, so
    /// the ones after it stay in step with the surface.
    fn skip_regions(&mut self, node: ego_tree::NodeRef<scraper::node::Node>) {
        if self.gutter.is_some() {
            return;
        }
        let skipped = node
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().attr(EDITABLE_ATTR).is_some() && !inside_other_region(el))
            .count();
        self.next_region += skipped;
    }

    /// Renders the next editable region from the surface's current markup
    /// instead of the page's original children.
    fn render_region(&mut self) {
        let id = RegionId(self.next_region);
        self.next_region += 1;

        self.flush_line();
        let line_start = self.lines.len();
        let gutter = gutter_for(self.surface, id, self.selected == Some(id));
        let full_width = self.max_width;
        self.max_width = full_width.saturating_sub(REGION_GUTTER_WIDTH);

        if self.surface.is_editable(id) {
            self.render_markup_source(id, gutter);
        } else {
            let markup = self.surface.markup(id).unwrap_or_default();
            let fragment = Html::parse_fragment(&markup);
            self.gutter = Some(gutter.clone());
            for child in fragment.tree.root().children() {
                self.walk(child);
            }
            self.flush_line();
            self.gutter = None;
            // an empty region still needs a line to be clickable
            if self.lines.len() == line_start {
                self.lines.push(Line::from(vec![gutter]));
            }
        }

        self.max_width = full_width;
        self.regions.push(RegionSpan {
            region: id,
            line_start,
            line_end: self.lines.len(),
        });
    }

    /// The region being edited shows its raw markup with caret and selection.
    fn render_markup_source(&mut self, id: RegionId, gutter: Span<'static>) {
        let markup = self.surface.markup(id).unwrap_or_default();
        let (caret, selection) = self.surface.caret(id).unwrap_or((markup.len(), None));
        let width = self.max_width.max(1);
        let base = Style::default().fg(Color::Gray);

        let mut line_start = 0;
        for raw_line in markup.split('\n') {
            let line_end = line_start + raw_line.len();
            let mut chunk_start = line_start;
            loop {
                // take as many chars as fit in `width` cells
                let mut chunk_end = chunk_start;
                let mut cells = 0;
                for c in markup[chunk_start..line_end].chars() {
                    let w = c.width().unwrap_or(0);
                    if cells + w > width && chunk_end > chunk_start {
                        break;
                    }
                    cells += w;
                    chunk_end += c.len_utf8();
                }
                let last_chunk = chunk_end == line_end;

                let mut spans = vec![gutter.clone()];
                let mut run = String::new();
                let mut run_style = base;
                for (offset, c) in markup[chunk_start..chunk_end].char_indices() {
                    let pos = chunk_start + offset;
                    let mut style = base;
                    if selection.is_some_and(|(s, e)| pos >= s && pos < e) {
                        style = style.bg(Color::Blue).fg(Color::White);
                    }
                    if pos == caret {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    if style != run_style && !run.is_empty() {
                        spans.push(Span::styled(std::mem::take(&mut run), run_style));
                    }
                    run_style = style;
                    run.push(c);
                }
                if !run.is_empty() {
                    spans.push(Span::styled(run, run_style));
                }
                if last_chunk && caret == line_end {
                    spans.push(Span::styled(" ", base.add_modifier(Modifier::REVERSED)));
                }

                self.markup_lines.push(MarkupLine {
                    line_index: self.lines.len(),
                    byte_start: chunk_start,
                    byte_end: chunk_end,
                });
                self.lines.push(Line::from(spans));

                if last_chunk {
                    break;
                }
                chunk_start = chunk_end;
            }
            line_start = line_end + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <p>Intro text</p>
        <h1 data-editable="title">Hello</h1>
        <div data-editable="content"><p>First</p><p>Second</p></div>
        <div data-editable="excerpt"></div>
    </body></html>"#;

    fn render(surface: &DocumentSurface, width: usize) -> DomRenderer<'_> {
        let document = Html::parse_document(surface.source());
        let mut renderer = DomRenderer::new(width, surface, None);
        renderer.render(&document);
        renderer
    }

    fn text(lines: &[Line<'static>]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn records_a_span_per_region_in_order() {
        let surface = DocumentSurface::from_html(PAGE);
        let renderer = render(&surface, 80);
        let ids: Vec<_> = renderer.regions.iter().map(|r| r.region).collect();
        assert_eq!(ids, vec![RegionId(0), RegionId(1), RegionId(2)]);

        let lines = text(&renderer.lines);
        let title = &renderer.regions[0];
        assert!(lines[title.line_start..title.line_end].iter().any(|l| l.contains("Hello")));
        let empty = &renderer.regions[2];
        assert_eq!(empty.line_end - empty.line_start, 1);
    }

    #[test]
    fn renders_current_markup_not_the_original() {
        let mut surface = DocumentSurface::from_html(PAGE);
        surface.set_markup(RegionId(0), "Goodbye");
        let lines = text(&render(&surface, 80).lines);
        assert!(lines.iter().any(|l| l.contains("Goodbye")));
        assert!(!lines.iter().any(|l| l.contains("Hello")));
    }

    #[test]
    fn active_region_shows_raw_markup_with_line_mapping() {
        let mut surface = DocumentSurface::from_html(PAGE);
        surface.set_editable(RegionId(1), true);
        let renderer = render(&surface, 80);
        let lines = text(&renderer.lines);

        assert_eq!(renderer.markup_lines.len(), 1);
        let line = &renderer.markup_lines[0];
        assert!(lines[line.line_index].contains("<p>First</p><p>Second</p>"));
        assert_eq!(line.byte_start, 0);
        assert_eq!(line.byte_end, "<p>First</p><p>Second</p>".len());
    }

    #[test]
    fn long_markup_wraps_and_maps_clicks_back_to_offsets() {
        let mut surface = DocumentSurface::from_html(r#"<div data-editable="content">abcdefghij</div>"#);
        surface.set_editable(RegionId(0), true);
        // 8 columns minus the border allowance and the gutter leaves 4 cells
        let renderer = render(&surface, 8);
        let spans: Vec<_> = renderer
            .markup_lines
            .iter()
            .map(|l| (l.byte_start, l.byte_end))
            .collect();
        assert_eq!(spans, vec![(0, 4), (4, 8), (8, 10)]);

        let markup = surface.markup(RegionId(0)).unwrap();
        assert_eq!(offset_at(&markup, &renderer.markup_lines[1], 2), 6);
        assert_eq!(offset_at(&markup, &renderer.markup_lines[2], 9), 10);
    }

    #[test]
    fn hidden_regions_keep_later_regions_in_step() {
        let surface = DocumentSurface::from_html(
            r#"<body><div hidden><span data-editable="title">Secret</span></div>
            <div data-editable="content"><p>Visible body</p></div></body>"#,
        );
        let renderer = render(&surface, 80);

        assert_eq!(renderer.regions.len(), 1);
        let span = &renderer.regions[0];
        assert_eq!(span.region, RegionId(1));
        let lines = text(&renderer.lines);
        assert!(lines[span.line_start..span.line_end].iter().any(|l| l.contains("Visible body")));
        assert!(!lines.iter().any(|l| l.contains("Secret")));
    }

    #[test]
    fn gutter_reflects_markers() {
        let mut surface = DocumentSurface::from_html(PAGE);
        surface.set_marker(RegionId(0), Marker::EditableHover, true);
        let renderer = render(&surface, 80);
        let title = &renderer.regions[0];
        let first = renderer.lines[title.line_start].to_string();
        assert!(first.starts_with('┊'));
    }
}
