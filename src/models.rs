use crate::region::RegionId;

/// Lines `line_start..line_end` of the rendered page belong to `region`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionSpan {
    pub region: RegionId,
    pub line_start: usize,
    pub line_end: usize,
}

impl RegionSpan {
    pub fn contains(&self, line_index: usize) -> bool {
        line_index >= self.line_start && line_index < self.line_end
    }
}

/// A rendered line of the active region's raw markup, mapped back to the
/// byte range of the markup it shows. Used to place the caret on click.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkupLine {
    pub line_index: usize,
    pub byte_start: usize,
    pub byte_end: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    /// Gate flag: whether the viewer may use the editor at all.
    pub staff_user: bool,
    pub content_id: Option<String>,
    pub csrf_token: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Collecting a URL for the link command.
    LinkPrompt(String),
}
