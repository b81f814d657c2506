//! Region access capability.
//!
//! The edit session never touches a rendered page directly. Everything it
//! needs from the page (finding regions, reading and writing markup, turning
//! native editing on and off, markers, focus and formatting) goes through
//! [`RegionSurface`], so the state machine can be driven by any surface.

use std::fmt;

use crate::rich_text::FormatCommand;

/// Index of an editable region in document order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub usize);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

/// The content-type label a region is tagged with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentType {
    Title,
    Content,
    Other(String),
}

impl ContentType {
    pub fn from_label(label: &str) -> Self {
        match label {
            "title" => ContentType::Title,
            "content" => ContentType::Content,
            other => ContentType::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ContentType::Title => "title",
            ContentType::Content => "content",
            ContentType::Other(label) => label,
        }
    }

    /// Labels the backend knows how to persist.
    pub fn is_recognized(&self) -> bool {
        matches!(self, ContentType::Title | ContentType::Content)
    }

    /// Only body content gets the rich-text toolbar.
    pub fn supports_formatting(&self) -> bool {
        matches!(self, ContentType::Content)
    }
}

/// Visual/interactive markers a region can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    /// Edit mode is on and the region can be clicked.
    EditableHover,
    /// The region is the one being edited.
    EditingActive,
}

pub trait RegionSurface {
    fn regions(&self) -> Vec<RegionId>;

    fn find_by_label(&self, label: &str) -> Option<RegionId> {
        self.regions()
            .into_iter()
            .find(|id| self.label(*id) == Some(label))
    }

    fn label(&self, id: RegionId) -> Option<&str>;

    fn content_type(&self, id: RegionId) -> Option<ContentType> {
        self.label(id).map(ContentType::from_label)
    }

    fn markup(&self, id: RegionId) -> Option<String>;

    fn set_markup(&mut self, id: RegionId, markup: &str);

    fn set_editable(&mut self, id: RegionId, editable: bool);

    fn is_editable(&self, id: RegionId) -> bool;

    fn set_marker(&mut self, id: RegionId, marker: Marker, on: bool);

    fn has_marker(&self, id: RegionId, marker: Marker) -> bool;

    fn focus(&mut self, id: RegionId);

    /// Applies a formatting primitive to the current selection inside `id`.
    /// Returns whether the markup changed.
    fn exec_command(&mut self, id: RegionId, command: FormatCommand, value: Option<&str>) -> bool;
}
