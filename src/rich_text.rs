use crate::region::{RegionId, RegionSurface};

use unicode_width::UnicodeWidthStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockFormat {
    H2,
    H3,
    Paragraph,
}

impl BlockFormat {
    pub fn tag(self) -> &'static str {
        match self {
            BlockFormat::H2 => "h2",
            BlockFormat::H3 => "h3",
            BlockFormat::Paragraph => "p",
        }
    }
}

/// The fixed set of formatting commands the rich-text toolbar offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    FormatBlock(BlockFormat),
    InsertUnorderedList,
    InsertOrderedList,
    CreateLink,
    Unlink,
}

/// Toolbar groups, rendered with a separator between each.
pub const GROUPS: &[&[FormatCommand]] = &[
    &[
        FormatCommand::Bold,
        FormatCommand::Italic,
        FormatCommand::Underline,
    ],
    &[
        FormatCommand::FormatBlock(BlockFormat::H2),
        FormatCommand::FormatBlock(BlockFormat::H3),
        FormatCommand::FormatBlock(BlockFormat::Paragraph),
    ],
    &[
        FormatCommand::InsertUnorderedList,
        FormatCommand::InsertOrderedList,
    ],
    &[FormatCommand::CreateLink, FormatCommand::Unlink],
];

pub const SEPARATOR: &str = "│";

impl FormatCommand {
    pub fn label(self) -> &'static str {
        match self {
            FormatCommand::Bold => "B",
            FormatCommand::Italic => "I",
            FormatCommand::Underline => "U",
            FormatCommand::FormatBlock(BlockFormat::H2) => "H2",
            FormatCommand::FormatBlock(BlockFormat::H3) => "H3",
            FormatCommand::FormatBlock(BlockFormat::Paragraph) => "P",
            FormatCommand::InsertUnorderedList => "• List",
            FormatCommand::InsertOrderedList => "1. List",
            FormatCommand::CreateLink => "Link",
            FormatCommand::Unlink => "Unlink",
        }
    }

    /// Alt+<key> accelerator while editing a content region.
    pub fn from_accelerator(c: char) -> Option<Self> {
        let command = match c {
            'b' => FormatCommand::Bold,
            'i' => FormatCommand::Italic,
            'u' => FormatCommand::Underline,
            '2' => FormatCommand::FormatBlock(BlockFormat::H2),
            '3' => FormatCommand::FormatBlock(BlockFormat::H3),
            'p' => FormatCommand::FormatBlock(BlockFormat::Paragraph),
            'l' => FormatCommand::InsertUnorderedList,
            'o' => FormatCommand::InsertOrderedList,
            'k' => FormatCommand::CreateLink,
            'K' => FormatCommand::Unlink,
            _ => return None,
        };
        Some(command)
    }

    pub fn needs_value(self) -> bool {
        self == FormatCommand::CreateLink
    }
}

/// A button's horizontal cell range, relative to the toolbar's left edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSlot {
    pub command: FormatCommand,
    pub x_start: usize,
    pub x_end: usize,
}

/// Floating command panel attached to the active content region.
///
/// The toolbar itself holds no editing state: it only knows which region it
/// is anchored to and forwards commands to the surface.
#[derive(Debug, PartialEq, Eq)]
pub struct RichTextToolbar {
    region: RegionId,
}

impl RichTextToolbar {
    pub fn attach(region: RegionId) -> Self {
        tracing::debug!(%region, "rich text toolbar attached");
        Self { region }
    }

    pub fn region(&self) -> RegionId {
        self.region
    }

    /// Runs `command` against the current selection in the anchored region
    /// and hands focus back to it. A link without a URL does nothing.
    pub fn apply<S: RegionSurface + ?Sized>(
        &self,
        command: FormatCommand,
        surface: &mut S,
        value: Option<&str>,
    ) -> bool {
        let value = value.map(str::trim).filter(|v| !v.is_empty());
        if command.needs_value() && value.is_none() {
            tracing::debug!(?command, "no value supplied, command skipped");
            surface.focus(self.region);
            return false;
        }

        let changed = surface.exec_command(self.region, command, value);
        tracing::debug!(?command, changed, region = %self.region, "format command applied");
        surface.focus(self.region);
        changed
    }

    pub fn layout() -> Vec<CommandSlot> {
        let mut slots = Vec::new();
        let mut x = 0;
        for (i, group) in GROUPS.iter().enumerate() {
            if i > 0 {
                x += SEPARATOR.width();
            }
            for command in group.iter() {
                let width = command.label().width() + 2;
                slots.push(CommandSlot {
                    command: *command,
                    x_start: x,
                    x_end: x + width,
                });
                x += width;
            }
        }
        slots
    }

    pub fn width() -> usize {
        Self::layout().last().map(|s| s.x_end).unwrap_or(0)
    }

    pub fn command_at(x: usize) -> Option<FormatCommand> {
        Self::layout()
            .into_iter()
            .find(|slot| x >= slot.x_start && x < slot.x_end)
            .map(|slot| slot.command)
    }
}

impl Drop for RichTextToolbar {
    fn drop(&mut self) {
        tracing::debug!(region = %self.region, "rich text toolbar destroyed");
    }
}
