use async_trait::async_trait;

use crate::errors::EduCopyResult;
use crate::perception::types::ViewportRect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Input,
    TextArea,
    ContentEditable,
    /// Focused, but not text-input capable (button, link, body, ...).
    Other,
}

impl FieldKind {
    pub fn accepts_text(&self) -> bool {
        !matches!(self, FieldKind::Other)
    }
}

/// Snapshot of the focused element's editable state. Selection offsets count chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    pub kind: FieldKind,
    pub value: String,
    pub selection_start: usize,
    pub selection_end: usize,
}

impl TextField {
    pub fn new(kind: FieldKind, value: impl Into<String>, caret: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            selection_start: caret,
            selection_end: caret,
        }
    }

    /// Replace the active selection (or insert at the caret) with `text` and
    /// put the caret right after the inserted text.
    pub fn insert_at_caret(&mut self, text: &str) {
        let len = self.value.chars().count();
        let start = self.selection_start.min(self.selection_end).min(len);
        let end = self.selection_start.max(self.selection_end).min(len);

        let byte_at = |chars: usize| {
            self.value
                .char_indices()
                .nth(chars)
                .map(|(i, _)| i)
                .unwrap_or(self.value.len())
        };
        let (start_byte, end_byte) = (byte_at(start), byte_at(end));

        self.value.replace_range(start_byte..end_byte, text);
        let caret = start + text.chars().count();
        self.selection_start = caret;
        self.selection_end = caret;
    }
}

/// Document and system primitives the Agent acts through.
#[async_trait]
pub trait PageHost: Send + Sync {
    async fn write_clipboard(&self, text: &str) -> EduCopyResult<()>;

    /// The currently focused element, if any.
    fn focused_field(&self) -> Option<TextField>;

    /// Write an edited snapshot back to the focused element.
    fn commit_field(&self, field: TextField) -> EduCopyResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// On-page overlay surfaces owned by the Agent.
pub trait PageUi: Send + Sync {
    fn show_notice(&self, kind: NoticeKind, message: &str);
    fn show_countdown(&self, remaining_secs: u32);
    fn hide_countdown(&self);
    fn show_capture_overlay(&self);
    fn update_capture_selection(&self, rect: ViewportRect);
    fn hide_capture_overlay(&self);
    fn show_preview(&self, image_data_url: &str);
}
