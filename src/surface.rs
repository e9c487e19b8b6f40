//! The text-buffer capability the headline controller drives.
//!
//! Positions are character offsets into a buffer's text, starting at 0.

use std::ops::Range;

pub const SCRATCH_BUFFER: &str = "*scratch*";

pub trait TextSurface {
    /// Name of the selected buffer.
    fn current_buffer(&self) -> &str;
    /// Select `name`, creating an empty buffer when it does not exist.
    fn switch_to_buffer(&mut self, name: &str);
    /// Select `name` while keeping the previously selected buffer visible
    /// in another window.
    fn pop_to_buffer(&mut self, name: &str);
    fn text(&self) -> &str;
    /// Replace the selected buffer's text. Clears hover spans and clamps point.
    fn set_text(&mut self, text: &str);
    fn point(&self) -> usize;
    fn set_point(&mut self, position: usize);
    fn mark_hoverable(&mut self, span: Range<usize>);
    /// Insert at point in the selected buffer and move point past the text.
    fn insert(&mut self, text: &str);
    fn set_read_only(&mut self, read_only: bool);
    fn kill_buffer(&mut self, name: &str);
    fn delete_other_windows(&mut self);
    /// Transient status line text.
    fn message(&mut self, text: &str);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buffer {
    pub name: String,
    pub text: String,
    pub point: usize,
    pub hover: Vec<Range<usize>>,
    pub read_only: bool,
}

impl Buffer {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn len_chars(&self) -> usize {
        self.text.chars().count()
    }

    pub fn hover_span_at(&self, position: usize) -> Option<Range<usize>> {
        self.hover
            .iter()
            .find(|span| span.contains(&position))
            .cloned()
    }
}

/// In-memory buffers; the most recently selected buffer is kept first.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    buffers: Vec<Buffer>,
    other_window: Option<String>,
    message: Option<String>,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySurface {
    pub fn new() -> Self {
        Self {
            buffers: vec![Buffer::new(SCRATCH_BUFFER)],
            other_window: None,
            message: None,
        }
    }

    pub fn current(&self) -> &Buffer {
        &self.buffers[0]
    }

    fn current_mut(&mut self) -> &mut Buffer {
        &mut self.buffers[0]
    }

    pub fn buffer(&self, name: &str) -> Option<&Buffer> {
        self.buffers.iter().find(|buffer| buffer.name == name)
    }

    pub fn buffer_names(&self) -> Vec<&str> {
        self.buffers.iter().map(|buffer| buffer.name.as_str()).collect()
    }

    /// Buffer shown in the second window, if the frame is split.
    pub fn other_window(&self) -> Option<&Buffer> {
        self.other_window
            .as_deref()
            .and_then(|name| self.buffer(name))
    }

    pub fn windows(&self) -> usize {
        if self.other_window().is_some() {
            2
        } else {
            1
        }
    }

    pub fn last_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }
}

impl TextSurface for MemorySurface {
    fn current_buffer(&self) -> &str {
        &self.current().name
    }

    fn switch_to_buffer(&mut self, name: &str) {
        let buffer = match self.buffers.iter().position(|buffer| buffer.name == name) {
            Some(index) => self.buffers.remove(index),
            None => Buffer::new(name),
        };
        self.buffers.insert(0, buffer);
        if self.other_window.as_deref() == Some(name) {
            self.other_window = None;
        }
    }

    fn pop_to_buffer(&mut self, name: &str) {
        if self.current_buffer() != name {
            self.other_window = Some(self.current_buffer().to_string());
        }
        self.switch_to_buffer(name);
    }

    fn text(&self) -> &str {
        &self.current().text
    }

    fn set_text(&mut self, text: &str) {
        let buffer = self.current_mut();
        buffer.text = text.to_string();
        buffer.hover.clear();
        buffer.point = buffer.point.min(buffer.len_chars());
    }

    fn point(&self) -> usize {
        self.current().point
    }

    fn set_point(&mut self, position: usize) {
        let buffer = self.current_mut();
        buffer.point = position.min(buffer.len_chars());
    }

    fn mark_hoverable(&mut self, span: Range<usize>) {
        self.current_mut().hover.push(span);
    }

    fn insert(&mut self, text: &str) {
        let buffer = self.current_mut();
        let at = byte_offset(&buffer.text, buffer.point);
        buffer.text.insert_str(at, text);
        buffer.point += text.chars().count();
    }

    fn set_read_only(&mut self, read_only: bool) {
        self.current_mut().read_only = read_only;
    }

    fn kill_buffer(&mut self, name: &str) {
        self.buffers.retain(|buffer| buffer.name != name);
        if self.buffers.is_empty() {
            self.buffers.push(Buffer::new(SCRATCH_BUFFER));
        }
        if self.other_window.as_deref() == Some(name) {
            self.other_window = None;
        }
    }

    fn delete_other_windows(&mut self) {
        self.other_window = None;
    }

    fn message(&mut self, text: &str) {
        self.message = Some(text.to_string());
    }
}

/// Byte index of the `position`-th character, or the end of `text`.
pub fn byte_offset(text: &str, position: usize) -> usize {
    text.char_indices()
        .nth(position)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}
