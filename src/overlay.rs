//! Commentary overlay stack
//!
//! Nested lookups ("a note inside a note") push onto the stack; back pops one
//! level. An empty stack means the overlay is hidden.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayEntry {
    pub html: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Hidden,
    Visible { depth: usize },
}

impl OverlayState {
    /// Whether the "back" affordance is shown
    pub fn shows_back(self) -> bool {
        matches!(self, OverlayState::Visible { depth } if depth > 1)
    }

    /// Background scrolling is locked while anything is shown
    pub fn locks_scroll(self) -> bool {
        matches!(self, OverlayState::Visible { .. })
    }
}

/// Last entry is on top
#[derive(Debug, Clone, Default)]
pub struct OverlayStack {
    entries: Vec<OverlayEntry>,
}

impl OverlayStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, html: impl Into<String>, title: impl Into<String>) {
        self.entries.push(OverlayEntry {
            html: html.into(),
            title: title.into(),
        });
    }

    /// Return to the previous entry, or close when only one is shown
    pub fn pop(&mut self) {
        if self.entries.len() > 1 {
            self.entries.pop();
        } else {
            self.close_completely();
        }
    }

    pub fn close_completely(&mut self) {
        self.entries.clear();
    }

    pub fn top(&self) -> Option<&OverlayEntry> {
        self.entries.last()
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn state(&self) -> OverlayState {
        match self.entries.len() {
            0 => OverlayState::Hidden,
            depth => OverlayState::Visible { depth },
        }
    }

    pub fn is_visible(&self) -> bool {
        !self.entries.is_empty()
    }
}
