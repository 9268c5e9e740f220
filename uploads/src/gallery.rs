//! Full-screen gallery navigation.

use crate::file_kind::FileKind;

/// Which entries a viewer shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GalleryFilter {
    /// Image viewer: non-image entries are skipped.
    #[default]
    ImagesOnly,
    /// Mixed listing: every visible entry.
    All,
}

impl GalleryFilter {
    pub fn admits(self, kind: FileKind) -> bool {
        match self {
            Self::ImagesOnly => kind.is_image(),
            Self::All => true,
        }
    }
}

/// Read-only projection of one visible entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryEntry {
    pub url: String,
    pub is_remote: bool,
    pub kind: FileKind,
}

/// Index of the entry after `index` in a ring of `len` entries.
pub fn next_index(index: usize, len: usize) -> usize {
    if len <= 1 { index } else { (index + 1) % len }
}

/// Index of the entry before `index` in a ring of `len` entries.
pub fn previous_index(index: usize, len: usize) -> usize {
    if len <= 1 { index } else { (index + len - 1) % len }
}

/// Ordered entries plus a cursor that wraps around at both ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
    index: usize,
}

impl Gallery {
    pub fn new(entries: Vec<GalleryEntry>) -> Self {
        Self { entries, index: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn current(&self) -> Option<&GalleryEntry> {
        self.entries.get(self.index)
    }

    pub fn next(&mut self) -> Option<&GalleryEntry> {
        self.index = next_index(self.index, self.entries.len());
        self.current()
    }

    pub fn previous(&mut self) -> Option<&GalleryEntry> {
        self.index = previous_index(self.index, self.entries.len());
        self.current()
    }

    /// Moves the cursor. Out-of-range indices are refused.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if index < self.entries.len() {
            self.index = index;
            true
        } else {
            false
        }
    }

    /// Human readable position, e.g. `2 / 5`. Empty galleries read `0 / 0`.
    pub fn position_label(&self) -> String {
        if self.entries.is_empty() {
            "0 / 0".to_owned()
        } else {
            format!("{} / {}", self.index + 1, self.entries.len())
        }
    }
}
