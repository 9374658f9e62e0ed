#![forbid(unsafe_code)]

//! In-process navigation history with back/forward cursors.

/// Linear history of visited paths.
///
/// Pushing while the cursor is not at the end discards the forward entries,
/// like a browser does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
    cursor: usize,
}

impl History {
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            entries: vec![initial.into()],
            cursor: 0,
        }
    }

    #[must_use]
    pub fn current(&self) -> &str {
        &self.entries[self.cursor]
    }

    pub fn push(&mut self, path: impl Into<String>) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(path.into());
        self.cursor += 1;
    }

    /// Step back, returning the new current path.
    pub fn back(&mut self) -> Option<&str> {
        if !self.can_go_back() {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    /// Step forward, returning the new current path.
    pub fn forward(&mut self) -> Option<&str> {
        if !self.can_go_forward() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn back_and_forward() {
        let mut history = History::new("/");
        history.push("/a");
        history.push("/b");
        assert_eq!(history.back(), Some("/a"));
        assert_eq!(history.back(), Some("/"));
        assert_eq!(history.back(), None);
        assert_eq!(history.forward(), Some("/a"));
        assert!(history.can_go_forward());
    }

    #[test]
    fn push_discards_forward_entries() {
        let mut history = History::new("/");
        history.push("/a");
        history.push("/b");
        let _ = history.back();
        history.push("/c");
        assert_eq!(history.entries().collect::<Vec<_>>(), vec!["/", "/a", "/c"]);
        assert!(!history.can_go_forward());
        assert_eq!(history.current(), "/c");
    }
}
