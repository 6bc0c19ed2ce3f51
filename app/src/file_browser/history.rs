use std::collections::VecDeque;
use std::path::{Component, Path, PathBuf};

pub const MAX_NAVIGATION_HISTORY: usize = 100;

/// Back/forward stacks of visited folders. The newest entry sits at the
/// front of each deque; once a stack is full the oldest entry falls off.
#[derive(Debug, Default)]
pub struct NavigationHistory {
    back: VecDeque<PathBuf>,
    forward: VecDeque<PathBuf>,
}

impl NavigationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_navigate_back(&self) -> bool {
        !self.back.is_empty()
    }

    pub fn can_navigate_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    /// Pop the previous folder, remembering `current` for navigating forward again
    pub fn navigate_back(&mut self, current: &Path) -> Option<PathBuf> {
        let previous = self.back.pop_front()?;
        push_capped(&mut self.forward, current);
        Some(previous)
    }

    pub fn navigate_forward(&mut self, current: &Path) -> Option<PathBuf> {
        let next = self.forward.pop_front()?;
        push_capped(&mut self.back, current);
        Some(next)
    }

    pub fn push_back(&mut self, path: &Path) {
        push_capped(&mut self.back, path);
    }

    pub fn clear_forward(&mut self) {
        self.forward.clear();
    }

    pub fn back_len(&self) -> usize {
        self.back.len()
    }

    pub fn forward_len(&self) -> usize {
        self.forward.len()
    }
}

fn push_capped(stack: &mut VecDeque<PathBuf>, path: &Path) {
    if stack.len() >= MAX_NAVIGATION_HISTORY {
        stack.pop_back();
    }
    stack.push_front(normalize_path(path));
}

/// Absolute form of `path` with `.`/`..` resolved lexically and no trailing separator
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
