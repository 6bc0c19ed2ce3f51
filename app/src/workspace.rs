//! Selection state shared between the file browser and the map pane

use std::sync::Arc;
use thumbnail_cache::ListItem;
use tokio::sync::watch;

#[derive(Debug, Clone, Default)]
pub struct SelectionSnapshot {
    pub selected_photos: Vec<Arc<ListItem>>,
    pub selected_count: usize,
    /// Number of non-folder items in the current listing
    pub photo_list_count: usize,
    /// Position of the first selected photo among the listed photos
    pub current_photo_index: Option<usize>,
}

/// Latest selection, observable through `subscribe`
pub struct WorkspaceState {
    tx: watch::Sender<SelectionSnapshot>,
}

impl Default for WorkspaceState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceState {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SelectionSnapshot::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<SelectionSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        self.tx.borrow().clone()
    }

    pub fn publish_selection(&self, selected: Vec<Arc<ListItem>>, current_photo_index: Option<usize>) {
        self.tx.send_modify(|state| {
            state.selected_count = selected.len();
            state.selected_photos = selected;
            state.current_photo_index = current_photo_index;
        });
    }

    /// A new listing invalidates the previous selection
    pub fn publish_photo_list(&self, photo_list_count: usize) {
        self.tx.send_modify(|state| {
            state.photo_list_count = photo_list_count;
            state.selected_photos.clear();
            state.selected_count = 0;
            state.current_photo_index = None;
        });
    }
}
