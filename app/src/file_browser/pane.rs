use crate::file_browser::history::{normalize_path, NavigationHistory};
use crate::file_browser::listing::{list_folder, ListingFilter};
use crate::file_browser::operations::{self, run_blocking};
use crate::file_browser::sort::{sort_items, SortColumn, SortState};
use crate::workspace::WorkspaceState;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thumbnail_cache::{ListItem, ThumbnailConfig, ThumbnailEvent, ThumbnailProvider, ThumbnailScheduler};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { item_count: usize },
    /// A newer load started before this one finished; its result was discarded
    Superseded,
}

#[derive(Default)]
struct BrowserState {
    current_folder: Option<PathBuf>,
    items: Vec<Arc<ListItem>>,
    sort: SortState,
    filter: ListingFilter,
    history: NavigationHistory,
    selected: Vec<Arc<ListItem>>,
}

/// Headless file browser: listing, sorting, navigation and selection for one pane
pub struct FileBrowserPane<P: ThumbnailProvider> {
    scheduler: ThumbnailScheduler<P>,
    workspace: Arc<WorkspaceState>,
    home_folder: Option<PathBuf>,
    state: Mutex<BrowserState>,
    active_load: Mutex<Option<CancellationToken>>,
}

/// The user's pictures folder, or the home folder when there is none
pub fn default_home_folder() -> Option<PathBuf> {
    dirs::picture_dir()
        .filter(|dir| dir.is_dir())
        .or_else(|| dirs::home_dir().filter(|dir| dir.is_dir()))
}

impl<P: ThumbnailProvider> FileBrowserPane<P> {
    pub fn new(
        provider: Arc<P>,
        config: &ThumbnailConfig,
        workspace: Arc<WorkspaceState>,
        filter: ListingFilter,
    ) -> Self {
        Self {
            scheduler: ThumbnailScheduler::new(provider, config),
            workspace,
            home_folder: default_home_folder(),
            state: Mutex::new(BrowserState {
                filter,
                ..Default::default()
            }),
            active_load: Mutex::new(None),
        }
    }

    /// Use `folder` as the target of [`navigate_home`](Self::navigate_home)
    pub fn with_home_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.home_folder = Some(folder.into());
        self
    }

    pub fn scheduler(&self) -> &ThumbnailScheduler<P> {
        &self.scheduler
    }

    pub fn subscribe_thumbnails(&self) -> broadcast::Receiver<ThumbnailEvent> {
        self.scheduler.subscribe()
    }

    pub fn current_folder(&self) -> Option<PathBuf> {
        self.state.lock().current_folder.clone()
    }

    pub fn items(&self) -> Vec<Arc<ListItem>> {
        self.state.lock().items.clone()
    }

    /// Listed items that are not folders, in display order
    pub fn photos(&self) -> Vec<Arc<ListItem>> {
        photos_of(&self.state.lock().items)
    }

    pub fn selection(&self) -> Vec<Arc<ListItem>> {
        self.state.lock().selected.clone()
    }

    pub fn filter(&self) -> ListingFilter {
        self.state.lock().filter.clone()
    }

    pub fn sort_state(&self) -> SortState {
        self.state.lock().sort
    }

    pub fn can_navigate_back(&self) -> bool {
        self.state.lock().history.can_navigate_back()
    }

    pub fn can_navigate_forward(&self) -> bool {
        self.state.lock().history.can_navigate_forward()
    }

    /// List `folder`, publish the sorted result and start generating thumbnails.
    ///
    /// With `update_history` the previously shown folder is pushed onto the
    /// back stack and the forward stack is cleared.
    pub async fn load_folder(&self, folder: &Path, update_history: bool) -> Result<LoadOutcome> {
        let token = CancellationToken::new();
        if let Some(previous) = self.active_load.lock().replace(token.clone()) {
            previous.cancel();
        }

        let folder = normalize_path(folder);
        let filter = self.state.lock().filter.clone();

        let listed = list_folder(&folder, &filter).await;
        if token.is_cancelled() {
            return Ok(LoadOutcome::Superseded);
        }
        let mut items = match listed {
            Ok(items) => items,
            Err(e) => {
                error!("Failed to load folder {}: {:#}", folder.display(), e);
                return Err(e).with_context(|| format!("Failed to load folder {}", folder.display()));
            }
        };

        let (item_count, photo_count) = {
            let mut state = self.state.lock();
            sort_items(&mut items, state.sort);

            if update_history {
                if let Some(previous) = state.current_folder.take().filter(|p| *p != folder) {
                    state.history.push_back(&previous);
                    state.history.clear_forward();
                }
            }

            state.current_folder = Some(folder.clone());
            state.selected.clear();
            state.items = items;
            (state.items.len(), photos_of(&state.items).len())
        };

        info!("Loaded {} items from {}", item_count, folder.display());
        self.workspace.publish_photo_list(photo_count);

        let items = self.items();
        self.scheduler.start_round(&items);

        Ok(LoadOutcome::Loaded { item_count })
    }

    pub async fn navigate_back(&self) -> Result<Option<LoadOutcome>> {
        let target = {
            let mut state = self.state.lock();
            let Some(current) = state.current_folder.clone() else {
                return Ok(None);
            };
            state.history.navigate_back(&current)
        };
        match target {
            Some(path) => self.load_folder(&path, false).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn navigate_forward(&self) -> Result<Option<LoadOutcome>> {
        let target = {
            let mut state = self.state.lock();
            let Some(current) = state.current_folder.clone() else {
                return Ok(None);
            };
            state.history.navigate_forward(&current)
        };
        match target {
            Some(path) => self.load_folder(&path, false).await.map(Some),
            None => Ok(None),
        }
    }

    /// Load the pictures folder as a regular navigation
    pub async fn navigate_home(&self) -> Result<Option<LoadOutcome>> {
        match self.home_folder.clone() {
            Some(home) => self.load_folder(&home, true).await.map(Some),
            None => {
                warn!("No pictures or home folder to open");
                Ok(None)
            }
        }
    }

    /// Load the parent of the current folder
    pub async fn navigate_up(&self) -> Result<Option<LoadOutcome>> {
        let parent = self
            .current_folder()
            .and_then(|folder| folder.parent().map(Path::to_path_buf));
        match parent {
            Some(parent) => self.load_folder(&parent, true).await.map(Some),
            None => Ok(None),
        }
    }

    /// Reload the current folder without touching history
    pub async fn refresh(&self) -> Result<Option<LoadOutcome>> {
        match self.current_folder() {
            Some(folder) => self.load_folder(&folder, false).await.map(Some),
            None => Ok(None),
        }
    }

    /// Change the filter and reload
    pub async fn apply_filter(&self, filter: ListingFilter) -> Result<Option<LoadOutcome>> {
        self.state.lock().filter = filter;
        self.refresh().await
    }

    /// Drop the search text, go back to images only and reload
    pub async fn reset_filters(&self) -> Result<Option<LoadOutcome>> {
        self.apply_filter(ListingFilter {
            images_only: true,
            search_text: None,
        })
        .await
    }

    /// Create a folder in the current folder and select it
    pub async fn create_folder(&self, name: &str) -> Result<PathBuf> {
        let parent = self.current_folder().context("No folder is open")?;
        let name = name.to_string();
        let created = run_blocking(move || operations::create_folder(&parent, &name))
            .await
            .inspect_err(|e| error!("{:#}", e))?;

        self.refresh().await?;
        self.select_item_by_path(&created);
        Ok(created)
    }

    /// Rename the single selected item. `Ok(None)` unless exactly one item is
    /// selected and the name actually changes.
    pub async fn rename_selection(&self, new_name: &str) -> Result<Option<PathBuf>> {
        let selection = self.selection();
        let [item] = selection.as_slice() else {
            return Ok(None);
        };

        let path = item.path().to_path_buf();
        let is_folder = item.is_folder();
        let new_name = new_name.to_string();
        let renamed = run_blocking(move || operations::rename_item(&path, is_folder, &new_name))
            .await
            .inspect_err(|e| error!("{:#}", e))?;

        if let Some(target) = &renamed {
            self.refresh().await?;
            self.select_item_by_path(target);
        }
        Ok(renamed)
    }

    /// Move the selected items into `destination` and reload
    pub async fn move_selection_to(&self, destination: &Path) -> Result<usize> {
        let paths = self.selected_paths();
        if paths.is_empty() {
            return Ok(0);
        }

        let destination = destination.to_path_buf();
        let moved = run_blocking(move || operations::move_items(&paths, &destination))
            .await
            .inspect_err(|e| error!("{:#}", e))?;
        self.refresh().await?;
        Ok(moved)
    }

    /// Move the selected items one level up, next to the current folder
    pub async fn move_selection_to_parent(&self) -> Result<usize> {
        let parent = self
            .current_folder()
            .and_then(|folder| folder.parent().map(Path::to_path_buf));
        match parent {
            Some(parent) => self.move_selection_to(&parent).await,
            None => Ok(0),
        }
    }

    /// Delete the selected files and folders and reload
    pub async fn delete_selection(&self) -> Result<usize> {
        let paths = self.selected_paths();
        if paths.is_empty() {
            return Ok(0);
        }

        let deleted = run_blocking(move || operations::delete_items(&paths))
            .await
            .inspect_err(|e| error!("{:#}", e))?;
        self.refresh().await?;
        Ok(deleted)
    }

    fn selected_paths(&self) -> Vec<PathBuf> {
        self.state
            .lock()
            .selected
            .iter()
            .map(|item| item.path().to_path_buf())
            .collect()
    }

    /// Re-sort the current listing by `column`, flipping direction on a repeated column
    pub fn toggle_sort(&self, column: SortColumn) -> SortState {
        let mut state = self.state.lock();
        state.sort.toggle(column);
        let sort = state.sort;
        sort_items(&mut state.items, sort);
        sort
    }

    /// Replace the selection and publish its photos to the workspace
    pub fn update_selection(&self, selected: Vec<Arc<ListItem>>) {
        let selected_photos = photos_of(&selected);
        let index = {
            let mut state = self.state.lock();
            let photos = photos_of(&state.items);
            let index = selected_photos
                .iter()
                .find_map(|item| photos.iter().position(|photo| Arc::ptr_eq(photo, item)));
            state.selected = selected;
            index
        };
        self.workspace.publish_selection(selected_photos, index);
    }

    /// Select the listed item whose path matches, ignoring case
    pub fn select_item_by_path(&self, path: &Path) -> bool {
        let wanted = path.to_string_lossy().to_lowercase();
        let found = self
            .items()
            .into_iter()
            .find(|item| item.path().to_string_lossy().to_lowercase() == wanted);

        match found {
            Some(item) => {
                self.update_selection(vec![item]);
                true
            }
            None => false,
        }
    }

    /// Move the selection to the next photo. Returns `false` at the end of the list.
    pub fn select_next(&self) -> bool {
        self.step_selection(1)
    }

    pub fn select_previous(&self) -> bool {
        self.step_selection(-1)
    }

    fn step_selection(&self, step: isize) -> bool {
        let (photos, current) = {
            let state = self.state.lock();
            let photos = photos_of(&state.items);
            let current = state
                .selected
                .iter()
                .find_map(|item| photos.iter().position(|photo| Arc::ptr_eq(photo, item)));
            (photos, current)
        };

        let next = match current {
            Some(index) => index.checked_add_signed(step).filter(|i| *i < photos.len()),
            // Nothing selected yet: only stepping forward has a natural start
            None if step > 0 => (!photos.is_empty()).then_some(0),
            None => None,
        };

        match next {
            Some(index) => {
                self.update_selection(vec![Arc::clone(&photos[index])]);
                true
            }
            None => false,
        }
    }
}

fn photos_of(items: &[Arc<ListItem>]) -> Vec<Arc<ListItem>> {
    items.iter().filter(|item| !item.is_folder()).cloned().collect()
}
