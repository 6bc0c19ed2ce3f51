pub mod history;
pub mod listing;
pub mod operations;
pub mod pane;
pub mod sort;

pub use history::{normalize_path, NavigationHistory, MAX_NAVIGATION_HISTORY};
pub use listing::{breadcrumbs, child_directories, is_image_file, list_folder, BreadcrumbSegment, ListingFilter};
pub use operations::{is_valid_file_name, normalize_rename};
pub use pane::{default_home_folder, FileBrowserPane, LoadOutcome};
pub use sort::{natural_cmp, sort_items, SortColumn, SortDirection, SortState};
