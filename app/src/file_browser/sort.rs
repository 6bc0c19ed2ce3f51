use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use thumbnail_cache::ListItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum SortColumn {
    #[default]
    Name,
    ModifiedAt,
    Resolution,
    Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortState {
    /// Clicking the current column flips the direction, another column starts ascending
    pub fn toggle(&mut self, column: SortColumn) {
        if self.column == column {
            self.direction = match self.direction {
                SortDirection::Ascending => SortDirection::Descending,
                SortDirection::Descending => SortDirection::Ascending,
            };
        } else {
            self.column = column;
            self.direction = SortDirection::Ascending;
        }
    }
}

/// Case-insensitive "natural" order: `IMG_2` sorts before `IMG_10`
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natord::compare_ignore_case(a, b)
}

/// Folders first, then by the requested column. Non-name columns break ties by name.
pub fn sort_items(items: &mut [Arc<ListItem>], state: SortState) {
    items.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| compare_column(a, b, state))
            .then_with(|| {
                if state.column == SortColumn::Name {
                    Ordering::Equal
                } else {
                    natural_cmp(a.name(), b.name())
                }
            })
    });
}

fn compare_column(a: &ListItem, b: &ListItem, state: SortState) -> Ordering {
    match state.column {
        SortColumn::Name => state.direction.apply(natural_cmp(a.name(), b.name())),
        SortColumn::ModifiedAt => state.direction.apply(a.last_modified().cmp(&b.last_modified())),
        SortColumn::Size => state.direction.apply(a.size_bytes().cmp(&b.size_bytes())),
        // Unknown resolutions stay at the end whichever way we sort
        SortColumn::Resolution => match (pixel_count(a), pixel_count(b)) {
            (Some(x), Some(y)) => state.direction.apply(x.cmp(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

fn pixel_count(item: &ListItem) -> Option<u64> {
    if item.is_folder() {
        return None;
    }
    item.pixel_size().map(|(w, h)| u64::from(w) * u64::from(h))
}
