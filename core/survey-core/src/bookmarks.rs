//! Named surface bookmarks on a body.
//!
//! Bookmarks group positions under a name. Two positions under the same name
//! must stay at least [`MIN_BOOKMARK_SEPARATION_M`] apart; an add that would
//! break that is rejected. Empty groups are removed and an empty map
//! collapses to `None`.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::annotations::BodyRecord;
use crate::geo::LatLong;

pub const MIN_BOOKMARK_SEPARATION_M: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookmarkOutcome {
    Added,
    TooClose,
}

impl BodyRecord {
    pub fn add_bookmark(&mut self, name: &str, position: LatLong, radius: f64) -> BookmarkOutcome {
        let too_close = self
            .bookmarks
            .as_ref()
            .and_then(|groups| groups.get(name))
            .map(|existing| {
                existing
                    .iter()
                    .any(|prior| prior.distance_to(&position, radius) < MIN_BOOKMARK_SEPARATION_M)
            })
            .unwrap_or(false);
        if too_close {
            info!(name, body = %self.name, "Bookmark too close to an existing one");
            return BookmarkOutcome::TooClose;
        }

        info!(name, body = %self.name, %position, "Adding bookmark");
        self.bookmarks
            .get_or_insert_with(Default::default)
            .entry(name.to_string())
            .or_default()
            .push(position);
        BookmarkOutcome::Added
    }

    /// Removes the position under `name` nearest to (or farthest from)
    /// `position` and returns it.
    pub fn remove_bookmark(
        &mut self,
        name: &str,
        position: LatLong,
        radius: f64,
        prefer_nearest: bool,
    ) -> Option<LatLong> {
        let group = self.bookmarks.as_mut()?.get_mut(name)?;

        let distances = group
            .iter()
            .enumerate()
            .map(|(index, prior)| (index, prior.distance_to(&position, radius)));
        let victim = if prefer_nearest {
            distances.min_by(|a, b| a.1.total_cmp(&b.1))
        } else {
            distances.max_by(|a, b| a.1.total_cmp(&b.1))
        }
        .map(|(index, _)| index)?;

        let removed = group.remove(victim);
        info!(name, body = %self.name, position = %removed, "Removed bookmark");
        self.collapse_empty();
        Some(removed)
    }

    /// Drops every position under `name`. Returns false if there were none.
    pub fn remove_bookmark_name(&mut self, name: &str) -> bool {
        let removed = self
            .bookmarks
            .as_mut()
            .map(|groups| groups.remove(name).is_some())
            .unwrap_or(false);
        self.collapse_empty();
        removed
    }

    pub fn clear_bookmarks(&mut self) {
        self.bookmarks = None;
    }

    fn collapse_empty(&mut self) {
        if let Some(groups) = self.bookmarks.as_mut() {
            groups.retain(|_, positions| !positions.is_empty());
            if groups.is_empty() {
                self.bookmarks = None;
            }
        }
    }
}
