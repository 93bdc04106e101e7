//! Cosmetic board-view preferences. Not part of the session; clearing the
//! session leaves them in place.

use std::sync::Arc;

use crate::auth::KeyValueStore;
use crate::models::ViewMode;

const SELECTED_BOARD_KEY: &str = "selectedBoardId";
const VIEW_MODE_KEY: &str = "boardViewMode";

pub struct Preferences {
    storage: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn selected_board(&self) -> Option<i64> {
        self.storage.get(SELECTED_BOARD_KEY)?.parse().ok()
    }

    pub fn set_selected_board(&self, board_id: i64) {
        self.storage.set(SELECTED_BOARD_KEY, &board_id.to_string());
    }

    pub fn view_mode(&self) -> ViewMode {
        self.storage
            .get(VIEW_MODE_KEY)
            .and_then(|v| ViewMode::parse(&v))
            .unwrap_or_default()
    }

    pub fn set_view_mode(&self, mode: ViewMode) {
        self.storage.set(VIEW_MODE_KEY, mode.as_str());
    }
}
