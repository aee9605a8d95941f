//! # Price List Editor
//!
//! The list view behind the `edit` command: it loads a page of products and
//! lets every cell be edited inline. Edits are saved per (product, field)
//! after a quiet period, or immediately on Enter, and a failed save puts the
//! cell back to the last value the server accepted.

pub mod error;
pub mod format;
pub mod view;

pub use error::EditorError;
pub use format::format_number;
pub use view::{LoadState, PriceListView, SaveKey, SaveOutcome, SAVE_DEBOUNCE};
