//! Turning a graph plus view state into visible rows

pub mod expansion;
pub mod filter;
pub mod rows;
pub mod snapshot;
pub mod stats;

pub use expansion::{ExpandKey, ExpansionState};
pub use filter::{Filter, Matcher, ViewMode};
pub use rows::{RowFacts, TreeRow, recalc_visible_rows, row_facts};
pub use snapshot::{Focus, Snapshot, ViewState, capture, relocate, restore};
pub use stats::Stats;
