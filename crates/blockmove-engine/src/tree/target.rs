use serde::{Deserialize, Serialize};

use super::BlockId;

/// Where a dropped block lands relative to its anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Sibling immediately above the anchor
    Before,
    /// Sibling immediately below the anchor
    After,
    /// Last child of the anchor (re-parenting)
    InsertInto,
}

/// A resolved drop location.
///
/// `index` is a gap index into the destination sibling list as it stands
/// *before* the move: `Before` uses the anchor's index, `After` the anchor's
/// index plus one, `InsertInto` the anchor's child count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DropTarget {
    pub anchor: BlockId,
    pub relation: Relation,
    pub index: usize,
    /// Nesting depth of the landing position (0 = top level)
    pub depth: usize,
}
