//! Dropline projection.
//!
//! Pure mapping from the current [`DropTarget`] to what the renderer should
//! draw: a line on the anchor's top or bottom edge for reordering, a
//! highlighted border for nesting, nothing otherwise.

use serde::{Deserialize, Serialize};

use crate::tree::{BlockId, DropTarget, Relation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Indicator {
    #[default]
    Hidden,
    Dropline {
        anchor: BlockId,
        edge: Edge,
    },
    Highlight {
        anchor: BlockId,
    },
}

impl Indicator {
    pub fn project(target: Option<&DropTarget>) -> Self {
        let Some(target) = target else {
            return Indicator::Hidden;
        };
        let anchor = target.anchor.clone();
        match target.relation {
            Relation::Before => Indicator::Dropline {
                anchor,
                edge: Edge::Top,
            },
            Relation::After => Indicator::Dropline {
                anchor,
                edge: Edge::Bottom,
            },
            Relation::InsertInto => Indicator::Highlight { anchor },
        }
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, Indicator::Hidden)
    }

    pub fn anchor(&self) -> Option<&BlockId> {
        match self {
            Indicator::Hidden => None,
            Indicator::Dropline { anchor, .. } | Indicator::Highlight { anchor } => Some(anchor),
        }
    }

    /// Edge for a dropline; `None` for highlights and hidden indicators
    pub fn edge(&self) -> Option<Edge> {
        match self {
            Indicator::Dropline { edge, .. } => Some(*edge),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Relation::Before, Some(Edge::Top))]
    #[case(Relation::After, Some(Edge::Bottom))]
    #[case(Relation::InsertInto, None)]
    fn test_projection(#[case] relation: Relation, #[case] edge: Option<Edge>) {
        let target = DropTarget {
            anchor: BlockId::new("anchor"),
            relation,
            index: 0,
            depth: 0,
        };

        let indicator = Indicator::project(Some(&target));

        assert!(indicator.is_visible());
        assert_eq!(indicator.anchor(), Some(&BlockId::new("anchor")));
        assert_eq!(indicator.edge(), edge);
    }

    #[test]
    fn test_no_target_is_hidden() {
        let indicator = Indicator::project(None);

        assert_eq!(indicator, Indicator::Hidden);
        assert!(!indicator.is_visible());
        assert_eq!(indicator.anchor(), None);
    }
}
