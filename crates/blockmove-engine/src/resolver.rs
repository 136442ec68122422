//! # Drop Position Resolver
//!
//! Maps a pointer position onto exactly one [`DropTarget`], or none when the
//! pointer is outside every droppable block.
//!
//! 1. Among blocks whose bounds contain the pointer's y, take the deepest;
//!    equal depth falls back to document order.
//! 2. Split that block vertically: for a container block (when nesting is
//!    allowed) the top and bottom `edge_band` reorder and the middle nests;
//!    otherwise the midpoint splits before/after, and an exact tie is after.
//! 3. Refuse the dragged block and anything inside it.
//! 4. Translate anchor + relation into a sibling index from the live tree.

use log::trace;

use crate::geometry::{BoundsProvider, Point, Rect};
use crate::options::DragOptions;
use crate::tree::{BlockId, DocumentTree, DropTarget, Relation};

#[derive(Debug, Clone, Default)]
pub struct DropResolver {
    options: DragOptions,
}

impl DropResolver {
    pub fn new(options: DragOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DragOptions {
        &self.options
    }

    /// Resolve the drop target for `dragged` with the pointer at `pointer`
    pub fn resolve<L: BoundsProvider + ?Sized>(
        &self,
        tree: &DocumentTree,
        layout: &L,
        dragged: &BlockId,
        pointer: Point,
    ) -> Option<DropTarget> {
        let (anchor, rect) = deepest_under(tree, layout, pointer)?;

        if tree.is_descendant(dragged, &anchor) {
            trace!("pointer over dragged subtree at {anchor}, no target");
            return None;
        }

        let nestable = tree
            .get(&anchor)
            .is_some_and(|block| block.kind.accepts_children());
        let relation = self.relation_for(rect, pointer.y, nestable);

        match tree.target_for(&anchor, relation) {
            Ok(target) => {
                trace!(
                    "resolved {:?} {} at index {}",
                    target.relation, target.anchor, target.index
                );
                Some(target)
            }
            Err(error) => {
                trace!("no target at {anchor}: {error}");
                None
            }
        }
    }

    /// Pick before/after/into from where `y` falls inside `rect`
    pub fn relation_for(&self, rect: Rect, y: f32, nestable: bool) -> Relation {
        let offset = y - rect.top();
        let band = self.options.clamped_edge_band();

        if nestable && self.options.allow_nesting && band < 0.5 {
            let edge = rect.height * band;
            if offset < edge {
                Relation::Before
            } else if offset > rect.height - edge {
                Relation::After
            } else {
                Relation::InsertInto
            }
        } else if offset < rect.height / 2.0 {
            Relation::Before
        } else {
            Relation::After
        }
    }
}

/// Deepest block under the pointer, for hover feedback such as showing a
/// drag handle only on the hovered block
pub fn hit_test<L: BoundsProvider + ?Sized>(
    tree: &DocumentTree,
    layout: &L,
    pointer: Point,
) -> Option<BlockId> {
    deepest_under(tree, layout, pointer).map(|(id, _)| id)
}

fn deepest_under<L: BoundsProvider + ?Sized>(
    tree: &DocumentTree,
    layout: &L,
    pointer: Point,
) -> Option<(BlockId, Rect)> {
    let mut best: Option<(&BlockId, Rect, usize)> = None;

    for block in tree.document_order() {
        let rect = match tree.bounds(layout, &block.id) {
            Ok(rect) => rect,
            Err(error) => {
                // Not laid out right now, so not droppable this tick
                trace!("skipping candidate: {error}");
                continue;
            }
        };
        if !rect.contains_y(pointer.y) {
            continue;
        }

        let depth = tree.depth(&block.id).unwrap_or(0);
        if best.as_ref().is_none_or(|(_, _, best_depth)| depth > *best_depth) {
            best = Some((&block.id, rect, depth));
        }
    }

    best.map(|(id, rect, _)| (id.clone(), rect))
}
