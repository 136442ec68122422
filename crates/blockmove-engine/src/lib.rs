/*!
 * # Block Move Engine
 *
 * Drag-and-drop reordering for block-structured documents. A user picks up
 * one block by its drag handle, drags it over the document, sees a dropline
 * where it will land, and on release the block (with its whole subtree) is
 * moved in a single atomic tree edit.
 *
 * ## Architecture Overview
 *
 * - **`tree`**: `DocumentTree`, the ordered forest of blocks with the atomic
 *   `move_block` primitive, plus markdown outline import/export
 * - **`geometry`**: `Point`/`Rect` and the `BoundsProvider` seam through which
 *   the rendering layer reports block bounds
 * - **`resolver`**: turns pointer geometry into exactly one `DropTarget`
 * - **`session`**: `DragController`, the explicit drag state machine
 *   (`Idle -> Armed -> Dragging -> Committed | Cancelled -> Idle`)
 * - **`selection`**: the outbound call that clears selection when a drag arms
 * - **`indicator`**: projects the current target into a dropline descriptor
 *
 * ## Usage Pattern
 *
 * ```rust
 * use blockmove_engine::*;
 *
 * let mut tree = DocumentTree::from_markdown("- one\n- two\n- three\n").unwrap();
 * let layout = LayoutMap::stacked(&tree, 0.0, 20.0, 16.0);
 * let three = tree.find_text("three").unwrap();
 * let one = tree.find_text("one").unwrap();
 *
 * let mut drag = DragController::new(DragOptions::default(), NoSelection);
 * drag.pointer_down(&tree, &three, true, Point::new(0.0, 50.0)).unwrap();
 * drag.pointer_move(&tree, &layout, Point::new(0.0, 30.0)); // crosses threshold
 * drag.pointer_move(&tree, &layout, Point::new(0.0, 1.0)); // top band of "one"
 * let events = drag.pointer_up(&mut tree);
 *
 * assert!(matches!(events.last(), Some(DragEvent::MoveCommitted { .. })));
 * assert_eq!(tree.roots()[0], three);
 * assert_eq!(tree.roots()[1], one);
 * ```
 *
 * The engine is single-threaded and event driven: the host serialises
 * pointer events into the controller and the tree is mutated exactly once,
 * inside the commit transition. The host must not edit the tree from
 * elsewhere while a drag is live.
 */

pub mod events;
pub mod geometry;
pub mod indicator;
pub mod options;
pub mod resolver;
pub mod selection;
pub mod session;
pub mod tree;

// Re-export key types for easier usage
pub use events::{CancelReason, DragEvent};
pub use geometry::{BoundsError, BoundsProvider, LayoutMap, Point, Rect};
pub use indicator::{Edge, Indicator};
pub use options::DragOptions;
pub use resolver::{DropResolver, hit_test};
pub use selection::{NoSelection, SelectionCoordinator};
pub use session::{
    DragController, DragError, DragPhase, DragSession, DropDecision, DropInterceptor, MoveStep,
    ResolutionRequest,
};
pub use tree::{
    Block, BlockId, BlockKind, DocumentTree, DropTarget, InvalidTarget, MoveError, MoveRecord,
    Position, Relation, TreeError, format_tree,
};
