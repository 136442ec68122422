//! Output events of the drag state machine, returned from each input call.

use crate::tree::{BlockId, DropTarget, MoveError, MoveRecord};

/// Why a drag ended without a move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Escape key
    Escape,
    /// Pointer capture or window focus was lost
    CaptureLost,
    /// Released while no drop target was resolved
    NoTarget,
    /// Host aborted the gesture for its own reasons
    Host,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragEvent {
    /// Pointer travelled past the threshold; the drag preview should show
    DragStarted { block: BlockId },
    /// The resolved target changed; drives the dropline
    DropTargetChanged { target: Option<DropTarget> },
    /// The tree was mutated
    MoveCommitted {
        block: BlockId,
        target: DropTarget,
        record: MoveRecord,
    },
    /// The tree refused the move and is unchanged
    MoveRejected { block: BlockId, reason: MoveError },
    /// A drop interceptor took over the drop; the tree is unchanged
    DropHandled { block: BlockId, target: DropTarget },
    DragCancelled { block: BlockId, reason: CancelReason },
    /// Pressed and released on the handle without dragging
    HandleClicked { block: BlockId },
}
