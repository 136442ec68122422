//! # Drag Session State Machine
//!
//! One gesture at a time, as an explicit finite state machine:
//!
//! ```text
//! Idle --down on handle--> Armed --move past threshold--> Dragging
//! Armed --up--> Idle                          (a click, reported to the host)
//! Dragging --move--> Dragging                 (re-resolve, bump sequence)
//! Dragging --up with target--> Committed --> Idle   (or Cancelled if rejected)
//! Dragging --up without target / cancel--> Cancelled --> Idle
//! ```
//!
//! `Committed` and `Cancelled` are transient: the session is dropped and the
//! controller is back to `Idle` before the input call returns. Each input
//! call returns the [`DragEvent`]s it produced, in order.

use log::{debug, warn};

use crate::events::{CancelReason, DragEvent};
use crate::geometry::{BoundsProvider, Point};
use crate::indicator::Indicator;
use crate::options::DragOptions;
use crate::resolver::DropResolver;
use crate::selection::SelectionCoordinator;
use crate::tree::{BlockId, DocumentTree, DropTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Armed,
    Dragging,
    Committed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DragError {
    #[error("a drag of block {active} is already in progress")]
    SessionBusy { active: BlockId },
    #[error("block {0} is not part of the document")]
    UnknownBlock(BlockId),
}

/// State of the live gesture; owned by the controller, never persisted
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    block: BlockId,
    origin: Point,
    pointer: Point,
    target: Option<DropTarget>,
    seq: u64,
}

impl DragSession {
    fn new(block: BlockId, origin: Point) -> Self {
        Self {
            block,
            origin,
            pointer: origin,
            target: None,
            seq: 0,
        }
    }

    /// The dragged block; its subtree travels with it
    pub fn block(&self) -> &BlockId {
        &self.block
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn pointer(&self) -> Point {
        self.pointer
    }

    pub fn target(&self) -> Option<&DropTarget> {
        self.target.as_ref()
    }

    /// Sequence number of the latest pointer move
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// A resolution the host may run elsewhere and hand back with
/// [`DragController::deliver_resolution`]
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionRequest {
    pub seq: u64,
    pub block: BlockId,
    pub pointer: Point,
}

/// Outcome of a deferred pointer move
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveStep {
    pub events: Vec<DragEvent>,
    pub request: Option<ResolutionRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropDecision {
    /// Fall through to the default tree move
    Continue,
    /// The interceptor performed the drop itself
    Handled,
}

/// Hook consulted on release, before the default move
pub trait DropInterceptor {
    fn on_drop(&mut self, tree: &DocumentTree, block: &BlockId, target: &DropTarget)
    -> DropDecision;
}

impl<F> DropInterceptor for F
where
    F: FnMut(&DocumentTree, &BlockId, &DropTarget) -> DropDecision,
{
    fn on_drop(
        &mut self,
        tree: &DocumentTree,
        block: &BlockId,
        target: &DropTarget,
    ) -> DropDecision {
        self(tree, block, target)
    }
}

/// Drives one drag gesture at a time against a [`DocumentTree`]
pub struct DragController<S> {
    resolver: DropResolver,
    selection: S,
    interceptor: Option<Box<dyn DropInterceptor>>,
    phase: DragPhase,
    session: Option<DragSession>,
}

impl<S: SelectionCoordinator> DragController<S> {
    pub fn new(options: DragOptions, selection: S) -> Self {
        Self {
            resolver: DropResolver::new(options),
            selection,
            interceptor: None,
            phase: DragPhase::Idle,
            session: None,
        }
    }

    /// Install a hook that may take over drops before the default move
    pub fn with_interceptor(mut self, interceptor: impl DropInterceptor + 'static) -> Self {
        self.interceptor = Some(Box::new(interceptor));
        self
    }

    pub fn options(&self) -> &DragOptions {
        self.resolver.options()
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Block being dragged, once the gesture is past the threshold
    pub fn dragged_block(&self) -> Option<&BlockId> {
        match self.phase {
            DragPhase::Dragging => self.session.as_ref().map(DragSession::block),
            _ => None,
        }
    }

    /// Dropline for the current tick; hidden whenever no drag is live
    pub fn indicator(&self) -> Indicator {
        match self.phase {
            DragPhase::Dragging => {
                Indicator::project(self.session.as_ref().and_then(DragSession::target))
            }
            _ => Indicator::Hidden,
        }
    }

    pub fn selection(&self) -> &S {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut S {
        &mut self.selection
    }

    /// Pointer pressed on `block`. Presses off the handle are ignored.
    pub fn pointer_down(
        &mut self,
        tree: &DocumentTree,
        block: &BlockId,
        on_handle: bool,
        at: Point,
    ) -> Result<(), DragError> {
        if !on_handle {
            return Ok(());
        }
        if let Some(active) = &self.session {
            return Err(DragError::SessionBusy {
                active: active.block.clone(),
            });
        }
        if !tree.contains(block) {
            return Err(DragError::UnknownBlock(block.clone()));
        }

        self.selection.reset_selection();
        self.session = Some(DragSession::new(block.clone(), at));
        self.transition(DragPhase::Armed);
        Ok(())
    }

    /// Pointer moved; resolution runs inline against `layout`
    pub fn pointer_move<L: BoundsProvider + ?Sized>(
        &mut self,
        tree: &DocumentTree,
        layout: &L,
        at: Point,
    ) -> Vec<DragEvent> {
        let MoveStep {
            mut events,
            request,
        } = self.pointer_move_deferred(at);

        if let Some(request) = request {
            let target = self
                .resolver
                .resolve(tree, layout, &request.block, request.pointer);
            events.extend(self.deliver_resolution(request.seq, target));
        }
        events
    }

    /// Pointer moved; when dragging, hand back a request instead of resolving
    pub fn pointer_move_deferred(&mut self, at: Point) -> MoveStep {
        let threshold = self.options().threshold;
        let Some(session) = self.session.as_mut() else {
            return MoveStep::default();
        };
        session.pointer = at;

        match self.phase {
            DragPhase::Armed => {
                if session.origin.distance(at) <= threshold {
                    return MoveStep::default();
                }
                let block = session.block.clone();
                self.transition(DragPhase::Dragging);
                MoveStep {
                    events: vec![DragEvent::DragStarted { block }],
                    request: None,
                }
            }
            DragPhase::Dragging => {
                session.seq += 1;
                MoveStep {
                    events: Vec::new(),
                    request: Some(ResolutionRequest {
                        seq: session.seq,
                        block: session.block.clone(),
                        pointer: at,
                    }),
                }
            }
            _ => MoveStep::default(),
        }
    }

    /// Apply a resolution result; results for an older move are dropped
    pub fn deliver_resolution(&mut self, seq: u64, target: Option<DropTarget>) -> Vec<DragEvent> {
        if self.phase != DragPhase::Dragging {
            return Vec::new();
        }
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        if seq != session.seq {
            debug!("discarding stale resolution #{seq}, current is #{}", session.seq);
            return Vec::new();
        }
        if session.target == target {
            return Vec::new();
        }

        session.target = target.clone();
        vec![DragEvent::DropTargetChanged { target }]
    }

    /// Pointer released: commit, reject, cancel, or report a click
    pub fn pointer_up(&mut self, tree: &mut DocumentTree) -> Vec<DragEvent> {
        match self.phase {
            DragPhase::Armed => {
                let Some(session) = self.session.take() else {
                    return Vec::new();
                };
                self.transition(DragPhase::Idle);
                vec![DragEvent::HandleClicked {
                    block: session.block,
                }]
            }
            DragPhase::Dragging => self.release(tree),
            _ => Vec::new(),
        }
    }

    /// Explicit cancel (escape, lost capture). Never touches the tree.
    pub fn cancel(&mut self, reason: CancelReason) -> Vec<DragEvent> {
        if !matches!(self.phase, DragPhase::Armed | DragPhase::Dragging) {
            return Vec::new();
        }
        let Some(session) = self.session.take() else {
            return Vec::new();
        };

        let mut events = Vec::new();
        if session.target.is_some() {
            events.push(DragEvent::DropTargetChanged { target: None });
        }
        events.push(DragEvent::DragCancelled {
            block: session.block,
            reason,
        });
        self.finish(DragPhase::Cancelled);
        events
    }

    fn release(&mut self, tree: &mut DocumentTree) -> Vec<DragEvent> {
        let Some(session) = self.session.take() else {
            return Vec::new();
        };
        let block = session.block;

        let Some(target) = session.target else {
            self.finish(DragPhase::Cancelled);
            return vec![DragEvent::DragCancelled {
                block,
                reason: CancelReason::NoTarget,
            }];
        };

        let mut events = vec![DragEvent::DropTargetChanged { target: None }];

        if let Some(interceptor) = self.interceptor.as_mut()
            && interceptor.on_drop(tree, &block, &target) == DropDecision::Handled
        {
            debug!("drop of {block} handled by interceptor");
            events.push(DragEvent::DropHandled { block, target });
            self.finish(DragPhase::Committed);
            return events;
        }

        match tree.move_block(&block, &target) {
            Ok(record) => {
                debug!(
                    "moved {block} from {:?} to {:?}",
                    record.from, record.to
                );
                events.push(DragEvent::MoveCommitted {
                    block,
                    target,
                    record,
                });
                self.finish(DragPhase::Committed);
            }
            Err(reason) => {
                warn!("rejected move of {block}: {reason}");
                events.push(DragEvent::MoveRejected { block, reason });
                self.finish(DragPhase::Cancelled);
            }
        }
        events
    }

    /// Pass through a terminal phase back to `Idle`
    fn finish(&mut self, terminal: DragPhase) {
        self.session = None;
        self.transition(terminal);
        self.transition(DragPhase::Idle);
    }

    fn transition(&mut self, to: DragPhase) {
        debug!("drag phase {:?} -> {:?}", self.phase, to);
        self.phase = to;
    }
}
