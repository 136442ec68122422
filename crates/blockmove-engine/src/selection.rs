//! Outbound contract with the host's block-selection subsystem.
//!
//! Selection is invalidated the moment a drag arms. The engine calls
//! [`SelectionCoordinator::reset_selection`] exactly once, on `Idle -> Armed`,
//! and never restores it afterwards: whether to reselect anything after a
//! commit or cancel is the host's call.

/// Host-side selection, as far as dragging needs to know about it
pub trait SelectionCoordinator {
    fn reset_selection(&mut self);
}

/// For hosts without a selection concept
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSelection;

impl SelectionCoordinator for NoSelection {
    fn reset_selection(&mut self) {}
}

impl<T: SelectionCoordinator + ?Sized> SelectionCoordinator for Box<T> {
    fn reset_selection(&mut self) {
        (**self).reset_selection()
    }
}
