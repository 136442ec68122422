//! End-to-end drag gestures driven through the public API, with synthetic
//! geometry standing in for the renderer.

use std::cell::Cell;
use std::rc::Rc;

use blockmove_engine::*;
use pretty_assertions::assert_eq;

const ROW: f32 = 20.0;

/// Counts resets so tests can check the selection contract
#[derive(Default)]
struct CountingSelection {
    resets: usize,
}

impl SelectionCoordinator for CountingSelection {
    fn reset_selection(&mut self) {
        self.resets += 1;
    }
}

/// Paragraphs `a`, `b`, `c`, `d` stacked top to bottom
fn paragraphs() -> DocumentTree {
    let mut tree = DocumentTree::new();
    for id in ["a", "b", "c", "d"] {
        tree.insert(None, usize::MAX, id.into(), BlockKind::Paragraph, id)
            .unwrap();
    }
    tree
}

/// `a` with children `a1`, `a2`; then `b`
fn outline() -> DocumentTree {
    DocumentTree::from_markdown_with_ids("- a\n  - a1\n  - a2\n- b\n", {
        let mut names = ["a", "a1", "a2", "b"].into_iter();
        move || BlockId::new(names.next().unwrap_or("extra"))
    })
    .unwrap()
}

fn layout(tree: &DocumentTree) -> LayoutMap {
    LayoutMap::stacked(tree, 0.0, ROW, 10.0)
}

fn controller() -> DragController<CountingSelection> {
    DragController::new(DragOptions::default(), CountingSelection::default())
}

fn roots(tree: &DocumentTree) -> Vec<&str> {
    tree.roots().iter().map(BlockId::as_str).collect()
}

fn row(index: usize, fraction: f32) -> Point {
    Point::new(40.0, (index as f32 + fraction) * ROW)
}

#[test]
fn test_drag_before_sibling_commits() {
    let mut tree = paragraphs();
    let layout = layout(&tree);
    let mut drag = controller();
    let d = BlockId::new("d");

    drag.pointer_down(&tree, &d, true, row(3, 0.5)).unwrap();
    assert_eq!(drag.phase(), DragPhase::Armed);
    assert_eq!(drag.selection().resets, 1);

    let started = drag.pointer_move(&tree, &layout, Point::new(90.0, 70.0));
    assert_eq!(started, vec![DragEvent::DragStarted { block: d.clone() }]);
    assert_eq!(drag.phase(), DragPhase::Dragging);
    assert_eq!(drag.dragged_block(), Some(&d));

    // Top half of `b`
    let changed = drag.pointer_move(&tree, &layout, row(1, 0.2));
    let expected_target = DropTarget {
        anchor: "b".into(),
        relation: Relation::Before,
        index: 1,
        depth: 0,
    };
    assert_eq!(
        changed,
        vec![DragEvent::DropTargetChanged {
            target: Some(expected_target.clone()),
        }]
    );
    assert_eq!(
        drag.indicator(),
        Indicator::Dropline {
            anchor: "b".into(),
            edge: Edge::Top,
        }
    );

    let events = drag.pointer_up(&mut tree);

    assert_eq!(roots(&tree), vec!["a", "d", "b", "c"]);
    assert_eq!(
        events,
        vec![
            DragEvent::DropTargetChanged { target: None },
            DragEvent::MoveCommitted {
                block: d.clone(),
                target: expected_target,
                record: MoveRecord {
                    block: d,
                    from: Position {
                        parent: None,
                        index: 3,
                    },
                    to: Position {
                        parent: None,
                        index: 1,
                    },
                },
            },
        ]
    );
    assert_eq!(drag.phase(), DragPhase::Idle);
    assert_eq!(drag.indicator(), Indicator::Hidden);
    assert_eq!(drag.selection().resets, 1);
    tree.validate().unwrap();
}

#[test]
fn test_small_moves_stay_armed_and_release_is_a_click() {
    let mut tree = paragraphs();
    let layout = layout(&tree);
    let mut drag = controller();
    let before = tree.clone();

    drag.pointer_down(&tree, &"b".into(), true, Point::new(10.0, 30.0))
        .unwrap();
    let events = drag.pointer_move(&tree, &layout, Point::new(13.0, 34.0));

    assert!(events.is_empty());
    assert_eq!(drag.phase(), DragPhase::Armed);
    assert_eq!(
        drag.pointer_up(&mut tree),
        vec![DragEvent::HandleClicked { block: "b".into() }]
    );
    assert_eq!(drag.phase(), DragPhase::Idle);
    assert_eq!(tree, before);
}

#[test]
fn test_escape_cancels_without_mutation() {
    let mut tree = paragraphs();
    let layout = layout(&tree);
    let mut drag = controller();
    let before = tree.clone();

    drag.pointer_down(&tree, &"a".into(), true, row(0, 0.5))
        .unwrap();
    drag.pointer_move(&tree, &layout, row(2, 0.5));
    let moved = drag.pointer_move(&tree, &layout, row(3, 0.9));
    assert_eq!(moved.len(), 1);

    let events = drag.cancel(CancelReason::Escape);

    assert_eq!(
        events,
        vec![
            DragEvent::DropTargetChanged { target: None },
            DragEvent::DragCancelled {
                block: "a".into(),
                reason: CancelReason::Escape,
            },
        ]
    );
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, DragEvent::MoveCommitted { .. }))
    );
    assert_eq!(drag.phase(), DragPhase::Idle);
    assert_eq!(drag.indicator(), Indicator::Hidden);

    // A late release after the cancel is a no-op
    assert!(drag.pointer_up(&mut tree).is_empty());
    assert_eq!(tree, before);
}

#[test]
fn test_release_without_target_cancels() {
    let mut tree = paragraphs();
    let layout = layout(&tree);
    let mut drag = controller();
    let before = tree.clone();

    drag.pointer_down(&tree, &"a".into(), true, row(0, 0.5))
        .unwrap();
    drag.pointer_move(&tree, &layout, row(9, 0.5));
    assert!(drag.pointer_move(&tree, &layout, row(10, 0.5)).is_empty());

    assert_eq!(
        drag.pointer_up(&mut tree),
        vec![DragEvent::DragCancelled {
            block: "a".into(),
            reason: CancelReason::NoTarget,
        }]
    );
    assert_eq!(tree, before);
}

#[test]
fn test_second_press_while_busy_is_rejected() {
    let mut tree = paragraphs();
    let layout = layout(&tree);
    let mut drag = controller();

    drag.pointer_down(&tree, &"a".into(), true, row(0, 0.5))
        .unwrap();

    assert_eq!(
        drag.pointer_down(&tree, &"c".into(), true, row(2, 0.5)),
        Err(DragError::SessionBusy { active: "a".into() })
    );
    assert_eq!(drag.phase(), DragPhase::Armed);
    assert_eq!(drag.session().map(DragSession::block), Some(&"a".into()));
    assert_eq!(drag.selection().resets, 1);

    // The first gesture still completes normally
    drag.pointer_move(&tree, &layout, row(2, 0.5));
    drag.pointer_move(&tree, &layout, row(3, 0.9));
    let events = drag.pointer_up(&mut tree);

    assert!(matches!(events.last(), Some(DragEvent::MoveCommitted { .. })));
    assert_eq!(roots(&tree), vec!["b", "c", "d", "a"]);
}

#[test]
fn test_press_off_handle_is_ignored() {
    let tree = paragraphs();
    let mut drag = controller();

    drag.pointer_down(&tree, &"a".into(), false, row(0, 0.5))
        .unwrap();

    assert_eq!(drag.phase(), DragPhase::Idle);
    assert_eq!(drag.selection().resets, 0);
}

#[test]
fn test_press_on_unknown_block_fails() {
    let tree = paragraphs();
    let mut drag = controller();

    assert_eq!(
        drag.pointer_down(&tree, &"ghost".into(), true, row(0, 0.5)),
        Err(DragError::UnknownBlock("ghost".into()))
    );
    assert_eq!(drag.phase(), DragPhase::Idle);
}

#[test]
fn test_drop_into_own_child_is_never_offered() {
    let mut tree = outline();
    let layout = layout(&tree);
    let mut drag = controller();
    let before = tree.clone();

    // Rows: a, a1, a2, b
    drag.pointer_down(&tree, &"a".into(), true, row(0, 0.5))
        .unwrap();
    drag.pointer_move(&tree, &layout, row(1, 0.5));
    let events = drag.pointer_move(&tree, &layout, row(2, 0.5));

    assert!(events.is_empty());
    assert_eq!(drag.indicator(), Indicator::Hidden);
    drag.pointer_up(&mut tree);
    assert_eq!(tree, before);
}

#[test]
fn test_stale_target_is_rejected_on_commit() {
    let mut tree = outline();
    let mut drag = controller();
    let before = tree.clone();

    drag.pointer_down(&tree, &"a".into(), true, row(0, 0.5))
        .unwrap();
    drag.pointer_move_deferred(row(3, 0.5));
    let step = drag.pointer_move_deferred(row(3, 0.5));
    let request = step.request.unwrap();

    // A resolver working from an outdated view offers a target inside `a`
    let bad = DropTarget {
        anchor: "a2".into(),
        relation: Relation::InsertInto,
        index: 0,
        depth: 2,
    };
    drag.deliver_resolution(request.seq, Some(bad));
    let events = drag.pointer_up(&mut tree);

    assert_eq!(
        events.last(),
        Some(&DragEvent::MoveRejected {
            block: "a".into(),
            reason: MoveError::InvalidTarget(InvalidTarget::AnchorInsideDragged("a2".into())),
        })
    );
    assert_eq!(drag.phase(), DragPhase::Idle);
    assert_eq!(tree, before);
}

#[test]
fn test_nesting_into_list_item() {
    let mut tree = outline();
    let layout = layout(&tree);
    let mut drag = controller();

    drag.pointer_down(&tree, &"b".into(), true, row(3, 0.5))
        .unwrap();
    drag.pointer_move(&tree, &layout, row(2, 0.9));
    // Middle band of `a1`
    drag.pointer_move(&tree, &layout, row(1, 0.5));
    assert_eq!(
        drag.indicator(),
        Indicator::Highlight {
            anchor: "a1".into()
        }
    );

    drag.pointer_up(&mut tree);

    insta::assert_snapshot!(format_tree(&tree), @r#"
    a ListItem "a"
      a1 ListItem "a1"
        b ListItem "b"
      a2 ListItem "a2"
    "#);
    tree.validate().unwrap();
}

#[test]
fn test_out_of_order_resolutions_are_discarded() {
    let tree = paragraphs();
    let layout = layout(&tree);
    let mut drag = controller();
    let resolver = DropResolver::default();
    let a = BlockId::new("a");

    drag.pointer_down(&tree, &a, true, row(0, 0.5)).unwrap();
    drag.pointer_move_deferred(row(2, 0.5));

    let older = drag.pointer_move_deferred(row(1, 0.9)).request.unwrap();
    let newer = drag.pointer_move_deferred(row(3, 0.9)).request.unwrap();
    assert!(newer.seq > older.seq);

    let newest_target = resolver.resolve(&tree, &layout, &a, newer.pointer);
    let events = drag.deliver_resolution(newer.seq, newest_target.clone());
    assert_eq!(events.len(), 1);

    // The older result arrives late and must not overwrite the newer one
    let stale_target = resolver.resolve(&tree, &layout, &a, older.pointer);
    assert!(drag.deliver_resolution(older.seq, stale_target).is_empty());
    assert_eq!(
        drag.session().and_then(DragSession::target),
        newest_target.as_ref()
    );
}

#[test]
fn test_unchanged_target_emits_nothing() {
    let tree = paragraphs();
    let layout = layout(&tree);
    let mut drag = controller();

    drag.pointer_down(&tree, &"a".into(), true, row(0, 0.5))
        .unwrap();
    drag.pointer_move(&tree, &layout, row(2, 0.5));

    assert_eq!(drag.pointer_move(&tree, &layout, row(2, 0.1)).len(), 1);
    assert!(drag.pointer_move(&tree, &layout, row(2, 0.2)).is_empty());
}

#[test]
fn test_interceptor_can_take_over_the_drop() {
    let mut tree = paragraphs();
    let layout = layout(&tree);
    let seen = Rc::new(Cell::new(0));
    let calls = Rc::clone(&seen);
    let mut drag = controller().with_interceptor(
        move |_: &DocumentTree, _: &BlockId, target: &DropTarget| {
            calls.set(calls.get() + 1);
            if target.anchor.as_str() == "a" {
                DropDecision::Handled
            } else {
                DropDecision::Continue
            }
        },
    );
    let before = tree.clone();

    drag.pointer_down(&tree, &"c".into(), true, row(2, 0.5))
        .unwrap();
    drag.pointer_move(&tree, &layout, row(1, 0.5));
    drag.pointer_move(&tree, &layout, row(0, 0.1));
    let events = drag.pointer_up(&mut tree);

    assert_eq!(seen.get(), 1);
    assert!(matches!(
        events.last(),
        Some(DragEvent::DropHandled { block, .. }) if block.as_str() == "c"
    ));
    assert_eq!(tree, before);

    // Anything else falls through to the normal move
    drag.pointer_down(&tree, &"c".into(), true, row(2, 0.5))
        .unwrap();
    drag.pointer_move(&tree, &layout, row(1, 0.5));
    drag.pointer_move(&tree, &layout, row(3, 0.9));
    let events = drag.pointer_up(&mut tree);

    assert_eq!(seen.get(), 2);
    assert!(matches!(events.last(), Some(DragEvent::MoveCommitted { .. })));
    assert_eq!(roots(&tree), vec!["a", "b", "d", "c"]);
}

#[test]
fn test_cancel_from_armed_and_when_idle() {
    let tree = paragraphs();
    let mut drag = controller();

    assert!(drag.cancel(CancelReason::CaptureLost).is_empty());

    drag.pointer_down(&tree, &"a".into(), true, row(0, 0.5))
        .unwrap();
    assert_eq!(
        drag.cancel(CancelReason::CaptureLost),
        vec![DragEvent::DragCancelled {
            block: "a".into(),
            reason: CancelReason::CaptureLost,
        }]
    );
    assert_eq!(drag.phase(), DragPhase::Idle);
    assert!(drag.session().is_none());
}

#[test]
fn test_drag_onto_own_position_leaves_order() {
    let mut tree = paragraphs();
    let layout = layout(&tree);
    let mut drag = controller();
    let before = tree.clone();

    drag.pointer_down(&tree, &"b".into(), true, row(1, 0.5))
        .unwrap();
    drag.pointer_move(&tree, &layout, row(2, 0.1));
    // Bottom half of `a`: after `a` is where `b` already is
    drag.pointer_move(&tree, &layout, row(0, 0.8));
    let events = drag.pointer_up(&mut tree);

    match events.last() {
        Some(DragEvent::MoveCommitted { record, .. }) => assert!(record.is_noop()),
        other => panic!("expected a commit, got {other:?}"),
    }
    assert_eq!(tree, before);
}
