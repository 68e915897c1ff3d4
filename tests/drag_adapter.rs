mod support;

use std::time::Duration;

use weekboard::drag::{Container, DragAdapter, DropLine, DropTarget};
use weekboard::model::TaskId;
use weekboard::reorder::{MoveKind, Side};

use support::{archived_task, day, ids, open_board, task, FakeBackend};

const DEBOUNCE: Duration = Duration::from_millis(1000);

fn id(value: &str) -> TaskId {
    TaskId::from(value)
}

#[tokio::test(start_paused = true)]
async fn drag_start_rejects_unknown_task() {
    let backend = FakeBackend::new(vec![task("a", 1, 1000)], vec![]);
    let mut drag = DragAdapter::new(open_board(backend, DEBOUNCE).await);

    assert!(!drag.drag_start(&id("ghost")));
    assert!(drag.active().is_none());

    assert!(drag.drag_start(&id("a")));
    let active = drag.active().expect("active drag");
    assert_eq!(active.origin, Container::Day(day(1)));
}

#[tokio::test(start_paused = true)]
async fn hovering_a_task_draws_the_drop_line() {
    let backend = FakeBackend::new(
        vec![task("a", 1, 1000), task("b", 1, 2000), task("c", 1, 3000)],
        vec![],
    );
    let mut drag = DragAdapter::new(open_board(backend, DEBOUNCE).await);
    drag.drag_start(&id("c"));

    drag.drag_over(Some(DropTarget::Task(id("a"))));
    assert_eq!(
        drag.drop_line(),
        Some(&DropLine {
            target: DropTarget::Task(id("a")),
            side: Some(Side::Before),
        })
    );

    drag.drag_over(Some(DropTarget::Task(id("c"))));
    assert!(drag.drop_line().is_none());

    drag.drag_over(None);
    assert!(drag.drop_line().is_none());
}

#[tokio::test(start_paused = true)]
async fn crossing_days_coalesces_into_one_sync() {
    let backend = FakeBackend::new(vec![task("a", 1, 1000), task("b", 4, 1000)], vec![]);
    let mut drag = DragAdapter::new(open_board(backend.clone(), DEBOUNCE).await);
    drag.drag_start(&id("a"));

    drag.drag_over(Some(DropTarget::Container(Container::Day(day(2)))));
    assert_eq!(ids(&drag.board().day(day(2))), vec!["a"]);
    drag.drag_over(Some(DropTarget::Container(Container::Day(day(3)))));
    assert!(drag.board().day(day(2)).is_empty());
    drag.drag_over(Some(DropTarget::Task(id("b"))));
    assert_eq!(ids(&drag.board().day(day(4))), vec!["b", "a"]);

    // a (2000) onto b (1000) lands before it.
    assert_eq!(
        drag.drag_end(Some(DropTarget::Task(id("b")))),
        Some(MoveKind::WithinDay)
    );
    assert!(drag.active().is_none());
    assert!(drag.drop_line().is_none());
    assert_eq!(ids(&drag.board().day(day(4))), vec!["a", "b"]);

    drag.board().settle().await;
    let calls = backend.move_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.day, Some(day(4)));
    assert_eq!(calls[0].1.position, Some(1000));
    assert_eq!(calls[0].1.target_task_id, Some(id("b")));
}

#[tokio::test(start_paused = true)]
async fn dropping_on_the_archive_archives() {
    let backend = FakeBackend::new(vec![task("a", 1, 1000), task("b", 1, 2000)], vec![]);
    let mut drag = DragAdapter::new(open_board(backend.clone(), DEBOUNCE).await);
    drag.drag_start(&id("a"));

    drag.drag_over(Some(DropTarget::Container(Container::Archive)));
    // Hovering the archive only moves the indicator.
    assert_eq!(ids(&drag.board().day(day(1))), vec!["a", "b"]);

    assert_eq!(
        drag.drag_end(Some(DropTarget::Container(Container::Archive))),
        Some(MoveKind::Archive)
    );
    assert_eq!(ids(&drag.board().archived()), vec!["a"]);
    assert_eq!(ids(&drag.board().day(day(1))), vec!["b"]);

    drag.board().settle().await;
    assert_eq!(backend.move_calls()[0].1.is_archive, Some(true));
}

#[tokio::test(start_paused = true)]
async fn dropping_an_archived_task_on_a_day_unarchives() {
    let backend = FakeBackend::new(vec![task("a", 3, 1000), archived_task("z", 1000)], vec![]);
    let mut drag = DragAdapter::new(open_board(backend, DEBOUNCE).await);

    assert!(drag.drag_start(&id("z")));
    assert_eq!(drag.active().map(|a| a.origin), Some(Container::Archive));
    drag.drag_over(Some(DropTarget::Container(Container::Day(day(3)))));
    // No live preview out of the archive.
    assert_eq!(drag.board().archived().len(), 1);

    assert_eq!(
        drag.drag_end(Some(DropTarget::Container(Container::Day(day(3))))),
        Some(MoveKind::Unarchive)
    );
    assert_eq!(ids(&drag.board().day(day(3))), vec!["a", "z"]);
    assert!(drag.board().archived().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_and_empty_drop_clear_state() {
    let backend = FakeBackend::new(vec![task("a", 1, 1000)], vec![]);
    let mut drag = DragAdapter::new(open_board(backend.clone(), DEBOUNCE).await);

    drag.drag_start(&id("a"));
    drag.drag_over(Some(DropTarget::Container(Container::Archive)));
    drag.drag_cancel();
    assert!(drag.active().is_none());
    assert!(drag.drop_line().is_none());

    drag.drag_start(&id("a"));
    assert_eq!(drag.drag_end(None), None);
    assert!(drag.active().is_none());

    drag.board().settle().await;
    assert!(backend.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn drop_line_matches_where_a_cross_day_drop_lands() {
    let backend = FakeBackend::new(
        vec![task("x", 1, 1000), task("a", 2, 1000), task("b", 2, 2000)],
        vec![],
    );
    let mut drag = DragAdapter::new(open_board(backend, DEBOUNCE).await);
    drag.drag_start(&id("x"));

    // Before the hover x (1000) would sit after b (2000); once appended to
    // day 2 it sits at 3000 and goes before.
    drag.drag_over(Some(DropTarget::Task(id("b"))));
    assert_eq!(
        drag.drop_line(),
        Some(&DropLine {
            target: DropTarget::Task(id("b")),
            side: Some(Side::Before),
        })
    );

    drag.drag_end(Some(DropTarget::Task(id("b"))));
    assert_eq!(ids(&drag.board().day(day(2))), vec!["a", "x", "b"]);
}
