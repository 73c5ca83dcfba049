// Copyright © SoftInput contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handle presentation: touch and long-press transitions, the auto-hide
//! timer and the drag rules.

use std::rc::Rc;
use std::time::{Duration, Instant};

use softinput_backend_testing::{RecordingNotifier, TestSurface, CHAR_WIDTH, LINE_HEIGHT};
use softinput_core::lengths::logical_point;
use softinput_core::surface::{EditableSurface, InputHints};
use softinput_core::{
    Handle, HandleVisibility, InputContext, CURSOR_HANDLE_AUTO_HIDE,
};

fn focused_context(surface: &Rc<TestSurface>) -> (Rc<InputContext>, RecordingNotifier) {
    let notifier = RecordingNotifier::new();
    let context = Rc::new(InputContext::new(Box::new(notifier.clone())));
    let as_surface: Rc<dyn EditableSurface> = surface.clone();
    context.set_focused_surface(Some(&as_surface));
    (context, notifier)
}

/// Center of the glyph cell for char `column` on `line`.
fn at(column: usize, line: usize) -> softinput_core::lengths::LogicalPoint {
    logical_point(column as f32 * CHAR_WIDTH, line as f32 * LINE_HEIGHT + LINE_HEIGHT / 2.)
}

#[test]
fn touch_down_shows_the_cursor_handle_and_arms_the_timer() {
    let surface = TestSurface::with_text("hello world", 0);
    let (context, notifier) = focused_context(&surface);
    let now = Instant::now();

    context.touch_down(at(3, 0), now);
    let placement = notifier.last_handle_update().expect("placement pushed");
    assert_eq!(placement.state.visibility, HandleVisibility::Cursor);
    assert!(!placement.state.show_edit_popup);
    assert!(placement.cursor.is_some());
    assert!(notifier
        .timer_requests
        .borrow()
        .last()
        .copied()
        .flatten()
        .is_some_and(|after| after <= CURSOR_HANDLE_AUTO_HIDE));
}

#[test]
fn cursor_handle_auto_hides_after_the_delay() {
    let surface = TestSurface::with_text("hello", 0);
    let (context, notifier) = focused_context(&surface);
    let now = Instant::now();

    context.touch_down(at(1, 0), now);
    context.update_timers(now + Duration::from_secs(1));
    assert_eq!(
        notifier.last_handle_update().map(|placement| placement.state.visibility),
        Some(HandleVisibility::Cursor)
    );

    context.update_timers(now + CURSOR_HANDLE_AUTO_HIDE);
    assert_eq!(
        notifier.last_handle_update().map(|placement| placement.state.visibility),
        Some(HandleVisibility::Hidden)
    );
}

#[test]
fn repeated_touch_requests_a_fresh_timer_wakeup() {
    let surface = TestSurface::with_text("hello world", 0);
    let (context, notifier) = focused_context(&surface);
    let now = Instant::now();

    context.touch_down(at(3, 0), now);
    let requests_before = notifier.timer_requests.borrow().len();

    // the handle is already visible; the deadline still moves
    context.touch_down(at(5, 0), now + Duration::from_secs(2));
    assert!(notifier.timer_requests.borrow().len() > requests_before);

    // the original deadline passes without hiding
    context.update_timers(now + CURSOR_HANDLE_AUTO_HIDE);
    assert_eq!(
        notifier.last_handle_update().map(|placement| placement.state.visibility),
        Some(HandleVisibility::Cursor)
    );

    // the re-armed one hides
    context.update_timers(now + Duration::from_secs(2) + CURSOR_HANDLE_AUTO_HIDE);
    assert_eq!(
        notifier.last_handle_update().map(|placement| placement.state.visibility),
        Some(HandleVisibility::Hidden)
    );
}

#[test]
fn long_press_selects_the_enclosing_word() {
    let surface = TestSurface::with_text("hello world", 0);
    let (context, notifier) = focused_context(&surface);

    // inside "world" (chars 6..11)
    context.long_press(at(8, 0), Instant::now());
    assert_eq!(surface.anchor(), 6);
    assert_eq!(surface.cursor(), 11);
    assert_eq!(surface.selected_text(), "world");

    let placement = notifier.last_handle_update().expect("placement pushed");
    assert_eq!(placement.state.visibility, HandleVisibility::Selection);
    assert!(placement.state.show_edit_popup);
    assert!(placement.left.is_some() && placement.right.is_some());
}

#[test]
fn long_press_between_words_falls_back_to_the_cursor_handle() {
    let surface = TestSurface::with_text("a  b", 0);
    let (context, notifier) = focused_context(&surface);

    context.long_press(at(2, 0), Instant::now());
    assert_eq!(surface.anchor(), surface.cursor());

    let placement = notifier.last_handle_update().expect("placement pushed");
    assert_eq!(placement.state.visibility, HandleVisibility::Cursor);
    assert!(placement.state.show_edit_popup);
}

#[test]
fn keystroke_hides_the_handles() {
    let surface = TestSurface::with_text("hello", 0);
    let (context, notifier) = focused_context(&surface);

    context.touch_down(at(1, 0), Instant::now());
    context.keystroke();
    assert_eq!(
        notifier.last_handle_update().map(|placement| placement.state.visibility),
        Some(HandleVisibility::Hidden)
    );
}

#[test]
fn no_text_handles_hint_suppresses_the_presenter() {
    let surface = TestSurface::with_text("hello", 0);
    surface.set_input_hints(InputHints { no_text_handles: true, ..InputHints::default() });
    let (context, notifier) = focused_context(&surface);

    context.touch_down(at(1, 0), Instant::now());
    assert!(notifier
        .last_handle_update()
        .map_or(true, |placement| placement.state.visibility == HandleVisibility::Hidden));
}

#[test]
fn read_only_surfaces_get_no_handles() {
    let surface = TestSurface::with_text("hello", 0);
    surface.set_read_only(true);
    let (context, notifier) = focused_context(&surface);

    context.long_press(at(1, 0), Instant::now());
    assert!(notifier
        .last_handle_update()
        .map_or(true, |placement| placement.state.visibility == HandleVisibility::Hidden));
}

#[test]
fn dragging_an_endpoint_moves_only_that_endpoint() {
    let surface = TestSurface::with_text("hello world", 0);
    let (context, _) = focused_context(&surface);
    context.long_press(at(8, 0), Instant::now());
    assert_eq!((surface.anchor(), surface.cursor()), (6, 11));

    context.handle_location_changed(Handle::SelectionEnd, at(9, 0));
    assert_eq!((surface.anchor(), surface.cursor()), (6, 9));

    context.handle_location_changed(Handle::SelectionStart, at(7, 0));
    assert_eq!((surface.anchor(), surface.cursor()), (7, 9));
}

#[test]
fn dragging_can_never_collapse_the_selection() {
    let surface = TestSurface::with_text("hello world", 0);
    let (context, _) = focused_context(&surface);
    context.long_press(at(8, 0), Instant::now());

    // drag the end handle onto (and past) the start handle
    context.handle_location_changed(Handle::SelectionEnd, at(6, 0));
    assert_eq!((surface.anchor(), surface.cursor()), (6, 7));

    context.handle_location_changed(Handle::SelectionEnd, at(0, 0));
    assert_eq!((surface.anchor(), surface.cursor()), (6, 7));

    // and the start handle past the end handle
    context.handle_location_changed(Handle::SelectionStart, at(11, 0));
    assert_eq!((surface.anchor(), surface.cursor()), (6, 7));
}

#[test]
fn drag_snapping_respects_grapheme_clusters() {
    // "e" plus a combining accent is a single grapheme at chars 1..3
    let surface = TestSurface::with_text("xe\u{301}y", 0);
    let (context, _) = focused_context(&surface);
    context.long_press(at(1, 0), Instant::now());

    // collapsing from the right must snap to a grapheme boundary
    let (anchor, cursor) = (surface.anchor(), surface.cursor());
    assert!(anchor < cursor, "selection must stay non-empty");
    context.handle_location_changed(Handle::SelectionEnd, at(anchor, 0));
    assert!(surface.cursor() > surface.anchor());
    assert_ne!(surface.cursor(), 2, "cursor may not split the grapheme");
}

#[test]
fn cursor_handle_drag_moves_the_cursor() {
    let surface = TestSurface::with_text("hello world", 0);
    let (context, _) = focused_context(&surface);
    context.touch_down(at(0, 0), Instant::now());

    context.handle_location_changed(Handle::Cursor, at(4, 0));
    assert_eq!(surface.cursor(), 4);
    assert_eq!(surface.anchor(), 4);
}

#[test]
fn drag_positions_are_clamped_to_the_visible_rect() {
    let surface = TestSurface::with_text("short", 0);
    let (context, _) = focused_context(&surface);
    context.touch_down(at(0, 0), Instant::now());

    context.handle_location_changed(Handle::Cursor, logical_point(-50., -50.));
    assert_eq!(surface.cursor(), 0);
    context.handle_location_changed(Handle::Cursor, logical_point(5000., 0.));
    assert_eq!(surface.cursor(), 5);
}

#[test]
fn handle_anchor_points_follow_the_selection_geometry() {
    let surface = TestSurface::with_text("hello world", 0);
    let (context, notifier) = focused_context(&surface);
    context.long_press(at(8, 0), Instant::now());

    let placement = notifier.last_handle_update().expect("placement pushed");
    let left = placement.left.expect("left handle anchor");
    let right = placement.right.expect("right handle anchor");
    assert!(left.x < right.x);
    // anchors sit at the bottom edge of the selected line
    assert_eq!(left.y, LINE_HEIGHT);
    assert_eq!(right.y, LINE_HEIGHT);
    assert!(placement.popup_around.is_some());
}

#[test]
fn focus_loss_hides_the_handles() {
    let surface = TestSurface::with_text("hello", 0);
    let (context, notifier) = focused_context(&surface);
    context.touch_down(at(1, 0), Instant::now());

    context.set_focused_surface(None);
    assert_eq!(
        notifier.last_handle_update().map(|placement| placement.state.visibility),
        Some(HandleVisibility::Hidden)
    );
}
