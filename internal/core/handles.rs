// Copyright © SoftInput contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Selection and cursor handle presentation.
//!
//! Derives which draggable text handles are visible from touch gestures,
//! focus changes, keyboard activity and a single-shot auto-hide timer, and
//! computes their screen-space anchor points from the selection geometry.

use std::time::{Duration, Instant};

use crate::lengths::{logical_point, LogicalPoint};
use crate::offsets::{
    byte_offset_for_char, char_len, char_offset_for_byte, AbsoluteOffset, BlockRelativeOffset,
};
use crate::platform::HandlePlacement;
use crate::surface::{EditableSurface, Selection};

/// How long a lone cursor handle stays on screen before hiding itself.
pub const CURSOR_HANDLE_AUTO_HIDE: Duration = Duration::from_secs(4);

/// Per-direction cap on the word-selection scan done on long press.
pub const WORD_SELECTION_SCAN_LIMIT: usize = 128;

/// Half the rendered handle width in logical pixels. Endpoint anchors are
/// clamped away from the surface edge by this much so a handle at the edge
/// stays draggable.
pub const HANDLE_GRAB_MARGIN: f32 = 12.;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HandleVisibility {
    #[default]
    Hidden,
    /// A single handle below the cursor.
    Cursor,
    /// One handle per selection endpoint.
    Selection,
}

/// Presenter output state. Replaces ad-hoc bitflag combinations with the
/// small set of states that can actually occur.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HandleState {
    pub visibility: HandleVisibility,
    /// Whether the cut/copy/paste popup should be offered alongside.
    pub show_edit_popup: bool,
}

/// Identifies which on-screen handle a drag notification refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Handle {
    Cursor,
    /// The handle at the logically-first selection endpoint.
    SelectionStart,
    /// The handle at the logically-last selection endpoint.
    SelectionEnd,
}

/// State machine behind the handle overlay. One per input context; all
/// methods run on the UI thread. Mutating methods return true when the
/// resulting [`HandleState`] or geometry needs to be pushed to the platform.
#[derive(Default)]
pub struct HandlePresenter {
    state: HandleState,
    auto_hide_deadline: Option<Instant>,
}

impl HandlePresenter {
    pub fn state(&self) -> HandleState {
        self.state
    }

    /// Time left until the auto-hide timer fires, if armed.
    pub fn duration_until_auto_hide(&self, now: Instant) -> Option<Duration> {
        self.auto_hide_deadline.map(|deadline| deadline.saturating_duration_since(now))
    }

    fn set_state(&mut self, state: HandleState, now: Instant) -> bool {
        // A lone cursor handle hides itself; selection handles stay. A
        // re-armed deadline counts as a change so the platform gets a fresh
        // timer wakeup even when the visible state is the same.
        let deadline = (state.visibility == HandleVisibility::Cursor)
            .then(|| now + CURSOR_HANDLE_AUTO_HIDE);
        let rearmed = core::mem::replace(&mut self.auto_hide_deadline, deadline) != deadline;
        core::mem::replace(&mut self.state, state) != state || rearmed
    }

    fn handles_suppressed(surface: &dyn EditableSurface) -> bool {
        !surface.enabled() || surface.read_only() || surface.input_hints().no_text_handles
    }

    /// A touch-down landed inside the editable region.
    pub fn on_touch_down(&mut self, surface: &dyn EditableSurface, now: Instant) -> bool {
        if Self::handles_suppressed(surface) {
            return self.hide();
        }
        self.set_state(
            HandleState { visibility: HandleVisibility::Cursor, show_edit_popup: false },
            now,
        )
    }

    /// A long press at `pos` selects the enclosing word, falling back to a
    /// cursor handle with the edit popup when no word is under the finger.
    pub fn on_long_press(
        &mut self,
        surface: &dyn EditableSurface,
        pos: LogicalPoint,
        now: Instant,
    ) -> bool {
        if Self::handles_suppressed(surface) {
            return self.hide();
        }
        let block_text = surface.surrounding_text();
        let rel = usize::from(block_relative_at(surface, pos)).min(char_len(&block_text));
        let (word_start, word_end) = word_span_at(&block_text, rel);
        if word_start < word_end {
            surface.set_selection(Selection {
                anchor: BlockRelativeOffset(word_start),
                cursor: BlockRelativeOffset(word_end),
            });
            self.set_state(
                HandleState { visibility: HandleVisibility::Selection, show_edit_popup: true },
                now,
            )
        } else {
            surface.set_selection(Selection::cursor_at(BlockRelativeOffset(rel)));
            self.set_state(
                HandleState { visibility: HandleVisibility::Cursor, show_edit_popup: true },
                now,
            )
        }
    }

    /// Typing hides the handles.
    pub fn on_keystroke(&mut self) -> bool {
        self.hide()
    }

    pub fn on_focus_changed(&mut self, focused: bool) -> bool {
        if focused {
            false
        } else {
            self.hide()
        }
    }

    /// Called by the event-loop driver when timers may have elapsed.
    pub fn update_timers(&mut self, now: Instant) -> bool {
        match self.auto_hide_deadline {
            Some(deadline) if deadline <= now => self.hide(),
            _ => false,
        }
    }

    fn hide(&mut self) -> bool {
        self.auto_hide_deadline = None;
        core::mem::replace(&mut self.state, HandleState::default()) != HandleState::default()
    }

    /// A handle was dragged to `pos`. Recomputes the corresponding offset,
    /// keeping selection endpoints ordered and never letting a drag collapse
    /// a selection to nothing.
    pub fn on_handle_dragged(
        &mut self,
        surface: &dyn EditableSurface,
        handle: Handle,
        pos: LogicalPoint,
    ) -> bool {
        if Self::handles_suppressed(surface) {
            return self.hide();
        }
        let visible = surface.visible_rect();
        let mut pos = logical_point(
            pos.x.clamp(visible.min_x(), visible.max_x()),
            pos.y.clamp(visible.min_y(), visible.max_y()),
        );

        if handle == Handle::Cursor {
            surface.set_selection(Selection::cursor_at(block_relative_at(surface, pos)));
            return true;
        }

        let origin = block_origin(surface);
        let block_text = surface.surrounding_text();
        let cursor = surface.cursor_position();
        let anchor = surface.anchor_position();
        let (left, right) = if anchor <= cursor { (anchor, cursor) } else { (cursor, anchor) };

        // Dragging one endpoint past the other's vertical center would draw
        // crossed handles; clamp the drag to that line instead.
        let other_rel = match handle {
            Handle::SelectionStart => right,
            _ => left,
        };
        let other_rect = surface.rect_for_offset(other_rel.to_absolute(origin));
        let other_center_y = other_rect.min_y() + other_rect.height() / 2.;
        match handle {
            Handle::SelectionStart if pos.y > other_center_y => pos.y = other_center_y,
            Handle::SelectionEnd if pos.y < other_center_y => pos.y = other_center_y,
            _ => {}
        }

        let dragged = usize::from(block_relative_at(surface, pos));
        let (new_left, new_right) = match handle {
            Handle::SelectionStart => {
                let limit = prev_grapheme_boundary(&block_text, usize::from(right));
                (dragged.min(limit), usize::from(right))
            }
            _ => {
                let limit = next_grapheme_boundary(&block_text, usize::from(left));
                (usize::from(left), dragged.max(limit))
            }
        };

        // Endpoint roles (which one is the anchor) are preserved.
        let selection = if anchor <= cursor {
            Selection {
                anchor: BlockRelativeOffset(new_left),
                cursor: BlockRelativeOffset(new_right),
            }
        } else {
            Selection {
                anchor: BlockRelativeOffset(new_right),
                cursor: BlockRelativeOffset(new_left),
            }
        };
        surface.set_selection(selection);
        if self.state.show_edit_popup {
            self.state.show_edit_popup = false;
        }
        true
    }

    /// Computes the anchor points the platform should render handles at.
    pub fn placement(&self, surface: &dyn EditableSurface) -> HandlePlacement {
        let mut placement = HandlePlacement { state: self.state, ..HandlePlacement::default() };
        if self.state.visibility == HandleVisibility::Hidden {
            return placement;
        }
        let visible = surface.visible_rect();
        let clamp_x = |x: f32| {
            x.clamp(visible.min_x() + HANDLE_GRAB_MARGIN, visible.max_x() - HANDLE_GRAB_MARGIN)
        };

        let cursor = surface.cursor_position();
        let anchor = surface.anchor_position();
        let degenerate = cursor == anchor;

        if self.state.visibility == HandleVisibility::Cursor || degenerate {
            let rect = surface.cursor_rect();
            let point = logical_point(
                clamp_x(rect.min_x() + rect.width() / 2.),
                rect.max_y().clamp(visible.min_y(), visible.max_y()),
            );
            placement.cursor = Some(point);
            if self.state.show_edit_popup {
                placement.popup_around = Some(rect);
            }
            return placement;
        }

        let origin = block_origin(surface);
        let (left, right) = if anchor <= cursor { (anchor, cursor) } else { (cursor, anchor) };
        let left_rect = surface.rect_for_offset(left.to_absolute(origin));
        let right_rect = surface.rect_for_offset(right.to_absolute(origin));
        placement.left = Some(logical_point(clamp_x(left_rect.min_x()), left_rect.max_y()));
        placement.right = Some(logical_point(clamp_x(right_rect.min_x()), right_rect.max_y()));
        if self.state.show_edit_popup {
            placement.popup_around = Some(left_rect.union(&right_rect));
        }
        placement
    }
}

fn block_origin(surface: &dyn EditableSurface) -> AbsoluteOffset {
    let abs = surface.absolute_position();
    let rel = surface.cursor_position();
    AbsoluteOffset(usize::from(abs).saturating_sub(usize::from(rel)))
}

/// Block-relative offset of `pos`, clamping positions before the block to
/// its start.
fn block_relative_at(surface: &dyn EditableSurface, pos: LogicalPoint) -> BlockRelativeOffset {
    let origin = block_origin(surface);
    surface
        .offset_for_position(pos)
        .to_block_relative(origin)
        .unwrap_or(BlockRelativeOffset(0))
}

/// Extent of the alphanumeric run around `char_off` in `text`, as char
/// offsets. Returns an empty span at `char_off` when the surrounding
/// characters are not word characters. The scan is capped at
/// [`WORD_SELECTION_SCAN_LIMIT`] chars per direction.
pub(crate) fn word_span_at(text: &str, char_off: usize) -> (usize, usize) {
    let chars: Vec<char> = text.chars().collect();
    let char_off = char_off.min(chars.len());
    let mut start = char_off;
    while start > 0
        && char_off - (start - 1) <= WORD_SELECTION_SCAN_LIMIT
        && chars[start - 1].is_alphanumeric()
    {
        start -= 1;
    }
    let mut end = char_off;
    while end < chars.len()
        && end - char_off < WORD_SELECTION_SCAN_LIMIT
        && chars[end].is_alphanumeric()
    {
        end += 1;
    }
    (start, end)
}

/// Char offset of the last grapheme boundary strictly before `char_off`.
pub(crate) fn prev_grapheme_boundary(text: &str, char_off: usize) -> usize {
    let byte = byte_offset_for_char(text, char_off);
    let mut cursor = unicode_segmentation::GraphemeCursor::new(byte, text.len(), true);
    let prev = cursor.prev_boundary(text, 0).ok().flatten().unwrap_or(0);
    char_offset_for_byte(text, prev)
}

/// Char offset of the first grapheme boundary strictly after `char_off`.
pub(crate) fn next_grapheme_boundary(text: &str, char_off: usize) -> usize {
    let byte = byte_offset_for_char(text, char_off);
    let mut cursor = unicode_segmentation::GraphemeCursor::new(byte, text.len(), true);
    let next = cursor.next_boundary(text, 0).ok().flatten().unwrap_or(text.len());
    char_offset_for_byte(text, next)
}
