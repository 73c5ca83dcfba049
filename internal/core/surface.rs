// Copyright © SoftInput contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The interface to the focused editable surface.
//!
//! The surface is owned by the surrounding application framework; the input
//! context only holds a weak back-reference and addresses it through
//! [`EditableSurface`]. All positional queries and commands operate in the
//! surface's **block-relative** coordinate space (see [`crate::offsets`]),
//! except [`EditableSurface::absolute_position`] which anchors the
//! conversion to document-global space.

use crate::lengths::{LogicalPoint, LogicalRect};
use crate::offsets::{AbsoluteOffset, BlockRelativeOffset};

/// Input hints published by the focused surface.
///
/// Plain booleans rather than a bitmask so that combinations are
/// enumerable in tests.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InputHints {
    /// All typed characters should be uppercase; forces all-caps mode in
    /// [`crate::context::InputContext::cursor_caps_mode`].
    pub uppercase_only: bool,
    /// All typed characters should be lowercase.
    pub lowercase_only: bool,
    /// Suppress automatic capitalization at sentence starts.
    pub no_auto_uppercase: bool,
    /// The surface opts out of cursor/selection handles entirely.
    pub no_text_handles: bool,
}

/// The action the input method's confirm button should perform.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum EnterKeyAction {
    /// Insert a line break (multi-line surfaces).
    #[default]
    Return,
    /// Accept the current content.
    Done,
    Go,
    Next,
    Previous,
    Search,
    Send,
}

/// Keyboard shortcuts the engine synthesizes against the surface instead of
/// manipulating the clipboard itself, so the surface's existing shortcut
/// handling stays the single implementation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StandardShortcut {
    SelectAll,
    Cut,
    Copy,
    Paste,
}

/// A selection in the surface's block-relative space. `anchor == cursor`
/// describes a collapsed cursor.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub anchor: BlockRelativeOffset,
    pub cursor: BlockRelativeOffset,
}

impl Selection {
    pub fn cursor_at(pos: BlockRelativeOffset) -> Self {
        Self { anchor: pos, cursor: pos }
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.cursor
    }
}

/// One combined edit event, applied atomically by the surface.
///
/// Modeled after the platform's input-method event: a commit string that
/// replaces a range of committed text, a new preedit, and an optional
/// selection, all in one step. Several of the protocol's subtleties depend
/// on this being a *single* event; splitting it into a commit followed by a
/// separate preedit change is observably different (the surface would
/// briefly publish an intermediate state).
///
/// The surface applies the parts in this order:
///
/// 1. Remove the currently displayed preedit, if any; the working position
///    becomes the preedit's start (otherwise: the selection start if a
///    non-empty selection is being replaced by commit/preedit text without
///    an explicit replace range, otherwise the cursor).
/// 2. Delete `replace_len` characters of committed text starting
///    `replace_from` characters from the working position; when this range
///    is non-empty, cursor and anchor collapse at the deletion point.
/// 3. Insert `commit` there; cursor and anchor collapse after it.
/// 4. Display `preedit` at the cursor with its cursor at `preedit_cursor`
///    (rendered with the surface's composing text format; `None` hides the
///    preedit cursor without hiding the text).
/// 5. Apply `selection`, if any.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditEvent {
    /// Start of the replaced range, in characters relative to the working
    /// position. Usually zero or negative.
    pub replace_from: i64,
    /// Length of the replaced range in characters.
    pub replace_len: usize,
    /// Text committed in place of the replaced range.
    pub commit: String,
    /// New preedit text; empty means no preedit is shown after this event.
    pub preedit: String,
    /// Cursor position inside `preedit`, in characters.
    pub preedit_cursor: Option<usize>,
    /// Selection applied after the text change.
    pub selection: Option<Selection>,
}

impl EditEvent {
    /// An event that only moves the selection.
    pub fn select(selection: Selection) -> Self {
        Self { selection: Some(selection), ..Default::default() }
    }

    /// An event that commits `text` at the working position.
    pub fn commit(text: impl Into<String>) -> Self {
        Self { commit: text.into(), ..Default::default() }
    }

    /// An event that replaces the current preedit with `text`.
    pub fn preedit(text: impl Into<String>, cursor: Option<usize>) -> Self {
        Self { preedit: text.into(), preedit_cursor: cursor, ..Default::default() }
    }
}

/// Interface consumed from the focused editable surface.
///
/// All methods are called on the UI thread only. Queries report committed
/// text exclusively — the active preedit is display state and is spliced in
/// by the engine where the protocol requires it.
pub trait EditableSurface {
    // ===== Queries =====

    /// Cursor position within the current editing block.
    fn cursor_position(&self) -> BlockRelativeOffset;

    /// Selection anchor within the current editing block. Equal to
    /// [`Self::cursor_position`] when nothing is selected.
    fn anchor_position(&self) -> BlockRelativeOffset;

    /// Cursor position within the whole document. Anchors the conversion
    /// between block-relative and absolute offsets.
    fn absolute_position(&self) -> AbsoluteOffset;

    /// Committed text of the current editing block.
    fn surrounding_text(&self) -> String;

    /// Up to `max_chars` of committed text before the cursor, possibly
    /// crossing block boundaries.
    fn text_before_cursor(&self, max_chars: usize) -> String;

    /// Up to `max_chars` of committed text after the cursor.
    fn text_after_cursor(&self, max_chars: usize) -> String;

    /// The selected committed text, empty when the selection is collapsed.
    fn selected_text(&self) -> String;

    fn input_hints(&self) -> InputHints;

    fn enabled(&self) -> bool;

    fn read_only(&self) -> bool;

    fn enter_key_action(&self) -> EnterKeyAction;

    /// Cursor rectangle in logical window coordinates.
    fn cursor_rect(&self) -> LogicalRect;

    /// Rectangle of the selection anchor in logical window coordinates.
    fn anchor_rect(&self) -> LogicalRect;

    /// The on-screen region handle anchor points must be clamped into.
    fn visible_rect(&self) -> LogicalRect;

    /// Document offset nearest to a logical window position.
    fn offset_for_position(&self, position: LogicalPoint) -> AbsoluteOffset;

    /// Rectangle occupied by the character at `offset` (or the caret
    /// rectangle at end of text).
    fn rect_for_offset(&self, offset: AbsoluteOffset) -> LogicalRect;

    // ===== Commands =====

    /// Applies one combined edit event. See [`EditEvent`] for ordering.
    fn apply_edit(&self, event: EditEvent);

    /// Moves the selection without any text change.
    fn set_selection(&self, selection: Selection);

    /// Synthesizes a standard keyboard shortcut against the surface.
    fn send_shortcut(&self, shortcut: StandardShortcut);

    /// Activates the surface's accept behavior (single-line confirm).
    fn accept(&self);
}
