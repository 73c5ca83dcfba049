// Copyright © SoftInput contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bookkeeping for the composing (preedit) region.

use crate::offsets::{char_len, AbsoluteOffset};

/// The engine's record of the active preedit: its text, where it starts in
/// the document, and where the conceptual cursor sits inside it.
///
/// Invariants (checked by [`ComposingState::ensure_consistent`]):
/// * `text.is_empty()` exactly when `start` is `None`.
/// * `cursor`, when present, lies in `[start, start + chars(text)]`.
///
/// A violation is a protocol desynchronization with the input method; it is
/// logged and the state resets to "not composing" rather than propagating.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComposingState {
    text: String,
    start: Option<AbsoluteOffset>,
    cursor: Option<AbsoluteOffset>,
}

impl ComposingState {
    pub fn is_composing(&self) -> bool {
        self.start.is_some()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn start(&self) -> Option<AbsoluteOffset> {
        self.start
    }

    /// The absolute position of the preedit cursor. `None` either when not
    /// composing or when a cursor move placed it outside the region (the
    /// preedit then has no visible cursor).
    pub fn cursor(&self) -> Option<AbsoluteOffset> {
        self.cursor
    }

    pub fn char_len(&self) -> usize {
        char_len(&self.text)
    }

    /// The composing region `[start, start + len)`, when composing.
    pub fn region(&self) -> Option<(AbsoluteOffset, AbsoluteOffset)> {
        self.start.map(|start| (start, start + self.char_len()))
    }

    /// True when `offset` lies within the region, bounds inclusive. Used to
    /// distinguish a preedit-cursor move from a real selection change.
    pub fn contains(&self, offset: AbsoluteOffset) -> bool {
        self.region().is_some_and(|(start, end)| offset >= start && offset <= end)
    }

    /// Replaces the tracked preedit. An empty `text` clears the state.
    pub fn set(&mut self, text: impl Into<String>, start: AbsoluteOffset, cursor: Option<AbsoluteOffset>) {
        let text = text.into();
        if text.is_empty() {
            self.clear();
            return;
        }
        self.text = text;
        self.start = Some(start);
        self.cursor = cursor;
        self.ensure_consistent();
    }

    /// Updates only the preedit-cursor position; positions outside the
    /// region drop the visible cursor instead of growing the region.
    pub fn set_cursor(&mut self, cursor: Option<AbsoluteOffset>) {
        self.cursor = cursor.filter(|c| self.contains(*c));
    }

    /// Silent reset, e.g. on focus loss.
    pub fn clear(&mut self) {
        self.text.clear();
        self.start = None;
        self.cursor = None;
    }

    /// Shifts the region left by `chars`, clamping at the document start.
    /// Used when text before the region is deleted.
    pub fn shift_left(&mut self, chars: usize) {
        self.start = self.start.map(|s| s.saturating_sub(chars));
        self.cursor = self.cursor.map(|c| c.saturating_sub(chars));
        self.ensure_consistent();
    }

    /// Verifies the invariants, logging and self-healing on violation.
    /// Returns false if a reset was necessary.
    pub fn ensure_consistent(&mut self) -> bool {
        if self.text.is_empty() != self.start.is_none() {
            log::warn!(
                "composing state desynchronized (text len {}, start {:?}); resetting",
                self.text.len(),
                self.start
            );
            self.clear();
            return false;
        }
        if let Some(cursor) = self.cursor {
            if !self.contains(cursor) {
                // Tolerated: the preedit merely loses its visible cursor.
                self.cursor = None;
            }
        }
        true
    }
}
