// Copyright © SoftInput contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The input context: owns the engine state for the focused surface and
//! implements the edit-operation protocol against it.
//!
//! Everything in this module runs on the UI thread. Input-method threads
//! reach it through [`crate::handler::InputMethodHandler`], which marshals
//! each call over via [`crate::invoker::SyncInvoker`].

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Instant;

use crate::composing::ComposingState;
use crate::handles::{Handle, HandlePresenter};
use crate::lengths::LogicalPoint;
use crate::offsets::{char_len, slice_chars, AbsoluteOffset, BlockRelativeOffset};
use crate::platform::{InputMethodProperties, InputMethodRequest, PlatformNotifier};
use crate::surface::{EditEvent, EditableSurface, EnterKeyAction, Selection, StandardShortcut};

/// Default number of chars fetched on either side of the cursor when an
/// operation needs surrounding text.
pub const SURROUNDING_TEXT_WINDOW: usize = 512;

/// Which capitalization the input method should apply to the next typed
/// character.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CapsModes {
    /// Capitalize every character.
    pub characters: bool,
    /// Capitalize the first character of every word.
    pub words: bool,
    /// Capitalize the first character of every sentence.
    pub sentences: bool,
}

/// Flags carried by the protocol's text queries. The engine models no
/// styling spans and pushes snapshot updates on every change, so both
/// flags are accepted without altering the result.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryFlags {
    /// The caller wants styling spans along with the text.
    pub with_styles: bool,
    /// The caller wants continued snapshot updates after this query.
    pub monitor: bool,
}

/// A bounded snapshot of the document handed to the input method for its
/// own rendering. Offsets inside are relative to `start_offset`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtractedText {
    pub text: String,
    /// Char offset of `text[0]` in the document.
    pub start_offset: usize,
    pub selection_start: usize,
    pub selection_end: usize,
    /// Range of `text` affected since the previous snapshot, when known.
    /// `None` means the whole snapshot should be treated as changed.
    pub partial: Option<(usize, usize)>,
}

/// Engine state for one focused editable surface.
///
/// The surface itself is framework-owned; the context keeps a weak
/// back-reference and degrades every operation to a neutral result once the
/// surface is gone or focus was lost.
pub struct InputContext {
    surface: RefCell<Option<Weak<dyn EditableSurface>>>,
    composing: RefCell<ComposingState>,
    batch_depth: Cell<usize>,
    update_pending: Cell<bool>,
    handles: RefCell<HandlePresenter>,
    extracted_cache: RefCell<Option<ExtractedText>>,
    notifier: Box<dyn PlatformNotifier>,
}

impl InputContext {
    pub fn new(notifier: Box<dyn PlatformNotifier>) -> Self {
        Self {
            surface: RefCell::new(None),
            composing: RefCell::new(ComposingState::default()),
            batch_depth: Cell::new(0),
            update_pending: Cell::new(false),
            handles: RefCell::new(HandlePresenter::default()),
            extracted_cache: RefCell::new(None),
            notifier,
        }
    }

    /// Runs `callback` against the focused surface, or returns `default`
    /// when no surface is focused or it has been dropped.
    fn with_surface<R>(&self, default: R, callback: impl FnOnce(&dyn EditableSurface) -> R) -> R {
        match self.surface.borrow().as_ref().and_then(Weak::upgrade) {
            Some(surface) => callback(&*surface),
            None => default,
        }
    }

    /// Focus moved to `surface` (or away, with `None`). Resets composing
    /// and handle state and tells the platform to show or hide the input
    /// method.
    pub fn set_focused_surface(&self, surface: Option<&Rc<dyn EditableSurface>>) {
        self.composing.borrow_mut().clear();
        self.batch_depth.set(0);
        self.update_pending.set(false);
        self.extracted_cache.replace(None);
        self.handles.borrow_mut().on_focus_changed(surface.is_some());
        *self.surface.borrow_mut() = surface.map(Rc::downgrade);
        match surface {
            Some(_) if self.with_surface(false, |s| s.enabled() && !s.read_only()) => {
                let properties = self.input_method_properties();
                self.notifier.input_method_request(InputMethodRequest::Enable(properties));
            }
            _ => self.notifier.input_method_request(InputMethodRequest::Disable),
        }
        self.push_handle_placement();
    }

    pub fn is_composing(&self) -> bool {
        self.composing.borrow().is_composing()
    }

    // --- batch-edit coordination ---

    /// Opens a batch-edit bracket. Always succeeds.
    pub fn begin_batch_edit(&self) -> bool {
        self.batch_depth.set(self.batch_depth.get() + 1);
        true
    }

    /// Closes one bracket. Returns true while a batch is still open. The
    /// deferred selection notification is pushed when the outermost bracket
    /// closes. An unmatched end is tolerated and logged.
    pub fn end_batch_edit(&self) -> bool {
        match self.batch_depth.get() {
            0 => {
                log::warn!("endBatchEdit without matching beginBatchEdit");
                false
            }
            1 => {
                self.batch_depth.set(0);
                if self.update_pending.replace(false) {
                    self.send_update();
                }
                false
            }
            depth => {
                self.batch_depth.set(depth - 1);
                true
            }
        }
    }

    fn in_batch(&self) -> bool {
        self.batch_depth.get() > 0
    }

    /// Runs `f` inside its own batch bracket.
    fn batched<R>(&self, f: impl FnOnce() -> R) -> R {
        self.begin_batch_edit();
        let result = f();
        self.end_batch_edit();
        result
    }

    /// Pushes the current editor state to the platform input method, or
    /// defers the push while a batch edit is open.
    fn send_update(&self) {
        if self.in_batch() {
            self.update_pending.set(true);
            return;
        }
        self.extracted_cache.replace(None);
        let properties = self.input_method_properties();
        self.notifier.input_method_request(InputMethodRequest::Update(properties));
        self.push_handle_placement();
    }

    // --- edit operations ---

    /// Commits `text` at the composing region (or selection), ending any
    /// composition. Equivalent to a compose-then-finish pair in one batch.
    pub fn commit_text(&self, text: &str, new_cursor_rel: i64) -> bool {
        self.batched(|| {
            self.set_composing_text(text, new_cursor_rel) && self.finish_composing_text()
        })
    }

    /// Replaces the composing text. `new_cursor_rel` follows the protocol's
    /// convention: values above zero position the cursor that many chars
    /// minus one past the end of the inserted text, values of zero or below
    /// position it that many chars before its start.
    pub fn set_composing_text(&self, text: &str, new_cursor_rel: i64) -> bool {
        self.with_surface(false, |surface| {
            self.composing.borrow_mut().ensure_consistent();
            let start = self.composing_replace_start(surface);
            let text_chars = char_len(text);

            let cursor_in_doc = if new_cursor_rel > 0 {
                start + text_chars + (new_cursor_rel as usize - 1)
            } else {
                start.saturating_sub(new_cursor_rel.unsigned_abs() as usize)
            };

            let mut composing = self.composing.borrow_mut();
            composing.set(text, start, Some(cursor_in_doc));
            let preedit_cursor = composing
                .cursor()
                .map(|cursor| cursor - start)
                .filter(|_| composing.is_composing());
            let still_composing = composing.is_composing();
            drop(composing);

            let mut event = EditEvent::preedit(text, preedit_cursor);
            if !still_composing {
                // Empty text clears the preedit without inserting anything.
                event = EditEvent::default();
            }
            surface.apply_edit(event);
            self.send_update();
            true
        })
    }

    /// Where a new preedit starts: the existing composing region when there
    /// is one, otherwise the selection start (a composition replaces the
    /// selection).
    fn composing_replace_start(&self, surface: &dyn EditableSurface) -> AbsoluteOffset {
        if let Some(start) = self.composing.borrow().start() {
            return start;
        }
        let origin = block_origin(surface);
        let cursor = surface.cursor_position();
        let anchor = surface.anchor_position();
        cursor.min(anchor).to_absolute(origin)
    }

    /// Commits the current preedit as plain text without moving the cursor.
    /// A no-op returning success when not composing.
    pub fn finish_composing_text(&self) -> bool {
        if !self.is_composing() {
            return true;
        }
        self.with_surface(false, |surface| {
            let origin = block_origin(surface);
            let (text, cursor_abs) = {
                let composing = self.composing.borrow();
                let end = composing.start().map(|s| s + composing.char_len());
                (composing.text().to_string(), composing.cursor().or(end))
            };
            // The commit replaces the preedit in place; the explicit
            // selection keeps the cursor where the composition put it.
            let selection = cursor_abs
                .and_then(|abs| abs.to_block_relative(origin))
                .map(Selection::cursor_at);
            let event = EditEvent { selection, ..EditEvent::commit(text) };
            surface.apply_edit(event);
            self.composing.borrow_mut().clear();
            self.send_update();
            true
        })
    }

    /// Re-tags the committed substring `[start, end)` as the composing
    /// region, finishing any existing composition first. Swapped bounds are
    /// reordered; an empty region is an accepted no-op.
    pub fn set_composing_region(&self, start: usize, end: usize) -> bool {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        if start == end {
            return true;
        }
        if !self.finish_composing_text() {
            return false;
        }
        self.with_surface(false, |surface| {
            self.batched(|| {
                let cursor_abs = usize::from(surface.absolute_position());

                // Window the document around the cursor, widening it when
                // the requested region falls outside the default window.
                let before_window = SURROUNDING_TEXT_WINDOW
                    .max(cursor_abs.saturating_sub(start));
                let after_window =
                    SURROUNDING_TEXT_WINDOW.max(end.saturating_sub(cursor_abs));
                let before = surface.text_before_cursor(before_window);
                let after = surface.text_after_cursor(after_window);
                let window_start = cursor_abs - char_len(&before);
                let window: String = before + &after;

                let rel_start = start.saturating_sub(window_start);
                let rel_end = end.saturating_sub(window_start).min(char_len(&window));
                let text = slice_chars(&window, rel_start, rel_end).to_string();
                if text.is_empty() {
                    return true;
                }

                let start_abs = AbsoluteOffset(window_start + rel_start);
                self.composing.borrow_mut().set(text.clone(), start_abs, None);

                // The region's text is already in the document; the event
                // removes it as committed text and re-displays it as
                // preedit in the same place.
                let event = EditEvent {
                    replace_from: start_abs.0 as i64 - cursor_abs as i64,
                    replace_len: char_len(&text),
                    preedit: text,
                    ..EditEvent::default()
                };
                surface.apply_edit(event);
                self.send_update();
                true
            })
        })
    }

    /// Deletes up to `left` chars before and `right` chars after the union
    /// of cursor, anchor and composing region, clamped to the available
    /// text. A negative `left` folds into `right`.
    pub fn delete_surrounding_text(&self, left: i64, right: i64) -> bool {
        let (left, right) = if left < 0 {
            (0, right.saturating_add(-left).max(0) as usize)
        } else {
            (left as usize, right.max(0) as usize)
        };
        self.with_surface(false, |surface| {
            self.batched(|| {
                let origin = block_origin(surface);
                let cursor_abs = surface.absolute_position();
                let anchor_abs = surface.anchor_position().to_absolute(origin);

                // Committed-space span that must survive: selection plus the
                // preedit's insertion point.
                let mut span_start = cursor_abs.min(anchor_abs);
                let span_end = cursor_abs.max(anchor_abs);
                if let Some(region_start) = self.composing.borrow().start() {
                    span_start = span_start.min(region_start);
                }

                let span_gap = span_end - cursor_abs;
                let after_len = char_len(&surface.text_after_cursor(span_gap + right));
                let right = right.min(after_len.saturating_sub(span_gap));
                let left = left.min(usize::from(span_start));
                if left == 0 && right == 0 {
                    return true;
                }

                // Deleting via a replace range collapses the cursor at the
                // deletion point, so the event after the span goes first and
                // a third step restores selection and preedit if needed.
                let composing = self.composing.borrow();
                let preedit = EditEvent::preedit(
                    composing.text(),
                    composing.start().zip(composing.cursor()).map(|(s, c)| c - s),
                );
                drop(composing);

                let mut cursor_now = cursor_abs;
                if right > 0 {
                    let base =
                        if left == 0 { preedit.clone() } else { EditEvent::default() };
                    let event = EditEvent {
                        replace_from: span_gap as i64,
                        replace_len: right,
                        ..base
                    };
                    surface.apply_edit(event);
                    cursor_now = span_end;
                }
                if left > 0 {
                    let event = EditEvent {
                        replace_from: (usize::from(span_start) as i64)
                            - (usize::from(cursor_now) as i64)
                            - left as i64,
                        replace_len: left,
                        ..preedit
                    };
                    surface.apply_edit(event);
                    self.composing.borrow_mut().shift_left(left);
                }
                if anchor_abs != cursor_abs {
                    let origin_now = block_origin(surface);
                    let to_rel = |abs: AbsoluteOffset| {
                        abs.saturating_sub(left)
                            .to_block_relative(origin_now)
                            .unwrap_or(BlockRelativeOffset(0))
                    };
                    surface.set_selection(Selection {
                        anchor: to_rel(anchor_abs),
                        cursor: to_rel(cursor_abs),
                    });
                }
                self.send_update();
                true
            })
        })
    }

    /// Sets the selection from absolute offsets. A degenerate selection
    /// inside the composing region is a preedit-cursor move and does not
    /// end the composition; anything else finishes composing first.
    pub fn set_selection(&self, start: usize, end: usize) -> bool {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        if start == end && self.composing.borrow().contains(AbsoluteOffset(start)) {
            let mut composing = self.composing.borrow_mut();
            composing.set_cursor(Some(AbsoluteOffset(start)));
            let text = composing.text().to_string();
            let preedit_cursor =
                composing.start().zip(composing.cursor()).map(|(s, c)| c - s);
            drop(composing);
            return self.with_surface(false, |surface| {
                surface.apply_edit(EditEvent::preedit(text, preedit_cursor));
                self.send_update();
                true
            });
        }
        if !self.finish_composing_text() {
            return false;
        }
        self.with_surface(false, |surface| {
            let origin = block_origin(surface);
            let block_len = BlockRelativeOffset(char_len(&surface.surrounding_text()));
            // offsets before the block clamp to its start, past it to its end
            let to_rel = |abs: usize| {
                AbsoluteOffset(abs)
                    .to_block_relative(origin)
                    .unwrap_or(BlockRelativeOffset(0))
                    .min(block_len)
            };
            surface.set_selection(Selection { anchor: to_rel(start), cursor: to_rel(end) });
            self.send_update();
            true
        })
    }

    fn shortcut(&self, shortcut: StandardShortcut) -> bool {
        if !self.finish_composing_text() {
            return false;
        }
        self.with_surface(false, |surface| {
            surface.send_shortcut(shortcut);
            self.send_update();
            true
        })
    }

    pub fn select_all(&self) -> bool {
        self.shortcut(StandardShortcut::SelectAll)
    }

    pub fn cut(&self) -> bool {
        self.shortcut(StandardShortcut::Cut)
    }

    pub fn copy(&self) -> bool {
        self.shortcut(StandardShortcut::Copy)
    }

    pub fn paste(&self) -> bool {
        self.shortcut(StandardShortcut::Paste)
    }

    /// The enter/submit key was pressed on the input method. A plain
    /// `Return` action inserts a line break; every other action activates
    /// the surface's accept behavior.
    pub fn perform_editor_action(&self, action: EnterKeyAction) -> bool {
        if !self.finish_composing_text() {
            return false;
        }
        self.with_surface(false, |surface| {
            match action {
                EnterKeyAction::Return => {
                    surface.apply_edit(EditEvent::commit("\n"));
                    self.send_update();
                }
                _ => surface.accept(),
            }
            true
        })
    }

    // --- composing-aware text queries ---

    /// Text before the effective cursor, preedit included, bounded to
    /// `max_chars`.
    pub fn text_before_cursor(&self, max_chars: usize) -> String {
        self.with_surface(String::new(), |surface| {
            let committed = surface.text_before_cursor(max_chars);
            let composing = self.composing.borrow();
            let spliced = match composing.start() {
                Some(start) => {
                    let cursor_in_preedit = composing
                        .cursor()
                        .map(|c| c - start)
                        .unwrap_or_else(|| composing.char_len());
                    committed + slice_chars(composing.text(), 0, cursor_in_preedit)
                }
                None => committed,
            };
            let len = char_len(&spliced);
            slice_chars(&spliced, len.saturating_sub(max_chars), len).to_string()
        })
    }

    /// Text after the effective cursor, preedit included, bounded to
    /// `max_chars`.
    pub fn text_after_cursor(&self, max_chars: usize) -> String {
        self.with_surface(String::new(), |surface| {
            let committed = surface.text_after_cursor(max_chars);
            let composing = self.composing.borrow();
            let spliced = match composing.start() {
                Some(start) => {
                    let cursor_in_preedit = composing
                        .cursor()
                        .map(|c| c - start)
                        .unwrap_or_else(|| composing.char_len());
                    slice_chars(composing.text(), cursor_in_preedit, composing.char_len())
                        .to_string()
                        + &committed
                }
                None => committed,
            };
            slice_chars(&spliced, 0, max_chars).to_string()
        })
    }

    pub fn selected_text(&self) -> String {
        self.with_surface(String::new(), |surface| surface.selected_text())
    }

    /// Capitalization the input method should apply at the cursor, derived
    /// from input hints and sentence-boundary detection over the preceding
    /// text. Only modes present in `requested` are reported.
    pub fn cursor_caps_mode(&self, requested: CapsModes) -> CapsModes {
        self.with_surface(CapsModes::default(), |surface| {
            let hints = surface.input_hints();
            if hints.uppercase_only {
                return CapsModes {
                    characters: requested.characters,
                    words: requested.words,
                    sentences: requested.sentences,
                };
            }
            if hints.lowercase_only {
                return CapsModes::default();
            }
            let before = self.text_before_cursor(SURROUNDING_TEXT_WINDOW);
            let trimmed = before.trim_end();
            let at_sentence_start = trimmed.is_empty()
                || (trimmed.len() < before.len()
                    && trimmed.chars().next_back().is_some_and(|c| {
                        matches!(c, '.' | '!' | '?')
                    }));
            let at_word_start =
                before.chars().next_back().map_or(true, char::is_whitespace);
            // no_auto_uppercase only opts out of sentence capitalization
            CapsModes {
                characters: false,
                words: requested.words && at_word_start,
                sentences: requested.sentences
                    && at_sentence_start
                    && !hints.no_auto_uppercase,
            }
        })
    }

    /// Builds the bounded document snapshot the input method renders from.
    /// `max_chars` and `max_lines` of zero fall back to the default window
    /// and to no line bound respectively. Suppressed (returns `None`) while
    /// a batch edit is open, since the document is mid-edit. The most recent
    /// snapshot is cached.
    pub fn extracted_text(&self, max_chars: usize, max_lines: usize) -> Option<ExtractedText> {
        if self.in_batch() {
            return None;
        }
        self.with_surface(None, |surface| {
            let max_chars = if max_chars == 0 { SURROUNDING_TEXT_WINDOW } else { max_chars };
            let cursor_abs = usize::from(surface.absolute_position());
            let before = self.text_before_cursor(max_chars / 2);
            let after = self.text_after_cursor(max_chars - char_len(&before));
            let composing = self.composing.borrow();
            let effective_cursor = composing
                .cursor()
                .map(usize::from)
                .unwrap_or(cursor_abs + composing.char_len());
            drop(composing);
            let text = before.clone() + &after;
            let start_offset = effective_cursor.saturating_sub(char_len(&before));
            let cursor_in_snapshot = effective_cursor - start_offset;

            let origin = block_origin(surface);
            let anchor = usize::from(surface.anchor_position().to_absolute(origin));
            let anchor_in_snapshot =
                anchor.saturating_sub(start_offset).min(char_len(&text));

            let (window_start, window_end) =
                line_window(&text, cursor_in_snapshot, max_lines);
            let clip = |offset: usize| offset.clamp(window_start, window_end) - window_start;
            let snapshot = ExtractedText {
                text: slice_chars(&text, window_start, window_end).to_string(),
                start_offset: start_offset + window_start,
                selection_start: clip(anchor_in_snapshot.min(cursor_in_snapshot)),
                selection_end: clip(anchor_in_snapshot.max(cursor_in_snapshot)),
                partial: None,
            };
            self.extracted_cache.replace(Some(snapshot.clone()));
            Some(snapshot)
        })
    }

    /// The most recent snapshot handed out, if any.
    pub fn cached_extracted_text(&self) -> Option<ExtractedText> {
        self.extracted_cache.borrow().clone()
    }

    // --- gestures, handles and timers ---

    pub fn touch_down(&self, _pos: LogicalPoint, now: Instant) {
        let changed = self.with_surface(false, |surface| {
            self.handles.borrow_mut().on_touch_down(surface, now)
        });
        if changed {
            self.push_handle_placement();
        }
    }

    pub fn long_press(&self, pos: LogicalPoint, now: Instant) {
        let changed = self.with_surface(false, |surface| {
            let changed = self.handles.borrow_mut().on_long_press(surface, pos, now);
            self.send_update();
            changed
        });
        if changed {
            self.push_handle_placement();
        }
    }

    pub fn handle_location_changed(&self, handle: Handle, pos: LogicalPoint) {
        let changed = self.with_surface(false, |surface| {
            let changed = self.handles.borrow_mut().on_handle_dragged(surface, handle, pos);
            self.send_update();
            changed
        });
        if changed {
            self.push_handle_placement();
        }
    }

    /// A hardware or software keystroke reached the surface.
    pub fn keystroke(&self) {
        if self.handles.borrow_mut().on_keystroke() {
            self.push_handle_placement();
        }
    }

    /// Drives the auto-hide timer. The embedder calls this after the
    /// duration it was handed via
    /// [`PlatformNotifier::request_timer_wakeup`] elapses.
    pub fn update_timers(&self, now: Instant) {
        if self.handles.borrow_mut().update_timers(now) {
            self.push_handle_placement();
        }
    }

    fn push_handle_placement(&self) {
        let handles = self.handles.borrow();
        let placement =
            self.with_surface(Default::default(), |surface| handles.placement(surface));
        self.notifier.update_handles(placement);
        self.notifier.request_timer_wakeup(handles.duration_until_auto_hide(Instant::now()));
    }

    fn input_method_properties(&self) -> InputMethodProperties {
        self.with_surface(InputMethodProperties::default(), |surface| {
            let composing = self.composing.borrow();
            let origin = block_origin(surface);
            let preedit_offset = composing
                .start()
                .map(|start| usize::from(start).saturating_sub(usize::from(origin)))
                .unwrap_or_default();
            let anchor = surface.anchor_position();
            let cursor = surface.cursor_position();
            InputMethodProperties {
                text: surface.surrounding_text(),
                cursor_position: cursor.into(),
                anchor_position: (anchor != cursor).then(|| anchor.into()),
                preedit_text: composing.text().to_string(),
                preedit_offset,
                cursor_rect: surface.cursor_rect(),
                anchor_point: {
                    let rect = surface.anchor_rect();
                    crate::lengths::logical_point(rect.min_x(), rect.max_y())
                },
                input_hints: surface.input_hints(),
                enter_key: surface.enter_key_action(),
            }
        })
    }
}

fn block_origin(surface: &dyn EditableSurface) -> AbsoluteOffset {
    let abs = surface.absolute_position();
    let rel = surface.cursor_position();
    AbsoluteOffset(usize::from(abs).saturating_sub(usize::from(rel)))
}

/// Char range covering at most `max_lines` lines of `text` around the line
/// containing `cursor`. `max_lines` of zero means no bound.
fn line_window(text: &str, cursor: usize, max_lines: usize) -> (usize, usize) {
    let mut line_starts = vec![0];
    for (i, c) in text.chars().enumerate() {
        if c == '\n' {
            line_starts.push(i + 1);
        }
    }
    let total = line_starts.len();
    let text_len = char_len(text);
    if max_lines == 0 || total <= max_lines {
        return (0, text_len);
    }
    let cursor_line = match line_starts.binary_search(&cursor.min(text_len)) {
        Ok(line) => line,
        Err(line) => line - 1,
    };
    let first = cursor_line.saturating_sub(max_lines / 2).min(total - max_lines);
    let end = match line_starts.get(first + max_lines) {
        // exclude the trailing newline of the last kept line
        Some(&next_start) => next_start - 1,
        None => text_len,
    };
    (line_starts[first], end)
}
