// Copyright © SoftInput contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Testing backend: an in-memory [`EditableSurface`], a recording
//! [`PlatformNotifier`] and a minimal event loop, used by the integration
//! tests and usable by downstream test suites.
//!
//! The test surface uses fixed-advance glyph geometry (10 logical pixels
//! per char, 10 per line) so gesture positions can be computed in tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use softinput_core::lengths::{logical_rect, LogicalPoint, LogicalRect};
use softinput_core::offsets::AbsoluteOffset;
use softinput_core::platform::{
    EventLoopError, EventLoopProxy, HandlePlacement, InputMethodRequest, PlatformNotifier,
};
use softinput_core::surface::{
    EditEvent, EditableSurface, EnterKeyAction, InputHints, Selection, StandardShortcut,
};
use softinput_core::BlockRelativeOffset;

pub const CHAR_WIDTH: f32 = 10.;
pub const LINE_HEIGHT: f32 = 10.;

/// An editable surface over an in-memory multi-block document. Blocks are
/// separated by `\n`; all stored offsets are absolute char offsets into the
/// committed text. The displayed preedit is overlay state and never part of
/// the committed text.
pub struct TestSurface {
    text: RefCell<String>,
    cursor: Cell<usize>,
    anchor: Cell<usize>,
    preedit: RefCell<String>,
    preedit_pos: Cell<usize>,
    preedit_cursor: Cell<Option<usize>>,
    hints: Cell<InputHints>,
    enabled: Cell<bool>,
    read_only: Cell<bool>,
    enter_key: Cell<EnterKeyAction>,
    clipboard: Mutex<Option<String>>,
    edit_log: RefCell<Vec<EditEvent>>,
    shortcut_log: RefCell<Vec<StandardShortcut>>,
    accept_count: Cell<usize>,
}

impl Default for TestSurface {
    fn default() -> Self {
        Self {
            text: RefCell::new(String::new()),
            cursor: Cell::new(0),
            anchor: Cell::new(0),
            preedit: RefCell::new(String::new()),
            preedit_pos: Cell::new(0),
            preedit_cursor: Cell::new(None),
            hints: Cell::new(InputHints::default()),
            enabled: Cell::new(true),
            read_only: Cell::new(false),
            enter_key: Cell::new(EnterKeyAction::default()),
            clipboard: Mutex::new(None),
            edit_log: RefCell::new(Vec::new()),
            shortcut_log: RefCell::new(Vec::new()),
            accept_count: Cell::new(0),
        }
    }
}

impl TestSurface {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn with_text(text: &str, cursor: usize) -> Rc<Self> {
        let surface = Self::default();
        *surface.text.borrow_mut() = text.to_string();
        let cursor = cursor.min(text.chars().count());
        surface.cursor.set(cursor);
        surface.anchor.set(cursor);
        Rc::new(surface)
    }

    pub fn with_selection(text: &str, anchor: usize, cursor: usize) -> Rc<Self> {
        let surface = Self::with_text(text, cursor);
        surface.anchor.set(anchor.min(text.chars().count()));
        surface
    }

    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    /// Committed text with the displayed preedit spliced in.
    pub fn displayed_text(&self) -> String {
        let chars: Vec<char> = self.text.borrow().chars().collect();
        let pos = self.preedit_pos.get().min(chars.len());
        let mut out: String = chars[..pos].iter().collect();
        out.push_str(&self.preedit.borrow());
        out.extend(&chars[pos..]);
        out
    }

    pub fn cursor(&self) -> usize {
        self.cursor.get()
    }

    pub fn anchor(&self) -> usize {
        self.anchor.get()
    }

    pub fn preedit(&self) -> String {
        self.preedit.borrow().clone()
    }

    pub fn preedit_position(&self) -> usize {
        self.preedit_pos.get()
    }

    pub fn set_input_hints(&self, hints: InputHints) {
        self.hints.set(hints);
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.set(read_only);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn set_enter_key_action(&self, action: EnterKeyAction) {
        self.enter_key.set(action);
    }

    pub fn set_clipboard(&self, text: &str) {
        *self.clipboard.lock().unwrap() = Some(text.to_string());
    }

    pub fn clipboard(&self) -> Option<String> {
        self.clipboard.lock().unwrap().clone()
    }

    pub fn edit_events(&self) -> Vec<EditEvent> {
        self.edit_log.borrow().clone()
    }

    pub fn shortcuts(&self) -> Vec<StandardShortcut> {
        self.shortcut_log.borrow().clone()
    }

    pub fn accept_count(&self) -> usize {
        self.accept_count.get()
    }

    /// Char offset of the start of the block (line) containing `offset`.
    fn block_start(&self, offset: usize) -> usize {
        let chars: Vec<char> = self.text.borrow().chars().collect();
        let offset = offset.min(chars.len());
        chars[..offset]
            .iter()
            .rposition(|&c| c == '\n')
            .map(|newline| newline + 1)
            .unwrap_or(0)
    }

    fn block_end(&self, offset: usize) -> usize {
        let chars: Vec<char> = self.text.borrow().chars().collect();
        let offset = offset.min(chars.len());
        chars[offset..]
            .iter()
            .position(|&c| c == '\n')
            .map(|newline| offset + newline)
            .unwrap_or(chars.len())
    }

    fn line_and_column(&self, offset: usize) -> (usize, usize) {
        let chars: Vec<char> = self.text.borrow().chars().collect();
        let offset = offset.min(chars.len());
        let line = chars[..offset].iter().filter(|&&c| c == '\n').count();
        (line, offset - self.block_start(offset))
    }

    fn selected_range(&self) -> (usize, usize) {
        let (a, c) = (self.anchor.get(), self.cursor.get());
        (a.min(c), a.max(c))
    }
}

impl EditableSurface for TestSurface {
    fn cursor_position(&self) -> BlockRelativeOffset {
        BlockRelativeOffset(self.cursor.get() - self.block_start(self.cursor.get()))
    }

    fn anchor_position(&self) -> BlockRelativeOffset {
        let origin = self.block_start(self.cursor.get());
        BlockRelativeOffset(self.anchor.get().saturating_sub(origin))
    }

    fn absolute_position(&self) -> AbsoluteOffset {
        AbsoluteOffset(self.cursor.get())
    }

    fn surrounding_text(&self) -> String {
        let start = self.block_start(self.cursor.get());
        let end = self.block_end(self.cursor.get());
        let chars: Vec<char> = self.text.borrow().chars().collect();
        chars[start..end].iter().collect()
    }

    fn text_before_cursor(&self, max_chars: usize) -> String {
        let chars: Vec<char> = self.text.borrow().chars().collect();
        let cursor = self.cursor.get().min(chars.len());
        chars[cursor.saturating_sub(max_chars)..cursor].iter().collect()
    }

    fn text_after_cursor(&self, max_chars: usize) -> String {
        let chars: Vec<char> = self.text.borrow().chars().collect();
        let cursor = self.cursor.get().min(chars.len());
        chars[cursor..(cursor + max_chars).min(chars.len())].iter().collect()
    }

    fn selected_text(&self) -> String {
        let (start, end) = self.selected_range();
        let chars: Vec<char> = self.text.borrow().chars().collect();
        chars[start.min(chars.len())..end.min(chars.len())].iter().collect()
    }

    fn input_hints(&self) -> InputHints {
        self.hints.get()
    }

    fn enabled(&self) -> bool {
        self.enabled.get()
    }

    fn read_only(&self) -> bool {
        self.read_only.get()
    }

    fn enter_key_action(&self) -> EnterKeyAction {
        self.enter_key.get()
    }

    fn cursor_rect(&self) -> LogicalRect {
        self.rect_for_offset(AbsoluteOffset(self.cursor.get()))
    }

    fn anchor_rect(&self) -> LogicalRect {
        self.rect_for_offset(AbsoluteOffset(self.anchor.get()))
    }

    fn visible_rect(&self) -> LogicalRect {
        logical_rect(0., 0., 800., 600.)
    }

    fn offset_for_position(&self, position: LogicalPoint) -> AbsoluteOffset {
        let chars: Vec<char> = self.text.borrow().chars().collect();
        let line = (position.y / LINE_HEIGHT).floor().max(0.) as usize;
        let column = (position.x / CHAR_WIDTH).round().max(0.) as usize;
        let mut line_start = 0;
        for _ in 0..line {
            match chars[line_start..].iter().position(|&c| c == '\n') {
                Some(newline) => line_start += newline + 1,
                None => break,
            }
        }
        let line_end = chars[line_start..]
            .iter()
            .position(|&c| c == '\n')
            .map(|newline| line_start + newline)
            .unwrap_or(chars.len());
        AbsoluteOffset((line_start + column).min(line_end))
    }

    fn rect_for_offset(&self, offset: AbsoluteOffset) -> LogicalRect {
        let (line, column) = self.line_and_column(offset.into());
        logical_rect(column as f32 * CHAR_WIDTH, line as f32 * LINE_HEIGHT, 1., LINE_HEIGHT)
    }

    fn apply_edit(&self, event: EditEvent) {
        self.edit_log.borrow_mut().push(event.clone());
        let mut chars: Vec<char> = self.text.borrow().chars().collect();
        let mut cursor = self.cursor.get().min(chars.len());
        let mut anchor = self.anchor.get().min(chars.len());
        let had_preedit = !self.preedit.borrow().is_empty();

        // step 1: drop the displayed preedit (overlay only, the committed
        // text is untouched) and find the working position
        let mut working = if had_preedit {
            self.preedit.borrow_mut().clear();
            self.preedit_cursor.set(None);
            self.preedit_pos.get().min(chars.len())
        } else if anchor != cursor
            && event.replace_len == 0
            && (!event.commit.is_empty() || !event.preedit.is_empty())
        {
            let (start, end) = (cursor.min(anchor), cursor.max(anchor));
            chars.drain(start..end);
            cursor = start;
            anchor = start;
            start
        } else {
            cursor
        };

        // step 2: delete the replace range; cursor and anchor collapse at
        // the deletion point
        if event.replace_len > 0 {
            let start =
                (working as i64 + event.replace_from).clamp(0, chars.len() as i64) as usize;
            let end = (start + event.replace_len).min(chars.len());
            chars.drain(start..end);
            cursor = start;
            anchor = start;
            working = start;
        }

        // step 3: commit
        if !event.commit.is_empty() {
            let working_clamped = working.min(chars.len());
            chars.splice(working_clamped..working_clamped, event.commit.chars());
            cursor = working_clamped + event.commit.chars().count();
            anchor = cursor;
        }

        // step 4: display the new preedit at the cursor
        if !event.preedit.is_empty() {
            if had_preedit && event.commit.is_empty() && event.replace_len == 0 {
                cursor = working;
                anchor = working;
            }
            self.preedit_pos.set(cursor.min(chars.len()));
            *self.preedit.borrow_mut() = event.preedit.clone();
            self.preedit_cursor.set(event.preedit_cursor);
        }

        // step 5: explicit selection
        if let Some(selection) = event.selection {
            let origin = {
                let up_to = cursor.min(chars.len());
                chars[..up_to]
                    .iter()
                    .rposition(|&c| c == '\n')
                    .map(|newline| newline + 1)
                    .unwrap_or(0)
            };
            cursor = (origin + usize::from(selection.cursor)).min(chars.len());
            anchor = (origin + usize::from(selection.anchor)).min(chars.len());
        }

        *self.text.borrow_mut() = chars.into_iter().collect();
        self.cursor.set(cursor);
        self.anchor.set(anchor);
    }

    fn set_selection(&self, selection: Selection) {
        let origin = self.block_start(self.cursor.get());
        let len = self.text.borrow().chars().count();
        self.cursor.set((origin + usize::from(selection.cursor)).min(len));
        self.anchor.set((origin + usize::from(selection.anchor)).min(len));
    }

    fn send_shortcut(&self, shortcut: StandardShortcut) {
        self.shortcut_log.borrow_mut().push(shortcut);
        match shortcut {
            StandardShortcut::SelectAll => {
                self.anchor.set(0);
                self.cursor.set(self.text.borrow().chars().count());
            }
            StandardShortcut::Copy => {
                *self.clipboard.lock().unwrap() = Some(self.selected_text());
            }
            StandardShortcut::Cut => {
                let selected = self.selected_text();
                let (start, end) = self.selected_range();
                *self.clipboard.lock().unwrap() = Some(selected);
                let mut chars: Vec<char> = self.text.borrow().chars().collect();
                chars.drain(start.min(chars.len())..end.min(chars.len()));
                *self.text.borrow_mut() = chars.into_iter().collect();
                self.cursor.set(start);
                self.anchor.set(start);
            }
            StandardShortcut::Paste => {
                let Some(pasted) = self.clipboard.lock().unwrap().clone() else { return };
                let (start, end) = self.selected_range();
                let mut chars: Vec<char> = self.text.borrow().chars().collect();
                chars.splice(start.min(chars.len())..end.min(chars.len()), pasted.chars());
                *self.text.borrow_mut() = chars.into_iter().collect();
                let after = start + pasted.chars().count();
                self.cursor.set(after);
                self.anchor.set(after);
            }
        }
    }

    fn accept(&self) {
        self.accept_count.set(self.accept_count.get() + 1);
    }
}

/// Records every notification the engine pushes, for assertions. Clones
/// share the underlying logs.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub ime_requests: Rc<RefCell<Vec<InputMethodRequest>>>,
    pub handle_updates: Rc<RefCell<Vec<HandlePlacement>>>,
    pub timer_requests: Rc<RefCell<Vec<Option<Duration>>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_count(&self) -> usize {
        self.ime_requests
            .borrow()
            .iter()
            .filter(|request| matches!(request, InputMethodRequest::Update(_)))
            .count()
    }

    pub fn last_request(&self) -> Option<InputMethodRequest> {
        self.ime_requests.borrow().last().cloned()
    }

    pub fn last_handle_update(&self) -> Option<HandlePlacement> {
        self.handle_updates.borrow().last().cloned()
    }
}

impl PlatformNotifier for RecordingNotifier {
    fn input_method_request(&self, request: InputMethodRequest) {
        self.ime_requests.borrow_mut().push(request);
    }

    fn update_handles(&self, placement: HandlePlacement) {
        self.handle_updates.borrow_mut().push(placement);
    }

    fn request_timer_wakeup(&self, after: Option<Duration>) {
        self.timer_requests.borrow_mut().push(after);
    }
}

enum Event {
    Quit,
    Event(Box<dyn FnOnce() + Send>),
}

/// Thread-safe handle onto a [`TestLoop`].
#[derive(Clone)]
pub struct Queue(Arc<Mutex<VecDeque<Event>>>, std::thread::Thread);

impl Queue {
    pub fn quit(&self) {
        self.0.lock().unwrap().push_back(Event::Quit);
        self.1.unpark();
    }
}

impl EventLoopProxy for Queue {
    fn invoke_from_event_loop(
        &self,
        event: Box<dyn FnOnce() + Send>,
    ) -> Result<(), EventLoopError> {
        self.0.lock().unwrap().push_back(Event::Event(event));
        self.1.unpark();
        Ok(())
    }
}

/// A minimal single-threaded event loop for exercising the cross-thread
/// protocol path in tests.
pub struct TestLoop {
    queue: Queue,
}

impl Default for TestLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl TestLoop {
    /// The constructing thread becomes the loop (UI) thread.
    pub fn new() -> Self {
        Self { queue: Queue(Arc::new(Mutex::new(VecDeque::new())), std::thread::current()) }
    }

    pub fn proxy(&self) -> Queue {
        self.queue.clone()
    }

    /// Processes events until [`Queue::quit`] is called.
    pub fn run(&self) {
        loop {
            let event = self.queue.0.lock().unwrap().pop_front();
            match event {
                Some(Event::Quit) => break,
                Some(Event::Event(event)) => event(),
                None => std::thread::park(),
            }
        }
    }

    /// Runs queued events until the queue is empty, without blocking.
    pub fn drain(&self) {
        loop {
            let event = self.queue.0.lock().unwrap().pop_front();
            match event {
                Some(Event::Event(event)) => event(),
                Some(Event::Quit) | None => break,
            }
        }
    }
}
