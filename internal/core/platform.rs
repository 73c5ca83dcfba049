// Copyright © SoftInput contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The seam between the synchronization engine and the embedding platform:
//! notifications pushed towards the system input method, and the event loop
//! abstraction used to marshal work onto the UI thread.

use std::sync::Arc;

use crate::handles::HandleState;
use crate::lengths::{LogicalPoint, LogicalRect};
use crate::surface::{EnterKeyAction, InputHints};

/// A snapshot of everything the system input method needs to know about the
/// focused editor. Built by the context whenever the relevant state changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputMethodProperties {
    /// Committed text of the block that contains the cursor. Does not
    /// include the preedit.
    pub text: String,
    /// Cursor position, in chars, relative to the start of `text`.
    pub cursor_position: usize,
    /// Selection anchor, in chars, relative to the start of `text`.
    /// `None` when the selection is degenerate.
    pub anchor_position: Option<usize>,
    /// Currently displayed preedit text.
    pub preedit_text: String,
    /// Position where the preedit starts, in chars, relative to `text`.
    pub preedit_offset: usize,
    /// Rectangle of the cursor, in surface coordinates.
    pub cursor_rect: LogicalRect,
    /// Bottom-left corner of the selection anchor's rectangle.
    pub anchor_point: LogicalPoint,
    pub input_hints: InputHints,
    pub enter_key: EnterKeyAction,
}

/// A request from the engine that the platform adjust the system input
/// method.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum InputMethodRequest {
    /// An editable element gained focus: show the input method.
    Enable(InputMethodProperties),
    /// The editor state changed while focused (cursor moved, text edited).
    Update(InputMethodProperties),
    /// Focus left the editable element: hide the input method.
    Disable,
}

/// Where the text handles should be drawn, derived from the current
/// [`HandleState`] and selection geometry. Absent points mean the
/// corresponding handle is not shown.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandlePlacement {
    pub state: HandleState,
    /// Anchor for the single cursor handle.
    pub cursor: Option<LogicalPoint>,
    /// Anchor for the handle at the logically-first selection endpoint.
    pub left: Option<LogicalPoint>,
    /// Anchor for the handle at the logically-last selection endpoint.
    pub right: Option<LogicalPoint>,
    /// Rectangle near which the edit popup (cut/copy/paste) should open,
    /// when [`HandleState::show_edit_popup`] is set.
    pub popup_around: Option<LogicalRect>,
}

/// Implemented by the embedder to receive engine-driven notifications on the
/// UI thread. All methods have empty defaults so a platform only implements
/// what it renders.
pub trait PlatformNotifier {
    /// The system input method should be enabled, refreshed, or disabled.
    fn input_method_request(&self, _request: InputMethodRequest) {}

    /// The text handle overlay changed.
    fn update_handles(&self, _placement: HandlePlacement) {}

    /// The engine armed or disarmed its auto-hide timer. The embedder is
    /// expected to call back into the context once the returned duration
    /// elapses; `None` cancels a pending wakeup.
    fn request_timer_wakeup(&self, _after: Option<core::time::Duration>) {}
}

/// Error returned when posting work to a closed event loop.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EventLoopError {
    /// The event loop has terminated; the closure was dropped unrun.
    EventLoopTerminated,
}

impl core::fmt::Display for EventLoopError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EventLoopError::EventLoopTerminated => {
                f.write_str("the event loop was already terminated")
            }
        }
    }
}

impl std::error::Error for EventLoopError {}

/// A thread-safe handle onto the UI event loop. Cloned freely and invoked
/// from input-method threads.
pub trait EventLoopProxy: Send + Sync {
    /// Schedules `event` to run on the UI thread, preserving submission
    /// order with respect to other invocations on this proxy.
    fn invoke_from_event_loop(
        &self,
        event: Box<dyn FnOnce() + Send>,
    ) -> Result<(), EventLoopError>;
}

impl EventLoopProxy for Arc<dyn EventLoopProxy> {
    fn invoke_from_event_loop(
        &self,
        event: Box<dyn FnOnce() + Send>,
    ) -> Result<(), EventLoopError> {
        (**self).invoke_from_event_loop(event)
    }
}
