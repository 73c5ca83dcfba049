// Copyright © SoftInput contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # SoftInput core
//!
//! The text-input synchronization engine bridging a platform's on-screen
//! input method to an application's focused editable text surface.
//!
//! The application framework implements [`EditableSurface`] for its text
//! editors and [`PlatformNotifier`]/[`EventLoopProxy`] for its main loop,
//! then wires platform callbacks to an [`InputMethodHandler`]. Everything
//! stateful lives in an [`InputContext`] owned by the UI thread; calls from
//! input-method threads are marshaled over by a [`SyncInvoker`] and degrade
//! to neutral results rather than fail.

#![deny(unsafe_code)]

pub mod composing;
pub mod context;
pub mod handler;
pub mod handles;
pub mod invoker;
pub mod lengths;
pub mod offsets;
pub mod platform;
pub mod registry;
pub mod surface;

pub use context::{CapsModes, ExtractedText, InputContext, QueryFlags, SURROUNDING_TEXT_WINDOW};
pub use handler::InputMethodHandler;
pub use handles::{
    Handle, HandleState, HandleVisibility, CURSOR_HANDLE_AUTO_HIDE, WORD_SELECTION_SCAN_LIMIT,
};
pub use invoker::{BlockingSection, SyncInvoker};
pub use offsets::{AbsoluteOffset, BlockRelativeOffset};
pub use platform::{
    EventLoopError, EventLoopProxy, HandlePlacement, InputMethodProperties, InputMethodRequest,
    PlatformNotifier,
};
pub use registry::{deregister, register, ContextHandle};
pub use surface::{
    EditEvent, EditableSurface, EnterKeyAction, InputHints, Selection, StandardShortcut,
};
