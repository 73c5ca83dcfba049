// Copyright © SoftInput contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The input-method facing facade.
//!
//! One [`InputMethodHandler`] exists per registered context. Platform
//! callbacks may arrive on any thread; every verb here marshals itself to
//! the UI thread through the [`SyncInvoker`] and degrades to the protocol's
//! neutral result (`false`, empty text, `None`) when the context is gone,
//! the event loop has terminated, or blocking would deadlock.

use std::sync::Arc;
use std::time::Instant;

use crate::context::{CapsModes, ExtractedText, QueryFlags};
use crate::handles::Handle;
use crate::invoker::SyncInvoker;
use crate::lengths::logical_point;
use crate::registry::ContextHandle;
use crate::surface::EnterKeyAction;

#[derive(Clone)]
pub struct InputMethodHandler {
    invoker: Arc<SyncInvoker>,
    context: ContextHandle,
}

impl InputMethodHandler {
    pub fn new(invoker: Arc<SyncInvoker>, context: ContextHandle) -> Self {
        Self { invoker, context }
    }

    /// Resolves the context on the UI thread and runs `verb_impl` against
    /// it, returning `neutral` on any failure along the way.
    fn with_context<R>(
        &self,
        verb: &'static str,
        neutral: R,
        verb_impl: impl FnOnce(&crate::context::InputContext) -> R + Send + 'static,
    ) -> R
    where
        R: Clone + Send + 'static,
    {
        let handle = self.context;
        let fallback = neutral.clone();
        self.invoker
            .invoke(move || match handle.resolve() {
                Some(context) => verb_impl(&context),
                None => {
                    log::warn!("{verb} called with no live input context");
                    fallback
                }
            })
            .unwrap_or(neutral)
    }

    pub fn begin_batch_edit(&self) -> bool {
        self.with_context("beginBatchEdit", false, |context| context.begin_batch_edit())
    }

    pub fn end_batch_edit(&self) -> bool {
        self.with_context("endBatchEdit", false, |context| context.end_batch_edit())
    }

    pub fn commit_text(&self, text: &str, new_cursor_rel: i64) -> bool {
        let text = text.to_string();
        self.with_context("commitText", false, move |context| {
            context.commit_text(&text, new_cursor_rel)
        })
    }

    pub fn set_composing_text(&self, text: &str, new_cursor_rel: i64) -> bool {
        let text = text.to_string();
        self.with_context("setComposingText", false, move |context| {
            context.set_composing_text(&text, new_cursor_rel)
        })
    }

    pub fn finish_composing_text(&self) -> bool {
        self.with_context("finishComposingText", false, |context| {
            context.finish_composing_text()
        })
    }

    pub fn set_composing_region(&self, start: usize, end: usize) -> bool {
        self.with_context("setComposingRegion", false, move |context| {
            context.set_composing_region(start, end)
        })
    }

    pub fn delete_surrounding_text(&self, left: i64, right: i64) -> bool {
        self.with_context("deleteSurroundingText", false, move |context| {
            context.delete_surrounding_text(left, right)
        })
    }

    pub fn set_selection(&self, start: usize, end: usize) -> bool {
        self.with_context("setSelection", false, move |context| {
            context.set_selection(start, end)
        })
    }

    pub fn select_all(&self) -> bool {
        self.with_context("selectAll", false, |context| context.select_all())
    }

    pub fn cut(&self) -> bool {
        self.with_context("cut", false, |context| context.cut())
    }

    pub fn copy(&self) -> bool {
        self.with_context("copy", false, |context| context.copy())
    }

    pub fn paste(&self) -> bool {
        self.with_context("paste", false, |context| context.paste())
    }

    pub fn perform_editor_action(&self, action: EnterKeyAction) -> bool {
        self.with_context("performEditorAction", false, move |context| {
            context.perform_editor_action(action)
        })
    }

    pub fn get_text_before_cursor(&self, max_chars: usize, _flags: QueryFlags) -> String {
        self.with_context("getTextBeforeCursor", String::new(), move |context| {
            context.text_before_cursor(max_chars)
        })
    }

    pub fn get_text_after_cursor(&self, max_chars: usize, _flags: QueryFlags) -> String {
        self.with_context("getTextAfterCursor", String::new(), move |context| {
            context.text_after_cursor(max_chars)
        })
    }

    pub fn get_selected_text(&self, _flags: QueryFlags) -> String {
        self.with_context("getSelectedText", String::new(), |context| context.selected_text())
    }

    pub fn get_cursor_caps_mode(&self, requested: CapsModes) -> CapsModes {
        self.with_context("getCursorCapsMode", CapsModes::default(), move |context| {
            context.cursor_caps_mode(requested)
        })
    }

    pub fn get_extracted_text(
        &self,
        max_chars: usize,
        max_lines: usize,
        _flags: QueryFlags,
    ) -> Option<ExtractedText> {
        self.with_context("getExtractedText", None, move |context| {
            context.extracted_text(max_chars, max_lines)
        })
    }

    pub fn touch_down(&self, x: f32, y: f32) {
        let now = Instant::now();
        self.with_context("touchDown", (), move |context| {
            context.touch_down(logical_point(x, y), now)
        })
    }

    pub fn long_press(&self, x: f32, y: f32) {
        let now = Instant::now();
        self.with_context("longPress", (), move |context| {
            context.long_press(logical_point(x, y), now)
        })
    }

    pub fn handle_location_changed(&self, handle: Handle, x: f32, y: f32) {
        self.with_context("handleLocationChanged", (), move |context| {
            context.handle_location_changed(handle, logical_point(x, y))
        })
    }

    /// Forwarded by the embedder whenever a keystroke reaches the focused
    /// surface, so the handle overlay can hide.
    pub fn keystroke(&self) {
        self.with_context("keystroke", (), |context| context.keystroke())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InputContext;
    use crate::platform::{EventLoopError, EventLoopProxy, PlatformNotifier};
    use crate::registry;
    use std::rc::Rc;

    struct NullNotifier;
    impl PlatformNotifier for NullNotifier {}

    struct InlineProxy;
    impl EventLoopProxy for InlineProxy {
        fn invoke_from_event_loop(
            &self,
            event: Box<dyn FnOnce() + Send>,
        ) -> Result<(), EventLoopError> {
            event();
            Ok(())
        }
    }

    #[test]
    fn verbs_are_neutral_without_a_surface() {
        let context = Rc::new(InputContext::new(Box::new(NullNotifier)));
        let handle = registry::register(context);
        let handler =
            InputMethodHandler::new(Arc::new(SyncInvoker::new(Arc::new(InlineProxy))), handle);

        assert!(!handler.commit_text("x", 1));
        assert!(!handler.set_selection(0, 0));
        assert_eq!(handler.get_text_before_cursor(10, QueryFlags::default()), "");
        assert_eq!(handler.get_selected_text(QueryFlags::default()), "");
        assert_eq!(handler.get_extracted_text(100, 0, QueryFlags::default()), None);
        // batch bookkeeping works even unfocused
        assert!(handler.begin_batch_edit());
        assert!(!handler.end_batch_edit());

        registry::deregister(handle);
    }

    #[test]
    fn verbs_are_neutral_after_deregistration() {
        let context = Rc::new(InputContext::new(Box::new(NullNotifier)));
        let handle = registry::register(context);
        registry::deregister(handle);
        let handler =
            InputMethodHandler::new(Arc::new(SyncInvoker::new(Arc::new(InlineProxy))), handle);

        assert!(!handler.finish_composing_text());
        assert_eq!(handler.get_cursor_caps_mode(CapsModes::default()), CapsModes::default());
    }
}
