// Copyright © SoftInput contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-thread marshaling: blocking delivery to the loop thread, arrival
//! ordering and the reentrancy short-circuit.

use std::rc::Rc;
use std::sync::Arc;
use std::thread;

use softinput_backend_testing::{RecordingNotifier, TestLoop, TestSurface};
use softinput_core::surface::EditableSurface;
use softinput_core::{registry, InputContext, InputMethodHandler, QueryFlags, SyncInvoker};

fn focused_context(surface: &Rc<TestSurface>) -> Rc<InputContext> {
    let context = Rc::new(InputContext::new(Box::new(RecordingNotifier::new())));
    let as_surface: Rc<dyn EditableSurface> = surface.clone();
    context.set_focused_surface(Some(&as_surface));
    context
}

#[test]
fn edit_operations_from_another_thread_apply_in_call_order() {
    let event_loop = TestLoop::new();
    let invoker = Arc::new(SyncInvoker::new(Arc::new(event_loop.proxy())));
    let surface = TestSurface::new();
    let handle = registry::register(focused_context(&surface));
    let handler = InputMethodHandler::new(invoker, handle);

    let quit = event_loop.proxy();
    let ime = thread::spawn(move || {
        let mut results = Vec::new();
        results.push(handler.commit_text("Hello ", 1));
        results.push(handler.set_composing_text("wrold", 1));
        results.push(handler.set_composing_text("world", 1));
        results.push(handler.finish_composing_text());
        results.push(handler.delete_surrounding_text(1, 0));
        results.push(handler.commit_text("!", 1));
        quit.quit();
        results
    });

    event_loop.run();
    assert_eq!(ime.join().unwrap(), vec![true; 6]);
    assert_eq!(surface.text(), "Hello worl!");

    // same operations applied directly on the loop thread give the same
    // document
    let reference = TestSurface::new();
    let context = focused_context(&reference);
    context.commit_text("Hello ", 1);
    context.set_composing_text("wrold", 1);
    context.set_composing_text("world", 1);
    context.finish_composing_text();
    context.delete_surrounding_text(1, 0);
    context.commit_text("!", 1);
    assert_eq!(reference.text(), surface.text());
    assert_eq!(reference.cursor(), surface.cursor());

    registry::deregister(handle);
}

#[test]
fn queries_cross_threads_too() {
    let event_loop = TestLoop::new();
    let invoker = Arc::new(SyncInvoker::new(Arc::new(event_loop.proxy())));
    let surface = TestSurface::with_text("stately plump", 7);
    let handle = registry::register(focused_context(&surface));
    let handler = InputMethodHandler::new(invoker, handle);

    let quit = event_loop.proxy();
    let ime = thread::spawn(move || {
        let before = handler.get_text_before_cursor(4, QueryFlags::default());
        let after = handler.get_text_after_cursor(100, QueryFlags::default());
        quit.quit();
        (before, after)
    });

    event_loop.run();
    assert_eq!(ime.join().unwrap(), ("tely".to_string(), " plump".to_string()));
    registry::deregister(handle);
}

#[test]
fn reentrant_calls_short_circuit_to_neutral_results() {
    let event_loop = TestLoop::new();
    let invoker = Arc::new(SyncInvoker::new(Arc::new(event_loop.proxy())));
    let surface = TestSurface::with_text("untouched", 0);
    let handle = registry::register(focused_context(&surface));
    let handler = InputMethodHandler::new(invoker.clone(), handle);

    // the loop thread is synchronously inside a platform call
    let section = invoker.enter_blocking_section();

    let ime = thread::spawn(move || {
        (
            handler.commit_text("x", 1),
            handler.get_text_before_cursor(5, QueryFlags::default()),
            handler.get_extracted_text(100, 0, QueryFlags::default()),
        )
    });
    let (committed, before, extracted) = ime.join().unwrap();
    assert!(!committed);
    assert_eq!(before, "");
    assert_eq!(extracted, None);
    assert_eq!(surface.text(), "untouched");

    drop(section);
    // the path works again once the blocking section ends
    let handler = InputMethodHandler::new(invoker, handle);
    let quit = event_loop.proxy();
    let ime = thread::spawn(move || {
        let committed = handler.commit_text("x", 1);
        quit.quit();
        committed
    });
    event_loop.run();
    assert!(ime.join().unwrap());
    assert_eq!(surface.text(), "xuntouched");
    registry::deregister(handle);
}

#[test]
fn deregistered_contexts_drop_late_callbacks() {
    let event_loop = TestLoop::new();
    let invoker = Arc::new(SyncInvoker::new(Arc::new(event_loop.proxy())));
    let surface = TestSurface::with_text("kept", 0);
    let handle = registry::register(focused_context(&surface));
    registry::deregister(handle);
    let handler = InputMethodHandler::new(invoker, handle);

    let quit = event_loop.proxy();
    let ime = thread::spawn(move || {
        let committed = handler.commit_text("x", 1);
        quit.quit();
        committed
    });
    event_loop.run();
    assert!(!ime.join().unwrap());
    assert_eq!(surface.text(), "kept");
}
