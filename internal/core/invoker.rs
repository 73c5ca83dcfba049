// Copyright © SoftInput contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Marshals input-method calls from whatever thread they arrive on to the
//! UI thread, blocking the caller until the work has run.
//!
//! The dangerous case is reentrancy: the UI thread may itself be blocked in
//! a synchronous call into the platform when that very call triggers an
//! input-method callback. Blocking then would deadlock the process. The UI
//! thread therefore wraps its blocking platform call-outs in a
//! [`BlockingSection`]; while one is held, [`SyncInvoker::invoke`] refuses
//! to block and returns `None` so the caller can degrade to a neutral
//! result.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, TryLockError};
use std::thread::{self, ThreadId};

use crate::platform::EventLoopProxy;

/// RAII marker for "the UI thread is blocked inside a platform call".
/// Obtained from [`SyncInvoker::enter_blocking_section`].
pub struct BlockingSection<'a>(#[allow(dead_code)] Option<MutexGuard<'a, ()>>);

/// Synchronous cross-thread call machinery shared by all protocol verbs.
pub struct SyncInvoker {
    proxy: Arc<dyn EventLoopProxy>,
    blocking_section: Arc<Mutex<()>>,
    ui_thread: ThreadId,
}

impl SyncInvoker {
    /// Must be constructed on the UI thread; the constructing thread is the
    /// one closures get marshaled to.
    pub fn new(proxy: Arc<dyn EventLoopProxy>) -> Self {
        Self {
            proxy,
            blocking_section: Arc::new(Mutex::new(())),
            ui_thread: thread::current().id(),
        }
    }

    /// Marks the UI thread as blocked in a synchronous platform call for
    /// the lifetime of the returned guard. Call only from the UI thread.
    pub fn enter_blocking_section(&self) -> BlockingSection<'_> {
        BlockingSection(self.blocking_section.lock().ok())
    }

    /// Runs `work` on the UI thread and returns its result, blocking the
    /// calling thread until it completes. Runs inline when already on the
    /// UI thread. Returns `None` without blocking when the UI thread is
    /// inside a [`BlockingSection`] or the event loop is gone.
    pub fn invoke<R: Send + 'static>(
        &self,
        work: impl FnOnce() -> R + Send + 'static,
    ) -> Option<R> {
        if thread::current().id() == self.ui_thread {
            return Some(work());
        }

        // Deadlock check: a held blocking section means the UI thread is
        // waiting on the platform, which is in turn waiting on us.
        match self.blocking_section.try_lock() {
            Ok(guard) => drop(guard),
            Err(TryLockError::WouldBlock) => {
                log::debug!(
                    "input method call while the UI thread waits on the platform; \
                     returning a neutral result"
                );
                return None;
            }
            Err(TryLockError::Poisoned(_)) => return None,
        }

        let mailbox = Arc::new((Mutex::new(None::<R>), Condvar::new()));
        let in_loop = mailbox.clone();
        self.proxy
            .invoke_from_event_loop(Box::new(move || {
                let result = work();
                let (slot, cvar) = &*in_loop;
                if let Ok(mut slot) = slot.lock() {
                    *slot = Some(result);
                }
                cvar.notify_one();
            }))
            .ok()?;

        let (slot, cvar) = &*mailbox;
        let mut slot = slot.lock().ok()?;
        while slot.is_none() {
            slot = cvar.wait(slot).ok()?;
        }
        slot.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::EventLoopError;
    use std::sync::mpsc;

    struct ChannelProxy(mpsc::Sender<Box<dyn FnOnce() + Send>>);

    impl EventLoopProxy for ChannelProxy {
        fn invoke_from_event_loop(
            &self,
            event: Box<dyn FnOnce() + Send>,
        ) -> Result<(), EventLoopError> {
            self.0.send(event).map_err(|_| EventLoopError::EventLoopTerminated)
        }
    }

    struct PanickingProxy;

    impl EventLoopProxy for PanickingProxy {
        fn invoke_from_event_loop(
            &self,
            _event: Box<dyn FnOnce() + Send>,
        ) -> Result<(), EventLoopError> {
            panic!("same-thread calls must run inline");
        }
    }

    #[test]
    fn same_thread_runs_inline() {
        let invoker = SyncInvoker::new(Arc::new(PanickingProxy));
        assert_eq!(invoker.invoke(|| 7), Some(7));
    }

    #[test]
    fn blocking_section_short_circuits_remote_calls() {
        let (sender, _receiver) = mpsc::channel();
        let invoker = Arc::new(SyncInvoker::new(Arc::new(ChannelProxy(sender))));
        let section = invoker.enter_blocking_section();
        let remote = invoker.clone();
        let result = thread::spawn(move || remote.invoke(|| 42)).join();
        assert_eq!(result.ok(), Some(None));
        drop(section);
    }

    #[test]
    fn terminated_event_loop_yields_none() {
        let (sender, receiver) = mpsc::channel();
        let invoker = Arc::new(SyncInvoker::new(Arc::new(ChannelProxy(sender))));
        drop(receiver);
        let remote = invoker.clone();
        let result = thread::spawn(move || remote.invoke(|| 1)).join();
        assert_eq!(result.ok(), Some(None));
    }

    #[test]
    fn remote_calls_run_on_the_loop_thread_in_order() {
        let (sender, receiver) = mpsc::channel::<Box<dyn FnOnce() + Send>>();
        let invoker = Arc::new(SyncInvoker::new(Arc::new(ChannelProxy(sender))));
        let loop_thread = thread::current().id();

        let remote = invoker.clone();
        let caller = thread::spawn(move || {
            let mut seen = Vec::new();
            for i in 0..4 {
                let observed = remote.invoke(move || {
                    assert_eq!(thread::current().id(), loop_thread);
                    i * 10
                });
                seen.push(observed);
            }
            seen
        });

        for _ in 0..4 {
            let event = receiver.recv().expect("caller posts four events");
            event();
        }
        assert_eq!(caller.join().ok(), Some(vec![Some(0), Some(10), Some(20), Some(30)]));
    }
}
