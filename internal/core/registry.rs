// Copyright © SoftInput contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps opaque handles to live [`InputContext`] instances.
//!
//! Platform callbacks carry no context argument of their own, so the
//! closures marshaled across threads capture a [`ContextHandle`] instead of
//! a reference. The handle is resolved on the UI thread; callbacks arriving
//! after [`deregister`] resolve to nothing and are dropped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::InputContext;

/// Opaque, copyable identifier for a registered [`InputContext`]. Safe to
/// send across threads; resolution only works on the UI thread.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContextHandle(u64);

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static REGISTRY: RefCell<HashMap<ContextHandle, Rc<InputContext>>> =
        RefCell::new(HashMap::new());
}

/// Registers `context` with the UI thread's registry and returns its
/// handle.
pub fn register(context: Rc<InputContext>) -> ContextHandle {
    let handle = ContextHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed));
    REGISTRY.with(|registry| registry.borrow_mut().insert(handle, context));
    handle
}

/// Removes `handle`. Pending callbacks that still carry it become no-ops.
pub fn deregister(handle: ContextHandle) {
    REGISTRY.with(|registry| registry.borrow_mut().remove(&handle));
}

impl ContextHandle {
    /// Resolves to the owning context, if it is still registered with the
    /// current thread.
    pub fn resolve(self) -> Option<Rc<InputContext>> {
        REGISTRY.with(|registry| registry.borrow().get(&self).cloned())
    }
}
