//! Registration of provider-created threads
//!
//! A provider that starts its own thread asks for a context with
//! `prepareAttachThread` on the calling thread, then calls `attachThread` with
//! it on the new thread before using any broker service and `detachThread`
//! when done. `detachThread` frees the prepared context.

use std::cell::Cell;
use std::thread::{self, ThreadId};

use dashmap::DashMap;

use super::objects::context::{self, NativeContext, CONTEXT_FT};
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};
use crate::value::raw::read_context;
use crate::value::NamedData;

thread_local! {
    /// Provider calls in progress on this thread
    static IN_CALL: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as running a broker-initiated provider call
pub(crate) struct CallMark(());

impl CallMark {
    pub(crate) fn enter() -> Self {
        IN_CALL.with(|c| c.set(c.get() + 1));
        CallMark(())
    }
}

impl Drop for CallMark {
    fn drop(&mut self) {
        IN_CALL.with(|c| c.set(c.get().saturating_sub(1)));
    }
}

fn in_call() -> bool {
    IN_CALL.try_with(|c| c.get() > 0).unwrap_or(false)
}

#[derive(Clone, Copy)]
struct Attached {
    context: usize,
}

/// Threads currently attached to the broker
#[derive(Default)]
pub(crate) struct ThreadRegistry {
    attached: DashMap<ThreadId, Attached>,
}

impl ThreadRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Copy of `ctx` for a thread about to be started
    ///
    /// # Safety
    /// `ctx` must be null or a live context handle.
    pub(crate) unsafe fn prepare(&self, ctx: *const CMPIContext) -> CmpiResult<*mut CMPIContext> {
        let entries = if ctx.is_null() {
            NamedData::new()
        } else {
            match NativeContext::try_from_handle(ctx, &CONTEXT_FT) {
                Some(o) => o.lock().entries.clone(),
                None => read_context(ctx)?,
            }
        };
        let prepared = context::create_prepared(entries);
        tracing::debug!("prepared context {:p} for a new thread", prepared);
        Ok(prepared)
    }

    /// # Safety
    /// `ctx` must be null or a live context handle.
    pub(crate) unsafe fn attach(&self, ctx: *const CMPIContext) -> CmpiResult<()> {
        let obj = NativeContext::from_handle(ctx, &CONTEXT_FT)?;
        if !obj.lock().prepared {
            return Err(CmpiError::invalid_handle("prepared context"));
        }
        let id = thread::current().id();
        if self.attached.contains_key(&id) {
            return Err(CmpiError::failed("thread is already attached"));
        }
        obj.lock().prepared = false;
        self.attached.insert(id, Attached { context: ctx as usize });
        tracing::debug!(thread = ?id, "thread attached");
        Ok(())
    }

    /// # Safety
    /// `ctx` must be null or the context this thread was attached with; it is
    /// freed on success.
    pub(crate) unsafe fn detach(&self, ctx: *const CMPIContext) -> CmpiResult<()> {
        let id = thread::current().id();
        let attached = self
            .attached
            .get(&id)
            .map(|a| *a)
            .ok_or_else(|| CmpiError::failed("thread is not attached"))?;
        if attached.context != ctx as usize {
            return Err(CmpiError::failed("context does not belong to this thread"));
        }
        self.attached.remove(&id);
        NativeContext::destroy(ctx as *mut CMPIContext);
        tracing::debug!(thread = ?id, "thread detached");
        Ok(())
    }

    pub(crate) fn is_attached(&self, id: ThreadId) -> bool {
        self.attached.contains_key(&id)
    }

    pub(crate) fn attached_count(&self) -> usize {
        self.attached.len()
    }

    /// Warn about a service call from a thread the broker knows nothing about
    pub(crate) fn check_caller(&self, service: &str) {
        let id = thread::current().id();
        if !in_call() && !self.is_attached(id) {
            tracing::warn!(thread = ?id, "{service} called from a thread that is not attached");
        }
    }

    /// Free contexts of threads that never detached
    pub(crate) fn clear(&self) {
        let stale: Vec<(ThreadId, Attached)> = self.attached.iter().map(|e| (*e.key(), *e.value())).collect();
        for (id, attached) in stale {
            tracing::warn!(thread = ?id, "thread still attached at shutdown");
            self.attached.remove(&id);
            // SAFETY: attached contexts are owned by the registry until detach
            unsafe { NativeContext::destroy(attached.context as *mut CMPIContext) };
        }
    }
}
