//! Heap layout shared by every object the broker hands out
//!
//! A native object is the CMPI envelope followed by broker-private state. The
//! envelope is the first field, so the handle pointer is the object pointer,
//! and `hdl` points back at the object itself. An object belongs to exactly
//! one of three scopes:
//!
//! - `Tracked`: created through the encapsulation table; freed by `release` or
//!   when the creating thread's arena is popped
//! - `Owned`: returned by `clone`; freed only by `release`
//! - `Request`: the context and result of a provider call; `release` is a
//!   no-op and the broker destroys them when the call returns

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::broker::memory;
use crate::handles::RawHandle;
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Scope {
    Tracked = 0,
    Owned = 1,
    Request = 2,
}

impl Scope {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Scope::Tracked,
            1 => Scope::Owned,
            _ => Scope::Request,
        }
    }
}

/// Envelope types that can head a native object
pub(crate) trait Envelope: RawHandle + Sized + 'static {
    fn envelope(hdl: *mut c_void, ft: *const Self::Ft) -> Self;
}

macro_rules! envelope {
    ($($env:ident),* $(,)?) => {
        $(
            impl Envelope for $env {
                fn envelope(hdl: *mut c_void, ft: *const Self::Ft) -> Self {
                    $env { hdl, ft }
                }
            }
        )*
    };
}

envelope!(
    CMPIContext,
    CMPIResult,
    CMPIString,
    CMPIArray,
    CMPIEnumeration,
    CMPIInstance,
    CMPIObjectPath,
    CMPIArgs,
    CMPIDateTime,
    CMPISelectExp,
    CMPISelectCond,
    CMPISubCond,
    CMPIPredicate,
    CMPIError,
    CMPIPropertyList,
);

#[repr(C)]
pub(crate) struct Native<E: Envelope, T> {
    base: E,
    scope: AtomicU8,
    data: Mutex<T>,
}

impl<E: Envelope, T> Native<E, T> {
    /// Allocate an object and return its handle
    pub(crate) fn create(ft: &'static E::Ft, data: T, scope: Scope) -> *mut E {
        let obj = Box::new(Native {
            base: E::envelope(ptr::null_mut(), ft),
            scope: AtomicU8::new(scope as u8),
            data: Mutex::new(data),
        });
        let p = Box::into_raw(obj);
        // SAFETY: freshly allocated
        unsafe {
            (*p).base = E::envelope(p.cast(), ft);
        }
        if scope == Scope::Tracked {
            memory::track(p.cast(), Self::free_erased);
        }
        p.cast()
    }

    unsafe fn free_erased(p: *mut c_void) {
        drop(Box::from_raw(p as *mut Self));
    }

    /// The object behind `h`, if `h` is one of ours with table `ft`
    ///
    /// # Safety
    /// `h` must be null or point to a readable envelope.
    pub(crate) unsafe fn try_from_handle<'a>(h: *const E, ft: &'static E::Ft) -> Option<&'a Self> {
        if h.is_null() || !ptr::eq(E::ft_ptr(h), ft) {
            return None;
        }
        Some(&*(h as *const Self))
    }

    /// # Safety
    /// As [`Self::try_from_handle`].
    pub(crate) unsafe fn from_handle<'a>(h: *const E, ft: &'static E::Ft) -> CmpiResult<&'a Self> {
        Self::try_from_handle(h, ft).ok_or_else(|| CmpiError::invalid_handle(E::WHAT))
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
        self.data.lock()
    }

    pub(crate) fn scope(&self) -> Scope {
        Scope::from_u8(self.scope.load(Ordering::Acquire))
    }

    /// `release` slot behavior
    ///
    /// # Safety
    /// `h` must be null or a handle not used again after a successful release.
    pub(crate) unsafe fn release(h: *mut E, ft: &'static E::Ft) -> CMPIStatus {
        let obj = match Self::from_handle(h, ft) {
            Ok(obj) => obj,
            Err(err) => return super::objects::status(&err),
        };
        match obj.scope() {
            Scope::Request => {
                tracing::warn!("release of a request-scoped {} ignored", E::WHAT);
            }
            Scope::Tracked => {
                if memory::untrack(h.cast()) {
                    Self::free_erased(h.cast());
                } else {
                    // created on another thread; its arena frees it
                    tracing::debug!("{} released off its creating thread", E::WHAT);
                }
            }
            Scope::Owned => Self::free_erased(h.cast()),
        }
        CMPIStatus::ok()
    }

    /// Free a request-scoped object once the call is over
    ///
    /// # Safety
    /// `h` must be a live request-scoped handle created by [`Self::create`].
    pub(crate) unsafe fn destroy(h: *mut E) {
        if !h.is_null() {
            Self::free_erased(h.cast());
        }
    }
}

impl<E: Envelope, T: Clone> Native<E, T> {
    /// `clone` slot behavior: an untracked copy owned by the caller
    ///
    /// # Safety
    /// As [`Self::try_from_handle`]; `rc` may be null.
    pub(crate) unsafe fn clone_handle(h: *const E, ft: &'static E::Ft, rc: *mut CMPIStatus) -> *mut E {
        let out = Self::from_handle(h, ft).map(|obj| {
            let data = obj.lock().clone();
            Self::create(ft, data, Scope::Owned)
        });
        super::objects::finish(rc, out, ptr::null_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::objects::string::STRING_FT;
    use std::ffi::CString;

    type TestString = Native<CMPIString, CString>;

    #[test]
    fn test_handle_is_object() {
        let h = TestString::create(&STRING_FT, CString::new("x").unwrap(), Scope::Owned);
        unsafe {
            assert_eq!((*h).hdl, h.cast());
            assert!(ptr::eq((*h).ft, &STRING_FT));
            let obj = TestString::from_handle(h, &STRING_FT).unwrap();
            assert_eq!(obj.lock().to_str().unwrap(), "x");
            assert_eq!(TestString::release(h, &STRING_FT).rc, CMPI_RC_OK);
        }
    }

    #[test]
    fn test_foreign_table_rejected() {
        let fake = CMPIString {
            hdl: ptr::null_mut(),
            ft: ptr::null(),
        };
        unsafe {
            assert!(TestString::try_from_handle(&fake, &STRING_FT).is_none());
            let err = TestString::from_handle(ptr::null(), &STRING_FT).err().unwrap();
            assert_eq!(err.rc(), CMPI_RC_ERR_INVALID_HANDLE);
        }
    }

    #[test]
    fn test_request_scope_ignores_release() {
        let h = TestString::create(&STRING_FT, CString::new("ctx").unwrap(), Scope::Request);
        unsafe {
            assert_eq!(TestString::release(h, &STRING_FT).rc, CMPI_RC_OK);
            // still alive
            let obj = TestString::from_handle(h, &STRING_FT).unwrap();
            assert_eq!(obj.scope(), Scope::Request);
            TestString::destroy(h);
        }
    }

    #[test]
    fn test_tracked_freed_by_arena() {
        let guard = memory::ArenaGuard::push();
        let h = TestString::create(&STRING_FT, CString::new("t").unwrap(), Scope::Tracked);
        unsafe {
            let mut rc = CMPIStatus::ok();
            let copy = TestString::clone_handle(h, &STRING_FT, &mut rc);
            assert_eq!(rc.rc, CMPI_RC_OK);
            drop(guard);
            // the clone is owned and survives the arena
            let obj = TestString::from_handle(copy, &STRING_FT).unwrap();
            assert_eq!(obj.scope(), Scope::Owned);
            assert_eq!(TestString::release(copy, &STRING_FT).rc, CMPI_RC_OK);
        }
    }
}
