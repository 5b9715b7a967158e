//! Typed wrappers over raw CMPI handles
//!
//! Each wrapper is a `Copy` view of an envelope pointer plus the broker it
//! belongs to. Methods map one-to-one onto function table slots and turn the
//! out-parameter `CMPIStatus` into a [`CmpiResult`]; an output is only looked
//! at when the status is OK.
//!
//! Wrappers never release on drop. Ownership follows the CMPI rules: call
//! [`release`](StringRef::release) exactly once for every handle you created or
//! cloned, and never for request-scoped handles (the context and result passed
//! into a provider call).

mod broker;
mod data;
mod error;
mod object;
mod query;

pub use broker::{BrokerHandle, GcMark};
pub use data::{ArrayRef, DateTimeRef, EnumerationRef, StringRef};
pub use error::ErrorRef;
pub use object::{ArgsRef, ContextRef, InstanceRef, ObjectPathRef, ResultRef};
pub use query::{
    PredicateRef, PredicateTerms, PropertyAccessor, PropertyListRef, SelectCondRef, SelectExpRef,
    SubCondRef,
};

use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};

/// An envelope type with a function table
pub trait RawHandle {
    type Ft: 'static;
    const WHAT: &'static str;

    /// # Safety
    /// `h` must point to a readable envelope.
    unsafe fn ft_ptr(h: *const Self) -> *const Self::Ft;
}

macro_rules! raw_handle {
    ($($env:ty => $ft:ty, $what:literal;)*) => {
        $(
            impl RawHandle for $env {
                type Ft = $ft;
                const WHAT: &'static str = $what;

                unsafe fn ft_ptr(h: *const Self) -> *const Self::Ft {
                    (*h).ft
                }
            }
        )*
    };
}

raw_handle! {
    CMPIContext => CMPIContextFT, "context";
    CMPIResult => CMPIResultFT, "result";
    CMPIString => CMPIStringFT, "string";
    CMPIArray => CMPIArrayFT, "array";
    CMPIEnumeration => CMPIEnumerationFT, "enumeration";
    CMPIInstance => CMPIInstanceFT, "instance";
    CMPIObjectPath => CMPIObjectPathFT, "object path";
    CMPIArgs => CMPIArgsFT, "args";
    CMPIDateTime => CMPIDateTimeFT, "datetime";
    CMPISelectExp => CMPISelectExpFT, "select expression";
    CMPISelectCond => CMPISelectCondFT, "select condition";
    CMPISubCond => CMPISubCondFT, "sub condition";
    CMPIPredicate => CMPIPredicateFT, "predicate";
    CMPIError => CMPIErrorFT, "error";
    CMPIPropertyList => CMPIPropertyListFT, "property list";
}

/// Run a call with an out-parameter status and check it
///
/// # Safety
/// `f` must be safe to call with a pointer to a live `CMPIStatus`.
pub unsafe fn call_rc<T>(f: impl FnOnce(*mut CMPIStatus) -> T) -> CmpiResult<T> {
    let mut rc = CMPIStatus::ok();
    let out = f(&mut rc);
    CmpiError::check(rc).map(|()| out)
}

/// Declares a handle wrapper with `from_raw`, `as_ptr`, `release` and
/// `clone_handle`
macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident, $raw:ty) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        pub struct $name {
            raw: std::ptr::NonNull<$raw>,
            broker: crate::handles::BrokerHandle,
        }

        // SAFETY: handles are plain pointers; cross-thread use follows the
        // broker's attach rules, as for every CMPI handle.
        unsafe impl Send for $name {}
        unsafe impl Sync for $name {}

        impl $name {
            /// Wrap a raw handle, rejecting null envelopes and tables
            ///
            /// # Safety
            /// `raw` must be null or a live handle of this type.
            pub unsafe fn from_raw(
                raw: *const $raw,
                broker: crate::handles::BrokerHandle,
            ) -> crate::status::CmpiResult<Self> {
                crate::value::raw::checked_ft(raw, <$raw as crate::handles::RawHandle>::WHAT)?;
                Ok(Self {
                    raw: std::ptr::NonNull::new_unchecked(raw as *mut $raw),
                    broker,
                })
            }

            pub fn as_ptr(&self) -> *mut $raw {
                self.raw.as_ptr()
            }

            pub fn broker(&self) -> crate::handles::BrokerHandle {
                self.broker
            }

            #[allow(dead_code)]
            fn ft(&self) -> &<$raw as crate::handles::RawHandle>::Ft {
                // SAFETY: checked non-null in from_raw; tables are static.
                unsafe { &*<$raw as crate::handles::RawHandle>::ft_ptr(self.raw.as_ptr()) }
            }

            /// Give up this handle
            pub fn release(self) -> crate::status::CmpiResult<()> {
                // SAFETY: live handle; consumed by value.
                unsafe { crate::status::CmpiError::check((self.ft().release)(self.raw.as_ptr())) }
            }

            /// Independent copy owned by the caller
            pub fn clone_handle(&self) -> crate::status::CmpiResult<Self> {
                // SAFETY: live handle.
                unsafe {
                    let p = crate::handles::call_rc(|rc| (self.ft().clone)(self.raw.as_ptr(), rc))?;
                    Self::from_raw(p, self.broker)
                }
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.raw).finish()
            }
        }
    };
}

pub(crate) use handle_type;

/// `CString` for a name argument
pub(crate) fn c_arg(s: &str) -> CmpiResult<std::ffi::CString> {
    crate::value::raw::cstring(s)
}

/// Nullable `CString` for an optional argument
pub(crate) fn c_opt(s: Option<&str>) -> CmpiResult<Option<std::ffi::CString>> {
    s.map(c_arg).transpose()
}

pub(crate) fn opt_ptr(s: &Option<std::ffi::CString>) -> *const std::ffi::c_char {
    s.as_ref().map_or(std::ptr::null(), |c| c.as_ptr())
}
