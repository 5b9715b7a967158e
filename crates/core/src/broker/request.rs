//! One provider call, from routing to collected results

use std::ffi::{c_char, CString};
use std::ptr;

use serde::{Deserialize, Serialize};

use super::memory;
use super::native::Scope;
use super::objects::context::{self, NativeContext};
use super::objects::result;
use super::registry::LoadedMi;
use super::threads::CallMark;
use super::BrokerShared;
use crate::engine::MiKind;
use crate::flags::InvocationFlags;
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult, ReturnCode};
use crate::value::raw::cstring;
use crate::value::{Data, NamedData};

/// Caller identity and options carried in the request context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub principal: Option<String>,
    pub role: Option<String>,
    pub accept_language: Option<String>,
    pub content_language: Option<String>,
    pub flags: InvocationFlags,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn principal(mut self, principal: &str) -> Self {
        self.principal = Some(principal.to_string());
        self
    }

    pub fn role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn flags(mut self, flags: InvocationFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Well-known context entries for a call into `namespace`
    pub(crate) fn entries(&self, namespace: &str) -> NamedData {
        let mut entries = NamedData::new()
            .with(CMPIInitNameSpace, namespace)
            .with(CMPIInvocationFlags, self.flags.bits());
        let optional = [
            (CMPIPrincipal, &self.principal),
            (CMPIRole, &self.role),
            (CMPIAcceptLanguage, &self.accept_language),
            (CMPIContentLanguage, &self.content_language),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                entries.set(name, Data::new(value.as_str()));
            }
        }
        entries
    }
}

/// Optional narrowing of an association traversal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssocFilter {
    pub assoc_class: Option<String>,
    pub result_class: Option<String>,
    pub role: Option<String>,
    pub result_role: Option<String>,
}

/// Return value and output arguments of a method call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MethodOutput {
    pub value: Option<Data>,
    pub out: NamedData,
}

/// Where a call is routed
#[derive(Debug, Clone, Copy)]
pub(crate) struct Target<'a> {
    pub(crate) namespace: &'a str,
    pub(crate) class_name: &'a str,
    pub(crate) kind: MiKind,
}

/// Route a call to the provider serving `target` and collect its results
///
/// A fresh arena surrounds the call, so everything the provider creates and
/// does not hand back is freed before this returns. `call` builds its
/// arguments inside that arena and invokes the MI slot.
///
/// # Safety
/// `call` must only pass valid handles to the provider.
pub(crate) unsafe fn dispatch<F>(
    shared: &BrokerShared,
    target: Target<'_>,
    entries: NamedData,
    call: F,
) -> CmpiResult<Vec<Data>>
where
    F: FnOnce(&LoadedMi, *const CMPIContext, *const CMPIResult) -> CmpiResult<CMPIStatus>,
{
    let key = shared
        .registry
        .find(target.namespace, target.class_name, target.kind)
        .ok_or_else(|| {
            CmpiError::with_message(
                ReturnCode::ErrInvalidClass,
                format!("no {} provider for {}:{}", target.kind, target.namespace, target.class_name),
            )
        })?;

    let depth = memory::push();
    let _mark = CallMark::enter();
    let ctx = context::create(entries, Scope::Request);
    let out = (|| {
        let mi = shared.registry.mi(key, target.kind, shared.as_ptr(), ctx)?;
        let rslt = result::create(Scope::Request);
        let status = call(&mi, ctx, rslt);
        let collected = result::take(rslt);
        CmpiError::check(status?).map_err(|err| err.with_errors(collected.errors))?;
        Ok(collected.items)
    })();
    NativeContext::destroy(ctx);
    memory::pop_to(depth);

    if let Err(err) = &out {
        tracing::debug!("{} call on {}:{} failed: {}", target.kind, target.namespace, target.class_name, err);
    }
    out
}

/// Owned C string for an optional argument
pub(crate) struct OptCStr(Option<CString>);

impl OptCStr {
    pub(crate) fn new(s: Option<&str>) -> CmpiResult<Self> {
        Ok(Self(s.map(cstring).transpose()?))
    }

    pub(crate) fn as_ptr(&self) -> *const c_char {
        self.0.as_ref().map_or(ptr::null(), |c| c.as_ptr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_entries() {
        let entries = RequestContext::new()
            .principal("admin")
            .flags(InvocationFlags::LOCAL_ONLY)
            .entries("root/cimv2");
        assert_eq!(entries.get(CMPIInitNameSpace), Some(&Data::new("root/cimv2")));
        assert_eq!(entries.get(CMPIInvocationFlags), Some(&Data::new(1u32)));
        assert_eq!(entries.get(CMPIPrincipal), Some(&Data::new("admin")));
        assert!(entries.get(CMPIRole).is_none());
    }

    #[test]
    fn test_optional_c_string() {
        assert!(OptCStr::new(None).unwrap().as_ptr().is_null());
        let s = OptCStr::new(Some("CIM_Fan")).unwrap();
        assert!(!s.as_ptr().is_null());
        assert!(OptCStr::new(Some("a\0b")).is_err());
    }
}
