//! `CMPIContext`

use std::ffi::c_char;

use super::{done, finish, NULL_DATA};
use crate::broker::convert::{arg_str, from_setter, set_name, to_cmpi};
use crate::broker::native::{Native, Scope};
use crate::sdk::*;
use crate::status::CmpiError;
use crate::value::NamedData;

#[derive(Debug, Clone, Default)]
pub(crate) struct ContextData {
    pub(crate) entries: NamedData,
    /// Made by `prepareAttachThread` and not yet attached
    pub(crate) prepared: bool,
}

pub(crate) type NativeContext = Native<CMPIContext, ContextData>;

pub(crate) fn create(entries: NamedData, scope: Scope) -> *mut CMPIContext {
    NativeContext::create(&CONTEXT_FT, ContextData { entries, prepared: false }, scope)
}

/// Context for a foreign thread, owned until it is attached
pub(crate) fn create_prepared(entries: NamedData) -> *mut CMPIContext {
    NativeContext::create(&CONTEXT_FT, ContextData { entries, prepared: true }, Scope::Owned)
}

unsafe extern "C" fn release(ctx: *mut CMPIContext) -> CMPIStatus {
    NativeContext::release(ctx, &CONTEXT_FT)
}

unsafe extern "C" fn clone(ctx: *const CMPIContext, rc: *mut CMPIStatus) -> *mut CMPIContext {
    let out = NativeContext::from_handle(ctx, &CONTEXT_FT)
        .map(|o| create(o.lock().entries.clone(), Scope::Owned));
    finish(rc, out, std::ptr::null_mut())
}

unsafe extern "C" fn get_entry(ctx: *const CMPIContext, name: *const c_char, rc: *mut CMPIStatus) -> CMPIData {
    let out = NativeContext::from_handle(ctx, &CONTEXT_FT).and_then(|o| {
        let name = arg_str(name).ok_or_else(|| CmpiError::invalid_parameter("entry name"))?;
        o.lock()
            .entries
            .get(name)
            .map(to_cmpi)
            .ok_or_else(|| CmpiError::not_found(format!("no context entry {name}")))
    });
    finish(rc, out, NULL_DATA)
}

unsafe extern "C" fn get_entry_at(
    ctx: *const CMPIContext,
    index: CMPICount,
    name: *mut *mut CMPIString,
    rc: *mut CMPIStatus,
) -> CMPIData {
    let out = NativeContext::from_handle(ctx, &CONTEXT_FT).and_then(|o| {
        let data = o.lock();
        let (n, d) = data
            .entries
            .get_at(index as usize)
            .ok_or_else(|| CmpiError::not_found(format!("no context entry at index {index}")))?;
        set_name(name, n);
        Ok(to_cmpi(d))
    });
    finish(rc, out, NULL_DATA)
}

unsafe extern "C" fn get_entry_count(ctx: *const CMPIContext, rc: *mut CMPIStatus) -> CMPICount {
    let out = NativeContext::from_handle(ctx, &CONTEXT_FT).map(|o| o.lock().entries.len() as CMPICount);
    finish(rc, out, 0)
}

unsafe extern "C" fn add_entry(
    ctx: *const CMPIContext,
    name: *const c_char,
    value: *const CMPIValue,
    ty: CMPIType,
) -> CMPIStatus {
    done(NativeContext::from_handle(ctx, &CONTEXT_FT).and_then(|o| {
        let name = arg_str(name).ok_or_else(|| CmpiError::invalid_parameter("entry name"))?;
        let data = from_setter(value, ty)?;
        o.lock().entries.set(name, data);
        Ok(())
    }))
}

pub(crate) static CONTEXT_FT: CMPIContextFT = CMPIContextFT {
    ftVersion: CMPICurrentVersion,
    release,
    clone,
    getEntry: get_entry,
    getEntryAt: get_entry_at,
    getEntryCount: get_entry_count,
    addEntry: add_entry,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::objects::native_string;
    use crate::value::Data;

    #[test]
    fn test_entries() {
        let ctx = create(NamedData::new().with(CMPIPrincipal, "admin"), Scope::Request);
        unsafe {
            let flags = CMPIValue { uint32: CMPI_FLAG_LocalOnly };
            assert_eq!(add_entry(ctx, c"CMPIInvocationFlags".as_ptr(), &flags, CMPI_uint32).rc, CMPI_RC_OK);

            let mut rc = CMPIStatus::ok();
            assert_eq!(get_entry_count(ctx, &mut rc), 2);
            let d = get_entry(ctx, c"CMPIPrincipal".as_ptr(), &mut rc);
            assert_eq!(native_string(d.value.string).unwrap(), "admin");

            let mut name = std::ptr::null_mut();
            let d = get_entry_at(ctx, 1, &mut name, &mut rc);
            assert_eq!(d.value.uint32, CMPI_FLAG_LocalOnly);
            assert_eq!(native_string(name).unwrap(), CMPIInvocationFlags);

            get_entry(ctx, c"CMPIRole".as_ptr(), &mut rc);
            assert_eq!(rc.rc, CMPI_RC_ERR_NOT_FOUND);

            NativeContext::destroy(ctx);
        }
    }

    #[test]
    fn test_clone_is_not_prepared() {
        let ctx = create_prepared(NamedData::new().with("k", Data::new(1u8)));
        unsafe {
            let mut rc = CMPIStatus::ok();
            let copy = clone(ctx, &mut rc);
            let obj = NativeContext::from_handle(copy, &CONTEXT_FT).unwrap();
            assert!(!obj.lock().prepared);
            assert_eq!(obj.scope(), Scope::Owned);
            assert_eq!(release(copy).rc, CMPI_RC_OK);
            assert_eq!(release(ctx).rc, CMPI_RC_OK);
        }
    }
}
