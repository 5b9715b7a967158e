//! Owned data to raw `CMPIData`, backed by broker objects
//!
//! Encapsulated members become tracked native objects in the caller's arena,
//! the same objects a provider would get from the encapsulation table.

use std::ffi::c_char;
use std::ptr;

use super::native::Scope;
use super::objects::{array, datetime, instance, native_args, native_instance, native_object_path, object_path, string};
use crate::flags::ValueState;
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};
use crate::value::raw::{data_from_value_ptr, read_args, read_instance, read_object_path};
use crate::value::{Data, InstanceData, NamedData, ObjectPathData, PtrValue, Value};

/// Encode `value` into a union, creating tracked objects for handles
pub(crate) fn value_to_union(value: &Value) -> CMPIValue {
    let mut out = CMPIValue::default();
    match value {
        Value::Boolean(b) => out.boolean = u8::from(*b),
        Value::Char16(v) => out.char16 = *v,
        Value::Uint8(v) => out.uint8 = *v,
        Value::Uint16(v) => out.uint16 = *v,
        Value::Uint32(v) => out.uint32 = *v,
        Value::Uint64(v) => out.uint64 = *v,
        Value::Sint8(v) => out.sint8 = *v,
        Value::Sint16(v) => out.sint16 = *v,
        Value::Sint32(v) => out.sint32 = *v,
        Value::Sint64(v) => out.sint64 = *v,
        Value::Real32(v) => out.real32 = *v,
        Value::Real64(v) => out.real64 = *v,
        Value::String(s) | Value::Chars(s) => out.string = string::new_tracked(s),
        Value::DateTime(dt) => out.dateTime = datetime::create(*dt, Scope::Tracked),
        Value::Ref(p) => out.r#ref = object_path::create(p.clone(), Scope::Tracked),
        Value::Instance(i) => out.inst = instance::create((**i).clone(), Scope::Tracked),
        Value::Array(a) => out.array = array::create(a.clone(), Scope::Tracked),
        Value::Ptr(PtrValue { addr, length }) => {
            out.dataPtr = CMPIValuePtr {
                ptr: *addr as *mut std::ffi::c_void,
                length: *length,
            }
        }
    }
    out
}

/// Raw form of stored data
///
/// Stored `chars` are always handed out as `string`.
pub(crate) fn to_cmpi(data: &Data) -> CMPIData {
    let ty = match data.value() {
        Some(Value::Chars(_)) => CMPI_string,
        _ => data.ty,
    };
    match data.value() {
        Some(v) => CMPIData {
            r#type: ty,
            state: data.state.bits(),
            value: value_to_union(v),
        },
        None => CMPIData {
            r#type: ty,
            state: (data.state | ValueState::NULL).bits(),
            value: CMPIValue::default(),
        },
    }
}

/// Decode the setter argument pair and normalize it for storage
///
/// # Safety
/// As [`data_from_value_ptr`].
pub(crate) unsafe fn from_setter(value: *const CMPIValue, ty: CMPIType) -> CmpiResult<Data> {
    data_from_value_ptr(value, ty).map(Data::normalized)
}

/// Store a tracked name string in an optional out-parameter
///
/// # Safety
/// `out` must be null or writable.
pub(crate) unsafe fn set_name(out: *mut *mut CMPIString, name: &str) {
    if !out.is_null() {
        *out = string::new_tracked(name);
    }
}

/// Borrowed optional C string argument
///
/// # Safety
/// `p` must be null or NUL-terminated.
pub(crate) unsafe fn arg_str<'a>(p: *const c_char) -> Option<&'a str> {
    if p.is_null() {
        return None;
    }
    std::ffi::CStr::from_ptr(p).to_str().ok()
}

/// Object path argument, ours or foreign
///
/// # Safety
/// `op` must be null or a live object path handle.
pub(crate) unsafe fn path_arg(op: *const CMPIObjectPath) -> CmpiResult<ObjectPathData> {
    if op.is_null() {
        return Err(CmpiError::invalid_handle("object path"));
    }
    match native_object_path(op) {
        Some(p) => Ok(p),
        None => read_object_path(op),
    }
}

/// Instance argument, ours or foreign
///
/// # Safety
/// `inst` must be null or a live instance handle.
pub(crate) unsafe fn instance_arg(inst: *const CMPIInstance) -> CmpiResult<InstanceData> {
    if inst.is_null() {
        return Err(CmpiError::invalid_handle("instance"));
    }
    match native_instance(inst) {
        Some(i) => Ok(i),
        None => read_instance(inst),
    }
}

/// Args argument; null reads as no arguments
///
/// # Safety
/// `args` must be null or a live args handle.
pub(crate) unsafe fn args_arg(args: *const CMPIArgs) -> CmpiResult<NamedData> {
    if args.is_null() {
        return Ok(NamedData::new());
    }
    match native_args(args) {
        Some(a) => Ok(a),
        None => read_args(args),
    }
}

/// Null-terminated `char**` that owns its strings
pub(crate) struct CStrList {
    _owned: Vec<std::ffi::CString>,
    ptrs: Vec<*const c_char>,
}

impl CStrList {
    pub(crate) fn new(names: &[String]) -> Self {
        let owned: Vec<_> = names.iter().map(|n| string::c_lossy(n)).collect();
        let mut ptrs: Vec<*const c_char> = owned.iter().map(|c| c.as_ptr()).collect();
        ptrs.push(ptr::null());
        Self { _owned: owned, ptrs }
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut *const c_char {
        self.ptrs.as_mut_ptr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::ArenaGuard;
    use crate::value::raw::data_from_raw;
    use crate::value::ObjectPathData;

    #[test]
    fn test_to_cmpi_round_trip_through_natives() {
        let _arena = ArenaGuard::push();
        let path = ObjectPathData::new("root/cimv2", "CIM_Foo").with_key("Id", "a");
        for data in [
            Data::new(42u32),
            Data::new("text"),
            Data::new(path),
            Data::null(CMPI_sint8),
            Data::key(7u16),
        ] {
            let raw = to_cmpi(&data);
            let back = unsafe { data_from_raw(&raw).unwrap() };
            assert_eq!(back, data);
        }
    }

    #[test]
    fn test_chars_become_string() {
        let _arena = ArenaGuard::push();
        let raw = to_cmpi(&Data::new(Value::Chars("c".into())));
        assert_eq!(raw.r#type, CMPI_string);
        let s = unsafe { crate::broker::objects::native_string(raw.value.string) };
        assert_eq!(s.as_deref(), Some("c"));
    }

    #[test]
    fn test_setter_chars_convention() {
        let stored = unsafe { from_setter(c"abc".as_ptr().cast(), CMPI_chars).unwrap() };
        assert_eq!(stored.ty, CMPI_string);
        assert_eq!(stored.value(), Some(&Value::String("abc".into())));
    }
}
