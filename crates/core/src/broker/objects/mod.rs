//! Native encapsulated objects and their function tables

pub(crate) mod args;
pub(crate) mod array;
pub(crate) mod context;
pub(crate) mod datetime;
pub(crate) mod enumeration;
pub(crate) mod error;
pub(crate) mod instance;
pub(crate) mod object_path;
pub(crate) mod property_list;
pub(crate) mod query;
pub(crate) mod result;
pub(crate) mod string;

use std::ffi::c_void;
use std::ptr;

use crate::datetime::CimDateTime;
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};
use crate::value::{ArrayData, ErrorData, InstanceData, NamedData, ObjectPathData};

/// Store `status` in an optional out-parameter
///
/// # Safety
/// `rc` must be null or writable.
pub(crate) unsafe fn set_rc(rc: *mut CMPIStatus, status: CMPIStatus) {
    if !rc.is_null() {
        *rc = status;
    }
}

/// Encode an error, carrying its message as a broker string
pub(crate) fn status(err: &CmpiError) -> CMPIStatus {
    let msg = match err.text() {
        Some(text) => string::new_tracked(text),
        None => ptr::null_mut(),
    };
    CMPIStatus { rc: err.rc(), msg }
}

/// Status of a slot that returns `CMPIStatus`
pub(crate) fn done(result: CmpiResult<()>) -> CMPIStatus {
    match result {
        Ok(()) => CMPIStatus::ok(),
        Err(err) => status(&err),
    }
}

/// Unpack a result for a slot with an out-parameter status
///
/// # Safety
/// `rc` must be null or writable.
pub(crate) unsafe fn finish<T>(rc: *mut CMPIStatus, result: CmpiResult<T>, fallback: T) -> T {
    match result {
        Ok(v) => {
            set_rc(rc, CMPIStatus::ok());
            v
        }
        Err(err) => {
            set_rc(rc, status(&err));
            fallback
        }
    }
}

/// Value slots report failure with a null `CMPIData` of unknown type
pub(crate) const NULL_DATA: CMPIData = CMPIData {
    r#type: CMPI_null,
    state: CMPI_nullValue,
    value: CMPIValue { uint64: 0 },
};

// ============================================================================
// Fast paths for reading our own objects
// ============================================================================

pub(crate) unsafe fn native_string(s: *const CMPIString) -> Option<String> {
    string::NativeString::try_from_handle(s, &string::STRING_FT)
        .map(|o| o.lock().to_string_lossy().into_owned())
}

pub(crate) unsafe fn native_datetime(dt: *const CMPIDateTime) -> Option<CimDateTime> {
    datetime::NativeDateTime::try_from_handle(dt, &datetime::DATETIME_FT).map(|o| *o.lock())
}

pub(crate) unsafe fn native_object_path(op: *const CMPIObjectPath) -> Option<ObjectPathData> {
    object_path::NativeObjectPath::try_from_handle(op, &object_path::OBJECT_PATH_FT)
        .map(|o| o.lock().clone())
}

pub(crate) unsafe fn native_instance(inst: *const CMPIInstance) -> Option<InstanceData> {
    instance::NativeInstance::try_from_handle(inst, &instance::INSTANCE_FT).map(|o| o.lock().clone())
}

pub(crate) unsafe fn native_array(ar: *const CMPIArray) -> Option<ArrayData> {
    array::NativeArray::try_from_handle(ar, &array::ARRAY_FT).map(|o| o.lock().clone())
}

pub(crate) unsafe fn native_args(args: *const CMPIArgs) -> Option<NamedData> {
    args::NativeArgs::try_from_handle(args, &args::ARGS_FT).map(|o| o.lock().clone())
}

pub(crate) unsafe fn native_context(ctx: *const CMPIContext) -> Option<NamedData> {
    context::NativeContext::try_from_handle(ctx, &context::CONTEXT_FT).map(|o| o.lock().entries.clone())
}

pub(crate) unsafe fn native_error(er: *const CMPIError) -> Option<ErrorData> {
    error::NativeError::try_from_handle(er, &error::ERROR_FT).map(|o| o.lock().clone())
}

// ============================================================================
// Identification by function table
// ============================================================================

/// Type name of one of our objects, e.g. `CMPIInstance`
///
/// # Safety
/// `obj` must be null or point to a readable envelope.
pub(crate) unsafe fn type_name_of(obj: *const c_void) -> Option<&'static str> {
    if obj.is_null() {
        return None;
    }
    // every envelope starts with `hdl` then `ft`
    let ft = (*(obj as *const CMPIString)).ft as *const c_void;
    let tables: [(*const c_void, &'static str); 15] = [
        (ptr::from_ref(&string::STRING_FT).cast(), "CMPIString"),
        (ptr::from_ref(&array::ARRAY_FT).cast(), "CMPIArray"),
        (ptr::from_ref(&enumeration::ENUMERATION_FT).cast(), "CMPIEnumeration"),
        (ptr::from_ref(&instance::INSTANCE_FT).cast(), "CMPIInstance"),
        (ptr::from_ref(&object_path::OBJECT_PATH_FT).cast(), "CMPIObjectPath"),
        (ptr::from_ref(&args::ARGS_FT).cast(), "CMPIArgs"),
        (ptr::from_ref(&context::CONTEXT_FT).cast(), "CMPIContext"),
        (ptr::from_ref(&result::RESULT_FT).cast(), "CMPIResult"),
        (ptr::from_ref(&datetime::DATETIME_FT).cast(), "CMPIDateTime"),
        (ptr::from_ref(&error::ERROR_FT).cast(), "CMPIError"),
        (ptr::from_ref(&query::SELECT_EXP_FT).cast(), "CMPISelectExp"),
        (ptr::from_ref(&query::SELECT_COND_FT).cast(), "CMPISelectCond"),
        (ptr::from_ref(&query::SUB_COND_FT).cast(), "CMPISubCond"),
        (ptr::from_ref(&query::PREDICATE_FT).cast(), "CMPIPredicate"),
        (ptr::from_ref(&property_list::PROPERTY_LIST_FT).cast(), "CMPIPropertyList"),
    ];
    tables.iter().find(|(t, _)| *t == ft).map(|(_, name)| *name)
}

/// Diagnostic rendering of one of our objects
///
/// # Safety
/// `obj` must be null or point to a readable envelope.
pub(crate) unsafe fn describe(obj: *const c_void) -> CmpiResult<String> {
    let name = type_name_of(obj).ok_or_else(|| CmpiError::invalid_handle("object"))?;
    let text = match name {
        "CMPIString" => native_string(obj.cast()).unwrap_or_default(),
        "CMPIArray" => native_array(obj.cast()).map(|a| array::render(&a)).unwrap_or_default(),
        "CMPIInstance" => native_instance(obj.cast()).map(|i| i.to_string()).unwrap_or_default(),
        "CMPIObjectPath" => native_object_path(obj.cast()).map(|p| p.to_string()).unwrap_or_default(),
        "CMPIDateTime" => native_datetime(obj.cast()).map(|d| d.to_string()).unwrap_or_default(),
        "CMPIArgs" => native_args(obj.cast()).map(|a| render_named(&a)).unwrap_or_default(),
        "CMPIContext" => native_context(obj.cast()).map(|c| render_named(&c)).unwrap_or_default(),
        "CMPIError" => native_error(obj.cast())
            .map(|e| format!("{} ({})", e.message.unwrap_or_default(), e.cim_status_code))
            .unwrap_or_default(),
        "CMPISelectExp" => query::describe_select_exp(obj.cast()),
        "CMPIPredicate" => query::describe_predicate(obj.cast()),
        other => format!("{other} at {obj:p}"),
    };
    Ok(text)
}

fn render_named(named: &NamedData) -> String {
    let fields: Vec<String> = named.iter().map(|(n, d)| format!("{n}={d}")).collect();
    format!("{{{}}}", fields.join(", "))
}
