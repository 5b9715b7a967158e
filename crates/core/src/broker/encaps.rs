//! `CMPIBrokerEncFT`: factories for encapsulated objects, diagnostics and logging
//!
//! Every object made here is tracked in the calling thread's current arena.

use std::ffi::{c_char, c_void};
use std::ptr;

use super::convert::{arg_str, path_arg};
use super::native::Scope;
use super::objects::{
    args, array, datetime, describe, error, finish, instance, object_path, property_list, string,
    type_name_of,
};
use crate::datetime::CimDateTime;
use crate::sdk::*;
use crate::status::{CmpiError, ReturnCode};
use crate::value::raw::{property_names, read_string};
use crate::value::{ArrayData, ErrorData, InstanceData, NamedData, ObjectPathData};

unsafe extern "C" fn new_instance(
    _mb: *const CMPIBroker,
    op: *const CMPIObjectPath,
    rc: *mut CMPIStatus,
) -> *mut CMPIInstance {
    let out = path_arg(op).map(|path| instance::create(InstanceData::new(path), Scope::Tracked));
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn new_object_path(
    _mb: *const CMPIBroker,
    ns: *const c_char,
    cn: *const c_char,
    rc: *mut CMPIStatus,
) -> *mut CMPIObjectPath {
    let path = ObjectPathData::new(arg_str(ns).unwrap_or_default(), arg_str(cn).unwrap_or_default());
    finish(rc, Ok(object_path::create(path, Scope::Tracked)), ptr::null_mut())
}

unsafe extern "C" fn new_args(_mb: *const CMPIBroker, rc: *mut CMPIStatus) -> *mut CMPIArgs {
    finish(rc, Ok(args::create(NamedData::new(), Scope::Tracked)), ptr::null_mut())
}

unsafe extern "C" fn new_string(_mb: *const CMPIBroker, data: *const c_char, rc: *mut CMPIStatus) -> *mut CMPIString {
    let out = if data.is_null() {
        Err(CmpiError::invalid_parameter("string data is null"))
    } else {
        Ok(string::create(std::ffi::CStr::from_ptr(data).to_owned(), Scope::Tracked))
    };
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn new_array(
    _mb: *const CMPIBroker,
    size: CMPICount,
    ty: CMPIType,
    rc: *mut CMPIStatus,
) -> *mut CMPIArray {
    let out = if ty == CMPI_null || ty == CMPI_ARRAY {
        Err(CmpiError::invalid_data_type("array element type"))
    } else {
        Ok(array::create(ArrayData::new(ty, size as usize), Scope::Tracked))
    };
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn new_date_time(_mb: *const CMPIBroker, rc: *mut CMPIStatus) -> *mut CMPIDateTime {
    finish(rc, Ok(datetime::create(CimDateTime::now(), Scope::Tracked)), ptr::null_mut())
}

unsafe extern "C" fn new_date_time_from_binary(
    _mb: *const CMPIBroker,
    bin_time: CMPIUint64,
    interval: CMPIBoolean,
    rc: *mut CMPIStatus,
) -> *mut CMPIDateTime {
    let out = CimDateTime::from_binary(bin_time, interval != 0).map(|dt| datetime::create(dt, Scope::Tracked));
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn new_date_time_from_chars(
    _mb: *const CMPIBroker,
    chars: *const c_char,
    rc: *mut CMPIStatus,
) -> *mut CMPIDateTime {
    let out = arg_str(chars)
        .ok_or_else(|| CmpiError::invalid_parameter("datetime string"))
        .and_then(CimDateTime::parse)
        .map(|dt| datetime::create(dt, Scope::Tracked));
    finish(rc, out, ptr::null_mut())
}

/// There is no query grammar; select expressions are only built in Rust
unsafe extern "C" fn new_select_exp(
    _mb: *const CMPIBroker,
    query: *const c_char,
    lang: *const c_char,
    projection: *mut *mut CMPIArray,
    rc: *mut CMPIStatus,
) -> *mut CMPISelectExp {
    if !projection.is_null() {
        *projection = ptr::null_mut();
    }
    tracing::debug!(
        query = arg_str(query).unwrap_or_default(),
        language = arg_str(lang).unwrap_or_default(),
        "newSelectExp rejected"
    );
    let err = CmpiError::new(ReturnCode::ErrQueryLanguageNotSupported);
    finish(rc, Err(err), ptr::null_mut())
}

/// Without a class repository only the class itself matches
unsafe extern "C" fn class_path_is_a(
    _mb: *const CMPIBroker,
    op: *const CMPIObjectPath,
    class_name: *const c_char,
    rc: *mut CMPIStatus,
) -> CMPIBoolean {
    let out = path_arg(op).and_then(|path| {
        let name = arg_str(class_name).ok_or_else(|| CmpiError::invalid_parameter("class name"))?;
        Ok(u8::from(path.class_name.eq_ignore_ascii_case(name)))
    });
    finish(rc, out, 0)
}

unsafe extern "C" fn to_string(_mb: *const CMPIBroker, object: *const c_void, rc: *mut CMPIStatus) -> *mut CMPIString {
    let out = describe(object).map(|text| string::new_tracked(&text));
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn is_of_type(
    _mb: *const CMPIBroker,
    object: *const c_void,
    ty: *const c_char,
    rc: *mut CMPIStatus,
) -> CMPIBoolean {
    let out = type_name_of(object)
        .ok_or_else(|| CmpiError::invalid_handle("object"))
        .and_then(|name| {
            let wanted = arg_str(ty).ok_or_else(|| CmpiError::invalid_parameter("type name"))?;
            Ok(u8::from(name == wanted))
        });
    finish(rc, out, 0)
}

unsafe extern "C" fn get_type(_mb: *const CMPIBroker, object: *const c_void, rc: *mut CMPIStatus) -> *mut CMPIString {
    let out = type_name_of(object)
        .ok_or_else(|| CmpiError::invalid_handle("object"))
        .map(string::new_tracked);
    finish(rc, out, ptr::null_mut())
}

// ============================================================================
// Messages
// ============================================================================

/// `getMessage` without the variadic tail; insert values are never read
type GetMessageFixed = unsafe extern "C" fn(
    *const CMPIBroker,
    *const c_char,
    *const c_char,
    *mut CMPIStatus,
    CMPICount,
) -> *mut CMPIString;

type GetMessage2Fixed = unsafe extern "C" fn(
    *const CMPIBroker,
    *const c_char,
    CMPIMsgFileHandle,
    *const c_char,
    *mut CMPIStatus,
    CMPICount,
) -> *mut CMPIString;

/// No message catalogs: the default text comes back with `$0..$9` intact
unsafe fn default_message(msg_id: *const c_char, def_msg: *const c_char, rc: *mut CMPIStatus) -> *mut CMPIString {
    let out = match arg_str(def_msg) {
        Some(text) => {
            tracing::trace!(id = arg_str(msg_id).unwrap_or_default(), "message served from default text");
            Ok(string::new_tracked(text))
        }
        None => Err(CmpiError::invalid_parameter("default message")),
    };
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn get_message(
    _mb: *const CMPIBroker,
    msg_id: *const c_char,
    def_msg: *const c_char,
    rc: *mut CMPIStatus,
    _count: CMPICount,
) -> *mut CMPIString {
    default_message(msg_id, def_msg, rc)
}

unsafe extern "C" fn get_message2(
    _mb: *const CMPIBroker,
    msg_id: *const c_char,
    _file: CMPIMsgFileHandle,
    def_msg: *const c_char,
    rc: *mut CMPIStatus,
    _count: CMPICount,
) -> *mut CMPIString {
    default_message(msg_id, def_msg, rc)
}

unsafe extern "C" fn open_message_file(
    _mb: *const CMPIBroker,
    msg_file: *const c_char,
    handle: *mut CMPIMsgFileHandle,
) -> CMPIStatus {
    if handle.is_null() {
        return super::objects::status(&CmpiError::invalid_parameter("message file handle"));
    }
    tracing::debug!(file = arg_str(msg_file).unwrap_or_default(), "message files are not loaded");
    *handle = ptr::null_mut();
    CMPIStatus::ok()
}

unsafe extern "C" fn close_message_file(_mb: *const CMPIBroker, _handle: CMPIMsgFileHandle) -> CMPIStatus {
    CMPIStatus::ok()
}

// ============================================================================
// Logging
// ============================================================================

/// `text`, or the string handle when `text` is null
unsafe fn log_text(text: *const c_char, s: *const CMPIString) -> String {
    if let Some(t) = arg_str(text) {
        return t.to_string();
    }
    if s.is_null() {
        return String::new();
    }
    super::objects::native_string(s)
        .or_else(|| read_string(s).ok())
        .unwrap_or_default()
}

unsafe extern "C" fn log_message(
    _mb: *const CMPIBroker,
    severity: CMPISeverity,
    id: *const c_char,
    text: *const c_char,
    s: *const CMPIString,
) -> CMPIStatus {
    let message = log_text(text, s);
    let id = arg_str(id).unwrap_or_default();
    match severity {
        CMPI_SEV_ERROR => tracing::error!(id, "{message}"),
        CMPI_SEV_WARNING => tracing::warn!(id, "{message}"),
        CMPI_SEV_INFO => tracing::info!(id, "{message}"),
        CMPI_DEV_DEBUG => tracing::debug!(id, "{message}"),
        other => {
            return super::objects::status(&CmpiError::invalid_parameter(format!("severity {other}")));
        }
    }
    CMPIStatus::ok()
}

unsafe extern "C" fn trace(
    _mb: *const CMPIBroker,
    level: CMPILevel,
    component: *const c_char,
    text: *const c_char,
    s: *const CMPIString,
) -> CMPIStatus {
    let message = log_text(text, s);
    let component = arg_str(component).unwrap_or_default();
    match level {
        CMPI_LEV_INFO => tracing::debug!(component, "{message}"),
        CMPI_LEV_WARNING => tracing::warn!(component, "{message}"),
        CMPI_LEV_VERBOSE => tracing::trace!(component, "{message}"),
        other => {
            return super::objects::status(&CmpiError::invalid_parameter(format!("trace level {other}")));
        }
    }
    CMPIStatus::ok()
}

// ============================================================================
// Errors, property lists, codepages
// ============================================================================

#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn new_cmpi_error(
    _mb: *const CMPIBroker,
    owner: *const c_char,
    msg_id: *const c_char,
    msg: *const c_char,
    sev: CMPIErrorSeverity,
    pc: CMPIErrorProbableCause,
    cim_status_code: CMPIrc,
    rc: *mut CMPIStatus,
) -> *mut CMPIError {
    let data = ErrorData::new(
        arg_str(owner).unwrap_or_default(),
        arg_str(msg_id).unwrap_or_default(),
        arg_str(msg).unwrap_or_default(),
        sev,
        pc,
        cim_status_code,
    );
    finish(rc, Ok(error::create(data, Scope::Tracked)), ptr::null_mut())
}

unsafe extern "C" fn new_property_list(
    _mb: *const CMPIBroker,
    properties: *const *const c_char,
    rc: *mut CMPIStatus,
) -> *mut CMPIPropertyList {
    let out = property_names(properties)
        .ok_or_else(|| CmpiError::invalid_parameter("property names"))
        .map(|names| property_list::create(names, Scope::Tracked));
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn new_string_cp(
    _mb: *const CMPIBroker,
    data: *const c_char,
    cpid: CMPICodepageID,
    rc: *mut CMPIStatus,
) -> *mut CMPIString {
    let out = if data.is_null() {
        Err(CmpiError::invalid_parameter("string data is null"))
    } else {
        string::decode(data, cpid).map(|s| string::new_tracked(&s))
    };
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn new_enumeration_filter(
    _mb: *const CMPIBroker,
    _filter_query: *const c_char,
    _filter_query_language: *const c_char,
    rc: *mut CMPIStatus,
) -> *mut CMPIEnumerationFilter {
    finish(rc, Err(CmpiError::not_supported()), ptr::null_mut())
}

pub(crate) static ENC_FT: CMPIBrokerEncFT = CMPIBrokerEncFT {
    ftVersion: CMPICurrentVersion,
    newInstance: new_instance,
    newObjectPath: new_object_path,
    newArgs: new_args,
    newString: new_string,
    newArray: new_array,
    newDateTime: new_date_time,
    newDateTimeFromBinary: new_date_time_from_binary,
    newDateTimeFromChars: new_date_time_from_chars,
    newSelectExp: new_select_exp,
    classPathIsA: class_path_is_a,
    toString: to_string,
    isOfType: is_of_type,
    getType: get_type,
    // SAFETY: identical leading parameters; the callee never reads the variadic tail
    getMessage: unsafe { std::mem::transmute::<GetMessageFixed, CMPIGetMessageFn>(get_message as GetMessageFixed) },
    logMessage: log_message,
    trace,
    newCMPIError: new_cmpi_error,
    openMessageFile: open_message_file,
    closeMessageFile: close_message_file,
    getMessage2: unsafe {
        std::mem::transmute::<GetMessage2Fixed, CMPIGetMessage2Fn>(get_message2 as GetMessage2Fixed)
    },
    newPropertyList: new_property_list,
    newStringCP: new_string_cp,
    newEnumerationFilter: new_enumeration_filter,
};
