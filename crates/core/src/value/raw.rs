//! Conversion between owned values and the raw `CMPIData` / `CMPIValue` ABI
//!
//! Reading goes through each handle's function table, so data produced by any
//! broker can be decoded. Objects created by this crate's broker are read
//! directly without a round trip through their tables.
//!
//! Writing needs a broker to allocate encapsulated objects (strings, paths,
//! instances, arrays, datetimes) and is done through its encapsulation table.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::broker::objects as native;
use crate::datetime::CimDateTime;
use crate::flags::ValueState;
use crate::handles::{call_rc, BrokerHandle};
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};
use crate::types;
use crate::value::{ArrayData, Data, ErrorData, InstanceData, NamedData, ObjectPathData, PtrValue, Value};

/// Copy a C string, mapping null to `None`
///
/// # Safety
/// `p` must be null or NUL-terminated.
pub unsafe fn opt_cstr(p: *const c_char) -> Option<String> {
    if p.is_null() {
        None
    } else {
        Some(CStr::from_ptr(p).to_string_lossy().into_owned())
    }
}

/// Decode a NULL-terminated array of property names; null means "all"
///
/// # Safety
/// `names` must be null or a NULL-terminated array of C strings.
pub unsafe fn property_names(names: *const *const c_char) -> Option<Vec<String>> {
    if names.is_null() {
        return None;
    }
    let mut out = Vec::new();
    let mut cursor = names;
    while !(*cursor).is_null() {
        out.push(CStr::from_ptr(*cursor).to_string_lossy().into_owned());
        cursor = cursor.add(1);
    }
    Some(out)
}

/// Owned NULL-terminated property name array for outgoing calls
#[derive(Debug, Default)]
pub struct PropertyNames {
    _names: Vec<CString>,
    ptrs: Vec<*const c_char>,
}

impl PropertyNames {
    pub fn new<S: AsRef<str>>(names: Option<&[S]>) -> CmpiResult<Self> {
        let Some(names) = names else {
            return Ok(Self::default());
        };
        let names = names
            .iter()
            .map(|n| cstring(n.as_ref()))
            .collect::<CmpiResult<Vec<_>>>()?;
        let mut ptrs: Vec<*const c_char> = names.iter().map(|n| n.as_ptr()).collect();
        ptrs.push(ptr::null());
        Ok(Self { _names: names, ptrs })
    }

    /// Null when no filter was given
    pub fn as_ptr(&self) -> *const *const c_char {
        if self.ptrs.is_empty() {
            ptr::null()
        } else {
            self.ptrs.as_ptr()
        }
    }
}

pub(crate) fn cstring(s: &str) -> CmpiResult<CString> {
    CString::new(s).map_err(|_| CmpiError::invalid_parameter(format!("embedded NUL in '{s}'")))
}

// ============================================================================
// Reading
// ============================================================================

/// Decode a `CMPIData`
///
/// The payload is never inspected when the state says null or not-found.
///
/// # Safety
/// Encapsulated members must be valid handles for their type tag.
pub unsafe fn data_from_raw(d: &CMPIData) -> CmpiResult<Data> {
    let state = ValueState::from_bits_retain(d.state);
    let ty = d.r#type;
    if state.has_no_payload() {
        return Ok(Data {
            ty,
            state,
            value: None,
        });
    }
    let value = value_from_union(&d.value, ty)?;
    let state = if value.is_none() {
        state | ValueState::NULL
    } else {
        state
    };
    Ok(Data { ty, state, value })
}

/// Decode the `(const CMPIValue*, CMPIType)` argument pair used by setters
///
/// A null pointer is a null value. For `CMPI_chars` the pointer is the C
/// string itself rather than a `CMPIValue` holding it.
///
/// # Safety
/// `value` must be null or point to a payload matching `ty`.
pub unsafe fn data_from_value_ptr(value: *const CMPIValue, ty: CMPIType) -> CmpiResult<Data> {
    if value.is_null() {
        return Ok(Data::null(ty));
    }
    if ty == CMPI_chars {
        let s = CStr::from_ptr(value as *const c_char).to_string_lossy().into_owned();
        return Ok(Data::new(Value::Chars(s)));
    }
    let value = value_from_union(&*value, ty)?;
    Ok(match value {
        Some(v) => Data {
            ty,
            state: ValueState::GOOD,
            value: Some(v),
        },
        None => Data::null(ty),
    })
}

/// `None` when an encapsulated member is a null handle
unsafe fn value_from_union(v: &CMPIValue, ty: CMPIType) -> CmpiResult<Option<Value>> {
    if types::is_array(ty) {
        return Ok(if v.array.is_null() {
            None
        } else {
            Some(Value::Array(read_array(v.array)?))
        });
    }
    let value = match ty {
        CMPI_boolean => Value::Boolean(v.boolean != 0),
        CMPI_char16 => Value::Char16(v.char16),
        CMPI_uint8 => Value::Uint8(v.uint8),
        CMPI_uint16 => Value::Uint16(v.uint16),
        CMPI_uint32 => Value::Uint32(v.uint32),
        CMPI_uint64 => Value::Uint64(v.uint64),
        CMPI_sint8 => Value::Sint8(v.sint8),
        CMPI_sint16 => Value::Sint16(v.sint16),
        CMPI_sint32 => Value::Sint32(v.sint32),
        CMPI_sint64 => Value::Sint64(v.sint64),
        CMPI_real32 => Value::Real32(v.real32),
        CMPI_real64 => Value::Real64(v.real64),
        CMPI_string => match v.string.is_null() {
            true => return Ok(None),
            false => Value::String(read_string(v.string)?),
        },
        CMPI_chars => match opt_cstr(v.chars) {
            Some(s) => Value::Chars(s),
            None => return Ok(None),
        },
        CMPI_charsptr => match opt_cstr(v.dataPtr.ptr as *const c_char) {
            Some(s) => Value::Chars(s),
            None => return Ok(None),
        },
        CMPI_dateTime => match v.dateTime.is_null() {
            true => return Ok(None),
            false => Value::DateTime(read_datetime(v.dateTime)?),
        },
        CMPI_ref => match v.r#ref.is_null() {
            true => return Ok(None),
            false => Value::Ref(read_object_path(v.r#ref)?),
        },
        CMPI_instance => match v.inst.is_null() {
            true => return Ok(None),
            false => Value::Instance(Box::new(read_instance(v.inst)?)),
        },
        CMPI_ptr => Value::Ptr(PtrValue {
            addr: v.dataPtr.ptr as usize,
            length: v.dataPtr.length,
        }),
        other => {
            return Err(CmpiError::invalid_data_type(format!(
                "cannot decode {} value",
                types::type_name(other)
            )))
        }
    };
    Ok(Some(value))
}

/// Read a string handle's characters
///
/// # Safety
/// `s` must be a valid string handle.
pub unsafe fn read_string(s: *const CMPIString) -> CmpiResult<String> {
    if let Some(v) = native::native_string(s) {
        return Ok(v);
    }
    let ft = checked_ft(s, "string")?;
    let p = call_rc(|rc| (ft.getCharPtr)(s, rc))?;
    Ok(opt_cstr(p).unwrap_or_default())
}

/// Read an optional string handle (null handle -> `None`)
unsafe fn read_opt_string(s: *const CMPIString) -> CmpiResult<Option<String>> {
    if s.is_null() {
        Ok(None)
    } else {
        read_string(s).map(Some)
    }
}

/// # Safety
/// `dt` must be a valid datetime handle.
pub unsafe fn read_datetime(dt: *const CMPIDateTime) -> CmpiResult<CimDateTime> {
    if let Some(v) = native::native_datetime(dt) {
        return Ok(v);
    }
    let ft = checked_ft(dt, "datetime")?;
    let s = call_rc(|rc| (ft.getStringFormat)(dt, rc))?;
    if !s.is_null() {
        if let Ok(parsed) = CimDateTime::parse(&read_string(s)?) {
            return Ok(parsed);
        }
    }
    let bin = call_rc(|rc| (ft.getBinaryFormat)(dt, rc))?;
    let interval = call_rc(|rc| (ft.isInterval)(dt, rc))?;
    CimDateTime::from_binary(bin, interval != 0)
}

/// # Safety
/// `op` must be a valid object path handle.
pub unsafe fn read_object_path(op: *const CMPIObjectPath) -> CmpiResult<ObjectPathData> {
    if let Some(v) = native::native_object_path(op) {
        return Ok(v);
    }
    let ft = checked_ft(op, "object path")?;
    let mut path = ObjectPathData {
        host: read_opt_string(call_rc(|rc| (ft.getHostname)(op, rc))?)?.unwrap_or_default(),
        namespace: read_opt_string(call_rc(|rc| (ft.getNameSpace)(op, rc))?)?.unwrap_or_default(),
        class_name: read_opt_string(call_rc(|rc| (ft.getClassName)(op, rc))?)?.unwrap_or_default(),
        keys: NamedData::new(),
    };
    let count = call_rc(|rc| (ft.getKeyCount)(op, rc))?;
    for i in 0..count {
        let mut name: *mut CMPIString = ptr::null_mut();
        let d = call_rc(|rc| (ft.getKeyAt)(op, i, &mut name, rc))?;
        let name = read_opt_string(name)?.unwrap_or_default();
        path.keys.set(&name, data_from_raw(&d)?.with_state(ValueState::KEY));
    }
    Ok(path)
}

/// # Safety
/// `inst` must be a valid instance handle.
pub unsafe fn read_instance(inst: *const CMPIInstance) -> CmpiResult<InstanceData> {
    if let Some(v) = native::native_instance(inst) {
        return Ok(v);
    }
    let ft = checked_ft(inst, "instance")?;
    let op = call_rc(|rc| (ft.getObjectPath)(inst, rc))?;
    let path = if op.is_null() {
        ObjectPathData::default()
    } else {
        read_object_path(op)?
    };
    let mut out = InstanceData::new(path);
    let count = call_rc(|rc| (ft.getPropertyCount)(inst, rc))?;
    for i in 0..count {
        let mut name: *mut CMPIString = ptr::null_mut();
        let d = call_rc(|rc| (ft.getPropertyAt)(inst, i, &mut name, rc))?;
        let name = read_opt_string(name)?.unwrap_or_default();
        out.set_property(&name, data_from_raw(&d)?, None);
    }
    Ok(out)
}

/// # Safety
/// `ar` must be a valid array handle.
pub unsafe fn read_array(ar: *const CMPIArray) -> CmpiResult<ArrayData> {
    if let Some(v) = native::native_array(ar) {
        return Ok(v);
    }
    let ft = checked_ft(ar, "array")?;
    let element_type = types::element_type(call_rc(|rc| (ft.getSimpleType)(ar, rc))?);
    let size = call_rc(|rc| (ft.getSize)(ar, rc))?;
    let mut elements = Vec::with_capacity(size as usize);
    for i in 0..size {
        let d = call_rc(|rc| (ft.getElementAt)(ar, i, rc))?;
        let mut d = data_from_raw(&d)?;
        d.ty = element_type;
        elements.push(d);
    }
    Ok(ArrayData {
        element_type,
        elements,
    })
}

/// # Safety
/// `args` must be a valid args handle.
pub unsafe fn read_args(args: *const CMPIArgs) -> CmpiResult<NamedData> {
    if let Some(v) = native::native_args(args) {
        return Ok(v);
    }
    let ft = checked_ft(args, "args")?;
    let mut out = NamedData::new();
    let count = call_rc(|rc| (ft.getArgCount)(args, rc))?;
    for i in 0..count {
        let mut name: *mut CMPIString = ptr::null_mut();
        let d = call_rc(|rc| (ft.getArgAt)(args, i, &mut name, rc))?;
        let name = read_opt_string(name)?.unwrap_or_default();
        out.set(&name, data_from_raw(&d)?);
    }
    Ok(out)
}

/// # Safety
/// `ctx` must be a valid context handle.
pub unsafe fn read_context(ctx: *const CMPIContext) -> CmpiResult<NamedData> {
    if let Some(v) = native::native_context(ctx) {
        return Ok(v);
    }
    let ft = checked_ft(ctx, "context")?;
    let mut out = NamedData::new();
    let count = call_rc(|rc| (ft.getEntryCount)(ctx, rc))?;
    for i in 0..count {
        let mut name: *mut CMPIString = ptr::null_mut();
        let d = call_rc(|rc| (ft.getEntryAt)(ctx, i, &mut name, rc))?;
        let name = read_opt_string(name)?.unwrap_or_default();
        out.set(&name, data_from_raw(&d)?);
    }
    Ok(out)
}

/// Read every field of an error; unset fields come back as `None`
///
/// # Safety
/// `er` must be a valid error handle.
pub unsafe fn read_error(er: *const CMPIError) -> CmpiResult<ErrorData> {
    if let Some(v) = native::native_error(er) {
        return Ok(v);
    }
    let ft = checked_ft(er, "error")?;
    let text = |f: unsafe extern "C" fn(*const CMPIError, *mut CMPIStatus) -> *mut CMPIString| {
        call_rc(|rc| f(er, rc))
            .ok()
            .and_then(|s| read_opt_string(s).ok().flatten())
    };
    let strings = |f: unsafe extern "C" fn(*const CMPIError, *mut CMPIStatus) -> *mut CMPIArray| {
        call_rc(|rc| f(er, rc))
            .ok()
            .filter(|a| !a.is_null())
            .and_then(|a| read_array(a).ok())
            .map(|a| {
                a.elements
                    .iter()
                    .filter_map(|d| d.value().and_then(Value::as_str).map(str::to_string))
                    .collect()
            })
    };
    Ok(ErrorData {
        error_type: call_rc(|rc| (ft.getErrorType)(er, rc)).unwrap_or(UnknownErrorType),
        other_error_type: text(ft.getOtherErrorType),
        owning_entity: text(ft.getOwningEntity),
        message_id: text(ft.getMessageID),
        message: text(ft.getMessage),
        perceived_severity: call_rc(|rc| (ft.getPerceivedSeverity)(er, rc)).unwrap_or(ErrorSevUnknown),
        probable_cause: call_rc(|rc| (ft.getProbableCause)(er, rc)).unwrap_or(ErrorProbCauseUnknown),
        probable_cause_description: text(ft.getProbableCauseDescription),
        recommended_actions: strings(ft.getRecommendedActions),
        error_source: text(ft.getErrorSource),
        error_source_format: call_rc(|rc| (ft.getErrorSourceFormat)(er, rc)).unwrap_or(CMPIErrSrcUnknown),
        other_error_source_format: text(ft.getOtherErrorSourceFormat),
        cim_status_code: call_rc(|rc| (ft.getCIMStatusCode)(er, rc)).unwrap_or(CMPI_RC_OK),
        cim_status_code_description: text(ft.getCIMStatusCodeDescription),
        message_arguments: strings(ft.getMessageArguments),
    })
}

/// Function table of an envelope, rejecting null handles and tables
pub(crate) unsafe fn checked_ft<'a, E: crate::handles::RawHandle>(
    h: *const E,
    what: &str,
) -> CmpiResult<&'a E::Ft> {
    if h.is_null() {
        return Err(CmpiError::invalid_handle(what));
    }
    let ft = E::ft_ptr(h);
    if ft.is_null() {
        return Err(CmpiError::invalid_handle(what));
    }
    Ok(&*ft)
}

// ============================================================================
// Writing
// ============================================================================

/// A value encoded for an outgoing call
///
/// Keeps any C string the payload points into alive for as long as the
/// encoded value is used.
pub struct RawValue {
    value: CMPIValue,
    ty: CMPIType,
    null: bool,
    chars: Option<CString>,
}

impl RawValue {
    pub fn null(ty: CMPIType) -> Self {
        Self {
            value: CMPIValue::default(),
            ty,
            null: true,
            chars: None,
        }
    }

    pub fn ty(&self) -> CMPIType {
        self.ty
    }

    pub fn is_null(&self) -> bool {
        self.null
    }

    pub fn value(&self) -> CMPIValue {
        self.value
    }

    /// Pointer for the `(const CMPIValue*, CMPIType)` setter convention
    pub fn as_ptr(&self) -> *const CMPIValue {
        match (&self.chars, self.null) {
            (_, true) => ptr::null(),
            (Some(c), false) => c.as_ptr() as *const CMPIValue,
            (None, false) => &self.value,
        }
    }

    /// As a `CMPIData` (passed by value, e.g. to `setProperty` of a property MI)
    pub fn to_data(&self, state: ValueState) -> CMPIData {
        let state = if self.null {
            state | ValueState::NULL
        } else {
            state
        };
        CMPIData {
            r#type: self.ty,
            state: state.bits(),
            value: self.value,
        }
    }
}

/// Encode a value, allocating encapsulated members through `broker`
pub fn value_to_raw(broker: &BrokerHandle, value: &Value) -> CmpiResult<RawValue> {
    let mut out = RawValue {
        value: CMPIValue::default(),
        ty: value.type_tag(),
        null: false,
        chars: None,
    };
    match value {
        Value::Boolean(b) => out.value.boolean = u8::from(*b),
        Value::Char16(v) => out.value.char16 = *v,
        Value::Uint8(v) => out.value.uint8 = *v,
        Value::Uint16(v) => out.value.uint16 = *v,
        Value::Uint32(v) => out.value.uint32 = *v,
        Value::Uint64(v) => out.value.uint64 = *v,
        Value::Sint8(v) => out.value.sint8 = *v,
        Value::Sint16(v) => out.value.sint16 = *v,
        Value::Sint32(v) => out.value.sint32 = *v,
        Value::Sint64(v) => out.value.sint64 = *v,
        Value::Real32(v) => out.value.real32 = *v,
        Value::Real64(v) => out.value.real64 = *v,
        Value::String(s) => out.value.string = broker.new_string(s)?.as_ptr(),
        Value::Chars(s) => {
            let c = cstring(s)?;
            out.value.chars = c.as_ptr() as *mut c_char;
            out.chars = Some(c);
        }
        Value::DateTime(dt) => out.value.dateTime = broker.new_datetime_from_data(dt)?.as_ptr(),
        Value::Ref(p) => out.value.r#ref = broker.new_object_path_from(p)?.as_ptr(),
        Value::Instance(i) => out.value.inst = broker.new_instance_from(i)?.as_ptr(),
        Value::Array(a) => out.value.array = broker.new_array_from(a)?.as_ptr(),
        Value::Ptr(p) => {
            out.value.dataPtr = CMPIValuePtr {
                ptr: p.addr as *mut std::ffi::c_void,
                length: p.length,
            }
        }
    }
    Ok(out)
}

/// Encode a tagged value; null data encodes as a null pointer of its type
pub fn data_to_raw(broker: &BrokerHandle, data: &Data) -> CmpiResult<RawValue> {
    match data.value() {
        Some(v) => value_to_raw(broker, v),
        None => Ok(RawValue::null(data.ty)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_round_trip_through_union() {
        let samples = [
            Value::Boolean(true),
            Value::Char16(0x263a),
            Value::Uint8(u8::MAX),
            Value::Uint16(u16::MAX),
            Value::Uint32(u32::MAX),
            Value::Uint64(u64::MAX),
            Value::Sint8(i8::MIN),
            Value::Sint16(i16::MIN),
            Value::Sint32(i32::MIN),
            Value::Sint64(i64::MIN),
            Value::Real32(1.5),
            Value::Real64(-2.25e300),
        ];
        let broker = crate::broker::Broker::builder().build();
        let handle = broker.handle().unwrap();
        for v in samples {
            let raw = value_to_raw(&handle, &v).unwrap();
            let back = unsafe { data_from_raw(&raw.to_data(ValueState::GOOD)) }.unwrap();
            assert_eq!(back.ty, v.type_tag());
            assert_eq!(back.value(), Some(&v));
        }
    }

    #[test]
    fn test_null_payload_not_inspected() {
        // A dangling handle behind a null state must never be followed
        let mut d = CMPIData::null(CMPI_instance);
        d.value.inst = 0x10 as *mut CMPIInstance;
        d.state |= CMPI_keyValue;
        let data = unsafe { data_from_raw(&d) }.unwrap();
        assert!(data.is_null());
        assert!(data.is_key());
        assert_eq!(data.ty, CMPI_instance);

        let d = CMPIData::not_found();
        let data = unsafe { data_from_raw(&d) }.unwrap();
        assert!(data.is_not_found());
    }

    #[test]
    fn test_chars_setter_convention() {
        let text = CString::new("abc").unwrap();
        let d = unsafe { data_from_value_ptr(text.as_ptr() as *const CMPIValue, CMPI_chars) }.unwrap();
        assert_eq!(d.value(), Some(&Value::Chars("abc".into())));

        let d = unsafe { data_from_value_ptr(ptr::null(), CMPI_uint32) }.unwrap();
        assert!(d.is_null());
        assert_eq!(d.ty, CMPI_uint32);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let v = CMPIValue::default();
        let err = unsafe { data_from_value_ptr(&v, CMPI_integerString) }.unwrap_err();
        assert_eq!(err.rc(), CMPI_RC_ERR_INVALID_DATA_TYPE);
    }

    #[test]
    fn test_property_names() {
        let names = PropertyNames::new(Some(&["A", "B"][..])).unwrap();
        let back = unsafe { property_names(names.as_ptr()) };
        assert_eq!(back, Some(vec!["A".to_string(), "B".to_string()]));

        let none = PropertyNames::new::<&str>(None).unwrap();
        assert!(none.as_ptr().is_null());
        assert_eq!(unsafe { property_names(none.as_ptr()) }, None);
    }

    #[test]
    fn test_encapsulated_round_trip() {
        let broker = crate::broker::Broker::builder().build();
        let handle = broker.handle().unwrap();
        let _arena = crate::broker::memory::ArenaGuard::push();
        let path = ObjectPathData::new("root/cimv2", "Sample").with_key("Id", 7i64);
        let inst = InstanceData::new(path.clone())
            .with_property("Name", "x")
            .with_property("Seen", crate::datetime::CimDateTime::from_timestamp(0).unwrap())
            .with_property("Codes", ArrayData::from_values(CMPI_uint16, [1u16, 2]));
        let raw = value_to_raw(&handle, &Value::from(inst.clone())).unwrap();
        let back = unsafe { data_from_raw(&raw.to_data(ValueState::GOOD)) }.unwrap();
        assert_eq!(back.value().and_then(Value::as_instance), Some(&inst));
    }
}
