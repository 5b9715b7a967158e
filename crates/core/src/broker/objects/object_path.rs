//! `CMPIObjectPath`

use std::ffi::c_char;

use super::{done, finish, native_object_path, string, NULL_DATA};
use crate::broker::convert::{arg_str, from_setter, set_name, to_cmpi};
use crate::broker::native::{Native, Scope};
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};
use crate::value::raw::read_object_path;
use crate::value::ObjectPathData;

pub(crate) type NativeObjectPath = Native<CMPIObjectPath, ObjectPathData>;

pub(crate) fn create(data: ObjectPathData, scope: Scope) -> *mut CMPIObjectPath {
    NativeObjectPath::create(&OBJECT_PATH_FT, data, scope)
}

unsafe fn path_of(op: *const CMPIObjectPath) -> CmpiResult<ObjectPathData> {
    if op.is_null() {
        return Err(CmpiError::invalid_parameter("source object path"));
    }
    match native_object_path(op) {
        Some(p) => Ok(p),
        None => read_object_path(op),
    }
}

unsafe fn with_path<T>(
    op: *const CMPIObjectPath,
    f: impl FnOnce(&mut ObjectPathData) -> CmpiResult<T>,
) -> CmpiResult<T> {
    let o = NativeObjectPath::from_handle(op, &OBJECT_PATH_FT)?;
    let mut data = o.lock();
    f(&mut data)
}

unsafe extern "C" fn release(op: *mut CMPIObjectPath) -> CMPIStatus {
    NativeObjectPath::release(op, &OBJECT_PATH_FT)
}

unsafe extern "C" fn clone(op: *const CMPIObjectPath, rc: *mut CMPIStatus) -> *mut CMPIObjectPath {
    NativeObjectPath::clone_handle(op, &OBJECT_PATH_FT, rc)
}

macro_rules! string_field {
    ($set:ident, $get:ident, $field:ident) => {
        unsafe extern "C" fn $set(op: *const CMPIObjectPath, value: *const c_char) -> CMPIStatus {
            let value = arg_str(value).unwrap_or_default().to_string();
            done(with_path(op, |p| {
                p.$field = value;
                Ok(())
            }))
        }

        unsafe extern "C" fn $get(op: *const CMPIObjectPath, rc: *mut CMPIStatus) -> *mut CMPIString {
            let out = with_path(op, |p| Ok(string::new_tracked(&p.$field)));
            finish(rc, out, std::ptr::null_mut())
        }
    };
}

string_field!(set_namespace, get_namespace, namespace);
string_field!(set_hostname, get_hostname, host);
string_field!(set_class_name, get_class_name, class_name);

unsafe extern "C" fn add_key(
    op: *const CMPIObjectPath,
    name: *const c_char,
    value: *const CMPIValue,
    ty: CMPIType,
) -> CMPIStatus {
    done(with_path(op, |p| {
        let name = arg_str(name).ok_or_else(|| CmpiError::invalid_parameter("key name"))?;
        let data = from_setter(value, ty)?;
        p.add_key(name, data)
    }))
}

unsafe extern "C" fn get_key(op: *const CMPIObjectPath, name: *const c_char, rc: *mut CMPIStatus) -> CMPIData {
    let out = with_path(op, |p| {
        let name = arg_str(name).ok_or_else(|| CmpiError::invalid_parameter("key name"))?;
        p.key(name)
            .map(to_cmpi)
            .ok_or_else(|| CmpiError::not_found(format!("no key {name}")))
    });
    finish(rc, out, NULL_DATA)
}

unsafe extern "C" fn get_key_at(
    op: *const CMPIObjectPath,
    index: CMPICount,
    name: *mut *mut CMPIString,
    rc: *mut CMPIStatus,
) -> CMPIData {
    let out = with_path(op, |p| {
        let (key, data) = p
            .keys
            .get_at(index as usize)
            .ok_or_else(|| CmpiError::not_found(format!("no key at index {index}")))?;
        set_name(name, key);
        Ok(to_cmpi(data))
    });
    finish(rc, out, NULL_DATA)
}

unsafe extern "C" fn get_key_count(op: *const CMPIObjectPath, rc: *mut CMPIStatus) -> CMPICount {
    let out = with_path(op, |p| Ok(p.keys.len() as CMPICount));
    finish(rc, out, 0)
}

unsafe extern "C" fn set_namespace_from(op: *const CMPIObjectPath, src: *const CMPIObjectPath) -> CMPIStatus {
    done(path_of(src).and_then(|src| {
        with_path(op, |p| {
            p.namespace = src.namespace;
            Ok(())
        })
    }))
}

unsafe extern "C" fn set_host_and_namespace_from(
    op: *const CMPIObjectPath,
    src: *const CMPIObjectPath,
) -> CMPIStatus {
    done(path_of(src).and_then(|src| {
        with_path(op, |p| {
            p.host = src.host;
            p.namespace = src.namespace;
            Ok(())
        })
    }))
}

// No class repository backs this broker, so qualifiers are never available.

unsafe fn no_qualifiers(op: *const CMPIObjectPath, rc: *mut CMPIStatus) -> CMPIData {
    let out = NativeObjectPath::from_handle(op, &OBJECT_PATH_FT)
        .and_then(|_| Err::<CMPIData, _>(CmpiError::not_supported().message("qualifiers")));
    finish(rc, out, NULL_DATA)
}

unsafe extern "C" fn get_class_qualifier(
    op: *const CMPIObjectPath,
    _q_name: *const c_char,
    rc: *mut CMPIStatus,
) -> CMPIData {
    no_qualifiers(op, rc)
}

unsafe extern "C" fn get_property_qualifier(
    op: *const CMPIObjectPath,
    _p_name: *const c_char,
    _q_name: *const c_char,
    rc: *mut CMPIStatus,
) -> CMPIData {
    no_qualifiers(op, rc)
}

unsafe extern "C" fn get_method_qualifier(
    op: *const CMPIObjectPath,
    _method_name: *const c_char,
    _q_name: *const c_char,
    rc: *mut CMPIStatus,
) -> CMPIData {
    no_qualifiers(op, rc)
}

unsafe extern "C" fn get_parameter_qualifier(
    op: *const CMPIObjectPath,
    _m_name: *const c_char,
    _p_name: *const c_char,
    _q_name: *const c_char,
    rc: *mut CMPIStatus,
) -> CMPIData {
    no_qualifiers(op, rc)
}

unsafe extern "C" fn to_string(op: *const CMPIObjectPath, rc: *mut CMPIStatus) -> *mut CMPIString {
    let out = with_path(op, |p| Ok(string::new_tracked(&p.to_string())));
    finish(rc, out, std::ptr::null_mut())
}

pub(crate) static OBJECT_PATH_FT: CMPIObjectPathFT = CMPIObjectPathFT {
    ftVersion: CMPICurrentVersion,
    release,
    clone,
    setNameSpace: set_namespace,
    getNameSpace: get_namespace,
    setHostname: set_hostname,
    getHostname: get_hostname,
    setClassName: set_class_name,
    getClassName: get_class_name,
    addKey: add_key,
    getKey: get_key,
    getKeyAt: get_key_at,
    getKeyCount: get_key_count,
    setNameSpaceFromObjectPath: set_namespace_from,
    setHostAndNameSpaceFromObjectPath: set_host_and_namespace_from,
    getClassQualifier: get_class_qualifier,
    getPropertyQualifier: get_property_qualifier,
    getMethodQualifier: get_method_qualifier,
    getParameterQualifier: get_parameter_qualifier,
    toString: to_string,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::ArenaGuard;
    use crate::broker::objects::native_string;
    use std::ptr;

    #[test]
    fn test_keys() {
        let _arena = ArenaGuard::push();
        let op = create(ObjectPathData::new("root/cimv2", "CIM_Disk"), Scope::Tracked);
        unsafe {
            assert_eq!(add_key(op, c"Name".as_ptr(), c"sda".as_ptr().cast(), CMPI_chars).rc, CMPI_RC_OK);
            let v = CMPIValue { uint16: 2 };
            assert_eq!(add_key(op, c"Slot".as_ptr(), &v, CMPI_uint16).rc, CMPI_RC_OK);

            let mut rc = CMPIStatus::ok();
            assert_eq!(get_key_count(op, &mut rc), 2);
            let d = get_key(op, c"name".as_ptr(), &mut rc);
            assert_eq!(d.r#type, CMPI_string);
            assert_ne!(d.state & CMPI_keyValue, 0);

            let mut name = ptr::null_mut();
            let d = get_key_at(op, 1, &mut name, &mut rc);
            assert_eq!(d.value.uint16, 2);
            assert_eq!(native_string(name).unwrap(), "Slot");

            get_key(op, c"Nope".as_ptr(), &mut rc);
            assert_eq!(rc.rc, CMPI_RC_ERR_NOT_FOUND);

            let real = CMPIValue { real32: 1.5 };
            assert_eq!(add_key(op, c"R".as_ptr(), &real, CMPI_real32).rc, CMPI_RC_ERR_TYPE_MISMATCH);

            let s = to_string(op, &mut rc);
            assert_eq!(native_string(s).unwrap(), "root/cimv2:CIM_Disk.Name=\"sda\",Slot=2");
        }
    }

    #[test]
    fn test_namespace_copy_and_qualifiers() {
        let _arena = ArenaGuard::push();
        let mut src = ObjectPathData::new("root/interop", "CIM_X");
        src.host = "box".into();
        let src = create(src, Scope::Tracked);
        let op = create(ObjectPathData::new("root/cimv2", "CIM_Y"), Scope::Tracked);
        unsafe {
            assert_eq!(set_host_and_namespace_from(op, src).rc, CMPI_RC_OK);
            let mut rc = CMPIStatus::ok();
            assert_eq!(native_string(get_hostname(op, &mut rc)).unwrap(), "box");
            assert_eq!(native_string(get_namespace(op, &mut rc)).unwrap(), "root/interop");
            assert_eq!(native_string(get_class_name(op, &mut rc)).unwrap(), "CIM_Y");

            get_class_qualifier(op, c"Description".as_ptr(), &mut rc);
            assert_eq!(rc.rc, CMPI_RC_ERR_NOT_SUPPORTED);
        }
    }
}
