//! `CMPIInstance`

use std::ffi::c_char;

use super::{done, finish, native_object_path, object_path, NULL_DATA};
use crate::broker::convert::{arg_str, from_setter, set_name, to_cmpi};
use crate::broker::native::{Native, Scope};
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};
use crate::value::raw::{property_names, read_object_path};
use crate::value::InstanceData;

pub(crate) type NativeInstance = Native<CMPIInstance, InstanceData>;

pub(crate) fn create(data: InstanceData, scope: Scope) -> *mut CMPIInstance {
    NativeInstance::create(&INSTANCE_FT, data, scope)
}

unsafe fn name_arg<'a>(name: *const c_char) -> CmpiResult<&'a str> {
    arg_str(name).ok_or_else(|| CmpiError::invalid_parameter("property name"))
}

unsafe extern "C" fn release(inst: *mut CMPIInstance) -> CMPIStatus {
    NativeInstance::release(inst, &INSTANCE_FT)
}

unsafe extern "C" fn clone(inst: *const CMPIInstance, rc: *mut CMPIStatus) -> *mut CMPIInstance {
    NativeInstance::clone_handle(inst, &INSTANCE_FT, rc)
}

unsafe extern "C" fn get_property(inst: *const CMPIInstance, name: *const c_char, rc: *mut CMPIStatus) -> CMPIData {
    let out = NativeInstance::from_handle(inst, &INSTANCE_FT).and_then(|o| {
        let name = name_arg(name)?;
        o.lock()
            .property(name)
            .map(to_cmpi)
            .ok_or_else(|| CmpiError::no_such_property(name))
    });
    finish(rc, out, NULL_DATA)
}

unsafe extern "C" fn get_property_at(
    inst: *const CMPIInstance,
    index: CMPICount,
    name: *mut *mut CMPIString,
    rc: *mut CMPIStatus,
) -> CMPIData {
    let out = NativeInstance::from_handle(inst, &INSTANCE_FT).and_then(|o| {
        let data = o.lock();
        let prop = data
            .property_at(index as usize)
            .ok_or_else(|| CmpiError::no_such_property(&format!("index {index}")))?;
        set_name(name, &prop.name);
        Ok(to_cmpi(&prop.data))
    });
    finish(rc, out, NULL_DATA)
}

unsafe extern "C" fn get_property_count(inst: *const CMPIInstance, rc: *mut CMPIStatus) -> CMPICount {
    let out = NativeInstance::from_handle(inst, &INSTANCE_FT).map(|o| o.lock().property_count() as CMPICount);
    finish(rc, out, 0)
}

unsafe fn store(
    inst: *const CMPIInstance,
    name: *const c_char,
    value: *const CMPIValue,
    ty: CMPIType,
    origin: Option<&str>,
) -> CmpiResult<()> {
    let o = NativeInstance::from_handle(inst, &INSTANCE_FT)?;
    let name = name_arg(name)?;
    let data = from_setter(value, ty)?;
    if !o.lock().set_property(name, data, origin) {
        tracing::trace!(property = name, "set ignored by property filter");
    }
    Ok(())
}

unsafe extern "C" fn set_property(
    inst: *const CMPIInstance,
    name: *const c_char,
    value: *const CMPIValue,
    ty: CMPIType,
) -> CMPIStatus {
    done(store(inst, name, value, ty, None))
}

unsafe extern "C" fn set_property_with_origin(
    inst: *const CMPIInstance,
    name: *const c_char,
    value: *const CMPIValue,
    ty: CMPIType,
    origin: *const c_char,
) -> CMPIStatus {
    done(store(inst, name, value, ty, arg_str(origin)))
}

unsafe extern "C" fn get_object_path(inst: *const CMPIInstance, rc: *mut CMPIStatus) -> *mut CMPIObjectPath {
    let out = NativeInstance::from_handle(inst, &INSTANCE_FT)
        .map(|o| object_path::create(o.lock().path.clone(), Scope::Tracked));
    finish(rc, out, std::ptr::null_mut())
}

unsafe extern "C" fn set_object_path(inst: *const CMPIInstance, op: *const CMPIObjectPath) -> CMPIStatus {
    done(NativeInstance::from_handle(inst, &INSTANCE_FT).and_then(|o| {
        if op.is_null() {
            return Err(CmpiError::invalid_parameter("object path"));
        }
        let path = match native_object_path(op) {
            Some(p) => p,
            None => read_object_path(op)?,
        };
        o.lock().path = path;
        Ok(())
    }))
}

unsafe extern "C" fn set_property_filter(
    inst: *const CMPIInstance,
    property_list: *const *const c_char,
    keys: *const *const c_char,
) -> CMPIStatus {
    done(NativeInstance::from_handle(inst, &INSTANCE_FT).map(|o| {
        let list = property_names(property_list);
        let keys = property_names(keys).unwrap_or_default();
        o.lock().set_filter(list.as_deref(), &keys);
    }))
}

pub(crate) static INSTANCE_FT: CMPIInstanceFT = CMPIInstanceFT {
    ftVersion: CMPICurrentVersion,
    release,
    clone,
    getProperty: get_property,
    getPropertyAt: get_property_at,
    getPropertyCount: get_property_count,
    setProperty: set_property,
    getObjectPath: get_object_path,
    setPropertyFilter: set_property_filter,
    setObjectPath: set_object_path,
    setPropertyWithOrigin: set_property_with_origin,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::ArenaGuard;
    use crate::broker::objects::{native_instance, native_string};
    use crate::value::{Data, ObjectPathData};
    use std::ptr;

    fn sample() -> *mut CMPIInstance {
        let path = ObjectPathData::new("root/cimv2", "CIM_Fan").with_key("DeviceID", "fan0");
        let data = InstanceData::new(path).with_property("DeviceID", Data::key("fan0"));
        create(data, Scope::Tracked)
    }

    #[test]
    fn test_properties() {
        let _arena = ArenaGuard::push();
        let inst = sample();
        unsafe {
            let v = CMPIValue { uint64: 3000 };
            assert_eq!(set_property(inst, c"Speed".as_ptr(), &v, CMPI_uint64).rc, CMPI_RC_OK);

            let mut rc = CMPIStatus::ok();
            assert_eq!(get_property_count(inst, &mut rc), 2);
            let d = get_property(inst, c"speed".as_ptr(), &mut rc);
            assert_eq!(d.value.uint64, 3000);

            let mut name = ptr::null_mut();
            get_property_at(inst, 1, &mut name, &mut rc);
            assert_eq!(native_string(name).unwrap(), "Speed");

            let d = get_property(inst, c"Missing".as_ptr(), &mut rc);
            assert_eq!(rc.rc, CMPI_RC_ERR_NO_SUCH_PROPERTY);
            assert_eq!(d.r#type, CMPI_null);
        }
    }

    #[test]
    fn test_filter_keeps_keys() {
        let _arena = ArenaGuard::push();
        let inst = sample();
        unsafe {
            let list = [c"Speed".as_ptr(), ptr::null()];
            let keys = [c"DeviceID".as_ptr(), ptr::null()];
            assert_eq!(set_property_filter(inst, list.as_ptr(), keys.as_ptr()).rc, CMPI_RC_OK);

            let v = CMPIValue { uint8: 1 };
            assert_eq!(set_property(inst, c"Status".as_ptr(), &v, CMPI_uint8).rc, CMPI_RC_OK);
            let data = native_instance(inst).unwrap();
            assert!(data.property("Status").is_none());
            assert!(data.property("DeviceID").is_some());
        }
    }

    #[test]
    fn test_object_path_is_a_copy() {
        let _arena = ArenaGuard::push();
        let inst = sample();
        unsafe {
            let mut rc = CMPIStatus::ok();
            let op = get_object_path(inst, &mut rc);
            let other = object_path::create(ObjectPathData::new("root/other", "CIM_Fan"), Scope::Tracked);
            assert_eq!(set_object_path(inst, other).rc, CMPI_RC_OK);
            // the earlier path object is unaffected
            assert_eq!(native_object_path(op).unwrap().namespace, "root/cimv2");
            assert_eq!(native_instance(inst).unwrap().path.namespace, "root/other");
        }
    }
}
