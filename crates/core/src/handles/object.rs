//! Instance, object path, args, context and result handles

use std::ptr;

use crate::flags::InvocationFlags;
use crate::handles::{c_arg, c_opt, call_rc, handle_type, opt_ptr};
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};
use crate::value::raw::{
    data_from_raw, data_to_raw, read_args, read_context, read_instance, read_object_path,
    read_string, PropertyNames,
};
use crate::value::{ArgsData, Data, ErrorData, InstanceData, NamedData, ObjectPathData, Value};

/// Read the name out-parameter of a `get*At` slot
unsafe fn take_name(name: *mut CMPIString) -> CmpiResult<String> {
    if name.is_null() {
        Ok(String::new())
    } else {
        read_string(name)
    }
}

fn index_arg(index: usize) -> CmpiResult<CMPICount> {
    CMPICount::try_from(index).map_err(|_| CmpiError::no_such_property(&index.to_string()))
}

// ============================================================================
// Instance
// ============================================================================

handle_type!(
    /// CIM instance
    InstanceRef,
    CMPIInstance
);

impl InstanceRef {
    pub fn property(&self, name: &str) -> CmpiResult<Data> {
        let n = c_arg(name)?;
        unsafe {
            let d = call_rc(|rc| (self.ft().getProperty)(self.as_ptr(), n.as_ptr(), rc))?;
            data_from_raw(&d)
        }
    }

    pub fn property_at(&self, index: usize) -> CmpiResult<(String, Data)> {
        let index = index_arg(index)?;
        let mut name: *mut CMPIString = ptr::null_mut();
        unsafe {
            let d = call_rc(|rc| (self.ft().getPropertyAt)(self.as_ptr(), index, &mut name, rc))?;
            Ok((take_name(name)?, data_from_raw(&d)?))
        }
    }

    pub fn property_count(&self) -> CmpiResult<usize> {
        unsafe { call_rc(|rc| (self.ft().getPropertyCount)(self.as_ptr(), rc)).map(|n| n as usize) }
    }

    /// Set a property; ignored silently when the active filter excludes it
    pub fn set_property(&self, name: &str, data: &Data) -> CmpiResult<()> {
        let n = c_arg(name)?;
        let raw = data_to_raw(&self.broker(), data)?;
        unsafe {
            CmpiError::check((self.ft().setProperty)(self.as_ptr(), n.as_ptr(), raw.as_ptr(), raw.ty()))
        }
    }

    pub fn set_property_with_origin(&self, name: &str, data: &Data, origin: Option<&str>) -> CmpiResult<()> {
        let (n, o) = (c_arg(name)?, c_opt(origin)?);
        let raw = data_to_raw(&self.broker(), data)?;
        unsafe {
            CmpiError::check((self.ft().setPropertyWithOrigin)(
                self.as_ptr(),
                n.as_ptr(),
                raw.as_ptr(),
                raw.ty(),
                opt_ptr(&o),
            ))
        }
    }

    pub fn object_path(&self) -> CmpiResult<ObjectPathRef> {
        unsafe {
            let p = call_rc(|rc| (self.ft().getObjectPath)(self.as_ptr(), rc))?;
            ObjectPathRef::from_raw(p, self.broker())
        }
    }

    pub fn set_object_path(&self, path: &ObjectPathRef) -> CmpiResult<()> {
        unsafe { CmpiError::check((self.ft().setObjectPath)(self.as_ptr(), path.as_ptr())) }
    }

    /// Restrict later `set_property` calls to `properties`; key properties
    /// named in `keys` are always kept
    pub fn set_property_filter(&self, properties: Option<&[&str]>, keys: &[&str]) -> CmpiResult<()> {
        let props = PropertyNames::new(properties)?;
        let keys = PropertyNames::new(Some(keys))?;
        unsafe {
            CmpiError::check((self.ft().setPropertyFilter)(self.as_ptr(), props.as_ptr(), keys.as_ptr()))
        }
    }

    pub fn to_data(&self) -> CmpiResult<InstanceData> {
        unsafe { read_instance(self.as_ptr()) }
    }
}

// ============================================================================
// Object path
// ============================================================================

handle_type!(
    /// Identity of a class or instance
    ObjectPathRef,
    CMPIObjectPath
);

/// Getter `<part>` and setter `set_<part>` for a string part of the path
macro_rules! path_string {
    ($get:ident, $get_slot:ident, $set_slot:ident) => {
        paste::paste! {
            pub fn $get(&self) -> CmpiResult<String> {
                unsafe {
                    let s = call_rc(|rc| (self.ft().$get_slot)(self.as_ptr(), rc))?;
                    take_name(s)
                }
            }

            pub fn [<set_ $get>](&self, value: &str) -> CmpiResult<()> {
                let v = c_arg(value)?;
                unsafe { CmpiError::check((self.ft().$set_slot)(self.as_ptr(), v.as_ptr())) }
            }
        }
    };
}

impl ObjectPathRef {
    path_string!(namespace, getNameSpace, setNameSpace);
    path_string!(hostname, getHostname, setHostname);
    path_string!(class_name, getClassName, setClassName);

    /// Add or replace a key binding
    pub fn add_key(&self, name: &str, data: &Data) -> CmpiResult<()> {
        let n = c_arg(name)?;
        let raw = data_to_raw(&self.broker(), data)?;
        unsafe { CmpiError::check((self.ft().addKey)(self.as_ptr(), n.as_ptr(), raw.as_ptr(), raw.ty())) }
    }

    pub fn key(&self, name: &str) -> CmpiResult<Data> {
        let n = c_arg(name)?;
        unsafe {
            let d = call_rc(|rc| (self.ft().getKey)(self.as_ptr(), n.as_ptr(), rc))?;
            data_from_raw(&d)
        }
    }

    pub fn key_at(&self, index: usize) -> CmpiResult<(String, Data)> {
        let index = index_arg(index)?;
        let mut name: *mut CMPIString = ptr::null_mut();
        unsafe {
            let d = call_rc(|rc| (self.ft().getKeyAt)(self.as_ptr(), index, &mut name, rc))?;
            Ok((take_name(name)?, data_from_raw(&d)?))
        }
    }

    pub fn key_count(&self) -> CmpiResult<usize> {
        unsafe { call_rc(|rc| (self.ft().getKeyCount)(self.as_ptr(), rc)).map(|n| n as usize) }
    }

    pub fn set_namespace_from(&self, src: &ObjectPathRef) -> CmpiResult<()> {
        unsafe { CmpiError::check((self.ft().setNameSpaceFromObjectPath)(self.as_ptr(), src.as_ptr())) }
    }

    pub fn set_host_and_namespace_from(&self, src: &ObjectPathRef) -> CmpiResult<()> {
        unsafe {
            CmpiError::check((self.ft().setHostAndNameSpaceFromObjectPath)(self.as_ptr(), src.as_ptr()))
        }
    }

    pub fn class_qualifier(&self, qualifier: &str) -> CmpiResult<Data> {
        let q = c_arg(qualifier)?;
        unsafe {
            let d = call_rc(|rc| (self.ft().getClassQualifier)(self.as_ptr(), q.as_ptr(), rc))?;
            data_from_raw(&d)
        }
    }

    pub fn property_qualifier(&self, property: &str, qualifier: &str) -> CmpiResult<Data> {
        let (p, q) = (c_arg(property)?, c_arg(qualifier)?);
        unsafe {
            let d = call_rc(|rc| (self.ft().getPropertyQualifier)(self.as_ptr(), p.as_ptr(), q.as_ptr(), rc))?;
            data_from_raw(&d)
        }
    }

    pub fn method_qualifier(&self, method: &str, qualifier: &str) -> CmpiResult<Data> {
        let (m, q) = (c_arg(method)?, c_arg(qualifier)?);
        unsafe {
            let d = call_rc(|rc| (self.ft().getMethodQualifier)(self.as_ptr(), m.as_ptr(), q.as_ptr(), rc))?;
            data_from_raw(&d)
        }
    }

    pub fn parameter_qualifier(&self, method: &str, parameter: &str, qualifier: &str) -> CmpiResult<Data> {
        let (m, p, q) = (c_arg(method)?, c_arg(parameter)?, c_arg(qualifier)?);
        unsafe {
            let d = call_rc(|rc| {
                (self.ft().getParameterQualifier)(self.as_ptr(), m.as_ptr(), p.as_ptr(), q.as_ptr(), rc)
            })?;
            data_from_raw(&d)
        }
    }

    /// WBEM URI form
    pub fn to_uri(&self) -> CmpiResult<String> {
        unsafe {
            let s = call_rc(|rc| (self.ft().toString)(self.as_ptr(), rc))?;
            take_name(s)
        }
    }

    pub fn to_data(&self) -> CmpiResult<ObjectPathData> {
        unsafe { read_object_path(self.as_ptr()) }
    }
}

// ============================================================================
// Args
// ============================================================================

handle_type!(
    /// Named method arguments
    ArgsRef,
    CMPIArgs
);

impl ArgsRef {
    pub fn add_arg(&self, name: &str, data: &Data) -> CmpiResult<()> {
        let n = c_arg(name)?;
        let raw = data_to_raw(&self.broker(), data)?;
        unsafe { CmpiError::check((self.ft().addArg)(self.as_ptr(), n.as_ptr(), raw.as_ptr(), raw.ty())) }
    }

    pub fn arg(&self, name: &str) -> CmpiResult<Data> {
        let n = c_arg(name)?;
        unsafe {
            let d = call_rc(|rc| (self.ft().getArg)(self.as_ptr(), n.as_ptr(), rc))?;
            data_from_raw(&d)
        }
    }

    pub fn arg_at(&self, index: usize) -> CmpiResult<(String, Data)> {
        let index = index_arg(index)?;
        let mut name: *mut CMPIString = ptr::null_mut();
        unsafe {
            let d = call_rc(|rc| (self.ft().getArgAt)(self.as_ptr(), index, &mut name, rc))?;
            Ok((take_name(name)?, data_from_raw(&d)?))
        }
    }

    pub fn arg_count(&self) -> CmpiResult<usize> {
        unsafe { call_rc(|rc| (self.ft().getArgCount)(self.as_ptr(), rc)).map(|n| n as usize) }
    }

    pub fn to_data(&self) -> CmpiResult<ArgsData> {
        unsafe { read_args(self.as_ptr()) }
    }
}

// ============================================================================
// Context
// ============================================================================

handle_type!(
    /// Invocation metadata of the current request
    ContextRef,
    CMPIContext
);

impl ContextRef {
    pub fn entry(&self, name: &str) -> CmpiResult<Data> {
        let n = c_arg(name)?;
        unsafe {
            let d = call_rc(|rc| (self.ft().getEntry)(self.as_ptr(), n.as_ptr(), rc))?;
            data_from_raw(&d)
        }
    }

    pub fn entry_at(&self, index: usize) -> CmpiResult<(String, Data)> {
        let index = index_arg(index)?;
        let mut name: *mut CMPIString = ptr::null_mut();
        unsafe {
            let d = call_rc(|rc| (self.ft().getEntryAt)(self.as_ptr(), index, &mut name, rc))?;
            Ok((take_name(name)?, data_from_raw(&d)?))
        }
    }

    pub fn entry_count(&self) -> CmpiResult<usize> {
        unsafe { call_rc(|rc| (self.ft().getEntryCount)(self.as_ptr(), rc)).map(|n| n as usize) }
    }

    pub fn add_entry(&self, name: &str, data: &Data) -> CmpiResult<()> {
        let n = c_arg(name)?;
        let raw = data_to_raw(&self.broker(), data)?;
        unsafe { CmpiError::check((self.ft().addEntry)(self.as_ptr(), n.as_ptr(), raw.as_ptr(), raw.ty())) }
    }

    pub fn to_data(&self) -> CmpiResult<NamedData> {
        unsafe { read_context(self.as_ptr()) }
    }

    fn string_entry(&self, name: &str) -> Option<String> {
        let d = self.entry(name).ok()?;
        d.value().and_then(Value::as_str).map(str::to_string)
    }

    /// Namespace the request was issued against
    pub fn namespace(&self) -> Option<String> {
        self.string_entry(CMPIInitNameSpace)
    }

    pub fn principal(&self) -> Option<String> {
        self.string_entry(CMPIPrincipal)
    }

    pub fn role(&self) -> Option<String> {
        self.string_entry(CMPIRole)
    }

    pub fn accept_language(&self) -> Option<String> {
        self.string_entry(CMPIAcceptLanguage)
    }

    pub fn content_language(&self) -> Option<String> {
        self.string_entry(CMPIContentLanguage)
    }

    /// Invocation flags; empty when the entry is absent
    pub fn invocation_flags(&self) -> InvocationFlags {
        self.entry(CMPIInvocationFlags)
            .ok()
            .and_then(|d| d.value().and_then(Value::as_integer))
            .map(|v| InvocationFlags::from_bits_truncate(v as u32))
            .unwrap_or_else(InvocationFlags::empty)
    }
}

// ============================================================================
// Result
// ============================================================================

handle_type!(
    /// Sink for a provider's results
    ResultRef,
    CMPIResult
);

impl ResultRef {
    pub fn return_data(&self, data: &Data) -> CmpiResult<()> {
        let raw = data_to_raw(&self.broker(), data)?;
        unsafe { CmpiError::check((self.ft().returnData)(self.as_ptr(), raw.as_ptr(), raw.ty())) }
    }

    pub fn return_instance(&self, inst: &InstanceRef) -> CmpiResult<()> {
        unsafe { CmpiError::check((self.ft().returnInstance)(self.as_ptr(), inst.as_ptr())) }
    }

    pub fn return_object_path(&self, path: &ObjectPathRef) -> CmpiResult<()> {
        unsafe { CmpiError::check((self.ft().returnObjectPath)(self.as_ptr(), path.as_ptr())) }
    }

    pub fn return_done(&self) -> CmpiResult<()> {
        unsafe { CmpiError::check((self.ft().returnDone)(self.as_ptr())) }
    }

    pub fn return_error(&self, error: &crate::handles::ErrorRef) -> CmpiResult<()> {
        unsafe { CmpiError::check((self.ft().returnError)(self.as_ptr(), error.as_ptr())) }
    }

    /// Copy an owned instance into a broker instance and return it
    pub fn return_instance_data(&self, inst: &InstanceData) -> CmpiResult<()> {
        let handle = self.broker().new_instance_from(inst)?;
        self.return_instance(&handle)
    }

    pub fn return_path_data(&self, path: &ObjectPathData) -> CmpiResult<()> {
        let handle = self.broker().new_object_path_from(path)?;
        self.return_object_path(&handle)
    }

    pub fn return_error_data(&self, error: &ErrorData) -> CmpiResult<()> {
        let handle = self.broker().new_error(error)?;
        self.return_error(&handle)
    }
}
