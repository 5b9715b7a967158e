//! `CMPIBrokerFT`: up-calls from providers
//!
//! Each up-call is routed through the registry like a host request. The
//! caller's handles are passed through to the target provider unchanged; only
//! the context and result are new. Returned enumerations and objects are
//! tracked in the caller's arena.

use std::ffi::{c_char, c_uint};
use std::ptr;

use super::convert::{arg_str, instance_arg, path_arg, to_cmpi};
use super::encaps::ENC_FT;
use super::native::Scope;
use super::objects::{done, enumeration, finish, instance, native_context, object_path, NULL_DATA};
use super::request::{dispatch, Target};
use super::BrokerShared;
use crate::engine::MiKind;
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult, ReturnCode};
use crate::value::raw::read_context;
use crate::value::{Data, NamedData, ObjectPathData, Value};

/// Broker state behind `mb`
///
/// # Safety
/// `mb` must be null or a readable broker envelope.
pub(crate) unsafe fn shared<'a>(mb: *const CMPIBroker) -> CmpiResult<&'a BrokerShared> {
    if mb.is_null() || !ptr::eq((*mb).eft, &ENC_FT) || (*mb).hdl.is_null() {
        return Err(CmpiError::invalid_handle("broker"));
    }
    Ok(&*((*mb).hdl as *const BrokerShared))
}

/// Namespace of the path, else the caller's `CMPIInitNameSpace`
fn namespace_for(path: &ObjectPathData, caller: &NamedData) -> CmpiResult<String> {
    if !path.namespace.is_empty() {
        return Ok(path.namespace.clone());
    }
    caller
        .get(CMPIInitNameSpace)
        .and_then(|d| d.value())
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CmpiError::with_message(ReturnCode::ErrInvalidNamespace, "no namespace in path or context"))
}

struct Upcall<'a> {
    shared: &'a BrokerShared,
    path: ObjectPathData,
    entries: NamedData,
}

impl Upcall<'_> {
    fn target<'s>(&'s self, class_name: Option<&'s str>, kind: MiKind) -> Target<'s> {
        Target {
            namespace: &self.path.namespace,
            class_name: class_name.unwrap_or(&self.path.class_name),
            kind,
        }
    }
}

/// Shared state, target path and request context for an up-call
unsafe fn upcall<'a>(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    op: *const CMPIObjectPath,
    service: &str,
) -> CmpiResult<Upcall<'a>> {
    let shared = shared(mb)?;
    shared.threads.check_caller(service);
    let mut path = path_arg(op)?;
    let mut entries = if ctx.is_null() {
        NamedData::new()
    } else {
        match native_context(ctx) {
            Some(entries) => entries,
            None => read_context(ctx)?,
        }
    };
    let namespace = namespace_for(&path, &entries)?;
    entries.set(CMPIInitNameSpace, Data::new(namespace.as_str()));
    path.namespace = namespace;
    Ok(Upcall { shared, path, entries })
}

fn no_filter(filter_query: *const c_char) -> CmpiResult<()> {
    if filter_query.is_null() {
        Ok(())
    } else {
        Err(CmpiError::with_message(ReturnCode::ErrNotSupported, "filter queries are not supported"))
    }
}

fn first(items: Vec<Data>) -> Option<Value> {
    items.into_iter().next().and_then(Data::into_value)
}

// ============================================================================
// Threads and indications
// ============================================================================

unsafe extern "C" fn prepare_attach_thread(mb: *const CMPIBroker, ctx: *const CMPIContext) -> *mut CMPIContext {
    match shared(mb).and_then(|s| s.threads.prepare(ctx)) {
        Ok(prepared) => prepared,
        Err(err) => {
            tracing::warn!("prepareAttachThread failed: {}", err);
            ptr::null_mut()
        }
    }
}

unsafe extern "C" fn attach_thread(mb: *const CMPIBroker, ctx: *const CMPIContext) -> CMPIStatus {
    done(shared(mb).and_then(|s| s.threads.attach(ctx)))
}

unsafe extern "C" fn detach_thread(mb: *const CMPIBroker, ctx: *const CMPIContext) -> CMPIStatus {
    done(shared(mb).and_then(|s| s.threads.detach(ctx)))
}

unsafe extern "C" fn deliver_indication(
    mb: *const CMPIBroker,
    _ctx: *const CMPIContext,
    ns: *const c_char,
    ind: *const CMPIInstance,
) -> CMPIStatus {
    done((|| {
        let shared = shared(mb)?;
        shared.threads.check_caller("deliverIndication");
        let namespace = arg_str(ns).ok_or_else(|| CmpiError::invalid_parameter("namespace"))?;
        let indication = instance_arg(ind)?;
        tracing::debug!(class = indication.class_name(), "indication delivered to {}", namespace);
        shared.indications.deliver(namespace, indication)
    })())
}

// ============================================================================
// Instance up-calls
// ============================================================================

unsafe extern "C" fn enumerate_instance_names(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    class_path: *const CMPIObjectPath,
    rc: *mut CMPIStatus,
) -> *mut CMPIEnumeration {
    let out = upcall(mb, ctx, class_path, "enumerateInstanceNames").and_then(|up| {
        let items = dispatch(up.shared, up.target(None, MiKind::Instance), up.entries.clone(), |mi, ctx, rslt| {
            let m = mi.envelope::<CMPIInstanceMI>();
            Ok(((*(*m).ft).enumerateInstanceNames)(m, ctx, rslt, class_path))
        })?;
        Ok(enumeration::create(items, Scope::Tracked))
    });
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn enumerate_instances(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    class_path: *const CMPIObjectPath,
    properties: CMPIPropertyNames,
    rc: *mut CMPIStatus,
) -> *mut CMPIEnumeration {
    let out = upcall(mb, ctx, class_path, "enumerateInstances").and_then(|up| {
        let items = dispatch(up.shared, up.target(None, MiKind::Instance), up.entries.clone(), |mi, ctx, rslt| {
            let m = mi.envelope::<CMPIInstanceMI>();
            Ok(((*(*m).ft).enumerateInstances)(m, ctx, rslt, class_path, properties))
        })?;
        Ok(enumeration::create(items, Scope::Tracked))
    });
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn get_instance(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    inst_path: *const CMPIObjectPath,
    properties: CMPIPropertyNames,
    rc: *mut CMPIStatus,
) -> *mut CMPIInstance {
    let out = upcall(mb, ctx, inst_path, "getInstance").and_then(|up| {
        let items = dispatch(up.shared, up.target(None, MiKind::Instance), up.entries.clone(), |mi, ctx, rslt| {
            let m = mi.envelope::<CMPIInstanceMI>();
            Ok(((*(*m).ft).getInstance)(m, ctx, rslt, inst_path, properties))
        })?;
        match first(items) {
            Some(Value::Instance(inst)) => Ok(instance::create(*inst, Scope::Tracked)),
            _ => Err(CmpiError::not_found(up.path.to_string())),
        }
    });
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn create_instance(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    class_path: *const CMPIObjectPath,
    new_inst: *const CMPIInstance,
    rc: *mut CMPIStatus,
) -> *mut CMPIObjectPath {
    let out = upcall(mb, ctx, class_path, "createInstance").and_then(|up| {
        let fallback = instance_arg(new_inst)?.path;
        let items = dispatch(up.shared, up.target(None, MiKind::Instance), up.entries.clone(), |mi, ctx, rslt| {
            let m = mi.envelope::<CMPIInstanceMI>();
            Ok(((*(*m).ft).createInstance)(m, ctx, rslt, class_path, new_inst))
        })?;
        let path = match first(items) {
            Some(Value::Ref(path)) => path,
            _ => fallback,
        };
        Ok(object_path::create(path, Scope::Tracked))
    });
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn modify_instance(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    inst_path: *const CMPIObjectPath,
    mod_inst: *const CMPIInstance,
    properties: CMPIPropertyNames,
) -> CMPIStatus {
    done(upcall(mb, ctx, inst_path, "modifyInstance").and_then(|up| {
        dispatch(up.shared, up.target(None, MiKind::Instance), up.entries.clone(), |mi, ctx, rslt| {
            let m = mi.envelope::<CMPIInstanceMI>();
            Ok(((*(*m).ft).modifyInstance)(m, ctx, rslt, inst_path, mod_inst, properties))
        })
        .map(drop)
    }))
}

unsafe extern "C" fn delete_instance(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    inst_path: *const CMPIObjectPath,
) -> CMPIStatus {
    done(upcall(mb, ctx, inst_path, "deleteInstance").and_then(|up| {
        dispatch(up.shared, up.target(None, MiKind::Instance), up.entries.clone(), |mi, ctx, rslt| {
            let m = mi.envelope::<CMPIInstanceMI>();
            Ok(((*(*m).ft).deleteInstance)(m, ctx, rslt, inst_path))
        })
        .map(drop)
    }))
}

unsafe extern "C" fn exec_query(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    class_path: *const CMPIObjectPath,
    query: *const c_char,
    lang: *const c_char,
    rc: *mut CMPIStatus,
) -> *mut CMPIEnumeration {
    let out = upcall(mb, ctx, class_path, "execQuery").and_then(|up| {
        if query.is_null() || lang.is_null() {
            return Err(CmpiError::invalid_parameter("query"));
        }
        let items = dispatch(up.shared, up.target(None, MiKind::Instance), up.entries.clone(), |mi, ctx, rslt| {
            let m = mi.envelope::<CMPIInstanceMI>();
            Ok(((*(*m).ft).execQuery)(m, ctx, rslt, class_path, query, lang))
        })?;
        Ok(enumeration::create(items, Scope::Tracked))
    });
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn enumerate_instances_filtered(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    class_path: *const CMPIObjectPath,
    properties: CMPIPropertyNames,
    filter_query: *const c_char,
    _filter_query_language: *const c_char,
    _continue_on_error: CMPIBoolean,
    rc: *mut CMPIStatus,
) -> *mut CMPIEnumeration {
    if let Err(err) = no_filter(filter_query) {
        return finish(rc, Err(err), ptr::null_mut());
    }
    enumerate_instances(mb, ctx, class_path, properties, rc)
}

// ============================================================================
// Association up-calls
// ============================================================================

// Association providers are registered for the association class; without
// one, the source object's class is used.

unsafe extern "C" fn associators(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    inst_path: *const CMPIObjectPath,
    assoc_class: *const c_char,
    result_class: *const c_char,
    role: *const c_char,
    result_role: *const c_char,
    properties: CMPIPropertyNames,
    rc: *mut CMPIStatus,
) -> *mut CMPIEnumeration {
    let out = upcall(mb, ctx, inst_path, "associators").and_then(|up| {
        let target = up.target(arg_str(assoc_class), MiKind::Association);
        let items = dispatch(up.shared, target, up.entries.clone(), |mi, ctx, rslt| {
            let m = mi.envelope::<CMPIAssociationMI>();
            Ok(((*(*m).ft).associators)(
                m,
                ctx,
                rslt,
                inst_path,
                assoc_class,
                result_class,
                role,
                result_role,
                properties,
            ))
        })?;
        Ok(enumeration::create(items, Scope::Tracked))
    });
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn associator_names(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    inst_path: *const CMPIObjectPath,
    assoc_class: *const c_char,
    result_class: *const c_char,
    role: *const c_char,
    result_role: *const c_char,
    rc: *mut CMPIStatus,
) -> *mut CMPIEnumeration {
    let out = upcall(mb, ctx, inst_path, "associatorNames").and_then(|up| {
        let target = up.target(arg_str(assoc_class), MiKind::Association);
        let items = dispatch(up.shared, target, up.entries.clone(), |mi, ctx, rslt| {
            let m = mi.envelope::<CMPIAssociationMI>();
            Ok(((*(*m).ft).associatorNames)(
                m,
                ctx,
                rslt,
                inst_path,
                assoc_class,
                result_class,
                role,
                result_role,
            ))
        })?;
        Ok(enumeration::create(items, Scope::Tracked))
    });
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn references(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    inst_path: *const CMPIObjectPath,
    result_class: *const c_char,
    role: *const c_char,
    properties: CMPIPropertyNames,
    rc: *mut CMPIStatus,
) -> *mut CMPIEnumeration {
    let out = upcall(mb, ctx, inst_path, "references").and_then(|up| {
        let target = up.target(arg_str(result_class), MiKind::Association);
        let items = dispatch(up.shared, target, up.entries.clone(), |mi, ctx, rslt| {
            let m = mi.envelope::<CMPIAssociationMI>();
            Ok(((*(*m).ft).references)(m, ctx, rslt, inst_path, result_class, role, properties))
        })?;
        Ok(enumeration::create(items, Scope::Tracked))
    });
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn reference_names(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    inst_path: *const CMPIObjectPath,
    result_class: *const c_char,
    role: *const c_char,
    rc: *mut CMPIStatus,
) -> *mut CMPIEnumeration {
    let out = upcall(mb, ctx, inst_path, "referenceNames").and_then(|up| {
        let target = up.target(arg_str(result_class), MiKind::Association);
        let items = dispatch(up.shared, target, up.entries.clone(), |mi, ctx, rslt| {
            let m = mi.envelope::<CMPIAssociationMI>();
            Ok(((*(*m).ft).referenceNames)(m, ctx, rslt, inst_path, result_class, role))
        })?;
        Ok(enumeration::create(items, Scope::Tracked))
    });
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn associators_filtered(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    inst_path: *const CMPIObjectPath,
    assoc_class: *const c_char,
    result_class: *const c_char,
    role: *const c_char,
    result_role: *const c_char,
    properties: CMPIPropertyNames,
    filter_query: *const c_char,
    _filter_query_language: *const c_char,
    _continue_on_error: CMPIBoolean,
    rc: *mut CMPIStatus,
) -> *mut CMPIEnumeration {
    if let Err(err) = no_filter(filter_query) {
        return finish(rc, Err(err), ptr::null_mut());
    }
    associators(mb, ctx, inst_path, assoc_class, result_class, role, result_role, properties, rc)
}

unsafe extern "C" fn references_filtered(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    inst_path: *const CMPIObjectPath,
    result_class: *const c_char,
    role: *const c_char,
    properties: CMPIPropertyNames,
    filter_query: *const c_char,
    _filter_query_language: *const c_char,
    _continue_on_error: CMPIBoolean,
    rc: *mut CMPIStatus,
) -> *mut CMPIEnumeration {
    if let Err(err) = no_filter(filter_query) {
        return finish(rc, Err(err), ptr::null_mut());
    }
    references(mb, ctx, inst_path, result_class, role, properties, rc)
}

// ============================================================================
// Methods and properties
// ============================================================================

unsafe extern "C" fn invoke_method(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    obj_path: *const CMPIObjectPath,
    method: *const c_char,
    in_args: *const CMPIArgs,
    out_args: *mut CMPIArgs,
    rc: *mut CMPIStatus,
) -> CMPIData {
    let out = upcall(mb, ctx, obj_path, "invokeMethod").and_then(|up| {
        if arg_str(method).is_none() {
            return Err(CmpiError::invalid_parameter("method name"));
        }
        let items = dispatch(up.shared, up.target(None, MiKind::Method), up.entries.clone(), |mi, ctx, rslt| {
            let m = mi.envelope::<CMPIMethodMI>();
            Ok(((*(*m).ft).invokeMethod)(m, ctx, rslt, obj_path, method, in_args, out_args))
        })?;
        Ok(items.first().map_or(NULL_DATA, to_cmpi))
    });
    finish(rc, out, NULL_DATA)
}

unsafe extern "C" fn set_property(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    inst_path: *const CMPIObjectPath,
    name: *const c_char,
    value: *const CMPIValue,
    ty: CMPIType,
) -> CMPIStatus {
    done(upcall(mb, ctx, inst_path, "setProperty").and_then(|up| {
        if arg_str(name).is_none() {
            return Err(CmpiError::invalid_parameter("property name"));
        }
        let data = if value.is_null() {
            CMPIData {
                r#type: ty,
                state: CMPI_nullValue,
                value: CMPIValue::default(),
            }
        } else {
            CMPIData {
                r#type: ty,
                state: CMPI_goodValue,
                value: *value,
            }
        };
        dispatch(up.shared, up.target(None, MiKind::Property), up.entries.clone(), |mi, ctx, rslt| {
            let m = mi.envelope::<CMPIPropertyMI>();
            Ok(((*(*m).ft).setProperty)(m, ctx, rslt, inst_path, name, data))
        })
        .map(drop)
    }))
}

unsafe extern "C" fn get_property(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    inst_path: *const CMPIObjectPath,
    name: *const c_char,
    rc: *mut CMPIStatus,
) -> CMPIData {
    let out = upcall(mb, ctx, inst_path, "getProperty").and_then(|up| {
        let pname = arg_str(name).ok_or_else(|| CmpiError::invalid_parameter("property name"))?;
        let items = dispatch(up.shared, up.target(None, MiKind::Property), up.entries.clone(), |mi, ctx, rslt| {
            let m = mi.envelope::<CMPIPropertyMI>();
            Ok(((*(*m).ft).getProperty)(m, ctx, rslt, inst_path, name))
        })?;
        items
            .first()
            .map(to_cmpi)
            .ok_or_else(|| CmpiError::no_such_property(pname))
    });
    finish(rc, out, NULL_DATA)
}

/// Service table for a broker; capabilities and name vary per instance
pub(crate) fn broker_ft(capabilities: c_uint, name: *const c_char) -> CMPIBrokerFT {
    CMPIBrokerFT {
        brokerCapabilities: capabilities,
        brokerVersion: CMPICurrentVersion,
        brokerName: name,
        prepareAttachThread: prepare_attach_thread,
        attachThread: attach_thread,
        detachThread: detach_thread,
        deliverIndication: deliver_indication,
        enumerateInstanceNames: enumerate_instance_names,
        getInstance: get_instance,
        createInstance: create_instance,
        modifyInstance: modify_instance,
        deleteInstance: delete_instance,
        execQuery: exec_query,
        enumerateInstances: enumerate_instances,
        associators,
        associatorNames: associator_names,
        references,
        referenceNames: reference_names,
        invokeMethod: invoke_method,
        setProperty: set_property,
        getProperty: get_property,
        enumerateInstancesFiltered: enumerate_instances_filtered,
        associatorsFiltered: associators_filtered,
        referencesFiltered: references_filtered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_broker_rejected() {
        let foreign = CMPIBroker {
            hdl: ptr::null_mut(),
            bft: ptr::null(),
            eft: ptr::null(),
            xft: ptr::null(),
            mft: ptr::null(),
        };
        let err = unsafe { shared(&foreign) }.err().unwrap();
        assert_eq!(err.rc(), CMPI_RC_ERR_INVALID_HANDLE);
        let status = unsafe { attach_thread(ptr::null(), ptr::null()) };
        assert_eq!(status.rc, CMPI_RC_ERR_INVALID_HANDLE);
    }

    #[test]
    fn test_namespace_from_context() {
        let path = ObjectPathData::new("", "CIM_Fan");
        let caller = NamedData::new().with(CMPIInitNameSpace, "root/interop");
        assert_eq!(namespace_for(&path, &caller).unwrap(), "root/interop");
        let path = ObjectPathData::new("root/cimv2", "CIM_Fan");
        assert_eq!(namespace_for(&path, &caller).unwrap(), "root/cimv2");
        let err = namespace_for(&ObjectPathData::new("", "CIM_Fan"), &NamedData::new()).unwrap_err();
        assert!(err.is(ReturnCode::ErrInvalidNamespace));
    }

    #[test]
    fn test_filters_rejected() {
        assert!(no_filter(ptr::null()).is_ok());
        let err = no_filter(c"SELECT * FROM CIM_Fan".as_ptr()).unwrap_err();
        assert!(err.is(ReturnCode::ErrNotSupported));
    }
}
