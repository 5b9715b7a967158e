//! `extern "C"` trampolines and the static MI function tables
//!
//! Each trampoline wraps its raw arguments in handle wrappers and calls the
//! matching kind trait method through [`invoke`], which turns errors and
//! panics into the returned `CMPIStatus`.

use std::ffi::c_char;
use std::marker::PhantomData;

use super::base::{cleanup, invoke};
use super::{
    AssociationProvider, IndicationProvider, InstanceProvider, MethodProvider, PropertyProvider,
    QueryFilter,
};
use crate::broker::AssocFilter;
use crate::handles::{
    ArgsRef, BrokerHandle, ContextRef, InstanceRef, ObjectPathRef, ResultRef, SelectExpRef,
};
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};
use crate::value::raw::{data_from_raw, opt_cstr, property_names};

/// Static function tables of provider type `P`
pub(crate) struct Tables<P>(PhantomData<P>);

/// Handles every slot receives
struct Call {
    ctx: ContextRef,
    rslt: ResultRef,
    path: ObjectPathRef,
}

impl Call {
    unsafe fn new(
        broker: BrokerHandle,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        op: *const CMPIObjectPath,
    ) -> CmpiResult<Self> {
        Ok(Self {
            ctx: ContextRef::from_raw(ctx, broker)?,
            rslt: ResultRef::from_raw(rslt, broker)?,
            path: ObjectPathRef::from_raw(op, broker)?,
        })
    }
}

/// A required string argument
unsafe fn required(p: *const c_char, what: &str) -> CmpiResult<String> {
    opt_cstr(p).ok_or_else(|| CmpiError::invalid_parameter(format!("{what} is null")))
}

unsafe fn query_filter(query: *const c_char, language: *const c_char, continue_on_error: CMPIBoolean) -> QueryFilter {
    QueryFilter {
        query: opt_cstr(query),
        language: opt_cstr(language),
        continue_on_error: continue_on_error != 0,
    }
}

unsafe fn assoc_filter(
    assoc_class: *const c_char,
    result_class: *const c_char,
    role: *const c_char,
    result_role: *const c_char,
) -> AssocFilter {
    AssocFilter {
        assoc_class: opt_cstr(assoc_class),
        result_class: opt_cstr(result_class),
        role: opt_cstr(role),
        result_role: opt_cstr(result_role),
    }
}

// ============================================================================
// Instance
// ============================================================================

unsafe extern "C" fn enumerate_instance_names<P: InstanceProvider>(
    mi: *mut CMPIInstanceMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    class_path: *const CMPIObjectPath,
) -> CMPIStatus {
    invoke(mi, "enumerateInstanceNames", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, class_path)?;
        p.enumerate_instance_names(&c.ctx, &c.rslt, &c.path)
    })
}

unsafe extern "C" fn enumerate_instances<P: InstanceProvider>(
    mi: *mut CMPIInstanceMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    class_path: *const CMPIObjectPath,
    properties: CMPIPropertyNames,
) -> CMPIStatus {
    invoke(mi, "enumerateInstances", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, class_path)?;
        let names = property_names(properties);
        p.enumerate_instances(&c.ctx, &c.rslt, &c.path, names.as_deref())
    })
}

unsafe extern "C" fn get_instance<P: InstanceProvider>(
    mi: *mut CMPIInstanceMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    inst_path: *const CMPIObjectPath,
    properties: CMPIPropertyNames,
) -> CMPIStatus {
    invoke(mi, "getInstance", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, inst_path)?;
        let names = property_names(properties);
        p.get_instance(&c.ctx, &c.rslt, &c.path, names.as_deref())
    })
}

unsafe extern "C" fn create_instance<P: InstanceProvider>(
    mi: *mut CMPIInstanceMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    class_path: *const CMPIObjectPath,
    inst: *const CMPIInstance,
) -> CMPIStatus {
    invoke(mi, "createInstance", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, class_path)?;
        let inst = InstanceRef::from_raw(inst, b)?;
        p.create_instance(&c.ctx, &c.rslt, &c.path, &inst)
    })
}

unsafe extern "C" fn modify_instance<P: InstanceProvider>(
    mi: *mut CMPIInstanceMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    inst_path: *const CMPIObjectPath,
    mod_inst: *const CMPIInstance,
    properties: CMPIPropertyNames,
) -> CMPIStatus {
    invoke(mi, "modifyInstance", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, inst_path)?;
        let inst = InstanceRef::from_raw(mod_inst, b)?;
        let names = property_names(properties);
        p.modify_instance(&c.ctx, &c.rslt, &c.path, &inst, names.as_deref())
    })
}

unsafe extern "C" fn delete_instance<P: InstanceProvider>(
    mi: *mut CMPIInstanceMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    inst_path: *const CMPIObjectPath,
) -> CMPIStatus {
    invoke(mi, "deleteInstance", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, inst_path)?;
        p.delete_instance(&c.ctx, &c.rslt, &c.path)
    })
}

unsafe extern "C" fn exec_query<P: InstanceProvider>(
    mi: *mut CMPIInstanceMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    class_path: *const CMPIObjectPath,
    query: *const c_char,
    lang: *const c_char,
) -> CMPIStatus {
    invoke(mi, "execQuery", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, class_path)?;
        let query = required(query, "query")?;
        let lang = required(lang, "query language")?;
        p.exec_query(&c.ctx, &c.rslt, &c.path, &query, &lang)
    })
}

#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn enumerate_instances_filtered<P: InstanceProvider>(
    mi: *mut CMPIInstanceMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    class_path: *const CMPIObjectPath,
    properties: CMPIPropertyNames,
    filter_query: *const c_char,
    filter_query_language: *const c_char,
    continue_on_error: CMPIBoolean,
) -> CMPIStatus {
    invoke(mi, "enumerateInstancesFiltered", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, class_path)?;
        let names = property_names(properties);
        let filter = query_filter(filter_query, filter_query_language, continue_on_error);
        p.enumerate_instances_filtered(&c.ctx, &c.rslt, &c.path, names.as_deref(), &filter)
    })
}

impl<P: InstanceProvider> Tables<P> {
    pub(crate) const INSTANCE: &'static CMPIInstanceMIFT = &CMPIInstanceMIFT {
        ftVersion: CMPICurrentVersion,
        miVersion: CMPICurrentVersion,
        miName: P::NAME.as_ptr(),
        cleanup: cleanup::<P, CMPIInstanceMI>,
        enumerateInstanceNames: enumerate_instance_names::<P>,
        enumerateInstances: enumerate_instances::<P>,
        getInstance: get_instance::<P>,
        createInstance: create_instance::<P>,
        modifyInstance: modify_instance::<P>,
        deleteInstance: delete_instance::<P>,
        execQuery: exec_query::<P>,
        enumerateInstancesFiltered: enumerate_instances_filtered::<P>,
    };
}

// ============================================================================
// Association
// ============================================================================

#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn associators<P: AssociationProvider>(
    mi: *mut CMPIAssociationMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    op: *const CMPIObjectPath,
    assoc_class: *const c_char,
    result_class: *const c_char,
    role: *const c_char,
    result_role: *const c_char,
    properties: CMPIPropertyNames,
) -> CMPIStatus {
    invoke(mi, "associators", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, op)?;
        let filter = assoc_filter(assoc_class, result_class, role, result_role);
        let names = property_names(properties);
        p.associators(&c.ctx, &c.rslt, &c.path, &filter, names.as_deref())
    })
}

#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn associator_names<P: AssociationProvider>(
    mi: *mut CMPIAssociationMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    op: *const CMPIObjectPath,
    assoc_class: *const c_char,
    result_class: *const c_char,
    role: *const c_char,
    result_role: *const c_char,
) -> CMPIStatus {
    invoke(mi, "associatorNames", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, op)?;
        let filter = assoc_filter(assoc_class, result_class, role, result_role);
        p.associator_names(&c.ctx, &c.rslt, &c.path, &filter)
    })
}

unsafe extern "C" fn references<P: AssociationProvider>(
    mi: *mut CMPIAssociationMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    op: *const CMPIObjectPath,
    result_class: *const c_char,
    role: *const c_char,
    properties: CMPIPropertyNames,
) -> CMPIStatus {
    invoke(mi, "references", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, op)?;
        let (result_class, role) = (opt_cstr(result_class), opt_cstr(role));
        let names = property_names(properties);
        p.references(&c.ctx, &c.rslt, &c.path, result_class.as_deref(), role.as_deref(), names.as_deref())
    })
}

unsafe extern "C" fn reference_names<P: AssociationProvider>(
    mi: *mut CMPIAssociationMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    op: *const CMPIObjectPath,
    result_class: *const c_char,
    role: *const c_char,
) -> CMPIStatus {
    invoke(mi, "referenceNames", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, op)?;
        let (result_class, role) = (opt_cstr(result_class), opt_cstr(role));
        p.reference_names(&c.ctx, &c.rslt, &c.path, result_class.as_deref(), role.as_deref())
    })
}

#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn associators_filtered<P: AssociationProvider>(
    mi: *mut CMPIAssociationMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    op: *const CMPIObjectPath,
    assoc_class: *const c_char,
    result_class: *const c_char,
    role: *const c_char,
    result_role: *const c_char,
    properties: CMPIPropertyNames,
    filter_query: *const c_char,
    filter_query_language: *const c_char,
    continue_on_error: CMPIBoolean,
) -> CMPIStatus {
    invoke(mi, "associatorsFiltered", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, op)?;
        let filter = assoc_filter(assoc_class, result_class, role, result_role);
        let names = property_names(properties);
        let query = query_filter(filter_query, filter_query_language, continue_on_error);
        p.associators_filtered(&c.ctx, &c.rslt, &c.path, &filter, names.as_deref(), &query)
    })
}

#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn references_filtered<P: AssociationProvider>(
    mi: *mut CMPIAssociationMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    op: *const CMPIObjectPath,
    result_class: *const c_char,
    role: *const c_char,
    properties: CMPIPropertyNames,
    filter_query: *const c_char,
    filter_query_language: *const c_char,
    continue_on_error: CMPIBoolean,
) -> CMPIStatus {
    invoke(mi, "referencesFiltered", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, op)?;
        let (result_class, role) = (opt_cstr(result_class), opt_cstr(role));
        let names = property_names(properties);
        let query = query_filter(filter_query, filter_query_language, continue_on_error);
        p.references_filtered(
            &c.ctx,
            &c.rslt,
            &c.path,
            result_class.as_deref(),
            role.as_deref(),
            names.as_deref(),
            &query,
        )
    })
}

impl<P: AssociationProvider> Tables<P> {
    pub(crate) const ASSOCIATION: &'static CMPIAssociationMIFT = &CMPIAssociationMIFT {
        ftVersion: CMPICurrentVersion,
        miVersion: CMPICurrentVersion,
        miName: P::NAME.as_ptr(),
        cleanup: cleanup::<P, CMPIAssociationMI>,
        associators: associators::<P>,
        associatorNames: associator_names::<P>,
        references: references::<P>,
        referenceNames: reference_names::<P>,
        associatorsFiltered: associators_filtered::<P>,
        referencesFiltered: references_filtered::<P>,
    };
}

// ============================================================================
// Method
// ============================================================================

unsafe extern "C" fn invoke_method<P: MethodProvider>(
    mi: *mut CMPIMethodMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    obj_path: *const CMPIObjectPath,
    method: *const c_char,
    in_args: *const CMPIArgs,
    out_args: *mut CMPIArgs,
) -> CMPIStatus {
    invoke(mi, "invokeMethod", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, obj_path)?;
        let method = required(method, "method name")?;
        let in_args = ArgsRef::from_raw(in_args, b)?;
        let out_args = ArgsRef::from_raw(out_args, b)?;
        p.invoke_method(&c.ctx, &c.rslt, &c.path, &method, &in_args, &out_args)
    })
}

impl<P: MethodProvider> Tables<P> {
    pub(crate) const METHOD: &'static CMPIMethodMIFT = &CMPIMethodMIFT {
        ftVersion: CMPICurrentVersion,
        miVersion: CMPICurrentVersion,
        miName: P::NAME.as_ptr(),
        cleanup: cleanup::<P, CMPIMethodMI>,
        invokeMethod: invoke_method::<P>,
    };
}

// ============================================================================
// Property
// ============================================================================

unsafe extern "C" fn set_property<P: PropertyProvider>(
    mi: *mut CMPIPropertyMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    op: *const CMPIObjectPath,
    name: *const c_char,
    data: CMPIData,
) -> CMPIStatus {
    invoke(mi, "setProperty", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, op)?;
        let name = required(name, "property name")?;
        let data = data_from_raw(&data)?;
        p.set_property(&c.ctx, &c.rslt, &c.path, &name, &data)
    })
}

unsafe extern "C" fn get_property<P: PropertyProvider>(
    mi: *mut CMPIPropertyMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    op: *const CMPIObjectPath,
    name: *const c_char,
) -> CMPIStatus {
    invoke(mi, "getProperty", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, op)?;
        let name = required(name, "property name")?;
        p.get_property(&c.ctx, &c.rslt, &c.path, &name)
    })
}

unsafe extern "C" fn set_property_with_origin<P: PropertyProvider>(
    mi: *mut CMPIPropertyMI,
    ctx: *const CMPIContext,
    rslt: *const CMPIResult,
    op: *const CMPIObjectPath,
    name: *const c_char,
    data: CMPIData,
    origin: *const c_char,
) -> CMPIStatus {
    invoke(mi, "setPropertyWithOrigin", |p: &P, b| {
        let c = Call::new(b, ctx, rslt, op)?;
        let name = required(name, "property name")?;
        let data = data_from_raw(&data)?;
        let origin = opt_cstr(origin);
        p.set_property_with_origin(&c.ctx, &c.rslt, &c.path, &name, &data, origin.as_deref())
    })
}

impl<P: PropertyProvider> Tables<P> {
    pub(crate) const PROPERTY: &'static CMPIPropertyMIFT = &CMPIPropertyMIFT {
        ftVersion: CMPICurrentVersion,
        miVersion: CMPICurrentVersion,
        miName: P::NAME.as_ptr(),
        cleanup: cleanup::<P, CMPIPropertyMI>,
        setProperty: set_property::<P>,
        getProperty: get_property::<P>,
        setPropertyWithOrigin: set_property_with_origin::<P>,
    };
}

// ============================================================================
// Indication
// ============================================================================

/// Arguments of the per-filter indication slots
struct FilterCall {
    ctx: ContextRef,
    filter: SelectExpRef,
    class_name: String,
    path: ObjectPathRef,
}

impl FilterCall {
    unsafe fn new(
        broker: BrokerHandle,
        ctx: *const CMPIContext,
        filter: *const CMPISelectExp,
        class_name: *const c_char,
        op: *const CMPIObjectPath,
    ) -> CmpiResult<Self> {
        Ok(Self {
            ctx: ContextRef::from_raw(ctx, broker)?,
            filter: SelectExpRef::from_raw(filter, broker)?,
            class_name: required(class_name, "class name")?,
            path: ObjectPathRef::from_raw(op, broker)?,
        })
    }
}

unsafe extern "C" fn authorize_filter<P: IndicationProvider>(
    mi: *mut CMPIIndicationMI,
    ctx: *const CMPIContext,
    filter: *const CMPISelectExp,
    class_name: *const c_char,
    op: *const CMPIObjectPath,
    owner: *const c_char,
) -> CMPIStatus {
    invoke(mi, "authorizeFilter", |p: &P, b| {
        let f = FilterCall::new(b, ctx, filter, class_name, op)?;
        let owner = opt_cstr(owner);
        p.authorize_filter(&f.ctx, &f.filter, &f.class_name, &f.path, owner.as_deref())
    })
}

unsafe extern "C" fn must_poll<P: IndicationProvider>(
    mi: *mut CMPIIndicationMI,
    ctx: *const CMPIContext,
    filter: *const CMPISelectExp,
    class_name: *const c_char,
    op: *const CMPIObjectPath,
) -> CMPIStatus {
    invoke(mi, "mustPoll", |p: &P, b| {
        let f = FilterCall::new(b, ctx, filter, class_name, op)?;
        p.must_poll(&f.ctx, &f.filter, &f.class_name, &f.path)
    })
}

unsafe extern "C" fn activate_filter<P: IndicationProvider>(
    mi: *mut CMPIIndicationMI,
    ctx: *const CMPIContext,
    filter: *const CMPISelectExp,
    class_name: *const c_char,
    op: *const CMPIObjectPath,
    first_activation: CMPIBoolean,
) -> CMPIStatus {
    invoke(mi, "activateFilter", |p: &P, b| {
        let f = FilterCall::new(b, ctx, filter, class_name, op)?;
        p.activate_filter(&f.ctx, &f.filter, &f.class_name, &f.path, first_activation != 0)
    })
}

unsafe extern "C" fn deactivate_filter<P: IndicationProvider>(
    mi: *mut CMPIIndicationMI,
    ctx: *const CMPIContext,
    filter: *const CMPISelectExp,
    class_name: *const c_char,
    op: *const CMPIObjectPath,
    last_activation: CMPIBoolean,
) -> CMPIStatus {
    invoke(mi, "deActivateFilter", |p: &P, b| {
        let f = FilterCall::new(b, ctx, filter, class_name, op)?;
        p.deactivate_filter(&f.ctx, &f.filter, &f.class_name, &f.path, last_activation != 0)
    })
}

unsafe extern "C" fn enable_indications<P: IndicationProvider>(
    mi: *mut CMPIIndicationMI,
    ctx: *const CMPIContext,
) -> CMPIStatus {
    invoke(mi, "enableIndications", |p: &P, b| p.enable_indications(&ContextRef::from_raw(ctx, b)?))
}

unsafe extern "C" fn disable_indications<P: IndicationProvider>(
    mi: *mut CMPIIndicationMI,
    ctx: *const CMPIContext,
) -> CMPIStatus {
    invoke(mi, "disableIndications", |p: &P, b| p.disable_indications(&ContextRef::from_raw(ctx, b)?))
}

unsafe extern "C" fn authorize_filter_collection<P: IndicationProvider>(
    mi: *mut CMPIIndicationMI,
    ctx: *const CMPIContext,
    coll_inst: *const CMPIInstance,
) -> CMPIStatus {
    invoke(mi, "authorizeFilterCollection", |p: &P, b| {
        let ctx = ContextRef::from_raw(ctx, b)?;
        p.authorize_filter_collection(&ctx, &InstanceRef::from_raw(coll_inst, b)?)
    })
}

unsafe extern "C" fn activate_filter_collection<P: IndicationProvider>(
    mi: *mut CMPIIndicationMI,
    ctx: *const CMPIContext,
    coll_inst: *const CMPIInstance,
    first_activation: CMPIBoolean,
) -> CMPIStatus {
    invoke(mi, "activateFilterCollection", |p: &P, b| {
        let ctx = ContextRef::from_raw(ctx, b)?;
        p.activate_filter_collection(&ctx, &InstanceRef::from_raw(coll_inst, b)?, first_activation != 0)
    })
}

unsafe extern "C" fn deactivate_filter_collection<P: IndicationProvider>(
    mi: *mut CMPIIndicationMI,
    ctx: *const CMPIContext,
    coll_inst: *const CMPIInstance,
    last_activation: CMPIBoolean,
) -> CMPIStatus {
    invoke(mi, "deActivateFilterCollection", |p: &P, b| {
        let ctx = ContextRef::from_raw(ctx, b)?;
        p.deactivate_filter_collection(&ctx, &InstanceRef::from_raw(coll_inst, b)?, last_activation != 0)
    })
}

impl<P: IndicationProvider> Tables<P> {
    pub(crate) const INDICATION: &'static CMPIIndicationMIFT = &CMPIIndicationMIFT {
        ftVersion: CMPICurrentVersion,
        miVersion: CMPICurrentVersion,
        miName: P::NAME.as_ptr(),
        cleanup: cleanup::<P, CMPIIndicationMI>,
        authorizeFilter: authorize_filter::<P>,
        mustPoll: must_poll::<P>,
        activateFilter: activate_filter::<P>,
        deActivateFilter: deactivate_filter::<P>,
        enableIndications: enable_indications::<P>,
        disableIndications: disable_indications::<P>,
        authorizeFilterCollection: authorize_filter_collection::<P>,
        activateFilterCollection: activate_filter_collection::<P>,
        deActivateFilterCollection: deactivate_filter_collection::<P>,
    };
}
