//! Provider (management instrumentation) envelopes, tables and factories
//!
//! Each provider kind has its own MI envelope and table. The first three
//! fields of every MI table are `ftVersion`, `miVersion` and `miName`; the
//! operations follow in the fixed order the broker calls them by.

use std::ffi::{c_char, c_void};

use crate::broker::{CMPIBroker, CMPIPropertyNames};
use crate::encaps::*;
use crate::types::{CMPIBoolean, CMPIData, CMPIStatus, CMPIVersion};

macro_rules! mi_envelope {
    ($(#[$meta:meta])* $name:ident, $ft:ident) => {
        $(#[$meta])*
        #[repr(C)]
        #[derive(Debug)]
        pub struct $name {
            /// Provider private state
            pub hdl: *mut c_void,
            /// Provider function table
            pub ft: *const $ft,
        }
    };
}

mi_envelope!(
    /// Instance provider handle
    CMPIInstanceMI,
    CMPIInstanceMIFT
);
mi_envelope!(
    /// Association provider handle
    CMPIAssociationMI,
    CMPIAssociationMIFT
);
mi_envelope!(
    /// Method provider handle
    CMPIMethodMI,
    CMPIMethodMIFT
);
mi_envelope!(
    /// Property provider handle
    CMPIPropertyMI,
    CMPIPropertyMIFT
);
mi_envelope!(
    /// Indication provider handle
    CMPIIndicationMI,
    CMPIIndicationMIFT
);

#[repr(C)]
pub struct CMPIInstanceMIFT {
    pub ftVersion: CMPIVersion,
    pub miVersion: CMPIVersion,
    pub miName: *const c_char,
    pub cleanup: unsafe extern "C" fn(
        mi: *mut CMPIInstanceMI,
        ctx: *const CMPIContext,
        terminating: CMPIBoolean,
    ) -> CMPIStatus,
    pub enumerateInstanceNames: unsafe extern "C" fn(
        mi: *mut CMPIInstanceMI,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        class_path: *const CMPIObjectPath,
    ) -> CMPIStatus,
    pub enumerateInstances: unsafe extern "C" fn(
        mi: *mut CMPIInstanceMI,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        class_path: *const CMPIObjectPath,
        properties: CMPIPropertyNames,
    ) -> CMPIStatus,
    pub getInstance: unsafe extern "C" fn(
        mi: *mut CMPIInstanceMI,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        inst_path: *const CMPIObjectPath,
        properties: CMPIPropertyNames,
    ) -> CMPIStatus,
    pub createInstance: unsafe extern "C" fn(
        mi: *mut CMPIInstanceMI,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        class_path: *const CMPIObjectPath,
        inst: *const CMPIInstance,
    ) -> CMPIStatus,
    pub modifyInstance: unsafe extern "C" fn(
        mi: *mut CMPIInstanceMI,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        inst_path: *const CMPIObjectPath,
        mod_inst: *const CMPIInstance,
        properties: CMPIPropertyNames,
    ) -> CMPIStatus,
    pub deleteInstance: unsafe extern "C" fn(
        mi: *mut CMPIInstanceMI,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        inst_path: *const CMPIObjectPath,
    ) -> CMPIStatus,
    pub execQuery: unsafe extern "C" fn(
        mi: *mut CMPIInstanceMI,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        class_path: *const CMPIObjectPath,
        query: *const c_char,
        lang: *const c_char,
    ) -> CMPIStatus,
    pub enumerateInstancesFiltered: unsafe extern "C" fn(
        mi: *mut CMPIInstanceMI,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        class_path: *const CMPIObjectPath,
        properties: CMPIPropertyNames,
        filter_query: *const c_char,
        filter_query_language: *const c_char,
        continue_on_error: CMPIBoolean,
    ) -> CMPIStatus,
}

#[repr(C)]
pub struct CMPIAssociationMIFT {
    pub ftVersion: CMPIVersion,
    pub miVersion: CMPIVersion,
    pub miName: *const c_char,
    pub cleanup: unsafe extern "C" fn(
        mi: *mut CMPIAssociationMI,
        ctx: *const CMPIContext,
        terminating: CMPIBoolean,
    ) -> CMPIStatus,
    pub associators: unsafe extern "C" fn(
        mi: *mut CMPIAssociationMI,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        op: *const CMPIObjectPath,
        assoc_class: *const c_char,
        result_class: *const c_char,
        role: *const c_char,
        result_role: *const c_char,
        properties: CMPIPropertyNames,
    ) -> CMPIStatus,
    pub associatorNames: unsafe extern "C" fn(
        mi: *mut CMPIAssociationMI,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        op: *const CMPIObjectPath,
        assoc_class: *const c_char,
        result_class: *const c_char,
        role: *const c_char,
        result_role: *const c_char,
    ) -> CMPIStatus,
    pub references: unsafe extern "C" fn(
        mi: *mut CMPIAssociationMI,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        op: *const CMPIObjectPath,
        result_class: *const c_char,
        role: *const c_char,
        properties: CMPIPropertyNames,
    ) -> CMPIStatus,
    pub referenceNames: unsafe extern "C" fn(
        mi: *mut CMPIAssociationMI,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        op: *const CMPIObjectPath,
        result_class: *const c_char,
        role: *const c_char,
    ) -> CMPIStatus,
    pub associatorsFiltered: unsafe extern "C" fn(
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
    ) -> CMPIStatus,
    pub referencesFiltered: unsafe extern "C" fn(
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
    ) -> CMPIStatus,
}

#[repr(C)]
pub struct CMPIMethodMIFT {
    pub ftVersion: CMPIVersion,
    pub miVersion: CMPIVersion,
    pub miName: *const c_char,
    pub cleanup: unsafe extern "C" fn(
        mi: *mut CMPIMethodMI,
        ctx: *const CMPIContext,
        terminating: CMPIBoolean,
    ) -> CMPIStatus,
    pub invokeMethod: unsafe extern "C" fn(
        mi: *mut CMPIMethodMI,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        obj_path: *const CMPIObjectPath,
        method: *const c_char,
        r#in: *const CMPIArgs,
        out: *mut CMPIArgs,
    ) -> CMPIStatus,
}

#[repr(C)]
pub struct CMPIPropertyMIFT {
    pub ftVersion: CMPIVersion,
    pub miVersion: CMPIVersion,
    pub miName: *const c_char,
    pub cleanup: unsafe extern "C" fn(
        mi: *mut CMPIPropertyMI,
        ctx: *const CMPIContext,
        terminating: CMPIBoolean,
    ) -> CMPIStatus,
    pub setProperty: unsafe extern "C" fn(
        mi: *mut CMPIPropertyMI,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        op: *const CMPIObjectPath,
        name: *const c_char,
        data: CMPIData,
    ) -> CMPIStatus,
    pub getProperty: unsafe extern "C" fn(
        mi: *mut CMPIPropertyMI,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        op: *const CMPIObjectPath,
        name: *const c_char,
    ) -> CMPIStatus,
    pub setPropertyWithOrigin: unsafe extern "C" fn(
        mi: *mut CMPIPropertyMI,
        ctx: *const CMPIContext,
        rslt: *const CMPIResult,
        op: *const CMPIObjectPath,
        name: *const c_char,
        data: CMPIData,
        origin: *const c_char,
    ) -> CMPIStatus,
}

#[repr(C)]
pub struct CMPIIndicationMIFT {
    pub ftVersion: CMPIVersion,
    pub miVersion: CMPIVersion,
    pub miName: *const c_char,
    pub cleanup: unsafe extern "C" fn(
        mi: *mut CMPIIndicationMI,
        ctx: *const CMPIContext,
        terminating: CMPIBoolean,
    ) -> CMPIStatus,
    pub authorizeFilter: unsafe extern "C" fn(
        mi: *mut CMPIIndicationMI,
        ctx: *const CMPIContext,
        filter: *const CMPISelectExp,
        class_name: *const c_char,
        op: *const CMPIObjectPath,
        owner: *const c_char,
    ) -> CMPIStatus,
    pub mustPoll: unsafe extern "C" fn(
        mi: *mut CMPIIndicationMI,
        ctx: *const CMPIContext,
        filter: *const CMPISelectExp,
        class_name: *const c_char,
        op: *const CMPIObjectPath,
    ) -> CMPIStatus,
    pub activateFilter: unsafe extern "C" fn(
        mi: *mut CMPIIndicationMI,
        ctx: *const CMPIContext,
        filter: *const CMPISelectExp,
        class_name: *const c_char,
        op: *const CMPIObjectPath,
        first_activation: CMPIBoolean,
    ) -> CMPIStatus,
    pub deActivateFilter: unsafe extern "C" fn(
        mi: *mut CMPIIndicationMI,
        ctx: *const CMPIContext,
        filter: *const CMPISelectExp,
        class_name: *const c_char,
        op: *const CMPIObjectPath,
        last_activation: CMPIBoolean,
    ) -> CMPIStatus,
    pub enableIndications:
        unsafe extern "C" fn(mi: *mut CMPIIndicationMI, ctx: *const CMPIContext) -> CMPIStatus,
    pub disableIndications:
        unsafe extern "C" fn(mi: *mut CMPIIndicationMI, ctx: *const CMPIContext) -> CMPIStatus,
    pub authorizeFilterCollection: unsafe extern "C" fn(
        mi: *mut CMPIIndicationMI,
        ctx: *const CMPIContext,
        coll_inst: *const CMPIInstance,
    ) -> CMPIStatus,
    pub activateFilterCollection: unsafe extern "C" fn(
        mi: *mut CMPIIndicationMI,
        ctx: *const CMPIContext,
        coll_inst: *const CMPIInstance,
        first_activation: CMPIBoolean,
    ) -> CMPIStatus,
    pub deActivateFilterCollection: unsafe extern "C" fn(
        mi: *mut CMPIIndicationMI,
        ctx: *const CMPIContext,
        coll_inst: *const CMPIInstance,
        last_activation: CMPIBoolean,
    ) -> CMPIStatus,
}

// SAFETY: MI tables are immutable once built; `miName` points at a static
// or provider-owned string that outlives the table.
unsafe impl Sync for CMPIInstanceMIFT {}
unsafe impl Sync for CMPIAssociationMIFT {}
unsafe impl Sync for CMPIMethodMIFT {}
unsafe impl Sync for CMPIPropertyMIFT {}
unsafe impl Sync for CMPIIndicationMIFT {}

// ============================================================================
// Factory entry points
// ============================================================================

/// `<name>_Create_InstanceMI`
pub type CMPIInstanceMIFactory = unsafe extern "C" fn(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    rc: *mut CMPIStatus,
) -> *mut CMPIInstanceMI;
/// `<name>_Create_AssociationMI`
pub type CMPIAssociationMIFactory = unsafe extern "C" fn(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    rc: *mut CMPIStatus,
) -> *mut CMPIAssociationMI;
/// `<name>_Create_MethodMI`
pub type CMPIMethodMIFactory = unsafe extern "C" fn(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    rc: *mut CMPIStatus,
) -> *mut CMPIMethodMI;
/// `<name>_Create_PropertyMI`
pub type CMPIPropertyMIFactory = unsafe extern "C" fn(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    rc: *mut CMPIStatus,
) -> *mut CMPIPropertyMI;
/// `<name>_Create_IndicationMI`
pub type CMPIIndicationMIFactory = unsafe extern "C" fn(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    rc: *mut CMPIStatus,
) -> *mut CMPIIndicationMI;

/// `_Generic_Create_<Kind>MI`: one entry point serving several provider names
///
/// The returned pointer is the kind's MI envelope.
pub type CMPIGenericMIFactory = unsafe extern "C" fn(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    provider_name: *const c_char,
    rc: *mut CMPIStatus,
) -> *mut c_void;

/// Kind-erased factory signature; every `<name>_Create_<Kind>MI` matches it
/// up to the pointee type of the returned envelope.
pub type CMPIMIFactory = unsafe extern "C" fn(
    mb: *const CMPIBroker,
    ctx: *const CMPIContext,
    rc: *mut CMPIStatus,
) -> *mut c_void;

#[cfg(test)]
mod tests {
    use std::mem::{offset_of, size_of};

    use super::*;

    const PTR: usize = size_of::<usize>();

    #[test]
    fn test_envelope_layout() {
        for size in [
            size_of::<CMPIInstanceMI>(),
            size_of::<CMPIAssociationMI>(),
            size_of::<CMPIMethodMI>(),
            size_of::<CMPIPropertyMI>(),
            size_of::<CMPIIndicationMI>(),
        ] {
            assert_eq!(size, 2 * PTR);
        }
        assert_eq!(offset_of!(CMPIInstanceMI, ft), PTR);
    }

    #[test]
    fn test_table_headers() {
        let name_at = 2 * size_of::<CMPIVersion>();
        assert_eq!(offset_of!(CMPIInstanceMIFT, miName), name_at);
        assert_eq!(offset_of!(CMPIAssociationMIFT, miName), name_at);
        assert_eq!(offset_of!(CMPIMethodMIFT, miName), name_at);
        assert_eq!(offset_of!(CMPIPropertyMIFT, miName), name_at);
        assert_eq!(offset_of!(CMPIIndicationMIFT, miName), name_at);
        assert_eq!(offset_of!(CMPIInstanceMIFT, cleanup), name_at + PTR);
        assert_eq!(offset_of!(CMPIIndicationMIFT, cleanup), name_at + PTR);
    }

    #[test]
    fn test_table_slot_order() {
        assert_slots!(
            CMPIInstanceMIFT,
            [miName, cleanup, enumerateInstanceNames, enumerateInstances, getInstance,
                createInstance, modifyInstance, deleteInstance, execQuery,
                enumerateInstancesFiltered]
        );
        assert_slots!(
            CMPIAssociationMIFT,
            [miName, cleanup, associators, associatorNames, references, referenceNames,
                associatorsFiltered, referencesFiltered]
        );
        assert_slots!(
            CMPIMethodMIFT,
            [miName, cleanup, invokeMethod]
        );
        assert_slots!(
            CMPIPropertyMIFT,
            [miName, cleanup, setProperty, getProperty, setPropertyWithOrigin]
        );
        assert_slots!(
            CMPIIndicationMIFT,
            [miName, cleanup, authorizeFilter, mustPoll, activateFilter, deActivateFilter,
                enableIndications, disableIndications, authorizeFilterCollection,
                activateFilterCollection, deActivateFilterCollection]
        );
    }
}
