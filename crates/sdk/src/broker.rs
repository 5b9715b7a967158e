//! Broker envelope and service tables
//!
//! A provider receives a `*const CMPIBroker` from its factory call and keeps it
//! for its whole lifetime. The broker exposes four tables:
//! - `bft` - up-calls into the object model and thread registration
//! - `eft` - factories for encapsulated objects, logging, tracing, errors
//! - `xft` - OS encapsulation (threads, mutexes, conditions)
//! - `mft` - memory management of broker-allocated objects

use std::ffi::{c_char, c_int, c_uint, c_void};

use crate::encaps::*;
use crate::flags::{
    CMPICodepageID, CMPIErrorProbableCause, CMPIErrorSeverity, CMPILevel, CMPISeverity,
};
use crate::rc::CMPIrc;
use crate::types::{
    CMPIBoolean, CMPICount, CMPIData, CMPIGcStat, CMPIMsgFileHandle, CMPIStatus, CMPIType,
    CMPIUint32, CMPIUint64, CMPIValue, CMPIVersion,
};

/// The broker handle handed to every provider factory
#[repr(C)]
#[derive(Debug)]
pub struct CMPIBroker {
    pub hdl: *mut c_void,
    pub bft: *const CMPIBrokerFT,
    pub eft: *const CMPIBrokerEncFT,
    pub xft: *const CMPIBrokerExtFT,
    pub mft: *const CMPIBrokerMemFT,
}

/// NULL-terminated array of property names; null means "all properties"
pub type CMPIPropertyNames = *const *const c_char;

#[repr(C)]
pub struct CMPIBrokerFT {
    pub brokerCapabilities: c_uint,
    pub brokerVersion: CMPIVersion,
    pub brokerName: *const c_char,
    pub prepareAttachThread:
        unsafe extern "C" fn(mb: *const CMPIBroker, ctx: *const CMPIContext) -> *mut CMPIContext,
    pub attachThread:
        unsafe extern "C" fn(mb: *const CMPIBroker, ctx: *const CMPIContext) -> CMPIStatus,
    pub detachThread:
        unsafe extern "C" fn(mb: *const CMPIBroker, ctx: *const CMPIContext) -> CMPIStatus,
    pub deliverIndication: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        ns: *const c_char,
        ind: *const CMPIInstance,
    ) -> CMPIStatus,
    pub enumerateInstanceNames: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        class_path: *const CMPIObjectPath,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIEnumeration,
    pub getInstance: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        inst_path: *const CMPIObjectPath,
        properties: CMPIPropertyNames,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIInstance,
    pub createInstance: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        class_path: *const CMPIObjectPath,
        new_inst: *const CMPIInstance,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIObjectPath,
    pub modifyInstance: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        inst_path: *const CMPIObjectPath,
        mod_inst: *const CMPIInstance,
        properties: CMPIPropertyNames,
    ) -> CMPIStatus,
    pub deleteInstance: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        inst_path: *const CMPIObjectPath,
    ) -> CMPIStatus,
    pub execQuery: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        class_path: *const CMPIObjectPath,
        query: *const c_char,
        lang: *const c_char,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIEnumeration,
    pub enumerateInstances: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        class_path: *const CMPIObjectPath,
        properties: CMPIPropertyNames,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIEnumeration,
    pub associators: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        inst_path: *const CMPIObjectPath,
        assoc_class: *const c_char,
        result_class: *const c_char,
        role: *const c_char,
        result_role: *const c_char,
        properties: CMPIPropertyNames,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIEnumeration,
    pub associatorNames: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        inst_path: *const CMPIObjectPath,
        assoc_class: *const c_char,
        result_class: *const c_char,
        role: *const c_char,
        result_role: *const c_char,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIEnumeration,
    pub references: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        inst_path: *const CMPIObjectPath,
        result_class: *const c_char,
        role: *const c_char,
        properties: CMPIPropertyNames,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIEnumeration,
    pub referenceNames: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        inst_path: *const CMPIObjectPath,
        result_class: *const c_char,
        role: *const c_char,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIEnumeration,
    pub invokeMethod: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        obj_path: *const CMPIObjectPath,
        method: *const c_char,
        r#in: *const CMPIArgs,
        out: *mut CMPIArgs,
        rc: *mut CMPIStatus,
    ) -> CMPIData,
    pub setProperty: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        inst_path: *const CMPIObjectPath,
        name: *const c_char,
        value: *const CMPIValue,
        ty: CMPIType,
    ) -> CMPIStatus,
    pub getProperty: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        inst_path: *const CMPIObjectPath,
        name: *const c_char,
        rc: *mut CMPIStatus,
    ) -> CMPIData,
    pub enumerateInstancesFiltered: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        class_path: *const CMPIObjectPath,
        properties: CMPIPropertyNames,
        filter_query: *const c_char,
        filter_query_language: *const c_char,
        continue_on_error: CMPIBoolean,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIEnumeration,
    pub associatorsFiltered: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        inst_path: *const CMPIObjectPath,
        assoc_class: *const c_char,
        result_class: *const c_char,
        role: *const c_char,
        result_role: *const c_char,
        properties: CMPIPropertyNames,
        filter_query: *const c_char,
        filter_query_language: *const c_char,
        continue_on_error: CMPIBoolean,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIEnumeration,
    pub referencesFiltered: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ctx: *const CMPIContext,
        inst_path: *const CMPIObjectPath,
        result_class: *const c_char,
        role: *const c_char,
        properties: CMPIPropertyNames,
        filter_query: *const c_char,
        filter_query_language: *const c_char,
        continue_on_error: CMPIBoolean,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIEnumeration,
}

/// Variadic message lookup; `count` insert values follow as (type, value) pairs
pub type CMPIGetMessageFn = unsafe extern "C" fn(
    mb: *const CMPIBroker,
    msg_id: *const c_char,
    def_msg: *const c_char,
    rc: *mut CMPIStatus,
    count: CMPICount,
    ...
) -> *mut CMPIString;

/// Variadic message lookup against an opened message file
pub type CMPIGetMessage2Fn = unsafe extern "C" fn(
    mb: *const CMPIBroker,
    msg_id: *const c_char,
    msg_file_handle: CMPIMsgFileHandle,
    def_msg: *const c_char,
    rc: *mut CMPIStatus,
    count: CMPICount,
    ...
) -> *mut CMPIString;

#[repr(C)]
pub struct CMPIBrokerEncFT {
    pub ftVersion: CMPIVersion,
    pub newInstance: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        inst_path: *const CMPIObjectPath,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIInstance,
    pub newObjectPath: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        ns: *const c_char,
        cn: *const c_char,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIObjectPath,
    pub newArgs: unsafe extern "C" fn(mb: *const CMPIBroker, rc: *mut CMPIStatus) -> *mut CMPIArgs,
    pub newString: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        data: *const c_char,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIString,
    pub newArray: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        size: CMPICount,
        ty: CMPIType,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIArray,
    pub newDateTime:
        unsafe extern "C" fn(mb: *const CMPIBroker, rc: *mut CMPIStatus) -> *mut CMPIDateTime,
    pub newDateTimeFromBinary: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        bin_time: CMPIUint64,
        interval: CMPIBoolean,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIDateTime,
    pub newDateTimeFromChars: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        datetime: *const c_char,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIDateTime,
    pub newSelectExp: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        query: *const c_char,
        lang: *const c_char,
        projection: *mut *mut CMPIArray,
        rc: *mut CMPIStatus,
    ) -> *mut CMPISelectExp,
    pub classPathIsA: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        class_path: *const CMPIObjectPath,
        class_name: *const c_char,
        rc: *mut CMPIStatus,
    ) -> CMPIBoolean,
    pub toString: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        object: *const c_void,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIString,
    pub isOfType: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        object: *const c_void,
        ty: *const c_char,
        rc: *mut CMPIStatus,
    ) -> CMPIBoolean,
    pub getType: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        object: *const c_void,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIString,
    pub getMessage: CMPIGetMessageFn,
    pub logMessage: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        severity: CMPISeverity,
        id: *const c_char,
        text: *const c_char,
        string: *const CMPIString,
    ) -> CMPIStatus,
    pub trace: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        level: CMPILevel,
        component: *const c_char,
        text: *const c_char,
        string: *const CMPIString,
    ) -> CMPIStatus,
    pub newCMPIError: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        owner: *const c_char,
        msg_id: *const c_char,
        msg: *const c_char,
        sev: CMPIErrorSeverity,
        pc: CMPIErrorProbableCause,
        cim_status_code: CMPIrc,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIError,
    pub openMessageFile: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        msg_file: *const c_char,
        msg_file_handle: *mut CMPIMsgFileHandle,
    ) -> CMPIStatus,
    pub closeMessageFile:
        unsafe extern "C" fn(mb: *const CMPIBroker, msg_file_handle: CMPIMsgFileHandle) -> CMPIStatus,
    pub getMessage2: CMPIGetMessage2Fn,
    pub newPropertyList: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        properties: *const *const c_char,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIPropertyList,
    pub newStringCP: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        data: *const c_char,
        cpid: CMPICodepageID,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIString,
    pub newEnumerationFilter: unsafe extern "C" fn(
        mb: *const CMPIBroker,
        filter_query: *const c_char,
        filter_query_language: *const c_char,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIEnumerationFilter,
}

/// Thread handle used by the OS encapsulation table
pub type CMPI_THREAD_TYPE = *mut c_void;
/// Thread start routine return value
pub type CMPI_THREAD_RETURN = *mut c_void;
/// Thread-specific storage key
pub type CMPI_THREAD_KEY_TYPE = c_uint;
/// Opaque mutex handle
pub type CMPI_MUTEX_TYPE = *mut c_void;
/// Opaque condition variable handle
pub type CMPI_COND_TYPE = *mut c_void;

/// Absolute wait deadline for `timedCondWait`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CMPITimespec {
    pub tv_sec: i64,
    pub tv_nsec: i64,
}

#[repr(C)]
pub struct CMPIBrokerExtFT {
    pub ftVersion: CMPIVersion,
    pub resolveFileName: unsafe extern "C" fn(filename: *const c_char) -> *mut c_char,
    pub newThread: unsafe extern "C" fn(
        start: unsafe extern "C" fn(*mut c_void) -> CMPI_THREAD_RETURN,
        parm: *mut c_void,
        detached: c_int,
    ) -> CMPI_THREAD_TYPE,
    pub joinThread:
        unsafe extern "C" fn(thread: CMPI_THREAD_TYPE, retval: *mut CMPI_THREAD_RETURN) -> c_int,
    pub exitThread: unsafe extern "C" fn(return_code: CMPI_THREAD_RETURN) -> c_int,
    pub cancelThread: unsafe extern "C" fn(thread: CMPI_THREAD_TYPE) -> c_int,
    pub threadSleep: unsafe extern "C" fn(msec: CMPIUint32) -> c_int,
    pub threadOnce: unsafe extern "C" fn(once: *mut c_int, init: unsafe extern "C" fn()) -> c_int,
    pub createThreadKey: unsafe extern "C" fn(
        key: *mut CMPI_THREAD_KEY_TYPE,
        cleanup: Option<unsafe extern "C" fn(*mut c_void)>,
    ) -> c_int,
    pub destroyThreadKey: unsafe extern "C" fn(key: CMPI_THREAD_KEY_TYPE) -> c_int,
    pub getThreadSpecific: unsafe extern "C" fn(key: CMPI_THREAD_KEY_TYPE) -> *mut c_void,
    pub setThreadSpecific:
        unsafe extern "C" fn(key: CMPI_THREAD_KEY_TYPE, value: *mut c_void) -> c_int,
    pub newMutex: unsafe extern "C" fn(opt: c_int) -> CMPI_MUTEX_TYPE,
    pub destroyMutex: unsafe extern "C" fn(m: CMPI_MUTEX_TYPE),
    pub lockMutex: unsafe extern "C" fn(m: CMPI_MUTEX_TYPE),
    pub unlockMutex: unsafe extern "C" fn(m: CMPI_MUTEX_TYPE),
    pub newCondition: unsafe extern "C" fn(opt: c_int) -> CMPI_COND_TYPE,
    pub destroyCondition: unsafe extern "C" fn(c: CMPI_COND_TYPE),
    pub condWait: unsafe extern "C" fn(c: CMPI_COND_TYPE, m: CMPI_MUTEX_TYPE) -> c_int,
    pub timedCondWait: unsafe extern "C" fn(
        c: CMPI_COND_TYPE,
        m: CMPI_MUTEX_TYPE,
        wait: *mut CMPITimespec,
    ) -> c_int,
    pub signalCondition: unsafe extern "C" fn(c: CMPI_COND_TYPE) -> c_int,
}

#[repr(C)]
pub struct CMPIBrokerMemFT {
    pub ftVersion: CMPIVersion,
    pub mark: unsafe extern "C" fn(mb: *const CMPIBroker, rc: *mut CMPIStatus) -> *mut CMPIGcStat,
    pub release: unsafe extern "C" fn(mb: *const CMPIBroker, gc: *const CMPIGcStat) -> CMPIStatus,
    pub cmpiMalloc: unsafe extern "C" fn(mb: *const CMPIBroker, size: usize) -> *mut c_void,
    pub cmpiCalloc:
        unsafe extern "C" fn(mb: *const CMPIBroker, n_elems: usize, size_elem: usize) -> *mut c_void,
    pub cmpiRealloc:
        unsafe extern "C" fn(mb: *const CMPIBroker, ptr: *mut c_void, size: usize) -> *mut c_void,
    pub cmpiStrDup: unsafe extern "C" fn(mb: *const CMPIBroker, s: *const c_char) -> *mut c_char,
    pub cmpiFree: unsafe extern "C" fn(mb: *const CMPIBroker, ptr: *mut c_void),
    pub freeInstance: unsafe extern "C" fn(mb: *const CMPIBroker, inst: *mut CMPIInstance),
    pub freeObjectPath: unsafe extern "C" fn(mb: *const CMPIBroker, obj: *mut CMPIObjectPath),
    pub freeArgs: unsafe extern "C" fn(mb: *const CMPIBroker, args: *mut CMPIArgs),
    pub freeString: unsafe extern "C" fn(mb: *const CMPIBroker, s: *mut CMPIString),
    pub freeArray: unsafe extern "C" fn(mb: *const CMPIBroker, array: *mut CMPIArray),
    pub freeDateTime: unsafe extern "C" fn(mb: *const CMPIBroker, dt: *mut CMPIDateTime),
    pub freeSelectExp: unsafe extern "C" fn(mb: *const CMPIBroker, se: *mut CMPISelectExp),
    pub freeChars: unsafe extern "C" fn(mb: *const CMPIBroker, chars: *mut c_char),
}

#[cfg(test)]
mod tests {
    use std::mem::{offset_of, size_of};

    use super::*;

    const PTR: usize = size_of::<usize>();

    #[test]
    fn test_broker_layout() {
        assert_eq!(size_of::<CMPIBroker>(), 5 * PTR);
        assert_eq!(offset_of!(CMPIBroker, mft), 4 * PTR);
        assert_eq!(offset_of!(CMPIBrokerFT, brokerName), size_of::<c_uint>() + size_of::<CMPIVersion>());
    }

    #[test]
    fn test_table_slot_order() {
        assert_slots!(
            CMPIBrokerFT,
            [brokerName, prepareAttachThread, attachThread, detachThread, deliverIndication,
                enumerateInstanceNames, getInstance, createInstance, modifyInstance,
                deleteInstance, execQuery, enumerateInstances, associators, associatorNames,
                references, referenceNames, invokeMethod, setProperty, getProperty,
                enumerateInstancesFiltered, associatorsFiltered, referencesFiltered]
        );
        assert_eq!(offset_of!(CMPIBrokerEncFT, newInstance), PTR);
        assert_slots!(
            CMPIBrokerEncFT,
            [newInstance, newObjectPath, newArgs, newString, newArray, newDateTime,
                newDateTimeFromBinary, newDateTimeFromChars, newSelectExp, classPathIsA, toString,
                isOfType, getType, getMessage, logMessage, trace, newCMPIError, openMessageFile,
                closeMessageFile, getMessage2, newPropertyList, newStringCP, newEnumerationFilter]
        );
        assert_eq!(offset_of!(CMPIBrokerExtFT, resolveFileName), PTR);
        assert_slots!(
            CMPIBrokerExtFT,
            [resolveFileName, newThread, joinThread, exitThread, cancelThread, threadSleep,
                threadOnce, createThreadKey, destroyThreadKey, getThreadSpecific,
                setThreadSpecific, newMutex, destroyMutex, lockMutex, unlockMutex, newCondition,
                destroyCondition, condWait, timedCondWait, signalCondition]
        );
        assert_eq!(offset_of!(CMPIBrokerMemFT, mark), PTR);
        assert_slots!(
            CMPIBrokerMemFT,
            [mark, release, cmpiMalloc, cmpiCalloc, cmpiRealloc, cmpiStrDup, cmpiFree,
                freeInstance, freeObjectPath, freeArgs, freeString, freeArray, freeDateTime,
                freeSelectExp, freeChars]
        );
    }
}
