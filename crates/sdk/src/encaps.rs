//! Encapsulated data types
//!
//! Every encapsulated type is an envelope holding a private implementation
//! pointer (`hdl`) and a pointer to a function table shared by every object of
//! that type. All behavior is reached as `(*(*h).ft).op(h, ...)`.
//!
//! `ftVersion` is the first field of every table; slots after it are in the
//! exact CMPI 2.1 order.

use std::ffi::{c_char, c_int, c_void};

use crate::flags::{
    CMPICodepageID, CMPIErrorProbableCause, CMPIErrorSeverity, CMPIErrorSrcFormat, CMPIErrorType,
    CMPIPredOp,
};
use crate::rc::CMPIrc;
use crate::types::{
    CMPIAccessor, CMPIBoolean, CMPICount, CMPIData, CMPIStatus, CMPIType, CMPIUint64, CMPIValue,
    CMPIVersion,
};

macro_rules! envelope {
    ($(#[$meta:meta])* $name:ident, $ft:ident) => {
        $(#[$meta])*
        #[repr(C)]
        #[derive(Debug)]
        pub struct $name {
            /// Implementation private data
            pub hdl: *mut c_void,
            /// Shared function table
            pub ft: *const $ft,
        }
    };
}

envelope!(
    /// Per-call named bag of invocation metadata
    CMPIContext,
    CMPIContextFT
);
envelope!(
    /// Sink a provider returns its results into
    CMPIResult,
    CMPIResultFT
);
envelope!(
    /// Broker-managed string
    CMPIString,
    CMPIStringFT
);
envelope!(
    /// Fixed-size array of one element type
    CMPIArray,
    CMPIArrayFT
);
envelope!(
    /// Cursor over a sequence of values
    CMPIEnumeration,
    CMPIEnumerationFT
);
envelope!(
    /// CIM instance data
    CMPIInstance,
    CMPIInstanceFT
);
envelope!(
    /// Identity of a class or instance
    CMPIObjectPath,
    CMPIObjectPathFT
);
envelope!(
    /// Named method arguments
    CMPIArgs,
    CMPIArgsFT
);
envelope!(
    /// CIM point in time or interval
    CMPIDateTime,
    CMPIDateTimeFT
);
envelope!(
    /// Parsed query expression
    CMPISelectExp,
    CMPISelectExpFT
);
envelope!(
    /// Normalized query condition (DOC or COD)
    CMPISelectCond,
    CMPISelectCondFT
);
envelope!(
    /// One conjunction or disjunction of a condition
    CMPISubCond,
    CMPISubCondFT
);
envelope!(
    /// Single comparison `lhs op rhs`
    CMPIPredicate,
    CMPIPredicateFT
);
envelope!(
    /// Structured extended error
    CMPIError,
    CMPIErrorFT
);
envelope!(
    /// Property name filter
    CMPIPropertyList,
    CMPIPropertyListFT
);
envelope!(
    /// Query filter for filtered enumerations
    CMPIEnumerationFilter,
    CMPIEnumerationFilterFT
);

// ============================================================================
// Function tables
// ============================================================================

#[repr(C)]
pub struct CMPIContextFT {
    pub ftVersion: CMPIVersion,
    pub release: unsafe extern "C" fn(ctx: *mut CMPIContext) -> CMPIStatus,
    pub clone: unsafe extern "C" fn(ctx: *const CMPIContext, rc: *mut CMPIStatus) -> *mut CMPIContext,
    pub getEntry: unsafe extern "C" fn(
        ctx: *const CMPIContext,
        name: *const c_char,
        rc: *mut CMPIStatus,
    ) -> CMPIData,
    pub getEntryAt: unsafe extern "C" fn(
        ctx: *const CMPIContext,
        index: CMPICount,
        name: *mut *mut CMPIString,
        rc: *mut CMPIStatus,
    ) -> CMPIData,
    pub getEntryCount: unsafe extern "C" fn(ctx: *const CMPIContext, rc: *mut CMPIStatus) -> CMPICount,
    pub addEntry: unsafe extern "C" fn(
        ctx: *const CMPIContext,
        name: *const c_char,
        value: *const CMPIValue,
        ty: CMPIType,
    ) -> CMPIStatus,
}

#[repr(C)]
pub struct CMPIResultFT {
    pub ftVersion: CMPIVersion,
    pub release: unsafe extern "C" fn(rslt: *mut CMPIResult) -> CMPIStatus,
    pub clone: unsafe extern "C" fn(rslt: *const CMPIResult, rc: *mut CMPIStatus) -> *mut CMPIResult,
    pub returnData: unsafe extern "C" fn(
        rslt: *const CMPIResult,
        value: *const CMPIValue,
        ty: CMPIType,
    ) -> CMPIStatus,
    pub returnInstance:
        unsafe extern "C" fn(rslt: *const CMPIResult, inst: *const CMPIInstance) -> CMPIStatus,
    pub returnObjectPath:
        unsafe extern "C" fn(rslt: *const CMPIResult, op: *const CMPIObjectPath) -> CMPIStatus,
    pub returnDone: unsafe extern "C" fn(rslt: *const CMPIResult) -> CMPIStatus,
    pub returnError: unsafe extern "C" fn(rslt: *const CMPIResult, er: *const CMPIError) -> CMPIStatus,
}

#[repr(C)]
pub struct CMPIStringFT {
    pub ftVersion: CMPIVersion,
    pub release: unsafe extern "C" fn(st: *mut CMPIString) -> CMPIStatus,
    pub clone: unsafe extern "C" fn(st: *const CMPIString, rc: *mut CMPIStatus) -> *mut CMPIString,
    pub getCharPtr: unsafe extern "C" fn(st: *const CMPIString, rc: *mut CMPIStatus) -> *const c_char,
    pub newCharsCP: unsafe extern "C" fn(
        st: *const CMPIString,
        cpid: CMPICodepageID,
        rc: *mut CMPIStatus,
    ) -> *mut c_char,
}

#[repr(C)]
pub struct CMPIArrayFT {
    pub ftVersion: CMPIVersion,
    pub release: unsafe extern "C" fn(ar: *mut CMPIArray) -> CMPIStatus,
    pub clone: unsafe extern "C" fn(ar: *const CMPIArray, rc: *mut CMPIStatus) -> *mut CMPIArray,
    pub getSize: unsafe extern "C" fn(ar: *const CMPIArray, rc: *mut CMPIStatus) -> CMPICount,
    pub getSimpleType: unsafe extern "C" fn(ar: *const CMPIArray, rc: *mut CMPIStatus) -> CMPIType,
    pub getElementAt:
        unsafe extern "C" fn(ar: *const CMPIArray, index: CMPICount, rc: *mut CMPIStatus) -> CMPIData,
    pub setElementAt: unsafe extern "C" fn(
        ar: *const CMPIArray,
        index: CMPICount,
        value: *const CMPIValue,
        ty: CMPIType,
    ) -> CMPIStatus,
}

#[repr(C)]
pub struct CMPIEnumerationFT {
    pub ftVersion: CMPIVersion,
    pub release: unsafe extern "C" fn(en: *mut CMPIEnumeration) -> CMPIStatus,
    pub clone: unsafe extern "C" fn(
        en: *const CMPIEnumeration,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIEnumeration,
    pub getNext: unsafe extern "C" fn(en: *const CMPIEnumeration, rc: *mut CMPIStatus) -> CMPIData,
    pub hasNext: unsafe extern "C" fn(en: *const CMPIEnumeration, rc: *mut CMPIStatus) -> CMPIBoolean,
    pub toArray:
        unsafe extern "C" fn(en: *const CMPIEnumeration, rc: *mut CMPIStatus) -> *mut CMPIArray,
}

#[repr(C)]
pub struct CMPIInstanceFT {
    pub ftVersion: CMPIVersion,
    pub release: unsafe extern "C" fn(inst: *mut CMPIInstance) -> CMPIStatus,
    pub clone:
        unsafe extern "C" fn(inst: *const CMPIInstance, rc: *mut CMPIStatus) -> *mut CMPIInstance,
    pub getProperty: unsafe extern "C" fn(
        inst: *const CMPIInstance,
        name: *const c_char,
        rc: *mut CMPIStatus,
    ) -> CMPIData,
    pub getPropertyAt: unsafe extern "C" fn(
        inst: *const CMPIInstance,
        index: CMPICount,
        name: *mut *mut CMPIString,
        rc: *mut CMPIStatus,
    ) -> CMPIData,
    pub getPropertyCount:
        unsafe extern "C" fn(inst: *const CMPIInstance, rc: *mut CMPIStatus) -> CMPICount,
    pub setProperty: unsafe extern "C" fn(
        inst: *const CMPIInstance,
        name: *const c_char,
        value: *const CMPIValue,
        ty: CMPIType,
    ) -> CMPIStatus,
    pub getObjectPath:
        unsafe extern "C" fn(inst: *const CMPIInstance, rc: *mut CMPIStatus) -> *mut CMPIObjectPath,
    pub setPropertyFilter: unsafe extern "C" fn(
        inst: *const CMPIInstance,
        property_list: *const *const c_char,
        keys: *const *const c_char,
    ) -> CMPIStatus,
    pub setObjectPath:
        unsafe extern "C" fn(inst: *const CMPIInstance, op: *const CMPIObjectPath) -> CMPIStatus,
    pub setPropertyWithOrigin: unsafe extern "C" fn(
        inst: *const CMPIInstance,
        name: *const c_char,
        value: *const CMPIValue,
        ty: CMPIType,
        origin: *const c_char,
    ) -> CMPIStatus,
}

#[repr(C)]
pub struct CMPIObjectPathFT {
    pub ftVersion: CMPIVersion,
    pub release: unsafe extern "C" fn(op: *mut CMPIObjectPath) -> CMPIStatus,
    pub clone:
        unsafe extern "C" fn(op: *const CMPIObjectPath, rc: *mut CMPIStatus) -> *mut CMPIObjectPath,
    pub setNameSpace:
        unsafe extern "C" fn(op: *const CMPIObjectPath, ns: *const c_char) -> CMPIStatus,
    pub getNameSpace:
        unsafe extern "C" fn(op: *const CMPIObjectPath, rc: *mut CMPIStatus) -> *mut CMPIString,
    pub setHostname:
        unsafe extern "C" fn(op: *const CMPIObjectPath, hn: *const c_char) -> CMPIStatus,
    pub getHostname:
        unsafe extern "C" fn(op: *const CMPIObjectPath, rc: *mut CMPIStatus) -> *mut CMPIString,
    pub setClassName:
        unsafe extern "C" fn(op: *const CMPIObjectPath, cn: *const c_char) -> CMPIStatus,
    pub getClassName:
        unsafe extern "C" fn(op: *const CMPIObjectPath, rc: *mut CMPIStatus) -> *mut CMPIString,
    pub addKey: unsafe extern "C" fn(
        op: *const CMPIObjectPath,
        name: *const c_char,
        value: *const CMPIValue,
        ty: CMPIType,
    ) -> CMPIStatus,
    pub getKey: unsafe extern "C" fn(
        op: *const CMPIObjectPath,
        name: *const c_char,
        rc: *mut CMPIStatus,
    ) -> CMPIData,
    pub getKeyAt: unsafe extern "C" fn(
        op: *const CMPIObjectPath,
        index: CMPICount,
        name: *mut *mut CMPIString,
        rc: *mut CMPIStatus,
    ) -> CMPIData,
    pub getKeyCount: unsafe extern "C" fn(op: *const CMPIObjectPath, rc: *mut CMPIStatus) -> CMPICount,
    pub setNameSpaceFromObjectPath:
        unsafe extern "C" fn(op: *const CMPIObjectPath, src: *const CMPIObjectPath) -> CMPIStatus,
    pub setHostAndNameSpaceFromObjectPath:
        unsafe extern "C" fn(op: *const CMPIObjectPath, src: *const CMPIObjectPath) -> CMPIStatus,
    pub getClassQualifier: unsafe extern "C" fn(
        op: *const CMPIObjectPath,
        q_name: *const c_char,
        rc: *mut CMPIStatus,
    ) -> CMPIData,
    pub getPropertyQualifier: unsafe extern "C" fn(
        op: *const CMPIObjectPath,
        p_name: *const c_char,
        q_name: *const c_char,
        rc: *mut CMPIStatus,
    ) -> CMPIData,
    pub getMethodQualifier: unsafe extern "C" fn(
        op: *const CMPIObjectPath,
        method_name: *const c_char,
        q_name: *const c_char,
        rc: *mut CMPIStatus,
    ) -> CMPIData,
    pub getParameterQualifier: unsafe extern "C" fn(
        op: *const CMPIObjectPath,
        m_name: *const c_char,
        p_name: *const c_char,
        q_name: *const c_char,
        rc: *mut CMPIStatus,
    ) -> CMPIData,
    pub toString:
        unsafe extern "C" fn(op: *const CMPIObjectPath, rc: *mut CMPIStatus) -> *mut CMPIString,
}

#[repr(C)]
pub struct CMPIArgsFT {
    pub ftVersion: CMPIVersion,
    pub release: unsafe extern "C" fn(args: *mut CMPIArgs) -> CMPIStatus,
    pub clone: unsafe extern "C" fn(args: *const CMPIArgs, rc: *mut CMPIStatus) -> *mut CMPIArgs,
    pub addArg: unsafe extern "C" fn(
        args: *const CMPIArgs,
        name: *const c_char,
        value: *const CMPIValue,
        ty: CMPIType,
    ) -> CMPIStatus,
    pub getArg: unsafe extern "C" fn(
        args: *const CMPIArgs,
        name: *const c_char,
        rc: *mut CMPIStatus,
    ) -> CMPIData,
    pub getArgAt: unsafe extern "C" fn(
        args: *const CMPIArgs,
        index: CMPICount,
        name: *mut *mut CMPIString,
        rc: *mut CMPIStatus,
    ) -> CMPIData,
    pub getArgCount: unsafe extern "C" fn(args: *const CMPIArgs, rc: *mut CMPIStatus) -> CMPICount,
}

#[repr(C)]
pub struct CMPIDateTimeFT {
    pub ftVersion: CMPIVersion,
    pub release: unsafe extern "C" fn(dt: *mut CMPIDateTime) -> CMPIStatus,
    pub clone:
        unsafe extern "C" fn(dt: *const CMPIDateTime, rc: *mut CMPIStatus) -> *mut CMPIDateTime,
    pub getBinaryFormat:
        unsafe extern "C" fn(dt: *const CMPIDateTime, rc: *mut CMPIStatus) -> CMPIUint64,
    pub getStringFormat:
        unsafe extern "C" fn(dt: *const CMPIDateTime, rc: *mut CMPIStatus) -> *mut CMPIString,
    pub isInterval: unsafe extern "C" fn(dt: *const CMPIDateTime, rc: *mut CMPIStatus) -> CMPIBoolean,
}

#[repr(C)]
pub struct CMPISelectExpFT {
    pub ftVersion: CMPIVersion,
    pub release: unsafe extern "C" fn(se: *mut CMPISelectExp) -> CMPIStatus,
    pub clone:
        unsafe extern "C" fn(se: *const CMPISelectExp, rc: *mut CMPIStatus) -> *mut CMPISelectExp,
    pub evaluate: unsafe extern "C" fn(
        se: *const CMPISelectExp,
        inst: *const CMPIInstance,
        rc: *mut CMPIStatus,
    ) -> CMPIBoolean,
    pub getString:
        unsafe extern "C" fn(se: *const CMPISelectExp, rc: *mut CMPIStatus) -> *mut CMPIString,
    pub getDOC:
        unsafe extern "C" fn(se: *const CMPISelectExp, rc: *mut CMPIStatus) -> *mut CMPISelectCond,
    pub getCOD:
        unsafe extern "C" fn(se: *const CMPISelectExp, rc: *mut CMPIStatus) -> *mut CMPISelectCond,
    pub evaluateUsingAccessor: unsafe extern "C" fn(
        se: *const CMPISelectExp,
        accessor: CMPIAccessor,
        parm: *mut c_void,
        rc: *mut CMPIStatus,
    ) -> CMPIBoolean,
}

#[repr(C)]
pub struct CMPISelectCondFT {
    pub ftVersion: CMPIVersion,
    pub release: unsafe extern "C" fn(sc: *mut CMPISelectCond) -> CMPIStatus,
    pub clone:
        unsafe extern "C" fn(sc: *const CMPISelectCond, rc: *mut CMPIStatus) -> *mut CMPISelectCond,
    pub getCountAndType: unsafe extern "C" fn(
        sc: *const CMPISelectCond,
        ty: *mut c_int,
        rc: *mut CMPIStatus,
    ) -> CMPICount,
    pub getSubCondAt: unsafe extern "C" fn(
        sc: *const CMPISelectCond,
        index: CMPICount,
        rc: *mut CMPIStatus,
    ) -> *mut CMPISubCond,
}

#[repr(C)]
pub struct CMPISubCondFT {
    pub ftVersion: CMPIVersion,
    pub release: unsafe extern "C" fn(sc: *mut CMPISubCond) -> CMPIStatus,
    pub clone:
        unsafe extern "C" fn(sc: *const CMPISubCond, rc: *mut CMPIStatus) -> *mut CMPISubCond,
    pub getCount: unsafe extern "C" fn(sc: *const CMPISubCond, rc: *mut CMPIStatus) -> CMPICount,
    pub getPredicateAt: unsafe extern "C" fn(
        sc: *const CMPISubCond,
        index: CMPICount,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIPredicate,
    pub getPredicate: unsafe extern "C" fn(
        sc: *const CMPISubCond,
        name: *const c_char,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIPredicate,
}

#[repr(C)]
pub struct CMPIPredicateFT {
    pub ftVersion: CMPIVersion,
    pub release: unsafe extern "C" fn(pr: *mut CMPIPredicate) -> CMPIStatus,
    pub clone:
        unsafe extern "C" fn(pr: *const CMPIPredicate, rc: *mut CMPIStatus) -> *mut CMPIPredicate,
    pub getData: unsafe extern "C" fn(
        pr: *const CMPIPredicate,
        ty: *mut CMPIType,
        op: *mut CMPIPredOp,
        lhs: *mut *mut CMPIString,
        rhs: *mut *mut CMPIString,
    ) -> CMPIStatus,
    pub evaluateUsingAccessor: unsafe extern "C" fn(
        pr: *const CMPIPredicate,
        accessor: CMPIAccessor,
        parm: *mut c_void,
        rc: *mut CMPIStatus,
    ) -> CMPIBoolean,
}

#[repr(C)]
pub struct CMPIErrorFT {
    pub ftVersion: CMPIVersion,
    pub release: unsafe extern "C" fn(er: *mut CMPIError) -> CMPIStatus,
    pub clone: unsafe extern "C" fn(er: *const CMPIError, rc: *mut CMPIStatus) -> *mut CMPIError,
    pub getErrorType:
        unsafe extern "C" fn(er: *const CMPIError, rc: *mut CMPIStatus) -> CMPIErrorType,
    pub getOtherErrorType:
        unsafe extern "C" fn(er: *const CMPIError, rc: *mut CMPIStatus) -> *mut CMPIString,
    pub getOwningEntity:
        unsafe extern "C" fn(er: *const CMPIError, rc: *mut CMPIStatus) -> *mut CMPIString,
    pub getMessageID:
        unsafe extern "C" fn(er: *const CMPIError, rc: *mut CMPIStatus) -> *mut CMPIString,
    pub getMessage:
        unsafe extern "C" fn(er: *const CMPIError, rc: *mut CMPIStatus) -> *mut CMPIString,
    pub getPerceivedSeverity:
        unsafe extern "C" fn(er: *const CMPIError, rc: *mut CMPIStatus) -> CMPIErrorSeverity,
    pub getProbableCause:
        unsafe extern "C" fn(er: *const CMPIError, rc: *mut CMPIStatus) -> CMPIErrorProbableCause,
    pub getProbableCauseDescription:
        unsafe extern "C" fn(er: *const CMPIError, rc: *mut CMPIStatus) -> *mut CMPIString,
    pub getRecommendedActions:
        unsafe extern "C" fn(er: *const CMPIError, rc: *mut CMPIStatus) -> *mut CMPIArray,
    pub getErrorSource:
        unsafe extern "C" fn(er: *const CMPIError, rc: *mut CMPIStatus) -> *mut CMPIString,
    pub getErrorSourceFormat:
        unsafe extern "C" fn(er: *const CMPIError, rc: *mut CMPIStatus) -> CMPIErrorSrcFormat,
    pub getOtherErrorSourceFormat:
        unsafe extern "C" fn(er: *const CMPIError, rc: *mut CMPIStatus) -> *mut CMPIString,
    pub getCIMStatusCode: unsafe extern "C" fn(er: *const CMPIError, rc: *mut CMPIStatus) -> CMPIrc,
    pub getCIMStatusCodeDescription:
        unsafe extern "C" fn(er: *const CMPIError, rc: *mut CMPIStatus) -> *mut CMPIString,
    pub getMessageArguments:
        unsafe extern "C" fn(er: *const CMPIError, rc: *mut CMPIStatus) -> *mut CMPIArray,
    pub setErrorType: unsafe extern "C" fn(er: *const CMPIError, et: CMPIErrorType) -> CMPIStatus,
    pub setOtherErrorType:
        unsafe extern "C" fn(er: *const CMPIError, ot: *const c_char) -> CMPIStatus,
    pub setProbableCauseDescription:
        unsafe extern "C" fn(er: *const CMPIError, pcd: *const c_char) -> CMPIStatus,
    pub setRecommendedActions:
        unsafe extern "C" fn(er: *const CMPIError, ra: *const CMPIArray) -> CMPIStatus,
    pub setErrorSource: unsafe extern "C" fn(er: *const CMPIError, es: *const c_char) -> CMPIStatus,
    pub setErrorSourceFormat:
        unsafe extern "C" fn(er: *const CMPIError, esf: CMPIErrorSrcFormat) -> CMPIStatus,
    pub setOtherErrorSourceFormat:
        unsafe extern "C" fn(er: *const CMPIError, oef: *const c_char) -> CMPIStatus,
    pub setCIMStatusCodeDescription:
        unsafe extern "C" fn(er: *const CMPIError, cd: *const c_char) -> CMPIStatus,
    pub setMessageArguments:
        unsafe extern "C" fn(er: *const CMPIError, values: *const CMPIArray) -> CMPIStatus,
}

#[repr(C)]
pub struct CMPIPropertyListFT {
    pub ftVersion: CMPIVersion,
    pub release: unsafe extern "C" fn(plist: *mut CMPIPropertyList) -> CMPIStatus,
    pub clone: unsafe extern "C" fn(
        plist: *const CMPIPropertyList,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIPropertyList,
    pub isPropertyInList: unsafe extern "C" fn(
        plist: *const CMPIPropertyList,
        pname: *const c_char,
        rc: *mut CMPIStatus,
    ) -> CMPIBoolean,
    pub getProperties: unsafe extern "C" fn(
        plist: *const CMPIPropertyList,
        rc: *mut CMPIStatus,
    ) -> *mut *const c_char,
}

#[repr(C)]
pub struct CMPIEnumerationFilterFT {
    pub ftVersion: CMPIVersion,
    pub release: unsafe extern "C" fn(ef: *mut CMPIEnumerationFilter) -> CMPIStatus,
    pub clone: unsafe extern "C" fn(
        ef: *const CMPIEnumerationFilter,
        rc: *mut CMPIStatus,
    ) -> *mut CMPIEnumerationFilter,
    pub r#match: unsafe extern "C" fn(
        ef: *const CMPIEnumerationFilter,
        inst: *const CMPIInstance,
        rc: *mut CMPIStatus,
    ) -> CMPIBoolean,
}

#[cfg(test)]
mod tests {
    use std::mem::{offset_of, size_of};

    use super::*;

    const PTR: usize = size_of::<usize>();

    #[test]
    fn test_envelope_layout() {
        assert_eq!(size_of::<CMPIContext>(), 2 * PTR);
        assert_eq!(size_of::<CMPIError>(), 2 * PTR);
        assert_eq!(offset_of!(CMPIInstance, ft), PTR);
    }

    #[test]
    fn test_table_slot_order() {
        assert_eq!(offset_of!(CMPIContextFT, release), PTR);
        assert_slots!(
            CMPIContextFT,
            [release, clone, getEntry, getEntryAt, getEntryCount, addEntry]
        );
        assert_eq!(offset_of!(CMPIResultFT, release), PTR);
        assert_slots!(
            CMPIResultFT,
            [release, clone, returnData, returnInstance, returnObjectPath, returnDone, returnError]
        );
        assert_eq!(offset_of!(CMPIStringFT, release), PTR);
        assert_slots!(
            CMPIStringFT,
            [release, clone, getCharPtr, newCharsCP]
        );
        assert_eq!(offset_of!(CMPIArrayFT, release), PTR);
        assert_slots!(
            CMPIArrayFT,
            [release, clone, getSize, getSimpleType, getElementAt, setElementAt]
        );
        assert_eq!(offset_of!(CMPIEnumerationFT, release), PTR);
        assert_slots!(
            CMPIEnumerationFT,
            [release, clone, getNext, hasNext, toArray]
        );
        assert_eq!(offset_of!(CMPIInstanceFT, release), PTR);
        assert_slots!(
            CMPIInstanceFT,
            [release, clone, getProperty, getPropertyAt, getPropertyCount, setProperty,
                getObjectPath, setPropertyFilter, setObjectPath, setPropertyWithOrigin]
        );
        assert_eq!(offset_of!(CMPIObjectPathFT, release), PTR);
        assert_slots!(
            CMPIObjectPathFT,
            [release, clone, setNameSpace, getNameSpace, setHostname, getHostname, setClassName,
                getClassName, addKey, getKey, getKeyAt, getKeyCount, setNameSpaceFromObjectPath,
                setHostAndNameSpaceFromObjectPath, getClassQualifier, getPropertyQualifier,
                getMethodQualifier, getParameterQualifier, toString]
        );
        assert_eq!(offset_of!(CMPIArgsFT, release), PTR);
        assert_slots!(
            CMPIArgsFT,
            [release, clone, addArg, getArg, getArgAt, getArgCount]
        );
        assert_eq!(offset_of!(CMPIDateTimeFT, release), PTR);
        assert_slots!(
            CMPIDateTimeFT,
            [release, clone, getBinaryFormat, getStringFormat, isInterval]
        );
        assert_eq!(offset_of!(CMPISelectExpFT, release), PTR);
        assert_slots!(
            CMPISelectExpFT,
            [release, clone, evaluate, getString, getDOC, getCOD, evaluateUsingAccessor]
        );
        assert_eq!(offset_of!(CMPISelectCondFT, release), PTR);
        assert_slots!(
            CMPISelectCondFT,
            [release, clone, getCountAndType, getSubCondAt]
        );
        assert_eq!(offset_of!(CMPISubCondFT, release), PTR);
        assert_slots!(
            CMPISubCondFT,
            [release, clone, getCount, getPredicateAt, getPredicate]
        );
        assert_eq!(offset_of!(CMPIPredicateFT, release), PTR);
        assert_slots!(
            CMPIPredicateFT,
            [release, clone, getData, evaluateUsingAccessor]
        );
        assert_eq!(offset_of!(CMPIErrorFT, release), PTR);
        assert_slots!(
            CMPIErrorFT,
            [release, clone, getErrorType, getOtherErrorType, getOwningEntity, getMessageID,
                getMessage, getPerceivedSeverity, getProbableCause, getProbableCauseDescription,
                getRecommendedActions, getErrorSource, getErrorSourceFormat,
                getOtherErrorSourceFormat, getCIMStatusCode, getCIMStatusCodeDescription,
                getMessageArguments, setErrorType, setOtherErrorType, setProbableCauseDescription,
                setRecommendedActions, setErrorSource, setErrorSourceFormat,
                setOtherErrorSourceFormat, setCIMStatusCodeDescription, setMessageArguments]
        );
        assert_eq!(offset_of!(CMPIPropertyListFT, release), PTR);
        assert_slots!(
            CMPIPropertyListFT,
            [release, clone, isPropertyInList, getProperties]
        );
        assert_eq!(offset_of!(CMPIEnumerationFilterFT, release), PTR);
        assert_slots!(
            CMPIEnumerationFilterFT,
            [release, clone]
        );
    }
}
