//! `CMPIResult`
//!
//! Collects what a provider returns during one request.

use super::{done, native_error, native_instance, native_object_path};
use crate::broker::convert::from_setter;
use crate::broker::native::{Native, Scope};
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};
use crate::value::raw::{read_error, read_instance, read_object_path};
use crate::value::{Data, ErrorData};

#[derive(Debug, Clone, Default)]
pub(crate) struct ResultData {
    pub(crate) items: Vec<Data>,
    pub(crate) errors: Vec<ErrorData>,
    pub(crate) done: bool,
}

pub(crate) type NativeResult = Native<CMPIResult, ResultData>;

pub(crate) fn create(scope: Scope) -> *mut CMPIResult {
    NativeResult::create(&RESULT_FT, ResultData::default(), scope)
}

/// Collected data of a request-scoped result, destroying it
///
/// # Safety
/// `rslt` must come from [`create`] and not be used afterwards.
pub(crate) unsafe fn take(rslt: *mut CMPIResult) -> ResultData {
    let data = NativeResult::try_from_handle(rslt, &RESULT_FT)
        .map(|o| std::mem::take(&mut *o.lock()))
        .unwrap_or_default();
    NativeResult::destroy(rslt);
    data
}

unsafe fn push(rslt: *const CMPIResult, data: impl FnOnce() -> CmpiResult<Data>) -> CMPIStatus {
    done(NativeResult::from_handle(rslt, &RESULT_FT).and_then(|o| {
        if o.lock().done {
            return Err(CmpiError::failed("result already done"));
        }
        let data = data()?;
        o.lock().items.push(data);
        Ok(())
    }))
}

unsafe extern "C" fn release(rslt: *mut CMPIResult) -> CMPIStatus {
    NativeResult::release(rslt, &RESULT_FT)
}

unsafe extern "C" fn clone(rslt: *const CMPIResult, rc: *mut CMPIStatus) -> *mut CMPIResult {
    NativeResult::clone_handle(rslt, &RESULT_FT, rc)
}

unsafe extern "C" fn return_data(rslt: *const CMPIResult, value: *const CMPIValue, ty: CMPIType) -> CMPIStatus {
    push(rslt, || from_setter(value, ty))
}

unsafe extern "C" fn return_instance(rslt: *const CMPIResult, inst: *const CMPIInstance) -> CMPIStatus {
    push(rslt, || {
        if inst.is_null() {
            return Err(CmpiError::invalid_parameter("instance"));
        }
        let data = match native_instance(inst) {
            Some(i) => i,
            None => read_instance(inst)?,
        };
        Ok(Data::new(data))
    })
}

unsafe extern "C" fn return_object_path(rslt: *const CMPIResult, op: *const CMPIObjectPath) -> CMPIStatus {
    push(rslt, || {
        if op.is_null() {
            return Err(CmpiError::invalid_parameter("object path"));
        }
        let data = match native_object_path(op) {
            Some(p) => p,
            None => read_object_path(op)?,
        };
        Ok(Data::new(data))
    })
}

unsafe extern "C" fn return_done(rslt: *const CMPIResult) -> CMPIStatus {
    done(NativeResult::from_handle(rslt, &RESULT_FT).map(|o| o.lock().done = true))
}

unsafe extern "C" fn return_error(rslt: *const CMPIResult, er: *const CMPIError) -> CMPIStatus {
    done(NativeResult::from_handle(rslt, &RESULT_FT).and_then(|o| {
        if er.is_null() {
            return Err(CmpiError::invalid_parameter("error"));
        }
        let error = match native_error(er) {
            Some(e) => e,
            None => read_error(er)?,
        };
        o.lock().errors.push(error);
        Ok(())
    }))
}

pub(crate) static RESULT_FT: CMPIResultFT = CMPIResultFT {
    ftVersion: CMPICurrentVersion,
    release,
    clone,
    returnData: return_data,
    returnInstance: return_instance,
    returnObjectPath: return_object_path,
    returnDone: return_done,
    returnError: return_error,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::ArenaGuard;
    use crate::broker::objects::{error, instance};
    use crate::value::{InstanceData, ObjectPathData};

    #[test]
    fn test_collects_until_done() {
        let _arena = ArenaGuard::push();
        let rslt = create(Scope::Request);
        unsafe {
            let inst = instance::create(InstanceData::new(ObjectPathData::new("root", "CIM_A")), Scope::Tracked);
            assert_eq!(return_instance(rslt, inst).rc, CMPI_RC_OK);
            let v = CMPIValue { uint8: 4 };
            assert_eq!(return_data(rslt, &v, CMPI_uint8).rc, CMPI_RC_OK);
            let er = error::create(ErrorData::new("me", "M1", "bad", ErrorSevLow, 0, CMPI_RC_ERR_FAILED), Scope::Tracked);
            assert_eq!(return_error(rslt, er).rc, CMPI_RC_OK);
            assert_eq!(return_done(rslt).rc, CMPI_RC_OK);
            assert_eq!(return_data(rslt, &v, CMPI_uint8).rc, CMPI_RC_ERR_FAILED);

            let collected = take(rslt);
            assert!(collected.done);
            assert_eq!(collected.items.len(), 2);
            assert_eq!(collected.items[0].value().and_then(|v| v.as_instance()).map(|i| i.class_name()), Some("CIM_A"));
            assert_eq!(collected.errors[0].message.as_deref(), Some("bad"));
        }
    }
}
