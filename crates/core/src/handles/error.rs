//! Extended error handle

use crate::handles::{c_arg, call_rc, handle_type};
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};
use crate::value::raw::{read_array, read_error, read_string};
use crate::value::{ErrorData, Value};

handle_type!(
    /// Structured CIM error
    ErrorRef,
    CMPIError
);

macro_rules! error_text {
    ($($get:ident => $slot:ident),* $(,)?) => {
        $(
            pub fn $get(&self) -> CmpiResult<String> {
                unsafe {
                    let s = call_rc(|rc| (self.ft().$slot)(self.as_ptr(), rc))?;
                    if s.is_null() {
                        return Err(CmpiError::no_such_property(stringify!($get)));
                    }
                    read_string(s)
                }
            }
        )*
    };
}

/// Setters named `set_<property>`
macro_rules! error_set_text {
    ($($name:ident => $slot:ident),* $(,)?) => {
        paste::paste! {
            $(
                pub fn [<set_ $name>](&self, value: &str) -> CmpiResult<()> {
                    let v = c_arg(value)?;
                    unsafe { CmpiError::check((self.ft().$slot)(self.as_ptr(), v.as_ptr())) }
                }
            )*
        }
    };
}

impl ErrorRef {
    error_text! {
        other_error_type => getOtherErrorType,
        owning_entity => getOwningEntity,
        message_id => getMessageID,
        message => getMessage,
        probable_cause_description => getProbableCauseDescription,
        error_source => getErrorSource,
        other_error_source_format => getOtherErrorSourceFormat,
        cim_status_code_description => getCIMStatusCodeDescription,
    }

    error_set_text! {
        other_error_type => setOtherErrorType,
        probable_cause_description => setProbableCauseDescription,
        error_source => setErrorSource,
        other_error_source_format => setOtherErrorSourceFormat,
        cim_status_code_description => setCIMStatusCodeDescription,
    }

    pub fn error_type(&self) -> CmpiResult<CMPIErrorType> {
        unsafe { call_rc(|rc| (self.ft().getErrorType)(self.as_ptr(), rc)) }
    }

    pub fn perceived_severity(&self) -> CmpiResult<CMPIErrorSeverity> {
        unsafe { call_rc(|rc| (self.ft().getPerceivedSeverity)(self.as_ptr(), rc)) }
    }

    pub fn probable_cause(&self) -> CmpiResult<CMPIErrorProbableCause> {
        unsafe { call_rc(|rc| (self.ft().getProbableCause)(self.as_ptr(), rc)) }
    }

    pub fn error_source_format(&self) -> CmpiResult<CMPIErrorSrcFormat> {
        unsafe { call_rc(|rc| (self.ft().getErrorSourceFormat)(self.as_ptr(), rc)) }
    }

    pub fn cim_status_code(&self) -> CmpiResult<CMPIrc> {
        unsafe { call_rc(|rc| (self.ft().getCIMStatusCode)(self.as_ptr(), rc)) }
    }

    fn string_list(&self, ar: *mut CMPIArray) -> CmpiResult<Vec<String>> {
        if ar.is_null() {
            return Err(CmpiError::from_rc(CMPI_RC_ERR_NO_SUCH_PROPERTY));
        }
        let array = unsafe { read_array(ar)? };
        Ok(array
            .elements
            .iter()
            .filter_map(|d| d.value().and_then(Value::as_str).map(str::to_string))
            .collect())
    }

    pub fn recommended_actions(&self) -> CmpiResult<Vec<String>> {
        let ar = unsafe { call_rc(|rc| (self.ft().getRecommendedActions)(self.as_ptr(), rc))? };
        self.string_list(ar)
    }

    pub fn message_arguments(&self) -> CmpiResult<Vec<String>> {
        let ar = unsafe { call_rc(|rc| (self.ft().getMessageArguments)(self.as_ptr(), rc))? };
        self.string_list(ar)
    }

    pub fn set_error_type(&self, value: CMPIErrorType) -> CmpiResult<()> {
        unsafe { CmpiError::check((self.ft().setErrorType)(self.as_ptr(), value)) }
    }

    pub fn set_error_source_format(&self, value: CMPIErrorSrcFormat) -> CmpiResult<()> {
        unsafe { CmpiError::check((self.ft().setErrorSourceFormat)(self.as_ptr(), value)) }
    }

    pub fn set_recommended_actions(&self, actions: &[String]) -> CmpiResult<()> {
        let ar = self.broker().new_string_array(actions)?;
        let out = unsafe { CmpiError::check((self.ft().setRecommendedActions)(self.as_ptr(), ar.as_ptr())) };
        ar.release()?;
        out
    }

    pub fn set_message_arguments(&self, args: &[String]) -> CmpiResult<()> {
        let ar = self.broker().new_string_array(args)?;
        let out = unsafe { CmpiError::check((self.ft().setMessageArguments)(self.as_ptr(), ar.as_ptr())) };
        ar.release()?;
        out
    }

    /// Copy every field out
    pub fn to_data(&self) -> CmpiResult<ErrorData> {
        unsafe { read_error(self.as_ptr()) }
    }
}
