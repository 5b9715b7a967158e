//! Query handles: select expressions, conditions, predicates, property lists

use std::ffi::{c_char, c_int, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use crate::handles::{c_arg, call_rc, handle_type, BrokerHandle, InstanceRef};
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};
use crate::value::raw::{data_to_raw, opt_cstr, property_names, read_string};
use crate::value::{CondForm, Data, PredOp};

/// Property lookup handed to `evaluateUsingAccessor`
pub type PropertyAccessor<'a> = &'a mut dyn FnMut(&str) -> Option<Data>;

struct AccessorState<'a> {
    broker: BrokerHandle,
    get: PropertyAccessor<'a>,
}

unsafe extern "C" fn accessor_trampoline(name: *const c_char, parm: *mut c_void) -> CMPIData {
    let state = &mut *(parm as *mut AccessorState<'_>);
    let name = opt_cstr(name).unwrap_or_default();
    let looked_up = catch_unwind(AssertUnwindSafe(|| (state.get)(&name)));
    match looked_up {
        Ok(Some(data)) => {
            let data = data.normalized();
            match data_to_raw(&state.broker, &data) {
                Ok(raw) => raw.to_data(data.state),
                Err(err) => {
                    tracing::warn!(property = %name, "accessor value not encodable: {err}");
                    CMPIData::not_found()
                }
            }
        }
        Ok(None) => CMPIData::not_found(),
        Err(_) => {
            tracing::error!(property = %name, "property accessor panicked");
            CMPIData::not_found()
        }
    }
}

fn with_accessor<T>(broker: BrokerHandle, get: PropertyAccessor<'_>, f: impl FnOnce(CMPIAccessor, *mut c_void) -> T) -> T {
    let mut state = AccessorState { broker, get };
    f(accessor_trampoline, &mut state as *mut AccessorState<'_> as *mut c_void)
}

handle_type!(
    /// Parsed query
    SelectExpRef,
    CMPISelectExp
);

impl SelectExpRef {
    pub fn evaluate(&self, inst: &InstanceRef) -> CmpiResult<bool> {
        unsafe { call_rc(|rc| (self.ft().evaluate)(self.as_ptr(), inst.as_ptr(), rc)).map(|b| b != 0) }
    }

    pub fn evaluate_using(&self, get: PropertyAccessor<'_>) -> CmpiResult<bool> {
        with_accessor(self.broker(), get, |acc, parm| unsafe {
            call_rc(|rc| (self.ft().evaluateUsingAccessor)(self.as_ptr(), acc, parm, rc)).map(|b| b != 0)
        })
    }

    /// Query text as given
    pub fn query(&self) -> CmpiResult<String> {
        unsafe {
            let s = call_rc(|rc| (self.ft().getString)(self.as_ptr(), rc))?;
            read_string(s)
        }
    }

    pub fn condition(&self, form: CondForm) -> CmpiResult<SelectCondRef> {
        unsafe {
            let p = call_rc(|rc| match form {
                CondForm::Doc => (self.ft().getDOC)(self.as_ptr(), rc),
                CondForm::Cod => (self.ft().getCOD)(self.as_ptr(), rc),
            })?;
            SelectCondRef::from_raw(p, self.broker())
        }
    }
}

handle_type!(
    /// Query condition in DOC or COD form
    SelectCondRef,
    CMPISelectCond
);

impl SelectCondRef {
    pub fn count_and_form(&self) -> CmpiResult<(usize, CondForm)> {
        let mut ty: c_int = 0;
        let n = unsafe { call_rc(|rc| (self.ft().getCountAndType)(self.as_ptr(), &mut ty, rc))? };
        let form = if ty == CMPI_COND_COD { CondForm::Cod } else { CondForm::Doc };
        Ok((n as usize, form))
    }

    pub fn sub_cond_at(&self, index: usize) -> CmpiResult<SubCondRef> {
        let index = CMPICount::try_from(index).map_err(|_| CmpiError::no_such_property(&index.to_string()))?;
        unsafe {
            let p = call_rc(|rc| (self.ft().getSubCondAt)(self.as_ptr(), index, rc))?;
            SubCondRef::from_raw(p, self.broker())
        }
    }
}

handle_type!(
    /// One AND or OR group of predicates
    SubCondRef,
    CMPISubCond
);

impl SubCondRef {
    pub fn count(&self) -> CmpiResult<usize> {
        unsafe { call_rc(|rc| (self.ft().getCount)(self.as_ptr(), rc)).map(|n| n as usize) }
    }

    pub fn predicate_at(&self, index: usize) -> CmpiResult<PredicateRef> {
        let index = CMPICount::try_from(index).map_err(|_| CmpiError::no_such_property(&index.to_string()))?;
        unsafe {
            let p = call_rc(|rc| (self.ft().getPredicateAt)(self.as_ptr(), index, rc))?;
            PredicateRef::from_raw(p, self.broker())
        }
    }

    /// First predicate on `property`
    pub fn predicate(&self, property: &str) -> CmpiResult<PredicateRef> {
        let n = c_arg(property)?;
        unsafe {
            let p = call_rc(|rc| (self.ft().getPredicate)(self.as_ptr(), n.as_ptr(), rc))?;
            PredicateRef::from_raw(p, self.broker())
        }
    }
}

/// Decoded predicate terms
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateTerms {
    pub ty: CMPIType,
    pub op: PredOp,
    pub lhs: String,
    pub rhs: String,
}

handle_type!(
    /// Single comparison
    PredicateRef,
    CMPIPredicate
);

impl PredicateRef {
    pub fn terms(&self) -> CmpiResult<PredicateTerms> {
        let mut ty: CMPIType = CMPI_null;
        let mut op: CMPIPredOp = 0;
        let mut lhs: *mut CMPIString = ptr::null_mut();
        let mut rhs: *mut CMPIString = ptr::null_mut();
        unsafe {
            CmpiError::check((self.ft().getData)(self.as_ptr(), &mut ty, &mut op, &mut lhs, &mut rhs))?;
            let op = PredOp::from_raw(op)
                .ok_or_else(|| CmpiError::invalid_parameter(format!("unknown predicate operator {op}")))?;
            let lhs = if lhs.is_null() { String::new() } else { read_string(lhs)? };
            let rhs = if rhs.is_null() { String::new() } else { read_string(rhs)? };
            Ok(PredicateTerms { ty, op, lhs, rhs })
        }
    }

    pub fn evaluate_using(&self, get: PropertyAccessor<'_>) -> CmpiResult<bool> {
        with_accessor(self.broker(), get, |acc, parm| unsafe {
            call_rc(|rc| (self.ft().evaluateUsingAccessor)(self.as_ptr(), acc, parm, rc)).map(|b| b != 0)
        })
    }
}

handle_type!(
    /// Property name filter
    PropertyListRef,
    CMPIPropertyList
);

impl PropertyListRef {
    pub fn contains(&self, name: &str) -> CmpiResult<bool> {
        let n = c_arg(name)?;
        unsafe { call_rc(|rc| (self.ft().isPropertyInList)(self.as_ptr(), n.as_ptr(), rc)).map(|b| b != 0) }
    }

    /// Names in the list; `None` when the list means "all properties"
    pub fn names(&self) -> CmpiResult<Option<Vec<String>>> {
        unsafe {
            let p = call_rc(|rc| (self.ft().getProperties)(self.as_ptr(), rc))?;
            Ok(property_names(p as *const *const c_char))
        }
    }
}
