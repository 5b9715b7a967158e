//! `CMPISelectExp`, `CMPISelectCond`, `CMPISubCond` and `CMPIPredicate`
//!
//! Conditions are Rust-built [`SelectExpData`] trees; these tables expose them
//! and evaluate them against instances or an accessor callback.

use std::ffi::{c_char, c_int, c_void};
use std::ptr;

use super::{finish, native_instance, string};
use crate::broker::convert::arg_str;
use crate::broker::native::{Native, Scope};
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};
use crate::value::raw::{data_from_raw, read_instance};
use crate::value::{CondForm, Data, PredicateData, SelectExpData};

pub(crate) type NativeSelectExp = Native<CMPISelectExp, SelectExpData>;
pub(crate) type NativeSelectCond = Native<CMPISelectCond, (CondForm, Vec<Vec<PredicateData>>)>;
pub(crate) type NativeSubCond = Native<CMPISubCond, Vec<PredicateData>>;
pub(crate) type NativePredicate = Native<CMPIPredicate, PredicateData>;

pub(crate) fn create_select_exp(data: SelectExpData, scope: Scope) -> *mut CMPISelectExp {
    NativeSelectExp::create(&SELECT_EXP_FT, data, scope)
}

/// Query text of a select expression
///
/// # Safety
/// `se` must be null or a readable envelope.
pub(crate) unsafe fn describe_select_exp(se: *const CMPISelectExp) -> String {
    NativeSelectExp::try_from_handle(se, &SELECT_EXP_FT)
        .map(|o| o.lock().query.clone())
        .unwrap_or_default()
}

/// `property op value`
///
/// # Safety
/// `pr` must be null or a readable envelope.
pub(crate) unsafe fn describe_predicate(pr: *const CMPIPredicate) -> String {
    NativePredicate::try_from_handle(pr, &PREDICATE_FT)
        .map(|o| o.lock().to_string())
        .unwrap_or_default()
}

/// Property lookup through a provider-supplied accessor
unsafe fn accessor_lookup(accessor: CMPIAccessor, parm: *mut c_void) -> impl FnMut(&str) -> Option<Data> {
    move |name: &str| {
        let name = string::c_lossy(name);
        let raw = accessor(name.as_ptr(), parm);
        match data_from_raw(&raw) {
            Ok(d) if !d.is_not_found() => Some(d),
            Ok(_) => None,
            Err(err) => {
                tracing::debug!("accessor returned undecodable data: {err}");
                None
            }
        }
    }
}

fn bool_out(b: bool) -> CMPIBoolean {
    u8::from(b)
}

fn index_of<T>(items: &[T], index: CMPICount) -> CmpiResult<&T> {
    items
        .get(index as usize)
        .ok_or_else(|| CmpiError::no_such_property(&format!("index {index} of {}", items.len())))
}

// ============================================================================
// CMPISelectExp
// ============================================================================

unsafe extern "C" fn se_release(se: *mut CMPISelectExp) -> CMPIStatus {
    NativeSelectExp::release(se, &SELECT_EXP_FT)
}

unsafe extern "C" fn se_clone(se: *const CMPISelectExp, rc: *mut CMPIStatus) -> *mut CMPISelectExp {
    NativeSelectExp::clone_handle(se, &SELECT_EXP_FT, rc)
}

unsafe extern "C" fn se_evaluate(se: *const CMPISelectExp, inst: *const CMPIInstance, rc: *mut CMPIStatus) -> CMPIBoolean {
    let out = NativeSelectExp::from_handle(se, &SELECT_EXP_FT).and_then(|o| {
        if inst.is_null() {
            return Err(CmpiError::invalid_parameter("instance"));
        }
        let inst = match native_instance(inst) {
            Some(i) => i,
            None => read_instance(inst)?,
        };
        Ok(bool_out(o.lock().evaluate(&inst)))
    });
    finish(rc, out, 0)
}

unsafe extern "C" fn se_get_string(se: *const CMPISelectExp, rc: *mut CMPIStatus) -> *mut CMPIString {
    let out = NativeSelectExp::from_handle(se, &SELECT_EXP_FT).map(|o| string::new_tracked(&o.lock().query));
    finish(rc, out, ptr::null_mut())
}

unsafe fn condition(se: *const CMPISelectExp, form: CondForm, rc: *mut CMPIStatus) -> *mut CMPISelectCond {
    let out = NativeSelectExp::from_handle(se, &SELECT_EXP_FT).map(|o| {
        let terms = o.lock().condition(form);
        NativeSelectCond::create(&SELECT_COND_FT, (form, terms), Scope::Tracked)
    });
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn se_get_doc(se: *const CMPISelectExp, rc: *mut CMPIStatus) -> *mut CMPISelectCond {
    condition(se, CondForm::Doc, rc)
}

unsafe extern "C" fn se_get_cod(se: *const CMPISelectExp, rc: *mut CMPIStatus) -> *mut CMPISelectCond {
    condition(se, CondForm::Cod, rc)
}

unsafe extern "C" fn se_evaluate_using(
    se: *const CMPISelectExp,
    accessor: CMPIAccessor,
    parm: *mut c_void,
    rc: *mut CMPIStatus,
) -> CMPIBoolean {
    let out = NativeSelectExp::from_handle(se, &SELECT_EXP_FT).map(|o| {
        // evaluate on a copy so the accessor may call back into this expression
        let exp = o.lock().clone();
        let mut get = accessor_lookup(accessor, parm);
        bool_out(exp.evaluate_with(&mut get))
    });
    finish(rc, out, 0)
}

pub(crate) static SELECT_EXP_FT: CMPISelectExpFT = CMPISelectExpFT {
    ftVersion: CMPICurrentVersion,
    release: se_release,
    clone: se_clone,
    evaluate: se_evaluate,
    getString: se_get_string,
    getDOC: se_get_doc,
    getCOD: se_get_cod,
    evaluateUsingAccessor: se_evaluate_using,
};

// ============================================================================
// CMPISelectCond
// ============================================================================

unsafe extern "C" fn sc_release(sc: *mut CMPISelectCond) -> CMPIStatus {
    NativeSelectCond::release(sc, &SELECT_COND_FT)
}

unsafe extern "C" fn sc_clone(sc: *const CMPISelectCond, rc: *mut CMPIStatus) -> *mut CMPISelectCond {
    NativeSelectCond::clone_handle(sc, &SELECT_COND_FT, rc)
}

unsafe extern "C" fn sc_get_count_and_type(sc: *const CMPISelectCond, ty: *mut c_int, rc: *mut CMPIStatus) -> CMPICount {
    let out = NativeSelectCond::from_handle(sc, &SELECT_COND_FT).map(|o| {
        let cond = o.lock();
        if !ty.is_null() {
            *ty = cond.0.as_raw();
        }
        cond.1.len() as CMPICount
    });
    finish(rc, out, 0)
}

unsafe extern "C" fn sc_get_sub_cond_at(sc: *const CMPISelectCond, index: CMPICount, rc: *mut CMPIStatus) -> *mut CMPISubCond {
    let out = NativeSelectCond::from_handle(sc, &SELECT_COND_FT).and_then(|o| {
        let cond = o.lock();
        let sub = index_of(&cond.1, index)?;
        Ok(NativeSubCond::create(&SUB_COND_FT, sub.clone(), Scope::Tracked))
    });
    finish(rc, out, ptr::null_mut())
}

pub(crate) static SELECT_COND_FT: CMPISelectCondFT = CMPISelectCondFT {
    ftVersion: CMPICurrentVersion,
    release: sc_release,
    clone: sc_clone,
    getCountAndType: sc_get_count_and_type,
    getSubCondAt: sc_get_sub_cond_at,
};

// ============================================================================
// CMPISubCond
// ============================================================================

unsafe extern "C" fn sub_release(sc: *mut CMPISubCond) -> CMPIStatus {
    NativeSubCond::release(sc, &SUB_COND_FT)
}

unsafe extern "C" fn sub_clone(sc: *const CMPISubCond, rc: *mut CMPIStatus) -> *mut CMPISubCond {
    NativeSubCond::clone_handle(sc, &SUB_COND_FT, rc)
}

unsafe extern "C" fn sub_get_count(sc: *const CMPISubCond, rc: *mut CMPIStatus) -> CMPICount {
    let out = NativeSubCond::from_handle(sc, &SUB_COND_FT).map(|o| o.lock().len() as CMPICount);
    finish(rc, out, 0)
}

unsafe extern "C" fn sub_get_predicate_at(sc: *const CMPISubCond, index: CMPICount, rc: *mut CMPIStatus) -> *mut CMPIPredicate {
    let out = NativeSubCond::from_handle(sc, &SUB_COND_FT).and_then(|o| {
        let preds = o.lock();
        let pred = index_of(&preds, index)?;
        Ok(NativePredicate::create(&PREDICATE_FT, pred.clone(), Scope::Tracked))
    });
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn sub_get_predicate(sc: *const CMPISubCond, name: *const c_char, rc: *mut CMPIStatus) -> *mut CMPIPredicate {
    let out = NativeSubCond::from_handle(sc, &SUB_COND_FT).and_then(|o| {
        let name = arg_str(name).ok_or_else(|| CmpiError::invalid_parameter("property name"))?;
        let preds = o.lock();
        let pred = preds
            .iter()
            .find(|p| p.property.eq_ignore_ascii_case(name))
            .ok_or_else(|| CmpiError::not_found(format!("no predicate on {name}")))?;
        Ok(NativePredicate::create(&PREDICATE_FT, pred.clone(), Scope::Tracked))
    });
    finish(rc, out, ptr::null_mut())
}

pub(crate) static SUB_COND_FT: CMPISubCondFT = CMPISubCondFT {
    ftVersion: CMPICurrentVersion,
    release: sub_release,
    clone: sub_clone,
    getCount: sub_get_count,
    getPredicateAt: sub_get_predicate_at,
    getPredicate: sub_get_predicate,
};

// ============================================================================
// CMPIPredicate
// ============================================================================

unsafe extern "C" fn pr_release(pr: *mut CMPIPredicate) -> CMPIStatus {
    NativePredicate::release(pr, &PREDICATE_FT)
}

unsafe extern "C" fn pr_clone(pr: *const CMPIPredicate, rc: *mut CMPIStatus) -> *mut CMPIPredicate {
    NativePredicate::clone_handle(pr, &PREDICATE_FT, rc)
}

unsafe extern "C" fn pr_get_data(
    pr: *const CMPIPredicate,
    ty: *mut CMPIType,
    op: *mut CMPIPredOp,
    lhs: *mut *mut CMPIString,
    rhs: *mut *mut CMPIString,
) -> CMPIStatus {
    let o = match NativePredicate::from_handle(pr, &PREDICATE_FT) {
        Ok(o) => o,
        Err(err) => return super::status(&err),
    };
    let pred = o.lock();
    if !ty.is_null() {
        *ty = pred.ty;
    }
    if !op.is_null() {
        *op = pred.op.as_raw();
    }
    if !lhs.is_null() {
        *lhs = string::new_tracked(&pred.property);
    }
    if !rhs.is_null() {
        *rhs = string::new_tracked(&pred.value);
    }
    CMPIStatus::ok()
}

unsafe extern "C" fn pr_evaluate_using(
    pr: *const CMPIPredicate,
    accessor: CMPIAccessor,
    parm: *mut c_void,
    rc: *mut CMPIStatus,
) -> CMPIBoolean {
    let out = NativePredicate::from_handle(pr, &PREDICATE_FT).map(|o| {
        let pred = o.lock().clone();
        let mut get = accessor_lookup(accessor, parm);
        bool_out(pred.evaluate_with(&mut get))
    });
    finish(rc, out, 0)
}

pub(crate) static PREDICATE_FT: CMPIPredicateFT = CMPIPredicateFT {
    ftVersion: CMPICurrentVersion,
    release: pr_release,
    clone: pr_clone,
    getData: pr_get_data,
    evaluateUsingAccessor: pr_evaluate_using,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::ArenaGuard;
    use crate::broker::objects::{instance, native_string};
    use crate::value::{InstanceData, ObjectPathData, PredOp};

    fn sample() -> *mut CMPISelectExp {
        let doc = vec![
            vec![
                PredicateData::new("Speed", PredOp::GreaterThan, "1000", CMPI_integerString),
                PredicateData::new("Name", PredOp::Like, "fan%", CMPI_charString),
            ],
            vec![PredicateData::new("Status", PredOp::Equals, "2", CMPI_integerString)],
        ];
        let exp = SelectExpData::new("WQL", "SELECT * FROM CIM_Fan WHERE ...", doc);
        create_select_exp(exp, Scope::Tracked)
    }

    unsafe extern "C" fn speed_only(name: *const c_char, _parm: *mut c_void) -> CMPIData {
        if std::ffi::CStr::from_ptr(name).to_bytes() == b"Status" {
            CMPIData {
                r#type: CMPI_uint16,
                state: CMPI_goodValue,
                value: CMPIValue { uint16: 2 },
            }
        } else {
            CMPIData::not_found()
        }
    }

    #[test]
    fn test_evaluate_instance() {
        let _arena = ArenaGuard::push();
        let se = sample();
        let fan = InstanceData::new(ObjectPathData::new("root", "CIM_Fan"))
            .with_property("Speed", 1500u32)
            .with_property("Name", "fan1");
        let slow = InstanceData::new(ObjectPathData::new("root", "CIM_Fan")).with_property("Speed", 10u32);
        unsafe {
            let mut rc = CMPIStatus::ok();
            assert_eq!(se_evaluate(se, instance::create(fan, Scope::Tracked), &mut rc), 1);
            assert_eq!(se_evaluate(se, instance::create(slow, Scope::Tracked), &mut rc), 0);
            assert_eq!(rc.rc, CMPI_RC_OK);
            assert_eq!(se_evaluate_using(se, speed_only, ptr::null_mut(), &mut rc), 1);
        }
    }

    #[test]
    fn test_walk_doc_and_cod() {
        let _arena = ArenaGuard::push();
        let se = sample();
        unsafe {
            let mut rc = CMPIStatus::ok();
            let mut ty: c_int = -1;
            let doc = se_get_doc(se, &mut rc);
            assert_eq!(sc_get_count_and_type(doc, &mut ty, &mut rc), 2);
            assert_eq!(ty, CMPI_COND_DOC);

            let cod = se_get_cod(se, &mut rc);
            assert_eq!(sc_get_count_and_type(cod, &mut ty, &mut rc), 2);
            assert_eq!(ty, CMPI_COND_COD);

            let sub = sc_get_sub_cond_at(doc, 0, &mut rc);
            assert_eq!(sub_get_count(sub, &mut rc), 2);
            let pr = sub_get_predicate(sub, c"name".as_ptr(), &mut rc);
            assert_eq!(rc.rc, CMPI_RC_OK);

            let (mut t, mut o) = (0, 0);
            let (mut l, mut r) = (ptr::null_mut(), ptr::null_mut());
            assert_eq!(pr_get_data(pr, &mut t, &mut o, &mut l, &mut r).rc, CMPI_RC_OK);
            assert_eq!((t, o), (CMPI_charString, CMPI_PredOp_Like));
            assert_eq!(native_string(l).unwrap(), "Name");
            assert_eq!(native_string(r).unwrap(), "fan%");
            assert_eq!(describe_predicate(pr), "Name LIKE 'fan%'");

            sc_get_sub_cond_at(doc, 9, &mut rc);
            assert_eq!(rc.rc, CMPI_RC_ERR_NO_SUCH_PROPERTY);
        }
    }
}
