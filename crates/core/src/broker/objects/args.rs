//! `CMPIArgs`

use std::ffi::c_char;

use super::{done, finish, NULL_DATA};
use crate::broker::convert::{arg_str, from_setter, set_name, to_cmpi};
use crate::broker::native::{Native, Scope};
use crate::sdk::*;
use crate::status::CmpiError;
use crate::value::NamedData;

pub(crate) type NativeArgs = Native<CMPIArgs, NamedData>;

pub(crate) fn create(data: NamedData, scope: Scope) -> *mut CMPIArgs {
    NativeArgs::create(&ARGS_FT, data, scope)
}

unsafe extern "C" fn release(args: *mut CMPIArgs) -> CMPIStatus {
    NativeArgs::release(args, &ARGS_FT)
}

unsafe extern "C" fn clone(args: *const CMPIArgs, rc: *mut CMPIStatus) -> *mut CMPIArgs {
    NativeArgs::clone_handle(args, &ARGS_FT, rc)
}

unsafe extern "C" fn add_arg(
    args: *const CMPIArgs,
    name: *const c_char,
    value: *const CMPIValue,
    ty: CMPIType,
) -> CMPIStatus {
    done(NativeArgs::from_handle(args, &ARGS_FT).and_then(|o| {
        let name = arg_str(name).ok_or_else(|| CmpiError::invalid_parameter("argument name"))?;
        let data = from_setter(value, ty)?;
        o.lock().set(name, data);
        Ok(())
    }))
}

unsafe extern "C" fn get_arg(args: *const CMPIArgs, name: *const c_char, rc: *mut CMPIStatus) -> CMPIData {
    let out = NativeArgs::from_handle(args, &ARGS_FT).and_then(|o| {
        let name = arg_str(name).ok_or_else(|| CmpiError::invalid_parameter("argument name"))?;
        o.lock()
            .get(name)
            .map(to_cmpi)
            .ok_or_else(|| CmpiError::not_found(format!("no argument {name}")))
    });
    finish(rc, out, NULL_DATA)
}

unsafe extern "C" fn get_arg_at(
    args: *const CMPIArgs,
    index: CMPICount,
    name: *mut *mut CMPIString,
    rc: *mut CMPIStatus,
) -> CMPIData {
    let out = NativeArgs::from_handle(args, &ARGS_FT).and_then(|o| {
        let data = o.lock();
        let (n, d) = data
            .get_at(index as usize)
            .ok_or_else(|| CmpiError::not_found(format!("no argument at index {index}")))?;
        set_name(name, n);
        Ok(to_cmpi(d))
    });
    finish(rc, out, NULL_DATA)
}

unsafe extern "C" fn get_arg_count(args: *const CMPIArgs, rc: *mut CMPIStatus) -> CMPICount {
    let out = NativeArgs::from_handle(args, &ARGS_FT).map(|o| o.lock().len() as CMPICount);
    finish(rc, out, 0)
}

pub(crate) static ARGS_FT: CMPIArgsFT = CMPIArgsFT {
    ftVersion: CMPICurrentVersion,
    release,
    clone,
    addArg: add_arg,
    getArg: get_arg,
    getArgAt: get_arg_at,
    getArgCount: get_arg_count,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::ArenaGuard;
    use crate::broker::objects::native_args;
    use crate::value::Data;

    #[test]
    fn test_args_replace_in_place() {
        let _arena = ArenaGuard::push();
        let args = create(NamedData::new(), Scope::Tracked);
        unsafe {
            let a = CMPIValue { sint32: -1 };
            let b = CMPIValue { boolean: 1 };
            add_arg(args, c"First".as_ptr(), &a, CMPI_sint32);
            add_arg(args, c"Second".as_ptr(), &b, CMPI_boolean);
            let a = CMPIValue { sint32: 5 };
            add_arg(args, c"FIRST".as_ptr(), &a, CMPI_sint32);

            let mut rc = CMPIStatus::ok();
            assert_eq!(get_arg_count(args, &mut rc), 2);
            assert_eq!(get_arg(args, c"first".as_ptr(), &mut rc).value.sint32, 5);

            let stored = native_args(args).unwrap();
            assert_eq!(stored.get_at(0).map(|(n, _)| n), Some("First"));
            assert_eq!(stored.get("Second"), Some(&Data::new(true)));

            get_arg(args, c"Third".as_ptr(), &mut rc);
            assert_eq!(rc.rc, CMPI_RC_ERR_NOT_FOUND);
        }
    }

    #[test]
    fn test_null_argument() {
        let _arena = ArenaGuard::push();
        let args = create(NamedData::new(), Scope::Tracked);
        unsafe {
            assert_eq!(add_arg(args, c"Opt".as_ptr(), std::ptr::null(), CMPI_string).rc, CMPI_RC_OK);
            let mut rc = CMPIStatus::ok();
            let d = get_arg(args, c"Opt".as_ptr(), &mut rc);
            assert_eq!(rc.rc, CMPI_RC_OK);
            assert_eq!(d.r#type, CMPI_string);
            assert_ne!(d.state & CMPI_nullValue, 0);
        }
    }
}
