//! `CMPIPropertyList`

use std::ffi::c_char;

use super::finish;
use crate::broker::convert::{arg_str, CStrList};
use crate::broker::native::{Native, Scope};
use crate::sdk::*;
use crate::status::CmpiError;

pub(crate) struct PropertyListData {
    names: Vec<String>,
    raw: CStrList,
}

impl Clone for PropertyListData {
    fn clone(&self) -> Self {
        Self::new(self.names.clone())
    }
}

impl PropertyListData {
    fn new(names: Vec<String>) -> Self {
        let raw = CStrList::new(&names);
        Self { names, raw }
    }
}

pub(crate) type NativePropertyList = Native<CMPIPropertyList, PropertyListData>;

pub(crate) fn create(names: Vec<String>, scope: Scope) -> *mut CMPIPropertyList {
    NativePropertyList::create(&PROPERTY_LIST_FT, PropertyListData::new(names), scope)
}

unsafe extern "C" fn release(plist: *mut CMPIPropertyList) -> CMPIStatus {
    NativePropertyList::release(plist, &PROPERTY_LIST_FT)
}

unsafe extern "C" fn clone(plist: *const CMPIPropertyList, rc: *mut CMPIStatus) -> *mut CMPIPropertyList {
    NativePropertyList::clone_handle(plist, &PROPERTY_LIST_FT, rc)
}

unsafe extern "C" fn is_property_in_list(
    plist: *const CMPIPropertyList,
    pname: *const c_char,
    rc: *mut CMPIStatus,
) -> CMPIBoolean {
    let out = NativePropertyList::from_handle(plist, &PROPERTY_LIST_FT).and_then(|o| {
        let name = arg_str(pname).ok_or_else(|| CmpiError::invalid_parameter("property name"))?;
        Ok(u8::from(o.lock().names.iter().any(|n| n.eq_ignore_ascii_case(name))))
    });
    finish(rc, out, 0)
}

/// The names as a NULL-terminated array owned by the list
unsafe extern "C" fn get_properties(plist: *const CMPIPropertyList, rc: *mut CMPIStatus) -> *mut *const c_char {
    let out = NativePropertyList::from_handle(plist, &PROPERTY_LIST_FT).map(|o| o.lock().raw.as_mut_ptr());
    finish(rc, out, std::ptr::null_mut())
}

pub(crate) static PROPERTY_LIST_FT: CMPIPropertyListFT = CMPIPropertyListFT {
    ftVersion: CMPICurrentVersion,
    release,
    clone,
    isPropertyInList: is_property_in_list,
    getProperties: get_properties,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::ArenaGuard;
    use crate::value::raw::property_names;

    #[test]
    fn test_membership_and_names() {
        let _arena = ArenaGuard::push();
        let pl = create(vec!["Name".into(), "Speed".into()], Scope::Tracked);
        unsafe {
            let mut rc = CMPIStatus::ok();
            assert_eq!(is_property_in_list(pl, c"speed".as_ptr(), &mut rc), 1);
            assert_eq!(is_property_in_list(pl, c"Status".as_ptr(), &mut rc), 0);

            let names = property_names(get_properties(pl, &mut rc));
            assert_eq!(names, Some(vec!["Name".to_string(), "Speed".to_string()]));
        }
    }
}
