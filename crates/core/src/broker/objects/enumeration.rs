//! `CMPIEnumeration`
//!
//! A forward-only cursor over results the broker collected from an up-call.

use super::{array, finish, NULL_DATA};
use crate::broker::convert::to_cmpi;
use crate::broker::native::{Native, Scope};
use crate::sdk::*;
use crate::status::CmpiError;
use crate::types;
use crate::value::{ArrayData, Data};

#[derive(Debug, Clone, Default)]
pub(crate) struct Cursor {
    items: Vec<Data>,
    pos: usize,
}

impl Cursor {
    pub(crate) fn new(items: Vec<Data>) -> Self {
        Self { items, pos: 0 }
    }

    fn remaining(&self) -> &[Data] {
        self.items.get(self.pos..).unwrap_or_default()
    }
}

pub(crate) type NativeEnumeration = Native<CMPIEnumeration, Cursor>;

pub(crate) fn create(items: Vec<Data>, scope: Scope) -> *mut CMPIEnumeration {
    NativeEnumeration::create(&ENUMERATION_FT, Cursor::new(items), scope)
}

unsafe extern "C" fn release(en: *mut CMPIEnumeration) -> CMPIStatus {
    NativeEnumeration::release(en, &ENUMERATION_FT)
}

unsafe extern "C" fn clone(en: *const CMPIEnumeration, rc: *mut CMPIStatus) -> *mut CMPIEnumeration {
    NativeEnumeration::clone_handle(en, &ENUMERATION_FT, rc)
}

unsafe extern "C" fn get_next(en: *const CMPIEnumeration, rc: *mut CMPIStatus) -> CMPIData {
    let out = NativeEnumeration::from_handle(en, &ENUMERATION_FT).and_then(|o| {
        let mut cursor = o.lock();
        let item = cursor
            .items
            .get(cursor.pos)
            .map(to_cmpi)
            .ok_or_else(|| CmpiError::not_found("enumeration exhausted"))?;
        cursor.pos += 1;
        Ok(item)
    });
    finish(rc, out, NULL_DATA)
}

unsafe extern "C" fn has_next(en: *const CMPIEnumeration, rc: *mut CMPIStatus) -> CMPIBoolean {
    let out = NativeEnumeration::from_handle(en, &ENUMERATION_FT)
        .map(|o| u8::from(!o.lock().remaining().is_empty()));
    finish(rc, out, 0)
}

unsafe extern "C" fn to_array(en: *const CMPIEnumeration, rc: *mut CMPIStatus) -> *mut CMPIArray {
    let out = NativeEnumeration::from_handle(en, &ENUMERATION_FT).map(|o| {
        let cursor = o.lock();
        let rest = cursor.remaining();
        // an empty enumeration has no element type to go by
        let element_type = rest.first().map(|d| types::element_type(d.ty)).unwrap_or(CMPI_null);
        let data = ArrayData {
            element_type,
            elements: rest.to_vec(),
        };
        array::create(data, Scope::Tracked)
    });
    finish(rc, out, std::ptr::null_mut())
}

pub(crate) static ENUMERATION_FT: CMPIEnumerationFT = CMPIEnumerationFT {
    ftVersion: CMPICurrentVersion,
    release,
    clone,
    getNext: get_next,
    hasNext: has_next,
    toArray: to_array,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::ArenaGuard;
    use crate::broker::objects::native_array;

    #[test]
    fn test_cursor_walk() {
        let _arena = ArenaGuard::push();
        let en = create(vec![Data::new(1u8), Data::new(2u8), Data::new(3u8)], Scope::Tracked);
        unsafe {
            let mut rc = CMPIStatus::ok();
            assert_eq!(get_next(en, &mut rc).value.uint8, 1);
            assert_eq!(has_next(en, &mut rc), 1);

            let rest = native_array(to_array(en, &mut rc)).unwrap();
            assert_eq!(rest.element_type, CMPI_uint8);
            assert_eq!(rest.len(), 2);

            assert_eq!(get_next(en, &mut rc).value.uint8, 2);
            assert_eq!(get_next(en, &mut rc).value.uint8, 3);
            assert_eq!(has_next(en, &mut rc), 0);
            get_next(en, &mut rc);
            assert_eq!(rc.rc, CMPI_RC_ERR_NOT_FOUND);
        }
    }

    #[test]
    fn test_clone_keeps_position() {
        let _arena = ArenaGuard::push();
        let en = create(vec![Data::new("a"), Data::new("b")], Scope::Tracked);
        unsafe {
            let mut rc = CMPIStatus::ok();
            get_next(en, &mut rc);
            let copy = clone(en, &mut rc);
            assert_eq!(has_next(copy, &mut rc), 1);
            get_next(copy, &mut rc);
            assert_eq!(has_next(copy, &mut rc), 0);
            // the original is not advanced by the copy
            assert_eq!(has_next(en, &mut rc), 1);
            assert_eq!(release(copy).rc, CMPI_RC_OK);
        }
    }
}
