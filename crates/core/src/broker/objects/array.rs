//! `CMPIArray`

use super::{done, finish, NULL_DATA};
use crate::broker::convert::{from_setter, to_cmpi};
use crate::broker::native::{Native, Scope};
use crate::sdk::*;
use crate::status::CmpiError;
use crate::value::ArrayData;

pub(crate) type NativeArray = Native<CMPIArray, ArrayData>;

pub(crate) fn create(data: ArrayData, scope: Scope) -> *mut CMPIArray {
    NativeArray::create(&ARRAY_FT, data, scope)
}

/// `{a, b, NULL}`
pub(crate) fn render(array: &ArrayData) -> String {
    let items: Vec<String> = array.elements.iter().map(|d| d.to_string()).collect();
    format!("{{{}}}", items.join(", "))
}

unsafe extern "C" fn release(ar: *mut CMPIArray) -> CMPIStatus {
    NativeArray::release(ar, &ARRAY_FT)
}

unsafe extern "C" fn clone(ar: *const CMPIArray, rc: *mut CMPIStatus) -> *mut CMPIArray {
    NativeArray::clone_handle(ar, &ARRAY_FT, rc)
}

unsafe extern "C" fn get_size(ar: *const CMPIArray, rc: *mut CMPIStatus) -> CMPICount {
    let out = NativeArray::from_handle(ar, &ARRAY_FT).map(|o| o.lock().len() as CMPICount);
    finish(rc, out, 0)
}

unsafe extern "C" fn get_simple_type(ar: *const CMPIArray, rc: *mut CMPIStatus) -> CMPIType {
    let out = NativeArray::from_handle(ar, &ARRAY_FT).map(|o| o.lock().element_type);
    finish(rc, out, CMPI_null)
}

unsafe extern "C" fn get_element_at(ar: *const CMPIArray, index: CMPICount, rc: *mut CMPIStatus) -> CMPIData {
    let out = NativeArray::from_handle(ar, &ARRAY_FT).and_then(|o| {
        let array = o.lock();
        array
            .get(index as usize)
            .map(to_cmpi)
            .ok_or_else(|| CmpiError::no_such_property(&format!("index {index} of {}", array.len())))
    });
    finish(rc, out, NULL_DATA)
}

unsafe extern "C" fn set_element_at(
    ar: *const CMPIArray,
    index: CMPICount,
    value: *const CMPIValue,
    ty: CMPIType,
) -> CMPIStatus {
    done(NativeArray::from_handle(ar, &ARRAY_FT).and_then(|o| {
        let data = from_setter(value, ty)?;
        o.lock().set(index as usize, data)
    }))
}

pub(crate) static ARRAY_FT: CMPIArrayFT = CMPIArrayFT {
    ftVersion: CMPICurrentVersion,
    release,
    clone,
    getSize: get_size,
    getSimpleType: get_simple_type,
    getElementAt: get_element_at,
    setElementAt: set_element_at,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::ArenaGuard;
    use crate::broker::objects::native_string;

    #[test]
    fn test_set_and_get_elements() {
        let _arena = ArenaGuard::push();
        let ar = create(ArrayData::new(CMPI_uint32, 2), Scope::Tracked);
        unsafe {
            let mut rc = CMPIStatus::ok();
            assert_eq!(get_size(ar, &mut rc), 2);
            assert_eq!(get_simple_type(ar, &mut rc), CMPI_uint32);

            let v = CMPIValue { uint32: 9 };
            assert_eq!(set_element_at(ar, 1, &v, CMPI_uint32).rc, CMPI_RC_OK);
            let d = get_element_at(ar, 1, &mut rc);
            assert_eq!(d.r#type, CMPI_uint32);
            assert_eq!(d.value.uint32, 9);

            // untouched elements are null
            let d = get_element_at(ar, 0, &mut rc);
            assert_ne!(d.state & CMPI_nullValue, 0);
        }
    }

    #[test]
    fn test_type_mismatch_and_bounds() {
        let _arena = ArenaGuard::push();
        let ar = create(ArrayData::new(CMPI_string, 1), Scope::Tracked);
        unsafe {
            let v = CMPIValue { uint8: 1 };
            assert_eq!(set_element_at(ar, 0, &v, CMPI_uint8).rc, CMPI_RC_ERR_TYPE_MISMATCH);

            assert_eq!(set_element_at(ar, 0, c"x".as_ptr().cast(), CMPI_chars).rc, CMPI_RC_OK);
            let mut rc = CMPIStatus::ok();
            let d = get_element_at(ar, 0, &mut rc);
            assert_eq!(d.r#type, CMPI_string);
            assert_eq!(native_string(d.value.string).unwrap(), "x");

            get_element_at(ar, 5, &mut rc);
            assert_eq!(rc.rc, CMPI_RC_ERR_NO_SUCH_PROPERTY);
        }
    }

    #[test]
    fn test_render() {
        let a = ArrayData::from_values(CMPI_uint8, [1u8, 2]);
        assert_eq!(render(&a), "{1, 2}");
    }
}
