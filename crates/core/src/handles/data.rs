//! String, array, enumeration and datetime handles

use crate::datetime::CimDateTime;
use crate::handles::{call_rc, handle_type};
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};
use crate::value::raw::{data_from_raw, data_to_raw, read_array, read_datetime, read_string};
use crate::value::{ArrayData, Data};

handle_type!(
    /// Broker-managed string
    StringRef,
    CMPIString
);

impl StringRef {
    pub fn to_str(&self) -> CmpiResult<String> {
        // SAFETY: live handle
        unsafe { read_string(self.as_ptr()) }
    }

    /// Encode the characters in codepage `cpid`
    ///
    /// UTF-16 output is returned as little-endian bytes without the
    /// terminator.
    pub fn to_codepage(&self, cpid: CMPICodepageID) -> CmpiResult<Vec<u8>> {
        unsafe {
            let p = call_rc(|rc| (self.ft().newCharsCP)(self.as_ptr(), cpid, rc))?;
            if p.is_null() {
                return Err(CmpiError::from_rc(CMPI_RC_ERR_NOT_IN_CODEPAGE));
            }
            let out = if cpid == CMPI_CPID_UTF16 {
                let wide = p as *const u16;
                let mut len = 0;
                while *wide.add(len) != 0 {
                    len += 1;
                }
                std::slice::from_raw_parts(wide, len)
                    .iter()
                    .flat_map(|u| u.to_le_bytes())
                    .collect()
            } else {
                std::ffi::CStr::from_ptr(p).to_bytes().to_vec()
            };
            self.broker().free_chars(p);
            Ok(out)
        }
    }

    /// Read and release the message string of a returned status
    ///
    /// # Safety
    /// `msg` must be null or a live string handle owned by the caller.
    pub unsafe fn take_status_message(msg: *mut CMPIString) -> Option<String> {
        if msg.is_null() || (*msg).ft.is_null() {
            return None;
        }
        let text = read_string(msg).ok();
        let _ = ((*(*msg).ft).release)(msg);
        text
    }
}

handle_type!(
    /// Fixed-size array of one element type
    ArrayRef,
    CMPIArray
);

impl ArrayRef {
    pub fn len(&self) -> CmpiResult<usize> {
        unsafe { call_rc(|rc| (self.ft().getSize)(self.as_ptr(), rc)).map(|n| n as usize) }
    }

    pub fn is_empty(&self) -> CmpiResult<bool> {
        self.len().map(|n| n == 0)
    }

    /// Element type, without the array bit
    pub fn element_type(&self) -> CmpiResult<CMPIType> {
        unsafe { call_rc(|rc| (self.ft().getSimpleType)(self.as_ptr(), rc)) }
    }

    pub fn get(&self, index: usize) -> CmpiResult<Data> {
        let index = index_arg(index)?;
        unsafe {
            let d = call_rc(|rc| (self.ft().getElementAt)(self.as_ptr(), index, rc))?;
            data_from_raw(&d)
        }
    }

    /// Store `data` at `index`; a null value clears the element
    pub fn set_element_at(&self, index: usize, data: &Data) -> CmpiResult<()> {
        let index = index_arg(index)?;
        let raw = data_to_raw(&self.broker(), data)?;
        let ty = if raw.is_null() { self.element_type()? } else { raw.ty() };
        unsafe { CmpiError::check((self.ft().setElementAt)(self.as_ptr(), index, raw.as_ptr(), ty)) }
    }

    /// Copy every element out
    pub fn to_data(&self) -> CmpiResult<ArrayData> {
        unsafe { read_array(self.as_ptr()) }
    }
}

fn index_arg(index: usize) -> CmpiResult<CMPICount> {
    CMPICount::try_from(index).map_err(|_| CmpiError::no_such_property(&index.to_string()))
}

handle_type!(
    /// Cursor over returned values
    EnumerationRef,
    CMPIEnumeration
);

impl EnumerationRef {
    pub fn has_next(&self) -> CmpiResult<bool> {
        unsafe { call_rc(|rc| (self.ft().hasNext)(self.as_ptr(), rc)).map(|b| b != 0) }
    }

    pub fn next_data(&self) -> CmpiResult<Data> {
        unsafe {
            let d = call_rc(|rc| (self.ft().getNext)(self.as_ptr(), rc))?;
            data_from_raw(&d)
        }
    }

    /// Remaining elements as an array; the cursor is left where it was
    pub fn to_array(&self) -> CmpiResult<ArrayRef> {
        unsafe {
            let p = call_rc(|rc| (self.ft().toArray)(self.as_ptr(), rc))?;
            ArrayRef::from_raw(p, self.broker())
        }
    }

    /// Drain the cursor
    pub fn collect_data(&self) -> CmpiResult<Vec<Data>> {
        let mut out = Vec::new();
        while self.has_next()? {
            out.push(self.next_data()?);
        }
        Ok(out)
    }
}

handle_type!(
    /// Point in time or interval
    DateTimeRef,
    CMPIDateTime
);

impl DateTimeRef {
    /// Microseconds since the epoch, or interval length in microseconds
    pub fn binary(&self) -> CmpiResult<u64> {
        unsafe { call_rc(|rc| (self.ft().getBinaryFormat)(self.as_ptr(), rc)) }
    }

    /// 25 character CIM datetime string
    pub fn to_cim_string(&self) -> CmpiResult<String> {
        unsafe {
            let s = call_rc(|rc| (self.ft().getStringFormat)(self.as_ptr(), rc))?;
            if s.is_null() {
                return Err(CmpiError::failed("getStringFormat returned no string"));
            }
            read_string(s)
        }
    }

    pub fn is_interval(&self) -> CmpiResult<bool> {
        unsafe { call_rc(|rc| (self.ft().isInterval)(self.as_ptr(), rc)).map(|b| b != 0) }
    }

    pub fn to_data(&self) -> CmpiResult<CimDateTime> {
        unsafe { read_datetime(self.as_ptr()) }
    }
}
