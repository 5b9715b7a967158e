//! Scalar typedefs, type tags, value states and the tagged value union
//!
//! The type tag is a bitmask, not a sequential enumerant. Categories occupy
//! disjoint bit ranges so that "is this any unsigned integer" or "is this an
//! array" is a single mask-and-compare:
//!
//! | Category | Mask | Bits |
//! |---|---|---|
//! | simple | `CMPI_SIMPLE` | 1-2 |
//! | real | `CMPI_REAL` | 2-3 |
//! | unsigned int | `CMPI_UINT` | 4-7 |
//! | signed int | `CMPI_SINT` | 4-7 (both top bits set) |
//! | encapsulated | `CMPI_ENC` | 8-12 |
//! | array | `CMPI_ARRAY` | 13, OR'd onto any base tag |

use std::ffi::{c_char, c_int, c_uint, c_void};

use crate::encaps::{
    CMPIArgs, CMPIArray, CMPIDateTime, CMPIEnumeration, CMPIInstance, CMPIObjectPath,
    CMPISelectExp, CMPIString,
};

pub type CMPIBoolean = u8;
pub type CMPIChar16 = u16;
pub type CMPIUint8 = u8;
pub type CMPIUint16 = u16;
pub type CMPIUint32 = u32;
pub type CMPIUint64 = u64;
pub type CMPISint8 = i8;
pub type CMPISint16 = i16;
pub type CMPISint32 = i32;
pub type CMPISint64 = i64;
pub type CMPIReal32 = f32;
pub type CMPIReal64 = f64;

/// Element counts and indexes
pub type CMPICount = c_uint;
/// Bitmask type tag
pub type CMPIType = u16;
/// Validity state flags of a `CMPIData`
pub type CMPIValueState = u16;
/// Invocation flags (`CMPI_FLAG_*`)
pub type CMPIFlags = c_uint;
/// Interface version number (100, 200, 210)
pub type CMPIVersion = c_int;
/// Opaque handle used by memory `mark`/`release`
pub type CMPIGcStat = c_void;
/// Opaque message file handle
pub type CMPIMsgFileHandle = *mut c_void;

pub const CMPI_true: CMPIBoolean = 1;
pub const CMPI_false: CMPIBoolean = 0;

// ============================================================================
// Type tags
// ============================================================================

pub const CMPI_null: CMPIType = 0;

pub const CMPI_SIMPLE: CMPIType = 2;
pub const CMPI_boolean: CMPIType = 2 + 0;
pub const CMPI_char16: CMPIType = 2 + 1;

pub const CMPI_REAL: CMPIType = 2 << 2;
pub const CMPI_real32: CMPIType = (2 + 0) << 2;
pub const CMPI_real64: CMPIType = (2 + 1) << 2;

pub const CMPI_UINT: CMPIType = 8 << 4;
pub const CMPI_uint8: CMPIType = (8 + 0) << 4;
pub const CMPI_uint16: CMPIType = (8 + 1) << 4;
pub const CMPI_uint32: CMPIType = (8 + 2) << 4;
pub const CMPI_uint64: CMPIType = (8 + 3) << 4;

pub const CMPI_SINT: CMPIType = (8 + 4) << 4;
pub const CMPI_sint8: CMPIType = (8 + 4) << 4;
pub const CMPI_sint16: CMPIType = (8 + 5) << 4;
pub const CMPI_sint32: CMPIType = (8 + 6) << 4;
pub const CMPI_sint64: CMPIType = (8 + 7) << 4;

pub const CMPI_INTEGER: CMPIType = CMPI_UINT | CMPI_SINT;

pub const CMPI_ENC: CMPIType = 16 << 8;
pub const CMPI_instance: CMPIType = (16 + 0) << 8;
pub const CMPI_ref: CMPIType = (16 + 1) << 8;
pub const CMPI_args: CMPIType = (16 + 2) << 8;
pub const CMPI_class: CMPIType = (16 + 3) << 8;
pub const CMPI_filter: CMPIType = (16 + 4) << 8;
pub const CMPI_enumeration: CMPIType = (16 + 5) << 8;
pub const CMPI_string: CMPIType = (16 + 6) << 8;
pub const CMPI_chars: CMPIType = (16 + 7) << 8;
pub const CMPI_dateTime: CMPIType = (16 + 8) << 8;
pub const CMPI_ptr: CMPIType = (16 + 9) << 8;
pub const CMPI_charsptr: CMPIType = (16 + 10) << 8;

pub const CMPI_ARRAY: CMPIType = 1 << 13;
pub const CMPI_SIMPLEA: CMPIType = CMPI_ARRAY | CMPI_SIMPLE;
pub const CMPI_booleanA: CMPIType = CMPI_ARRAY | CMPI_boolean;
pub const CMPI_char16A: CMPIType = CMPI_ARRAY | CMPI_char16;
pub const CMPI_REALA: CMPIType = CMPI_ARRAY | CMPI_REAL;
pub const CMPI_real32A: CMPIType = CMPI_ARRAY | CMPI_real32;
pub const CMPI_real64A: CMPIType = CMPI_ARRAY | CMPI_real64;
pub const CMPI_UINTA: CMPIType = CMPI_ARRAY | CMPI_UINT;
pub const CMPI_uint8A: CMPIType = CMPI_ARRAY | CMPI_uint8;
pub const CMPI_uint16A: CMPIType = CMPI_ARRAY | CMPI_uint16;
pub const CMPI_uint32A: CMPIType = CMPI_ARRAY | CMPI_uint32;
pub const CMPI_uint64A: CMPIType = CMPI_ARRAY | CMPI_uint64;
pub const CMPI_SINTA: CMPIType = CMPI_ARRAY | CMPI_SINT;
pub const CMPI_sint8A: CMPIType = CMPI_ARRAY | CMPI_sint8;
pub const CMPI_sint16A: CMPIType = CMPI_ARRAY | CMPI_sint16;
pub const CMPI_sint32A: CMPIType = CMPI_ARRAY | CMPI_sint32;
pub const CMPI_sint64A: CMPIType = CMPI_ARRAY | CMPI_sint64;
pub const CMPI_INTEGERA: CMPIType = CMPI_ARRAY | CMPI_INTEGER;
pub const CMPI_ENCA: CMPIType = CMPI_ARRAY | CMPI_ENC;
pub const CMPI_instanceA: CMPIType = CMPI_ARRAY | CMPI_instance;
pub const CMPI_refA: CMPIType = CMPI_ARRAY | CMPI_ref;
pub const CMPI_stringA: CMPIType = CMPI_ARRAY | CMPI_string;
pub const CMPI_charsA: CMPIType = CMPI_ARRAY | CMPI_chars;
pub const CMPI_dateTimeA: CMPIType = CMPI_ARRAY | CMPI_dateTime;
pub const CMPI_ptrA: CMPIType = CMPI_ARRAY | CMPI_ptr;
pub const CMPI_charsptrA: CMPIType = CMPI_ARRAY | CMPI_charsptr;

// Deprecated synonyms, bit-identical to their replacements
pub const CMPI_Byte: CMPIType = CMPI_sint8;
pub const CMPI_Short: CMPIType = CMPI_sint16;
pub const CMPI_Int: CMPIType = CMPI_sint32;
pub const CMPI_Long: CMPIType = CMPI_sint64;
pub const CMPI_Real: CMPIType = CMPI_real32;
pub const CMPI_Double: CMPIType = CMPI_real64;
pub const CMPI_ByteA: CMPIType = CMPI_ARRAY | CMPI_sint8;
pub const CMPI_ShortA: CMPIType = CMPI_ARRAY | CMPI_sint16;
pub const CMPI_IntA: CMPIType = CMPI_ARRAY | CMPI_sint32;
pub const CMPI_LongA: CMPIType = CMPI_ARRAY | CMPI_sint64;
pub const CMPI_RealA: CMPIType = CMPI_ARRAY | CMPI_real32;
pub const CMPI_DoubleA: CMPIType = CMPI_ARRAY | CMPI_real64;

// Key binding types (restricted subset usable in an object path)
pub const CMPI_keyInteger: CMPIType = CMPI_sint64;
pub const CMPI_keyString: CMPIType = CMPI_string;
pub const CMPI_keyBoolean: CMPIType = CMPI_boolean;
pub const CMPI_keyRef: CMPIType = CMPI_ref;

// String subtypes used by query predicates
pub const CMPI_charString: CMPIType = CMPI_string;
pub const CMPI_integerString: CMPIType = CMPI_string | 0x0001;
pub const CMPI_realString: CMPIType = CMPI_string | 0x0002;
pub const CMPI_numericString: CMPIType = CMPI_string | 0x0003;
pub const CMPI_booleanString: CMPIType = CMPI_string | 0x0004;
pub const CMPI_dateTimeString: CMPIType = CMPI_string | 0x0005;
pub const CMPI_classNameString: CMPIType = CMPI_string | 0x0006;
pub const CMPI_nameString: CMPIType = CMPI_string | 0x0007;

// ============================================================================
// Value states
// ============================================================================

pub const CMPI_goodValue: CMPIValueState = 0;
pub const CMPI_nullValue: CMPIValueState = 1 << 8;
pub const CMPI_keyValue: CMPIValueState = 2 << 8;
pub const CMPI_notFound: CMPIValueState = 4 << 8;
pub const CMPI_badValue: CMPIValueState = 0x80 << 8;

// ============================================================================
// Values
// ============================================================================

/// Untyped memory block carried by `CMPI_ptr` values
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CMPIValuePtr {
    pub ptr: *mut c_void,
    pub length: CMPICount,
}

/// Raw value payload; the active member is selected solely by the type tag
#[repr(C)]
#[derive(Clone, Copy)]
pub union CMPIValue {
    pub uint64: CMPIUint64,
    pub uint32: CMPIUint32,
    pub uint16: CMPIUint16,
    pub uint8: CMPIUint8,
    pub sint64: CMPISint64,
    pub sint32: CMPISint32,
    pub sint16: CMPISint16,
    pub sint8: CMPISint8,
    pub real64: CMPIReal64,
    pub real32: CMPIReal32,
    pub boolean: CMPIBoolean,
    pub char16: CMPIChar16,

    pub inst: *mut CMPIInstance,
    pub r#ref: *mut CMPIObjectPath,
    pub args: *mut CMPIArgs,
    pub filter: *mut CMPISelectExp,
    pub Enum: *mut CMPIEnumeration,
    pub array: *mut CMPIArray,
    pub string: *mut CMPIString,
    pub chars: *mut c_char,
    pub dateTime: *mut CMPIDateTime,
    pub dataPtr: CMPIValuePtr,

    // Deprecated members
    pub Byte: CMPISint8,
    pub Short: CMPISint16,
    pub Int: CMPISint32,
    pub Long: CMPISint64,
    pub Float: CMPIReal32,
    pub Double: CMPIReal64,
}

impl Default for CMPIValue {
    fn default() -> Self {
        Self {
            dataPtr: CMPIValuePtr {
                ptr: std::ptr::null_mut(),
                length: 0,
            },
        }
    }
}

impl std::fmt::Debug for CMPIValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The tag lives outside the union, so only the raw bits are meaningful here
        f.debug_struct("CMPIValue")
            .field("raw", unsafe { &self.uint64 })
            .finish()
    }
}

/// A tagged value: type tag, validity state and payload
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CMPIData {
    pub r#type: CMPIType,
    pub state: CMPIValueState,
    pub value: CMPIValue,
}

impl CMPIData {
    /// A null value of the given type
    pub fn null(ty: CMPIType) -> Self {
        Self {
            r#type: ty,
            state: CMPI_nullValue,
            value: CMPIValue::default(),
        }
    }

    /// The value returned when a lookup by name or index fails
    pub fn not_found() -> Self {
        Self {
            r#type: CMPI_null,
            state: CMPI_nullValue | CMPI_notFound,
            value: CMPIValue::default(),
        }
    }
}

/// Outcome of an operation: return code plus optional message handle
///
/// The message, when present, must be released by the receiver.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CMPIStatus {
    pub rc: crate::rc::CMPIrc,
    pub msg: *mut CMPIString,
}

impl CMPIStatus {
    /// Status without a message
    pub const fn rc(rc: crate::rc::CMPIrc) -> Self {
        Self {
            rc,
            msg: std::ptr::null_mut(),
        }
    }

    /// `CMPI_RC_OK` without a message
    pub const fn ok() -> Self {
        Self::rc(crate::rc::CMPI_RC_OK)
    }
}

impl Default for CMPIStatus {
    fn default() -> Self {
        Self::ok()
    }
}

/// Property accessor callback used by `evaluateUsingAccessor`
pub type CMPIAccessor =
    unsafe extern "C" fn(property_name: *const c_char, parm: *mut c_void) -> CMPIData;

#[cfg(test)]
mod tests {
    use std::mem::{offset_of, size_of};

    use super::*;

    #[test]
    fn test_status_layout() {
        assert_eq!(offset_of!(CMPIStatus, msg), size_of::<usize>());
        assert_eq!(size_of::<CMPIStatus>(), 2 * size_of::<usize>());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_data_layout() {
        assert_eq!(size_of::<CMPIValue>(), 16);
        assert_eq!(offset_of!(CMPIData, state), 2);
        assert_eq!(offset_of!(CMPIData, value), 8);
        assert_eq!(size_of::<CMPIData>(), 24);
    }
}
