//! Type tag predicates
//!
//! A `CMPIType` is a bitmask: category bits select simple, real, unsigned,
//! signed or encapsulated types and `CMPI_ARRAY` is OR'd onto any of them.
//! The predicates here test categories with mask-and-compare exactly as C
//! providers do, so that deprecated synonyms and string subtypes classify
//! the same way they do on the C side.

use std::borrow::Cow;

use crate::sdk::*;

/// Whether the array bit is set
pub const fn is_array(ty: CMPIType) -> bool {
    ty & CMPI_ARRAY != 0
}

/// Tag with the array bit cleared
pub const fn element_type(ty: CMPIType) -> CMPIType {
    ty & !CMPI_ARRAY
}

/// Array tag for an element tag
pub const fn array_of(ty: CMPIType) -> CMPIType {
    ty | CMPI_ARRAY
}

/// Signed integer element type (tested before the unsigned test, since
/// `CMPI_SINT` contains the `CMPI_UINT` bit)
pub const fn is_sint(ty: CMPIType) -> bool {
    !is_encapsulated(ty) && element_type(ty) & CMPI_SINT == CMPI_SINT
}

pub const fn is_uint(ty: CMPIType) -> bool {
    !is_encapsulated(ty) && !is_sint(ty) && element_type(ty) & CMPI_UINT == CMPI_UINT
}

pub const fn is_integer(ty: CMPIType) -> bool {
    is_sint(ty) || is_uint(ty)
}

pub const fn is_real(ty: CMPIType) -> bool {
    !is_encapsulated(ty) && !is_integer(ty) && element_type(ty) & CMPI_REAL == CMPI_REAL
}

pub const fn is_encapsulated(ty: CMPIType) -> bool {
    element_type(ty) & CMPI_ENC == CMPI_ENC
}

/// `CMPI_boolean` or `CMPI_char16`
pub const fn is_simple(ty: CMPIType) -> bool {
    matches!(element_type(ty), CMPI_boolean | CMPI_char16)
}

/// String-valued tags, including the predicate string subtypes
pub const fn is_string(ty: CMPIType) -> bool {
    let t = element_type(ty);
    t == CMPI_chars || t == CMPI_charsptr || (t & !0x0007) == CMPI_string
}

/// Types usable as object path key bindings
///
/// The scalars behind the `CMPI_key*` tags qualify: integers, booleans,
/// char16, strings, datetimes and references. Reals and arrays do not.
pub const fn is_key_type(ty: CMPIType) -> bool {
    if is_array(ty) || is_real(ty) {
        return false;
    }
    is_simple(ty) || is_integer(ty) || is_string(ty) || ty == CMPI_dateTime || ty == CMPI_ref
}

/// Size in bytes of the scalar payload for numeric tags, 0 otherwise
pub const fn scalar_size(ty: CMPIType) -> usize {
    match element_type(ty) {
        CMPI_boolean | CMPI_uint8 | CMPI_sint8 => 1,
        CMPI_char16 | CMPI_uint16 | CMPI_sint16 => 2,
        CMPI_uint32 | CMPI_sint32 | CMPI_real32 => 4,
        CMPI_uint64 | CMPI_sint64 | CMPI_real64 => 8,
        _ => 0,
    }
}

/// Human-readable tag name, e.g. `uint32` or `string[]`
pub fn type_name(ty: CMPIType) -> Cow<'static, str> {
    let base = match element_type(ty) {
        CMPI_null => "null",
        CMPI_boolean => "boolean",
        CMPI_char16 => "char16",
        CMPI_real32 => "real32",
        CMPI_real64 => "real64",
        CMPI_uint8 => "uint8",
        CMPI_uint16 => "uint16",
        CMPI_uint32 => "uint32",
        CMPI_uint64 => "uint64",
        CMPI_sint8 => "sint8",
        CMPI_sint16 => "sint16",
        CMPI_sint32 => "sint32",
        CMPI_sint64 => "sint64",
        CMPI_instance => "instance",
        CMPI_ref => "ref",
        CMPI_args => "args",
        CMPI_class => "class",
        CMPI_filter => "filter",
        CMPI_enumeration => "enumeration",
        CMPI_string => "string",
        CMPI_chars => "chars",
        CMPI_dateTime => "dateTime",
        CMPI_ptr => "ptr",
        CMPI_charsptr => "charsptr",
        CMPI_integerString => "integerString",
        CMPI_realString => "realString",
        CMPI_numericString => "numericString",
        CMPI_booleanString => "booleanString",
        CMPI_dateTimeString => "dateTimeString",
        CMPI_classNameString => "classNameString",
        CMPI_nameString => "nameString",
        other => return Cow::Owned(format!("unknown(0x{other:04x})")),
    };
    if is_array(ty) {
        Cow::Owned(format!("{base}[]"))
    } else {
        Cow::Borrowed(base)
    }
}
