//! CMPI SDK - Common Manageability Programming Interface ABI definitions
//!
//! This crate contains the `#[repr(C)]` layout of every CMPI handle, function
//! table and provider entry point, plus the numeric constants the ABI compares
//! by value. It has no dependencies and compiles quickly, allowing parallel
//! compilation of dependent crates.
//!
//! Field order inside each function table, argument order of each slot and
//! every constant value are part of the binary contract with existing brokers
//! and providers. New slots may only be appended at the end of a table.
//!
//! # Modules
//!
//! - [`types`] - Scalar typedefs, type tags, value states, `CMPIValue`/`CMPIData`
//! - [`rc`] - Return codes
//! - [`flags`] - Capabilities, invocation flags, context keys and diagnostic enumerants
//! - [`encaps`] - Encapsulated data type envelopes and their function tables
//! - [`broker`] - Broker envelope and the four broker service tables
//! - [`mi`] - Provider (MI) envelopes, tables and factory signatures
//! - [`versions`] - Version numbers and factory symbol naming

#![allow(non_camel_case_types, non_snake_case, non_upper_case_globals)]

/// Assert that the listed fields are consecutive pointer-sized slots ending the table
#[cfg(test)]
macro_rules! assert_slots {
    ($table:ty, [$($field:ident),+ $(,)?]) => {{
        const PTR: usize = std::mem::size_of::<usize>();
        let mut offset = None;
        $(
            let at = std::mem::offset_of!($table, $field);
            if let Some(expected) = offset {
                assert_eq!(at, expected, "{}::{} out of order", stringify!($table), stringify!($field));
            }
            offset = Some(at + PTR);
        )+
        assert_eq!(offset, Some(std::mem::size_of::<$table>()), "{} has unlisted slots", stringify!($table));
    }};
}

pub mod broker;
pub mod encaps;
pub mod flags;
pub mod mi;
pub mod rc;
pub mod types;
pub mod versions;

pub use broker::*;
pub use encaps::*;
pub use flags::*;
pub use mi::*;
pub use rc::*;
pub use types::*;
pub use versions::*;
