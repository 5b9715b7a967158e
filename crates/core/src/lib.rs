//! CMPI core
//!
//! Rust-side logic on top of the raw ABI in [`sdk`]:
//! - [`value`], [`types`], [`flags`] and [`datetime`]: owned data model
//! - [`status`]: `CmpiError`, return codes and cleanup outcomes
//! - [`handles`]: typed wrappers over incoming handles
//! - [`provider`]: traits and static MI tables for writing providers
//! - [`broker`]: an in-process reference broker hosting providers
//! - [`config`]: TOML broker configuration
//!
//! # Re-exports
//!
//! This crate re-exports the SDK and engine crates for convenience:
//! - [`sdk`] - `#[repr(C)]` CMPI types, constants and function tables
//! - [`engine`] - provider module loading and factory resolution

// Allow the crate to refer to itself as `cmpi_core` for proc macro compatibility
extern crate self as cmpi_core;

pub use cmpi_engine as engine;
pub use cmpi_sdk as sdk;

pub mod broker;
pub mod config;
pub mod datetime;
pub mod flags;
pub mod handles;
pub mod provider;
pub mod status;
pub mod types;
pub mod value;

// Re-export commonly used items
pub use broker::{
    AssocFilter, Broker, BrokerBuilder, IndicationEvent, MethodOutput, ProviderKey,
    ProviderRegistration, ProviderRegistry, RequestContext,
};
pub use config::{BrokerConfig, ConfigError, ConfigResult, ProviderConfig};
pub use datetime::CimDateTime;
pub use flags::{Capabilities, InvocationFlags, ValueState};
pub use handles::BrokerHandle;
pub use provider::{
    AssociationProvider, IndicationProvider, InstanceProvider, MethodProvider, PropertyProvider,
    Provider, ProviderBase, ProviderExport, QueryFilter,
};
pub use status::{CleanupOutcome, CmpiError, CmpiResult, ReturnCode};
pub use value::{ArrayData, Data, ErrorData, InstanceData, NamedData, ObjectPathData, SelectExpData, Value};

// Re-export macros
pub use cmpi_macros::CmpiProvider;

#[cfg(test)]
mod tests {
    #[test]
    fn test_sdk_types_exist() {
        use crate::sdk::CMPIBroker;
        let _: *const CMPIBroker = std::ptr::null();
        assert_eq!(crate::sdk::CMPICurrentVersion, 210);
    }
}
