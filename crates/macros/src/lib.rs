//! CMPI Proc Macros
//!
//! This crate provides `#[derive(CmpiProvider)]`, which turns a Rust type
//! into a loadable CMPI provider.
//!
//! # Example
//!
//! ```ignore
//! use cmpi_core::{CmpiProvider, Provider, InstanceProvider, MethodProvider};
//!
//! #[derive(CmpiProvider)]
//! #[cmpi(name = "ACME_Fan", instance, method)]
//! pub struct Fans {
//!     broker: BrokerHandle,
//! }
//!
//! // Generated:
//! // - impl ProviderExport for Fans (name, kinds, static ProviderBase)
//! // - #[no_mangle] ACME_Fan_Create_InstanceMI
//! // - #[no_mangle] ACME_Fan_Create_MethodMI
//! ```
//!
//! # Attributes
//!
//! - `#[cmpi(name = "X")]` - Optional. Provider name in the factory symbols
//!   (default: the type name). Must be a C identifier.
//! - `#[cmpi(instance, association, method, property, indication)]` - The
//!   kinds to export. At least one is required, and the type must implement
//!   the matching kind trait.

mod cmpi_provider;
mod parse;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derive macro exporting CMPI factory entry points
///
/// # Generated Code
///
/// - An `impl ProviderExport` holding the provider name, its kinds, a
///   `static` [`ProviderBase`] and `register_static` for linking the provider
///   into a host without `dlopen`
/// - For each kind, `#[no_mangle] extern "C" fn <name>_Create_<Kind>MI`
///
/// [`ProviderBase`]: ../cmpi_core/provider/struct.ProviderBase.html
#[proc_macro_derive(CmpiProvider, attributes(cmpi))]
pub fn derive_cmpi_provider(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    cmpi_provider::derive_cmpi_provider(input).into()
}
