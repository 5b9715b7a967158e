//! CMPI Engine - Provider Module Loading
//!
//! This crate handles:
//! - Opening provider modules (`lib<module>.so`) with `dlopen`
//! - Resolving `<name>_Create_<Kind>MI` factory symbols, falling back to the
//!   module's `_Generic_Create_<Kind>MI` entry point
//! - Registering in-process factories for providers linked into the host
//!
//! # Architecture
//!
//! A [`ProviderFactory`] pairs a provider name with where its factories live
//! (a loaded [`ProviderLibrary`] or a [`StaticFactories`] table). The broker
//! calls [`ProviderFactory::create`] lazily, once per provider kind, and keeps
//! the returned MI handle until cleanup.

pub mod error;
pub mod kind;
pub mod loader;

pub use error::LoadError;
pub use kind::MiKind;
pub use loader::{library_file_name, ProviderFactory, ProviderLibrary, StaticFactories};
