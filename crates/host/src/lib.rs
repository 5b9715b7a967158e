//! CMPI host library
//!
//! Embeds the reference broker behind a small C API. The embedding process
//! creates a broker from a TOML config, sends requests as JSON and drains
//! delivered indications. `include/cmpi_host.h` is generated at build time.
//!
//! Rust callers can use [`Host`] directly, and pass a table of linked-in
//! providers through [`Host::from_config`].

pub mod error;
pub mod ffi;
mod host;
pub mod logging;
pub mod request;

pub use error::{HostError, HostResult};
pub use host::{Host, Reply};
pub use request::{HostCall, HostRequest, PathSpec};
