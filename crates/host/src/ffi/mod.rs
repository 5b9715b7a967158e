//! C API of the host library

mod exports;

pub use exports::*;
