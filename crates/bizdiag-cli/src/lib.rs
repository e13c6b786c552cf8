//! Library side of the `bizdiag` binary: logging setup and input loading.

#![deny(unsafe_code)]

pub mod inputs;
pub mod logging;
