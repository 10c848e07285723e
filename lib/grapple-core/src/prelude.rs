//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use grapple_core::prelude::*;
//! ```

pub use crate::{
    ByteSource, Client, Error, ErrorKind, Executor, GraphQlError, Headers, Request, Response,
    Result, Transport, Upload,
};
