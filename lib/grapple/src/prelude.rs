//! Prelude module for convenient imports.
//!
//! ```ignore
//! use grapple::prelude::*;
//! ```

pub use crate::{
    ByteSource, ClientConfig, Error, ErrorKind, Executor, GraphQlClient, GraphQlError, Headers,
    HyperTransport, Request, Response, Result, Upload,
};
pub use serde::{Deserialize, Serialize};
