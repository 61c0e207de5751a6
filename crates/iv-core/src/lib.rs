//! iv-core: the error type shared by every imagevault crate.
//!
//! Library crates return [`Result`]; the server maps [`Error::http_status`]
//! onto responses and the binary wraps everything in `anyhow`.

pub mod error;

pub use error::{Error, Result};
