//! imagevault - local image storage service
//!
//! This library crate exposes the configuration and HTTP layers for
//! integration testing. The storage pipeline itself lives in `iv-store`.

pub mod config;
pub mod server;
