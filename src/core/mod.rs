//! Core application primitives (pipeline orchestration, HTTP surface)

pub mod http;
pub mod pipeline;

pub use http::*;
pub use pipeline::*;
