//! Gateway types module
//!
//! - [`ApiResponse<T>`]: response envelope
//! - [`JsonBody`], [`IdPath`]: extractors that reject with the envelope

pub mod request;
pub mod response;

pub use request::{IdPath, JsonBody, RequestRejection};
pub use response::{ApiResponse, Reply, respond, respond_empty};
