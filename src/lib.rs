// Kasasagi image server library

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod markers;
pub mod metrics;
pub mod pipeline;
pub mod request;
pub mod request_coalescing;
pub mod server;
pub mod storage;
pub mod transform;
