pub mod cache;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod rate_limit;
pub mod response;
pub mod source;
