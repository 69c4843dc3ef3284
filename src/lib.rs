pub mod common;
pub mod connection;
pub mod error;
pub mod frame;
pub mod hub;
pub mod sampler;
pub mod server;
pub mod session;
pub mod store;
pub mod transport;
pub mod utils;
