pub mod cache;
pub mod config;
pub mod data_source;
pub mod handlers;
pub mod hls;
pub mod provider;
pub mod request_handler;
pub mod server;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use server::{run_server, AppState};
