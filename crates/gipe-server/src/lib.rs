pub mod config;
pub mod observability;
pub mod server;

pub use config::AppConfig;
pub use server::{GipeServer, ServerBuilder, build_app};
