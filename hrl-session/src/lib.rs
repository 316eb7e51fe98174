pub mod config;
pub mod session;

pub use config::{SessionConfig, CONFIG_PATH_ENV};
pub use session::Hrl;
