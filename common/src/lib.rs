pub mod auth_client;
pub mod config;
pub mod models;
pub mod utils;

pub use self::auth_client::*;
pub use self::config::*;
pub use self::models::session::Session;
pub use self::utils::*;
