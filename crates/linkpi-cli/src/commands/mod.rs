//! Command implementations for linkpi-cli

pub mod get;
pub mod login;
pub mod monitor;
pub mod status;

pub use get::get;
pub use login::login;
pub use monitor::monitor;
pub use status::status;
