pub mod audit;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod keystore;
pub mod lockout;
pub mod logging;
pub mod platform;
pub mod vault;
