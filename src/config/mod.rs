//! Configuration loading.

pub mod settings;

pub use settings::{KeyBackend, Settings};
