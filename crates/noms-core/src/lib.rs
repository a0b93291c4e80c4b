pub mod config;
pub mod error;
pub mod logging;

pub mod auth;
pub mod content;
pub mod origin;
pub mod script;
pub mod useragent;

pub use error::{NomsError, Result};
