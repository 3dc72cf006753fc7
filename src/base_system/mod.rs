pub mod config;
pub mod context;
pub mod file_utils;
pub mod logging;
pub mod retry;
pub mod validate;
