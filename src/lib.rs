pub mod cli;
pub mod commands;
pub mod config;

pub use taskmark_core as core;
pub use taskmark_core::model;
pub use taskmark_core::parser;
pub use taskmark_core::AppConfig;

pub use taskmark_mcp as mcp;
