pub mod cli;
pub mod github;
pub mod load_config;
pub mod oauth;
pub mod tumblr;
pub mod webhook;

pub use cli::{run, Cli, Commands};
