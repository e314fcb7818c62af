pub mod cli;
pub mod config;
pub mod model;
pub mod parse;
pub mod server;
pub mod store;
pub mod title;
