pub mod apis;
pub mod arguments;
pub mod client;
pub mod config;
pub mod errors; // Structured error taxonomy
pub mod geo;
pub mod logger;
pub mod relay;
pub mod types;
pub mod webserver;

#[cfg(test)]
pub(crate) mod testing;
