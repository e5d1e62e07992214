pub mod arguments;
pub mod client;
pub mod config;
pub mod errors;
pub mod logger;
pub mod poller;
pub mod reconciler;
pub mod records;
pub mod run;
pub mod webserver;
