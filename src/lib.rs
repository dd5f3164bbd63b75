pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod poller;
pub mod routes;
pub mod service;
pub mod simulator;
