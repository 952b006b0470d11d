pub mod api;
pub mod clients;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod intake;
pub mod models;
pub mod producer;
pub mod worker;
