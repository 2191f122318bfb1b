pub mod client;
pub mod config;
pub mod errors;
pub mod game;
pub mod models;
pub mod routes;
pub mod store;
