pub mod app;
pub mod config;
pub mod detail;
pub mod filter;
pub mod genres;
pub mod models;
pub mod ratings;
pub mod render;
pub mod search;
pub mod stars;
pub mod tmdb;

pub use config::Config;
