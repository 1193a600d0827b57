pub mod browser;
pub mod config;
pub mod error;
pub mod hover;
pub mod posts;
pub mod schedule;
pub mod settings;
pub mod tags;
pub mod worker;
