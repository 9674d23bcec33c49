pub mod app;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod domain;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod store;
