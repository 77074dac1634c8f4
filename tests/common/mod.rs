pub mod app;
pub mod fixtures;
pub mod http;
