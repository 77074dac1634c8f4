pub mod analytics;
pub mod config;
pub mod logging;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod store;
