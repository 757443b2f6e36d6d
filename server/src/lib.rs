pub mod api;
pub mod cookies;
pub mod cron;
pub mod errors;
pub mod oauth;
pub mod poller;
pub mod routes;
pub mod server;
pub mod setup;
pub mod state;
pub mod store;
pub mod tokens;
