pub mod chat_client;
pub mod config;
pub mod domain;
pub mod ledger;
pub mod routes;
pub mod startup;
pub mod telemetry;
