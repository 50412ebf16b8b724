pub mod cli;
pub mod config;
pub mod credits;
pub mod ingress;
pub mod ledger;
pub mod logging;
pub mod moderation;
pub mod platform;
pub mod ranks;
pub mod reconcile;
pub mod restriction;
pub mod server;
pub mod types;
