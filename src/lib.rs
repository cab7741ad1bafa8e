// SDDC Group control - library root for testing

pub mod auth;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod http_client;
pub mod models;
pub mod poller;
