pub mod auth;
pub mod blob;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod order;
pub mod service;
pub mod state;
pub mod store;
pub mod types;
pub mod utils;
pub mod web;
