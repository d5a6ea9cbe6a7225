//! Cashgate - merchant-side cash payment gateway
//!
//! This library bridges a web shop to a cash-payment provider: it creates
//! payment slips over the provider API, keeps a per-order transaction record,
//! verifies inbound status webhooks, and reconciles them against order state.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod provider;
pub mod reconcile;
