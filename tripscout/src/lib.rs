//! TripScout - conversational accommodation search
//!
//! Bridges two line-delimited JSON-RPC workers (accommodation listings and
//! points of interest) with a text-generation model that reads requests and
//! writes reports.

pub mod aggregate;
pub mod assistant;
pub mod cli;
pub mod config;
pub mod domain;
pub mod llm;
pub mod prompts;
pub mod rpc;
pub mod services;
pub mod session;

pub use config::Config;
