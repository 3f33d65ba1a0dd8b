//! `CyberLabs` - Hands-on cybersecurity training range
//!
//! This library provides the simulated terminal, lab progression, and
//! scoring engines behind the `cyberlabs` training range.

pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod ledger;
pub mod observability;
pub mod progression;
pub mod range;
pub mod scenarios;
pub mod store;
pub mod terminal;
pub mod users;
