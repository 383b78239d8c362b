#![doc = "statbank-core: protocol logic for loading data into Statbank."]

//! This crate holds everything between a table's extract description and the
//! loader's answer: validation of the data against the description, the
//! multipart wire encoding, the authorization header, the transfer
//! orchestration and parsing of the loader's status message.
//!
//! Network and terminal access live behind the traits in [`contract`]; the
//! `statbank` binary crate supplies the real implementations.

pub mod auth;
pub mod config;
pub mod contract;
pub mod data;
pub mod description;
pub mod encode;
pub mod error;
pub mod params;
pub mod response;
pub mod transfer;
pub mod validate;

pub use error::{Result, StatbankError, ValidationReport};
