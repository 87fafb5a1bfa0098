//! Core types for the ephemeral backend test harness.
//!
//! This crate provides the shared data model:
//! - `Options` - Session configuration, including the preparation hook
//! - `Endpoints` - The discovered API and admin base URLs
//! - `SessionToken` - Random correlation key for one session
//! - `RequestTemplate` / `User` - Caller identity headers

pub mod config;
pub mod endpoints;
pub mod error;
pub mod identity;
pub mod token;

pub use config::{Options, PrepareHook};
pub use endpoints::Endpoints;
pub use error::CoreError;
pub use identity::{RequestTemplate, User};
pub use token::SessionToken;
