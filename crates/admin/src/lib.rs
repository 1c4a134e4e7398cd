//! Boletos Admin library.
//!
//! This crate provides the receivables panel as a library, allowing it to
//! be tested against an in-memory backend and reused by the CLI.
//!
//! # Security
//!
//! The panel has no login of its own and holds a Supabase API key that can
//! write every table it serves. Deploy it behind an authenticating proxy or
//! on a private network only.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod filters;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
