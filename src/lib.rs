//! Cassette - record and replay HTTP interactions
//!
//! A cassette client wraps an HTTP transport. Requests already recorded in
//! the cassette file are answered from it; anything else is sent for real
//! and appended, depending on the [`RecordMode`].

#![deny(unsafe_code)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::multiple_crate_versions
)]

pub mod archive;
pub mod client;
pub mod config;
pub mod error;
pub mod matcher;
pub mod policy;
pub mod transport;

pub use archive::{Archive, Interaction, Request, Response, Session};
pub use client::{AsyncCassetteClient, CassetteClient};
pub use config::{Config, RecordMode};
pub use error::{CassetteError, Result};
