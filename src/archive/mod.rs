//! Cassette archive: JSON codec and the per-file session store

pub mod format;
mod store;

pub use format::{decode, encode, Archive, Headers, Interaction, Request, Response};
pub use store::Session;
