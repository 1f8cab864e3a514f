//! Authentication support
//!
//! Bearer-credential management for the Askdesk client: keyring-backed
//! persistence plus the [`TokenSource`] capability handed to the request
//! client so it can read the current credential at call time.

pub mod token;

pub use token::{KeyringTokenSource, StaticTokenSource, TokenSource, TokenStore};
