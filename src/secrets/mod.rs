//! Secret-store access layer.
//!
//! The certificate providers in [`crate::pki`] depend on one narrow
//! contract: authenticated `read_field`/`write` operations against logical
//! paths in a remote secret store. This module defines that contract
//! ([`SecretStoreAccessor`]), its production implementation over HashiCorp
//! Vault's logical HTTP API ([`VaultAccessor`]), and an in-memory
//! implementation for tests ([`MockAccessor`]).
//!
//! # Security
//!
//! - The Vault token and all private-key material are carried in
//!   [`SecretString`], which redacts in Debug/Display/serialization and
//!   zeroes its memory on drop.
//! - No secret value is ever logged; log events carry paths and field
//!   names only.

pub mod accessor;
pub mod error;
pub mod mock;
pub mod types;

pub use accessor::{SecretStoreAccessor, VaultAccessor};
pub use error::AccessorError;
pub use mock::MockAccessor;
pub use types::SecretString;
