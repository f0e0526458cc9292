// file: src/security/mod.rs
// version: 2.0.0
// guid: p6q7r8s9-t0u1-2345-6789-012345pqrstu

//! Database credentials and the password file that persists them

pub mod credentials;
pub mod pgpass;

pub use credentials::{CredentialSource, Credentials};
pub use pgpass::PgPassEntry;

/// Mode for files holding secrets
pub const SECRET_FILE_MODE: u32 = 0o600;
