// file: src/security/credentials.rs
// version: 1.0.0
// guid: 5d2b9e47-a8c1-4f36-b0e3-6c71f4a9d825

//! Database credentials

use super::pgpass::{self, PgPassEntry};
use crate::config::{CredentialPolicy, DatabaseConfig};
use crate::utils::CryptoUtils;
use std::fmt;
use std::path::Path;

/// Database name used for the admin entry in the password file
const ANY_DATABASE: &str = "*";

/// Credentials for the database stage
///
/// Built once per run and handed to every consumer: the role resources, the
/// password file, the reference file and the final report.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub admin_username: String,
    pub admin_password: String,
    pub app_username: String,
    pub app_password: String,
    pub database_name: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("admin_username", &self.admin_username)
            .field("admin_password", &"<redacted>")
            .field("app_username", &self.app_username)
            .field("app_password", &"<redacted>")
            .field("database_name", &self.database_name)
            .finish()
    }
}

/// Where the credentials came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Generated,
    Reused,
}

impl Credentials {
    /// Draw two independent passwords from the OS entropy source
    pub fn generate(db: &DatabaseConfig) -> Self {
        Self {
            admin_username: db.admin_user.clone(),
            admin_password: CryptoUtils::generate_password(db.password_length),
            app_username: db.app_user.clone(),
            app_password: CryptoUtils::generate_password(db.password_length),
            database_name: db.name.clone(),
        }
    }

    /// Recover credentials from a password file; both managed entries must exist
    pub fn from_pgpass(db: &DatabaseConfig, text: &str) -> Option<Self> {
        let port = db.port.to_string();
        let admin_password = pgpass::lookup(text, &db.host, &port, ANY_DATABASE, &db.admin_user)?;
        let app_password = pgpass::lookup(text, &db.host, &port, &db.name, &db.app_user)?;
        Some(Self {
            admin_username: db.admin_user.clone(),
            admin_password,
            app_username: db.app_user.clone(),
            app_password,
            database_name: db.name.clone(),
        })
    }

    /// Apply the credential policy to whatever a previous run left behind
    pub fn resolve(
        policy: CredentialPolicy,
        db: &DatabaseConfig,
        existing_pgpass: Option<&str>,
    ) -> (Self, CredentialSource) {
        if policy == CredentialPolicy::Preserve {
            if let Some(found) = existing_pgpass.and_then(|text| Self::from_pgpass(db, text)) {
                return (found, CredentialSource::Reused);
            }
        }
        (Self::generate(db), CredentialSource::Generated)
    }

    /// Managed password file entries
    pub fn pgpass_entries(&self, db: &DatabaseConfig) -> Vec<PgPassEntry> {
        vec![
            PgPassEntry::new(
                &db.host,
                db.port,
                ANY_DATABASE,
                &self.admin_username,
                &self.admin_password,
            ),
            PgPassEntry::new(
                &db.host,
                db.port,
                &self.database_name,
                &self.app_username,
                &self.app_password,
            ),
        ]
    }

    /// Human readable reference file
    pub fn render_reference(&self, db: &DatabaseConfig, pgpass_path: &Path) -> String {
        format!(
            "# Database credentials (managed by devhost-provisioner)\n\
             # Passwords are also stored in {pgpass}\n\
             \n\
             host={host}\n\
             port={port}\n\
             database={database}\n\
             \n\
             admin_username={admin_user}\n\
             admin_password={admin_pw}\n\
             \n\
             app_username={app_user}\n\
             app_password={app_pw}\n\
             \n\
             connection_string=Host={host};Port={port};Database={database};Username={app_user};Password={app_pw}\n",
            pgpass = pgpass_path.display(),
            host = db.host,
            port = db.port,
            database = self.database_name,
            admin_user = self.admin_username,
            admin_pw = self.admin_password,
            app_user = self.app_username,
            app_pw = self.app_password,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_two_independent_passwords() {
        let db = DatabaseConfig::default();
        let creds = Credentials::generate(&db);
        assert_eq!(creds.admin_password.len(), 32);
        assert_eq!(creds.app_password.len(), 32);
        assert!(CryptoUtils::is_password_charset(&creds.admin_password));
        assert!(CryptoUtils::is_password_charset(&creds.app_password));
        assert_ne!(creds.admin_password, creds.app_password);
    }

    #[test]
    fn test_resolve_preserves_existing() {
        let db = DatabaseConfig::default();
        let first = Credentials::generate(&db);
        let text = pgpass::merge("", &first.pgpass_entries(&db));

        let (again, source) = Credentials::resolve(CredentialPolicy::Preserve, &db, Some(&text));
        assert_eq!(source, CredentialSource::Reused);
        assert_eq!(again, first);

        let (rotated, source) = Credentials::resolve(CredentialPolicy::Rotate, &db, Some(&text));
        assert_eq!(source, CredentialSource::Generated);
        assert_ne!(rotated.app_password, first.app_password);
    }

    #[test]
    fn test_resolve_generates_when_partial() {
        let db = DatabaseConfig::default();
        let text = "localhost:5432:appdb:appuser:only-app\n";
        let (_, source) = Credentials::resolve(CredentialPolicy::Preserve, &db, Some(text));
        assert_eq!(source, CredentialSource::Generated);
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let creds = Credentials::generate(&DatabaseConfig::default());
        let shown = format!("{:?}", creds);
        assert!(!shown.contains(&creds.admin_password));
        assert!(shown.contains("<redacted>"));
    }

    #[test]
    fn test_reference_mentions_both_users() {
        let db = DatabaseConfig::default();
        let creds = Credentials::generate(&db);
        let text = creds.render_reference(&db, Path::new("/home/dev/.pgpass"));
        assert!(text.contains("admin_username=postgres"));
        assert!(text.contains("app_username=appuser"));
        assert!(text.contains(&creds.app_password));
    }
}
