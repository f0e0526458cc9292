// file: src/resource/postgres.rs
// version: 1.0.0
// guid: 2c5b8e03-f14a-4d96-b7c8-6a3e1d0f95b2

//! PostgreSQL roles, passwords and databases
//!
//! Administrative SQL runs as the `postgres` OS user over the local socket
//! and is fed on stdin, so passwords never appear on a command line.

use super::{FailurePolicy, HostContext, Resource, ResourceState};
use crate::network::CommandExecutor;
use crate::utils::{shell_quote, sql_ident, sql_literal};
use crate::Result;
use std::path::PathBuf;

/// How to reach the database server
#[derive(Debug, Clone)]
pub struct Psql {
    pub host: String,
    pub port: u16,
    pub pgpass_file: PathBuf,
}

impl Psql {
    /// Run SQL as the database superuser, returning unaligned tuples
    pub async fn admin_query(&self, exec: &dyn CommandExecutor, sql: &str) -> Result<String> {
        let command = format!(
            "cd / && sudo -u postgres psql -X -q -t -A -v ON_ERROR_STOP=1 -p {} -d postgres",
            self.port
        );
        let out = exec.execute_with_input(&command, sql).await?;
        Ok(out.trim().to_string())
    }

    /// Command line that authenticates over TCP with the password file
    pub fn client_command(&self, user: &str, database: &str, sql: &str) -> String {
        format!(
            "PGPASSFILE={} psql -X -w -h {} -p {} -U {} -d {} -tAc {}",
            shell_quote(&self.pgpass_file.to_string_lossy()),
            shell_quote(&self.host),
            self.port,
            shell_quote(user),
            shell_quote(database),
            shell_quote(sql)
        )
    }

    /// Whether `user` can log in to `database` with the stored password
    pub async fn can_login(
        &self,
        exec: &dyn CommandExecutor,
        user: &str,
        database: &str,
    ) -> Result<bool> {
        let command = format!(
            "{} >/dev/null 2>&1",
            self.client_command(user, database, "SELECT 1")
        );
        exec.check_silent(&command).await
    }
}

/// A login role
#[derive(Debug, Clone)]
pub struct PgRole {
    pub psql: Psql,
    pub name: String,
    pub password: String,
}

#[async_trait::async_trait]
impl Resource for PgRole {
    fn id(&self) -> String {
        format!("pg-role:{}", self.name)
    }

    fn kind(&self) -> &'static str {
        "pg-role"
    }

    async fn observe(&self, host: &HostContext) -> Result<ResourceState> {
        let sql = format!(
            "SELECT 1 FROM pg_roles WHERE rolname = {};",
            sql_literal(&self.name)
        );
        let found = self.psql.admin_query(host.exec.as_ref(), &sql).await?;
        Ok(if found == "1" {
            ResourceState::Converged
        } else {
            ResourceState::Missing
        })
    }

    async fn apply(&self, host: &HostContext, _observed: &ResourceState) -> Result<()> {
        let sql = format!(
            "CREATE ROLE {} WITH LOGIN PASSWORD {};",
            sql_ident(&self.name),
            sql_literal(&self.password)
        );
        self.psql.admin_query(host.exec.as_ref(), &sql).await.map(|_| ())
    }
}

/// A role's password, observed by logging in with it
#[derive(Debug, Clone)]
pub struct PgPassword {
    pub psql: Psql,
    pub role: String,
    pub password: String,
    pub database: String,
}

#[async_trait::async_trait]
impl Resource for PgPassword {
    fn id(&self) -> String {
        format!("pg-password:{}", self.role)
    }

    fn kind(&self) -> &'static str {
        "pg-password"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Soft
    }

    async fn observe(&self, host: &HostContext) -> Result<ResourceState> {
        let ok = self
            .psql
            .can_login(host.exec.as_ref(), &self.role, &self.database)
            .await?;
        Ok(if ok {
            ResourceState::Converged
        } else {
            ResourceState::Drifted("stored password rejected".to_string())
        })
    }

    async fn apply(&self, host: &HostContext, _observed: &ResourceState) -> Result<()> {
        let sql = format!(
            "ALTER ROLE {} WITH PASSWORD {};",
            sql_ident(&self.role),
            sql_literal(&self.password)
        );
        self.psql.admin_query(host.exec.as_ref(), &sql).await.map(|_| ())
    }
}

/// A database with a declared owner
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pub psql: Psql,
    pub name: String,
    pub owner: String,
}

#[async_trait::async_trait]
impl Resource for PgDatabase {
    fn id(&self) -> String {
        format!("pg-database:{}", self.name)
    }

    fn kind(&self) -> &'static str {
        "pg-database"
    }

    async fn observe(&self, host: &HostContext) -> Result<ResourceState> {
        let sql = format!(
            "SELECT pg_get_userbyid(datdba) FROM pg_database WHERE datname = {};",
            sql_literal(&self.name)
        );
        let owner = self.psql.admin_query(host.exec.as_ref(), &sql).await?;
        Ok(if owner.is_empty() {
            ResourceState::Missing
        } else if owner == self.owner {
            ResourceState::Converged
        } else {
            ResourceState::Drifted(format!("owned by {}", owner))
        })
    }

    async fn apply(&self, host: &HostContext, observed: &ResourceState) -> Result<()> {
        let sql = match observed {
            ResourceState::Missing => format!(
                "CREATE DATABASE {} OWNER {};",
                sql_ident(&self.name),
                sql_ident(&self.owner)
            ),
            _ => format!(
                "ALTER DATABASE {} OWNER TO {};",
                sql_ident(&self.name),
                sql_ident(&self.owner)
            ),
        };
        self.psql.admin_query(host.exec.as_ref(), &sql).await.map(|_| ())
    }
}

const DATABASE_PRIVILEGES: [&str; 3] = ["CREATE", "CONNECT", "TEMPORARY"];

/// Query returning `t` only when `role` holds every database privilege
///
/// A comma-separated list passed to `has_database_privilege` is satisfied
/// by any one of its entries, and PUBLIC holds CONNECT and TEMPORARY by
/// default, so each privilege is checked on its own.
pub fn grant_check_sql(role: &str, database: &str) -> String {
    let checks: Vec<String> = DATABASE_PRIVILEGES
        .iter()
        .map(|privilege| {
            format!(
                "has_database_privilege({}, {}, '{}')",
                sql_literal(role),
                sql_literal(database),
                privilege
            )
        })
        .collect();
    format!("SELECT {};", checks.join(" AND "))
}

/// All database-level privileges for a role
#[derive(Debug, Clone)]
pub struct PgDatabaseGrant {
    pub psql: Psql,
    pub database: String,
    pub role: String,
}

#[async_trait::async_trait]
impl Resource for PgDatabaseGrant {
    fn id(&self) -> String {
        format!("pg-grant:{}:{}", self.database, self.role)
    }

    fn kind(&self) -> &'static str {
        "pg-grant"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Soft
    }

    async fn observe(&self, host: &HostContext) -> Result<ResourceState> {
        let sql = grant_check_sql(&self.role, &self.database);
        let granted = self.psql.admin_query(host.exec.as_ref(), &sql).await?;
        Ok(if granted == "t" {
            ResourceState::Converged
        } else {
            ResourceState::Missing
        })
    }

    async fn apply(&self, host: &HostContext, _observed: &ResourceState) -> Result<()> {
        let sql = format!(
            "GRANT ALL PRIVILEGES ON DATABASE {} TO {};",
            sql_ident(&self.database),
            sql_ident(&self.role)
        );
        self.psql.admin_query(host.exec.as_ref(), &sql).await.map(|_| ())
    }
}
