// file: src/steps/database.rs
// version: 1.0.0
// guid: e8b2d640-97fc-4a1e-8c35-5f06a9d3b7e1

//! PostgreSQL server, credentials, access rules, roles and database

use super::{RunContext, Stage};
use crate::config::DatabaseConfig;
use crate::error::ProvisionError;
use crate::platform::ServiceAction;
use crate::resource::{
    AptPackages, BoxedResource, ConvergeSummary, LineInFile, ManagedFile, PgDatabase,
    PgDatabaseGrant, PgPassword, PgRole, Placement, Psql, ServiceRunning,
};
use crate::security::{pgpass, CredentialSource, Credentials, SECRET_FILE_MODE};
use crate::Result;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where Debian-family packages keep cluster configuration
pub const CLUSTER_CONFIG_ROOT: &str = "/etc/postgresql";

/// Highest cluster version in a listing of the configuration root
pub fn latest_cluster_version(listing: &str) -> Option<String> {
    listing
        .split_whitespace()
        .filter_map(|entry| {
            let mut parts = entry.splitn(2, '.');
            let major = parts.next()?.parse::<u32>().ok()?;
            let minor = match parts.next() {
                Some(minor) => minor.parse::<u32>().ok()?,
                None => 0,
            };
            Some(((major, minor), entry.to_string()))
        })
        .max_by_key(|(key, _)| *key)
        .map(|(_, entry)| entry)
}

/// Access rules for the application role, local socket and loopback
pub fn hba_entries(db: &DatabaseConfig) -> Vec<String> {
    vec![
        format!("local   {}   {}   {}", db.name, db.app_user, db.auth_method),
        format!(
            "host    {}   {}   127.0.0.1/32   {}",
            db.name, db.app_user, db.auth_method
        ),
        format!(
            "host    {}   {}   ::1/128   {}",
            db.name, db.app_user, db.auth_method
        ),
    ]
}

fn server_config_resources(db: &DatabaseConfig, cluster_dir: &Path) -> Result<Vec<BoxedResource>> {
    let first_rule = Regex::new(r"^\s*(local|host)")?;
    let mut resources: Vec<BoxedResource> = hba_entries(db)
        .into_iter()
        .map(|line| {
            Box::new(
                LineInFile::new(cluster_dir.join("pg_hba.conf"), line, 0o640)
                    .placed(Placement::BeforeFirst(first_rule.clone()))
                    .privileged(),
            ) as BoxedResource
        })
        .collect();

    resources.push(Box::new(
        LineInFile::new(
            cluster_dir.join("postgresql.conf"),
            format!("listen_addresses = '{}'", db.listen_addresses),
            0o644,
        )
        .replacing(Regex::new(r"^\s*#?\s*listen_addresses\s*=")?)
        .privileged(),
    ));
    Ok(resources)
}

/// Provisions the database server and the application database
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseStage;

impl DatabaseStage {
    async fn cluster_dir(&self, ctx: &RunContext) -> Result<Option<PathBuf>> {
        let listing = ctx
            .host
            .exec
            .execute_with_output(&format!("ls -1 {} 2>/dev/null || true", CLUSTER_CONFIG_ROOT))
            .await?;
        Ok(latest_cluster_version(&listing)
            .map(|version| PathBuf::from(CLUSTER_CONFIG_ROOT).join(version).join("main")))
    }

    async fn resolve_credentials(
        &self,
        ctx: &RunContext,
        summary: &mut ConvergeSummary,
    ) -> Result<Credentials> {
        let db = &ctx.config.database;
        let pgpass_file = &ctx.paths.pgpass_file;
        let existing = ctx.host.exec.read_file(pgpass_file, false).await?;

        let (credentials, source) =
            Credentials::resolve(ctx.options.credential_policy, db, existing.as_deref());
        match source {
            CredentialSource::Reused => {
                info!("Reusing database credentials from {}", pgpass_file.display())
            }
            CredentialSource::Generated => info!("Generated new database credentials"),
        }

        let merged = pgpass::merge(
            existing.as_deref().unwrap_or_default(),
            &credentials.pgpass_entries(db),
        );
        let files: Vec<BoxedResource> = vec![
            Box::new(ManagedFile::new(pgpass_file, merged, SECRET_FILE_MODE)),
            Box::new(ManagedFile::new(
                &ctx.paths.credentials_file,
                credentials.render_reference(db, pgpass_file),
                SECRET_FILE_MODE,
            )),
        ];
        ctx.reconciler
            .converge_all(&ctx.host, &files, summary)
            .await?;
        Ok(credentials)
    }
}

#[async_trait::async_trait]
impl Stage for DatabaseStage {
    fn name(&self) -> &'static str {
        "database"
    }

    fn description(&self) -> &'static str {
        "Provision PostgreSQL"
    }

    async fn run(&self, ctx: &mut RunContext) -> Result<ConvergeSummary> {
        let db = ctx.config.database.clone();
        let mut summary = ConvergeSummary::default();

        let server: Vec<BoxedResource> = vec![
            Box::new(AptPackages::new("postgresql", db.packages.clone())),
            Box::new(ServiceRunning::new(&db.service)),
        ];
        ctx.reconciler
            .converge_all(&ctx.host, &server, &mut summary)
            .await?;
        let server_pending = !summary.planned.is_empty();

        let credentials = self.resolve_credentials(ctx, &mut summary).await?;

        if server_pending {
            info!("DRY RUN: database server not installed yet, skipping server configuration and roles");
            ctx.credentials = Some(credentials);
            return Ok(summary);
        }

        let cluster_dir = self.cluster_dir(ctx).await?.ok_or_else(|| {
            ProvisionError::verification(format!("no PostgreSQL cluster under {}", CLUSTER_CONFIG_ROOT))
        })?;
        info!("Configuring cluster in {}", cluster_dir.display());

        let server_config = server_config_resources(&db, &cluster_dir)?;
        let reconfigured = ctx
            .reconciler
            .converge_all(&ctx.host, &server_config, &mut summary)
            .await?;
        if reconfigured {
            info!("Server configuration changed, restarting {}", db.service);
            ctx.host
                .platform
                .control_service(ctx.host.exec.as_ref(), &db.service, ServiceAction::Restart)
                .await?;
        }

        let psql = Psql {
            host: db.host.clone(),
            port: db.port,
            pgpass_file: ctx.paths.pgpass_file.clone(),
        };
        let roles: Vec<BoxedResource> = vec![
            Box::new(PgRole {
                psql: psql.clone(),
                name: credentials.app_username.clone(),
                password: credentials.app_password.clone(),
            }),
            Box::new(PgDatabase {
                psql: psql.clone(),
                name: credentials.database_name.clone(),
                owner: credentials.app_username.clone(),
            }),
            Box::new(PgDatabaseGrant {
                psql: psql.clone(),
                database: credentials.database_name.clone(),
                role: credentials.app_username.clone(),
            }),
            Box::new(PgPassword {
                psql: psql.clone(),
                role: credentials.admin_username.clone(),
                password: credentials.admin_password.clone(),
                database: "postgres".to_string(),
            }),
            Box::new(PgPassword {
                psql: psql.clone(),
                role: credentials.app_username.clone(),
                password: credentials.app_password.clone(),
                database: credentials.database_name.clone(),
            }),
        ];
        ctx.reconciler
            .converge_all(&ctx.host, &roles, &mut summary)
            .await?;

        let check = psql.client_command(
            &credentials.app_username,
            &credentials.database_name,
            "SHOW server_version",
        );
        let verified = ctx.verify("database connectivity", &check).await;
        match verified {
            Ok(Some(version)) => {
                info!("✓ Connected to PostgreSQL {} as {}", version, credentials.app_username);
                ctx.versions.insert("postgresql".to_string(), version);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("⚠ {}", e);
                summary.warn(e.to_string());
            }
        }

        ctx.credentials = Some(credentials);
        Ok(summary)
    }
}
