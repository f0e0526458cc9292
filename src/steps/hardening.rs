// file: src/steps/hardening.rs
// version: 1.0.0
// guid: 4d61a8f3-3c27-4e95-b0d8-9e1f52c7a6b4

//! Production hardening: firewall, system environment, reverse proxy and
//! kernel/resource limits

use super::{RunContext, Stage};
use crate::config::{InstallMode, ProductionConfig};
use crate::platform::ServiceAction;
use crate::resource::{
    AbsentFile, AptPackages, BoxedResource, ConvergeSummary, FirewallEnabled, FirewallRule,
    LineInFile, ManagedFile, ServiceRunning, Symlink,
};
use crate::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

pub const NGINX_SITES_AVAILABLE: &str = "/etc/nginx/sites-available";
pub const NGINX_SITES_ENABLED: &str = "/etc/nginx/sites-enabled";

/// Reverse proxy site in front of the application
pub fn render_nginx_site(server_name: &str, upstream_port: u16) -> String {
    format!(
        r#"# Managed by devhost-provisioner
server {{
    listen 80;
    listen [::]:80;
    server_name {server_name};

    location / {{
        proxy_pass         http://127.0.0.1:{upstream_port};
        proxy_http_version 1.1;
        proxy_set_header   Upgrade $http_upgrade;
        proxy_set_header   Connection keep-alive;
        proxy_set_header   Host $host;
        proxy_cache_bypass $http_upgrade;
        proxy_set_header   X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header   X-Forwarded-Proto $scheme;
    }}
}}
"#
    )
}

/// `/etc/security/limits.d` fragment
pub fn render_limits(user: &str, nofile: u64, nproc: u64) -> String {
    let mut out = String::from("# Managed by devhost-provisioner\n");
    for (item, value) in [("nofile", nofile), ("nproc", nproc)] {
        for kind in ["soft", "hard"] {
            out.push_str(&format!("{} {} {} {}\n", user, kind, item, value));
        }
    }
    out
}

/// `/etc/sysctl.d` fragment; keys are emitted in sorted order
pub fn render_sysctl(values: &BTreeMap<String, String>) -> String {
    let mut out = String::from("# Managed by devhost-provisioner\n");
    for (key, value) in values {
        out.push_str(&format!("{} = {}\n", key, value));
    }
    out
}

fn environment_lines(production: &ProductionConfig) -> Result<Vec<BoxedResource>> {
    production
        .environment
        .iter()
        .map(|(key, value)| -> Result<BoxedResource> {
            let matcher = Regex::new(&format!(r"^\s*{}=", regex::escape(key)))?;
            Ok(Box::new(
                LineInFile::new(&production.environment_file, format!("{}={}", key, value), 0o644)
                    .replacing(matcher)
                    .privileged(),
            ) as BoxedResource)
        })
        .collect()
}

/// Hardening applied only in production mode
#[derive(Debug, Clone, Copy, Default)]
pub struct HardeningStage;

impl HardeningStage {
    async fn firewall(&self, ctx: &RunContext, summary: &mut ConvergeSummary) -> Result<()> {
        let mut resources: Vec<BoxedResource> = ctx
            .config
            .production
            .firewall_rules
            .iter()
            .map(|rule| Box::new(FirewallRule { rule: rule.clone() }) as BoxedResource)
            .collect();
        resources.push(Box::new(FirewallEnabled));
        ctx.reconciler
            .converge_all(&ctx.host, &resources, summary)
            .await?;
        Ok(())
    }

    async fn reverse_proxy(&self, ctx: &RunContext, summary: &mut ConvergeSummary) -> Result<()> {
        let production = &ctx.config.production;
        let available = PathBuf::from(NGINX_SITES_AVAILABLE).join(&production.nginx_site);

        let server: Vec<BoxedResource> = vec![
            Box::new(AptPackages::new("nginx", vec!["nginx".to_string()])),
            Box::new(ServiceRunning::new("nginx")),
        ];
        ctx.reconciler
            .converge_all(&ctx.host, &server, summary)
            .await?;

        let site: Vec<BoxedResource> = vec![
            Box::new(
                ManagedFile::new(
                    &available,
                    render_nginx_site(&production.server_name, production.upstream_port),
                    0o644,
                )
                .privileged(),
            ),
            Box::new(Symlink {
                link: PathBuf::from(NGINX_SITES_ENABLED).join(&production.nginx_site),
                target: available.clone(),
            }),
            Box::new(AbsentFile {
                path: PathBuf::from(NGINX_SITES_ENABLED).join("default"),
            }),
        ];
        let changed = ctx
            .reconciler
            .converge_all(&ctx.host, &site, summary)
            .await?;

        if changed {
            ctx.verify("nginx configuration", "sudo nginx -t").await?;
            info!("Reloading nginx");
            ctx.host
                .platform
                .control_service(ctx.host.exec.as_ref(), "nginx", ServiceAction::Reload)
                .await?;
        }
        Ok(())
    }

    async fn kernel_tuning(&self, ctx: &RunContext, summary: &mut ConvergeSummary) -> Result<()> {
        let production = &ctx.config.production;

        let limits: Vec<BoxedResource> = vec![Box::new(
            ManagedFile::new(
                &production.limits_file,
                render_limits(
                    &production.limits_user,
                    production.nofile_limit,
                    production.nproc_limit,
                ),
                0o644,
            )
            .privileged(),
        )];
        ctx.reconciler
            .converge_all(&ctx.host, &limits, summary)
            .await?;

        let sysctl: Vec<BoxedResource> = vec![Box::new(
            ManagedFile::new(&production.sysctl_file, render_sysctl(&production.sysctl), 0o644)
                .privileged(),
        )];
        let changed = ctx
            .reconciler
            .converge_all(&ctx.host, &sysctl, summary)
            .await?;
        if changed {
            info!("Applying kernel parameters");
            ctx.host.exec.execute_with_output("sudo sysctl --system").await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Stage for HardeningStage {
    fn name(&self) -> &'static str {
        "hardening"
    }

    fn description(&self) -> &'static str {
        "Apply production hardening"
    }

    fn enabled(&self, ctx: &RunContext) -> bool {
        ctx.options.mode == InstallMode::Production
    }

    async fn run(&self, ctx: &mut RunContext) -> Result<ConvergeSummary> {
        let mut summary = ConvergeSummary::default();

        self.firewall(ctx, &mut summary).await?;

        let environment = environment_lines(&ctx.config.production)?;
        ctx.reconciler
            .converge_all(&ctx.host, &environment, &mut summary)
            .await?;

        self.reverse_proxy(ctx, &mut summary).await?;
        self.kernel_tuning(ctx, &mut summary).await?;
        Ok(summary)
    }
}
