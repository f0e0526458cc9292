// file: tests/common/mod.rs
// version: 1.0.0
// guid: 2f8a6d14-c37b-4e90-a1d5-7b3e09c4f682

//! Simulated host for integration tests
//!
//! `FakeHost` interprets the commands the provisioner issues against an
//! in-memory model of a Debian-family machine: packages, services, the
//! firewall, the .NET SDK, PostgreSQL roles and files.

#![allow(dead_code)]

use devhost_provisioner::config::{DistroDescriptor, ProvisionConfig, RunOptions};
use devhost_provisioner::installer::Provisioner;
use devhost_provisioner::network::{
    CommandExecutor, CommandOutput, Downloader, HostIdentity, TempArtifact,
};
use devhost_provisioner::platform::select_platform;
use devhost_provisioner::reporter::RunReport;
use devhost_provisioner::resource::HostContext;
use devhost_provisioner::security::pgpass;
use devhost_provisioner::{ProvisionError, Result};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const UBUNTU_OS_RELEASE: &str = "PRETTY_NAME=\"Ubuntu 24.04.1 LTS\"\nNAME=\"Ubuntu\"\nVERSION_ID=\"24.04\"\nVERSION_CODENAME=noble\nID=ubuntu\nID_LIKE=debian\n";
pub const DEBIAN_OS_RELEASE: &str = "PRETTY_NAME=\"Debian GNU/Linux 13 (trixie)\"\nNAME=\"Debian GNU/Linux\"\nVERSION_ID=\"13\"\nVERSION_CODENAME=trixie\nID=debian\n";
pub const FEDORA_OS_RELEASE: &str = "NAME=\"Fedora Linux\"\nVERSION_ID=40\nID=fedora\n";

pub const PG_HBA: &str = "/etc/postgresql/16/main/pg_hba.conf";
pub const PG_CONF: &str = "/etc/postgresql/16/main/postgresql.conf";
pub const SDK_VERSION: &str = "8.0.404";

const DEFAULT_PG_HBA: &str = "# Database administrative login by Unix domain socket\n\
local   all             postgres                                peer\n\
local   all             all                                     peer\n\
host    all             all             127.0.0.1/32            scram-sha-256\n\
host    all             all             ::1/128                 scram-sha-256\n";

const DEFAULT_PG_CONF: &str = "#listen_addresses = 'localhost'\t\t# what IP address(es) to listen on;\nport = 5432\nmax_connections = 100\n";

/// In-memory machine state
#[derive(Debug, Default)]
pub struct HostState {
    pub files: BTreeMap<PathBuf, String>,
    pub modes: BTreeMap<PathBuf, u32>,
    pub symlinks: BTreeMap<PathBuf, PathBuf>,
    pub packages: BTreeSet<String>,
    pub enabled: BTreeSet<String>,
    pub active: BTreeSet<String>,
    pub ufw_rules: Vec<String>,
    pub ufw_active: bool,
    pub sdks: Vec<String>,
    pub tools: BTreeSet<String>,
    pub roles: BTreeMap<String, String>,
    pub databases: BTreeMap<String, String>,
    pub grants: BTreeSet<(String, String)>,
    /// Templates for which `dotnet new` fails
    pub broken_templates: BTreeSet<String>,
    /// Tools whose installation fails
    pub broken_tools: BTreeSet<String>,
    /// Every command issued, in order, followed by its stdin if any
    pub log: Vec<String>,
}

pub struct FakeHost {
    identity: HostIdentity,
    sudo: bool,
    state: Mutex<HostState>,
}

fn ok(stdout: impl Into<String>) -> CommandOutput {
    CommandOutput {
        exit_code: 0,
        stdout: stdout.into(),
        stderr: String::new(),
    }
}

fn fail(code: i32, stderr: impl Into<String>) -> CommandOutput {
    CommandOutput {
        exit_code: code,
        stdout: String::new(),
        stderr: stderr.into(),
    }
}

fn capture(pattern: &str, text: &str) -> Option<Vec<String>> {
    let re = Regex::new(pattern).unwrap();
    re.captures(text).map(|c| {
        c.iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect()
    })
}

impl FakeHost {
    pub fn new(os_release: &str) -> Self {
        let mut state = HostState::default();
        state
            .files
            .insert(PathBuf::from("/etc/os-release"), os_release.to_string());
        state.files.insert(
            PathBuf::from("/etc/environment"),
            "PATH=\"/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin\"\n".to_string(),
        );
        state.files.insert(
            PathBuf::from("/home/dev/.bashrc"),
            "# ~/.bashrc\nalias ll='ls -alF'\n".to_string(),
        );
        state.roles.insert("postgres".to_string(), String::new());
        Self {
            identity: HostIdentity {
                user: "dev".to_string(),
                uid: 1000,
                home: PathBuf::from("/home/dev"),
            },
            sudo: true,
            state: Mutex::new(state),
        }
    }

    pub fn ubuntu() -> Self {
        Self::new(UBUNTU_OS_RELEASE)
    }

    pub fn debian() -> Self {
        Self::new(DEBIAN_OS_RELEASE)
    }

    pub fn as_root(mut self) -> Self {
        self.identity.user = "root".to_string();
        self.identity.uid = 0;
        self.identity.home = PathBuf::from("/root");
        self
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut HostState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.with_state(|s| s.files.get(Path::new(path)).cloned())
    }

    pub fn mode(&self, path: &str) -> Option<u32> {
        self.with_state(|s| s.modes.get(Path::new(path)).copied())
    }

    pub fn log(&self) -> Vec<String> {
        self.with_state(|s| s.log.clone())
    }

    pub fn clear_log(&self) {
        self.with_state(|s| s.log.clear());
    }

    /// Commands in the log containing `needle`
    pub fn issued(&self, needle: &str) -> Vec<String> {
        self.log()
            .into_iter()
            .filter(|c| c.contains(needle))
            .collect()
    }

    fn run(&self, command: &str, input: Option<&str>) -> CommandOutput {
        let mut s = self.state.lock().unwrap();
        s.log.push(match input {
            Some(input) => format!("{}\n{}", command, input),
            None => command.to_string(),
        });
        let output = simulate(&mut s, command, input);
        if !output.success() && command.ends_with("|| true") {
            return ok(output.stdout);
        }
        output
    }
}

fn install_package(s: &mut HostState, package: &str) {
    s.packages.insert(package.to_string());
    match package {
        "postgresql" => {
            s.files.insert(PathBuf::from(PG_HBA), DEFAULT_PG_HBA.to_string());
            s.files.insert(PathBuf::from(PG_CONF), DEFAULT_PG_CONF.to_string());
        }
        "nginx" => {
            s.files.insert(
                PathBuf::from("/etc/nginx/sites-available/default"),
                "server { listen 80 default_server; }\n".to_string(),
            );
            s.symlinks.insert(
                PathBuf::from("/etc/nginx/sites-enabled/default"),
                PathBuf::from("/etc/nginx/sites-available/default"),
            );
        }
        "dotnet-sdk-8.0" => s.sdks.push(SDK_VERSION.to_string()),
        _ => {}
    }
}

fn can_login(s: &HostState, login: &[String]) -> bool {
    let [pgpass_file, host, port, user, database, ..] = login else {
        return false;
    };
    let Some(text) = s.files.get(Path::new(pgpass_file)) else {
        return false;
    };
    let stored = pgpass::lookup(text, host, port, database, user)
        .or_else(|| pgpass::lookup(text, host, port, "*", user));
    match (stored, s.roles.get(user)) {
        (Some(stored), Some(actual)) => !actual.is_empty() && &stored == actual,
        _ => false,
    }
}

/// PostgreSQL semantics: a comma-separated list is satisfied by any entry,
/// and PUBLIC holds CONNECT and TEMPORARY on every database
fn has_database_privilege(s: &HostState, role: &str, database: &str, privileges: &str) -> bool {
    let full = s.grants.contains(&(database.to_string(), role.to_string()))
        || s.databases.get(database).map(String::as_str) == Some(role);
    privileges
        .split(',')
        .map(|p| p.trim().to_ascii_uppercase())
        .any(|p| full || p == "CONNECT" || p == "TEMPORARY" || p == "TEMP")
}

fn admin_sql(s: &mut HostState, sql: &str) -> CommandOutput {
    if let Some(c) = capture(r"FROM pg_roles WHERE rolname = '([^']+)'", sql) {
        return ok(if s.roles.contains_key(&c[0]) { "1\n" } else { "" });
    }
    if let Some(c) = capture(r#"CREATE ROLE "([^"]+)" WITH LOGIN PASSWORD '([^']*)'"#, sql) {
        s.roles.insert(c[0].clone(), c[1].clone());
        return ok("");
    }
    if let Some(c) = capture(r#"ALTER ROLE "([^"]+)" WITH PASSWORD '([^']*)'"#, sql) {
        return match s.roles.get_mut(&c[0]) {
            Some(password) => {
                *password = c[1].clone();
                ok("")
            }
            None => fail(1, format!("ERROR:  role \"{}\" does not exist", c[0])),
        };
    }
    if let Some(c) = capture(r"FROM pg_database WHERE datname = '([^']+)'", sql) {
        return ok(s.databases.get(&c[0]).cloned().unwrap_or_default());
    }
    if let Some(c) = capture(r#"CREATE DATABASE "([^"]+)" OWNER "([^"]+)""#, sql) {
        s.databases.insert(c[0].clone(), c[1].clone());
        return ok("");
    }
    if let Some(c) = capture(r#"ALTER DATABASE "([^"]+)" OWNER TO "([^"]+)""#, sql) {
        return match s.databases.get_mut(&c[0]) {
            Some(owner) => {
                *owner = c[1].clone();
                ok("")
            }
            None => fail(1, format!("ERROR:  database \"{}\" does not exist", c[0])),
        };
    }
    if sql.contains("has_database_privilege(") {
        let re = Regex::new(r"has_database_privilege\('([^']+)', '([^']+)', '([^']+)'\)").unwrap();
        let all = re
            .captures_iter(sql)
            .all(|c| has_database_privilege(s, &c[1], &c[2], &c[3]));
        return ok(if all { "t\n" } else { "f\n" });
    }
    if let Some(c) = capture(r#"GRANT ALL PRIVILEGES ON DATABASE "([^"]+)" TO "([^"]+)""#, sql) {
        s.grants.insert((c[0].clone(), c[1].clone()));
        return ok("");
    }
    fail(1, format!("unhandled SQL: {}", sql))
}

fn dotnet(s: &mut HostState, args: &str) -> CommandOutput {
    if args.starts_with("--list-sdks") {
        let list: String = s
            .sdks
            .iter()
            .map(|v| format!("{} [/home/dev/.dotnet/sdk]\n", v))
            .collect();
        return ok(list);
    }
    if s.sdks.is_empty() {
        return fail(127, "dotnet: command not found");
    }
    if args.starts_with("--version") {
        return ok(format!("{}\n", s.sdks[0]));
    }
    if args.starts_with("tool list -g") {
        let mut table = String::from("Package Id      Version      Commands\n-------------------------------------\n");
        for tool in &s.tools {
            table.push_str(&format!("{}      1.0.0      {}\n", tool, tool));
        }
        return ok(table);
    }
    if let Some(c) = capture(r"^tool install --global (\S+)", args) {
        if s.broken_tools.contains(&c[0]) {
            return fail(1, format!("Tool '{}' failed to install.", c[0]));
        }
        s.tools.insert(c[0].clone());
        return ok(format!("Tool '{}' was successfully installed.\n", c[0]));
    }
    if let Some(c) = capture(r"^new (\S+) -n (\S+) -o (\S+)", args) {
        if s.broken_templates.contains(&c[0]) {
            return fail(103, format!("No templates found matching: '{}'.", c[0]));
        }
        let project = PathBuf::from(&c[2]).join(format!("{}.csproj", c[1]));
        s.files
            .insert(project, "<Project Sdk=\"Microsoft.NET.Sdk.Web\" />\n".to_string());
        return ok("The template was created successfully.\n");
    }
    if args.starts_with("build") {
        return ok("Build succeeded.\n");
    }
    fail(1, format!("unhandled dotnet invocation: {}", args))
}

fn simulate(s: &mut HostState, command: &str, input: Option<&str>) -> CommandOutput {
    if let Some(c) = capture(r"^dpkg-query -W -f='\$\{Status\}' (\S+) ", command) {
        return if s.packages.contains(&c[0]) {
            ok("")
        } else {
            fail(1, "")
        };
    }
    if command.ends_with("apt-get update -y") || command.contains(" dpkg -i ") {
        return ok("");
    }
    if let Some(rest) = command.split("apt-get install -y --no-install-recommends ").nth(1) {
        for package in rest.split_whitespace() {
            install_package(s, package);
        }
        return ok("");
    }
    if let Some(c) = capture(r"^systemctl is-enabled --quiet (\S+) && systemctl is-active", command) {
        let up = s.enabled.contains(&c[0]) && s.active.contains(&c[0]);
        return if up { ok("") } else { fail(3, "") };
    }
    if let Some(c) = capture(r"^sudo systemctl (\S+) (\S+)$", command) {
        match c[0].as_str() {
            "enable" => {
                s.enabled.insert(c[1].clone());
            }
            "start" | "restart" => {
                s.active.insert(c[1].clone());
            }
            _ => {}
        }
        return ok("");
    }
    if command.starts_with("sudo ufw show added") {
        let mut out = String::from("Added user rules (see 'ufw status' for running firewall):\n");
        for rule in &s.ufw_rules {
            out.push_str(&format!("ufw allow {}\n", rule));
        }
        return ok(out);
    }
    if let Some(c) = capture(r"^sudo ufw allow (\S+)$", command) {
        s.ufw_rules.push(c[0].clone());
        return ok("Rules updated\n");
    }
    if command.starts_with("sudo ufw status") {
        return if s.ufw_active { ok("") } else { fail(1, "") };
    }
    if command == "sudo ufw --force enable" {
        s.ufw_active = true;
        return ok("Firewall is active and enabled on system startup\n");
    }
    if capture(r"^bash (\S+) --channel (\S+) --install-dir (\S+)$", command).is_some() {
        s.sdks.push(SDK_VERSION.to_string());
        return ok(format!("dotnet-install: Installed version is {}\n", SDK_VERSION));
    }
    if command.starts_with("cd / && sudo -u postgres psql") {
        return admin_sql(s, input.unwrap_or_default());
    }
    if let Some(c) = capture(
        r"^PGPASSFILE=(\S+) psql -X -w -h (\S+) -p (\d+) -U (\S+) -d (\S+) -tAc '([^']*)'",
        command,
    ) {
        if !can_login(s, &c) {
            return fail(2, "psql: error: password authentication failed");
        }
        return ok(if c[5] == "SHOW server_version" { "16.4\n" } else { "1\n" });
    }
    if command.starts_with("ls -1 /etc/postgresql") {
        return ok(if s.packages.contains("postgresql") { "16\n" } else { "" });
    }
    if let Some((_, args)) = command.rsplit_once("; dotnet ") {
        return dotnet(s, args);
    }
    if let Some(c) = capture(r"^test -f (\S+)$", command) {
        return if s.files.contains_key(Path::new(&c[0])) {
            ok("")
        } else {
            fail(1, "")
        };
    }
    if let Some(c) = capture(r"^test -e (\S+) \|\| test -L", command) {
        let path = PathBuf::from(&c[0]);
        return if s.files.contains_key(&path) || s.symlinks.contains_key(&path) {
            ok("")
        } else {
            fail(1, "")
        };
    }
    if let Some(c) = capture(r"^readlink (\S+) \|\| true$", command) {
        return ok(s
            .symlinks
            .get(Path::new(&c[0]))
            .map(|t| format!("{}\n", t.display()))
            .unwrap_or_default());
    }
    if let Some(c) = capture(r"^sudo ln -sfn (\S+) (\S+)$", command) {
        s.symlinks.insert(PathBuf::from(&c[1]), PathBuf::from(&c[0]));
        return ok("");
    }
    if let Some(c) = capture(r"^sudo rm -f (\S+)$", command) {
        let path = PathBuf::from(&c[0]);
        s.files.remove(&path);
        s.symlinks.remove(&path);
        return ok("");
    }
    if command.starts_with("mkdir -p ")
        || command == "sudo nginx -t"
        || command == "sudo sysctl --system"
        || command == "sudo -v"
    {
        return ok("");
    }
    fail(127, format!("unhandled command: {}", command))
}

fn into_result(command: &str, output: CommandOutput) -> Result<String> {
    if output.success() {
        Ok(output.stdout)
    } else {
        Err(ProvisionError::process(
            command,
            Some(output.exit_code),
            output.stderr,
        ))
    }
}

#[async_trait::async_trait]
impl CommandExecutor for FakeHost {
    async fn identity(&self) -> Result<HostIdentity> {
        Ok(self.identity.clone())
    }

    async fn command_exists(&self, name: &str) -> bool {
        name != "sudo" || self.sudo
    }

    async fn execute(&self, command: &str) -> Result<()> {
        into_result(command, self.run(command, None)).map(|_| ())
    }

    async fn execute_with_output(&self, command: &str) -> Result<String> {
        into_result(command, self.run(command, None))
    }

    async fn execute_with_input(&self, command: &str, input: &str) -> Result<String> {
        into_result(command, self.run(command, Some(input)))
    }

    async fn execute_with_error_collection(
        &self,
        command: &str,
        _description: &str,
    ) -> Result<CommandOutput> {
        Ok(self.run(command, None))
    }

    async fn check_silent(&self, command: &str) -> Result<bool> {
        Ok(self.run(command, None).success())
    }

    async fn read_file(&self, path: &Path, _privileged: bool) -> Result<Option<String>> {
        Ok(self.with_state(|s| s.files.get(path).cloned()))
    }

    async fn write_file(
        &self,
        path: &Path,
        content: &str,
        mode: u32,
        _privileged: bool,
    ) -> Result<()> {
        self.with_state(|s| {
            s.log.push(format!("write {}", path.display()));
            s.files.insert(path.to_path_buf(), content.to_string());
            s.modes.insert(path.to_path_buf(), mode);
        });
        Ok(())
    }
}

/// Serves canned artifacts; URLs in `unavailable` fail
#[derive(Default)]
pub struct FakeDownloader {
    pub unavailable: BTreeSet<String>,
    pub fetched: Mutex<Vec<String>>,
}

impl FakeDownloader {
    pub fn without(urls: &[&str]) -> Self {
        Self {
            unavailable: urls.iter().map(|u| u.to_string()).collect(),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, url: &str) -> Result<TempArtifact> {
        if self.unavailable.contains(url) {
            return Err(ProvisionError::network(format!(
                "Download of {} failed with status: 404 Not Found",
                url
            )));
        }
        self.fetched.lock().unwrap().push(url.to_string());
        let suffix = if url.ends_with(".deb") { ".deb" } else { ".sh" };
        TempArtifact::from_bytes(url, suffix, b"#!/bin/sh\nexit 0\n")
    }
}

/// Run the whole pipeline once against the simulated host
pub async fn provision(
    host: &Arc<FakeHost>,
    downloader: &Arc<FakeDownloader>,
    options: RunOptions,
) -> (Result<()>, RunReport) {
    let mut provisioner = Provisioner::new(
        host.clone(),
        downloader.clone(),
        ProvisionConfig::default(),
        options,
    );
    let result = provisioner.run().await;
    (result, provisioner.into_report())
}

/// Resource context over an Ubuntu 24.04 simulated host
pub fn host_context(host: Arc<FakeHost>) -> HostContext {
    let descriptor = DistroDescriptor {
        id: "ubuntu".to_string(),
        version: "24.04".to_string(),
        codename: "noble".to_string(),
    };
    HostContext::new(
        host,
        select_platform(&descriptor).unwrap(),
        Arc::new(FakeDownloader::default()),
    )
}
