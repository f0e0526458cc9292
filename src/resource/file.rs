// file: src/resource/file.rs
// version: 1.0.0
// guid: 7f3e9a15-6b2d-4c80-b1d4-38e5f0a92c71

//! File-shaped resources: whole files, single lines, symlinks, removals

use super::{FailurePolicy, HostContext, Resource, ResourceState};
use crate::utils::shell_quote;
use crate::Result;
use regex::Regex;
use std::path::PathBuf;

/// A file whose entire content is declared
#[derive(Debug, Clone)]
pub struct ManagedFile {
    pub path: PathBuf,
    pub content: String,
    pub mode: u32,
    pub privileged: bool,
}

impl ManagedFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>, mode: u32) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            mode,
            privileged: false,
        }
    }

    /// Route reads and writes through sudo
    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }
}

#[async_trait::async_trait]
impl Resource for ManagedFile {
    fn id(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn kind(&self) -> &'static str {
        "file"
    }

    async fn observe(&self, host: &HostContext) -> Result<ResourceState> {
        Ok(match host.exec.read_file(&self.path, self.privileged).await? {
            None => ResourceState::Missing,
            Some(existing) if existing == self.content => ResourceState::Converged,
            Some(_) => ResourceState::Drifted("content differs".to_string()),
        })
    }

    async fn apply(&self, host: &HostContext, _observed: &ResourceState) -> Result<()> {
        host.exec
            .write_file(&self.path, &self.content, self.mode, self.privileged)
            .await
    }
}

/// Where a new line goes when nothing matches
#[derive(Debug, Clone)]
pub enum Placement {
    End,
    /// Before the first line matching the pattern, or at the end
    BeforeFirst(Regex),
}

/// A single line that must be present in a file, exactly once
#[derive(Debug, Clone)]
pub struct LineInFile {
    pub path: PathBuf,
    pub line: String,
    /// Lines matching this pattern are replaced by `line`
    pub matcher: Option<Regex>,
    pub placement: Placement,
    pub mode: u32,
    pub privileged: bool,
}

impl LineInFile {
    pub fn new(path: impl Into<PathBuf>, line: impl Into<String>, mode: u32) -> Self {
        Self {
            path: path.into(),
            line: line.into(),
            matcher: None,
            placement: Placement::End,
            mode,
            privileged: false,
        }
    }

    pub fn replacing(mut self, matcher: Regex) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn placed(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    /// Return `existing` with the declared line present exactly once
    pub fn render(&self, existing: &str) -> String {
        let mut lines: Vec<String> = existing.lines().map(str::to_string).collect();

        let is_target = |candidate: &str| {
            candidate == self.line
                || self
                    .matcher
                    .as_ref()
                    .map(|m| m.is_match(candidate))
                    .unwrap_or(false)
        };

        if let Some(first) = lines.iter().position(|l| is_target(l.as_str())) {
            lines[first] = self.line.clone();
            let mut index = 0;
            lines.retain(|l| {
                let keep = index <= first || !is_target(l.as_str());
                index += 1;
                keep
            });
        } else {
            let at = match &self.placement {
                Placement::End => None,
                Placement::BeforeFirst(pattern) => lines.iter().position(|l| pattern.is_match(l)),
            };
            match at {
                Some(at) => lines.insert(at, self.line.clone()),
                None => lines.push(self.line.clone()),
            }
        }

        let mut rendered = lines.join("\n");
        rendered.push('\n');
        rendered
    }

    /// Compare file contents with the declared line
    pub fn classify(&self, existing: &str) -> ResourceState {
        let rendered = self.render(existing);
        if rendered == existing {
            ResourceState::Converged
        } else if !existing.ends_with('\n') && rendered.strip_suffix('\n') == Some(existing) {
            ResourceState::Drifted("missing trailing newline".to_string())
        } else if existing.lines().any(|l| l == self.line) {
            ResourceState::Drifted("duplicate or conflicting lines".to_string())
        } else if self
            .matcher
            .as_ref()
            .map(|m| existing.lines().any(|l| m.is_match(l)))
            .unwrap_or(false)
        {
            ResourceState::Drifted("line differs".to_string())
        } else {
            ResourceState::Missing
        }
    }
}

#[async_trait::async_trait]
impl Resource for LineInFile {
    fn id(&self) -> String {
        format!("line:{}:{}", self.path.display(), self.line)
    }

    fn kind(&self) -> &'static str {
        "line"
    }

    async fn observe(&self, host: &HostContext) -> Result<ResourceState> {
        let existing = match host.exec.read_file(&self.path, self.privileged).await? {
            Some(existing) => existing,
            None => return Ok(ResourceState::Missing),
        };

        Ok(self.classify(&existing))
    }

    async fn apply(&self, host: &HostContext, _observed: &ResourceState) -> Result<()> {
        let existing = host
            .exec
            .read_file(&self.path, self.privileged)
            .await?
            .unwrap_or_default();
        let rendered = self.render(&existing);
        host.exec
            .write_file(&self.path, &rendered, self.mode, self.privileged)
            .await
    }
}

/// A symbolic link pointing at a declared target
#[derive(Debug, Clone)]
pub struct Symlink {
    pub link: PathBuf,
    pub target: PathBuf,
}

#[async_trait::async_trait]
impl Resource for Symlink {
    fn id(&self) -> String {
        format!("symlink:{}", self.link.display())
    }

    fn kind(&self) -> &'static str {
        "symlink"
    }

    async fn observe(&self, host: &HostContext) -> Result<ResourceState> {
        let link = shell_quote(&self.link.to_string_lossy());
        let current = host
            .exec
            .execute_with_output(&format!("readlink {} || true", link))
            .await?;
        let current = current.trim();
        Ok(if current.is_empty() {
            ResourceState::Missing
        } else if current == self.target.to_string_lossy() {
            ResourceState::Converged
        } else {
            ResourceState::Drifted(format!("points to {}", current))
        })
    }

    async fn apply(&self, host: &HostContext, _observed: &ResourceState) -> Result<()> {
        host.exec
            .execute_with_output(&format!(
                "sudo ln -sfn {} {}",
                shell_quote(&self.target.to_string_lossy()),
                shell_quote(&self.link.to_string_lossy())
            ))
            .await
            .map(|_| ())
    }
}

/// A path that must not exist
#[derive(Debug, Clone)]
pub struct AbsentFile {
    pub path: PathBuf,
}

#[async_trait::async_trait]
impl Resource for AbsentFile {
    fn id(&self) -> String {
        format!("absent:{}", self.path.display())
    }

    fn kind(&self) -> &'static str {
        "absent"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Warn
    }

    async fn observe(&self, host: &HostContext) -> Result<ResourceState> {
        let path = shell_quote(&self.path.to_string_lossy());
        let present = host
            .exec
            .check_silent(&format!("test -e {0} || test -L {0}", path))
            .await?;
        Ok(if present {
            ResourceState::Drifted("present".to_string())
        } else {
            ResourceState::Converged
        })
    }

    async fn apply(&self, host: &HostContext, _observed: &ResourceState) -> Result<()> {
        host.exec
            .execute_with_output(&format!(
                "sudo rm -f {}",
                shell_quote(&self.path.to_string_lossy())
            ))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hba_line() -> LineInFile {
        LineInFile::new(
            "/etc/postgresql/16/main/pg_hba.conf",
            "host    appdb    appuser    127.0.0.1/32    scram-sha-256",
            0o640,
        )
        .placed(Placement::BeforeFirst(Regex::new(r"^\s*(local|host)").unwrap()))
    }

    #[test]
    fn test_render_appends_to_empty() {
        let line = LineInFile::new("/tmp/x", "export A=1", 0o644);
        assert_eq!(line.render(""), "export A=1\n");
    }

    #[test]
    fn test_classify_missing_trailing_newline() {
        let line = LineInFile::new("/tmp/x", "export A=1", 0o644);
        assert_eq!(
            line.classify("# profile\nexport A=1"),
            ResourceState::Drifted("missing trailing newline".to_string())
        );
        assert_eq!(line.classify("# profile\nexport A=1\n"), ResourceState::Converged);
        assert_eq!(
            line.classify("export A=1\nexport A=1\n"),
            ResourceState::Drifted("duplicate or conflicting lines".to_string())
        );
        assert_eq!(line.classify("# profile"), ResourceState::Missing);
    }

    #[test]
    fn test_render_is_idempotent() {
        let line = LineInFile::new("/tmp/x", "export A=1", 0o644);
        let once = line.render("# profile\n");
        let twice = line.render(&once);
        assert_eq!(once, twice);
        assert_eq!(once.matches("export A=1").count(), 1);
    }

    #[test]
    fn test_render_replaces_matching_line() {
        let line = LineInFile::new("/etc/postgresql/16/main/postgresql.conf", "listen_addresses = 'localhost'", 0o644)
            .replacing(Regex::new(r"^\s*#?\s*listen_addresses\s*=").unwrap());
        let existing = "port = 5432\n#listen_addresses = 'localhost'\t# what IP address(es)\nmax_connections = 100\n";
        let rendered = line.render(existing);
        assert_eq!(
            rendered,
            "port = 5432\nlisten_addresses = 'localhost'\nmax_connections = 100\n"
        );
    }

    #[test]
    fn test_render_removes_duplicates() {
        let line = LineInFile::new("/tmp/x", "A=1", 0o644).replacing(Regex::new("^A=").unwrap());
        assert_eq!(line.render("A=0\nB=2\nA=1\nA=3\n"), "A=1\nB=2\n");
    }

    #[test]
    fn test_render_places_before_first_rule() {
        let existing = "# comment\nlocal   all   postgres   peer\nhost    all   all   127.0.0.1/32   scram-sha-256\n";
        let rendered = hba_line().render(existing);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "# comment");
        assert!(lines[1].starts_with("host    appdb"));
        assert!(lines[2].starts_with("local"));
    }
}
