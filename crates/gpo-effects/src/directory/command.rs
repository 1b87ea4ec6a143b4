//! Directory queries through an external listing command
//!
//! The command is invoked as
//! `<cmd...> --objectclass <user|computer> <ad_server> <name>` with
//! `KRB5CCNAME` pointing at the private ticket. It prints one line per
//! applicable object, closest to the identity first:
//!
//! ```text
//! <display name>\t<location>
//! ```
//!
//! Exit status [`OFFLINE_EXIT_CODE`] means the directory could not be reached.

use async_trait::async_trait;
use gpo_core::{DirectoryEffects, DirectoryError, Identity, PolicyObjectRef};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Exit status reported by the listing command when the directory is offline
pub const OFFLINE_EXIT_CODE: i32 = 2;

/// Directory adapter running an external listing command
#[derive(Debug, Clone)]
pub struct CommandDirectory {
    command: Vec<String>,
    ad_server: String,
    timeout: Duration,
}

impl CommandDirectory {
    /// Create an adapter running `command` (program followed by fixed args)
    pub fn new(command: Vec<String>, ad_server: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command,
            ad_server: ad_server.into(),
            timeout,
        }
    }
}

#[async_trait]
impl DirectoryEffects for CommandDirectory {
    async fn list_applicable_objects(
        &self,
        identity: &Identity,
        ticket: &Path,
    ) -> Result<Vec<PolicyObjectRef>, DirectoryError> {
        let (program, fixed_args) = self
            .command
            .split_first()
            .ok_or_else(|| DirectoryError::Failed("empty listing command".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(fixed_args)
            .arg("--objectclass")
            .arg(identity.object_class().as_str())
            .arg(&self.ad_server)
            .arg(identity.directory_name())
            .env("KRB5CCNAME", ticket)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(identity = %identity, program = %program, "listing applicable policy objects");
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                warn!(identity = %identity, "directory query timed out");
                return Err(DirectoryError::Offline(format!(
                    "no answer within {}s",
                    self.timeout.as_secs()
                )));
            }
            Ok(Err(e)) => return Err(DirectoryError::Failed(format!("cannot run {program}: {e}"))),
            Ok(Ok(output)) => output,
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        match output.status.code() {
            Some(0) => {}
            Some(OFFLINE_EXIT_CODE) => return Err(DirectoryError::Offline(stderr)),
            code => {
                return Err(DirectoryError::Failed(format!(
                    "{program} exited with {code:?}: {stderr}"
                )))
            }
        }

        parse_gpo_list(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the listing command output
pub fn parse_gpo_list(stdout: &str) -> Result<Vec<PolicyObjectRef>, DirectoryError> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let (name, location) = line
                .split_once('\t')
                .ok_or_else(|| DirectoryError::Failed(format!("malformed line {line:?}")))?;
            PolicyObjectRef::from_location(name.trim(), location.trim())
                .ok_or_else(|| DirectoryError::Failed(format!("no object id in {location:?}")))
        })
        .collect()
}
