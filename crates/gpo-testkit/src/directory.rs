//! Scripted directory double
//!
//! Answers are parameterized per directory name (the identity without its
//! realm), so concurrent resolutions of distinct identities get distinct
//! answers. Like the real listing command, a query without an existing
//! ticket file fails.

use async_trait::async_trait;
use gpo_core::{DirectoryEffects, DirectoryError, Identity, PolicyObjectRef};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Mode {
    Online,
    Offline,
    Failing(String),
}

/// Directory returning scripted object lists
#[derive(Debug)]
pub struct ScriptedDirectory {
    location_base: String,
    answers: Mutex<HashMap<String, Vec<String>>>,
    mode: Mutex<Mode>,
    delay: Mutex<Duration>,
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl ScriptedDirectory {
    /// Directory whose objects live under `location_base/<id>`
    pub fn new(location_base: impl Into<String>) -> Self {
        Self {
            location_base: location_base.into(),
            answers: Mutex::new(HashMap::new()),
            mode: Mutex::new(Mode::Online),
            delay: Mutex::new(Duration::ZERO),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Objects applicable to `name`, in precedence order
    pub fn answer(&self, name: &str, ids: &[&str]) {
        self.answers.lock().insert(
            name.to_string(),
            ids.iter().map(|id| (*id).to_string()).collect(),
        );
    }

    /// Report the directory as unreachable
    pub fn go_offline(&self) {
        *self.mode.lock() = Mode::Offline;
    }

    /// Answer queries again
    pub fn go_online(&self) {
        *self.mode.lock() = Mode::Online;
    }

    /// Fail every query with a non-offline error
    pub fn fail_with(&self, reason: &str) {
        *self.mode.lock() = Mode::Failing(reason.to_string());
    }

    /// Delay every answer
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Queries received so far: directory name and ticket path
    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().clone()
    }

    fn objects_for(&self, name: &str) -> Vec<PolicyObjectRef> {
        self.answers
            .lock()
            .get(name)
            .into_iter()
            .flatten()
            .map(|id| PolicyObjectRef {
                id: id.clone(),
                name: format!("{id}-name"),
                location: format!("{}/{id}", self.location_base),
            })
            .collect()
    }
}

#[async_trait]
impl DirectoryEffects for ScriptedDirectory {
    async fn list_applicable_objects(
        &self,
        identity: &Identity,
        ticket: &Path,
    ) -> Result<Vec<PolicyObjectRef>, DirectoryError> {
        let name = identity.directory_name().to_string();
        self.calls.lock().push((name.clone(), ticket.to_path_buf()));

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mode = self.mode.lock().clone();
        match mode {
            Mode::Offline => Err(DirectoryError::Offline("scripted offline".to_string())),
            Mode::Failing(reason) => Err(DirectoryError::Failed(reason)),
            Mode::Online if !ticket.is_file() => Err(DirectoryError::Failed(format!(
                "ticket {} does not exist",
                ticket.display()
            ))),
            Mode::Online => Ok(self.objects_for(&name)),
        }
    }
}
