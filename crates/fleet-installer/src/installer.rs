use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::InstallerError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 30);

/// Fetches/updates the content for one game server app into a
/// directory, then waits for that to finish.
///
/// This is a thin contract over an external content-fetch tool (the
/// system this is modeled on shells out to a third-party content
/// delivery client); what that tool does internally is out of scope
/// here — we only own "run it, bound it with a timeout, surface the
/// result."
#[async_trait]
pub trait Installer: Send + Sync {
    async fn prepare_and_wait(&self, app_id: i64, dest_dir: &Path) -> Result<(), InstallerError>;
}

/// The installer's own login credential, separate from `fleet-dal-client`'s
/// `Credential` (a different system, a different "anonymous | real"
/// choice) — most catalog content is public and fetched anonymously, but
/// some requires a real account, e.g. paid or early-access titles.
#[derive(Clone)]
pub enum InstallerCredential {
    Anonymous,
    UserPassword { username: String, password: String },
}

impl InstallerCredential {
    fn login_args(&self) -> Vec<String> {
        match self {
            InstallerCredential::Anonymous => vec!["anonymous".to_string()],
            InstallerCredential::UserPassword { username, password } => {
                vec![username.clone(), password.clone()]
            }
        }
    }
}

pub struct RealInstaller {
    binary: PathBuf,
    timeout: Duration,
    credential: InstallerCredential,
}

impl RealInstaller {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_TIMEOUT,
            credential: InstallerCredential::Anonymous,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_credential(mut self, credential: InstallerCredential) -> Self {
        self.credential = credential;
        self
    }
}

#[async_trait]
impl Installer for RealInstaller {
    async fn prepare_and_wait(&self, app_id: i64, dest_dir: &Path) -> Result<(), InstallerError> {
        let mut command = tokio::process::Command::new(&self.binary);
        command
            .arg("+force_install_dir")
            .arg(dest_dir)
            .arg("+login")
            .args(self.credential.login_args())
            .arg("+app_update")
            .arg(app_id.to_string())
            .arg("validate")
            .arg("+quit");

        let anonymous = matches!(self.credential, InstallerCredential::Anonymous);
        info!(app_id, dest_dir = %dest_dir.display(), anonymous, "preparing game server content");

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| InstallerError::TimedOut(self.timeout))?
            .map_err(InstallerError::SpawnFailed)?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!(app_id, code, "installer exited non-zero");
            return Err(InstallerError::NonZeroExit(code));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    fn recording_script(dir: &std::path::Path, exit_code: i32) -> PathBuf {
        let script_path = dir.join("installer.sh");
        let args_path = dir.join("args.txt");
        let mut file = std::fs::File::create(&script_path).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        writeln!(file, "echo \"$@\" > {}", args_path.display()).unwrap();
        writeln!(file, "exit {exit_code}").unwrap();
        drop(file);
        let mut perms = std::fs::metadata(&script_path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script_path, perms).unwrap();
        script_path
    }

    #[tokio::test]
    async fn anonymous_credential_passes_the_literal_anonymous_login() {
        let dir = tempfile::tempdir().unwrap();
        let script = recording_script(dir.path(), 0);
        let installer = RealInstaller::new(script);

        installer.prepare_and_wait(740, dir.path()).await.unwrap();

        let recorded = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert!(recorded.contains("+login anonymous"));
    }

    #[tokio::test]
    async fn user_password_credential_passes_both_fields() {
        let dir = tempfile::tempdir().unwrap();
        let script = recording_script(dir.path(), 0);
        let installer = RealInstaller::new(script).with_credential(InstallerCredential::UserPassword {
            username: "opskeeper".to_string(),
            password: "hunter2".to_string(),
        });

        installer.prepare_and_wait(740, dir.path()).await.unwrap();

        let recorded = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert!(recorded.contains("+login opskeeper hunter2"));
    }

    #[tokio::test]
    async fn non_zero_exit_surfaces_as_installer_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = recording_script(dir.path(), 3);
        let installer = RealInstaller::new(script);

        let result = installer.prepare_and_wait(740, dir.path()).await;
        assert!(matches!(result, Err(InstallerError::NonZeroExit(3))));
    }
}
