use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::InstallerError;
use crate::installer::Installer;

#[derive(Clone, Default)]
pub struct FakeInstaller {
    calls: Arc<Mutex<Vec<(i64, PathBuf)>>>,
    fail_with: Arc<Mutex<Option<InstallerError>>>,
}

impl FakeInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_with(&self, error: InstallerError) {
        *self.fail_with.lock() = Some(error);
    }

    pub fn calls(&self) -> Vec<(i64, PathBuf)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Installer for FakeInstaller {
    async fn prepare_and_wait(&self, app_id: i64, dest_dir: &Path) -> Result<(), InstallerError> {
        self.calls.lock().push((app_id, dest_dir.to_path_buf()));
        if let Some(error) = self.fail_with.lock().take() {
            return Err(error);
        }
        Ok(())
    }
}
