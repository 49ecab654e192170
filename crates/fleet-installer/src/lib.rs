//! The installer contract: fetch/update one game server's content and
//! wait for completion before the server is started.

pub mod error;
pub mod installer;

pub use error::InstallerError;
pub use installer::{Installer, InstallerCredential, RealInstaller};

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeInstaller;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::Path;

    #[tokio::test]
    async fn fake_installer_records_calls() {
        let installer = FakeInstaller::new();
        installer.prepare_and_wait(730, Path::new("/tmp/csgo")).await.unwrap();
        assert_eq!(installer.calls(), vec![(730, Path::new("/tmp/csgo").to_path_buf())]);
    }

    #[tokio::test]
    async fn fake_installer_can_be_made_to_fail() {
        let installer = FakeInstaller::new();
        installer.fail_next_with(InstallerError::NonZeroExit(1));
        let result = installer.prepare_and_wait(730, Path::new("/tmp/csgo")).await;
        assert!(result.is_err());
    }
}
