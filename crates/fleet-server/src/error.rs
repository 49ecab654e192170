use thiserror::Error;

use fleet_broker::BrokerError;
use fleet_dal_client::DalError;
use fleet_installer::InstallerError;
use fleet_process::ProcessError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("worker dal call failed: {0}")]
    Dal(#[from] DalError),
    #[error("messaging fabric error: {0}")]
    Broker(#[from] BrokerError),
    #[error("installer failed: {0}")]
    Installer(#[from] InstallerError),
    #[error("process error: {0}")]
    Process(#[from] ProcessError),
}
