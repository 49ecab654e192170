use std::time::Duration;

use crate::auth::Credential;

/// Connection parameters for the Worker DAL + Status read API. Grouped
/// into one struct constructed once at startup, per the ambient
/// no-globals rule: no part of this crate reads an environment variable
/// outside `DalConfig::from_env`.
#[derive(Clone)]
pub struct DalConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub credential: Credential,
}

impl DalConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(10),
            credential: Credential::Anonymous,
        }
    }

    pub fn from_env() -> Result<Self, std::env::VarError> {
        let base_url = std::env::var("FLEET_DAL_URL")?;
        Ok(Self {
            base_url,
            request_timeout: Duration::from_secs(10),
            credential: Credential::from_env(),
        })
    }
}
