use crate::HealthStoreError;
use secrecy::SecretString;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8787";

#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: SecretString,
    pub base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, HealthStoreError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function instead of the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, HealthStoreError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let api = get("HEALTH_STORE_API_KEY")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| HealthStoreError::Config("HEALTH_STORE_API_KEY missing".into()))?;
        let base_url = get("HEALTH_STORE_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        Ok(Self {
            api_key: SecretString::new(api.into()),
            base_url,
        })
    }
}
