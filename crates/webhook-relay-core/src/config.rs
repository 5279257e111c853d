use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Read-only source of configuration values consulted at request time.
///
/// Empty values are reported as absent so callers only need to handle `None`.
pub trait ConfigProvider: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads values from the process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvConfig;

impl ConfigProvider for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|value| !value.is_empty())
    }
}

/// Fixed set of values, for embedding and tests.
#[derive(Clone, Debug, Default)]
pub struct StaticConfig {
    values: HashMap<String, String>,
}

impl StaticConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigProvider for StaticConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .filter(|value| !value.is_empty())
            .cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for StaticConfig
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Shared handle to a `ConfigProvider`, carried in request extensions.
#[derive(Clone)]
pub struct ConfigHandle {
    provider: Arc<dyn ConfigProvider>,
}

impl ConfigHandle {
    pub fn with_provider<P>(provider: P) -> Self
    where
        P: ConfigProvider + 'static,
    {
        Self {
            provider: Arc::new(provider),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.provider.get(key)
    }
}

impl fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigHandle").finish_non_exhaustive()
    }
}
