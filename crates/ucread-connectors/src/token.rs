//! Token generators: a fresh credential per read, never cached here.

use anyhow::Context;

/// Produces an access token on demand.
///
/// Implementations must not hand back a cached credential that may have
/// expired; the input manager calls this once per read.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> anyhow::Result<String>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> anyhow::Result<String> + Send + Sync,
{
    fn token(&self) -> anyhow::Result<String> {
        self()
    }
}

/// Reads the token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::new("DATABRICKS_TOKEN")
    }
}

impl TokenProvider for EnvTokenProvider {
    fn token(&self) -> anyhow::Result<String> {
        let token = std::env::var(&self.var).with_context(|| format!("{} not set", self.var))?;
        anyhow::ensure!(!token.is_empty(), "{} is empty", self.var);
        Ok(token)
    }
}
