use worker::Env;

use crate::models::{DEFAULT_ALLOWED_ORIGINS, DEFAULT_MAX_UPLOAD_BYTES};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGINS.to_string()],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    /// Reads `ALLOWED_ORIGINS` and `MAX_UPLOAD_BYTES` from the worker vars.
    pub fn from_env(env: &Env) -> Self {
        Self::from_lookup(|key| env.var(key).ok().map(|value| value.to_string()))
    }

    /// Missing or unusable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .filter(|origins| !origins.is_empty())
            .unwrap_or(defaults.allowed_origins);

        let max_upload_bytes = lookup("MAX_UPLOAD_BYTES")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|bytes| *bytes > 0)
            .unwrap_or(defaults.max_upload_bytes);

        Self {
            allowed_origins,
            max_upload_bytes,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
