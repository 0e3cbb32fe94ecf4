use std::fmt;

use anyhow::Context;

use crate::sync::remote::ROOT_ID;
use crate::sync::report::FailurePolicy;

const DEFAULT_API_BASE: &str = "https://www.googleapis.com";
const DEFAULT_PAGE_SIZE: u64 = 100;
const MAX_PAGE_SIZE: u64 = 1000;
const DEFAULT_BATCH_SIZE: u64 = 8;

#[derive(Clone)]
pub struct SyncConfig {
    pub api_base: String,
    pub access_token: Option<String>,
    pub remote_root: String,
    pub page_size: u32,
    pub batch_size: usize,
    pub policy: FailurePolicy,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base = lookup("GDRIVE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let access_token = lookup("GDRIVE_ACCESS_TOKEN").filter(|t| !t.trim().is_empty());
        let remote_root = lookup("GDRIVE_REMOTE_ROOT")
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| ROOT_ID.to_string());
        let page_size = read_u64(&lookup, "GDRIVE_PAGE_SIZE", DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
        let batch_size = read_u64(&lookup, "GDRIVE_BATCH_SIZE", DEFAULT_BATCH_SIZE);
        let continue_on_error = read_bool(&lookup, "GDRIVE_CONTINUE_ON_ERROR", false);

        Self {
            api_base,
            access_token,
            remote_root,
            page_size: page_size as u32,
            batch_size: batch_size as usize,
            policy: FailurePolicy::from_continue_flag(continue_on_error),
        }
    }

    pub fn access_token(&self) -> anyhow::Result<&str> {
        self.access_token
            .as_deref()
            .context("GDRIVE_ACCESS_TOKEN is not set")
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("api_base", &self.api_base)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("remote_root", &self.remote_root)
            .field("page_size", &self.page_size)
            .field("batch_size", &self.batch_size)
            .field("policy", &self.policy)
            .finish()
    }
}

fn read_u64<F>(lookup: &F, name: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn read_bool<F>(lookup: &F, name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(default)
}
