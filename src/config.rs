use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub auth_token: String,
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
    #[serde(default)]
    pub telegram_bot_token: Option<String>,
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
}

fn default_user_agents() -> Vec<String> {
    vec![DEFAULT_USER_AGENT.to_owned()]
}

pub fn load(path: &Path) -> Result<Config> {
    let raw = fs::read_to_string(path).with_context(|| {
        format!(
            "could not read {}, create it from config.json.example",
            path.display()
        )
    })?;
    parse(&raw).with_context(|| format!("invalid config at {}", path.display()))
}

fn parse(raw: &str) -> Result<Config> {
    let mut config: Config = serde_json::from_str(raw).context("config is not valid JSON")?;

    if config.auth_token.trim().is_empty() {
        bail!("auth_token is empty");
    }
    if config.user_agents.is_empty() {
        config.user_agents = default_user_agents();
    }

    Ok(config)
}
