use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::PathBuf};
use tracing::warn;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub probe: ProbeDefaults,
    #[serde(default)]
    pub tlds: TldConfig,
}

/// Defaults for options that can also be given on the command line.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProbeDefaults {
    pub threads: Option<usize>,
    pub rate_limit: Option<usize>,
    pub max_redirects: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub max_requests_per_second: Option<u32>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TldConfig {
    #[serde(default)]
    pub always: Vec<String>,
    #[serde(default)]
    pub never: Vec<String>,
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tldsweep").join("config.toml"))
}

pub fn load_config() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    let Ok(content) = std::fs::read_to_string(&path) else {
        return Config::default();
    };
    parse_config(&content).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Ignoring malformed config file");
        Config::default()
    })
}

pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

/// Remove `never` TLDs, then put the `always` TLDs that are still missing
/// in front of the list. Matching ignores case.
pub fn apply_config_to_tlds(tlds: Vec<String>, config: &Config) -> Vec<String> {
    let never: HashSet<String> = config.tlds.never.iter().map(|tld| tld.to_lowercase()).collect();
    let kept: Vec<String> = tlds
        .into_iter()
        .filter(|tld| !never.contains(&tld.to_lowercase()))
        .collect();

    let mut present: HashSet<String> = kept.iter().map(|tld| tld.to_lowercase()).collect();
    let pinned: Vec<String> = config
        .tlds
        .always
        .iter()
        .map(|tld| tld.to_lowercase())
        .filter(|tld| present.insert(tld.clone()))
        .collect();

    pinned.into_iter().chain(kept).collect()
}

pub fn get_default_config_toml() -> String {
    r#"# tldsweep configuration
# Command-line flags take precedence over these values.

[probe]
# threads = 50
# rate_limit = 150
# max_redirects = 10
# timeout_secs = 5
# max_requests_per_second = 100
# user_agent = "tldsweep"

[tlds]
# TLDs to always probe, whatever the TLD source says
always = []

# TLDs to never probe
# never = ["xxx", "adult"]
never = []
"#
    .to_string()
}
