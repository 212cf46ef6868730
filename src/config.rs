use crate::models::KeyPolicy;
use crate::scrapers::kleinanzeigen::DEFAULT_RESULT_CAP;
use anyhow::{bail, Context};
use clap::ValueEnum;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// How pages are fetched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    #[default]
    Http,
    Browser,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub output_dir: PathBuf,
    pub tracker_file: String,
    pub result_cap: usize,
    pub fetch_timeout: Duration,
    pub render_wait: Duration,
    pub delay_min: Duration,
    pub delay_max: Duration,
    pub key_policy: KeyPolicy,
    pub provider: ProviderKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            tracker_file: "Tracker_Outputs.csv".to_string(),
            result_cap: DEFAULT_RESULT_CAP,
            fetch_timeout: Duration::from_secs(10),
            render_wait: Duration::from_secs(20),
            delay_min: Duration::from_secs(3),
            delay_max: Duration::from_secs(7),
            key_policy: KeyPolicy::default(),
            provider: ProviderKind::default(),
        }
    }
}

impl Config {
    /// Read `SCOUT_*` variables, falling back to defaults for unset ones
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let config = Self {
            output_dir: var("SCOUT_OUTPUT_DIR")?.unwrap_or(defaults.output_dir),
            tracker_file: var("SCOUT_TRACKER_FILE")?.unwrap_or(defaults.tracker_file),
            result_cap: var("SCOUT_RESULT_CAP")?.unwrap_or(defaults.result_cap),
            fetch_timeout: secs("SCOUT_FETCH_TIMEOUT_SECS")?.unwrap_or(defaults.fetch_timeout),
            render_wait: secs("SCOUT_RENDER_WAIT_SECS")?.unwrap_or(defaults.render_wait),
            delay_min: secs("SCOUT_DELAY_MIN_SECS")?.unwrap_or(defaults.delay_min),
            delay_max: secs("SCOUT_DELAY_MAX_SECS")?.unwrap_or(defaults.delay_max),
            key_policy: value_enum("SCOUT_KEY_POLICY")?.unwrap_or(defaults.key_policy),
            provider: value_enum("SCOUT_PROVIDER")?.unwrap_or(defaults.provider),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.result_cap == 0 {
            bail!("result cap must be at least 1");
        }
        if self.delay_min > self.delay_max {
            bail!(
                "delay minimum {:?} exceeds maximum {:?}",
                self.delay_min,
                self.delay_max
            );
        }
        Ok(())
    }

    pub fn tracker_path(&self) -> PathBuf {
        self.output_dir.join(&self.tracker_file)
    }
}

fn var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid value for {}: {:?}", name, raw)),
        _ => Ok(None),
    }
}

fn secs(name: &str) -> anyhow::Result<Option<Duration>> {
    Ok(var::<u64>(name)?.map(Duration::from_secs))
}

fn value_enum<T: ValueEnum>(name: &str) -> anyhow::Result<Option<T>> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => T::from_str(raw.trim(), true)
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid value for {}: {}", name, e)),
        _ => Ok(None),
    }
}
