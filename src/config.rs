// src/config.rs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info};
use url::Url;

use crate::fetch::Source;

/// Which export columns the engine reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Columns {
    pub owner: String,
    pub amount: String,
    pub account: String,
    pub stage: String,
    pub close_date: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            owner: "Owner".into(),
            amount: "Amount".into(),
            account: "Account".into(),
            stage: "Stage".into(),
            close_date: "Close Date".into(),
        }
    }
}

/// Margin targets carried by every rep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerRepTargets {
    pub netsuite_margin: f64,
    pub addons_margin: f64,
}

impl Default for PerRepTargets {
    fn default() -> Self {
        Self {
            netsuite_margin: 550_000.0,
            addons_margin: 125_000.0,
        }
    }
}

/// A rep in scope. `owner` is the value matched against the owner column and
/// falls back to `name` when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rep {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Rep {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: None,
        }
    }

    pub fn with_owner(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: Some(owner.into()),
        }
    }

    pub fn owner_key(&self) -> &str {
        self.owner.as_deref().unwrap_or(&self.name)
    }
}

/// Working assumptions behind the required-pipeline figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Percentage, e.g. `25` for 25%.
    pub win_rate: f64,
    pub avg_margin_per_win: f64,
    pub coverage_ratio: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            win_rate: 25.0,
            avg_margin_per_win: 275_000.0,
            coverage_ratio: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub max_retries: usize,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1_000,
            timeout_secs: 30,
        }
    }
}

impl FetchSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where the export lives. At most one of `url` / `path` should be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub url: Option<String>,
    pub path: Option<PathBuf>,
    pub fetch: FetchSettings,
}

impl SourceSettings {
    /// Point at `source`, clearing whichever location it replaces.
    pub fn set(&mut self, source: Source) {
        match source {
            Source::Url(url) => {
                self.url = Some(url.to_string());
                self.path = None;
            }
            Source::Path(path) => {
                self.path = Some(path);
                self.url = None;
            }
        }
    }
}

/// Everything the engine is told from outside: targets, rates and the export
/// location. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub fiscal_year: String,
    pub columns: Columns,
    pub per_rep: PerRepTargets,
    pub reps: Vec<Rep>,
    pub pipeline: PipelineSettings,
    pub source: SourceSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fiscal_year: "FY26".into(),
            columns: Columns::default(),
            per_rep: PerRepTargets::default(),
            reps: vec![Rep::new("Anthony"), Rep::new("Tony")],
            pipeline: PipelineSettings::default(),
            source: SourceSettings::default(),
        }
    }
}

pub const ENV_WIN_RATE: &str = "PIPECOV_WIN_RATE";
pub const ENV_AVG_MARGIN: &str = "PIPECOV_AVG_MARGIN";
pub const ENV_COVERAGE_RATIO: &str = "PIPECOV_COVERAGE_RATIO";
pub const ENV_SOURCE: &str = "PIPECOV_SOURCE";

impl PipelineConfig {
    /// Load from a YAML (`.yaml`/`.yml`) or JSON (`.json`) file. Missing keys
    /// take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        let cfg: Self = match ext.as_deref() {
            Some("json") => serde_json::from_str(&raw)
                .with_context(|| format!("parsing JSON config {}", path.display()))?,
            _ => serde_yaml::from_str(&raw)
                .with_context(|| format!("parsing YAML config {}", path.display()))?,
        };
        info!(path = %path.display(), reps = cfg.reps.len(), "loaded config");
        Ok(cfg)
    }

    /// Apply `PIPECOV_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup; split out so tests need not touch
    /// the real environment.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str| -> Result<Option<f64>> {
            lookup(key)
                .map(|v| {
                    v.trim()
                        .parse::<f64>()
                        .with_context(|| format!("{key}={v:?} is not a number"))
                })
                .transpose()
        };

        if let Some(v) = number(ENV_WIN_RATE)? {
            debug!(win_rate = v, "override from environment");
            self.pipeline.win_rate = v;
        }
        if let Some(v) = number(ENV_AVG_MARGIN)? {
            debug!(avg_margin_per_win = v, "override from environment");
            self.pipeline.avg_margin_per_win = v;
        }
        if let Some(v) = number(ENV_COVERAGE_RATIO)? {
            debug!(coverage_ratio = v, "override from environment");
            self.pipeline.coverage_ratio = v;
        }
        if let Some(src) = lookup(ENV_SOURCE) {
            debug!(source = %src, "override from environment");
            self.source.set(Source::parse(&src));
        }
        Ok(self)
    }

    /// Reject configuration the metrics cannot be computed from.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, v: f64) -> Result<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                bail!("{name} must be a positive number, got {v}")
            }
        }

        if self.reps.is_empty() {
            bail!("at least one rep must be configured");
        }
        for rep in &self.reps {
            if rep.owner_key().trim().is_empty() {
                bail!("rep {:?} has an empty owner key", rep.name);
            }
        }
        positive("per_rep.netsuite_margin", self.per_rep.netsuite_margin)?;
        if !(self.per_rep.addons_margin.is_finite() && self.per_rep.addons_margin >= 0.0) {
            bail!(
                "per_rep.addons_margin must be zero or more, got {}",
                self.per_rep.addons_margin
            );
        }
        positive("pipeline.win_rate", self.pipeline.win_rate)?;
        if self.pipeline.win_rate > 100.0 {
            bail!(
                "pipeline.win_rate is a percentage and cannot exceed 100, got {}",
                self.pipeline.win_rate
            );
        }
        positive("pipeline.avg_margin_per_win", self.pipeline.avg_margin_per_win)?;
        positive("pipeline.coverage_ratio", self.pipeline.coverage_ratio)?;
        if self.source.url.is_some() && self.source.path.is_some() {
            bail!("source.url and source.path are mutually exclusive");
        }
        Ok(())
    }

    /// The configured export location, if any.
    pub fn source(&self) -> Result<Option<Source>> {
        match (&self.source.url, &self.source.path) {
            (Some(raw), _) => {
                let url = Url::parse(raw).with_context(|| format!("parsing source URL {raw}"))?;
                Ok(Some(Source::Url(url)))
            }
            (None, Some(path)) => Ok(Some(Source::Path(path.clone()))),
            (None, None) => Ok(None),
        }
    }

    /// Owner keys in configuration order, without duplicates.
    pub fn owner_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::with_capacity(self.reps.len());
        for rep in &self.reps {
            let key = rep.owner_key();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}
