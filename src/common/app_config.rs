// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static CONFIG: OnceLock<NovaRocksAggConfig> = OnceLock::new();

const CONFIG_ENV: &str = "NOVAROCKS_AGG_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "novarocks_agg.toml";

fn default_log_level() -> String {
    "info".to_string()
}

pub fn init_from_path(path: impl AsRef<Path>) -> Result<&'static NovaRocksAggConfig> {
    if let Some(cfg) = CONFIG.get() {
        return Ok(cfg);
    }
    let cfg = NovaRocksAggConfig::load_from_file(path.as_ref())?;
    Ok(CONFIG.get_or_init(|| cfg))
}

/// Loads `$NOVAROCKS_AGG_CONFIG` or `./novarocks_agg.toml`; without either the
/// built-in defaults are used.
pub fn init_from_env_or_default() -> Result<&'static NovaRocksAggConfig> {
    if let Some(cfg) = CONFIG.get() {
        return Ok(cfg);
    }
    let cfg = match config_path_from_env_or_default() {
        Some(path) => NovaRocksAggConfig::load_from_file(&path)?,
        None => NovaRocksAggConfig::default(),
    };
    Ok(CONFIG.get_or_init(|| cfg))
}

pub fn config() -> Result<&'static NovaRocksAggConfig> {
    init_from_env_or_default()
}

fn config_path_from_env_or_default() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        if !p.trim().is_empty() {
            return Some(PathBuf::from(p.trim()));
        }
    }
    let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
    candidate.exists().then_some(candidate)
}

#[derive(Clone, Debug, Deserialize)]
pub struct NovaRocksAggConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional full tracing EnvFilter expression; takes precedence over `log_level`.
    #[serde(default)]
    pub log_filter: Option<String>,

    #[serde(default)]
    pub group_by: GroupByConfig,

    #[serde(default)]
    pub exec: ExecConfig,

    #[serde(default)]
    pub hll: HllConfig,
}

impl NovaRocksAggConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config file: {}", path.display()))?;
        Self::parse(&s).with_context(|| format!("load config: {}", path.display()))
    }

    pub fn parse(s: &str) -> Result<Self> {
        let cfg: NovaRocksAggConfig = toml::from_str(s).context("parse toml")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let g = &self.group_by;
        if g.max_capacity == 0 {
            bail!("group_by.max_capacity must be positive");
        }
        if let Some(initial) = g.initial_capacity.filter(|&n| n > g.max_capacity) {
            bail!(
                "group_by.initial_capacity {} exceeds max_capacity {}",
                initial,
                g.max_capacity
            );
        }
        if g.trim_size > g.max_capacity {
            bail!(
                "group_by.trim_size {} exceeds max_capacity {}",
                g.trim_size,
                g.max_capacity
            );
        }
        if !(4..=16).contains(&self.hll.log2m) {
            bail!("hll.log2m must be within [4, 16], got {}", self.hll.log2m);
        }
        Ok(())
    }

    pub fn effective_log_filter(&self) -> &str {
        self.log_filter
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(self.log_level.as_str())
    }
}

impl Default for NovaRocksAggConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_filter: None,
            group_by: GroupByConfig::default(),
            exec: ExecConfig::default(),
            hll: HllConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct GroupByConfig {
    /// Unset means the default, clamped to `max_capacity`.
    #[serde(default)]
    pub initial_capacity: Option<usize>,
    #[serde(default = "default_group_by_max_capacity")]
    pub max_capacity: usize,
    #[serde(default = "default_group_by_trim_size")]
    pub trim_size: usize,
}

fn default_group_by_initial_capacity() -> usize {
    1024
}

impl GroupByConfig {
    pub fn effective_initial_capacity(&self) -> usize {
        self.initial_capacity
            .unwrap_or_else(|| default_group_by_initial_capacity().min(self.max_capacity))
    }
}

fn default_group_by_max_capacity() -> usize {
    100_000
}

fn default_group_by_trim_size() -> usize {
    5_000
}

impl Default for GroupByConfig {
    fn default() -> Self {
        Self {
            initial_capacity: None,
            max_capacity: default_group_by_max_capacity(),
            trim_size: default_group_by_trim_size(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExecConfig {
    /// 0 means one worker per available CPU core.
    #[serde(default)]
    pub partition_threads: usize,
}

impl ExecConfig {
    pub fn actual_partition_threads(&self) -> usize {
        if self.partition_threads > 0 {
            self.partition_threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct HllConfig {
    #[serde(default = "default_hll_log2m")]
    pub log2m: u8,
}

fn default_hll_log2m() -> u8 {
    8
}

impl Default for HllConfig {
    fn default() -> Self {
        Self {
            log2m: default_hll_log2m(),
        }
    }
}
