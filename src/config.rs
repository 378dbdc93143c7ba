//! Engine configuration: worker pool size, rate-gate capacity, per-kind
//! timeouts and checkpoint cadence.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{PipelineError, Result};
use crate::graph::Kind;

/// Tunables for the execution engine (§5, §6). Loads layered from defaults,
/// an optional config file, then `RAGFORGE_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Global worker pool cap `W` (§4.6, default 8)
    #[serde(default = "default_workers")]
    pub max_workers: usize,

    /// Rate gate capacity `R` shared by embedder/llm/reranker nodes (default 5)
    #[serde(default = "default_rate_gate")]
    pub rate_gate_capacity: usize,

    /// Per-kind timeout overrides, in seconds. Falls back to
    /// `default_timeout_secs(kind)` when absent.
    #[serde(default)]
    pub timeouts_secs: HashMap<String, u64>,

    /// Minimum interval between opportunistic checkpoint writes
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval_secs: u64,

    /// Write a checkpoint at every wave boundary regardless of the interval
    #[serde(default = "default_true")]
    pub checkpoint_on_wave_boundary: bool,
}

fn default_workers() -> usize {
    8
}

fn default_rate_gate() -> usize {
    5
}

fn default_checkpoint_interval() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_workers: default_workers(),
            rate_gate_capacity: default_rate_gate(),
            timeouts_secs: HashMap::new(),
            checkpoint_interval_secs: default_checkpoint_interval(),
            checkpoint_on_wave_boundary: true,
        }
    }
}

impl EngineOptions {
    /// Load configuration from a file (TOML/YAML/JSON by extension), falling
    /// back to defaults for anything the file omits, then overlay any
    /// `RAGFORGE_*` environment variables.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let mut options: Self = match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yml::from_str(&content)?,
            _ => return Err(anyhow::anyhow!("unsupported config file format")),
        };
        options.apply_env_overrides();
        Ok(options)
    }

    /// Overlay `RAGFORGE_MAX_WORKERS` / `RAGFORGE_RATE_GATE_CAPACITY` /
    /// `RAGFORGE_CHECKPOINT_INTERVAL_SECS` on top of whatever was loaded.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("RAGFORGE_MAX_WORKERS") {
            if let Ok(n) = v.parse() {
                self.max_workers = n;
            }
        }
        if let Ok(v) = std::env::var("RAGFORGE_RATE_GATE_CAPACITY") {
            if let Ok(n) = v.parse() {
                self.rate_gate_capacity = n;
            }
        }
        if let Ok(v) = std::env::var("RAGFORGE_CHECKPOINT_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                self.checkpoint_interval_secs = n;
            }
        }
    }

    /// Per-kind default handler deadline (§5): 30s for external-service
    /// kinds, 60s for the splitter, 5s for the loader, 10s otherwise.
    pub fn timeout_for(&self, kind: Kind) -> Duration {
        let key = kind.as_str();
        if let Some(secs) = self.timeouts_secs.get(key) {
            return Duration::from_secs(*secs);
        }
        let secs = match kind {
            Kind::Embedder | Kind::Llm | Kind::Reranker => 30,
            Kind::Splitter => 60,
            Kind::Loader => 5,
            Kind::VectorDb | Kind::Retriever | Kind::Augmentor => 10,
        };
        Duration::from_secs(secs)
    }

    /// Whether `kind` is subject to the shared external-service rate gate
    /// (§4.6: embedder, llm, reranker)
    pub fn is_rate_gated(kind: Kind) -> bool {
        matches!(kind, Kind::Embedder | Kind::Llm | Kind::Reranker)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_workers must be greater than 0".into(),
            ));
        }
        if self.rate_gate_capacity == 0 {
            return Err(PipelineError::InvalidConfig(
                "rate_gate_capacity must be greater than 0".into(),
            ));
        }
        for (kind, secs) in &self.timeouts_secs {
            if *secs == 0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "timeout for kind '{kind}' must be greater than 0 seconds"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let options = EngineOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.max_workers, 8);
        assert_eq!(options.rate_gate_capacity, 5);
    }

    #[test]
    fn rejects_zero_workers() {
        let mut options = EngineOptions::default();
        options.max_workers = 0;
        assert!(options.validate().is_err());
    }

    #[test]
    fn per_kind_timeouts_match_spec_defaults() {
        let options = EngineOptions::default();
        assert_eq!(options.timeout_for(Kind::Embedder), Duration::from_secs(30));
        assert_eq!(options.timeout_for(Kind::Splitter), Duration::from_secs(60));
        assert_eq!(options.timeout_for(Kind::Loader), Duration::from_secs(5));
        assert_eq!(options.timeout_for(Kind::VectorDb), Duration::from_secs(10));
    }

    #[test]
    fn rate_gate_membership() {
        assert!(EngineOptions::is_rate_gated(Kind::Embedder));
        assert!(EngineOptions::is_rate_gated(Kind::Llm));
        assert!(EngineOptions::is_rate_gated(Kind::Reranker));
        assert!(!EngineOptions::is_rate_gated(Kind::Loader));
        assert!(!EngineOptions::is_rate_gated(Kind::Splitter));
    }
}
