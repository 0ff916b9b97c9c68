use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the records of one threshold round are distributed over workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// One pass over the whole dataset on the calling thread.
    Sequential,
    /// Static chunks, one worker each, joined through a barrier.
    BarrierParallel,
    /// Static chunks seeded into per-worker deques, no stealing.
    DequeNoSteal,
    /// Per-worker deques; idle workers steal from random victims.
    DequeSteal,
}

impl Mode {
    pub const ALL: [Mode; 4] = [
        Mode::Sequential,
        Mode::BarrierParallel,
        Mode::DequeNoSteal,
        Mode::DequeSteal,
    ];

    /// Short name used on the command line and in benchmark output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Sequential => "s",
            Mode::BarrierParallel => "p-normal",
            Mode::DequeNoSteal => "p-nosteal",
            Mode::DequeSteal => "p-steal",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Mode::Sequential => "run sequentially",
            Mode::BarrierParallel => "static chunks per worker, synchronised with a barrier",
            Mode::DequeNoSteal => "static chunks in per-worker deques, no stealing",
            Mode::DequeSteal => "per-worker deques with random-victim work stealing",
        }
    }

    pub fn is_parallel(&self) -> bool {
        !matches!(self, Mode::Sequential)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "s" | "sequential" => Ok(Mode::Sequential),
            "p-normal" => Ok(Mode::BarrierParallel),
            "p-nosteal" => Ok(Mode::DequeNoSteal),
            "p-steal" => Ok(Mode::DequeSteal),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

/// Record order applied after loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetLayout {
    /// File order.
    #[default]
    Balanced,
    /// Stable sort by text length, shortest first. Later static chunks then
    /// carry longer, costlier records.
    Imbalanced,
}

impl FromStr for DatasetLayout {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "balanced" => Ok(DatasetLayout::Balanced),
            "imbalanced" => Ok(DatasetLayout::Imbalanced),
            other => Err(ConfigError::UnknownLayout(other.to_string())),
        }
    }
}

/// Thresholds swept when no config file overrides them.
pub const DEFAULT_THRESHOLDS: [f32; 14] = [
    0.1, 0.15, 0.2, 0.25, 0.3, 0.35, 0.4, 0.45, 0.5, 0.55, 0.6, 0.65, 0.7, 0.75,
];

/// Sweep settings, loadable from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Score cutoffs, evaluated in this order.
    pub thresholds: Vec<f32>,

    /// Label value treated as the positive class.
    pub positive_label: String,

    /// Where the precision/recall table is written.
    pub output: PathBuf,

    /// Optional plotting script, run as `python <script> <output>`.
    pub plot_script: Option<PathBuf>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
            positive_label: "0".to_string(),
            output: PathBuf::from("results/PrecisionRecall.txt"),
            plot_script: None,
        }
    }
}

impl SweepConfig {
    /// Reads a sweep configuration from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thresholds.is_empty() {
            return Err(ConfigError::EmptySweep);
        }
        if let Some(bad) = self
            .thresholds
            .iter()
            .find(|t| !(0.0..=1.0).contains(*t))
        {
            return Err(ConfigError::InvalidThreshold(*bad));
        }
        Ok(())
    }
}

/// Everything one run needs. Immutable once the run starts.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    /// Worker count. Ignored by [`Mode::Sequential`].
    pub threads: usize,
    pub dataset: PathBuf,
    pub layout: DatasetLayout,
    pub sweep: SweepConfig,
}

impl Config {
    /// A config with the default sweep and balanced layout. A `threads` of
    /// `None` uses one worker per logical CPU.
    pub fn new(mode: Mode, threads: Option<usize>, dataset: impl Into<PathBuf>) -> Self {
        Config {
            mode,
            threads: threads.unwrap_or_else(num_cpus::get),
            dataset: dataset.into(),
            layout: DatasetLayout::default(),
            sweep: SweepConfig::default(),
        }
    }

    pub fn with_layout(mut self, layout: DatasetLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_sweep(mut self, sweep: SweepConfig) -> Self {
        self.sweep = sweep;
        self
    }

    /// Worker threads the run will actually use.
    pub fn workers(&self) -> usize {
        if self.mode.is_parallel() {
            self.threads
        } else {
            1
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode.is_parallel() && self.threads == 0 {
            return Err(ConfigError::MissingThreads(self.mode));
        }
        self.sweep.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_mode_names_round_trip() {
        for mode in Mode::ALL {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
        assert!(matches!(
            "p-fast".parse::<Mode>(),
            Err(ConfigError::UnknownMode(m)) if m == "p-fast"
        ));
    }

    #[test]
    fn test_parallel_mode_needs_threads() {
        let config = Config::new(Mode::DequeSteal, Some(0), "data.csv");
        assert!(matches!(config.validate(), Err(ConfigError::MissingThreads(Mode::DequeSteal))));
    }

    #[test]
    fn test_sequential_ignores_threads() {
        let config = Config::new(Mode::Sequential, Some(0), "data.csv");
        assert!(config.validate().is_ok());
        assert_eq!(config.workers(), 1);
    }

    #[test]
    fn test_default_sweep() {
        let sweep = SweepConfig::default();
        assert_eq!(sweep.thresholds.len(), 14);
        assert_eq!(sweep.thresholds[0], 0.1);
        assert_eq!(sweep.thresholds[13], 0.75);
        assert!(sweep.validate().is_ok());
    }

    #[test]
    fn test_invalid_thresholds() {
        let mut sweep = SweepConfig::default();
        sweep.thresholds = vec![];
        assert!(matches!(sweep.validate(), Err(ConfigError::EmptySweep)));
        sweep.thresholds = vec![0.5, 1.5];
        assert!(matches!(sweep.validate(), Err(ConfigError::InvalidThreshold(t)) if t == 1.5));
        sweep.thresholds = vec![f32::NAN];
        assert!(matches!(sweep.validate(), Err(ConfigError::InvalidThreshold(_))));
    }

    #[test]
    fn test_sweep_from_toml_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "thresholds = [0.2, 0.4]").unwrap();
        writeln!(file, "positive_label = \"neg\"").unwrap();
        let sweep = SweepConfig::from_file(file.path()).unwrap();
        assert_eq!(sweep.thresholds, vec![0.2, 0.4]);
        assert_eq!(sweep.positive_label, "neg");
        assert_eq!(sweep.output, PathBuf::from("results/PrecisionRecall.txt"));
        assert!(sweep.plot_script.is_none());
    }

    #[test]
    fn test_sweep_from_bad_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "thresholds = \"nope\"").unwrap();
        assert!(matches!(SweepConfig::from_file(file.path()), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            SweepConfig::from_file(Path::new("/definitely/not/here.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
