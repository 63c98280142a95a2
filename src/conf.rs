//! Configuration of the prioritization.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// How the evaluation window around a variant is chosen.
#[derive(
    clap::ValueEnum,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DispatchMode {
    /// Variant span plus the genes it touches.
    Gene,
    /// Up to the nearest stable TAD boundaries.
    #[default]
    Tad,
}

/// Weights and thresholds of the prioritization.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PrioritizationConfig {
    /// Weight of gene contributions.
    pub gene_factor: f64,
    /// Weight of enhancer contributions.
    pub enhancer_factor: f64,
    /// Number of bases 5' of a transcript considered as its promoter.
    pub promoter_length: u32,
    /// Impact of a variant that only hits the promoter.
    pub promoter_fitness_gain: f64,
    /// Minimal stability of a TAD boundary to bound the window.
    pub tad_stability_threshold: f64,
    /// Extend to the TAD boundaries even if the variant only touches one gene locus.
    pub force_evaluate_tad: bool,
    pub dispatcher: DispatchMode,
    /// Routes with more genes are not evaluated.
    pub max_genes: usize,
}

impl Default for PrioritizationConfig {
    fn default() -> Self {
        Self {
            gene_factor: 1.0,
            enhancer_factor: 0.25,
            promoter_length: 2000,
            promoter_fitness_gain: 0.6,
            tad_stability_threshold: 0.25,
            force_evaluate_tad: false,
            dispatcher: DispatchMode::Tad,
            max_genes: 100,
        }
    }
}

impl PrioritizationConfig {
    /// Load from a JSON file; missing fields take their default.
    #[tracing::instrument]
    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        tracing::debug!("loading configuration from {:?}", path);
        let file = std::fs::File::open(path)
            .map_err(|e| anyhow::anyhow!("could not open {:?}: {}", path, e))?;
        let result: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        result.validate()?;
        Ok(result)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        for (name, value) in [
            ("gene_factor", self.gene_factor),
            ("enhancer_factor", self.enhancer_factor),
        ] {
            if !(value >= 0.0) {
                anyhow::bail!("{} must not be negative but was {}", name, value);
            }
        }
        for (name, value) in [
            ("promoter_fitness_gain", self.promoter_fitness_gain),
            ("tad_stability_threshold", self.tad_stability_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{} must be in [0, 1] but was {}", name, value);
            }
        }
        Ok(())
    }
}
