//! Benchmark report and JSON export.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use decomp_detect::detector::CandidateResult;
use decomp_detect::{Decomposition, DecompositionKind, DetectionReport, DetectionStatus, Scores};
use serde::{Deserialize, Serialize};

use crate::generator::InstanceSpec;

/// Compact description of a decomposition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompositionSummary {
    /// Detector that produced it.
    pub detector: String,
    /// Number of blocks.
    pub nblocks: usize,
    /// Border shape.
    pub kind: DecompositionKind,
    /// Linking constraints.
    pub linking_conss: usize,
    /// Linking variables.
    pub linking_vars: usize,
    /// Constraints per block.
    pub block_sizes: Vec<usize>,
    /// Quality scores.
    pub scores: Option<Scores>,
    /// Share of planted variable pairs kept together or apart correctly.
    pub planted_agreement: Option<f64>,
}

impl DecompositionSummary {
    /// Summarize `decomp`, comparing against the planted blocks if given.
    pub fn new(decomp: &Decomposition, planted: Option<&[Option<usize>]>) -> Self {
        Self {
            detector: decomp.provenance.detector.clone(),
            nblocks: decomp.nblocks,
            kind: decomp.kind,
            linking_conss: decomp.num_linking_conss(),
            linking_vars: decomp.num_linking_vars(),
            block_sizes: decomp.block_conss.iter().map(Vec::len).collect(),
            scores: decomp.scores().copied(),
            planted_agreement: planted.map(|p| planted_agreement(decomp, p)),
        }
    }
}

/// Pairwise agreement between found and planted blocks over variables that
/// both assign to a block (Rand index).
pub fn planted_agreement(decomp: &Decomposition, planted: &[Option<usize>]) -> f64 {
    let pairs: Vec<(usize, usize)> = planted
        .iter()
        .enumerate()
        .filter_map(|(v, p)| Some(((*p)?, decomp.var_block(v).block()?)))
        .collect();

    let mut agree = 0usize;
    let mut total = 0usize;
    for i in 0..pairs.len() {
        for j in (i + 1)..pairs.len() {
            let same_planted = pairs[i].0 == pairs[j].0;
            let same_found = pairs[i].1 == pairs[j].1;
            if same_planted == same_found {
                agree += 1;
            }
            total += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        agree as f64 / total as f64
    }
}

/// One detector's run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorSummary {
    /// Detector name.
    pub detector: String,
    /// Result status.
    pub status: DetectionStatus,
    /// Error message, if any.
    pub error: Option<String>,
    /// Per block count outcomes.
    pub candidates: Vec<CandidateResult>,
    /// Wall-clock seconds.
    pub time_secs: f64,
}

impl From<&DetectionReport> for DetectorSummary {
    fn from(report: &DetectionReport) -> Self {
        Self {
            detector: report.detector.clone(),
            status: report.status,
            error: report.error.clone(),
            candidates: report.candidates.clone(),
            time_secs: report.elapsed.as_secs_f64(),
        }
    }
}

/// Everything one bench run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchReport {
    /// Instance name.
    pub problem: String,
    /// Generator parameters.
    pub instance: InstanceSpec,
    /// Per detector results.
    pub detectors: Vec<DetectorSummary>,
    /// Every decomposition handed off.
    pub decompositions: Vec<DecompositionSummary>,
    /// Index into `decompositions` of the best one.
    pub best: Option<usize>,
}

impl BenchReport {
    /// Save to JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create file {}", path.as_ref().display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .with_context(|| format!("Failed to write JSON to {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Load from JSON file
    #[cfg(test)]
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open file {}", path.as_ref().display()))?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("Failed to parse JSON from {}", path.as_ref().display()))
    }

    /// Print a human-readable summary.
    pub fn print(&self) {
        println!("\n{}", "=".repeat(60));
        println!("Problem: {}", self.problem);
        println!("{}", "=".repeat(60));
        for det in &self.detectors {
            print!("{:<16} {:<12} {:>8.3}s", det.detector, format!("{:?}", det.status), det.time_secs);
            match &det.error {
                Some(e) => println!("  {}", e),
                None => println!(),
            }
        }
        println!("{}", "-".repeat(60));
        for (i, d) in self.decompositions.iter().enumerate() {
            let marker = if Some(i) == self.best { "*" } else { " " };
            println!(
                "{} {:<16} {:>3} blocks  {:>4} lc {:>4} lv  total {}{}",
                marker,
                d.detector,
                d.nblocks,
                d.linking_conss,
                d.linking_vars,
                d.scores.map_or("-".to_string(), |s| format!("{:.6}", s.total())),
                d.planted_agreement
                    .map_or(String::new(), |a| format!("  planted {:.3}", a)),
            );
        }
        println!("{}", "=".repeat(60));
    }
}
