//! Benchmarking CLI for the decomposition detectors.
//!
//! Generates a random block-angular instance, runs the selected detectors
//! on it and reports what they found.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use decomp_detect::{
    run_detectors, ConnectedDetector, DecompositionPool, DetectionScope, Detector, DetectorSettings,
    HypergraphDetector, PartitionAlgorithm,
};

mod generator;
mod report;

use generator::{generate, InstanceSpec};
use report::{BenchReport, DecompositionSummary, DetectorSummary};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum DetectorChoice {
    /// Connected components, no partitioner
    Connected,
    /// Row hypergraph (linking constraints)
    Rows,
    /// Column hypergraph (linking variables)
    Columns,
    /// Row-column hypergraph (arrowhead)
    Arrowhead,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AlgorithmChoice {
    Rb,
    Kway,
}

impl From<AlgorithmChoice> for PartitionAlgorithm {
    fn from(choice: AlgorithmChoice) -> Self {
        match choice {
            AlgorithmChoice::Rb => PartitionAlgorithm::Rb,
            AlgorithmChoice::Kway => PartitionAlgorithm::Kway,
        }
    }
}

/// Run structure detection on a generated block-structured instance
#[derive(Parser, Debug)]
#[command(name = "decomp-bench")]
#[command(about = "Structure detection benchmarks on generated block-angular instances")]
struct Cli {
    /// Planted blocks
    #[arg(long, default_value_t = 4)]
    blocks: usize,

    /// Variables per planted block
    #[arg(long, default_value_t = 10)]
    vars_per_block: usize,

    /// Constraints per planted block
    #[arg(long, default_value_t = 6)]
    conss_per_block: usize,

    /// Nonzero probability inside a block
    #[arg(long, default_value_t = 0.3)]
    density: f64,

    /// Planted linking constraints
    #[arg(long, default_value_t = 2)]
    linking_conss: usize,

    /// Planted linking variables
    #[arg(long, default_value_t = 0)]
    linking_vars: usize,

    /// Instance seed
    #[arg(long, default_value_t = 12345)]
    instance_seed: u64,

    /// Detectors to run, in order
    #[arg(short, long, value_enum, value_delimiter = ',', default_values_t = vec![
        DetectorChoice::Connected,
        DetectorChoice::Rows,
        DetectorChoice::Columns,
        DetectorChoice::Arrowhead,
    ])]
    detectors: Vec<DetectorChoice>,

    /// Smallest block count to try
    #[arg(long, default_value_t = 2)]
    min_blocks: usize,

    /// Largest block count to try
    #[arg(long, default_value_t = 8)]
    max_blocks: usize,

    /// Partitioner executable
    #[arg(long, default_value = "hmetis")]
    partitioner: PathBuf,

    /// Partitioning algorithm
    #[arg(long, value_enum, default_value_t = AlgorithmChoice::Rb)]
    algorithm: AlgorithmChoice,

    /// Partitioner seed
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Time limit per detector in seconds
    #[arg(long)]
    time_limit: Option<f64>,

    /// Keep partitioner input and output files
    #[arg(long)]
    keep_files: bool,

    /// Write the report as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn instance_spec(&self) -> InstanceSpec {
        InstanceSpec {
            nblocks: self.blocks,
            vars_per_block: self.vars_per_block,
            conss_per_block: self.conss_per_block,
            density: self.density,
            linking_conss: self.linking_conss,
            linking_vars: self.linking_vars,
            seed: self.instance_seed,
            ..Default::default()
        }
    }

    fn settings(&self) -> DetectorSettings {
        let mut settings = DetectorSettings::default()
            .with_block_range(self.min_blocks, self.max_blocks)
            .with_partitioner(&self.partitioner)
            .with_seed(self.seed);
        settings.algorithm = self.algorithm.into();
        settings.verbose = self.verbose;
        if let Some(secs) = self.time_limit {
            settings = settings.with_time_limit(secs);
        }
        if self.keep_files {
            settings = settings.keep_files();
        }
        settings
    }

    fn detectors(&self, settings: &DetectorSettings) -> Vec<Box<dyn Detector>> {
        self.detectors
            .iter()
            .map(|choice| -> Box<dyn Detector> {
                match choice {
                    DetectorChoice::Connected => Box::new(ConnectedDetector::new()),
                    DetectorChoice::Rows => Box::new(HypergraphDetector::rows(settings.clone())),
                    DetectorChoice::Columns => Box::new(HypergraphDetector::columns(settings.clone())),
                    DetectorChoice::Arrowhead => Box::new(HypergraphDetector::arrowhead(settings.clone())),
                }
            })
            .collect()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let settings = cli.settings();
    settings.validate().context("Invalid detector settings")?;

    let spec = cli.instance_spec();
    let instance = generate(&spec).context("Failed to generate instance")?;
    let problem = &instance.problem;
    log::info!(
        "Generated {} with {} variables, {} constraints, {} nonzeros",
        problem.name,
        problem.var_types.len(),
        problem.con_lower.len(),
        problem.nnz()
    );

    let detectors = cli.detectors(&settings);
    let mut pool = DecompositionPool::new();
    let reports = run_detectors(problem, &DetectionScope::full(), &detectors, &mut pool);

    let best_index = pool
        .best()
        .and_then(|best| pool.iter().position(|d| std::ptr::eq(d, best)));
    let decompositions = pool
        .iter()
        .map(|d| DecompositionSummary::new(d, Some(&instance.planted)))
        .collect();

    let report = BenchReport {
        problem: problem.name.clone(),
        instance: spec,
        detectors: reports.iter().map(DetectorSummary::from).collect(),
        decompositions,
        best: best_index,
    };
    report.print();

    if let Some(best) = pool.best() {
        println!("\n{}", best);
    }

    if let Some(path) = &cli.output {
        report.save_json(path)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}
