//! Hypergraph-based structure detection for Dantzig-Wolfe decomposition.
//!
//! Given the constraint matrix of a mixed-integer program, the detectors in
//! this crate look for a block-angular structure: blocks of constraints and
//! variables that are independent except for a small border of linking
//! constraints and/or linking variables.
//!
//! # Pipeline
//!
//! For every block count in the configured range:
//!
//! 1. **Hypergraph**: encode the matrix as a weighted hypergraph (row,
//!    column or row-column encoding)
//! 2. **Partition**: split it into balanced blocks with an external
//!    partitioner (hMETIS, driven through its file protocol)
//! 3. **Map**: translate vertex blocks back onto variables and constraints
//! 4. **Assemble**: bucket everything into blocks and the border
//! 5. **Score**: rate the candidate; the lowest score wins
//!
//! # Example
//!
//! ```ignore
//! use decomp_detect::{detect, DetectorSettings, SparseProblemBuilder};
//!
//! let mut b = SparseProblemBuilder::new("tiny");
//! let x: Vec<usize> = (0..4).map(|i| b.add_binary(format!("x{}", i))).collect();
//! b.add_le("c1", &[(x[0], 1.0), (x[1], 1.0)], 1.0);
//! b.add_le("c2", &[(x[2], 1.0), (x[3], 1.0)], 1.0);
//! b.add_eq("link", &[(x[0], 1.0), (x[2], 1.0)], 1.0);
//! let prob = b.build()?;
//!
//! let settings = DetectorSettings::default().with_block_range(2, 4);
//! if let Some(decomp) = detect(&prob, &settings) {
//!     println!("{}", decomp);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decomposition;
pub mod detector;
pub mod error;
pub mod hypergraph;
pub mod mapping;
pub mod model;
pub mod partition;
pub mod settings;

// Re-export main types
pub use decomposition::{
    Decomposition, DecompositionKind, DecompositionPool, DecompositionSink, Provenance, Scores,
};
pub use detector::{
    run_detectors, ConnectedDetector, DetectionReport, DetectionStatus, Detector, HypergraphDetector,
};
pub use error::{DetectError, DetectResult};
pub use hypergraph::{Hypergraph, HypergraphKind};
pub use mapping::BlockAssignment;
pub use model::{DetectionScope, ProblemSource, SparseProblem, SparseProblemBuilder, VarType};
pub use partition::{HmetisPartitioner, HypergraphPartitioner};
pub use settings::{DetectorSettings, PartitionAlgorithm};

/// Run the connected-components detector and all three hypergraph
/// detectors on the whole problem and return the best decomposition.
pub fn detect(problem: &dyn ProblemSource, settings: &DetectorSettings) -> Option<Decomposition> {
    let mut detectors: Vec<Box<dyn Detector>> = vec![Box::new(ConnectedDetector::new())];
    for det in HypergraphDetector::all(settings) {
        detectors.push(Box::new(det));
    }

    let mut pool = DecompositionPool::new();
    run_detectors(problem, &DetectionScope::full(), &detectors, &mut pool);
    pool.into_best()
}
