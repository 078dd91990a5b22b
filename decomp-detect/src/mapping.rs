//! Mapping raw vertex partitions back onto variables and constraints.

use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};
use crate::hypergraph::{Hypergraph, HypergraphKind, VertexOrigin};
use crate::partition::PartitionAssignment;

/// Block membership of a variable or constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockAssignment {
    /// Never seen by the partition.
    Unassigned,
    /// Confined to one block.
    Block(usize),
    /// Spans several blocks; belongs to the border.
    Linking,
}

impl BlockAssignment {
    /// Block index, if confined to one block.
    pub fn block(&self) -> Option<usize> {
        match self {
            BlockAssignment::Block(b) => Some(*b),
            _ => None,
        }
    }

    /// True for the border.
    pub fn is_linking(&self) -> bool {
        matches!(self, BlockAssignment::Linking)
    }

    /// True if not yet assigned.
    pub fn is_unassigned(&self) -> bool {
        matches!(self, BlockAssignment::Unassigned)
    }

    /// Account for one more occurrence in `block`.
    ///
    /// The first occurrence fixes the block; any occurrence in a different
    /// block makes the entity linking for good.
    pub fn merge(self, block: usize) -> Self {
        match self {
            BlockAssignment::Unassigned => BlockAssignment::Block(block),
            BlockAssignment::Block(b) if b == block => self,
            _ => BlockAssignment::Linking,
        }
    }
}

/// Vertex partition expressed on problem entities.
///
/// Row and row-column hypergraphs assign variables; column hypergraphs
/// assign constraints. The other side stays `Unassigned` and is derived by
/// the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedPartition {
    /// Number of blocks.
    pub nblocks: usize,
    /// Encoding the partition came from.
    pub kind: HypergraphKind,
    /// Assignment per variable of the full problem.
    pub vars: Vec<BlockAssignment>,
    /// Assignment per constraint of the full problem.
    pub conss: Vec<BlockAssignment>,
}

impl MappedPartition {
    /// True if the variables carry the partition.
    pub fn is_variable_driven(&self) -> bool {
        self.kind != HypergraphKind::Column
    }

    /// Number of linking variables.
    pub fn num_linking_vars(&self) -> usize {
        self.vars.iter().filter(|a| a.is_linking()).count()
    }
}

/// Translate a vertex partition into per-variable or per-constraint blocks.
///
/// A variable whose copies all land in one block gets that block; copies in
/// different blocks make it linking. Every variable (or constraint) with at
/// least one vertex ends up assigned.
pub fn map_partition(graph: &Hypergraph, partition: &PartitionAssignment) -> DetectResult<MappedPartition> {
    if partition.len() != graph.num_vertices() {
        return Err(DetectError::InvalidProblem(format!(
            "partition covers {} vertices, hypergraph has {}",
            partition.len(),
            graph.num_vertices()
        )));
    }

    let mut vars = vec![BlockAssignment::Unassigned; graph.num_problem_vars()];
    let mut conss = vec![BlockAssignment::Unassigned; graph.num_problem_conss()];

    for vertex in &graph.vertices {
        let block = partition.block_of(vertex.id);
        match vertex.origin {
            VertexOrigin::Copy { var, .. } | VertexOrigin::Variable(var) => {
                vars[var] = vars[var].merge(block);
            }
            VertexOrigin::Constraint(cons) => {
                conss[cons] = conss[cons].merge(block);
            }
        }
    }

    Ok(MappedPartition {
        nblocks: partition.nblocks(),
        kind: graph.kind,
        vars,
        conss,
    })
}
