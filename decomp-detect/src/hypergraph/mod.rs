//! Weighted hypergraph representation of a constraint matrix.
//!
//! Three encodings are supported:
//!
//! - **Row**: one vertex per variable, one hyperedge per constraint.
//!   Cut hyperedges become linking constraints (bordered structure).
//! - **Column**: one vertex per constraint, one hyperedge per variable.
//!   Cut hyperedges become linking variables.
//! - **RowColumn**: one vertex per (variable, constraint) incidence, one
//!   hyperedge per constraint over its copies and one per variable over all
//!   of its copies. Both constraints and variables can end up linking
//!   (arrowhead structure).
//!
//! Hyperedges with fewer than two members carry no partitioning information
//! and are never emitted.

mod builder;
mod weights;

pub use builder::HypergraphBuilder;
pub use weights::{coefficient_stddev, EdgeWeights};

use serde::{Deserialize, Serialize};

/// Which matrix encoding a hypergraph uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HypergraphKind {
    /// Vertices are variables, hyperedges are constraints.
    Row,
    /// Vertices are constraints, hyperedges are variables.
    Column,
    /// Vertices are variable copies, hyperedges are constraints and variables.
    RowColumn,
}

impl HypergraphKind {
    /// Short tag used in file names and reports.
    pub fn tag(&self) -> &'static str {
        match self {
            HypergraphKind::Row => "row",
            HypergraphKind::Column => "col",
            HypergraphKind::RowColumn => "rowcol",
        }
    }
}

/// What a vertex stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum VertexOrigin {
    /// Copy of `var` inside constraint `cons`.
    Copy { var: usize, cons: usize },
    /// A variable.
    Variable(usize),
    /// A constraint.
    Constraint(usize),
}

/// A hypergraph vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vertex {
    /// Contiguous 0-based id.
    pub id: usize,
    /// Originating entity.
    pub origin: VertexOrigin,
}

impl Vertex {
    /// Originating variable, if any.
    pub fn var(&self) -> Option<usize> {
        match self.origin {
            VertexOrigin::Copy { var, .. } | VertexOrigin::Variable(var) => Some(var),
            VertexOrigin::Constraint(_) => None,
        }
    }

    /// Originating constraint, if any.
    pub fn cons(&self) -> Option<usize> {
        match self.origin {
            VertexOrigin::Copy { cons, .. } | VertexOrigin::Constraint(cons) => Some(cons),
            VertexOrigin::Variable(_) => None,
        }
    }
}

/// Hyperedge type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Edge stands for a variable.
    Variable,
    /// Edge stands for a constraint.
    Constraint,
}

/// A weighted hyperedge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperEdge {
    /// Variable or constraint edge.
    pub kind: EdgeKind,
    /// Member vertex ids, in insertion order.
    pub members: Vec<usize>,
    /// Cost of cutting this edge.
    pub cost: u32,
    /// Index of the originating variable or constraint.
    pub origin: usize,
}

/// Hypergraph built from a (possibly restricted) constraint matrix.
#[derive(Debug, Clone)]
pub struct Hypergraph {
    /// Encoding.
    pub kind: HypergraphKind,
    /// Vertices, indexed by id.
    pub vertices: Vec<Vertex>,
    /// Hyperedges with at least two members.
    pub edges: Vec<HyperEdge>,
    /// In-scope constraints without any active variable.
    pub empty_conss: Vec<usize>,
    var_vertices: Vec<Vec<usize>>,
    cons_vertices: Vec<Vec<usize>>,
}

impl Hypergraph {
    pub(crate) fn new(kind: HypergraphKind, num_vars: usize, num_conss: usize) -> Self {
        Self {
            kind,
            vertices: Vec::new(),
            edges: Vec::new(),
            empty_conss: Vec::new(),
            var_vertices: vec![Vec::new(); num_vars],
            cons_vertices: vec![Vec::new(); num_conss],
        }
    }

    /// Append a vertex and register it with its origins.
    pub(crate) fn add_vertex(&mut self, origin: VertexOrigin) -> usize {
        let id = self.vertices.len();
        let vertex = Vertex { id, origin };
        if let Some(var) = vertex.var() {
            self.var_vertices[var].push(id);
        }
        if let Some(cons) = vertex.cons() {
            self.cons_vertices[cons].push(id);
        }
        self.vertices.push(vertex);
        id
    }

    /// Append an edge unless it is degenerate. Returns true if kept.
    pub(crate) fn add_edge(&mut self, kind: EdgeKind, members: Vec<usize>, cost: u32, origin: usize) -> bool {
        if members.len() < 2 {
            return false;
        }
        self.edges.push(HyperEdge {
            kind,
            members,
            cost,
            origin,
        });
        true
    }

    /// Number of vertices (without partitioner dummies).
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of hyperedges.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Total number of pins (edge memberships).
    pub fn num_pins(&self) -> usize {
        self.edges.iter().map(|e| e.members.len()).sum()
    }

    /// A hypergraph without edges gives the partitioner nothing to work on.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Vertices originating from a variable.
    pub fn vertices_of_var(&self, var: usize) -> &[usize] {
        &self.var_vertices[var]
    }

    /// Vertices originating from a constraint.
    pub fn vertices_of_cons(&self, cons: usize) -> &[usize] {
        &self.cons_vertices[cons]
    }

    /// Number of variables of the underlying problem.
    pub fn num_problem_vars(&self) -> usize {
        self.var_vertices.len()
    }

    /// Number of constraints of the underlying problem.
    pub fn num_problem_conss(&self) -> usize {
        self.cons_vertices.len()
    }

    /// Sum of all edge costs.
    pub fn total_cost(&self) -> u64 {
        self.edges.iter().map(|e| e.cost as u64).sum()
    }

    /// Sum of costs of edges whose members lie in more than one block.
    ///
    /// `blocks[v]` is the block of vertex `v`.
    pub fn cut_cost(&self, blocks: &[usize]) -> u64 {
        self.edges
            .iter()
            .filter(|e| {
                let first = blocks[e.members[0]];
                e.members.iter().any(|&v| blocks[v] != first)
            })
            .map(|e| e.cost as u64)
            .sum()
    }
}
