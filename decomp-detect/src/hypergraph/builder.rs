//! Hypergraph construction from a problem view.

use super::weights::EdgeWeights;
use super::{EdgeKind, Hypergraph, HypergraphKind, VertexOrigin};
use crate::model::ProblemView;
use crate::settings::DetectorSettings;

/// Builds hypergraphs of a constraint matrix.
///
/// The builder only reads the problem; repeated builds of the same view
/// produce identical hypergraphs.
pub struct HypergraphBuilder<'a> {
    view: ProblemView<'a>,
    weights: EdgeWeights,
}

impl<'a> HypergraphBuilder<'a> {
    /// Create a builder for a view with weights from `settings`.
    pub fn new(view: ProblemView<'a>, settings: &DetectorSettings) -> Self {
        Self {
            view,
            weights: EdgeWeights::from_settings(settings),
        }
    }

    /// Build the hypergraph of the requested kind.
    pub fn build(&self, kind: HypergraphKind) -> Hypergraph {
        match kind {
            HypergraphKind::Row => self.build_row(),
            HypergraphKind::Column => self.build_column(),
            HypergraphKind::RowColumn => self.build_row_column(),
        }
    }

    fn empty(&self, kind: HypergraphKind) -> Hypergraph {
        Hypergraph::new(kind, self.view.num_vars(), self.view.num_conss())
    }

    /// Vertices are variable copies, one per incidence.
    fn build_row_column(&self) -> Hypergraph {
        let view = &self.view;
        let src = view.source();
        let mut graph = self.empty(HypergraphKind::RowColumn);

        for cons in view.conss() {
            let vars: Vec<usize> = view.active_row(cons).map(|(var, _)| var).collect();
            if vars.is_empty() {
                graph.empty_conss.push(cons);
                continue;
            }

            let copies: Vec<usize> = vars
                .iter()
                .map(|&var| graph.add_vertex(VertexOrigin::Copy { var, cons }))
                .collect();
            let cost = self.weights.cons_weight(view, cons);
            graph.add_edge(EdgeKind::Constraint, copies, cost, cons);
        }

        // Couple all copies of a variable so the partitioner keeps them together.
        for var in view.vars() {
            let copies = graph.vertices_of_var(var).to_vec();
            if copies.len() < 2 {
                continue;
            }
            let cost = self.weights.var_weight(src.var_type(var));
            graph.add_edge(EdgeKind::Variable, copies, cost, var);
        }

        graph
    }

    /// Vertices are variables, edges are constraints.
    fn build_row(&self) -> Hypergraph {
        let view = &self.view;
        let mut graph = self.empty(HypergraphKind::Row);
        let mut vertex_of_var: Vec<Option<usize>> = vec![None; view.num_vars()];

        for cons in view.conss() {
            let vars: Vec<usize> = view.active_row(cons).map(|(var, _)| var).collect();
            if vars.is_empty() {
                graph.empty_conss.push(cons);
                continue;
            }

            let members: Vec<usize> = vars
                .iter()
                .map(|&var| *vertex_of_var[var].get_or_insert_with(|| graph.add_vertex(VertexOrigin::Variable(var))))
                .collect();
            let cost = self.weights.cons_weight(view, cons);
            graph.add_edge(EdgeKind::Constraint, members, cost, cons);
        }

        graph
    }

    /// Vertices are constraints, edges are variables.
    fn build_column(&self) -> Hypergraph {
        let view = &self.view;
        let src = view.source();
        let mut graph = self.empty(HypergraphKind::Column);
        let mut conss_of_var: Vec<Vec<usize>> = vec![Vec::new(); view.num_vars()];

        for cons in view.conss() {
            let mut vars = view.active_row(cons).map(|(var, _)| var).peekable();
            if vars.peek().is_none() {
                graph.empty_conss.push(cons);
                continue;
            }
            let vertex = graph.add_vertex(VertexOrigin::Constraint(cons));
            for var in vars {
                conss_of_var[var].push(vertex);
            }
        }

        for var in view.vars() {
            let members = std::mem::take(&mut conss_of_var[var]);
            if members.len() < 2 {
                continue;
            }
            let cost = self.weights.var_weight(src.var_type(var));
            graph.add_edge(EdgeKind::Variable, members, cost, var);
        }

        graph
    }
}
