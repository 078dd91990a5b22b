//! Bucketing variables and constraints into blocks.

use super::{Decomposition, DecompositionKind, Provenance};
use crate::mapping::{BlockAssignment, MappedPartition};
use crate::model::ProblemView;

/// Turns a mapped partition into a [`Decomposition`].
pub struct DecompositionAssembler<'a> {
    view: ProblemView<'a>,
}

impl<'a> DecompositionAssembler<'a> {
    /// Assembler for a problem view.
    pub fn new(view: ProblemView<'a>) -> Self {
        Self { view }
    }

    /// Classify every variable and constraint and bucket them per block.
    ///
    /// A block without constraints is reported but kept; such a
    /// decomposition simply scores badly.
    pub fn assemble(&self, mapped: &MappedPartition, provenance: Provenance) -> Decomposition {
        let (var_map, cons_map) = if mapped.is_variable_driven() {
            self.constraints_from_variables(mapped)
        } else {
            self.variables_from_constraints(mapped)
        };
        self.bucket(mapped.nblocks, var_map, cons_map, provenance)
    }

    /// Bucket already complete lookup maps.
    pub fn from_maps(
        &self,
        nblocks: usize,
        var_map: Vec<BlockAssignment>,
        cons_map: Vec<BlockAssignment>,
        provenance: Provenance,
    ) -> Decomposition {
        self.bucket(nblocks, var_map, cons_map, provenance)
    }

    /// The first variable in a block fixes the constraint's block; a variable
    /// in another block, or no blocked variable at all, makes it linking.
    fn constraints_from_variables(&self, mapped: &MappedPartition) -> (Vec<BlockAssignment>, Vec<BlockAssignment>) {
        let var_map = mapped.vars.clone();
        let mut cons_map = vec![BlockAssignment::Unassigned; self.view.num_conss()];

        for cons in self.view.conss() {
            let mut assignment = BlockAssignment::Unassigned;
            let mut nactive = 0;
            for (var, _) in self.view.active_row(cons) {
                nactive += 1;
                if let BlockAssignment::Block(b) = var_map[var] {
                    assignment = assignment.merge(b);
                }
            }
            cons_map[cons] = match (nactive, assignment) {
                (0, _) => BlockAssignment::Unassigned,
                (_, BlockAssignment::Unassigned) => BlockAssignment::Linking,
                (_, a) => a,
            };
        }

        (var_map, cons_map)
    }

    /// A variable belongs to a block iff all its constraints do.
    fn variables_from_constraints(&self, mapped: &MappedPartition) -> (Vec<BlockAssignment>, Vec<BlockAssignment>) {
        let cons_map = mapped.conss.clone();
        let mut var_map = vec![BlockAssignment::Unassigned; self.view.num_vars()];

        for cons in self.view.conss() {
            for (var, _) in self.view.active_row(cons) {
                var_map[var] = match cons_map[cons] {
                    BlockAssignment::Block(b) => var_map[var].merge(b),
                    _ => BlockAssignment::Linking,
                };
            }
        }

        (var_map, cons_map)
    }

    fn bucket(
        &self,
        nblocks: usize,
        var_map: Vec<BlockAssignment>,
        cons_map: Vec<BlockAssignment>,
        provenance: Provenance,
    ) -> Decomposition {
        let mut block_vars = vec![Vec::new(); nblocks];
        let mut block_conss = vec![Vec::new(); nblocks];
        let mut linking_vars = Vec::new();
        let mut linking_conss = Vec::new();
        let mut empty_conss = Vec::new();
        let mut untouched_vars = Vec::new();

        for (var, assignment) in var_map.iter().enumerate() {
            match assignment {
                BlockAssignment::Block(b) => block_vars[*b].push(var),
                BlockAssignment::Linking => linking_vars.push(var),
                BlockAssignment::Unassigned => untouched_vars.push(var),
            }
        }

        for cons in self.view.conss() {
            match cons_map[cons] {
                BlockAssignment::Block(b) => block_conss[b].push(cons),
                BlockAssignment::Linking => linking_conss.push(cons),
                BlockAssignment::Unassigned => empty_conss.push(cons),
            }
        }

        for (b, conss) in block_conss.iter().enumerate() {
            if conss.is_empty() {
                log::warn!(
                    "{}: block {} of {} received no constraints",
                    provenance.detector,
                    b,
                    nblocks
                );
            }
        }

        let kind = DecompositionKind::from_border(linking_conss.len(), linking_vars.len());
        Decomposition {
            nblocks,
            block_vars,
            block_conss,
            linking_vars,
            linking_conss,
            empty_conss,
            untouched_vars,
            var_map,
            cons_map,
            kind,
            provenance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypergraph::{HypergraphBuilder, HypergraphKind};
    use crate::mapping::map_partition;
    use crate::model::{DetectionScope, SparseProblem, SparseProblemBuilder};
    use crate::partition::PartitionAssignment;
    use crate::settings::DetectorSettings;

    /// c0: x0 + x1 <= 5, c1: x2 + x3 <= 5, c2: x0 + x2 = 1, x4 objective-only
    fn coupled() -> SparseProblem {
        let mut b = SparseProblemBuilder::new("coupled");
        let x: Vec<usize> = (0..5).map(|i| b.add_integer(format!("x{}", i), 9.0)).collect();
        b.add_le("c0", &[(x[0], 1.0), (x[1], 1.0)], 5.0);
        b.add_le("c1", &[(x[2], 1.0), (x[3], 1.0)], 5.0);
        b.add_eq("c2", &[(x[0], 1.0), (x[2], 1.0)], 1.0);
        b.build().unwrap()
    }

    fn decompose(prob: &SparseProblem, kind: HypergraphKind, blocks: Vec<usize>) -> Decomposition {
        let scope = DetectionScope::full();
        let view = ProblemView::new(prob, &scope).unwrap();
        let g = HypergraphBuilder::new(view, &DetectorSettings::default()).build(kind);
        let p = PartitionAssignment::new(2, blocks).unwrap();
        let mapped = map_partition(&g, &p).unwrap();
        DecompositionAssembler::new(view).assemble(&mapped, Provenance::default())
    }

    fn assert_covers(d: &Decomposition, nvars: usize) {
        let mut seen = vec![0; nvars];
        for v in d.block_vars.iter().flatten().chain(&d.linking_vars).chain(&d.untouched_vars) {
            seen[*v] += 1;
        }
        assert!(seen.iter().all(|&n| n == 1), "coverage {:?}", seen);
    }

    #[test]
    fn test_row_graph_linking_constraint() {
        let prob = coupled();
        // row vertices in first-seen order: x0, x1, x2, x3
        let d = decompose(&prob, HypergraphKind::Row, vec![0, 0, 1, 1]);
        assert_eq!(d.block_conss, vec![vec![0], vec![1]]);
        assert_eq!(d.linking_conss, vec![2]);
        assert!(d.linking_vars.is_empty());
        assert_eq!(d.untouched_vars, vec![4]);
        assert_eq!(d.kind, DecompositionKind::Bordered);
        assert_eq!(d.cons_block(2), BlockAssignment::Linking);
        assert_covers(&d, 5);
    }

    #[test]
    fn test_row_column_linking_variable() {
        let prob = coupled();
        // copies: c0 -> x0 x1, c1 -> x2 x3, c2 -> x0 x2; put c2 entirely in block 1
        let d = decompose(&prob, HypergraphKind::RowColumn, vec![0, 0, 1, 1, 1, 1]);
        assert_eq!(d.linking_vars, vec![0]);
        assert_eq!(d.block_vars, vec![vec![1], vec![2, 3]]);
        // c0 keeps x1 in block 0, c2 keeps x2 in block 1
        assert_eq!(d.block_conss, vec![vec![0], vec![1, 2]]);
        assert!(d.linking_conss.is_empty());
        assert_eq!(d.kind, DecompositionKind::Arrowhead);
        assert_covers(&d, 5);
    }

    #[test]
    fn test_all_linking_variables_make_linking_constraint() {
        let prob = coupled();
        // x0 and x2 both split
        let d = decompose(&prob, HypergraphKind::RowColumn, vec![0, 0, 1, 1, 1, 0]);
        assert_eq!(d.linking_vars, vec![0, 2]);
        assert_eq!(d.linking_conss, vec![2]);
        assert_covers(&d, 5);
    }

    #[test]
    fn test_column_graph_derives_variables() {
        let prob = coupled();
        let d = decompose(&prob, HypergraphKind::Column, vec![0, 1, 1]);
        assert_eq!(d.block_conss, vec![vec![0], vec![1, 2]]);
        assert!(d.linking_conss.is_empty());
        assert_eq!(d.linking_vars, vec![0]);
        assert_eq!(d.block_vars, vec![vec![1], vec![2, 3]]);
        assert_covers(&d, 5);
    }

    #[test]
    fn test_empty_block_is_kept() {
        let prob = coupled();
        let d = decompose(&prob, HypergraphKind::Row, vec![1, 1, 1, 1]);
        assert_eq!(d.empty_blocks(), vec![0]);
        assert_eq!(d.block_conss[1], vec![0, 1, 2]);
        assert_eq!(d.kind, DecompositionKind::Diagonal);
    }

    #[test]
    fn test_fixed_constraint_goes_to_empty_list() {
        let mut prob = coupled();
        prob.fix_var(2, 1.0);
        prob.fix_var(3, 0.0);
        let d = decompose(&prob, HypergraphKind::Row, vec![0, 0]);
        assert_eq!(d.empty_conss, vec![1]);
        assert!(!d.linking_conss.contains(&1));
        assert!(d.block_conss.iter().all(|c| !c.contains(&1)));
        assert_covers(&d, 5);
    }
}
