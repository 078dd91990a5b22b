//! Random block-angular instances with a known structure.

use decomp_detect::{DetectResult, SparseProblem, SparseProblemBuilder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Shape of a generated instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// Number of independent blocks.
    pub nblocks: usize,
    /// Variables per block.
    pub vars_per_block: usize,
    /// Constraints per block.
    pub conss_per_block: usize,
    /// Probability of a nonzero inside a block.
    pub density: f64,
    /// Constraints spanning all blocks.
    pub linking_conss: usize,
    /// Variables appearing in constraints of every block.
    pub linking_vars: usize,
    /// Share of binary block variables; the rest are integers.
    pub binary_fraction: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for InstanceSpec {
    fn default() -> Self {
        Self {
            nblocks: 4,
            vars_per_block: 10,
            conss_per_block: 6,
            density: 0.3,
            linking_conss: 2,
            linking_vars: 0,
            binary_fraction: 0.5,
            seed: 12345,
        }
    }
}

/// Generated problem plus the block each variable was created in.
pub struct Instance {
    /// The problem.
    pub problem: SparseProblem,
    /// Planted block per variable, None for planted linking variables.
    pub planted: Vec<Option<usize>>,
}

/// Generate an instance.
///
/// Every block constraint gets at least two nonzeros so that it shows up
/// as a hyperedge; linking constraints pick one variable per block.
pub fn generate(spec: &InstanceSpec) -> DetectResult<Instance> {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let name = format!(
        "blocks{}_v{}_c{}_s{}",
        spec.nblocks, spec.vars_per_block, spec.conss_per_block, spec.seed
    );
    let mut b = SparseProblemBuilder::new(name);
    let mut planted = Vec::new();

    let mut block_vars: Vec<Vec<usize>> = Vec::with_capacity(spec.nblocks);
    for blk in 0..spec.nblocks {
        let vars = (0..spec.vars_per_block)
            .map(|j| {
                planted.push(Some(blk));
                let name = format!("x_{}_{}", blk, j);
                if rng.gen::<f64>() < spec.binary_fraction {
                    b.add_binary(name)
                } else {
                    b.add_integer(name, rng.gen_range(2..20) as f64)
                }
            })
            .collect();
        block_vars.push(vars);
    }

    let linking: Vec<usize> = (0..spec.linking_vars)
        .map(|j| {
            planted.push(None);
            b.add_continuous(format!("y_{}", j))
        })
        .collect();

    for (blk, vars) in block_vars.iter().enumerate() {
        for i in 0..spec.conss_per_block {
            let mut row: Vec<(usize, f64)> = Vec::new();
            for &v in vars {
                if rng.gen::<f64>() < spec.density {
                    row.push((v, rng.gen_range(1..10) as f64));
                }
            }
            while row.len() < 2.min(vars.len()) {
                let v = vars[rng.gen_range(0..vars.len())];
                if !row.iter().any(|&(w, _)| w == v) {
                    row.push((v, rng.gen_range(1..10) as f64));
                }
            }
            for &y in &linking {
                if rng.gen::<f64>() < 0.5 || i == 0 {
                    row.push((y, -1.0));
                }
            }
            let rhs = rng.gen_range(5..30) as f64;
            b.add_le(format!("c_{}_{}", blk, i), &row, rhs);
        }
    }

    for k in 0..spec.linking_conss {
        let row: Vec<(usize, f64)> = block_vars
            .iter()
            .filter(|vars| !vars.is_empty())
            .map(|vars| (vars[rng.gen_range(0..vars.len())], 1.0))
            .collect();
        b.add_le(format!("link_{}", k), &row, spec.nblocks as f64);
    }

    Ok(Instance {
        problem: b.build()?,
        planted,
    })
}
