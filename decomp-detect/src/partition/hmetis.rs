//! Adapter for the external hMETIS hypergraph partitioner.
//!
//! The tool is driven over files:
//!
//! - input: first line `<num_edges> <num_vertices> 1`, then one line per
//!   hyperedge `<cost> <v1> <v2> ...` with 1-based vertex ids;
//! - output: `<input>.part.<nblocks>`, one 0-based block id per line in
//!   vertex order.
//!
//! Isolated dummy vertices are appended to the vertex count to help the
//! partitioner balance sparse graphs; their block ids are ignored.

use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use super::{HypergraphPartitioner, PartitionAssignment, PartitionContext, PartitionOutcome};
use crate::error::{DetectError, DetectResult};
use crate::hypergraph::Hypergraph;
use crate::settings::DetectorSettings;

/// Exit status `timeout` reports when it had to stop the child.
const TIMEOUT_EXIT_CODE: i32 = 124;

/// Number of dummy vertices for a graph with `num_vertices` vertices.
pub fn num_dummy_vertices(num_vertices: usize, fraction: f64) -> usize {
    (fraction * num_vertices as f64).round() as usize
}

/// Path of the output file hMETIS writes next to `input`.
pub fn partition_file_path(input: &Path, nblocks: usize) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(format!(".part.{}", nblocks));
    PathBuf::from(name)
}

/// Serialize a hypergraph in hMETIS format.
pub fn write_input<W: Write>(mut out: W, graph: &Hypergraph, num_dummy: usize) -> io::Result<()> {
    writeln!(
        out,
        "{} {} 1",
        graph.num_edges(),
        graph.num_vertices() + num_dummy
    )?;
    for edge in &graph.edges {
        write!(out, "{}", edge.cost)?;
        for &v in &edge.members {
            write!(out, " {}", v + 1)?;
        }
        writeln!(out)?;
    }
    out.flush()
}

/// Read the first `num_vertices` block ids of a partition file.
///
/// `path` is only used in error messages.
pub fn read_partition<R: BufRead>(
    reader: R,
    path: &Path,
    num_vertices: usize,
    nblocks: usize,
) -> DetectResult<PartitionAssignment> {
    let malformed = |line: usize, reason: String| DetectError::MalformedPartition {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut blocks = Vec::with_capacity(num_vertices);
    let mut lines = reader.lines();
    for v in 0..num_vertices {
        let lineno = v + 1;
        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(source)) => {
                return Err(DetectError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
            None => {
                return Err(malformed(
                    lineno,
                    format!("file ends after {} of {} vertices", v, num_vertices),
                ))
            }
        };

        let token = line.trim();
        let block: usize = token
            .parse()
            .map_err(|_| malformed(lineno, format!("expected block id, found '{}'", token)))?;
        if block >= nblocks {
            return Err(malformed(
                lineno,
                format!("block id {} out of range for {} blocks", block, nblocks),
            ));
        }
        blocks.push(block);
    }

    PartitionAssignment::new(nblocks, blocks)
}

/// Command line for one hMETIS run.
#[derive(Debug, Clone, PartialEq)]
pub struct HmetisCommand {
    /// Executable (`timeout` when wrapped).
    pub program: PathBuf,
    /// Arguments after the executable.
    pub args: Vec<OsString>,
}

impl HmetisCommand {
    /// Assemble the command line.
    ///
    /// hMETIS has no time limit option, so a finite `remaining` budget wraps
    /// the call in `timeout <secs>` when enabled in the settings.
    pub fn new(
        settings: &DetectorSettings,
        input: &Path,
        nblocks: usize,
        remaining: Option<Duration>,
    ) -> Self {
        let mut args: Vec<OsString> = vec![
            input.as_os_str().to_owned(),
            nblocks.to_string().into(),
            "-seed".into(),
            settings.seed.to_string().into(),
            "-ptype".into(),
            settings.algorithm.as_arg().into(),
            "-ufactor".into(),
            format!("{}", settings.ubfactor).into(),
        ];

        match remaining {
            Some(left) if settings.use_timeout_wrapper => {
                let secs = left.as_secs_f64().ceil().max(1.0) as u64;
                let mut wrapped: Vec<OsString> = vec![
                    secs.to_string().into(),
                    settings.partitioner_binary.as_os_str().to_owned(),
                ];
                wrapped.append(&mut args);
                Self {
                    program: PathBuf::from("timeout"),
                    args: wrapped,
                }
            }
            _ => Self {
                program: settings.partitioner_binary.clone(),
                args,
            },
        }
    }

    /// Process builder; output is discarded unless `verbose`.
    pub fn to_command(&self, verbose: bool) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if !verbose {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        cmd
    }
}

impl fmt::Display for HmetisCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Partitioner backed by the hMETIS executable.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmetisPartitioner;

impl HmetisPartitioner {
    /// Create the adapter; executable and options come from the settings.
    pub fn new() -> Self {
        Self
    }

    fn scratch_file(
        &self,
        settings: &DetectorSettings,
        label: &str,
        nblocks: usize,
    ) -> DetectResult<tempfile::NamedTempFile> {
        let prefix = format!("{}-{}-", sanitize(label), nblocks);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(".hgr");
        let created = match &settings.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        created.map_err(|source| DetectError::TempFile {
            context: format!("partitioner input for {}", label),
            source,
        })
    }

    /// Write, run and read back; scratch files are left for the caller.
    fn run(
        &self,
        graph: &Hypergraph,
        nblocks: usize,
        ctx: &PartitionContext<'_>,
        input: &mut tempfile::NamedTempFile,
    ) -> DetectResult<PartitionOutcome> {
        let settings = ctx.settings;
        let input_path = input.path().to_path_buf();
        let num_dummy = num_dummy_vertices(graph.num_vertices(), settings.dummy_fraction);

        write_input(BufWriter::new(input.as_file_mut()), graph, num_dummy).map_err(|source| {
            DetectError::Io {
                path: input_path.clone(),
                source,
            }
        })?;

        let command = HmetisCommand::new(settings, &input_path, nblocks, ctx.budget.remaining());
        log::debug!("Running partitioner: {}", command);

        let status = command
            .to_command(settings.verbose)
            .status()
            .map_err(|source| DetectError::Spawn {
                program: command.program.display().to_string(),
                source,
            })?;

        if !status.success() {
            let reason = match status.code() {
                Some(TIMEOUT_EXIT_CODE) => "time limit reached".to_string(),
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            };
            return Ok(PartitionOutcome::Failed { reason });
        }

        let output_path = partition_file_path(&input_path, nblocks);
        let file = File::open(&output_path).map_err(|source| DetectError::Io {
            path: output_path.clone(),
            source,
        })?;
        let assignment = read_partition(
            BufReader::new(file),
            &output_path,
            graph.num_vertices(),
            nblocks,
        )?;
        Ok(PartitionOutcome::Partitioned(assignment))
    }
}

impl HypergraphPartitioner for HmetisPartitioner {
    fn name(&self) -> &str {
        "hmetis"
    }

    fn partition(
        &self,
        graph: &Hypergraph,
        nblocks: usize,
        ctx: &PartitionContext<'_>,
    ) -> DetectResult<PartitionOutcome> {
        if ctx.budget.is_exhausted() {
            log::debug!("No time left, skipping partitioner for {} blocks", nblocks);
            return Ok(PartitionOutcome::NotRun);
        }

        let mut input = self.scratch_file(ctx.settings, ctx.label, nblocks)?;
        let result = self.run(graph, nblocks, ctx, &mut input);

        let output_path = partition_file_path(input.path(), nblocks);
        if ctx.settings.tidy {
            if let Err(e) = fs::remove_file(&output_path) {
                if e.kind() != io::ErrorKind::NotFound {
                    log::warn!("Could not remove {}: {}", output_path.display(), e);
                }
            }
            // input is removed when `input` drops
        } else {
            match input.keep() {
                Ok((_, path)) => log::info!(
                    "Kept partitioner files {} and {}",
                    path.display(),
                    output_path.display()
                ),
                Err(e) => log::warn!("Could not keep partitioner input: {}", e),
            }
        }

        result
    }
}

/// Keep file name characters that are safe everywhere.
fn sanitize(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "detect".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypergraph::HypergraphBuilder;
    use crate::model::{DetectionScope, ProblemView, SparseProblemBuilder};
    use crate::partition::TimeBudget;
    use crate::settings::PartitionAlgorithm;

    fn two_blocks_graph() -> Hypergraph {
        let mut b = SparseProblemBuilder::new("two");
        let x: Vec<usize> = (0..4).map(|i| b.add_binary(format!("x{}", i))).collect();
        b.add_le("c0", &[(x[0], 1.0), (x[1], 1.0)], 1.0);
        b.add_le("c1", &[(x[2], 1.0), (x[3], 1.0)], 1.0);
        let prob = b.build().unwrap();
        let scope = DetectionScope::full();
        let view = ProblemView::new(&prob, &scope).unwrap();
        HypergraphBuilder::new(view, &DetectorSettings::default())
            .build(crate::hypergraph::HypergraphKind::Row)
    }

    #[test]
    fn test_write_input_format() {
        let g = two_blocks_graph();
        let mut buf = Vec::new();
        write_input(&mut buf, &g, 1).unwrap();
        let text = String::from_utf8(buf).unwrap();
        // set packing rows get the set weight
        assert_eq!(text, "2 5 1\n10 1 2\n10 3 4\n");
    }

    #[test]
    fn test_dummy_count_rounds() {
        assert_eq!(num_dummy_vertices(10, 0.2), 2);
        assert_eq!(num_dummy_vertices(7, 0.2), 1);
        assert_eq!(num_dummy_vertices(8, 0.2), 2);
        assert_eq!(num_dummy_vertices(5, 0.0), 0);
    }

    #[test]
    fn test_partition_path() {
        let p = partition_file_path(Path::new("/tmp/prob-2-abc.hgr"), 3);
        assert_eq!(p, PathBuf::from("/tmp/prob-2-abc.hgr.part.3"));
    }

    #[test]
    fn test_read_partition_ignores_dummies() {
        let data = "0\n1\n1\n0\n1\n";
        let p = read_partition(data.as_bytes(), Path::new("x"), 4, 2).unwrap();
        assert_eq!(p.as_slice(), &[0, 1, 1, 0]);
    }

    #[test]
    fn test_read_partition_short_file() {
        let err = read_partition("0\n1\n".as_bytes(), Path::new("x"), 3, 2).unwrap_err();
        assert!(matches!(err, DetectError::MalformedPartition { line: 3, .. }));
        assert!(err.is_candidate_local());
    }

    #[test]
    fn test_read_partition_out_of_range() {
        let err = read_partition("0\n5\n".as_bytes(), Path::new("x"), 2, 2).unwrap_err();
        assert!(matches!(err, DetectError::MalformedPartition { line: 2, .. }));
    }

    #[test]
    fn test_read_partition_garbage() {
        let err = read_partition("0\nabc\n".as_bytes(), Path::new("x"), 2, 2).unwrap_err();
        assert!(matches!(err, DetectError::MalformedPartition { line: 2, .. }));
    }

    #[test]
    fn test_command_without_budget() {
        let mut s = DetectorSettings::default();
        s.seed = 7;
        s.algorithm = PartitionAlgorithm::Kway;
        let cmd = HmetisCommand::new(&s, Path::new("/tmp/in.hgr"), 4, None);
        assert_eq!(
            cmd.to_string(),
            "hmetis /tmp/in.hgr 4 -seed 7 -ptype kway -ufactor 5"
        );
    }

    #[test]
    fn test_command_with_timeout_wrapper() {
        let s = DetectorSettings::default();
        let cmd = HmetisCommand::new(&s, Path::new("in.hgr"), 2, Some(Duration::from_millis(2500)));
        assert_eq!(cmd.program, PathBuf::from("timeout"));
        assert_eq!(
            cmd.to_string(),
            "timeout 3 hmetis in.hgr 2 -seed 1 -ptype rb -ufactor 5"
        );

        let mut s = DetectorSettings::default();
        s.use_timeout_wrapper = false;
        let cmd = HmetisCommand::new(&s, Path::new("in.hgr"), 2, Some(Duration::from_secs(9)));
        assert_eq!(cmd.program, PathBuf::from("hmetis"));
    }

    #[test]
    fn test_exhausted_budget_does_not_run() {
        let g = two_blocks_graph();
        let settings = DetectorSettings::default().with_partitioner("/nonexistent/hmetis");
        let ctx = PartitionContext {
            settings: &settings,
            budget: TimeBudget::starting_now(Some(Duration::ZERO)),
            label: "two",
        };
        let out = HmetisPartitioner::new().partition(&g, 2, &ctx).unwrap();
        assert_eq!(out, PartitionOutcome::NotRun);
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let g = two_blocks_graph();
        let dir = tempfile::tempdir().unwrap();
        let mut settings = DetectorSettings::default().with_partitioner("/nonexistent/hmetis");
        settings.temp_dir = Some(dir.path().to_path_buf());
        let ctx = PartitionContext {
            settings: &settings,
            budget: TimeBudget::unlimited(),
            label: "two",
        };
        let err = HmetisPartitioner::new().partition(&g, 2, &ctx).unwrap_err();
        assert!(matches!(err, DetectError::Spawn { .. }));
        // tidy mode removed the scratch input
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize("my prob/1"), "my_prob_1");
        assert_eq!(sanitize(""), "detect");
    }
}
