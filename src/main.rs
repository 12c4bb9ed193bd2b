//! Maps the logical RAMs of a set of circuits onto LUTRAM and block RAM,
//! choosing per circuit the area-minimal mix with a mixed integer program.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use clap::Parser;
use rayon::prelude::*;

mod catalog;
mod config;
mod error;
mod logic_ram;
mod mode;
mod model;
mod optimizer;
mod selector;
mod solver;
mod utils;

use crate::catalog::PrimitiveCatalog;
use crate::error::{CircuitError, MapError};
use crate::mode::MemMode;
use crate::model::{MilpSolver, SolveStatus};
use crate::optimizer::{CircuitSolution, optimize_circuit};
use crate::solver::MicroLpSolver;
use crate::utils::{geometric_mean, read_data, write_csv, write_mappings};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogicalRam {
    circuit_id: u32,
    ram_id: u32,
    mode: MemMode,
    depth: u32,
    width: u32,
}

#[derive(Debug)]
pub struct Circuit {
    id: u32,
    /// Logic blocks needed by everything except the RAMs.
    logic_blocks: u32,
    rams: Vec<LogicalRam>,
}

pub type Outcome = Result<CircuitSolution, CircuitError>;

/// Area-driven RAM mapper for FPGA circuits.
#[derive(Parser, Debug)]
#[command(name = "ram-mapper", version, about)]
struct Cli {
    /// Logical RAMs of every circuit.
    #[arg(long, default_value = "logical_rams.txt")]
    logical_rams: PathBuf,

    /// Non-RAM logic block count of every circuit.
    #[arg(long, default_value = "logic_block_count.txt")]
    logic_blocks: PathBuf,

    /// RAM architecture in TOML. Defaults to LUTRAM with 8K and 128K block RAM.
    #[arg(long)]
    ram_config: Option<PathBuf>,

    /// Mapping output.
    #[arg(long, default_value = "mapping.txt")]
    mapping: PathBuf,

    /// Per-circuit results in CSV.
    #[arg(long, default_value = "results.csv")]
    results: PathBuf,

    /// Solver time budget per circuit, in seconds.
    #[arg(long, default_value_t = 7.0)]
    time_limit: f64,

    /// Solve circuits concurrently.
    #[arg(long)]
    parallel: bool,

    /// Only print errors and the summary.
    #[arg(short, long)]
    quiet: bool,

    /// Print the resource pools of every circuit.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), MapError> {
    let catalog = match &cli.ram_config {
        Some(path) => config::load_catalog(path)?,
        None => PrimitiveCatalog::default_architecture()?,
    };
    let circuits = read_data(&cli.logic_blocks, &cli.logical_rams)?;
    if circuits.is_empty() {
        return Err(MapError::Manifest {
            path: cli.logical_rams.display().to_string(),
            message: "no circuits".to_string(),
        });
    }

    let solver = MicroLpSolver {
        time_limit: Duration::from_secs_f64(cli.time_limit.max(0.0)),
    };

    let start = Instant::now();
    let outcomes = solve_all(&circuits, &catalog, &solver, cli.parallel);
    let elapsed = start.elapsed();

    let mut areas = Vec::new();
    let mut timed_out = 0;
    for outcome in &outcomes {
        match outcome {
            Ok(sol) => {
                if !cli.quiet {
                    report(sol, cli.verbose);
                }
                if sol.status != SolveStatus::Optimal {
                    timed_out += 1;
                }
                areas.push(sol.area);
            }
            Err(e) => eprintln!("error: {e}"),
        }
    }

    write_mappings(BufWriter::new(File::create(&cli.mapping)?), &outcomes)?;
    write_csv(BufWriter::new(File::create(&cli.results)?), &outcomes)?;

    let failed = outcomes.len() - areas.len();
    if failed > 0 {
        eprintln!("warning: {failed} circuit(s) failed and are left out of the mean");
    }
    if timed_out > 0 {
        eprintln!("warning: {timed_out} circuit(s) are best found, not proven optimal");
    }
    eprintln!("Geometric Average: {:.4e}", geometric_mean(&areas));
    eprintln!("Total time spent: {:.2} Sec", elapsed.as_secs_f64());
    Ok(())
}

/// Solves every circuit, in circuit order regardless of `parallel`.
fn solve_all(
    circuits: &[Circuit],
    catalog: &PrimitiveCatalog,
    solver: &dyn MilpSolver,
    parallel: bool,
) -> Vec<Outcome> {
    if parallel {
        circuits
            .par_iter()
            .map(|c| optimize_circuit(c, catalog, solver))
            .collect()
    } else {
        circuits
            .iter()
            .map(|c| optimize_circuit(c, catalog, solver))
            .collect()
    }
}

fn report(sol: &CircuitSolution, verbose: bool) {
    match sol.status {
        SolveStatus::Optimal => {
            eprintln!("Circuit {} finished with area: {}", sol.circuit_id, sol.area)
        }
        SolveStatus::Feasible => eprintln!(
            "Circuit {} finished with area: {} (time limit, best found)",
            sol.circuit_id, sol.area
        ),
    }
    for (k, on_chip, used) in sol.bram_shortfall() {
        eprintln!(
            "warning: circuit {}: {on_chip} BRAM{k} units on chip but {used} mapped",
            sol.circuit_id
        );
    }
    if verbose {
        eprintln!(
            "  logic blocks {} (extra {}), LUTRAM {}, BRAM used {:?} of {:?}",
            sol.logic_blocks,
            sol.extra_logic_blocks,
            sol.lutram_units,
            sol.bram_used,
            sol.bram_units
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn circuits() -> Vec<Circuit> {
        let ram = |circuit_id, ram_id, mode, depth, width| LogicalRam {
            circuit_id,
            ram_id,
            mode,
            depth,
            width,
        };
        vec![
            Circuit {
                id: 0,
                logic_blocks: 200,
                rams: vec![
                    ram(0, 0, MemMode::SinglePort, 1024, 8),
                    ram(0, 1, MemMode::TrueDualPort, 512, 36),
                ],
            },
            Circuit {
                id: 1,
                logic_blocks: 50,
                rams: vec![ram(1, 0, MemMode::Rom, 128 * 1024 * 16, 1)],
            },
            Circuit {
                id: 2,
                logic_blocks: 80,
                rams: vec![ram(2, 0, MemMode::SimpleDualPort, 64, 20)],
            },
        ]
    }

    #[test]
    fn parse_defaults() {
        let cli = Cli::parse_from(["ram-mapper"]);
        assert_eq!(cli.logical_rams, PathBuf::from("logical_rams.txt"));
        assert_eq!(cli.logic_blocks, PathBuf::from("logic_block_count.txt"));
        assert!(cli.ram_config.is_none());
        assert_eq!(cli.time_limit, 7.0);
        assert!(!cli.parallel);
    }

    #[test]
    fn parse_options() {
        let cli = Cli::parse_from([
            "ram-mapper",
            "--ram-config",
            "arch.toml",
            "--time-limit",
            "2.5",
            "--parallel",
            "-q",
        ]);
        assert_eq!(cli.ram_config, Some(PathBuf::from("arch.toml")));
        assert_eq!(cli.time_limit, 2.5);
        assert!(cli.parallel && cli.quiet);
    }

    #[test]
    fn failed_circuit_does_not_stop_others() {
        let catalog = PrimitiveCatalog::default_architecture().unwrap();
        let outcomes = solve_all(&circuits(), &catalog, &MicroLpSolver::default(), false);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(matches!(
            outcomes[1],
            Err(CircuitError::InfeasibleRam { circuit: 1, ram: 0, .. })
        ));
        assert!(outcomes[2].is_ok());
    }

    #[test]
    fn parallel_matches_sequential() {
        let catalog = PrimitiveCatalog::default_architecture().unwrap();
        let solver = MicroLpSolver::default();
        let seq = solve_all(&circuits(), &catalog, &solver, false);
        let par = solve_all(&circuits(), &catalog, &solver, true);
        for (a, b) in seq.iter().zip(&par) {
            match (a, b) {
                (Ok(a), Ok(b)) => {
                    assert_eq!(a.circuit_id, b.circuit_id);
                    assert_eq!(a.area, b.area);
                }
                (Err(a), Err(b)) => assert_eq!(a.circuit(), b.circuit()),
                _ => panic!("outcomes differ"),
            }
        }
    }

    #[test]
    fn run_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let blocks = dir.path().join("logic_block_count.txt");
        let rams = dir.path().join("logical_rams.txt");
        std::fs::write(&blocks, "Circuit\t#LBs\n0\t300\n").unwrap();
        std::fs::write(
            &rams,
            "Num_Circuits 1\nCircuit\tRamID\tMode\t\tDepth\tWidth\n0\t0\tSinglePort\t2048\t16\n",
        )
        .unwrap();
        let mapping = dir.path().join("mapping.txt");
        let results = dir.path().join("results.csv");
        let args: Vec<OsString> = vec![
            "ram-mapper".into(),
            "--logical-rams".into(),
            rams.into_os_string(),
            "--logic-blocks".into(),
            blocks.into_os_string(),
            "--mapping".into(),
            mapping.clone().into_os_string(),
            "--results".into(),
            results.clone().into_os_string(),
            "--quiet".into(),
        ];
        let cli = Cli::parse_from(args);
        run(&cli).unwrap();

        let text = std::fs::read_to_string(&mapping).unwrap();
        let line = text.lines().nth(1).unwrap();
        assert!(line.starts_with("0 0 "));
        assert!(line.contains(" LW 16 LD 2048 ID 0 "));
        let csv = std::fs::read_to_string(&results).unwrap();
        assert!(csv.lines().nth(1).unwrap().starts_with("0,optimal,"));
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let cli = Cli::parse_from([
            OsString::from("ram-mapper"),
            OsString::from("--logic-blocks"),
            missing.into_os_string(),
        ]);
        assert!(matches!(run(&cli), Err(MapError::Io(_))));
    }
}
