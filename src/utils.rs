use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use serde::Serialize;

use crate::mode::MemMode;
use crate::optimizer::CircuitSolution;
use crate::{Circuit, LogicalRam, Outcome};

//reading circuits with error-handling, malformed lines are skipped
pub fn read_data(logic_block_file: &Path, logic_rams_file: &Path) -> io::Result<Vec<Circuit>> {
    let file = File::open(logic_block_file)?;
    read_circuits(BufReader::new(file), BufReader::new(File::open(logic_rams_file)?))
}

pub fn read_circuits<B: BufRead, R: BufRead>(blocks: B, rams: R) -> io::Result<Vec<Circuit>> {
    let mut circuits_map: BTreeMap<u32, Circuit> = BTreeMap::new();

    for (line_idx, line_res) in blocks.lines().enumerate() {
        let line = line_res?;
        let line = line.trim();
        if line.is_empty() || line_idx == 0 {
            //skipping header
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }
        let (Ok(circuit_id), Ok(logic_blocks)) =
            (parts[0].parse::<u32>(), parts[1].parse::<u32>())
        else {
            eprintln!("warning: bad logic block line: {line}");
            continue;
        };
        circuits_map.insert(
            circuit_id,
            Circuit {
                id: circuit_id,
                logic_blocks,
                rams: Vec::new(),
            },
        );
    }

    for (line_idx, line_res) in rams.lines().enumerate() {
        let line = line_res?;
        let line = line.trim();
        // circuit count and column names
        if line.is_empty() || line_idx < 2 {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 5 {
            continue;
        }

        let Ok(circuit_id) = parts[0].parse::<u32>() else {
            eprintln!("warning: bad circuit id: {}", parts[0]);
            continue;
        };
        let Ok(ram_id) = parts[1].parse::<u32>() else {
            eprintln!("warning: bad ram id: {}", parts[1]);
            continue;
        };
        let Some(mode) = MemMode::from_str(parts[2]) else {
            eprintln!("warning: unknown RAM mode: {}", parts[2]);
            continue;
        };
        let depth = match parts[3].parse::<u32>() {
            Ok(v) if v > 0 => v,
            _ => {
                eprintln!("warning: bad depth: {}", parts[3]);
                continue;
            }
        };
        let width = match parts[4].parse::<u32>() {
            Ok(v) if v > 0 => v,
            _ => {
                eprintln!("warning: bad width: {}", parts[4]);
                continue;
            }
        };

        let entry = circuits_map.entry(circuit_id).or_insert(Circuit {
            id: circuit_id,
            logic_blocks: 0,
            rams: Vec::new(),
        });
        entry.rams.push(LogicalRam {
            circuit_id,
            ram_id,
            mode,
            depth,
            width,
        });
    }

    Ok(circuits_map.into_values().collect())
}

pub fn write_mappings<W: Write>(mut out: W, outcomes: &[Outcome]) -> io::Result<()> {
    for outcome in outcomes {
        match outcome {
            Ok(sol) => {
                writeln!(
                    out,
                    "// -----------------------Circuit {}-----------------------------",
                    sol.circuit_id
                )?;
                for (ram, config) in &sol.mappings {
                    writeln!(
                        out,
                        "{} {} {} LW {} LD {} ID {} S {} P {} Type {} Mode {} W {} D {}",
                        ram.circuit_id,
                        ram.ram_id,
                        config.extra_luts,
                        ram.width,
                        ram.depth,
                        ram.ram_id,
                        config.series,
                        config.parallel,
                        config.phys_type.type_id(),
                        ram.mode.as_str(),
                        config.width,
                        config.depth
                    )?;
                }
            }
            Err(e) => {
                writeln!(
                    out,
                    "// -----------------------Circuit {} FAILED-----------------------",
                    e.circuit()
                )?;
                writeln!(out, "// {e}")?;
            }
        }
    }
    out.flush()
}

#[derive(Debug, Serialize)]
struct CircuitRow {
    #[serde(rename = "Circuit")]
    circuit: u32,
    #[serde(rename = "Status")]
    status: &'static str,
    #[serde(rename = "Logic_Blocks")]
    logic_blocks: Option<u64>,
    #[serde(rename = "Extra_Logic_Blocks")]
    extra_logic_blocks: Option<u64>,
    #[serde(rename = "LUTRAM_Units")]
    lutram_units: Option<u64>,
    #[serde(rename = "BRAM_Units_Used")]
    bram_used: Option<u64>,
    #[serde(rename = "BRAM_Units_In_Chip")]
    bram_units: Option<u64>,
    #[serde(rename = "Total_FPGA_Area")]
    area: Option<String>,
}

impl CircuitRow {
    fn solved(sol: &CircuitSolution) -> Self {
        CircuitRow {
            circuit: sol.circuit_id,
            status: sol.status.as_str(),
            logic_blocks: Some(sol.logic_blocks),
            extra_logic_blocks: Some(sol.extra_logic_blocks),
            lutram_units: Some(sol.lutram_units),
            bram_used: Some(sol.bram_used.iter().sum()),
            bram_units: Some(sol.bram_units.iter().sum()),
            area: Some(format!("{:.3}", sol.area)),
        }
    }

    fn failed(circuit: u32) -> Self {
        CircuitRow {
            circuit,
            status: "failed",
            logic_blocks: None,
            extra_logic_blocks: None,
            lutram_units: None,
            bram_used: None,
            bram_units: None,
            area: None,
        }
    }
}

pub fn write_csv<W: Write>(out: W, outcomes: &[Outcome]) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for outcome in outcomes {
        let row = match outcome {
            Ok(sol) => CircuitRow::solved(sol),
            Err(e) => CircuitRow::failed(e.circuit()),
        };
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Geometric mean, 0 for an empty slice.
pub fn geometric_mean(areas: &[f64]) -> f64 {
    if areas.is_empty() {
        return 0.0;
    }
    let log_sum: f64 = areas.iter().map(|a| a.ln()).sum();
    (log_sum / areas.len() as f64).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PhysType;
    use crate::error::{CircuitError, SolveError};
    use crate::logic_ram::RealizedConfig;
    use crate::model::SolveStatus;

    const BLOCKS: &str = "Circuit\t#LBs\n0\t120\n1\t45\nbad line\n";
    const RAMS: &str = "Num_Circuits 3\n\
Circuit\tRamID\tMode\t\tDepth\tWidth\n\
0\t0\tSinglePort\t1024\t8\n\
0\t1\tTrueDualPort\t64\t36\n\
1\t0\tQuadPort\t16\t16\n\
2\t0\tROM\t256\t0\n\
2\t1\tROM\t256\t4\n";

    fn solution() -> CircuitSolution {
        let ram = LogicalRam {
            circuit_id: 0,
            ram_id: 0,
            mode: MemMode::SinglePort,
            depth: 1024,
            width: 8,
        };
        CircuitSolution {
            circuit_id: 0,
            status: SolveStatus::Optimal,
            area: 4_200_000.0,
            logic_blocks: 112,
            extra_logic_blocks: 4,
            lutram_units: 8,
            bram_units: vec![11, 0],
            bram_used: vec![0, 0],
            mappings: vec![(
                ram,
                RealizedConfig {
                    series: 8,
                    parallel: 1,
                    extra_luts: 32,
                    phys_type: PhysType::Lutram,
                    width: 8,
                    depth: 128,
                },
            )],
        }
    }

    fn failure() -> CircuitError {
        CircuitError::Solver {
            circuit: 1,
            source: SolveError::Infeasible,
        }
    }

    #[test]
    fn reads_circuits_and_skips_bad_lines() {
        let circuits = read_circuits(BLOCKS.as_bytes(), RAMS.as_bytes()).unwrap();
        let ids: Vec<u32> = circuits.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(circuits[0].logic_blocks, 120);
        assert_eq!(circuits[0].rams.len(), 2);
        assert_eq!(circuits[0].rams[1].mode, MemMode::TrueDualPort);
        assert_eq!((circuits[0].rams[1].depth, circuits[0].rams[1].width), (64, 36));
        // unknown mode dropped
        assert!(circuits[1].rams.is_empty());
        // circuit without a block count line, zero width dropped
        assert_eq!(circuits[2].logic_blocks, 0);
        assert_eq!(circuits[2].rams.len(), 1);
        assert_eq!(circuits[2].rams[0].ram_id, 1);
    }

    #[test]
    fn reads_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let blocks = dir.path().join("logic_block_count.txt");
        let rams = dir.path().join("logical_rams.txt");
        std::fs::write(&blocks, BLOCKS).unwrap();
        std::fs::write(&rams, RAMS).unwrap();
        assert_eq!(read_data(&blocks, &rams).unwrap().len(), 3);
        assert!(read_data(&dir.path().join("missing"), &rams).is_err());
    }

    #[test]
    fn mapping_lines() {
        let mut out = Vec::new();
        write_mappings(&mut out, &[Ok(solution()), Err(failure())]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("Circuit 0"));
        assert_eq!(
            lines[1],
            "0 0 32 LW 8 LD 1024 ID 0 S 8 P 1 Type 1 Mode SinglePort W 8 D 128"
        );
        assert!(lines[2].contains("Circuit 1 FAILED"));
        assert_eq!(lines[3], "// circuit 1: model is infeasible");
    }

    #[test]
    fn csv_rows() {
        let mut out = Vec::new();
        write_csv(&mut out, &[Ok(solution()), Err(failure())]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Circuit,Status,Logic_Blocks,Extra_Logic_Blocks,LUTRAM_Units,BRAM_Units_Used,BRAM_Units_In_Chip,Total_FPGA_Area"
        );
        assert_eq!(lines[1], "0,optimal,112,4,8,0,11,4200000.000");
        assert_eq!(lines[2], "1,failed,,,,,,");
    }

    #[test]
    fn geometric_mean_of_areas() {
        assert_eq!(geometric_mean(&[]), 0.0);
        assert!((geometric_mean(&[2.0, 8.0]) - 4.0).abs() < 1e-9);
        assert!((geometric_mean(&[1.0e8, 1.0e8, 1.0e8]) - 1.0e8).abs() < 1e-3);
    }
}
