//! Area-minimal mapping of all logical RAMs of one circuit.
//!
//! Every logical RAM picks one primitive. The chip is then sized so that
//! the logic blocks hold the circuit's own logic, the series overhead and
//! all LUTRAM, while each block RAM type is spread over the logic blocks at
//! its availability ratio.

use crate::catalog::{PhysType, PrimitiveCatalog};
use crate::error::CircuitError;
use crate::logic_ram::{LogicRamModel, RealizedConfig};
use crate::model::{LinearExpr, MilpSolver, Model, ModelSolution, Sense, SolveStatus, VarId};
use crate::{Circuit, LogicalRam};

/// LUTs per logic block.
pub const LB_SIZE: f64 = 10.0;

/// The model of one circuit before solving.
pub struct CircuitModel<'a> {
    circuit: &'a Circuit,
    catalog: &'a PrimitiveCatalog,
    pub model: Model,
    pub rams: Vec<LogicRamModel>,
    pub logic_blocks: VarId,
    pub extra_logic_blocks: VarId,
    pub bram_units: Vec<VarId>,
}

#[derive(Clone, Debug)]
pub struct CircuitSolution {
    pub circuit_id: u32,
    pub status: SolveStatus,
    pub area: f64,
    pub logic_blocks: u64,
    pub extra_logic_blocks: u64,
    pub lutram_units: u64,
    /// Block RAMs on the chip, per type.
    pub bram_units: Vec<u64>,
    /// Block RAMs used by the mapping, per type.
    pub bram_used: Vec<u64>,
    pub mappings: Vec<(LogicalRam, RealizedConfig)>,
}

impl<'a> CircuitModel<'a> {
    pub fn build(
        circuit: &'a Circuit,
        catalog: &'a PrimitiveCatalog,
    ) -> Result<Self, CircuitError> {
        let mut model = Model::new();
        let rams = circuit
            .rams
            .iter()
            .map(|ram| LogicRamModel::new(ram, catalog, &mut model))
            .collect::<Result<Vec<_>, _>>()?;

        let logic_blocks = model.integer("final_logic_blocks");
        let extra_logic_blocks = model.integer("final_extra_logic_blocks");
        let bram_units: Vec<VarId> = (0..catalog.brams.len())
            .map(|k| model.integer(format!("final_bram_{k}")))
            .collect();

        let lb = || LinearExpr::from(logic_blocks);
        let total_lutram: LinearExpr = rams.iter().map(|r| r.lutram_units()).sum();
        let total_extra_luts: LinearExpr = rams.iter().map(|r| r.extra_luts()).sum();

        // extra LBs within one LB of the exact LUT count / LB_SIZE
        let extra_lbs = total_extra_luts * (1.0 / LB_SIZE);
        model.constrain(
            "extra_lb_lower",
            extra_logic_blocks.into(),
            Sense::Ge,
            extra_lbs.clone(),
        );
        model.constrain(
            "extra_lb_upper",
            extra_logic_blocks.into(),
            Sense::Le,
            extra_lbs + LinearExpr::constant(LB_SIZE),
        );

        model.constrain(
            "logic_capacity",
            lb(),
            Sense::Ge,
            LinearExpr::constant(circuit.logic_blocks as f64)
                + extra_logic_blocks.into()
                + total_lutram.clone(),
        );

        if let Some(lutram) = &catalog.lutram {
            model.constrain(
                "lutram_capacity",
                lb(),
                Sense::Ge,
                total_lutram * lutram.availability,
            );
        }

        for (k, bram) in catalog.brams.iter().enumerate() {
            let used: LinearExpr = rams.iter().map(|r| r.bram_units(k)).sum();
            let on_chip = LinearExpr::from(bram_units[k]);
            model.constrain(
                format!("bram_{k}_capacity"),
                lb(),
                Sense::Ge,
                used * bram.availability,
            );
            // one block RAM every `availability` logic blocks
            model.constrain(
                format!("bram_{k}_spread_lower"),
                on_chip.clone() * bram.availability,
                Sense::Ge,
                lb() - LinearExpr::constant(bram.availability),
            );
            model.constrain(
                format!("bram_{k}_spread_upper"),
                on_chip * bram.availability,
                Sense::Le,
                lb(),
            );
        }

        let mut objective = LinearExpr::term(logic_blocks, catalog.avg_logic_block_area());
        for (k, bram) in catalog.brams.iter().enumerate() {
            objective.add_term(bram_units[k], bram.area_per_unit);
        }
        model.minimise(objective);

        Ok(CircuitModel {
            circuit,
            catalog,
            model,
            rams,
            logic_blocks,
            extra_logic_blocks,
            bram_units,
        })
    }

    pub fn solve(&self, solver: &dyn MilpSolver) -> Result<CircuitSolution, CircuitError> {
        let solution = solver
            .solve(&self.model)
            .map_err(|source| CircuitError::Solver {
                circuit: self.circuit.id,
                source,
            })?;
        let violated = self.model.violations(&solution.values, 1e-6);
        if !violated.is_empty() {
            eprintln!(
                "warning: circuit {}: solution violates {}",
                self.circuit.id,
                violated.join(", ")
            );
        }
        self.extract(&solution)
    }

    pub fn extract(&self, solution: &ModelSolution) -> Result<CircuitSolution, CircuitError> {
        let count = |var: VarId| solution.int_value(var).max(0) as u64;

        let mappings = self
            .rams
            .iter()
            .map(|r| Ok((r.ram, r.realize(solution)?)))
            .collect::<Result<Vec<_>, CircuitError>>()?;

        let logic_blocks = count(self.logic_blocks);
        let bram_units: Vec<u64> = self.bram_units.iter().map(|&v| count(v)).collect();
        let area = self.catalog.avg_logic_block_area() * logic_blocks as f64
            + self
                .catalog
                .brams
                .iter()
                .zip(&bram_units)
                .map(|(bram, &n)| bram.area_per_unit * n as f64)
                .sum::<f64>();

        let mut lutram_units = 0;
        let mut bram_used = vec![0; self.bram_units.len()];
        for (_, config) in &mappings {
            match config.phys_type {
                PhysType::Lutram => lutram_units += u64::from(config.units()),
                PhysType::Bram(k) => bram_used[k] += u64::from(config.units()),
            }
        }

        Ok(CircuitSolution {
            circuit_id: self.circuit.id,
            status: solution.status,
            area,
            logic_blocks,
            extra_logic_blocks: count(self.extra_logic_blocks),
            lutram_units,
            bram_units,
            bram_used,
            mappings,
        })
    }
}

impl CircuitSolution {
    /// Block RAM types whose on-chip count is below what the mapping uses,
    /// as `(type, on chip, used)`.
    pub fn bram_shortfall(&self) -> Vec<(usize, u64, u64)> {
        self.bram_units
            .iter()
            .zip(&self.bram_used)
            .enumerate()
            .filter(|(_, (on_chip, used))| on_chip < used)
            .map(|(k, (&on_chip, &used))| (k, on_chip, used))
            .collect()
    }
}

/// Builds and solves the model of one circuit.
pub fn optimize_circuit(
    circuit: &Circuit,
    catalog: &PrimitiveCatalog,
    solver: &dyn MilpSolver,
) -> Result<CircuitSolution, CircuitError> {
    CircuitModel::build(circuit, catalog)?.solve(solver)
}
