//! Per logical RAM decision: which primitive implements it.

use crate::LogicalRam;
use crate::catalog::{PhysType, PrimitiveCatalog};
use crate::error::CircuitError;
use crate::model::{LinearExpr, Model, ModelSolution, Sense, VarId};
use crate::selector::{BestConfig, select_config};

/// A primitive that can implement the RAM, with its "use this one" binary.
#[derive(Clone, Copy, Debug)]
pub struct Choice {
    pub phys_type: PhysType,
    pub config: BestConfig,
    pub selected: VarId,
}

/// What the solver picked for one logical RAM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RealizedConfig {
    pub series: u32,
    pub parallel: u32,
    pub extra_luts: u32,
    pub phys_type: PhysType,
    pub width: u32,
    pub depth: u32,
}

impl RealizedConfig {
    pub fn units(&self) -> u32 {
        self.series * self.parallel
    }
}

#[derive(Clone, Debug)]
pub struct LogicRamModel {
    pub ram: LogicalRam,
    /// Only feasible primitives get a variable.
    pub choices: Vec<Choice>,
}

impl LogicRamModel {
    /// Adds one binary per feasible primitive and requires exactly one of them.
    pub fn new(
        ram: &LogicalRam,
        catalog: &PrimitiveCatalog,
        model: &mut Model,
    ) -> Result<Self, CircuitError> {
        let mut choices = Vec::new();
        let mut reasons = Vec::new();
        for (phys_type, prim) in catalog.iter() {
            match select_config(ram, prim) {
                Ok(config) => {
                    let selected = model.binary(format!(
                        "use_{}_{}_{}",
                        ram.circuit_id,
                        ram.ram_id,
                        phys_type.type_id()
                    ));
                    choices.push(Choice {
                        phys_type,
                        config,
                        selected,
                    });
                }
                Err(why) => reasons.push((prim.name.clone(), why)),
            }
        }

        if choices.is_empty() {
            return Err(CircuitError::InfeasibleRam {
                circuit: ram.circuit_id,
                ram: ram.ram_id,
                reasons,
            });
        }

        let picked: LinearExpr = choices.iter().map(|c| LinearExpr::from(c.selected)).sum();
        model.constrain(
            format!("one_primitive_{}_{}", ram.circuit_id, ram.ram_id),
            picked,
            Sense::Eq,
            LinearExpr::constant(1.0),
        );

        Ok(LogicRamModel {
            ram: *ram,
            choices,
        })
    }

    fn units_of(&self, phys_type: PhysType) -> LinearExpr {
        let mut expr = LinearExpr::new();
        for c in self.choices.iter().filter(|c| c.phys_type == phys_type) {
            expr.add_term(c.selected, c.config.units as f64);
        }
        expr
    }

    /// LUTRAM units used, zero unless LUTRAM is selected.
    pub fn lutram_units(&self) -> LinearExpr {
        self.units_of(PhysType::Lutram)
    }

    /// Units of block RAM `k` used.
    pub fn bram_units(&self, k: usize) -> LinearExpr {
        self.units_of(PhysType::Bram(k))
    }

    /// Decoder and multiplexer LUTs of whichever primitive is selected.
    pub fn extra_luts(&self) -> LinearExpr {
        let mut expr = LinearExpr::new();
        for c in &self.choices {
            expr.add_term(c.selected, c.config.extra_luts as f64);
        }
        expr
    }

    pub fn realize(&self, solution: &ModelSolution) -> Result<RealizedConfig, CircuitError> {
        let choice = self
            .choices
            .iter()
            .find(|c| solution.is_set(c.selected))
            .ok_or(CircuitError::NoSelection {
                circuit: self.ram.circuit_id,
                ram: self.ram.ram_id,
            })?;
        Ok(RealizedConfig {
            series: choice.config.series,
            parallel: choice.config.parallel,
            extra_luts: choice.config.extra_luts,
            phys_type: choice.phys_type,
            width: choice.config.width,
            depth: choice.config.depth,
        })
    }
}
