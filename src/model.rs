use std::iter::Sum;
use std::ops::{Add, Mul, Sub};

use crate::error::SolveError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    Integer,
}

#[derive(Clone, Debug)]
pub struct VarDef {
    pub name: String,
    pub kind: VarKind,
}

/// `constant + sum(coef * var)`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        LinearExpr {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn term(var: VarId, coef: f64) -> Self {
        LinearExpr {
            terms: vec![(var, coef)],
            constant: 0.0,
        }
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coef)| coef * values[var.0])
            .sum::<f64>()
            + self.constant
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        LinearExpr::term(var, 1.0)
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
        self
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: LinearExpr) -> LinearExpr {
        self + rhs * -1.0
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(mut self, rhs: f64) -> LinearExpr {
        for (_, coef) in &mut self.terms {
            *coef *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Sum for LinearExpr {
    fn sum<I: Iterator<Item = LinearExpr>>(iter: I) -> LinearExpr {
        iter.fold(LinearExpr::new(), |acc, e| acc + e)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

/// `expr <sense> 0`
#[derive(Clone, Debug)]
pub struct Constraint {
    pub name: String,
    pub expr: LinearExpr,
    pub sense: Sense,
}

impl Constraint {
    pub fn holds(&self, values: &[f64], tolerance: f64) -> bool {
        let v = self.expr.evaluate(values);
        match self.sense {
            Sense::Le => v <= tolerance,
            Sense::Ge => v >= -tolerance,
            Sense::Eq => v.abs() <= tolerance,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Model {
    vars: Vec<VarDef>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_var(&mut self, name: impl Into<String>, kind: VarKind) -> VarId {
        self.vars.push(VarDef {
            name: name.into(),
            kind,
        });
        VarId(self.vars.len() - 1)
    }

    pub fn integer(&mut self, name: impl Into<String>) -> VarId {
        self.add_var(name, VarKind::Integer)
    }

    pub fn binary(&mut self, name: impl Into<String>) -> VarId {
        self.add_var(name, VarKind::Binary)
    }

    pub fn constrain(
        &mut self,
        name: impl Into<String>,
        lhs: LinearExpr,
        sense: Sense,
        rhs: LinearExpr,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            expr: lhs - rhs,
            sense,
        });
    }

    pub fn minimise(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<&str> {
        self.constraints
            .iter()
            .filter(|c| !c.holds(values, tolerance))
            .map(|c| c.name.as_str())
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    /// Best incumbent when the time budget ran out. `MicroLpSolver` returns it
    /// when the budget expires after a first integral solution was found.
    Feasible,
}

impl SolveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Feasible => "feasible",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ModelSolution {
    pub status: SolveStatus,
    pub values: Vec<f64>,
}

impl ModelSolution {
    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.0]
    }

    pub fn int_value(&self, var: VarId) -> i64 {
        self.value(var).round() as i64
    }

    pub fn is_set(&self, var: VarId) -> bool {
        self.value(var) > 0.5
    }
}

pub trait MilpSolver: Send + Sync {
    fn solve(&self, model: &Model) -> Result<ModelSolution, SolveError>;
}
