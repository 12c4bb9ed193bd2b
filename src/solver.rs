//! Default MILP backend: depth-first branch and bound whose LP relaxations
//! are solved by good_lp's pure-Rust microlp.

use std::time::{Duration, Instant};

use good_lp::solvers::microlp::microlp;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint,
    variable,
};

use crate::error::SolveError;
use crate::model::{LinearExpr, MilpSolver, Model, ModelSolution, Sense, SolveStatus, VarKind};

pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(7);

const INT_TOLERANCE: f64 = 1e-6;

/// Solves on the calling thread. The budget is checked between relaxations,
/// so nothing keeps running once `solve` returns.
#[derive(Clone, Copy, Debug)]
pub struct MicroLpSolver {
    pub time_limit: Duration,
}

impl Default for MicroLpSolver {
    fn default() -> Self {
        MicroLpSolver {
            time_limit: DEFAULT_TIME_LIMIT,
        }
    }
}

impl MilpSolver for MicroLpSolver {
    fn solve(&self, model: &Model) -> Result<ModelSolution, SolveError> {
        let start = Instant::now();
        branch_and_bound(model, |_| start.elapsed() >= self.time_limit)?
            .ok_or(SolveError::TimeLimit(self.time_limit))
    }
}

/// (lower, upper) bound of every variable at one node.
type Bounds = Vec<(f64, Option<f64>)>;

/// Explores nodes until the tree is exhausted or `out_of_time` says stop.
///
/// `out_of_time` is told whether an incumbent exists. Stopping early returns
/// that incumbent as [`SolveStatus::Feasible`], or `None` without one.
fn branch_and_bound(
    model: &Model,
    mut out_of_time: impl FnMut(bool) -> bool,
) -> Result<Option<ModelSolution>, SolveError> {
    let root: Bounds = model
        .vars()
        .iter()
        .map(|def| match def.kind {
            VarKind::Binary => (0.0, Some(1.0)),
            VarKind::Integer => (0.0, None),
        })
        .collect();
    let mut stack = vec![root];
    let mut best: Option<(f64, Vec<f64>)> = None;

    while let Some(bounds) = stack.pop() {
        if let Some((objective, values)) = relax(model, &bounds)? {
            let dominated = best
                .as_ref()
                .is_some_and(|(incumbent, _)| objective >= incumbent - gap(*incumbent));
            if !dominated {
                match most_fractional(&values) {
                    None => {
                        best = Some((objective, values.iter().map(|v| v.round()).collect()));
                    }
                    Some(i) => {
                        let v = values[i];
                        let mut down = bounds.clone();
                        down[i].1 = Some(v.floor());
                        let mut up = bounds;
                        up[i].0 = v.ceil();
                        // nearer side on top
                        if v - v.floor() < 0.5 {
                            stack.push(up);
                            stack.push(down);
                        } else {
                            stack.push(down);
                            stack.push(up);
                        }
                    }
                }
            }
        }

        if !stack.is_empty() && out_of_time(best.is_some()) {
            return Ok(best.map(|(_, values)| ModelSolution {
                status: SolveStatus::Feasible,
                values,
            }));
        }
    }

    match best {
        Some((_, values)) => Ok(Some(ModelSolution {
            status: SolveStatus::Optimal,
            values,
        })),
        None => Err(SolveError::Infeasible),
    }
}

fn gap(objective: f64) -> f64 {
    1e-9 * objective.abs().max(1.0)
}

fn most_fractional(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| (i, (v - v.round()).abs()))
        .filter(|&(_, frac)| frac > INT_TOLERANCE)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// LP relaxation at one node; `None` when it is infeasible.
fn relax(
    model: &Model,
    bounds: &[(f64, Option<f64>)],
) -> Result<Option<(f64, Vec<f64>)>, SolveError> {
    let mut vars = ProblemVariables::new();
    let handles: Vec<Variable> = model
        .vars()
        .iter()
        .zip(bounds)
        .map(|(def, &(lower, upper))| {
            let mut def_var = variable().name(def.name.clone()).min(lower);
            if let Some(upper) = upper {
                def_var = def_var.max(upper);
            }
            vars.add(def_var)
        })
        .collect();

    let mut problem = vars
        .minimise(to_expression(model.objective(), &handles))
        .using(microlp);
    for c in model.constraints() {
        problem = problem.with(match c.sense {
            Sense::Le => constraint::leq(to_expression(&c.expr, &handles), 0.0),
            Sense::Ge => constraint::leq(to_expression(&(c.expr.clone() * -1.0), &handles), 0.0),
            Sense::Eq => constraint::eq(to_expression(&c.expr, &handles), 0.0),
        });
    }

    let solution = match problem.solve() {
        Ok(solution) => solution,
        Err(ResolutionError::Infeasible) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let values: Vec<f64> = handles.iter().map(|&v| solution.value(v)).collect();
    Ok(Some((model.objective().evaluate(&values), values)))
}

fn to_expression(expr: &LinearExpr, handles: &[Variable]) -> Expression {
    let mut out = Expression::with_capacity(expr.terms.len());
    for &(var, coef) in &expr.terms {
        out += coef * handles[var.index()];
    }
    out += expr.constant;
    out
}

impl From<ResolutionError> for SolveError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Infeasible => SolveError::Infeasible,
            ResolutionError::Unbounded => SolveError::Unbounded,
            other => SolveError::Backend(other.to_string()),
        }
    }
}
