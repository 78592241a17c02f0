// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Linear programs and the solver boundary.
//!
//! Models are built against [`VariableId`] handles with named variables and
//! named constraints, so an infeasible model can be dumped as LP text for
//! inspection. Solving goes through the [`Solver`] trait; the default
//! [`SimplexSolver`] delegates to `minilp`.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};
use serde::{Deserialize, Serialize};

/// Slack for comparing solver output against bounds.
pub const EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SolveError {
    #[error("linear program is infeasible")]
    Infeasible,

    #[error("linear program is unbounded")]
    Unbounded,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Index of a variable within its [`LinearProgram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariableId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    Le,
    Eq,
    Ge,
}

impl Relation {
    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Le => lhs <= rhs + EPSILON,
            Self::Eq => (lhs - rhs).abs() <= EPSILON,
            Self::Ge => lhs + EPSILON >= rhs,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Le => "<=",
            Self::Eq => "=",
            Self::Ge => ">=",
        })
    }
}

/// Sparse linear expression. Repeated variables are summed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    terms: BTreeMap<VariableId, f64>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, var: VariableId, coeff: f64) -> &mut Self {
        *self.terms.entry(var).or_insert(0.0) += coeff;
        self
    }

    pub fn with(mut self, var: VariableId, coeff: f64) -> Self {
        self.add(var, coeff);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.values().all(|c| *c == 0.0)
    }

    pub fn terms(&self) -> impl Iterator<Item = (VariableId, f64)> + '_ {
        self.terms.iter().filter(|(_, c)| **c != 0.0).map(|(v, c)| (*v, *c))
    }
}

impl FromIterator<(VariableId, f64)> for Row {
    fn from_iter<I: IntoIterator<Item = (VariableId, f64)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (var, coeff) in iter {
            row.add(var, coeff);
        }
        row
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub objective: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub row: Row,
    pub relation: Relation,
    pub rhs: f64,
}

/// A maximization problem over bounded continuous variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearProgram {
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
}

impl LinearProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VariableId {
        let id = VariableId(self.variables.len());
        self.variables.push(Variable { name: name.into(), lower, upper, objective: 0.0 });
        id
    }

    /// Add `coeff` to the objective coefficient of `var`.
    pub fn add_objective(&mut self, var: VariableId, coeff: f64) {
        if let Some(v) = self.variables.get_mut(var.0) {
            v.objective += coeff;
        }
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, row: Row, relation: Relation, rhs: f64) {
        self.constraints.push(Constraint { name: name.into(), row, relation, rhs });
    }

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.0)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    fn name(&self, id: VariableId) -> &str {
        self.variables.get(id.0).map_or("?", |v| v.name.as_str())
    }

    /// Render as CPLEX-style LP text.
    pub fn dump(&self) -> String {
        let mut out = String::from("Maximize\n obj:");
        for (i, v) in self.variables.iter().enumerate() {
            if v.objective != 0.0 {
                let _ = write!(out, " {:+} {}", v.objective, self.name(VariableId(i)));
            }
        }
        out.push_str("\nSubject To\n");
        for c in &self.constraints {
            let _ = write!(out, " {}:", c.name);
            if c.row.is_empty() {
                out.push_str(" 0");
            }
            for (var, coeff) in c.row.terms() {
                let _ = write!(out, " {coeff:+} {}", self.name(var));
            }
            let _ = writeln!(out, " {} {}", c.relation, c.rhs);
        }
        out.push_str("Bounds\n");
        for v in &self.variables {
            let _ = writeln!(out, " {} <= {} <= {}", v.lower, v.name, v.upper);
        }
        out.push_str("End\n");
        out
    }
}

// ---------------------------------------------------------------------------
// Solving
// ---------------------------------------------------------------------------

/// Optimal values, indexed by [`VariableId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub values: Vec<f64>,
    pub objective: f64,
}

impl Assignment {
    pub fn value(&self, var: VariableId) -> f64 {
        self.values.get(var.0).copied().unwrap_or(0.0)
    }

    /// Whether a 0/1 decision was taken.
    pub fn is_set(&self, var: VariableId) -> bool {
        self.value(var) > EPSILON
    }

    /// Variables whose value is not within `EPSILON` of an integer.
    pub fn fractional(&self) -> usize {
        self.values.iter().filter(|v| (*v - v.round()).abs() > EPSILON).count()
    }
}

/// Anything that can maximize a [`LinearProgram`].
pub trait Solver: fmt::Debug + Send + Sync {
    fn solve(&self, lp: &LinearProgram) -> Result<Assignment, SolveError>;
}

/// Dense simplex via `minilp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexSolver;

impl Solver for SimplexSolver {
    fn solve(&self, lp: &LinearProgram) -> Result<Assignment, SolveError> {
        let mut problem = Problem::new(OptimizationDirection::Maximize);
        let vars: Vec<_> = lp
            .variables
            .iter()
            .map(|v| problem.add_var(v.objective, (v.lower, v.upper)))
            .collect();

        for c in &lp.constraints {
            if c.row.is_empty() {
                // minilp rejects empty rows; decide them here
                if !c.relation.holds(0.0, c.rhs) {
                    return Err(SolveError::Infeasible);
                }
                continue;
            }
            let mut expr = LinearExpr::empty();
            for (var, coeff) in c.row.terms() {
                expr.add(vars[var.0], coeff);
            }
            let op = match c.relation {
                Relation::Le => ComparisonOp::Le,
                Relation::Eq => ComparisonOp::Eq,
                Relation::Ge => ComparisonOp::Ge,
            };
            problem.add_constraint(expr, op, c.rhs);
        }

        if vars.is_empty() {
            return Ok(Assignment { values: Vec::new(), objective: 0.0 });
        }
        let solution = problem.solve().map_err(|e| match e {
            minilp::Error::Infeasible => SolveError::Infeasible,
            minilp::Error::Unbounded => SolveError::Unbounded,
        })?;
        Ok(Assignment {
            values: vars.iter().map(|v| solution[*v]).collect(),
            objective: solution.objective(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
