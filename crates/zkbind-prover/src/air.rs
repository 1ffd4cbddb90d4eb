//! AIR (Algebraic Intermediate Representation) constraints
//!
//! A circuit is described as an execution trace (columns of M31 values) plus
//! transition constraints evaluated over a sliding window of rows and boundary
//! assertions pinning individual cells to public values.

use crate::m31::M31;
use crate::types::{ProofError, PublicInputs};

/// A column in the execution trace
#[derive(Clone, Debug)]
pub struct TraceColumn {
    /// Column index
    pub index: usize,
    /// Column values
    pub values: Vec<M31>,
}

impl TraceColumn {
    pub fn new(index: usize, values: Vec<M31>) -> Self {
        Self { index, values }
    }
}

/// Execution trace (multiple columns)
#[derive(Clone, Debug, Default)]
pub struct Trace {
    /// Columns of the trace
    pub columns: Vec<TraceColumn>,
    /// Number of rows
    pub num_rows: usize,
}

impl Trace {
    /// Create a new trace
    pub fn new(columns: Vec<TraceColumn>) -> Self {
        let num_rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        Self { columns, num_rows }
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Check the trace is rectangular with a power-of-two row count
    pub fn validate(&self) -> Result<(), ProofError> {
        if self.columns.is_empty() {
            return Err(ProofError::invalid_trace("trace has no columns"));
        }
        if !self.num_rows.is_power_of_two() {
            return Err(ProofError::invalid_trace(format!(
                "row count {} is not a power of two",
                self.num_rows
            )));
        }
        if let Some(col) = self.columns.iter().find(|c| c.values.len() != self.num_rows) {
            return Err(ProofError::invalid_trace(format!(
                "column {} has {} rows, expected {}",
                col.index,
                col.values.len(),
                self.num_rows
            )));
        }
        Ok(())
    }

    /// Overwrite and release every column
    pub fn clear(&mut self) {
        for column in &mut self.columns {
            column.values.fill(M31::ZERO);
        }
        self.columns.clear();
        self.num_rows = 0;
    }
}

/// A window of consecutive trace rows, as seen by a transition constraint
///
/// The prover builds frames from the full trace; the verifier builds them from
/// opened values only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluationFrame {
    /// Row-major values: `rows * width`
    values: Vec<M31>,
    width: usize,
}

impl EvaluationFrame {
    /// Build a frame from row-major values
    pub fn new(values: Vec<M31>, width: usize) -> Self {
        Self { values, width }
    }

    /// Frame starting at `row`, spanning `window` rows
    pub fn from_trace(trace: &Trace, row: usize, window: usize) -> Option<Self> {
        if row + window > trace.num_rows {
            return None;
        }
        let width = trace.num_columns();
        let mut values = Vec::with_capacity(window * width);
        for offset in 0..window {
            for column in &trace.columns {
                values.push(*column.values.get(row + offset)?);
            }
        }
        Some(Self { values, width })
    }

    /// Value at `offset` rows below the frame start, in column `col`
    pub fn get(&self, offset: usize, col: usize) -> M31 {
        self.values[offset * self.width + col]
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

/// A polynomial constraint
#[derive(Clone, Debug)]
pub struct Constraint {
    /// Constraint name (for debugging)
    pub name: String,
    /// Degree of the constraint polynomial
    pub degree: usize,
    /// Columns involved in this constraint
    pub columns: Vec<usize>,
}

impl Constraint {
    /// Create a new constraint
    pub fn new(name: impl Into<String>, degree: usize, columns: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            degree,
            columns,
        }
    }
}

/// A single trace cell pinned to a public value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundaryAssertion {
    pub column: usize,
    pub row: usize,
    pub value: M31,
}

impl BoundaryAssertion {
    pub fn new(column: usize, row: usize, value: M31) -> Self {
        Self { column, row, value }
    }
}

/// Constraint evaluator trait
pub trait ConstraintEvaluator {
    /// Stable identifier, bound into the verification key
    fn circuit_id(&self) -> &str;

    /// Number of trace columns the circuit uses
    fn num_columns(&self) -> usize;

    /// Number of consecutive rows a transition constraint reads
    fn window(&self) -> usize {
        1
    }

    /// Evaluate all transition constraints on one frame
    fn evaluate(&self, frame: &EvaluationFrame) -> Vec<M31>;

    /// Get constraint definitions
    fn constraints(&self) -> Vec<Constraint>;

    /// Cells that must equal public values
    fn boundary_assertions(
        &self,
        public_inputs: &PublicInputs,
        num_rows: usize,
    ) -> Result<Vec<BoundaryAssertion>, ProofError>;

    /// Rows on which transition constraints are enforced
    fn transition_rows(&self, num_rows: usize) -> usize {
        num_rows.saturating_sub(self.window().saturating_sub(1))
    }
}

/// Combine one row's constraint evaluations into a single value
///
/// `weight` is the per-row weight taken from the reference string.
pub fn compose_row(evals: &[M31], random_coefficients: &[M31], weight: M31) -> M31 {
    let combined: M31 = evals
        .iter()
        .enumerate()
        .map(|(i, &eval)| eval * random_coefficients.get(i).copied().unwrap_or(M31::ONE))
        .sum();
    combined * weight
}

/// Compute the composition values from constraint evaluations
pub fn compose_constraints(
    constraint_evals: &[Vec<M31>],
    random_coefficients: &[M31],
    row_weights: &[M31],
) -> Vec<M31> {
    constraint_evals
        .iter()
        .enumerate()
        .map(|(row, evals)| {
            let weight = row_weights.get(row).copied().unwrap_or(M31::ONE);
            compose_row(evals, random_coefficients, weight)
        })
        .collect()
}

/// Verify that all transition constraints evaluate to zero
pub fn verify_constraints<E: ConstraintEvaluator + ?Sized>(
    evaluator: &E,
    trace: &Trace,
) -> Result<(), Vec<(usize, String)>> {
    let mut failures = Vec::new();
    let constraints = evaluator.constraints();
    let window = evaluator.window();

    for row in 0..evaluator.transition_rows(trace.num_rows) {
        let Some(frame) = EvaluationFrame::from_trace(trace, row, window) else {
            failures.push((row, "frame_out_of_bounds".to_string()));
            continue;
        };

        for (i, eval) in evaluator.evaluate(&frame).iter().enumerate() {
            if !eval.is_zero() {
                let name = constraints
                    .get(i)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| format!("constraint_{}", i));
                failures.push((row, name));
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures)
    }
}

/// Check boundary assertions against the trace
pub fn verify_boundary(trace: &Trace, assertions: &[BoundaryAssertion]) -> Result<(), ProofError> {
    for assertion in assertions {
        let actual = trace
            .columns
            .get(assertion.column)
            .and_then(|c| c.values.get(assertion.row))
            .copied()
            .ok_or_else(|| {
                ProofError::invalid_trace(format!(
                    "boundary cell ({}, {}) outside the trace",
                    assertion.row, assertion.column
                ))
            })?;
        if actual != assertion.value {
            return Err(ProofError::constraint_violation(format!(
                "boundary assertion at row {} column {}: trace has {}, public input claims {}",
                assertion.row, assertion.column, actual, assertion.value
            )));
        }
    }
    Ok(())
}
