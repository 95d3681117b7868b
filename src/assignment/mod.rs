pub mod kuhn_munkres;
pub mod shortest_path;

pub use kuhn_munkres::KuhnMunkres;
pub use shortest_path::ShortestAugmentingPath;

use serde::Serialize;

use crate::error::{MatchError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostMatrix {
    rows: usize,
    cols: usize,
    data: Vec<i32>,
}

impl CostMatrix {
    /// `data` is row-major.
    pub fn new(rows: usize, cols: usize, data: Vec<i32>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(MatchError::invalid(format!(
                "cost matrix must be non-empty, got {rows}x{cols}"
            )));
        }
        let expected = rows.checked_mul(cols).ok_or_else(|| {
            MatchError::invalid(format!("cost matrix {rows}x{cols} is too large"))
        })?;
        if data.len() != expected {
            return Err(MatchError::invalid(format!(
                "cost matrix {rows}x{cols} needs {expected} cells, got {}",
                data.len()
            )));
        }
        if let Some(position) = data.iter().position(|&cost| cost < 0) {
            return Err(MatchError::invalid(format!(
                "negative cost {} at row {}, column {}",
                data[position],
                position / cols,
                position % cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    pub fn from_rows(rows: Vec<Vec<i32>>) -> Result<Self> {
        let row_count = rows.len();
        let cols = rows.first().map(Vec::len).unwrap_or_default();
        let mut data = Vec::with_capacity(row_count * cols);
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(MatchError::invalid(format!(
                    "irregular cost matrix: row {idx} has {} columns, expected {cols}",
                    row.len()
                )));
            }
            data.extend(row);
        }
        Self::new(row_count, cols, data)
    }

    pub fn filled(rows: usize, cols: usize, value: i32) -> Result<Self> {
        let len = rows.checked_mul(cols).ok_or_else(|| {
            MatchError::invalid(format!("cost matrix {rows}x{cols} is too large"))
        })?;
        Self::new(rows, cols, vec![value; len])
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> i32 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, cost: i32) -> Result<()> {
        if cost < 0 {
            return Err(MatchError::invalid(format!(
                "negative cost {cost} at row {row}, column {col}"
            )));
        }
        self.data[row * self.cols + col] = cost;
        Ok(())
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }

    pub fn transpose(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for col in 0..self.cols {
            for row in 0..self.rows {
                data.push(self.get(row, col));
            }
        }
        Self {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    pub(crate) fn into_raw(self) -> (usize, usize, Vec<i32>) {
        (self.rows, self.cols, self.data)
    }
}

/// One entry per row; `None` marks an unassigned row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    columns: Vec<Option<usize>>,
}

impl Assignment {
    pub fn unassigned(rows: usize) -> Self {
        Self {
            columns: vec![None; rows],
        }
    }

    pub fn from_columns(columns: Vec<Option<usize>>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<usize> {
        self.columns.get(row).copied().flatten()
    }

    pub fn columns(&self) -> &[Option<usize>] {
        &self.columns
    }

    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(row, col)| col.map(|col| (row, col)))
    }

    pub fn cardinality(&self) -> usize {
        self.columns.iter().filter(|col| col.is_some()).count()
    }

    pub fn total_cost(&self, costs: &CostMatrix) -> i64 {
        self.pairs()
            .map(|(row, col)| i64::from(costs.get(row, col)))
            .sum()
    }

    /// The flat encoding with `-1` for unassigned rows.
    pub fn to_sentinel_vec(&self) -> Vec<i64> {
        self.columns
            .iter()
            .map(|col| col.map(|col| col as i64).unwrap_or(-1))
            .collect()
    }

    pub fn transpose(&self, cols: usize) -> Self {
        let mut columns = vec![None; cols];
        for (row, col) in self.pairs() {
            columns[col] = Some(row);
        }
        Self { columns }
    }
}

/// Selects `min(rows, cols)` cells, no two sharing a row or column, with the
/// smallest total cost.
pub trait AssignmentSolver {
    fn solve(&self, costs: CostMatrix) -> Result<Assignment>;
}

impl<S: AssignmentSolver + ?Sized> AssignmentSolver for &S {
    fn solve(&self, costs: CostMatrix) -> Result<Assignment> {
        (**self).solve(costs)
    }
}

impl<S: AssignmentSolver + ?Sized> AssignmentSolver for Box<S> {
    fn solve(&self, costs: CostMatrix) -> Result<Assignment> {
        (**self).solve(costs)
    }
}

pub fn solve(costs: &CostMatrix) -> Result<Assignment> {
    KuhnMunkres.solve(costs.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_rejects_irregular_and_empty_input() {
        assert!(matches!(
            CostMatrix::from_rows(vec![vec![1, 2], vec![3]]),
            Err(MatchError::InvalidArgument(_))
        ));
        assert!(matches!(
            CostMatrix::from_rows(Vec::new()),
            Err(MatchError::InvalidArgument(_))
        ));
        assert!(matches!(
            CostMatrix::from_rows(vec![Vec::new()]),
            Err(MatchError::InvalidArgument(_))
        ));
        assert!(matches!(
            CostMatrix::from_rows(vec![vec![1, -2]]),
            Err(MatchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn transpose_swaps_addressing() {
        let matrix = CostMatrix::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).expect("matrix");
        let transposed = matrix.transpose();
        assert_eq!(transposed.rows(), 3);
        assert_eq!(transposed.cols(), 2);
        assert_eq!(transposed.get(2, 1), 6);
        assert_eq!(transposed.get(0, 1), 4);
    }

    #[test]
    fn assignment_reports_pairs_and_sentinels() {
        let assignment = Assignment::from_columns(vec![Some(2), None, Some(0)]);
        assert_eq!(assignment.cardinality(), 2);
        assert_eq!(assignment.pairs().collect::<Vec<_>>(), vec![(0, 2), (2, 0)]);
        assert_eq!(assignment.to_sentinel_vec(), vec![2, -1, 0]);
        let flipped = assignment.transpose(3);
        assert_eq!(flipped.columns(), &[Some(2), None, Some(0)]);
    }
}
