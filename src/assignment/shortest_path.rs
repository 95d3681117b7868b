use log::trace;

use crate::assignment::{Assignment, AssignmentSolver, CostMatrix};
use crate::error::{MatchError, Result};

/// Jonker-Volgenant style shortest augmenting path. Same optimum as
/// Kuhn-Munkres, though ties may pick different cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShortestAugmentingPath;

impl AssignmentSolver for ShortestAugmentingPath {
    fn solve(&self, costs: CostMatrix) -> Result<Assignment> {
        if costs.rows() > costs.cols() {
            let rows = costs.rows();
            let flipped = solve_wide(&costs.transpose())?;
            return Ok(flipped.transpose(rows));
        }
        solve_wide(&costs)
    }
}

// rows <= cols; arrays are 1-based, slot 0 is the virtual source column
fn solve_wide(costs: &CostMatrix) -> Result<Assignment> {
    let rows = costs.rows();
    let cols = costs.cols();
    const UNREACHED: i64 = i64::MAX;

    let mut u = vec![0i64; rows + 1];
    let mut v = vec![0i64; cols + 1];
    let mut owner = vec![0usize; cols + 1];
    let mut way = vec![0usize; cols + 1];
    let mut min_reduced = vec![UNREACHED; cols + 1];
    let mut used = vec![false; cols + 1];

    for row in 1..=rows {
        owner[0] = row;
        let mut col0 = 0usize;
        min_reduced.fill(UNREACHED);
        used.fill(false);

        loop {
            used[col0] = true;
            let row0 = owner[col0];
            let mut delta = UNREACHED;
            let mut col1 = 0usize;
            for col in 1..=cols {
                if used[col] {
                    continue;
                }
                let reduced = i64::from(costs.get(row0 - 1, col - 1)) - u[row0] - v[col];
                if reduced < min_reduced[col] {
                    min_reduced[col] = reduced;
                    way[col] = col0;
                }
                if min_reduced[col] < delta {
                    delta = min_reduced[col];
                    col1 = col;
                }
            }
            if col1 == 0 {
                return Err(MatchError::invariant(format!(
                    "no free column reachable while inserting row {}",
                    row - 1
                )));
            }
            for col in 0..=cols {
                if used[col] {
                    u[owner[col]] += delta;
                    v[col] -= delta;
                } else {
                    min_reduced[col] -= delta;
                }
            }
            col0 = col1;
            if owner[col0] == 0 {
                break;
            }
        }

        loop {
            let col1 = way[col0];
            owner[col0] = owner[col1];
            col0 = col1;
            if col0 == 0 {
                break;
            }
        }
    }

    let mut columns = vec![None; rows];
    for col in 1..=cols {
        if owner[col] != 0 {
            columns[owner[col] - 1] = Some(col - 1);
        }
    }
    trace!("shortest augmenting path {rows}x{cols}: potential sum {}", -v[0]);
    Ok(Assignment::from_columns(columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::KuhnMunkres;

    fn optimal_cost(rows: Vec<Vec<i32>>) -> (i64, i64) {
        let matrix = CostMatrix::from_rows(rows).expect("matrix");
        let sap = ShortestAugmentingPath.solve(matrix.clone()).expect("sap");
        let km = KuhnMunkres.solve(matrix.clone()).expect("km");
        assert_eq!(sap.cardinality(), matrix.rows().min(matrix.cols()));
        (sap.total_cost(&matrix), km.total_cost(&matrix))
    }

    #[test]
    fn agrees_with_kuhn_munkres_on_small_cases() {
        let (sap, km) = optimal_cost(vec![vec![1, 2], vec![2, 1]]);
        assert_eq!((sap, km), (2, 2));
        let (sap, km) = optimal_cost(vec![vec![4, 1, 3], vec![2, 0, 5], vec![3, 2, 2]]);
        assert_eq!((sap, km), (5, 5));
        let (sap, km) = optimal_cost(vec![vec![1, 2, 3], vec![4, 1, 2]]);
        assert_eq!(sap, km);
    }

    #[test]
    fn tall_input_is_solved_through_the_transpose() {
        let matrix =
            CostMatrix::from_rows(vec![vec![4, 1], vec![2, 8], vec![1, 9]]).expect("matrix");
        let assignment = ShortestAugmentingPath.solve(matrix.clone()).expect("solve");
        assert_eq!(assignment.len(), 3);
        assert_eq!(assignment.columns(), &[Some(1), None, Some(0)]);
        assert_eq!(assignment.total_cost(&matrix), 2);
    }

    #[test]
    fn handles_costs_near_the_i32_limit() {
        let big = i32::MAX;
        let (sap, _) = optimal_cost(vec![vec![big, 0], vec![0, big]]);
        assert_eq!(sap, 0);
    }
}
