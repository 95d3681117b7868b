use log::trace;

use crate::assignment::{Assignment, AssignmentSolver, CostMatrix};
use crate::error::{MatchError, Result, checked_shift, checked_sub};

const UNBOUNDED: i64 = i64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZeroState {
    Normal,
    Starred,
    Primed,
}

/// Rectangular Kuhn-Munkres. Ties resolve in row-major order.
#[derive(Debug, Default, Clone, Copy)]
pub struct KuhnMunkres;

impl AssignmentSolver for KuhnMunkres {
    fn solve(&self, costs: CostMatrix) -> Result<Assignment> {
        Workspace::new(costs).run()
    }
}

// Step 5 adjustments live in row_shift/col_shift until the next augmentation.
struct Workspace {
    rows: usize,
    cols: usize,
    k: usize,
    cost: Vec<i32>,
    mask: Vec<ZeroState>,
    row_cover: Vec<bool>,
    col_cover: Vec<bool>,
    row_shift: Vec<i64>,
    col_shift: Vec<i64>,
    // smallest shifted value of each uncovered row over the uncovered columns
    row_min: Vec<i64>,
    path: Vec<(usize, usize)>,
    augmentations: usize,
    adjustments: usize,
}

impl Workspace {
    fn new(costs: CostMatrix) -> Self {
        let (rows, cols, cost) = costs.into_raw();
        Self {
            rows,
            cols,
            k: rows.min(cols),
            mask: vec![ZeroState::Normal; cost.len()],
            cost,
            row_cover: vec![false; rows],
            col_cover: vec![false; cols],
            row_shift: vec![0; rows],
            col_shift: vec![0; cols],
            row_min: vec![UNBOUNDED; rows],
            path: Vec::with_capacity(2 * rows.min(cols) + 1),
            augmentations: 0,
            adjustments: 0,
        }
    }

    fn run(mut self) -> Result<Assignment> {
        self.reduce()?;
        self.star_initial_zeros();
        while self.cover_starred_columns() < self.k {
            self.refresh_row_minima();
            let (row, col) = self.prime_until_augmentable()?;
            self.fold_shifts()?;
            self.augment(row, col)?;
        }
        trace!(
            "kuhn-munkres {}x{}: {} augmentations, {} adjustments",
            self.rows, self.cols, self.augmentations, self.adjustments
        );
        Ok(self.assignment())
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    #[inline]
    fn value(&self, row: usize, col: usize) -> i64 {
        i64::from(self.cost[self.index(row, col)]) + self.row_shift[row] - self.col_shift[col]
    }

    // Step 0: along the shorter dimension, both when square.
    fn reduce(&mut self) -> Result<()> {
        if self.rows > self.cols {
            self.reduce_columns()
        } else {
            self.reduce_rows()?;
            if self.rows == self.cols {
                self.reduce_columns()?;
            }
            Ok(())
        }
    }

    fn reduce_rows(&mut self) -> Result<()> {
        for row in 0..self.rows {
            let start = row * self.cols;
            let slice = &mut self.cost[start..start + self.cols];
            let min = slice.iter().copied().min().unwrap_or_default();
            if min != 0 {
                for cell in slice.iter_mut() {
                    *cell = checked_sub(*cell, min)?;
                }
            }
        }
        Ok(())
    }

    fn reduce_columns(&mut self) -> Result<()> {
        for col in 0..self.cols {
            let min = (0..self.rows)
                .map(|row| self.cost[self.index(row, col)])
                .min()
                .unwrap_or_default();
            if min != 0 {
                for row in 0..self.rows {
                    let idx = self.index(row, col);
                    self.cost[idx] = checked_sub(self.cost[idx], min)?;
                }
            }
        }
        Ok(())
    }

    // Step 1
    fn star_initial_zeros(&mut self) {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let idx = self.index(row, col);
                if self.cost[idx] == 0 && !self.row_cover[row] && !self.col_cover[col] {
                    self.mask[idx] = ZeroState::Starred;
                    self.row_cover[row] = true;
                    self.col_cover[col] = true;
                }
            }
        }
        self.clear_covers();
    }

    // Step 2
    fn cover_starred_columns(&mut self) -> usize {
        let mut covered = 0;
        for col in 0..self.cols {
            if self.star_in_col(col).is_some() {
                self.col_cover[col] = true;
                covered += 1;
            }
        }
        covered
    }

    fn refresh_row_minima(&mut self) {
        for row in 0..self.rows {
            let min = (0..self.cols)
                .filter(|&col| !self.col_cover[col])
                .map(|col| self.value(row, col))
                .min()
                .unwrap_or(UNBOUNDED);
            self.row_min[row] = min;
        }
    }

    // Steps 3 and 5
    fn prime_until_augmentable(&mut self) -> Result<(usize, usize)> {
        loop {
            let Some((row, col)) = self.find_uncovered_zero() else {
                self.adjust_by_minimum()?;
                continue;
            };
            let idx = self.index(row, col);
            self.mask[idx] = ZeroState::Primed;
            match self.star_in_row(row) {
                Some(star_col) => {
                    self.row_cover[row] = true;
                    self.uncover_column(star_col);
                }
                None => return Ok((row, col)),
            }
        }
    }

    fn uncover_column(&mut self, col: usize) {
        self.col_cover[col] = false;
        for row in 0..self.rows {
            if self.row_cover[row] {
                continue;
            }
            let value = self.value(row, col);
            if value < self.row_min[row] {
                self.row_min[row] = value;
            }
        }
    }

    // Step 4
    fn augment(&mut self, row: usize, col: usize) -> Result<()> {
        self.path.clear();
        self.path.push((row, col));
        let limit = 2 * self.k + 1;
        let mut col = col;
        while let Some(star_row) = self.star_in_col(col) {
            let prime_col = self.prime_in_row(star_row).ok_or_else(|| {
                MatchError::invariant(format!(
                    "row {star_row} holds a star in column {col} but no primed zero"
                ))
            })?;
            self.path.push((star_row, col));
            self.path.push((star_row, prime_col));
            if self.path.len() > limit {
                return Err(MatchError::invariant(format!(
                    "alternating sequence exceeded {limit} cells"
                )));
            }
            col = prime_col;
        }

        for step in 0..self.path.len() {
            let (r, c) = self.path[step];
            let idx = self.index(r, c);
            self.mask[idx] = match self.mask[idx] {
                ZeroState::Starred => ZeroState::Normal,
                ZeroState::Primed => ZeroState::Starred,
                ZeroState::Normal => {
                    return Err(MatchError::invariant(format!(
                        "cell ({r}, {c}) on the alternating sequence is neither starred nor primed"
                    )));
                }
            };
        }

        for state in self.mask.iter_mut() {
            if *state == ZeroState::Primed {
                *state = ZeroState::Normal;
            }
        }
        self.clear_covers();
        self.augmentations += 1;
        Ok(())
    }

    // Step 5: +h on covered rows, -h on uncovered columns.
    fn adjust_by_minimum(&mut self) -> Result<()> {
        let h = (0..self.rows)
            .filter(|&row| !self.row_cover[row])
            .map(|row| self.row_min[row])
            .min()
            .unwrap_or(UNBOUNDED);
        if h == UNBOUNDED {
            return Err(MatchError::invariant("no uncovered cell left to adjust"));
        }
        if h <= 0 {
            return Err(MatchError::invariant(format!(
                "smallest uncovered value {h} is not positive"
            )));
        }

        for row in 0..self.rows {
            if self.row_cover[row] {
                self.row_shift[row] += h;
            } else {
                self.row_min[row] -= h;
            }
        }
        for col in (0..self.cols).filter(|&col| !self.col_cover[col]) {
            self.col_shift[col] += h;
        }
        self.adjustments += 1;
        Ok(())
    }

    fn fold_shifts(&mut self) -> Result<()> {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let delta = self.row_shift[row] - self.col_shift[col];
                if delta != 0 {
                    let idx = self.index(row, col);
                    self.cost[idx] = checked_shift(self.cost[idx], delta)?;
                }
            }
        }
        self.row_shift.fill(0);
        self.col_shift.fill(0);
        Ok(())
    }

    fn find_uncovered_zero(&self) -> Option<(usize, usize)> {
        let row = (0..self.rows).find(|&row| !self.row_cover[row] && self.row_min[row] == 0)?;
        let col = (0..self.cols).find(|&col| !self.col_cover[col] && self.value(row, col) == 0)?;
        Some((row, col))
    }

    fn star_in_row(&self, row: usize) -> Option<usize> {
        (0..self.cols).find(|&col| self.mask[self.index(row, col)] == ZeroState::Starred)
    }

    fn star_in_col(&self, col: usize) -> Option<usize> {
        (0..self.rows).find(|&row| self.mask[self.index(row, col)] == ZeroState::Starred)
    }

    fn prime_in_row(&self, row: usize) -> Option<usize> {
        (0..self.cols).find(|&col| self.mask[self.index(row, col)] == ZeroState::Primed)
    }

    fn clear_covers(&mut self) {
        self.row_cover.fill(false);
        self.col_cover.fill(false);
    }

    fn assignment(&self) -> Assignment {
        Assignment::from_columns((0..self.rows).map(|row| self.star_in_row(row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve_rows(rows: Vec<Vec<i32>>) -> Result<(Assignment, i64)> {
        let matrix = CostMatrix::from_rows(rows)?;
        let assignment = KuhnMunkres.solve(matrix.clone())?;
        let total = assignment.total_cost(&matrix);
        Ok((assignment, total))
    }

    #[test]
    fn diagonal_is_optimal_for_two_by_two() {
        let (assignment, total) = solve_rows(vec![vec![1, 2], vec![2, 1]]).expect("solve");
        assert_eq!(assignment.columns(), &[Some(0), Some(1)]);
        assert_eq!(total, 2);
    }

    #[test]
    fn wide_matrix_assigns_every_row() {
        let (assignment, total) =
            solve_rows(vec![vec![1, 2, 3], vec![4, 1, 2]]).expect("solve");
        assert_eq!(assignment.len(), 2);
        assert_eq!(assignment.cardinality(), 2);
        assert_eq!(assignment.columns(), &[Some(0), Some(1)]);
        assert_eq!(total, 2);
    }

    #[test]
    fn tall_matrix_leaves_extra_rows_unassigned() {
        let (assignment, total) =
            solve_rows(vec![vec![4, 1], vec![2, 8], vec![1, 9]]).expect("solve");
        assert_eq!(assignment.cardinality(), 2);
        assert_eq!(assignment.columns(), &[Some(1), None, Some(0)]);
        assert_eq!(total, 2);
    }

    #[test]
    fn classic_three_by_three() {
        let (assignment, total) =
            solve_rows(vec![vec![4, 1, 3], vec![2, 0, 5], vec![3, 2, 2]]).expect("solve");
        assert_eq!(total, 5);
        assert_eq!(assignment.cardinality(), 3);
    }

    #[test]
    fn single_cell() {
        let (assignment, total) = solve_rows(vec![vec![7]]).expect("solve");
        assert_eq!(assignment.columns(), &[Some(0)]);
        assert_eq!(total, 7);
    }

    #[test]
    fn identical_costs_resolve_row_major() {
        let (assignment, _) = solve_rows(vec![vec![3, 3, 3], vec![3, 3, 3]]).expect("solve");
        assert_eq!(assignment.columns(), &[Some(0), Some(1)]);
    }

    #[test]
    fn large_matrices_agree_with_shortest_path() {
        use crate::assignment::ShortestAugmentingPath;
        use rand::{Rng, SeedableRng};
        use rand_xoshiro::Xoshiro256PlusPlus;

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        for (rows, cols) in [(150, 150), (90, 160), (160, 70)] {
            let data = (0..rows * cols).map(|_| rng.gen_range(0..=1 << 16)).collect();
            let matrix = CostMatrix::new(rows, cols, data).expect("matrix");
            let km = KuhnMunkres.solve(matrix.clone()).expect("km");
            let sap = ShortestAugmentingPath.solve(matrix.clone()).expect("sap");
            assert_eq!(km.cardinality(), rows.min(cols));
            assert_eq!(km.total_cost(&matrix), sap.total_cost(&matrix));
        }
    }

    #[test]
    fn adjustments_stay_within_one_per_prime() {
        let matrix = CostMatrix::from_rows(vec![
            vec![9, 2, 7, 8],
            vec![6, 4, 3, 7],
            vec![5, 8, 1, 8],
            vec![7, 6, 9, 4],
        ])
        .expect("matrix");
        let mut workspace = Workspace::new(matrix.clone());
        workspace.reduce().expect("reduce");
        workspace.star_initial_zeros();
        let mut phases = 0;
        while workspace.cover_starred_columns() < workspace.k {
            workspace.refresh_row_minima();
            let (row, col) = workspace.prime_until_augmentable().expect("prime");
            workspace.fold_shifts().expect("fold");
            workspace.augment(row, col).expect("augment");
            phases += 1;
        }
        assert!(workspace.adjustments <= phases * (workspace.k + 1));
        assert!(workspace.row_shift.iter().chain(&workspace.col_shift).all(|&s| s == 0));
        assert_eq!(workspace.assignment().total_cost(&matrix), 13);
    }

    #[test]
    fn overflow_in_adjustment_is_reported() {
        let big = i32::MAX - 3;
        let err = solve_rows(vec![
            vec![0, big, 1, 9],
            vec![9, 0, 9, 9],
            vec![9, 0, 9, 9],
        ])
        .expect_err("doubly covered cell must overflow");
        assert!(matches!(err, MatchError::ArithmeticOverflow { op: "+", .. }));
    }
}
