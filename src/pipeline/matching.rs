use std::marker::PhantomData;
use std::time::Instant;

use indexmap::IndexMap;
use log::{debug, trace, warn};
use rayon::prelude::*;

use crate::assignment::{AssignmentSolver, KuhnMunkres};
use crate::error::{MatchError, Result};
use crate::graph::{
    BipartiteMatcher, ConnectedComponents, HopcroftKarp, Subgraph, SubgraphExtractor,
};
use crate::pipeline::config::MatchingConfig;
use crate::pipeline::consumer::MatchConsumer;
use crate::quantize::{Quantizer, WeightedEdge};

// (b index, distance), ascending by b index
type CandidateList = Vec<(usize, f64)>;

pub struct MatchingOrchestrator<S = KuhnMunkres, X = ConnectedComponents, M = HopcroftKarp> {
    config: MatchingConfig,
    solver: S,
    extractor: X,
    matcher: PhantomData<fn() -> M>,
}

impl Default for MatchingOrchestrator {
    fn default() -> Self {
        Self::new(MatchingConfig::default())
    }
}

impl MatchingOrchestrator {
    pub fn new(config: MatchingConfig) -> Self {
        Self {
            config,
            solver: KuhnMunkres,
            extractor: ConnectedComponents,
            matcher: PhantomData,
        }
    }
}

impl<S, X, M> MatchingOrchestrator<S, X, M> {
    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn with_solver<S2>(self, solver: S2) -> MatchingOrchestrator<S2, X, M> {
        MatchingOrchestrator {
            config: self.config,
            solver,
            extractor: self.extractor,
            matcher: PhantomData,
        }
    }

    pub fn with_extractor<X2>(self, extractor: X2) -> MatchingOrchestrator<S, X2, M> {
        MatchingOrchestrator {
            config: self.config,
            solver: self.solver,
            extractor,
            matcher: PhantomData,
        }
    }

    pub fn with_matcher<M2>(self) -> MatchingOrchestrator<S, X, M2> {
        MatchingOrchestrator {
            config: self.config,
            solver: self.solver,
            extractor: self.extractor,
            matcher: PhantomData,
        }
    }
}

impl<S, X, M> MatchingOrchestrator<S, X, M>
where
    S: AssignmentSolver + Sync,
    X: SubgraphExtractor,
    M: BipartiteMatcher,
{
    pub fn maximum_cardinality<A, B, E, C>(
        &self,
        a: &[A],
        b: &[B],
        edge: E,
        consumer: &mut C,
    ) -> usize
    where
        E: Fn(&A, &B) -> bool,
        C: MatchConsumer<A, B> + ?Sized,
    {
        let mut matched_a = vec![false; a.len()];
        let mut matched_b = vec![false; b.len()];
        if a.is_empty() || b.is_empty() {
            deliver_unmatched(a, b, &matched_a, &matched_b, consumer);
            return 0;
        }

        let mut matcher = M::with_sizes(a.len(), b.len());
        let mut edges = 0usize;
        for (i, left) in a.iter().enumerate() {
            for (j, right) in b.iter().enumerate() {
                if edge(left, right) {
                    matcher.add_edge(i + 1, j + 1);
                    edges += 1;
                }
            }
        }

        let cardinality = matcher.compute(&mut |u: usize, v: usize| {
            let (Some(i), Some(j)) = (u.checked_sub(1), v.checked_sub(1)) else {
                warn!("matcher reported a zero index pair ({u}, {v})");
                return;
            };
            if i >= a.len() || j >= b.len() || matched_a[i] || matched_b[j] {
                warn!("matcher reported an invalid or repeated pair ({u}, {v})");
                return;
            }
            matched_a[i] = true;
            matched_b[j] = true;
            consumer.matched(&a[i], &b[j]);
        });
        debug!(
            "maximum cardinality: {edges} edges over {}x{}, cardinality {cardinality}",
            a.len(),
            b.len()
        );

        deliver_unmatched(a, b, &matched_a, &matched_b, consumer);
        cardinality
    }

    /// Greedy, shortest pair first. An approximation: neither maximum
    /// cardinality nor minimum total distance.
    pub fn nearest_neighbour<A, B, D, C>(
        &self,
        a: &[A],
        b: &[B],
        dist: D,
        threshold: f64,
        consumer: &mut C,
    ) -> Result<usize>
    where
        D: Fn(&A, &B) -> f64,
        C: MatchConsumer<A, B> + ?Sized,
    {
        validate_threshold(threshold)?;
        let mut matched_a = vec![false; a.len()];
        let mut matched_b = vec![false; b.len()];

        let mut candidates = Vec::new();
        for (i, left) in a.iter().enumerate() {
            for (j, right) in b.iter().enumerate() {
                let distance = dist(left, right);
                if distance <= threshold {
                    candidates.push((i, j, distance));
                }
            }
        }

        let limit = a.len().min(b.len());
        let mut count = 0;
        match candidates.len() {
            0 => {}
            1 => {
                let (i, j, _) = candidates[0];
                matched_a[i] = true;
                matched_b[j] = true;
                consumer.matched(&a[i], &b[j]);
                count = 1;
            }
            _ => {
                candidates.sort_by(|l, r| l.2.total_cmp(&r.2));
                for &(i, j, _) in &candidates {
                    if matched_a[i] || matched_b[j] {
                        continue;
                    }
                    matched_a[i] = true;
                    matched_b[j] = true;
                    consumer.matched(&a[i], &b[j]);
                    count += 1;
                    if count == limit {
                        break;
                    }
                }
            }
        }
        debug!(
            "nearest neighbour: {} candidates over {}x{}, matched {count}",
            candidates.len(),
            a.len(),
            b.len()
        );

        deliver_unmatched(a, b, &matched_a, &matched_b, consumer);
        Ok(count)
    }

    /// Smallest total distance per connected sub-graph. Cardinality is not
    /// guaranteed to be maximal.
    pub fn minimum_distance<A, B, D, C>(
        &self,
        a: &[A],
        b: &[B],
        dist: D,
        threshold: f64,
        consumer: &mut C,
    ) -> Result<usize>
    where
        D: Fn(&A, &B) -> f64,
        C: MatchConsumer<A, B> + ?Sized,
    {
        validate_threshold(threshold)?;
        let quantizer = self.config.quantizer()?;
        let start = Instant::now();
        let mut matched_a = vec![false; a.len()];
        let mut matched_b = vec![false; b.len()];

        let mut rows: IndexMap<usize, CandidateList> = IndexMap::new();
        let mut observed_b = vec![false; b.len()];
        for (i, left) in a.iter().enumerate() {
            let candidates: CandidateList = b
                .iter()
                .enumerate()
                .filter_map(|(j, right)| {
                    let distance = dist(left, right);
                    (distance <= threshold).then_some((j, distance))
                })
                .collect();
            if candidates.is_empty() {
                continue;
            }
            for &(j, _) in &candidates {
                observed_b[j] = true;
            }
            rows.insert(i, candidates);
        }

        if rows.is_empty() {
            debug!(
                "minimum distance: no candidate edges over {}x{}",
                a.len(),
                b.len()
            );
            deliver_unmatched(a, b, &matched_a, &matched_b, consumer);
            return Ok(0);
        }

        let mut compact_b = vec![None; b.len()];
        let mut original_b = Vec::new();
        for (j, _) in observed_b.iter().enumerate().filter(|(_, seen)| **seen) {
            compact_b[j] = Some(original_b.len());
            original_b.push(j);
        }

        let mut edges = Vec::new();
        for (row, candidates) in rows.values().enumerate() {
            for &(j, _) in candidates {
                if let Some(col) = compact_b[j] {
                    edges.push((row, col));
                }
            }
        }

        let components = self
            .extractor
            .extract_edges(rows.len(), original_b.len(), &edges);
        debug!(
            "minimum distance: {} edges over {}x{} observed, {} components",
            edges.len(),
            rows.len(),
            original_b.len(),
            components.len()
        );

        let solver = &self.solver;
        let problem = ComponentProblem {
            rows: &rows,
            compact_b: &compact_b,
            quantizer,
            threshold,
        };
        let solved: Vec<Vec<(usize, usize)>> = if self.config.parallel_components {
            components
                .par_iter()
                .map(|component| problem.solve(solver, component))
                .collect::<Result<_>>()?
        } else {
            components
                .iter()
                .map(|component| problem.solve(solver, component))
                .collect::<Result<_>>()?
        };

        let mut assignment: Vec<Option<usize>> = vec![None; rows.len()];
        let mut taken = vec![false; original_b.len()];
        for (row, col) in solved.into_iter().flatten() {
            if assignment[row].is_some() || taken[col] {
                return Err(MatchError::invariant(format!(
                    "compacted pair ({row}, {col}) overlaps another sub-graph"
                )));
            }
            assignment[row] = Some(col);
            taken[col] = true;
        }

        let mut count = 0;
        for (row, col) in assignment.iter().enumerate() {
            let Some(col) = *col else { continue };
            let Some((&i, candidates)) = rows.get_index(row) else {
                continue;
            };
            let j = original_b[col];
            if candidates.binary_search_by_key(&j, |&(b_idx, _)| b_idx).is_err() {
                warn!("dropping solver pair ({i}, {j}): not a recorded edge");
                continue;
            }
            matched_a[i] = true;
            matched_b[j] = true;
            consumer.matched(&a[i], &b[j]);
            count += 1;
        }
        debug!(
            "minimum distance: matched {count} in {:.3} ms",
            start.elapsed().as_secs_f64() * 1e3
        );

        deliver_unmatched(a, b, &matched_a, &matched_b, consumer);
        Ok(count)
    }
}

struct ComponentProblem<'a> {
    rows: &'a IndexMap<usize, CandidateList>,
    compact_b: &'a [Option<usize>],
    quantizer: Quantizer,
    threshold: f64,
}

impl ComponentProblem<'_> {
    fn solve<S: AssignmentSolver>(
        &self,
        solver: &S,
        component: &Subgraph,
    ) -> Result<Vec<(usize, usize)>> {
        let mut local_edges = Vec::new();
        for (local_row, &row) in component.left.iter().enumerate() {
            let (_, candidates) = self.rows.get_index(row).ok_or_else(|| {
                MatchError::invariant(format!("sub-graph row {row} is out of range"))
            })?;
            for &(j, distance) in candidates {
                let col = self.compact_b[j].ok_or_else(|| {
                    MatchError::invariant(format!("candidate column {j} was never observed"))
                })?;
                let local_col = component.right.binary_search(&col).map_err(|_| {
                    MatchError::invariant(format!(
                        "edge ({row}, {col}) crosses sub-graph boundaries"
                    ))
                })?;
                local_edges.push(WeightedEdge::new(local_row, local_col, distance));
            }
        }

        let quantized = self.quantizer.quantize(
            component.left.len(),
            component.right.len(),
            &local_edges,
            self.threshold,
        )?;
        let assignment = solver.solve(quantized.matrix)?;
        trace!(
            "sub-graph {}x{}: {} edges, {} assigned",
            component.left.len(),
            component.right.len(),
            local_edges.len(),
            assignment.cardinality()
        );

        Ok(assignment
            .pairs()
            .map(|(local_row, local_col)| {
                (component.left[local_row], component.right[local_col])
            })
            .collect())
    }
}

fn validate_threshold(threshold: f64) -> Result<()> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(MatchError::invalid(format!(
            "distance threshold must be finite and non-negative, got {threshold}"
        )));
    }
    Ok(())
}

fn deliver_unmatched<A, B, C>(
    a: &[A],
    b: &[B],
    matched_a: &[bool],
    matched_b: &[bool],
    consumer: &mut C,
) where
    C: MatchConsumer<A, B> + ?Sized,
{
    for (item, _) in a.iter().zip(matched_a).filter(|(_, matched)| !**matched) {
        consumer.unmatched_a(item);
    }
    for (item, _) in b.iter().zip(matched_b).filter(|(_, matched)| !**matched) {
        consumer.unmatched_b(item);
    }
}

pub fn maximum_cardinality<A, B, E, C>(a: &[A], b: &[B], edge: E, consumer: &mut C) -> usize
where
    E: Fn(&A, &B) -> bool,
    C: MatchConsumer<A, B> + ?Sized,
{
    MatchingOrchestrator::new(MatchingConfig::default()).maximum_cardinality(a, b, edge, consumer)
}

pub fn nearest_neighbour<A, B, D, C>(
    a: &[A],
    b: &[B],
    dist: D,
    threshold: f64,
    consumer: &mut C,
) -> Result<usize>
where
    D: Fn(&A, &B) -> f64,
    C: MatchConsumer<A, B> + ?Sized,
{
    MatchingOrchestrator::new(MatchingConfig::default())
        .nearest_neighbour(a, b, dist, threshold, consumer)
}

pub fn minimum_distance<A, B, D, C>(
    a: &[A],
    b: &[B],
    dist: D,
    threshold: f64,
    consumer: &mut C,
) -> Result<usize>
where
    D: Fn(&A, &B) -> f64,
    C: MatchConsumer<A, B> + ?Sized,
{
    MatchingOrchestrator::new(MatchingConfig::default())
        .minimum_distance(a, b, dist, threshold, consumer)
}
