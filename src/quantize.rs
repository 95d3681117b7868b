use log::trace;

use crate::assignment::CostMatrix;
use crate::error::{MatchError, Result};

pub const DEFAULT_MAX_COST: i32 = 1 << 16;

pub const SENTINEL_CEILING: i32 = 1 << 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedEdge {
    pub row: usize,
    pub col: usize,
    pub distance: f64,
}

impl WeightedEdge {
    pub fn new(row: usize, col: usize, distance: f64) -> Self {
        Self { row, col, distance }
    }
}

#[derive(Debug, Clone)]
pub struct QuantizedCosts {
    pub matrix: CostMatrix,
    pub sentinel: i32,
    pub min: f64,
    pub max: f64,
}

impl QuantizedCosts {
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Quantizer {
    max_cost: i32,
}

impl Default for Quantizer {
    fn default() -> Self {
        Self {
            max_cost: DEFAULT_MAX_COST,
        }
    }
}

impl Quantizer {
    pub fn new(max_cost: i32) -> Result<Self> {
        if max_cost <= 0 || max_cost > SENTINEL_CEILING {
            return Err(MatchError::invalid(format!(
                "max cost must lie in 1..={SENTINEL_CEILING}, got {max_cost}"
            )));
        }
        Ok(Self { max_cost })
    }

    pub fn max_cost(&self) -> i32 {
        self.max_cost
    }

    pub fn quantize(
        &self,
        rows: usize,
        cols: usize,
        edges: &[WeightedEdge],
        threshold: f64,
    ) -> Result<QuantizedCosts> {
        if !threshold.is_finite() {
            return Err(MatchError::invalid(format!(
                "distance threshold must be finite, got {threshold}"
            )));
        }
        if edges.is_empty() {
            return Err(MatchError::invalid("sub-graph has no observed edges"));
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for edge in edges {
            if edge.row >= rows || edge.col >= cols {
                return Err(MatchError::invalid(format!(
                    "edge ({}, {}) lies outside a {rows}x{cols} sub-graph",
                    edge.row, edge.col
                )));
            }
            if edge.distance.is_nan() || edge.distance > threshold {
                return Err(MatchError::invalid(format!(
                    "edge ({}, {}) distance {} exceeds threshold {threshold}",
                    edge.row, edge.col, edge.distance
                )));
            }
            min = min.min(edge.distance);
            max = max.max(edge.distance);
        }
        let range = max - min;
        if !range.is_finite() {
            return Err(MatchError::invalid(format!(
                "distance range [{min}, {max}] is not finite"
            )));
        }

        let sentinel = sentinel_cost(self.max_cost, rows.min(cols));
        let mut matrix = CostMatrix::filled(rows, cols, sentinel)?;
        for edge in edges {
            let cost = if range == 0.0 {
                0
            } else {
                self.scale(edge.distance, min, range)
            };
            let current = matrix.get(edge.row, edge.col);
            matrix.set(edge.row, edge.col, cost.min(current))?;
        }
        trace!(
            "quantized {} edges into {rows}x{cols}: range [{min}, {max}], sentinel {sentinel}",
            edges.len()
        );

        Ok(QuantizedCosts {
            matrix,
            sentinel,
            min,
            max,
        })
    }

    fn scale(&self, distance: f64, min: f64, range: f64) -> i32 {
        let max_cost = f64::from(self.max_cost);
        let scaled = (max_cost * (distance - min) / range).round();
        scaled.clamp(0.0, max_cost) as i32
    }
}

// n real edges cost at most max_cost * n, so below the ceiling a non-edge
// never beats a real edge.
pub fn sentinel_cost(max_cost: i32, n: usize) -> i32 {
    let n = i64::try_from(n).unwrap_or(i64::MAX);
    let bound = i64::from(max_cost)
        .saturating_mul(n)
        .saturating_add(1)
        .min(i64::from(SENTINEL_CEILING));
    bound as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances_scale_onto_the_cost_range() {
        let edges = [
            WeightedEdge::new(0, 0, 1.0),
            WeightedEdge::new(0, 1, 3.0),
            WeightedEdge::new(1, 1, 2.0),
        ];
        let quantized = Quantizer::default()
            .quantize(2, 2, &edges, 5.0)
            .expect("quantize");
        let matrix = &quantized.matrix;
        assert_eq!(matrix.get(0, 0), 0);
        assert_eq!(matrix.get(0, 1), DEFAULT_MAX_COST);
        assert_eq!(matrix.get(1, 1), DEFAULT_MAX_COST / 2);
        assert_eq!(matrix.get(1, 0), quantized.sentinel);
        assert_eq!(quantized.sentinel, DEFAULT_MAX_COST * 2 + 1);
        assert!(!quantized.is_degenerate());
    }

    #[test]
    fn equal_distances_cost_nothing() {
        let edges = [WeightedEdge::new(0, 0, 0.5), WeightedEdge::new(1, 0, 0.5)];
        let quantized = Quantizer::default()
            .quantize(2, 1, &edges, 1.0)
            .expect("quantize");
        assert!(quantized.is_degenerate());
        assert_eq!(quantized.matrix.get(0, 0), 0);
        assert_eq!(quantized.matrix.get(1, 0), 0);
    }

    #[test]
    fn sentinel_is_capped() {
        assert_eq!(sentinel_cost(DEFAULT_MAX_COST, 1), DEFAULT_MAX_COST + 1);
        assert_eq!(sentinel_cost(DEFAULT_MAX_COST, 16_384), SENTINEL_CEILING);
        assert_eq!(sentinel_cost(DEFAULT_MAX_COST, usize::MAX), SENTINEL_CEILING);
    }

    #[test]
    fn rejects_non_finite_threshold_and_range() {
        let edges = [WeightedEdge::new(0, 0, 1.0)];
        assert!(matches!(
            Quantizer::default().quantize(1, 1, &edges, f64::INFINITY),
            Err(MatchError::InvalidArgument(_))
        ));
        assert!(matches!(
            Quantizer::default().quantize(1, 1, &edges, f64::NAN),
            Err(MatchError::InvalidArgument(_))
        ));
        let spread = [
            WeightedEdge::new(0, 0, f64::NEG_INFINITY),
            WeightedEdge::new(0, 1, 1.0),
        ];
        assert!(matches!(
            Quantizer::default().quantize(1, 2, &spread, 2.0),
            Err(MatchError::InvalidArgument(_))
        ));
        let extreme = [
            WeightedEdge::new(0, 0, -f64::MAX),
            WeightedEdge::new(0, 1, f64::MAX),
        ];
        assert!(matches!(
            Quantizer::default().quantize(1, 2, &extreme, f64::MAX),
            Err(MatchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_configuration() {
        assert!(Quantizer::new(0).is_err());
        assert!(Quantizer::new(SENTINEL_CEILING + 1).is_err());
        assert_eq!(Quantizer::new(100).expect("quantizer").max_cost(), 100);
    }
}
