use std::collections::VecDeque;

use log::{trace, warn};

/// Maximum-cardinality matching. Vertices are 1-based on both sides, in
/// `add_edge` and in the pairs `compute` reports.
pub trait BipartiteMatcher {
    fn with_sizes(left: usize, right: usize) -> Self
    where
        Self: Sized;

    fn add_edge(&mut self, u: usize, v: usize);

    fn compute(&mut self, consumer: &mut dyn FnMut(usize, usize)) -> usize;
}

const UNREACHED: usize = usize::MAX;

/// Pairs are reported in increasing order of the left vertex.
#[derive(Debug, Clone)]
pub struct HopcroftKarp {
    adjacency: Vec<Vec<usize>>,
    right: usize,
    pair_left: Vec<Option<usize>>,
    pair_right: Vec<Option<usize>>,
    layer: Vec<usize>,
    // next adjacency slot to try per left vertex within one phase
    cursor: Vec<usize>,
    stack: Vec<usize>,
}

impl HopcroftKarp {
    fn bfs(&mut self) -> bool {
        let mut queue = VecDeque::new();
        for (u, pair) in self.pair_left.iter().enumerate() {
            if pair.is_none() {
                self.layer[u] = 0;
                queue.push_back(u);
            } else {
                self.layer[u] = UNREACHED;
            }
        }

        let mut reachable_free = false;
        while let Some(u) = queue.pop_front() {
            for &v in &self.adjacency[u] {
                match self.pair_right[v] {
                    None => reachable_free = true,
                    Some(w) if self.layer[w] == UNREACHED => {
                        self.layer[w] = self.layer[u] + 1;
                        queue.push_back(w);
                    }
                    Some(_) => {}
                }
            }
        }
        reachable_free
    }

    fn augment_from(&mut self, root: usize) -> bool {
        self.stack.clear();
        self.stack.push(root);
        while let Some(&u) = self.stack.last() {
            let Some(&v) = self.adjacency[u].get(self.cursor[u]) else {
                self.layer[u] = UNREACHED;
                self.stack.pop();
                continue;
            };
            self.cursor[u] += 1;
            match self.pair_right[v] {
                None => {
                    for &w in &self.stack {
                        let taken = self.adjacency[w][self.cursor[w] - 1];
                        self.pair_left[w] = Some(taken);
                        self.pair_right[taken] = Some(w);
                    }
                    return true;
                }
                Some(w) if self.layer[w] == self.layer[u] + 1 => {
                    self.stack.push(w);
                }
                Some(_) => {}
            }
        }
        false
    }
}

impl BipartiteMatcher for HopcroftKarp {
    fn with_sizes(left: usize, right: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); left],
            right,
            pair_left: vec![None; left],
            pair_right: vec![None; right],
            layer: vec![UNREACHED; left],
            cursor: vec![0; left],
            stack: Vec::new(),
        }
    }

    fn add_edge(&mut self, u: usize, v: usize) {
        if u == 0 || v == 0 || u > self.adjacency.len() || v > self.right {
            warn!(
                "ignoring edge ({u}, {v}) outside a {}x{} bipartite graph",
                self.adjacency.len(),
                self.right
            );
            return;
        }
        self.adjacency[u - 1].push(v - 1);
    }

    fn compute(&mut self, consumer: &mut dyn FnMut(usize, usize)) -> usize {
        self.pair_left.fill(None);
        self.pair_right.fill(None);

        let mut cardinality = 0;
        let mut phases = 0;
        while self.bfs() {
            phases += 1;
            self.cursor.fill(0);
            for u in 0..self.adjacency.len() {
                if self.pair_left[u].is_none() && self.augment_from(u) {
                    cardinality += 1;
                }
            }
        }
        trace!("hopcroft-karp: cardinality {cardinality} after {phases} phases");

        for (u, pair) in self.pair_left.iter().enumerate() {
            if let Some(v) = pair {
                consumer(u + 1, v + 1);
            }
        }
        cardinality
    }
}
