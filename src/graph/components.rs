use indexmap::IndexMap;
use log::trace;
use petgraph::unionfind::UnionFind;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subgraph {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
}

impl Subgraph {
    pub fn len(&self) -> usize {
        self.left.len() + self.right.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// Vertices without edges are left out of every component.
pub trait SubgraphExtractor {
    fn extract(
        &self,
        left: usize,
        right: usize,
        connected: &dyn Fn(usize, usize) -> bool,
    ) -> Vec<Subgraph>;

    fn extract_edges(
        &self,
        left: usize,
        right: usize,
        edges: &[(usize, usize)],
    ) -> Vec<Subgraph> {
        let mut adjacency = vec![Vec::new(); left];
        for &(u, v) in edges {
            if u < left && v < right {
                adjacency[u].push(v);
            }
        }
        for row in adjacency.iter_mut() {
            row.sort_unstable();
        }
        self.extract(left, right, &|u: usize, v: usize| adjacency[u].binary_search(&v).is_ok())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConnectedComponents;

impl ConnectedComponents {
    fn collect(
        left: usize,
        right: usize,
        sets: &mut UnionFind<usize>,
        linked: &[bool],
    ) -> Vec<Subgraph> {
        let mut groups: IndexMap<usize, Subgraph> = IndexMap::new();
        for u in (0..left).filter(|&u| linked[u]) {
            groups.entry(sets.find_mut(u)).or_default().left.push(u);
        }
        for v in (0..right).filter(|&v| linked[left + v]) {
            groups.entry(sets.find_mut(left + v)).or_default().right.push(v);
        }
        trace!("{} components over {left}x{right} vertices", groups.len());
        groups.into_values().collect()
    }
}

impl SubgraphExtractor for ConnectedComponents {
    fn extract(
        &self,
        left: usize,
        right: usize,
        connected: &dyn Fn(usize, usize) -> bool,
    ) -> Vec<Subgraph> {
        let mut sets = UnionFind::new(left + right);
        let mut linked = vec![false; left + right];
        for u in 0..left {
            for v in 0..right {
                if connected(u, v) {
                    sets.union(u, left + v);
                    linked[u] = true;
                    linked[left + v] = true;
                }
            }
        }
        Self::collect(left, right, &mut sets, &linked)
    }

    fn extract_edges(
        &self,
        left: usize,
        right: usize,
        edges: &[(usize, usize)],
    ) -> Vec<Subgraph> {
        let mut sets = UnionFind::new(left + right);
        let mut linked = vec![false; left + right];
        for &(u, v) in edges {
            if u < left && v < right {
                sets.union(u, left + v);
                linked[u] = true;
                linked[left + v] = true;
            }
        }
        Self::collect(left, right, &mut sets, &linked)
    }
}
