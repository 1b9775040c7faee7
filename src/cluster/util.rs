use crate::error::{Error, Result};

#[derive(Clone, Debug)]
pub(crate) struct UnionFind {
    pub(crate) parent: Vec<usize>,
    pub(crate) size: Vec<usize>,
}

impl UnionFind {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    pub(crate) fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    pub(crate) fn union_roots(&mut self, ra: usize, rb: usize) -> usize {
        if ra == rb {
            return ra;
        }

        // Union by size.
        let (mut big, mut small) = (ra, rb);
        if self.size[big] < self.size[small] {
            std::mem::swap(&mut big, &mut small);
        }

        self.parent[small] = big;
        self.size[big] += self.size[small];
        big
    }
}

/// Check that `data` is non-empty, has at least one column, and is rectangular.
///
/// Returns the shared dimensionality.
pub(crate) fn validate_points(data: &[Vec<f32>]) -> Result<usize> {
    let first = data.first().ok_or(Error::EmptyInput)?;
    let d = first.len();
    if d == 0 {
        return Err(Error::invalid("dimension", "must be at least 1"));
    }
    for point in data.iter().skip(1) {
        if point.len() != d {
            return Err(Error::DimensionMismatch {
                expected: d,
                found: point.len(),
            });
        }
    }
    if data.iter().flatten().any(|x| !x.is_finite()) {
        return Err(Error::invalid("data", "contains non-finite values"));
    }
    Ok(d)
}

/// Scale `v` to unit L2 norm. Zero vectors are left untouched.
pub(crate) fn normalize_in_place(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Compute an MST for a dense complete graph using Prim's algorithm.
///
/// `dist_fn(i, j)` returns the edge weight between points `i` and `j`.
/// Returns edges `(u, v, dist)` in the order vertices joined the tree.
pub(crate) fn prim_mst(n: usize, dist_fn: impl Fn(usize, usize) -> f64) -> Vec<(usize, usize, f64)> {
    if n <= 1 {
        return Vec::new();
    }

    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut parent = vec![usize::MAX; n];
    let mut order = Vec::with_capacity(n);

    best[0] = 0.0;

    for _ in 0..n {
        let mut u = usize::MAX;
        let mut best_val = f64::INFINITY;
        for i in 0..n {
            if !in_tree[i] && (u == usize::MAX || best[i] < best_val) {
                best_val = best[i];
                u = i;
            }
        }

        if u == usize::MAX {
            break;
        }
        in_tree[u] = true;
        order.push(u);

        for v in 0..n {
            if in_tree[v] {
                continue;
            }
            let d = dist_fn(u, v);
            if d < best[v] {
                best[v] = d;
                parent[v] = u;
            }
        }
    }

    order
        .into_iter()
        .skip(1)
        .filter(|&v| parent[v] != usize::MAX)
        .map(|v| (parent[v], v, best[v]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_find_merges_by_size() {
        let mut uf = UnionFind::new(4);
        let r = uf.union_roots(0, 1);
        let r2 = uf.union_roots(r, 2);
        assert_eq!(uf.size[r2], 3);
        assert_eq!(uf.find(2), uf.find(0));
        assert_ne!(uf.find(3), uf.find(0));
    }

    #[test]
    fn prim_mst_on_a_line() {
        let xs = [0.0, 1.0, 3.0, 6.0];
        let mst = prim_mst(xs.len(), |i, j| f64::abs(xs[i] - xs[j]));
        let total: f64 = mst.iter().map(|e| e.2).sum();
        assert_eq!(mst.len(), 3);
        assert!((total - 6.0).abs() < 1e-12);
    }

    #[test]
    fn validate_rejects_ragged_rows() {
        let data = vec![vec![0.0, 0.0], vec![1.0]];
        assert!(matches!(
            validate_points(&data),
            Err(Error::DimensionMismatch { expected: 2, found: 1 })
        ));
        assert!(matches!(validate_points(&[]), Err(Error::EmptyInput)));
    }

    #[test]
    fn normalize_leaves_zero_vector() {
        let mut zero = vec![0.0f32; 3];
        normalize_in_place(&mut zero);
        assert_eq!(zero, vec![0.0; 3]);

        let mut v = vec![3.0f32, 4.0];
        normalize_in_place(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
    }
}
