//! HDBSCAN: Hierarchical Density-Based Spatial Clustering of Applications with Noise.
//!
//! HDBSCAN (Campello, Moulavi, Sander 2013) extends DBSCAN by removing the global
//! epsilon parameter and instead building a hierarchy of density-based clusters.
//! It selects the most stable clusters from the hierarchy automatically.
//!
//! # Algorithm Outline
//!
//! 1. **Core distance**: For each point, compute the distance to its
//!    `(min_samples - 1)`-th nearest other point. This estimates local density.
//!
//! 2. **Mutual reachability distance**: For each pair (i, j):
//!    `mrd(i, j) = max(core_dist[i], core_dist[j], dist(i, j))`.
//!
//! 3. **MST on mutual reachability graph**: Prim's algorithm (O(n^2)). The tree is
//!    kept on the result because the relative validity index is computed from it.
//!
//! 4. **Single-linkage tree, then condensed tree**: Walk the dendrogram top-down.
//!    A split where both sides have at least `min_cluster_size` points creates two
//!    child clusters; otherwise the small side's points "fall out" of the parent.
//!
//! 5. **Cluster selection**: excess of mass (most stable non-overlapping set) or
//!    leaf (finest clusters), then an optional epsilon merge that replaces clusters
//!    born below `cluster_selection_epsilon` with their nearest coarser ancestor.
//!
//! 6. **Per-point outputs**: labels, membership probabilities, GLOSH outlier
//!    scores, and per-cluster persistence.
//!
//! # References
//!
//! Campello, R. J. G. B., Moulavi, D., Sander, J. (2013). "Density-Based Clustering
//! Based on Hierarchical Density Estimates." PAKDD 2013.
//!
//! Moulavi, D. et al. (2014). "Density-Based Clustering Validation." SDM 2014.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::distance::DistanceMetric;
use super::result::{ClusteringResult, NOISE_LABEL};
use super::traits::DensityClusterer;
use super::util::{self, UnionFind};
use crate::error::{Error, Result};

/// Lambda assigned to zero-length merges so stabilities stay finite.
const MAX_LAMBDA: f64 = 1e12;

/// Strategy for picking flat clusters out of the condensed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterSelectionMethod {
    /// Excess of mass: the most stable set of non-overlapping clusters.
    #[default]
    Eom,
    /// Leaf: the leaves of the condensed cluster tree.
    Leaf,
}

impl ClusterSelectionMethod {
    /// Name as it appears in logs and exported tables.
    pub fn as_str(self) -> &'static str {
        match self {
            ClusterSelectionMethod::Eom => "eom",
            ClusterSelectionMethod::Leaf => "leaf",
        }
    }
}

impl fmt::Display for ClusterSelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusterSelectionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eom" | "excess_of_mass" => Ok(ClusterSelectionMethod::Eom),
            "leaf" => Ok(ClusterSelectionMethod::Leaf),
            other => Err(Error::invalid(
                "cluster_selection_method",
                format!("expected \"eom\" or \"leaf\", got {other:?}"),
            )),
        }
    }
}

/// HDBSCAN clustering algorithm.
#[derive(Debug, Clone)]
pub struct Hdbscan {
    min_cluster_size: usize,
    min_samples: Option<usize>,
    cluster_selection_epsilon: f64,
    cluster_selection_method: ClusterSelectionMethod,
    metric: DistanceMetric,
    allow_single_cluster: bool,
}

impl Hdbscan {
    /// Create a new HDBSCAN clusterer with the given minimum cluster size.
    ///
    /// `min_samples` defaults to `min_cluster_size`.
    pub fn new(min_cluster_size: usize) -> Self {
        Self {
            min_cluster_size,
            ..Self::default()
        }
    }

    /// Set `min_samples` (neighborhood size for the core distance).
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = Some(min_samples);
        self
    }

    /// Set `min_cluster_size` (minimum points for a cluster to persist).
    pub fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.min_cluster_size = min_cluster_size;
        self
    }

    /// Set the distance below which clusters are merged into their parent.
    pub fn with_cluster_selection_epsilon(mut self, epsilon: f64) -> Self {
        self.cluster_selection_epsilon = epsilon;
        self
    }

    /// Set the flat cluster selection strategy.
    pub fn with_cluster_selection_method(mut self, method: ClusterSelectionMethod) -> Self {
        self.cluster_selection_method = method;
        self
    }

    /// Set the distance metric used on the input points.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Allow the root of the hierarchy to be returned as the only cluster.
    pub fn with_allow_single_cluster(mut self, allow: bool) -> Self {
        self.allow_single_cluster = allow;
        self
    }

    fn min_samples(&self) -> usize {
        self.min_samples.unwrap_or(self.min_cluster_size)
    }

    fn validate(&self) -> Result<()> {
        if self.min_cluster_size < 2 {
            return Err(Error::invalid("min_cluster_size", "must be at least 2"));
        }
        if self.min_samples() == 0 {
            return Err(Error::invalid("min_samples", "must be at least 1"));
        }
        if !self.cluster_selection_epsilon.is_finite() || self.cluster_selection_epsilon < 0.0 {
            return Err(Error::invalid(
                "cluster_selection_epsilon",
                "must be finite and non-negative",
            ));
        }
        Ok(())
    }

    fn select_clusters(&self, tree: &CondensedTree, stability: &[f64]) -> Vec<bool> {
        let k = tree.n_clusters();
        let mut selected = vec![false; k];

        match self.cluster_selection_method {
            ClusterSelectionMethod::Eom => {
                // The root only competes when a single cluster is allowed.
                let first = usize::from(!self.allow_single_cluster);
                let mut subtree = stability.to_vec();
                for flag in selected.iter_mut().skip(first) {
                    *flag = true;
                }
                // Children always have larger indices than their parents.
                for c in (first..k).rev() {
                    let child_sum: f64 = tree.children[c].iter().map(|&ch| subtree[ch]).sum();
                    if child_sum > subtree[c] {
                        selected[c] = false;
                        subtree[c] = child_sum;
                    } else {
                        for d in tree.descendants(c) {
                            selected[d] = false;
                        }
                    }
                }
            }
            ClusterSelectionMethod::Leaf => {
                let leaves: Vec<usize> = (1..k).filter(|&c| tree.children[c].is_empty()).collect();
                if leaves.is_empty() {
                    selected[0] = true;
                } else {
                    for c in leaves {
                        selected[c] = true;
                    }
                }
            }
        }

        if self.cluster_selection_epsilon > 0.0 && k > 1 {
            selected = self.epsilon_merge(tree, &selected);
        }
        selected
    }

    fn epsilon_merge(&self, tree: &CondensedTree, selected: &[bool]) -> Vec<bool> {
        let k = tree.n_clusters();
        let eps = self.cluster_selection_epsilon;
        let mut merged = vec![false; k];
        let mut processed = vec![false; k];

        for c in (0..k).filter(|&c| selected[c]) {
            if c == 0 || 1.0 / tree.birth[c] >= eps {
                merged[c] = true;
            } else if !processed[c] {
                let target = self.traverse_upwards(tree, eps, c);
                merged[target] = true;
                for d in tree.descendants(target) {
                    processed[d] = true;
                }
            }
        }

        // Keep the selection an antichain.
        for c in 0..k {
            if merged[c] {
                for d in tree.descendants(c) {
                    merged[d] = false;
                }
            }
        }
        merged
    }

    fn traverse_upwards(&self, tree: &CondensedTree, eps: f64, leaf: usize) -> usize {
        let mut current = leaf;
        while let Some(parent) = tree.parent[current] {
            if parent == 0 {
                return if self.allow_single_cluster { 0 } else { current };
            }
            if 1.0 / tree.birth[parent] > eps {
                return parent;
            }
            current = parent;
        }
        current
    }

    fn label_points(&self, tree: &CondensedTree, selected: &[bool]) -> Vec<i32> {
        let mut label_of = vec![NOISE_LABEL; tree.n_clusters()];
        let mut next = 0i32;
        for (c, &sel) in selected.iter().enumerate() {
            if sel {
                label_of[c] = next;
                next += 1;
            }
        }
        let single_root = next == 1 && selected[0] && self.allow_single_cluster;
        let eps = self.cluster_selection_epsilon;

        (0..tree.n_points)
            .map(|p| {
                let mut c = tree.point_parent[p];
                loop {
                    if selected[c] {
                        if c != 0 {
                            return label_of[c];
                        }
                        // Root as the only cluster: keep points that survive to the end.
                        if !single_root {
                            return NOISE_LABEL;
                        }
                        let lambda = tree.point_lambda[p];
                        let keep = if eps > 0.0 {
                            lambda >= 1.0 / eps
                        } else {
                            lambda >= tree.direct_max_lambda[0]
                        };
                        return if keep { label_of[0] } else { NOISE_LABEL };
                    }
                    match tree.parent[c] {
                        Some(parent) => c = parent,
                        None => return NOISE_LABEL,
                    }
                }
            })
            .collect()
    }
}

impl Default for Hdbscan {
    fn default() -> Self {
        Self {
            min_cluster_size: 5,
            min_samples: None,
            cluster_selection_epsilon: 0.0,
            cluster_selection_method: ClusterSelectionMethod::Eom,
            metric: DistanceMetric::Euclidean,
            allow_single_cluster: false,
        }
    }
}

impl DensityClusterer for Hdbscan {
    fn fit(&self, data: &[Vec<f32>]) -> Result<ClusteringResult> {
        self.validate()?;
        util::validate_points(data)?;

        let n = data.len();
        if n == 1 {
            return Ok(ClusteringResult::all_noise(1));
        }

        let dists = pairwise_distances(data, self.metric);
        let core_dists = core_distances(&dists, n, self.min_samples());

        let mut mst = util::prim_mst(n, |i, j| {
            mutual_reachability(dists[i * n + j], core_dists[i], core_dists[j])
        });
        mst.sort_by(|a, b| a.2.total_cmp(&b.2));

        let slt = single_linkage(&mst, n);
        let tree = condense(&slt, n, self.min_cluster_size);
        let stability = tree.stabilities();

        let selected = self.select_clusters(&tree, &stability);
        let labels = self.label_points(&tree, &selected);
        let clusters: Vec<usize> = (0..tree.n_clusters()).filter(|&c| selected[c]).collect();

        let probabilities = membership_probabilities(&tree, &clusters, &labels);
        let outlier_scores = glosh_scores(&tree);
        let persistence = persistence_scores(&tree, &clusters, &labels, &stability);
        let relative_validity = relative_validity(&mst, &labels);

        Ok(ClusteringResult {
            labels,
            probabilities,
            persistence,
            outlier_scores,
            relative_validity,
            min_spanning_tree: mst,
        })
    }
}

fn pairwise_distances(data: &[Vec<f32>], metric: DistanceMetric) -> Vec<f64> {
    let n = data.len();
    let mut dists = vec![0.0f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = metric.distance(&data[i], &data[j]);
            dists[i * n + j] = d;
            dists[j * n + i] = d;
        }
    }
    dists
}

fn core_distances(dists: &[f64], n: usize, min_samples: usize) -> Vec<f64> {
    // The query point itself counts as the first neighbor.
    let k = (min_samples - 1).min(n - 1);
    if k == 0 {
        return vec![0.0; n];
    }
    let mut core = Vec::with_capacity(n);
    for i in 0..n {
        let mut row: Vec<f64> = (0..n)
            .filter(|&j| j != i)
            .map(|j| dists[i * n + j])
            .collect();
        let (_, kth, _) = row.select_nth_unstable_by(k - 1, |a, b| a.total_cmp(b));
        core.push(*kth);
    }
    core
}

#[inline]
fn mutual_reachability(dist: f64, core_i: f64, core_j: f64) -> f64 {
    dist.max(core_i).max(core_j)
}

#[inline]
fn lambda_of(dist: f64) -> f64 {
    if dist > 0.0 {
        (1.0 / dist).min(MAX_LAMBDA)
    } else {
        MAX_LAMBDA
    }
}

// ---------------------------------------------------------------------------
// Single-linkage tree
// ---------------------------------------------------------------------------

/// Internal dendrogram node; node ids `0..n` are points, `n + i` is `nodes[i]`.
#[derive(Debug, Clone, Copy)]
struct SltNode {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

fn single_linkage(mst: &[(usize, usize, f64)], n: usize) -> Vec<SltNode> {
    let mut uf = UnionFind::new(n);
    // UF root -> current dendrogram node id.
    let mut comp_node: Vec<usize> = (0..n).collect();
    let mut nodes: Vec<SltNode> = Vec::with_capacity(n.saturating_sub(1));

    for &(u, v, distance) in mst {
        let ru = uf.find(u);
        let rv = uf.find(v);
        if ru == rv {
            continue;
        }
        let left = comp_node[ru];
        let right = comp_node[rv];
        let size = node_size(&nodes, n, left) + node_size(&nodes, n, right);
        nodes.push(SltNode {
            left,
            right,
            distance,
            size,
        });
        let root = uf.union_roots(ru, rv);
        comp_node[root] = n + nodes.len() - 1;
    }
    nodes
}

#[inline]
fn node_size(nodes: &[SltNode], n: usize, id: usize) -> usize {
    if id < n {
        1
    } else {
        nodes[id - n].size
    }
}

fn bfs_from(nodes: &[SltNode], n: usize, root: usize) -> Vec<usize> {
    let mut out = vec![root];
    let mut i = 0;
    while i < out.len() {
        let node = out[i];
        i += 1;
        if node >= n {
            let s = nodes[node - n];
            out.push(s.left);
            out.push(s.right);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Condensed cluster tree
// ---------------------------------------------------------------------------

/// An entry in the condensed cluster tree stored as a flat table.
///
/// `parent` is a cluster index (root = 0). When `child_size == 1` the child is a
/// point index falling out of the parent; otherwise it is a child cluster index.
#[derive(Debug, Clone, Copy)]
struct CondensedEdge {
    parent: usize,
    child: usize,
    lambda: f64,
    child_size: usize,
}

impl CondensedEdge {
    fn is_cluster(&self) -> bool {
        self.child_size > 1
    }
}

struct CondensedTree {
    n_points: usize,
    edges: Vec<CondensedEdge>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    birth: Vec<f64>,
    direct_max_lambda: Vec<f64>,
    point_parent: Vec<usize>,
    point_lambda: Vec<f64>,
}

impl CondensedTree {
    fn new(n_points: usize, n_clusters: usize, edges: Vec<CondensedEdge>) -> Self {
        let mut parent = vec![None; n_clusters];
        let mut children = vec![Vec::new(); n_clusters];
        let mut birth = vec![0.0; n_clusters];
        let mut direct_max_lambda = vec![0.0f64; n_clusters];
        let mut point_parent = vec![0; n_points];
        let mut point_lambda = vec![0.0; n_points];

        for e in &edges {
            direct_max_lambda[e.parent] = direct_max_lambda[e.parent].max(e.lambda);
            if e.is_cluster() {
                parent[e.child] = Some(e.parent);
                children[e.parent].push(e.child);
                birth[e.child] = e.lambda;
            } else {
                point_parent[e.child] = e.parent;
                point_lambda[e.child] = e.lambda;
            }
        }

        Self {
            n_points,
            edges,
            parent,
            children,
            birth,
            direct_max_lambda,
            point_parent,
            point_lambda,
        }
    }

    fn n_clusters(&self) -> usize {
        self.parent.len()
    }

    /// stability(c) = sum over rows with parent c of child_size * (lambda - birth(c)).
    fn stabilities(&self) -> Vec<f64> {
        let mut stability = vec![0.0f64; self.n_clusters()];
        for e in &self.edges {
            stability[e.parent] += e.child_size as f64 * (e.lambda - self.birth[e.parent]);
        }
        stability
    }

    /// All clusters strictly below `c`.
    fn descendants(&self, c: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.children[c].clone();
        while let Some(d) = stack.pop() {
            out.push(d);
            stack.extend_from_slice(&self.children[d]);
        }
        out
    }

    /// Largest lambda reached anywhere in each cluster's subtree.
    fn subtree_max_lambda(&self) -> Vec<f64> {
        let mut deaths = self.direct_max_lambda.clone();
        for c in (1..self.n_clusters()).rev() {
            if let Some(p) = self.parent[c] {
                deaths[p] = deaths[p].max(deaths[c]);
            }
        }
        deaths
    }
}

fn condense(slt: &[SltNode], n: usize, min_cluster_size: usize) -> CondensedTree {
    let root = n + slt.len() - 1;
    // Dendrogram node -> cluster index.
    let mut relabel = vec![0usize; root + 1];
    let mut ignore = vec![false; root + 1];
    let mut next_cluster = 1usize;
    let mut edges: Vec<CondensedEdge> = Vec::new();

    for node in bfs_from(slt, n, root) {
        if node < n || ignore[node] {
            continue;
        }
        let SltNode {
            left,
            right,
            distance,
            ..
        } = slt[node - n];
        let lambda = lambda_of(distance);
        let parent = relabel[node];
        let left_count = node_size(slt, n, left);
        let right_count = node_size(slt, n, right);

        match (left_count >= min_cluster_size, right_count >= min_cluster_size) {
            (true, true) => {
                for (child, size) in [(left, left_count), (right, right_count)] {
                    relabel[child] = next_cluster;
                    edges.push(CondensedEdge {
                        parent,
                        child: next_cluster,
                        lambda,
                        child_size: size,
                    });
                    next_cluster += 1;
                }
            }
            (false, false) => {
                for child in [left, right] {
                    fall_out(slt, n, child, parent, lambda, &mut edges, &mut ignore);
                }
            }
            (false, true) => {
                relabel[right] = parent;
                fall_out(slt, n, left, parent, lambda, &mut edges, &mut ignore);
            }
            (true, false) => {
                relabel[left] = parent;
                fall_out(slt, n, right, parent, lambda, &mut edges, &mut ignore);
            }
        }
    }

    CondensedTree::new(n, next_cluster, edges)
}

/// Record every point under `sub_root` as leaving cluster `parent` at `lambda`.
fn fall_out(
    slt: &[SltNode],
    n: usize,
    sub_root: usize,
    parent: usize,
    lambda: f64,
    edges: &mut Vec<CondensedEdge>,
    ignore: &mut [bool],
) {
    for sub in bfs_from(slt, n, sub_root) {
        if sub < n {
            edges.push(CondensedEdge {
                parent,
                child: sub,
                lambda,
                child_size: 1,
            });
        }
        ignore[sub] = true;
    }
}

// ---------------------------------------------------------------------------
// Per-point and per-cluster outputs
// ---------------------------------------------------------------------------

fn membership_probabilities(tree: &CondensedTree, clusters: &[usize], labels: &[i32]) -> Vec<f64> {
    labels
        .iter()
        .enumerate()
        .map(|(p, &label)| {
            if label == NOISE_LABEL {
                return 0.0;
            }
            let max_lambda = tree.direct_max_lambda[clusters[label as usize]];
            let lambda = tree.point_lambda[p];
            if max_lambda == 0.0 || !lambda.is_finite() {
                1.0
            } else {
                lambda.min(max_lambda) / max_lambda
            }
        })
        .collect()
}

/// Global-Local Outlier Score from Hierarchies.
fn glosh_scores(tree: &CondensedTree) -> Vec<f64> {
    let deaths = tree.subtree_max_lambda();
    (0..tree.n_points)
        .map(|p| {
            let lambda_max = deaths[tree.point_parent[p]];
            let lambda = tree.point_lambda[p];
            if lambda_max == 0.0 || !lambda.is_finite() {
                0.0
            } else {
                ((lambda_max - lambda) / lambda_max).clamp(0.0, 1.0)
            }
        })
        .collect()
}

fn persistence_scores(
    tree: &CondensedTree,
    clusters: &[usize],
    labels: &[i32],
    stability: &[f64],
) -> Vec<f64> {
    let max_lambda = tree.edges.iter().map(|e| e.lambda).fold(0.0f64, f64::max);
    clusters
        .iter()
        .enumerate()
        .map(|(label, &c)| {
            let size = labels.iter().filter(|&&l| l == label as i32).count();
            if !max_lambda.is_finite() || max_lambda == 0.0 || size == 0 {
                1.0
            } else {
                stability[c] / (size as f64 * max_lambda)
            }
        })
        .collect()
}

/// Relative validity: a fast approximation of DBCV computed on the MST.
///
/// For every cluster, density sparseness is its longest internal MST edge and
/// density separation its shortest MST edge to another cluster. Each cluster
/// contributes `(separation - sparseness) / max(separation, sparseness)` weighted
/// by its share of all points. Clusterings without clusters score 0.
pub(crate) fn relative_validity(mst: &[(usize, usize, f64)], labels: &[i32]) -> f64 {
    let k = labels
        .iter()
        .copied()
        .filter(|&l| l >= 0)
        .max()
        .map_or(0, |m| m as usize + 1);
    if k == 0 || labels.is_empty() {
        return 0.0;
    }

    let total = labels.len() as f64;
    let mut sizes = vec![0usize; k];
    for &l in labels.iter().filter(|&&l| l >= 0) {
        sizes[l as usize] += 1;
    }

    let mut sparseness = vec![0.0f64; k];
    let mut separation = vec![f64::INFINITY; k];
    let mut min_outlier_sep = f64::INFINITY;
    let mut max_distance = 0.0f64;

    for &(a, b, length) in mst {
        let (la, lb) = (labels[a], labels[b]);
        max_distance = max_distance.max(length);

        if la == NOISE_LABEL && lb == NOISE_LABEL {
            continue;
        }
        if la == NOISE_LABEL || lb == NOISE_LABEL {
            min_outlier_sep = min_outlier_sep.min(length);
            continue;
        }
        let (ia, ib) = (la as usize, lb as usize);
        if ia == ib {
            sparseness[ia] = sparseness[ia].max(length);
        } else {
            separation[ia] = separation[ia].min(length);
            separation[ib] = separation[ib].min(length);
        }
    }

    if min_outlier_sep.is_infinite() {
        min_outlier_sep = max_distance;
    }
    // Clusters with no MST edge to another cluster get a large stand-in separation.
    let correction = 2.0 * if k > 1 { max_distance } else { min_outlier_sep };

    (0..k)
        .map(|i| {
            let sep = if separation[i].is_infinite() {
                correction
            } else {
                separation[i]
            };
            let denom = sep.max(sparseness[i]);
            let v = if denom > 0.0 {
                (sep - sparseness[i]) / denom
            } else {
                0.0
            };
            sizes[i] as f64 * v / total
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn make_cluster(center: &[f32], n: usize, spread: f32) -> Vec<Vec<f32>> {
        let dim = center.len();
        let mut points = Vec::with_capacity(n);
        for i in 0..n {
            let mut p = Vec::with_capacity(dim);
            for (d, &c) in center.iter().enumerate() {
                let offset = spread * ((i * 7 + d * 13) % 11) as f32 / 11.0 - spread / 2.0;
                p.push(c + offset);
            }
            points.push(p);
        }
        points
    }

    fn two_groups() -> Vec<Vec<f32>> {
        let mut data = make_cluster(&[0.0, 0.0], 20, 0.5);
        data.extend(make_cluster(&[20.0, 20.0], 20, 0.5));
        data
    }

    fn distinct_clusters(labels: &[i32]) -> HashSet<i32> {
        labels.iter().copied().filter(|&l| l != NOISE_LABEL).collect()
    }

    #[test]
    fn two_well_separated_clusters() {
        let data = two_groups();
        let hdbscan = Hdbscan::new(10).with_min_samples(3);
        let labels = hdbscan.fit_predict(&data).unwrap();

        assert_eq!(labels.len(), 40);

        let l0 = labels[0];
        assert_ne!(l0, NOISE_LABEL);
        for &l in &labels[1..20] {
            assert_eq!(l, l0);
        }

        let l20 = labels[20];
        assert_ne!(l20, NOISE_LABEL);
        for &l in &labels[21..40] {
            assert_eq!(l, l20);
        }

        assert_ne!(l0, l20);
    }

    #[test]
    fn result_vectors_are_consistent() {
        let data = two_groups();
        let result = Hdbscan::new(10).with_min_samples(3).fit(&data).unwrap();

        assert_eq!(result.probabilities.len(), 40);
        assert_eq!(result.outlier_scores.len(), 40);
        assert_eq!(result.min_spanning_tree.len(), 39);
        assert_eq!(result.persistence.len(), distinct_clusters(&result.labels).len());

        for (&p, &l) in result.probabilities.iter().zip(&result.labels) {
            assert!((0.0..=1.0).contains(&p), "probability {p} out of range");
            if l == NOISE_LABEL {
                assert_eq!(p, 0.0);
            }
        }
        for &o in &result.outlier_scores {
            assert!((0.0..=1.0).contains(&o), "outlier score {o} out of range");
        }
        for &s in &result.persistence {
            assert!(s.is_finite() && s >= 0.0);
        }
    }

    #[test]
    fn separated_clusters_have_high_validity() {
        let data = two_groups();
        let result = Hdbscan::new(10).with_min_samples(3).fit(&data).unwrap();
        assert!(
            result.relative_validity > 0.5,
            "validity was {}",
            result.relative_validity
        );
        assert!(result.relative_validity <= 1.0);
    }

    #[test]
    fn noise_points_between_clusters() {
        let mut data = make_cluster(&[0.0, 0.0], 15, 0.3);
        data.extend(make_cluster(&[20.0, 20.0], 15, 0.3));
        data.push(vec![10.0, 10.0]);
        data.push(vec![8.0, 12.0]);
        data.push(vec![12.0, 8.0]);

        let hdbscan = Hdbscan::new(5).with_min_samples(3);
        let labels = hdbscan.fit_predict(&data).unwrap();

        assert!(distinct_clusters(&labels).len() >= 2, "should find at least 2 clusters");
    }

    #[test]
    fn all_noise_high_min_cluster_size() {
        let data = vec![vec![0.0, 0.0], vec![10.0, 10.0], vec![20.0, 20.0]];

        let hdbscan = Hdbscan::new(100).with_min_samples(2);
        let result = hdbscan.fit(&data).unwrap();

        assert!(result.labels.iter().all(|&l| l == NOISE_LABEL));
        assert!(result.persistence.is_empty());
        assert_eq!(result.relative_validity, 0.0);
        assert!(result.probabilities.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn single_group_is_noise_without_allow_single_cluster() {
        // A group that never splits into two large halves has only the root cluster.
        let data = make_cluster(&[0.0, 0.0], 20, 0.5);
        let labels = Hdbscan::new(15)
            .with_min_samples(3)
            .fit_predict(&data)
            .unwrap();
        assert!(labels.iter().all(|&l| l == NOISE_LABEL));
    }

    #[test]
    fn single_group_with_allow_single_cluster() {
        let data = make_cluster(&[0.0, 0.0], 20, 0.5);
        let result = Hdbscan::new(15)
            .with_min_samples(3)
            .with_allow_single_cluster(true)
            .fit(&data)
            .unwrap();
        assert_eq!(result.persistence.len(), 1);
        assert!(distinct_clusters(&result.labels).len() <= 1);
    }

    #[test]
    fn leaf_selects_at_least_as_many_clusters_as_eom() {
        let data = two_groups();
        let eom = Hdbscan::new(3).with_min_samples(2).fit_predict(&data).unwrap();
        let leaf = Hdbscan::new(3)
            .with_min_samples(2)
            .with_cluster_selection_method(ClusterSelectionMethod::Leaf)
            .fit_predict(&data)
            .unwrap();
        assert!(distinct_clusters(&leaf).len() >= distinct_clusters(&eom).len());
    }

    #[test]
    fn large_epsilon_merges_up_to_top_level_clusters() {
        let data = two_groups();
        let labels = Hdbscan::new(3)
            .with_min_samples(2)
            .with_cluster_selection_method(ClusterSelectionMethod::Leaf)
            .with_cluster_selection_epsilon(1000.0)
            .fit_predict(&data)
            .unwrap();

        assert_eq!(distinct_clusters(&labels).len(), 2);
        assert!(labels.iter().all(|&l| l != NOISE_LABEL));
        assert_ne!(labels[0], labels[20]);
    }

    #[test]
    fn empty_input() {
        let data: Vec<Vec<f32>> = vec![];
        assert!(matches!(Hdbscan::default().fit(&data), Err(Error::EmptyInput)));
    }

    #[test]
    fn single_point_is_noise() {
        let result = Hdbscan::default().fit(&[vec![1.0, 2.0]]).unwrap();
        assert_eq!(result.labels, vec![NOISE_LABEL]);
    }

    #[test]
    fn invalid_min_samples_zero() {
        let data = vec![vec![0.0, 0.0]];
        let result = Hdbscan::default().with_min_samples(0).fit(&data);
        assert!(result.is_err());
    }

    #[test]
    fn invalid_min_cluster_size_one() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let result = Hdbscan::new(1).fit(&data);
        assert!(result.is_err());
    }

    #[test]
    fn negative_epsilon_rejected() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let result = Hdbscan::new(2).with_cluster_selection_epsilon(-0.5).fit(&data);
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn large_min_samples_relative_to_data() {
        let data = make_cluster(&[0.0, 0.0], 10, 0.5);
        let labels = Hdbscan::new(3)
            .with_min_samples(100)
            .fit_predict(&data)
            .unwrap();
        assert_eq!(labels.len(), 10);
    }

    #[test]
    fn property_non_noise_labels_meet_min_cluster_size() {
        let mut data = make_cluster(&[0.0, 0.0], 25, 0.5);
        data.extend(make_cluster(&[30.0, 30.0], 25, 0.5));
        data.push(vec![15.0, 15.0]);

        let min_cluster_size = 5;
        let labels = Hdbscan::new(min_cluster_size)
            .with_min_samples(3)
            .fit_predict(&data)
            .unwrap();

        let mut counts = HashMap::new();
        for &l in labels.iter().filter(|&&l| l != NOISE_LABEL) {
            *counts.entry(l).or_insert(0usize) += 1;
        }

        for (&label, &count) in &counts {
            assert!(
                count >= min_cluster_size,
                "label {label} has {count} points, expected at least {min_cluster_size}"
            );
        }
    }

    #[test]
    fn other_metrics_find_the_same_groups() {
        let data = two_groups();
        for metric in [DistanceMetric::Manhattan, DistanceMetric::Chebyshev] {
            let labels = Hdbscan::new(10)
                .with_min_samples(3)
                .with_metric(metric)
                .fit_predict(&data)
                .unwrap();
            assert_ne!(labels[0], NOISE_LABEL, "{metric}");
            assert_ne!(labels[0], labels[39], "{metric}");
        }
    }

    #[test]
    fn deterministic() {
        let data = two_groups();
        let h = Hdbscan::new(4).with_min_samples(2);
        assert_eq!(h.fit(&data).unwrap(), h.fit(&data).unwrap());
    }

    #[test]
    fn relative_validity_ignores_pure_noise_edges() {
        let mst = vec![(0, 1, 1.0), (1, 2, 5.0), (2, 3, 1.0)];
        let labels = vec![0, 0, 1, 1];
        let v = relative_validity(&mst, &labels);
        // Both clusters: sparseness 1, separation 5 -> (5 - 1) / 5 = 0.8.
        assert!((v - 0.8).abs() < 1e-12);

        assert_eq!(relative_validity(&mst, &[-1, -1, -1, -1]), 0.0);
    }

    #[test]
    fn dimension_mismatch() {
        let data = vec![vec![0.0, 0.0], vec![1.0]];
        assert!(Hdbscan::default().fit(&data).is_err());
    }

    #[test]
    fn selection_method_parses() {
        assert_eq!("EOM".parse::<ClusterSelectionMethod>().unwrap(), ClusterSelectionMethod::Eom);
        assert_eq!("leaf".parse::<ClusterSelectionMethod>().unwrap(), ClusterSelectionMethod::Leaf);
        assert!("mass".parse::<ClusterSelectionMethod>().is_err());
    }
}
