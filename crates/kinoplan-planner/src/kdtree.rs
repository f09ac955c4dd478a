//! Spatial index over tree-node positions.
//!
//! Insert-only kd-tree over 3D points. The splitting dimension cycles with
//! depth and the enclosing hyper-rectangle is widened on every insert, which
//! lets nearest-neighbor queries prune subtrees by rectangle distance. The
//! tree is never re-balanced; growth from random sampling keeps it shallow
//! enough in practice.

use nalgebra::Vector3;

use crate::tree::NodeId;

#[derive(Debug, Clone)]
struct KdNode {
    pos: [f64; 3],
    dir: usize,
    data: NodeId,
    left: Option<u32>,
    right: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    root: Option<u32>,
    rect_min: [f64; 3],
    rect_max: [f64; 3],
}

impl Default for KdTree {
    fn default() -> Self {
        Self::new()
    }
}

impl KdTree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            rect_min: [f64::INFINITY; 3],
            rect_max: [f64::NEG_INFINITY; 3],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Remove every point but keep the allocation.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.rect_min = [f64::INFINITY; 3];
        self.rect_max = [f64::NEG_INFINITY; 3];
    }

    pub fn insert(&mut self, pos: &Vector3<f64>, data: NodeId) {
        let p = [pos.x, pos.y, pos.z];
        let new_idx = self.nodes.len() as u32;

        match self.root {
            None => {
                self.nodes.push(KdNode {
                    pos: p,
                    dir: 0,
                    data,
                    left: None,
                    right: None,
                });
                self.root = Some(new_idx);
            }
            Some(root) => {
                // find the attach point first, then link
                let mut cur = root;
                let (parent, go_left, child_dir) = loop {
                    let node = &self.nodes[cur as usize];
                    let left = p[node.dir] < node.pos[node.dir];
                    let next = if left { node.left } else { node.right };
                    match next {
                        Some(c) => cur = c,
                        None => break (cur, left, (node.dir + 1) % 3),
                    }
                };
                self.nodes.push(KdNode {
                    pos: p,
                    dir: child_dir,
                    data,
                    left: None,
                    right: None,
                });
                let parent = &mut self.nodes[parent as usize];
                if go_left {
                    parent.left = Some(new_idx);
                } else {
                    parent.right = Some(new_idx);
                }
            }
        }

        for i in 0..3 {
            self.rect_min[i] = self.rect_min[i].min(p[i]);
            self.rect_max[i] = self.rect_max[i].max(p[i]);
        }
    }

    /// All payloads within Euclidean distance `r` of `pos`, unordered.
    pub fn radius_query(&self, pos: &Vector3<f64>, r: f64) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            let p = [pos.x, pos.y, pos.z];
            self.range_rec(root, &p, r, &mut out);
        }
        out
    }

    fn range_rec(&self, idx: u32, p: &[f64; 3], r: f64, out: &mut Vec<NodeId>) {
        let node = &self.nodes[idx as usize];
        if dist_sq(&node.pos, p) <= r * r {
            out.push(node.data);
        }
        let dx = p[node.dir] - node.pos[node.dir];
        let (near, far) = if dx < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };
        if let Some(n) = near {
            self.range_rec(n, p, r, out);
        }
        if dx.abs() <= r {
            if let Some(f) = far {
                self.range_rec(f, p, r, out);
            }
        }
    }

    /// Single nearest payload and its squared distance.
    pub fn nearest(&self, pos: &Vector3<f64>) -> Option<(NodeId, f64)> {
        let root = self.root?;
        let p = [pos.x, pos.y, pos.z];
        let mut rect_min = self.rect_min;
        let mut rect_max = self.rect_max;
        let mut best: Option<(NodeId, f64)> = None;
        self.nearest_rec(root, &p, &mut rect_min, &mut rect_max, &mut best);
        best
    }

    fn nearest_rec(
        &self,
        idx: u32,
        p: &[f64; 3],
        rect_min: &mut [f64; 3],
        rect_max: &mut [f64; 3],
        best: &mut Option<(NodeId, f64)>,
    ) {
        let node = &self.nodes[idx as usize];
        let dir = node.dir;
        let split = node.pos[dir];
        let to_left = p[dir] <= split;
        let (nearer, farther) = if to_left {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(n) = nearer {
            if to_left {
                let saved = rect_max[dir];
                rect_max[dir] = split;
                self.nearest_rec(n, p, rect_min, rect_max, best);
                rect_max[dir] = saved;
            } else {
                let saved = rect_min[dir];
                rect_min[dir] = split;
                self.nearest_rec(n, p, rect_min, rect_max, best);
                rect_min[dir] = saved;
            }
        }

        let d = dist_sq(&node.pos, p);
        if best.map_or(true, |(_, bd)| d < bd) {
            *best = Some((node.data, d));
        }

        if let Some(f) = farther {
            // the far child only matters if its rectangle can beat the best
            if to_left {
                let saved = rect_min[dir];
                rect_min[dir] = split;
                if rect_dist_sq(rect_min, rect_max, p) < best.map_or(f64::INFINITY, |(_, bd)| bd) {
                    self.nearest_rec(f, p, rect_min, rect_max, best);
                }
                rect_min[dir] = saved;
            } else {
                let saved = rect_max[dir];
                rect_max[dir] = split;
                if rect_dist_sq(rect_min, rect_max, p) < best.map_or(f64::INFINITY, |(_, bd)| bd) {
                    self.nearest_rec(f, p, rect_min, rect_max, best);
                }
                rect_max[dir] = saved;
            }
        }
    }
}

fn dist_sq(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (0..3).map(|i| (a[i] - b[i]) * (a[i] - b[i])).sum()
}

fn rect_dist_sq(rect_min: &[f64; 3], rect_max: &[f64; 3], p: &[f64; 3]) -> f64 {
    let mut d = 0.0;
    for i in 0..3 {
        if p[i] < rect_min[i] {
            d += (rect_min[i] - p[i]) * (rect_min[i] - p[i]);
        } else if p[i] > rect_max[i] {
            d += (p[i] - rect_max[i]) * (p[i] - rect_max[i]);
        }
    }
    d
}
