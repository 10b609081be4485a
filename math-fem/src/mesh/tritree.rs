//! Adaptive triangle tree
//!
//! A [`Tritree`] keeps every cell ever created in an arena together with its
//! parent link and children. Leaves form the current mesh. Marked leaves are
//! red-refined into four children through their edge midpoints; a closure
//! step first extends the marking so that after refinement
//!
//! - no leaf has more than one hanging edge, and
//! - no half of a leaf edge is itself split (2:1 balance).
//!
//! By default ([`TritreeConfig::green_closure`]) leaves left with one hanging
//! edge are then bisected through the midpoint so the leaf mesh is
//! conforming. Such green pairs are removed and their parent red-refined as
//! soon as any of their edges is cut again. Switching green closure off keeps
//! the hanging nodes.
//!
//! Nodes are append-only. Cells are append-only except when green pairs are
//! removed; cell indices held by callers are invalid after a refinement that
//! reports `removed_cells > 0`.

use super::types::{Edge, MeshError, Point, TriangleMesh, cell_edges};
use std::collections::{HashMap, HashSet};

/// Link from a child cell to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    /// Parent cell index
    pub cell: usize,
    /// Position of the child among the parent's children
    pub slot: usize,
}

/// Children of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Children {
    Leaf,
    /// Green bisection through the midpoint of one edge
    Two([usize; 2]),
    /// Red refinement: three corner triangles and the central one (last)
    Four([usize; 4]),
}

impl Children {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Children::Leaf)
    }

    pub fn as_slice(&self) -> &[usize] {
        match self {
            Children::Leaf => &[],
            Children::Two(c) => c,
            Children::Four(c) => c,
        }
    }

    fn remap(self, old_to_new: &[Option<usize>]) -> Children {
        match self {
            Children::Leaf => Children::Leaf,
            Children::Two(c) => match c.map(|i| old_to_new[i]) {
                [Some(a), Some(b)] => Children::Two([a, b]),
                _ => Children::Leaf,
            },
            Children::Four(c) => match c.map(|i| old_to_new[i]) {
                [Some(a), Some(b), Some(c), Some(d)] => Children::Four([a, b, c, d]),
                _ => Children::Leaf,
            },
        }
    }
}

/// Tree options
#[derive(Debug, Clone)]
pub struct TritreeConfig {
    /// Bisect leaves with one hanging edge after each refinement
    pub green_closure: bool,
}

impl Default for TritreeConfig {
    fn default() -> Self {
        Self {
            green_closure: true,
        }
    }
}

/// Summary of one [`Tritree::refine`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefineReport {
    /// Cells that were red-refined (indices after compaction), ascending
    pub marked: Vec<usize>,
    /// Closure sweeps performed, including the final one that changed nothing
    pub closure_sweeps: usize,
    pub new_nodes: usize,
    pub new_cells: usize,
    /// Green children removed before refinement
    pub removed_cells: usize,
}

/// Adaptive triangle tree over an initial triangle mesh
#[derive(Debug, Clone)]
pub struct Tritree {
    nodes: Vec<Point>,
    cells: Vec<[usize; 3]>,
    parent: Vec<Option<ParentLink>>,
    children: Vec<Children>,
    /// Every edge that has been split, with its midpoint node
    midpoints: HashMap<Edge, usize>,
    config: TritreeConfig,
}

impl Tritree {
    pub fn new(mesh: TriangleMesh) -> Result<Self, MeshError> {
        Self::with_config(mesh, TritreeConfig::default())
    }

    pub fn with_config(mesh: TriangleMesh, config: TritreeConfig) -> Result<Self, MeshError> {
        let mesh = TriangleMesh::new(mesh.nodes, mesh.cells)?;
        let nc = mesh.cells.len();
        Ok(Self {
            nodes: mesh.nodes,
            cells: mesh.cells,
            parent: vec![None; nc],
            children: vec![Children::Leaf; nc],
            midpoints: HashMap::new(),
            config,
        })
    }

    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of cells in the arena, leaves and ancestors
    pub fn number_of_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn nodes(&self) -> &[Point] {
        &self.nodes
    }

    pub fn cells(&self) -> &[[usize; 3]] {
        &self.cells
    }

    pub fn config(&self) -> &TritreeConfig {
        &self.config
    }

    pub fn parent(&self, cell: usize) -> Option<ParentLink> {
        self.parent[cell]
    }

    pub fn children(&self, cell: usize) -> Children {
        self.children[cell]
    }

    pub fn is_leaf_cell(&self, cell: usize) -> bool {
        self.children[cell].is_leaf()
    }

    pub fn is_root_cell(&self, cell: usize) -> bool {
        self.parent[cell].is_none()
    }

    /// Leaf flag for every cell
    pub fn leaf_mask(&self) -> Vec<bool> {
        self.children.iter().map(Children::is_leaf).collect()
    }

    /// Root flag for every cell
    pub fn root_mask(&self) -> Vec<bool> {
        self.parent.iter().map(Option::is_none).collect()
    }

    /// Indices of the leaf cells, ascending
    pub fn leaf_cell_index(&self) -> Vec<usize> {
        (0..self.cells.len())
            .filter(|&c| self.is_leaf_cell(c))
            .collect()
    }

    /// Corner nodes of the leaf cells, in [`Tritree::leaf_cell_index`] order
    pub fn leaf_cell(&self) -> Vec<[usize; 3]> {
        self.leaf_cell_index()
            .into_iter()
            .map(|c| self.cells[c])
            .collect()
    }

    /// Depth of a cell below its root
    pub fn cell_level(&self, cell: usize) -> usize {
        let mut level = 0;
        let mut current = cell;
        while let Some(link) = self.parent[current] {
            level += 1;
            current = link.cell;
        }
        level
    }

    /// Midpoint node of the edge `(a, b)`, if it has been split
    pub fn midpoint(&self, a: usize, b: usize) -> Option<usize> {
        self.midpoints.get(&Edge::new(a, b)).copied()
    }

    /// Local indices of the split edges of a cell
    ///
    /// For a leaf these are its hanging edges.
    pub fn hanging_edges(&self, cell: usize) -> Vec<usize> {
        cell_edges(&self.cells[cell])
            .iter()
            .enumerate()
            .filter(|(_, e)| self.midpoints.contains_key(e))
            .map(|(k, _)| k)
            .collect()
    }

    /// Plain mesh made of the current leaves over all nodes
    ///
    /// Conforming under green closure; otherwise hanging nodes sit on the
    /// edges of coarser leaves.
    pub fn to_mesh(&self) -> TriangleMesh {
        TriangleMesh {
            nodes: self.nodes.clone(),
            cells: self.leaf_cell(),
        }
    }

    /// Refine every leaf
    pub fn uniform_refine(&mut self) -> RefineReport {
        let leaves = self.leaf_cell_index();
        self.refine(&leaves)
    }

    /// Refine the given leaf cells, plus whatever the closure requires
    ///
    /// Indices must refer to existing leaf cells; this is checked in debug
    /// builds only. An empty index set is a no-op.
    pub fn refine(&mut self, indices: &[usize]) -> RefineReport {
        if indices.is_empty() {
            return RefineReport::default();
        }

        let mut marked = vec![false; self.cells.len()];
        for &c in indices {
            debug_assert!(
                c < self.cells.len() && self.is_leaf_cell(c),
                "cell {} is not a leaf",
                c
            );
            marked[c] = true;
        }

        let closure_sweeps = self.close(&mut marked);
        let removed_cells = self.remove_green_pairs(&mut marked);

        let nodes_before = self.nodes.len();
        let cells_before = self.cells.len();

        let refined: Vec<usize> = (0..marked.len()).filter(|&c| marked[c]).collect();
        for &c in &refined {
            self.red_refine(c);
        }
        if self.config.green_closure {
            self.green_close();
        }

        log::debug!(
            "Tritree: refined {} cells ({} closure sweeps, {} green children removed), {} leaves",
            refined.len(),
            closure_sweeps,
            removed_cells,
            self.leaf_cell_index().len()
        );

        RefineReport {
            marked: refined,
            closure_sweeps,
            new_nodes: self.nodes.len() - nodes_before,
            new_cells: self.cells.len() - cells_before,
            removed_cells,
        }
    }

    fn green_sibling(&self, cell: usize) -> Option<usize> {
        let link = self.parent[cell]?;
        match self.children[link.cell] {
            Children::Two(pair) => Some(pair[1 - link.slot]),
            _ => None,
        }
    }

    /// Edges split by refining the marked cells
    ///
    /// A marked green child stands for its parent, which is what gets refined.
    fn cut_edges(&self, marked: &[bool]) -> HashSet<Edge> {
        let mut cut = HashSet::new();
        for c in (0..marked.len()).filter(|&c| marked[c]) {
            let owner = match self.green_sibling(c) {
                Some(_) => self.parent[c].map_or(c, |link| link.cell),
                None => c,
            };
            cut.extend(cell_edges(&self.cells[owner]));
        }
        cut
    }

    /// Extend the marking until it is closed; returns the number of sweeps
    ///
    /// Every sweep that changes the marking marks at least one more leaf, so
    /// the loop ends after at most `number_of_cells + 1` sweeps.
    fn close(&self, marked: &mut [bool]) -> usize {
        let leaves = self.leaf_cell_index();

        let mut owners: HashMap<Edge, Vec<usize>> = HashMap::new();
        for &c in &leaves {
            for e in cell_edges(&self.cells[c]) {
                owners.entry(e).or_default().push(c);
            }
        }
        let split_at: HashMap<usize, Edge> =
            self.midpoints.iter().map(|(&e, &m)| (m, e)).collect();
        let full_edge = |half: &Edge| -> Option<Edge> {
            let Edge(a, b) = *half;
            split_at
                .get(&a)
                .filter(|e| e.contains(b))
                .or_else(|| split_at.get(&b).filter(|e| e.contains(a)))
                .copied()
        };

        let max_sweeps = self.cells.len() + 1;
        for sweep in 1..=max_sweeps {
            let cut = self.cut_edges(marked);
            let mut newly = Vec::new();

            for &c in leaves.iter().filter(|&&c| !marked[c]) {
                let edges = cell_edges(&self.cells[c]);
                let must_refine = match self.green_sibling(c) {
                    Some(sibling) => marked[sibling] || edges.iter().any(|e| cut.contains(e)),
                    None => {
                        edges
                            .iter()
                            .filter(|e| cut.contains(e) || self.midpoints.contains_key(e))
                            .count()
                            > 1
                    }
                };
                if must_refine {
                    newly.push(c);
                }
            }

            // 2:1 balance: a leaf owning the full edge of a half that gets cut
            for full in cut.iter().filter_map(&full_edge) {
                if let Some(cells) = owners.get(&full) {
                    newly.extend(cells.iter().copied().filter(|&c| !marked[c]));
                }
            }

            if newly.is_empty() {
                return sweep;
            }
            for c in newly {
                marked[c] = true;
                if let Some(sibling) = self.green_sibling(c) {
                    marked[sibling] = true;
                }
            }
        }

        log::warn!("Tritree closure did not settle within {} sweeps", max_sweeps);
        max_sweeps
    }

    /// Drop green pairs with a marked child and mark their parent instead
    ///
    /// Returns the number of removed cells. The arena is rebuilt through an
    /// old -> new index table; `marked` is remapped alongside.
    fn remove_green_pairs(&mut self, marked: &mut Vec<bool>) -> usize {
        let mut removed = vec![false; self.cells.len()];
        for p in 0..self.cells.len() {
            if let Children::Two([a, b]) = self.children[p] {
                if marked[a] || marked[b] {
                    debug_assert!(marked[a] && marked[b], "green pair {} partly marked", p);
                    removed[a] = true;
                    removed[b] = true;
                    self.children[p] = Children::Leaf;
                    marked[p] = true;
                }
            }
        }

        let count = removed.iter().filter(|&&r| r).count();
        if count == 0 {
            return 0;
        }

        let mut old_to_new = vec![None; self.cells.len()];
        let mut next = 0;
        for (old, slot) in old_to_new.iter_mut().enumerate() {
            if !removed[old] {
                *slot = Some(next);
                next += 1;
            }
        }

        let keep = |i: &usize| !removed[*i];
        let survivors: Vec<usize> = (0..self.cells.len()).filter(keep).collect();
        self.cells = survivors.iter().map(|&i| self.cells[i]).collect();
        self.parent = survivors
            .iter()
            .map(|&i| {
                self.parent[i].and_then(|link| {
                    old_to_new[link.cell].map(|cell| ParentLink {
                        cell,
                        slot: link.slot,
                    })
                })
            })
            .collect();
        self.children = survivors
            .iter()
            .map(|&i| self.children[i].remap(&old_to_new))
            .collect();
        *marked = survivors.iter().map(|&i| marked[i]).collect();

        log::debug!("Tritree: removed {} green children", count);
        count
    }

    fn split_edge(&mut self, edge: Edge) -> usize {
        if let Some(&m) = self.midpoints.get(&edge) {
            return m;
        }
        let m = self.nodes.len();
        self.nodes.push(self.nodes[edge.0].midpoint(&self.nodes[edge.1]));
        self.midpoints.insert(edge, m);
        m
    }

    fn push_child(&mut self, parent: usize, slot: usize, corners: [usize; 3]) -> usize {
        let idx = self.cells.len();
        self.cells.push(corners);
        self.parent.push(Some(ParentLink { cell: parent, slot }));
        self.children.push(Children::Leaf);
        idx
    }

    fn red_refine(&mut self, cell: usize) {
        let v = self.cells[cell];
        let m = cell_edges(&v).map(|e| self.split_edge(e));

        let corners = [
            [v[0], m[2], m[1]],
            [v[1], m[0], m[2]],
            [v[2], m[1], m[0]],
            [m[0], m[1], m[2]],
        ];
        let mut kids = [0; 4];
        for (slot, tri) in corners.into_iter().enumerate() {
            kids[slot] = self.push_child(cell, slot, tri);
        }
        self.children[cell] = Children::Four(kids);
    }

    fn green_close(&mut self) {
        for cell in 0..self.cells.len() {
            if !self.is_leaf_cell(cell) {
                continue;
            }
            match self.hanging_edges(cell).as_slice() {
                [] => {}
                &[k] => self.bisect(cell, k),
                many => log::warn!(
                    "Tritree: leaf {} has {} hanging edges, left unrefined",
                    cell,
                    many.len()
                ),
            }
        }
    }

    fn bisect(&mut self, cell: usize, k: usize) {
        let v = self.cells[cell];
        let (a, b, c) = (v[k], v[(k + 1) % 3], v[(k + 2) % 3]);
        let Some(m) = self.midpoint(b, c) else {
            return;
        };
        let first = self.push_child(cell, 0, [a, b, m]);
        let second = self.push_child(cell, 1, [a, m, c]);
        self.children[cell] = Children::Two([first, second]);
    }
}
