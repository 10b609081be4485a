//! Adaptive refinement scenarios for the Tritree hierarchy

use fem::assembly::{assemble_load, assemble_stiffness};
use fem::boundary::{apply_dirichlet_rows, boundary_node_mask};
use fem::mesh::{
    Children, Edge, Point, TriangleMesh, Tritree, TritreeConfig, cell_edges, doerfler_marking,
    maximum_marking, unit_square_triangles,
};
use std::collections::HashMap;
use ndarray::Array1;
use solvers::{FastSolverConfig, LinearElasticityFastSolver};

fn tree(n: usize, green_closure: bool) -> Tritree {
    Tritree::with_config(unit_square_triangles(n), TritreeConfig { green_closure }).expect("valid mesh")
}

fn total_leaf_area(tree: &Tritree) -> f64 {
    let mesh = tree.to_mesh();
    (0..mesh.number_of_cells()).map(|c| mesh.cell_area(c)).sum()
}

/// Leaves touching the origin (node 0 of the structured mesh)
fn corner_leaves(tree: &Tritree) -> Vec<usize> {
    tree.leaf_cell_index()
        .into_iter()
        .filter(|&c| tree.cells()[c].contains(&0))
        .collect()
}

fn on_square_boundary(p: &Point) -> bool {
    p.x.abs() < 1e-14 || p.y.abs() < 1e-14 || (p.x - 1.0).abs() < 1e-14 || (p.y - 1.0).abs() < 1e-14
}

fn assert_conforming(mesh: &TriangleMesh) {
    for edge in mesh.boundary_edges() {
        let (a, b) = (mesh.nodes[edge.0], mesh.nodes[edge.1]);
        let same_side = (a.x.abs() < 1e-14 && b.x.abs() < 1e-14)
            || (a.y.abs() < 1e-14 && b.y.abs() < 1e-14)
            || ((a.x - 1.0).abs() < 1e-14 && (b.x - 1.0).abs() < 1e-14)
            || ((a.y - 1.0).abs() < 1e-14 && (b.y - 1.0).abs() < 1e-14);
        assert!(same_side, "edge {:?} is owned once but lies inside the domain", edge);
    }
}

/// Depth difference of at most one across every shared full edge or half edge
fn assert_two_to_one(tree: &Tritree) {
    let mut owners: HashMap<Edge, Vec<usize>> = HashMap::new();
    for c in tree.leaf_cell_index() {
        for e in cell_edges(&tree.cells()[c]) {
            owners.entry(e).or_default().push(c);
        }
    }

    let mut compared = 0;
    for (edge, cells) in &owners {
        let mut neighbours: Vec<usize> = cells.clone();
        if let Some(m) = tree.midpoint(edge.0, edge.1) {
            for half in [Edge::new(edge.0, m), Edge::new(m, edge.1)] {
                neighbours.extend(owners.get(&half).into_iter().flatten());
            }
        }
        for &c in cells {
            for &d in neighbours.iter().filter(|&&d| d != c) {
                let (lc, ld) = (tree.cell_level(c), tree.cell_level(d));
                assert!(lc.abs_diff(ld) <= 1, "leaves {c} (level {lc}) and {d} (level {ld}) across {edge:?}");
                compared += 1;
            }
        }
    }
    assert!(compared > 0);
}

#[test]
fn test_leaf_levels_differ_by_at_most_one() {
    for green_closure in [false, true] {
        let mut tree = tree(3, green_closure);
        for round in 0..6 {
            // Alternate between the corner and the deepest red-refined leaf
            let marked = if round % 2 == 0 {
                corner_leaves(&tree)
            } else {
                let red = |c: &usize| {
                    tree.parent(*c)
                        .is_none_or(|link| matches!(tree.children(link.cell), Children::Four(_)))
                };
                let leaves = tree.leaf_cell_index();
                let deepest = leaves.into_iter().filter(red).max_by_key(|&c| tree.cell_level(c));
                deepest.into_iter().collect()
            };
            tree.refine(&marked);
            assert_two_to_one(&tree);
        }
        assert!(tree.leaf_cell_index().iter().any(|&c| tree.cell_level(c) >= 4));
    }
}

#[test]
fn test_repeated_corner_refinement_keeps_two_to_one() {
    let mut tree = tree(2, false);

    for round in 0..5 {
        let marked = corner_leaves(&tree);
        assert!(!marked.is_empty(), "round {round}");
        let report = tree.refine(&marked);
        assert!(report.closure_sweeps <= tree.number_of_cells() + 1);

        for c in tree.leaf_cell_index() {
            let hanging = tree.hanging_edges(c);
            assert!(hanging.len() <= 1, "round {round}: leaf {c} has {hanging:?}");

            // A hanging edge is split exactly once
            for k in hanging {
                let edge = cell_edges(&tree.cells()[c])[k];
                let m = tree.midpoint(edge.0, edge.1).expect("split edge");
                assert!(tree.midpoint(edge.0, m).is_none());
                assert!(tree.midpoint(m, edge.1).is_none());
            }
        }
        assert!((total_leaf_area(&tree) - 1.0).abs() < 1e-12);
    }

    // The corner leaf went five levels down
    let deepest = tree.leaf_cell_index().into_iter().map(|c| tree.cell_level(c)).max();
    assert_eq!(deepest, Some(5));
    assert_two_to_one(&tree);
}

#[test]
fn test_green_closure_produces_conforming_meshes() {
    let mut tree = tree(3, true);

    for round in 0..4 {
        let marked = corner_leaves(&tree);
        tree.refine(&marked);

        let mesh = tree.to_mesh();
        assert_conforming(&mesh);
        assert!((total_leaf_area(&tree) - 1.0).abs() < 1e-12, "round {round}");

        for c in tree.leaf_cell_index() {
            assert!(tree.hanging_edges(c).is_empty());
            if let Some(link) = tree.parent(c) {
                assert_eq!(tree.children(link.cell).as_slice()[link.slot], c);
            }
        }
    }
}

#[test]
fn test_leaf_mesh_round_trip() {
    // Green closure adds the two bisected neighbours of the refined corner
    for (green_closure, leaves) in [(true, 13), (false, 11)] {
        let mut tree = tree(2, green_closure);
        tree.refine(&[0]);
        assert_eq!(tree.leaf_cell_index().len(), leaves);
        assert_eq!(tree.number_of_nodes(), 12);
        tree.refine(&[10]);

        let mesh = tree.to_mesh();
        assert_eq!(mesh.number_of_cells(), tree.leaf_cell_index().len());
        assert!(mesh.cells.iter().flatten().all(|&v| v < mesh.number_of_nodes()));
        if green_closure {
            assert_conforming(&mesh);
        }

        let json = serde_json::to_string(&mesh).expect("serialize");
        let restored: TriangleMesh = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, mesh);

        // The leaf mesh seeds a fresh hierarchy of roots
        let rebuilt = Tritree::new(restored).expect("valid mesh");
        assert_eq!(rebuilt.number_of_cells(), mesh.number_of_cells());
        assert!(rebuilt.root_mask().iter().all(|&r| r));
    }
}

#[test]
fn test_default_tree_is_conforming_after_refinement() {
    let mut tree = Tritree::new(unit_square_triangles(3)).expect("valid mesh");
    for _ in 0..3 {
        let marked = corner_leaves(&tree);
        tree.refine(&marked);
        assert_conforming(&tree.to_mesh());
    }
}

#[test]
fn test_adaptive_loop_with_marking() {
    // Indicator concentrated at the origin
    let indicator = |mesh: &TriangleMesh| -> Vec<f64> {
        (0..mesh.number_of_cells())
            .map(|c| {
                let p = mesh.cell_barycenter(c);
                mesh.cell_area(c).sqrt() * (-20.0 * (p.x * p.x + p.y * p.y)).exp()
            })
            .collect()
    };

    let mut tree = tree(4, true);
    let mut previous_leaves = tree.leaf_cell_index().len();

    for step in 0..4 {
        let mesh = tree.to_mesh();
        let eta = indicator(&mesh);
        let positions = if step % 2 == 0 {
            doerfler_marking(&eta, 0.5)
        } else {
            maximum_marking(&eta, 0.5)
        };
        let leaves = tree.leaf_cell_index();
        let marked: Vec<usize> = positions.into_iter().map(|k| leaves[k]).collect();
        tree.refine(&marked);

        let current = tree.leaf_cell_index().len();
        assert!(current > previous_leaves, "step {step}");
        previous_leaves = current;
    }

    // The final conforming mesh is a valid finite element mesh
    let mesh = tree.to_mesh();
    assert_conforming(&mesh);
    let p = assemble_stiffness(&mesh, 1.0).to_csr();
    let f = assemble_load(&mesh, |_| 1.0);
    let is_bd = boundary_node_mask(&mesh);
    let uh = Array1::zeros(mesh.number_of_nodes());

    // Every node is a corner of some leaf
    assert!(p.diagonal().iter().all(|&d| d > 0.0));
    for (i, pt) in mesh.nodes.iter().enumerate() {
        assert_eq!(is_bd[i], on_square_boundary(pt));
    }

    let (a, f) = apply_dirichlet_rows(&p, &f, &uh, &is_bd);
    let solver = LinearElasticityFastSolver::new(a, &p, &is_bd, FastSolverConfig::default()).expect("setup");
    let result = solver.solve(&uh, &f).expect("solve");
    assert!(result.converged());
    assert!(result.uh.iter().copied().fold(f64::MIN, f64::max) > 0.0);
}
