#![allow(dead_code)]
use std::sync::Arc;

use sieve_form::algs::communicator::RayonComm;
use sieve_form::fem::function_space::{ArgumentSpace, DofMapSpace};
use sieve_form::fem::kernel::EntityGeometry;
use sieve_form::topology::mesh::{Mesh, SimplexMesh};
use sieve_form::topology::point::PointId;

pub fn pid(u: u64) -> PointId {
    PointId::new(u).unwrap()
}

/// Run `f` once per rank of a fresh in-process group; results ordered by rank.
pub fn run_ranks<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(RayonComm) -> T + Sync,
{
    let f = &f;
    std::thread::scope(|s| {
        let handles: Vec<_> = RayonComm::world(n)
            .into_iter()
            .map(|comm| s.spawn(move || f(comm)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank thread panicked"))
            .collect()
    })
}

pub fn interval(n: usize, a: f64, b: f64) -> Arc<dyn Mesh> {
    Arc::new(SimplexMesh::interval(n, a, b).unwrap())
}

pub fn unit_square(nx: usize, ny: usize) -> Arc<dyn Mesh> {
    Arc::new(SimplexMesh::unit_square(nx, ny).unwrap())
}

pub fn p1(mesh: &Arc<dyn Mesh>) -> Arc<dyn ArgumentSpace> {
    Arc::new(DofMapSpace::lagrange_p1(Arc::clone(mesh)).unwrap())
}

/// Space with `dofs` dofs on every cell, numbered cell by cell.
pub fn fixed_dofs(mesh: &Arc<dyn Mesh>, dofs: usize) -> Arc<dyn ArgumentSpace> {
    let cells = mesh.num_entities(mesh.topological_dim());
    Arc::new(DofMapSpace::new(Arc::clone(mesh), dofs, (0..cells * dofs).collect()).unwrap())
}

/// Measure of the simplex whose vertex coordinates are in `g`.
pub fn cell_measure(g: &EntityGeometry<'_>) -> f64 {
    let x = g.coordinates;
    match x.len() {
        2 => (x[1] - x[0]).abs(),
        6 => 0.5 * ((x[2] - x[0]) * (x[5] - x[1]) - (x[4] - x[0]) * (x[3] - x[1])).abs(),
        n => panic!("unsupported cell with {n} coordinates"),
    }
}

/// Length of the triangle edge opposite local vertex `g.local_facet`.
pub fn facet_length(g: &EntityGeometry<'_>) -> f64 {
    let x = g.coordinates;
    let i = g.local_facet.expect("facet kernel without local facet");
    let (a, b) = match i {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    };
    let (dx, dy) = (x[2 * b] - x[2 * a], x[2 * b + 1] - x[2 * a + 1]);
    (dx * dx + dy * dy).sqrt()
}

pub fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-12, "{a} != {b}");
}
