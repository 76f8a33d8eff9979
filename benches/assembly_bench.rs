use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use sieve_form::algs::assembly::Assembler;
use sieve_form::algs::communicator::NoComm;
use sieve_form::fem::function_space::{ArgumentSpace, DofMapSpace};
use sieve_form::fem::form::VariationalForm;
use sieve_form::fem::kernel::{FormDescriptor, IntegralType, kernel_fn};
use sieve_form::la::factory::DenseFactory;
use sieve_form::la::scalar::ScalarTensor;
use sieve_form::topology::mesh::{Mesh, SimplexMesh};

fn triangle_area(x: &[f64]) -> f64 {
    0.5 * ((x[2] - x[0]) * (x[5] - x[1]) - (x[4] - x[0]) * (x[3] - x[1])).abs()
}

fn bench_functional(c: &mut Criterion) {
    let mut group = c.benchmark_group("area_functional");
    for &n in &[8usize, 32, 64] {
        let mesh: Arc<dyn Mesh> = Arc::new(SimplexMesh::unit_square(n, n).unwrap());
        let desc = FormDescriptor::new(0).integral(
            IntegralType::Cell,
            None,
            kernel_fn(|out, _, g, _| out[0] = triangle_area(g.coordinates)),
        );
        let mut form = VariationalForm::new(desc.into_shared(), vec![]).unwrap();
        form.set_mesh(mesh);
        let assembler = Assembler::default();
        group.bench_with_input(BenchmarkId::from_parameter(n), &form, |b, form| {
            let mut m = ScalarTensor::serial();
            b.iter(|| assembler.assemble(form, &mut m).unwrap())
        });
    }
    group.finish();
}

fn bench_mass_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("p1_mass_dense");
    for &n in &[4usize, 8, 16] {
        let mesh: Arc<dyn Mesh> = Arc::new(SimplexMesh::unit_square(n, n).unwrap());
        let v: Arc<dyn ArgumentSpace> = Arc::new(DofMapSpace::lagrange_p1(mesh).unwrap());
        let desc = FormDescriptor::new(2).integral(
            IntegralType::Cell,
            None,
            kernel_fn(|out, _, g, _| {
                let a = triangle_area(g.coordinates) / 12.0;
                for i in 0..3 {
                    for j in 0..3 {
                        out[3 * i + j] = if i == j { 2.0 * a } else { a };
                    }
                }
            }),
        );
        let form = VariationalForm::new(desc.into_shared(), vec![v.clone(), v]).unwrap();
        let factory = DenseFactory::new(Arc::new(NoComm));
        let assembler = Assembler::default();
        group.bench_with_input(BenchmarkId::from_parameter(n), &form, |b, form| {
            b.iter(|| assembler.assemble_new(&factory, form).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_functional, bench_mass_matrix);
criterion_main!(benches);
