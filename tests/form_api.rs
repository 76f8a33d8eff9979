mod util;
use util::*;

use std::sync::Arc;

use sieve_form::fem::form::{NameListResolver, VariationalForm};
use sieve_form::fem::kernel::{FormDescriptor, IntegralType, kernel_fn};
use sieve_form::fem_error::FemError;
use sieve_form::topology::markers::DomainMarkers;

#[test]
fn rank_matches_number_of_spaces() {
    let mesh = interval(2, 0.0, 1.0);
    let v = p1(&mesh);
    for r in 0..=2usize {
        let spaces = vec![v.clone(); r];
        let mut form = VariationalForm::new(FormDescriptor::new(r).into_shared(), spaces).unwrap();
        if r == 0 {
            form.set_mesh(mesh.clone());
        }
        assert_eq!(form.rank(), r);
        assert!(form.mesh().is_ok());
    }
}

#[test]
fn mismatched_space_count_is_a_configuration_error() {
    let mesh = interval(2, 0.0, 1.0);
    let v = p1(&mesh);
    for (r, n) in [(0usize, 1usize), (1, 0), (1, 2), (2, 1)] {
        let err = VariationalForm::new(FormDescriptor::new(r).into_shared(), vec![v.clone(); n])
            .unwrap_err();
        assert!(matches!(err, FemError::Configuration(_)), "rank {r}, {n} spaces");
    }
}

#[test]
fn function_space_index_is_checked() {
    let mesh = interval(2, 0.0, 1.0);
    let form = VariationalForm::new(FormDescriptor::new(1).into_shared(), vec![p1(&mesh)]).unwrap();
    assert!(form.function_space(0).is_ok());
    assert_eq!(
        form.function_space(1).unwrap_err(),
        FemError::IndexOutOfRange {
            what: "argument",
            index: 1,
            len: 1
        }
    );
}

#[test]
fn max_element_tensor_size_is_product_of_dofs() {
    let mesh = interval(1, 0.0, 1.0);
    let functional = VariationalForm::new(FormDescriptor::new(0).into_shared(), vec![]).unwrap();
    assert_eq!(functional.max_element_tensor_size(), 1);

    let test = fixed_dofs(&mesh, 3);
    let trial = fixed_dofs(&mesh, 4);
    let desc = FormDescriptor::new(2).integral(
        IntegralType::InteriorFacet,
        None,
        kernel_fn(|_, _, _, _| {}),
    );
    let a = VariationalForm::new(desc.into_shared(), vec![test, trial]).unwrap();
    assert_eq!(a.max_element_tensor_size(), 12);
    assert_eq!(a.max_element_tensor_size_for(IntegralType::InteriorFacet), 48);
    assert_eq!(a.max_element_tensor_size_for(IntegralType::Cell), 0);
}

#[test]
fn coefficient_lookup_round_trips() {
    let desc = FormDescriptor::new(0)
        .coefficient("kappa")
        .coefficient_at("f", 2)
        .coefficient("g");
    let form = VariationalForm::new(desc.into_shared(), vec![]).unwrap();
    for i in 0..3 {
        let name = form.get_coefficient_name(i).unwrap();
        assert_eq!(form.get_coefficient_index(&name).unwrap(), i);
    }
    for name in ["kappa", "f", "g"] {
        let i = form.get_coefficient_index(name).unwrap();
        assert_eq!(form.get_coefficient_name(i).unwrap(), name);
    }
    assert_eq!(form.original_coefficient_position(1).unwrap(), 2);
    assert_eq!(
        form.get_coefficient_index("missing"),
        Err(FemError::CoefficientNotFound("missing".into()))
    );
    assert_eq!(
        form.get_coefficient_name(3),
        Err(FemError::CoefficientIndexNotFound(3))
    );
    assert!(matches!(
        form.original_coefficient_position(3),
        Err(FemError::IndexOutOfRange { .. })
    ));
}

#[test]
fn inconsistent_descriptors_are_rejected() {
    let long_mask = FormDescriptor::new(0).coefficient("f").integral_with(
        IntegralType::Cell,
        None,
        kernel_fn(|_, _, _, _| {}),
        Some(vec![true, true, true]),
    );
    assert!(matches!(
        VariationalForm::new(long_mask.into_shared(), vec![]),
        Err(FemError::Configuration(_))
    ));

    let duplicate = FormDescriptor::new(0).coefficient("f").coefficient("f");
    assert!(matches!(
        VariationalForm::new(duplicate.into_shared(), vec![]),
        Err(FemError::Configuration(_))
    ));
}

#[test]
fn resolver_is_used_exclusively_once_installed() {
    let desc = FormDescriptor::new(0).coefficient("kappa").coefficient("f");
    let mut form = VariationalForm::new(desc.into_shared(), vec![]).unwrap();
    form.set_coefficient_resolver(Arc::new(NameListResolver::new(["rho"])));
    assert_eq!(form.get_coefficient_index("rho").unwrap(), 0);
    assert!(form.get_coefficient_index("kappa").is_err());
    assert_eq!(form.get_coefficient_name(0).unwrap(), "rho");
    assert!(form.get_coefficient_name(1).is_err());

    form.clear_coefficient_resolver();
    assert_eq!(form.get_coefficient_index("f").unwrap(), 1);
}

#[test]
fn unset_domains_are_the_no_markers_sentinel() {
    let mesh = interval(3, 0.0, 1.0);
    let mut form =
        VariationalForm::new(FormDescriptor::new(1).into_shared(), vec![p1(&mesh)]).unwrap();
    assert!(form.cell_domains().is_none());
    assert!(form.exterior_facet_domains().is_none());
    assert!(form.interior_facet_domains().is_none());
    assert!(form.vertex_domains().is_none());

    let markers = Arc::new(DomainMarkers::from_pairs(1, [(pid(1), 4), (pid(2), 5)]));
    form.set_cell_domains(Some(markers.clone()));
    assert_eq!(form.cell_domains().unwrap().get(pid(2)), Some(5));
    assert!(Arc::ptr_eq(form.cell_domains().unwrap(), &markers));

    let replacement = Arc::new(DomainMarkers::from_pairs(1, [(pid(3), 1)]));
    form.set_cell_domains(Some(replacement));
    assert_eq!(form.cell_domains().unwrap().get(pid(2)), None);

    form.set_cell_domains(None);
    assert!(form.cell_domains().is_none());
}

#[test]
fn explicit_mesh_takes_precedence() {
    let m1 = interval(2, 0.0, 1.0);
    let m2 = interval(5, 0.0, 1.0);
    let mut form = VariationalForm::new(FormDescriptor::new(1).into_shared(), vec![p1(&m1)]).unwrap();
    assert_eq!(form.mesh().unwrap().num_entities(1), 2);
    form.set_mesh(m2);
    assert_eq!(form.mesh().unwrap().num_entities(1), 5);
}

#[test]
fn forms_are_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<VariationalForm>();
}
