use crate::{Matrix3, Vector3D};
use super::{UnitCell, Structure};

pub fn test_structure(name: &str) -> Structure {
    match name {
        "CsCl" => get_cscl(),
        "NaCl" => get_nacl(),
        "Si" => get_si(),
        "chain" => get_chain(),
        "simple-cubic" => get_simple_cubic(),
        _ => panic!("unknown test structure {}", name)
    }
}

/// CsCl structure
/// This structure is simple since the primitive unit cell
/// is just the usual cubic cell with side length set to one.
fn get_cscl() -> Structure {
    let mut structure = Structure::new(UnitCell::cubic(1.0));
    structure.add_atom(17, 35.453, Vector3D::new(0.0, 0.0, 0.0));
    structure.add_atom(55, 132.905, Vector3D::new(0.5, 0.5, 0.5));
    return structure;
}

/// NaCl structure
/// Using a primitive unit cell, the distance between the
/// closest Na-Cl pair is exactly 1. The cubic unit cell
/// in these units would have a length of 2.
fn get_nacl() -> Structure {
    let cell = Matrix3::new([[0.0, 1.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 0.0]]);
    let mut structure = Structure::new(UnitCell::from(cell));
    structure.add_atom(11, 22.990, Vector3D::new(0.0, 0.0, 0.0));
    structure.add_atom(17, 35.453, Vector3D::new(1.0, 0.0, 0.0));
    return structure;
}

/// Conventional diamond silicon, with 8 symmetry equivalent atoms
fn get_si() -> Structure {
    let mut structure = Structure::new(UnitCell::cubic(5.431));
    let fractional = [
        [0.0, 0.0, 0.0], [0.0, 0.5, 0.5], [0.5, 0.0, 0.5], [0.5, 0.5, 0.0],
        [0.25, 0.25, 0.25], [0.25, 0.75, 0.75], [0.75, 0.25, 0.75], [0.75, 0.75, 0.25],
    ];
    for position in fractional {
        structure.add_atom(14, 28.086, Vector3D::from(position) * 5.431);
    }
    return structure;
}

/// Two different atoms in an orthorhombic cell, elongated along x
fn get_chain() -> Structure {
    let mut structure = Structure::new(UnitCell::orthorhombic(4.0, 3.0, 3.0));
    structure.add_atom(1, 1.0, Vector3D::new(0.5, 0.5, 0.5));
    structure.add_atom(2, 4.0, Vector3D::new(2.5, 1.5, 1.5));
    return structure;
}

/// A single atom in a cubic cell of side length one
fn get_simple_cubic() -> Structure {
    let mut structure = Structure::new(UnitCell::cubic(1.0));
    structure.add_atom(84, 208.98, Vector3D::new(0.25, 0.25, 0.25));
    return structure;
}
