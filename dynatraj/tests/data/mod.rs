#![allow(dead_code)]

use serde_json::Value;
use ndarray::Array3;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use dynatraj::{IndexingScheme, Matrix3, Structure, UnitCell, Vector3D};

pub fn load_structure(name: &str) -> Structure {
    let json = std::fs::read_to_string("tests/data/structures.json")
        .expect("failed to read structures file");

    let data: Value = serde_json::from_str(&json).expect("failed to parse JSON");
    let data = &data[name];
    assert!(!data.is_null(), "unknown structure {}", name);

    let mut structure = Structure::new(read_cell(&data["cell"]));
    for atom in data["atoms"].as_array().expect("atoms must be an array") {
        let atomic_type = atom["type"].as_i64().expect("type must be an integer") as i32;
        let mass = atom["mass"].as_f64().expect("mass must be a number");
        let position = atom["position"].as_array().expect("position must be an array");
        let position = Vector3D::new(
            position[0].as_f64().unwrap(),
            position[1].as_f64().unwrap(),
            position[2].as_f64().unwrap(),
        );

        structure.add_atom(atomic_type, mass, position);
    }

    return structure;
}

fn read_cell(cell: &Value) -> UnitCell {
    let cell = cell.as_array().expect("cell must be an array");
    let matrix = Matrix3::new([
        [cell[0].as_f64().unwrap(), cell[1].as_f64().unwrap(), cell[2].as_f64().unwrap()],
        [cell[3].as_f64().unwrap(), cell[4].as_f64().unwrap(), cell[5].as_f64().unwrap()],
        [cell[6].as_f64().unwrap(), cell[7].as_f64().unwrap(), cell[8].as_f64().unwrap()],
    ]);

    UnitCell::new(matrix).expect("invalid cell")
}

/// Positions of the atoms in a `size` supercell of `structure`, flattened
/// following `scheme`
pub fn positions_in_scheme(structure: &Structure, size: [usize; 3], scheme: IndexingScheme) -> Vec<Vector3D> {
    let cell = structure.cell();
    (0..structure.supercell_size(size)).map(|i| {
        let site = scheme.site(i, size, structure.size());
        let shift = Vector3D::new(site.cell[0] as f64, site.cell[1] as f64, site.cell[2] as f64);
        structure.positions()[site.sublattice] + cell.cartesian(shift)
    }).collect()
}

/// Generate a `(frames, atoms, 3)` trajectory with atoms vibrating randomly
/// around `reference`, with maximal displacement `amplitude` in each direction
pub fn thermal_trajectory(reference: &[Vector3D], n_frames: usize, amplitude: f64, seed: u64) -> Array3<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut trajectory = Array3::zeros((n_frames, reference.len(), 3));
    for frame in 0..n_frames {
        for (atom, position) in reference.iter().enumerate() {
            for d in 0..3 {
                let noise = if amplitude > 0.0 { rng.gen_range(-amplitude..amplitude) } else { 0.0 };
                trajectory[[frame, atom, d]] = position[d] + noise;
            }
        }
    }
    return trajectory;
}

/// Wrap all positions in `trajectory` inside `cell`
pub fn wrap(trajectory: &mut Array3<f64>, cell: &UnitCell) {
    for mut frame in trajectory.outer_iter_mut() {
        for mut atom in frame.outer_iter_mut() {
            let mut position = Vector3D::new(atom[0], atom[1], atom[2]);
            cell.wrap_vector(&mut position);
            atom[0] = position[0];
            atom[1] = position[1];
            atom[2] = position[2];
        }
    }
}
