use std::collections::BTreeMap;

use crate::{Error, Vector3D};

mod cell;
pub use self::cell::{UnitCell, CellShape};

#[cfg(test)]
pub(crate) mod test_utils;

/// Reference crystal structure: a primitive unit cell and the atoms it
/// contains.
///
/// Trajectories are compared against this structure replicated into a
/// supercell. Replicated arrays are always produced in "structure order": the
/// primitive atom (sublattice) index varies slowest, then the `z`, `y` and
/// finally `x` cell coordinates, which varies fastest.
#[derive(Clone, Debug)]
pub struct Structure {
    cell: UnitCell,
    types: Vec<i32>,
    masses: Vec<f64>,
    positions: Vec<Vector3D>,
}

impl Structure {
    /// Create a new empty structure with the given primitive unit cell
    pub fn new(cell: UnitCell) -> Structure {
        Structure {
            cell: cell,
            types: Vec::new(),
            masses: Vec::new(),
            positions: Vec::new(),
        }
    }

    /// Add an atom with the given atomic type, mass and Cartesian position to
    /// this structure.
    ///
    /// Atoms sharing the same `atomic_type` are considered symmetry
    /// equivalent, and are grouped together in the mean displacement tensor.
    pub fn add_atom(&mut self, atomic_type: i32, mass: f64, position: Vector3D) {
        self.types.push(atomic_type);
        self.masses.push(mass);
        self.positions.push(position);
    }

    /// Get the primitive unit cell of this structure
    pub fn cell(&self) -> UnitCell {
        self.cell
    }

    /// Get the number of atoms in the primitive cell
    pub fn size(&self) -> usize {
        self.types.len()
    }

    /// Get the atomic types of the atoms in the primitive cell
    pub fn types(&self) -> &[i32] {
        &self.types
    }

    /// Get the masses of the atoms in the primitive cell
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    /// Get the Cartesian positions of the atoms in the primitive cell
    pub fn positions(&self) -> &[Vector3D] {
        &self.positions
    }

    /// Get the number of different atom types in this structure
    pub fn number_of_atom_types(&self) -> usize {
        self.type_classes().len()
    }

    /// Get the index of the type class of each atom in the primitive cell.
    /// Type classes are numbered from 0, following the sorted atomic types.
    pub fn atom_type_index(&self) -> Vec<usize> {
        let classes = self.type_classes();
        return self.types.iter().map(|t| classes[t]).collect();
    }

    /// Get the number of atoms of the primitive cell in each type class
    pub fn atom_type_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.number_of_atom_types()];
        for index in self.atom_type_index() {
            counts[index] += 1;
        }
        return counts;
    }

    /// Get the number of atoms in the supercell given by `multiplier`
    pub fn supercell_size(&self, multiplier: [usize; 3]) -> usize {
        self.size() * multiplier.iter().product::<usize>()
    }

    /// Get the Cartesian positions of all atoms in the supercell given by
    /// `multiplier`, in structure order.
    pub fn supercell_positions(&self, multiplier: [usize; 3]) -> Result<Vec<Vector3D>, Error> {
        check_multiplier(multiplier)?;

        let mut positions = Vec::with_capacity(self.supercell_size(multiplier));
        for &position in &self.positions {
            for z in 0..multiplier[2] {
                for y in 0..multiplier[1] {
                    for x in 0..multiplier[0] {
                        let shift = Vector3D::new(x as f64, y as f64, z as f64);
                        positions.push(position + self.cell.cartesian(shift));
                    }
                }
            }
        }

        return Ok(positions);
    }

    /// Get the masses of all atoms in the supercell given by `multiplier`, in
    /// structure order.
    pub fn supercell_masses(&self, multiplier: [usize; 3]) -> Result<Vec<f64>, Error> {
        check_multiplier(multiplier)?;
        return Ok(replicate(&self.masses, multiplier));
    }

    /// Get the type class index of all atoms in the supercell given by
    /// `multiplier`, in structure order.
    pub fn supercell_atom_type_index(&self, multiplier: [usize; 3]) -> Result<Vec<usize>, Error> {
        check_multiplier(multiplier)?;
        return Ok(replicate(&self.atom_type_index(), multiplier));
    }

    fn type_classes(&self) -> BTreeMap<i32, usize> {
        let mut classes = BTreeMap::new();
        for &atomic_type in &self.types {
            classes.insert(atomic_type, 0);
        }

        for (index, class) in classes.values_mut().enumerate() {
            *class = index;
        }

        return classes;
    }
}

fn check_multiplier(multiplier: [usize; 3]) -> Result<(), Error> {
    if multiplier.iter().any(|&m| m == 0) {
        return Err(Error::InvalidParameter(format!(
            "supercell multiplier must be at least 1 in every direction, got {:?}",
            multiplier
        )));
    }
    Ok(())
}

/// Repeat each value once per cell of the supercell
fn replicate<T: Clone>(values: &[T], multiplier: [usize; 3]) -> Vec<T> {
    let n_cells = multiplier.iter().product::<usize>();
    let mut result = Vec::with_capacity(values.len() * n_cells);
    for value in values {
        result.extend(std::iter::repeat(value.clone()).take(n_cells));
    }
    return result;
}
