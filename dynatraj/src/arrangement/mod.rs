//! Matching the order of atoms in a trajectory with the order of atoms in a
//! reference structure.
//!
//! Simulation engines replicate the primitive cell and store the resulting
//! atoms in a flat list, using their own convention for the order of cells
//! and atoms inside the cells. The [`ArrangementResolver`] finds which of the
//! known [`IndexingScheme`] explains best the positions of the atoms in a
//! trajectory, and builds the permutation bringing the trajectory back to the
//! structure order.
use std::collections::{HashMap, VecDeque};

use log::{info, warn};
use ndarray::{Array3, ArrayView3, Axis};
use rand::Rng;

use crate::{Error, Structure, Vector3D};

mod schemes;
pub use self::schemes::{IndexingScheme, LatticeSite};

/// Default threshold on the residual error of the best scheme above which a
/// warning is emitted
pub const DEFAULT_ARRANGEMENT_THRESHOLD: f64 = 2.0;

/// Default number of frames used to compute averaged positions
pub const DEFAULT_ARRANGEMENT_SAMPLES: usize = 1000;

/// A permutation of the atoms in a trajectory. Applying it to trajectory data
/// in the engine order gives data in the structure order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrangement {
    indices: Vec<usize>,
}

impl Arrangement {
    /// Create a new arrangement from the given `indices`, where `indices[i]`
    /// is the position in the engine order of the i-th atom in structure
    /// order. The indices must be a permutation of `0..indices.len()`.
    pub fn new(indices: Vec<usize>) -> Result<Arrangement, Error> {
        let mut seen = vec![false; indices.len()];
        for &index in &indices {
            if index >= indices.len() || seen[index] {
                return Err(Error::InvalidParameter(format!(
                    "arrangement indices are not a permutation of 0..{}", indices.len()
                )));
            }
            seen[index] = true;
        }
        return Ok(Arrangement { indices });
    }

    /// Get the indices of this permutation
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Get the number of atoms in this permutation
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check if this permutation is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Get the inverse permutation, going from structure order to engine
    /// order.
    pub fn inverse(&self) -> Arrangement {
        let mut inverse = vec![0; self.indices.len()];
        for (i, &index) in self.indices.iter().enumerate() {
            inverse[index] = i;
        }
        return Arrangement { indices: inverse };
    }

    /// Re-order the atoms (second axis) of a `(frames, atoms, 3)` array.
    pub fn apply(&self, trajectory: ArrayView3<'_, f64>) -> Result<Array3<f64>, Error> {
        if trajectory.shape()[1] != self.len() {
            return Err(Error::InvalidParameter(format!(
                "trajectory contains {} atoms, but the arrangement is for {} atoms",
                trajectory.shape()[1], self.len()
            )));
        }
        return Ok(trajectory.select(Axis(1), &self.indices));
    }

    /// Re-order the atoms in a single frame
    pub fn apply_frame(&self, frame: &[Vector3D]) -> Result<Vec<Vector3D>, Error> {
        if frame.len() != self.len() {
            return Err(Error::InvalidParameter(format!(
                "frame contains {} atoms, but the arrangement is for {} atoms",
                frame.len(), self.len()
            )));
        }
        return Ok(self.indices.iter().map(|&i| frame[i]).collect());
    }
}

/// Result of the arrangement resolution
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The scheme which explains best the order of atoms
    pub scheme: IndexingScheme,
    /// Residual error of the selected scheme
    pub error: f64,
    /// Residual error for each scheme in `IndexingScheme::ALL`
    pub errors: Vec<f64>,
    /// Size of the supercell estimated from the atomic positions
    pub cell_size: [usize; 3],
    /// Permutation to apply to the trajectory, `None` if the trajectory is
    /// already in structure order.
    pub permutation: Option<Arrangement>,
}

/// Find the order of atoms in a trajectory by comparing it with a reference
/// structure.
#[derive(Debug, Clone)]
pub struct ArrangementResolver {
    /// Residual error above which the resolution is considered unreliable
    pub threshold: f64,
}

impl Default for ArrangementResolver {
    fn default() -> ArrangementResolver {
        ArrangementResolver {
            threshold: DEFAULT_ARRANGEMENT_THRESHOLD,
        }
    }
}

impl ArrangementResolver {
    /// Create a new resolver using the given error `threshold`
    pub fn new(threshold: f64) -> ArrangementResolver {
        ArrangementResolver { threshold }
    }

    /// Resolve the order of atoms, using one (averaged) Cartesian position for
    /// each atom in the simulation.
    #[time_graph::instrument(name = "ArrangementResolver::resolve")]
    pub fn resolve(&self, reference: &[Vector3D], structure: &Structure) -> Result<Resolution, Error> {
        let atoms_per_cell = structure.size();
        if atoms_per_cell == 0 {
            return Err(Error::InvalidParameter(
                "the reference structure does not contain any atom".into()
            ));
        }

        if reference.is_empty() {
            return Err(Error::InvalidParameter(
                "can not resolve the arrangement of an empty trajectory".into()
            ));
        }

        // integer part of the fractional coordinates, i.e. index of the cell
        let cell = structure.cell();
        let unit_coordinates = reference.iter()
            .map(|&position| cell.fractional(position).map(f64::trunc))
            .collect::<Vec<_>>();

        let cell_size = estimate_cell_size(&unit_coordinates);

        let mut errors = Vec::with_capacity(IndexingScheme::ALL.len());
        for &scheme in IndexingScheme::ALL {
            let mut squared = Vector3D::zero();
            for (i, coordinates) in unit_coordinates.iter().enumerate() {
                let site = scheme.site(i, cell_size, atoms_per_cell);
                let expected = Vector3D::new(site.cell[0] as f64, site.cell[1] as f64, site.cell[2] as f64);
                squared += (expected - coordinates).map(|d| d * d);
            }
            squared /= unit_coordinates.len() as f64;
            errors.push(squared.norm());
        }

        let mut best = 0;
        for (index, &error) in errors.iter().enumerate() {
            if error < errors[best] {
                best = index;
            }
        }
        let scheme = IndexingScheme::ALL[best];

        if errors[best] > self.threshold {
            warn!(
                "something is wrong with the order of atoms, the computation will probably fail \
                (residual errors for each scheme: {:?})", errors
            );
        }

        if best == 0 {
            return Ok(Resolution {
                scheme: scheme,
                error: errors[best],
                errors: errors,
                cell_size: cell_size,
                permutation: None,
            });
        }

        if scheme.is_experimental() {
            warn!("using alternative atoms order '{}' (experimental, untested)", scheme.name());
        } else {
            info!("using alternative atoms order '{}'", scheme.name());
        }

        let n_atoms = unit_coordinates.len();
        let permutation = match_orders(IndexingScheme::ALL[0], scheme, n_atoms, cell_size, atoms_per_cell)?;

        return Ok(Resolution {
            scheme: scheme,
            error: errors[best],
            errors: errors,
            cell_size: cell_size,
            permutation: Some(permutation),
        });
    }
}

/// Estimate the size of the supercell from the average cell index along each
/// direction. For a full `n` cells replica, the average index is `(n - 1) / 2`.
fn estimate_cell_size(unit_coordinates: &[Vector3D]) -> [usize; 3] {
    let mut mean = Vector3D::zero();
    for coordinates in unit_coordinates {
        mean += coordinates;
    }
    mean /= unit_coordinates.len() as f64;

    let estimate = |m: f64| usize::max(f64::round(2.0 * m + 1.0) as usize, 1);
    return [estimate(mean[0]), estimate(mean[1]), estimate(mean[2])];
}

/// Build the permutation `P` such that `source[P[i]] == target[i]` for all
/// atoms, where `target` and `source` are the lattice sites produced by the
/// two schemes. Every target site consumes the first source atom with the
/// same site that was not matched already.
fn match_orders(
    target: IndexingScheme,
    source: IndexingScheme,
    n_atoms: usize,
    cell_size: [usize; 3],
    atoms_per_cell: usize,
) -> Result<Arrangement, Error> {
    let mut available = HashMap::<LatticeSite, VecDeque<usize>>::new();
    for i in 0..n_atoms {
        let site = source.site(i, cell_size, atoms_per_cell);
        available.entry(site).or_default().push_back(i);
    }

    let mut indices = Vec::with_capacity(n_atoms);
    for i in 0..n_atoms {
        let site = target.site(i, cell_size, atoms_per_cell);
        let matched = available.get_mut(&site).and_then(VecDeque::pop_front);
        match matched {
            Some(index) => indices.push(index),
            None => {
                return Err(Error::Arrangement(format!(
                    "no atom matches the lattice site {:?} (atom {} in structure order) \
                    when converting from '{}' to '{}' order",
                    site, i, source.name(), target.name()
                )));
            }
        }
    }

    return Arrangement::new(indices);
}

/// Average the positions of the atoms over a random sample of frames (drawn
/// with replacement) in a `(frames, atoms, 3)` trajectory.
pub fn averaged_positions(
    trajectory: ArrayView3<'_, f64>,
    samples: usize,
    rng: &mut impl Rng,
) -> Result<Vec<Vector3D>, Error> {
    let frames = crate::derived::sample_frames(trajectory.shape()[0], samples, rng)?;

    let mut positions = vec![Vector3D::zero(); trajectory.shape()[1]];
    for &frame in &frames {
        for (atom, position) in trajectory.index_axis(Axis(0), frame).outer_iter().enumerate() {
            positions[atom] += Vector3D::new(position[0], position[1], position[2]);
        }
    }

    for position in &mut positions {
        *position /= frames.len() as f64;
    }

    return Ok(positions);
}

/// Check that the atoms in `trajectory` are in structure order, and re-order
/// them if needed. This returns the re-ordered trajectory together with the
/// arrangement resolution.
pub fn check_trajectory_structure(
    trajectory: Array3<f64>,
    structure: &Structure,
    resolver: &ArrangementResolver,
    samples: usize,
    rng: &mut impl Rng,
) -> Result<(Array3<f64>, Resolution), Error> {
    let reference = averaged_positions(trajectory.view(), samples, rng)?;
    let resolution = resolver.resolve(&reference, structure)?;

    let trajectory = match resolution.permutation {
        Some(ref permutation) => permutation.apply(trajectory.view())?,
        None => trajectory,
    };

    return Ok((trajectory, resolution));
}
