use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use ndarray::{s, Array3, ArrayView3};

use crate::arrangement::{check_trajectory_structure, ArrangementResolver, Resolution};
use crate::derived::{average_positions, average_time_step, finite_difference_velocity_into};
use crate::derived::{mass_weighted_velocity_into, mean_displacement_matrix};
use crate::displacements::{check_trajectory_shape, relative_trajectory_into};
use crate::storage::{scratch_directory, ArrayStorage, Storage};
use crate::supercell::infer_supercell;
use crate::{DynamicsOptions, Error, Matrix3, Structure, UnitCell, Vector3D};

/// State of a lazily computed quantity
#[derive(Debug, Clone, Default)]
pub enum Derived<T> {
    /// The value was never computed
    #[default]
    Uncomputed,
    /// The value is computed and up to date
    Cached(T),
    /// The value was computed, but the data it depends on changed since then
    Invalidated,
}

impl<T> Derived<T> {
    /// Is there an up to date value?
    pub fn is_cached(&self) -> bool {
        matches!(self, Derived::Cached(_))
    }

    /// Was the value discarded because the underlying data changed?
    pub fn is_invalidated(&self) -> bool {
        matches!(self, Derived::Invalidated)
    }

    /// Get the cached value, if any
    pub fn get(&self) -> Option<&T> {
        match self {
            Derived::Cached(value) => Some(value),
            Derived::Uncomputed | Derived::Invalidated => None,
        }
    }

    /// Get the cached value, calling `init` to compute it if needed
    pub fn get_or_try_init(&mut self, init: impl FnOnce() -> Result<T, Error>) -> Result<&T, Error> {
        if !self.is_cached() {
            *self = Derived::Cached(init()?);
        }
        return self.value();
    }

    /// Discard the cached value, if any
    pub fn invalidate(&mut self) {
        if self.is_cached() {
            *self = Derived::Invalidated;
        }
    }

    fn store(&mut self, value: T) {
        *self = Derived::Cached(value);
    }

    fn value(&self) -> Result<&T, Error> {
        self.get().ok_or_else(|| Error::Internal("derived quantity used before being computed".into()))
    }
}

/// The result of a molecular dynamics simulation, reconciled with a reference
/// crystal structure.
///
/// The trajectory is stored in structure order: if the atoms were given in a
/// different order, they are re-ordered once when creating the `Dynamics`.
/// All the other quantities (relative trajectory, velocities, mean
/// displacement matrix, ...) are computed on first access and cached until
/// the data they depend on changes.
#[derive(Debug)]
pub struct Dynamics {
    structure: Option<Arc<Structure>>,
    trajectory: Option<Array3<f64>>,
    velocity: Option<Array3<f64>>,
    energy: Option<Vec<f64>>,
    time: Option<Vec<f64>>,
    simulation_cell: Option<UnitCell>,
    options: DynamicsOptions,
    storage: Storage,
    resolution: Option<Resolution>,

    time_step_average: Derived<f64>,
    supercell_matrix: Derived<[usize; 3]>,
    derived_velocity: Derived<ArrayStorage>,
    velocity_mass_average: Derived<ArrayStorage>,
    relative_trajectory: Derived<ArrayStorage>,
    mean_displacement_matrix: Derived<Vec<Matrix3>>,
}

/// Builder for [`Dynamics`]. All the data is optional, but most derived
/// quantities require at least a structure, a trajectory (or velocity), a
/// simulation cell and time values.
#[derive(Debug, Default)]
pub struct DynamicsBuilder {
    structure: Option<Arc<Structure>>,
    trajectory: Option<Array3<f64>>,
    velocity: Option<Array3<f64>>,
    energy: Option<Vec<f64>>,
    time: Option<Vec<f64>>,
    simulation_cell: Option<UnitCell>,
    options: DynamicsOptions,
    resolution: Option<Resolution>,
}

impl DynamicsBuilder {
    /// Create a new empty builder, using default options
    pub fn new() -> DynamicsBuilder {
        DynamicsBuilder::default()
    }

    /// Set the reference structure
    pub fn structure(mut self, structure: Arc<Structure>) -> DynamicsBuilder {
        self.structure = Some(structure);
        self
    }

    /// Set the atomic positions, as a `(frames, atoms, 3)` array
    pub fn trajectory(mut self, trajectory: Array3<f64>) -> DynamicsBuilder {
        self.trajectory = Some(trajectory);
        self
    }

    /// Set the atomic velocities, as a `(frames, atoms, 3)` array in the same
    /// atoms order as the trajectory
    pub fn velocity(mut self, velocity: Array3<f64>) -> DynamicsBuilder {
        self.velocity = Some(velocity);
        self
    }

    /// Set the potential energy for each frame
    pub fn energy(mut self, energy: Vec<f64>) -> DynamicsBuilder {
        self.energy = Some(energy);
        self
    }

    /// Set the time of each frame
    pub fn time(mut self, time: Vec<f64>) -> DynamicsBuilder {
        self.time = Some(time);
        self
    }

    /// Set the periodic cell used in the simulation
    pub fn simulation_cell(mut self, cell: UnitCell) -> DynamicsBuilder {
        self.simulation_cell = Some(cell);
        self
    }

    pub fn options(mut self, options: DynamicsOptions) -> DynamicsBuilder {
        self.options = options;
        self
    }

    /// Use an existing arrangement resolution, the trajectory and velocity
    /// must already be in structure order.
    pub(crate) fn resolved(mut self, resolution: Resolution) -> DynamicsBuilder {
        self.resolution = Some(resolution);
        self
    }

    /// Validate the data, resolve the order of atoms and create the
    /// [`Dynamics`].
    pub fn build(self) -> Result<Dynamics, Error> {
        self.options.validate()?;

        let mut n_frames = None;
        if let Some(ref trajectory) = self.trajectory {
            check_trajectory_shape(trajectory.view(), "trajectory")?;
            n_frames = Some(trajectory.shape()[0]);
        }

        let mut velocity = self.velocity;
        if let Some(ref velocity) = velocity {
            check_trajectory_shape(velocity.view(), "velocity")?;
            if let Some(ref trajectory) = self.trajectory {
                if trajectory.shape() != velocity.shape() {
                    return Err(Error::InvalidParameter(format!(
                        "velocity shape {:?} does not match the trajectory shape {:?}",
                        velocity.shape(), trajectory.shape()
                    )));
                }
            }
            n_frames = Some(velocity.shape()[0]);
        }

        if let Some(n_frames) = n_frames {
            check_series_length(self.energy.as_deref(), n_frames, "energy")?;
            check_series_length(self.time.as_deref(), n_frames, "time")?;
        }

        if self.structure.is_none() {
            warn!("creating dynamics without a reference structure, most derived quantities will not be available");
        }

        let mut resolution = self.resolution;
        let trajectory = match (&self.structure, self.trajectory) {
            (Some(structure), Some(trajectory)) if resolution.is_none() => {
                let resolver = ArrangementResolver::new(self.options.arrangement_threshold);
                let (trajectory, result) = check_trajectory_structure(
                    trajectory,
                    structure,
                    &resolver,
                    self.options.arrangement_samples,
                    &mut rand::thread_rng(),
                )?;

                if let Some(ref permutation) = result.permutation {
                    if let Some(ref mut velocity) = velocity {
                        *velocity = permutation.apply(velocity.view())?;
                    }
                }

                resolution = Some(result);
                Some(trajectory)
            }
            (_, trajectory) => trajectory,
        };

        let storage = if self.options.memmap {
            Storage::mapped(scratch_directory(self.options.scratch_directory.as_deref()))
        } else {
            Storage::memory()
        };

        return Ok(Dynamics {
            structure: self.structure,
            trajectory: trajectory,
            velocity: velocity,
            energy: self.energy,
            time: self.time,
            simulation_cell: self.simulation_cell,
            options: self.options,
            storage: storage,
            resolution: resolution,
            time_step_average: Derived::Uncomputed,
            supercell_matrix: Derived::Uncomputed,
            derived_velocity: Derived::Uncomputed,
            velocity_mass_average: Derived::Uncomputed,
            relative_trajectory: Derived::Uncomputed,
            mean_displacement_matrix: Derived::Uncomputed,
        });
    }
}

fn check_series_length(series: Option<&[f64]>, n_frames: usize, name: &str) -> Result<(), Error> {
    if let Some(series) = series {
        if series.len() != n_frames {
            return Err(Error::InvalidParameter(format!(
                "{} contains {} values, but there are {} frames", name, series.len(), n_frames
            )));
        }
    }
    Ok(())
}

impl Dynamics {
    /// Start building a new `Dynamics`
    pub fn builder() -> DynamicsBuilder {
        DynamicsBuilder::new()
    }

    /// Get the options used by this `Dynamics`
    pub fn options(&self) -> &DynamicsOptions {
        &self.options
    }

    /// Get the reference structure, if any
    pub fn structure(&self) -> Option<&Arc<Structure>> {
        self.structure.as_ref()
    }

    /// Get the result of the atoms order resolution. This is `None` if no
    /// trajectory or no structure were given at construction.
    pub fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    /// Get the simulation cell, if any
    pub fn simulation_cell(&self) -> Option<UnitCell> {
        self.simulation_cell
    }

    /// Get the time of each frame, if any
    pub fn time(&self) -> Option<&[f64]> {
        self.time.as_deref()
    }

    /// Get the potential energy of each frame, if any
    pub fn energy(&self) -> Option<&[f64]> {
        self.energy.as_deref()
    }

    /// Get the number of frames in the trajectory or velocity
    pub fn number_of_frames(&self) -> Option<usize> {
        self.trajectory.as_ref()
            .or(self.velocity.as_ref())
            .map(|array| array.shape()[0])
    }

    /// Get the atomic positions, in structure order
    pub fn trajectory(&self) -> Result<ArrayView3<'_, f64>, Error> {
        match self.trajectory {
            Some(ref trajectory) => Ok(trajectory.view()),
            None => Err(Error::MissingData("no trajectory was provided".into())),
        }
    }

    /// Get the atomic velocities. If no velocity was provided, they are
    /// computed from the relative trajectory with finite differences.
    pub fn velocity(&mut self) -> Result<ArrayView3<'_, f64>, Error> {
        if self.velocity.is_none() {
            self.compute_derived_velocity()?;
        }

        match self.velocity {
            Some(ref velocity) => Ok(velocity.view()),
            None => Ok(self.derived_velocity.value()?.view()),
        }
    }

    /// Get the atomic velocities multiplied by the square root of the atomic
    /// masses
    pub fn velocity_mass_average(&mut self) -> Result<ArrayView3<'_, f64>, Error> {
        self.compute_velocity_mass_average()?;
        return Ok(self.velocity_mass_average.value()?.view());
    }

    /// Get the displacement of each atom from its equilibrium position,
    /// continuous across periodic boundaries
    pub fn relative_trajectory(&mut self) -> Result<ArrayView3<'_, f64>, Error> {
        self.compute_relative_trajectory()?;
        return Ok(self.relative_trajectory.value()?.view());
    }

    /// Get the number of times the structure cell is replicated along each
    /// lattice vector in the simulation cell
    pub fn supercell_matrix(&mut self) -> Result<[usize; 3], Error> {
        let structure = self.require_structure()?;
        let cell = self.require_simulation_cell()?;
        let tolerance = self.options.supercell_tolerance;

        return self.supercell_matrix.get_or_try_init(|| {
            infer_supercell(&cell, &structure.cell(), tolerance)
        }).copied();
    }

    /// Get the number of atoms in the simulated supercell
    pub fn number_of_atoms(&mut self) -> Result<usize, Error> {
        let multiplier = self.supercell_matrix()?;
        return Ok(self.require_structure()?.supercell_size(multiplier));
    }

    /// Get the average spacing between consecutive time values
    pub fn time_step_average(&mut self) -> Result<f64, Error> {
        let time = match self.time {
            Some(ref time) => time,
            None => return Err(Error::MissingData("no time values were provided".into())),
        };

        return self.time_step_average.get_or_try_init(|| average_time_step(time)).copied();
    }

    /// Get the mean displacement matrix `<u u^T>` for each atom type in the
    /// structure, normalized per unit cell and per frame
    pub fn mean_displacement_matrix(&mut self) -> Result<&[Matrix3], Error> {
        if !self.mean_displacement_matrix.is_cached() {
            let multiplier = self.supercell_matrix()?;
            let structure = self.require_structure()?;
            self.compute_relative_trajectory()?;

            let matrices = mean_displacement_matrix(
                self.relative_trajectory.value()?.view(),
                &structure.supercell_atom_type_index(multiplier)?,
                &structure.atom_type_counts(),
                multiplier,
            )?;
            self.mean_displacement_matrix.store(matrices);
        }

        return self.mean_displacement_matrix.value().map(Vec::as_slice);
    }

    /// Get the average position of each atom over the trajectory, folded
    /// inside the simulation cell. If `samples` is given, only that many
    /// randomly selected frames are used.
    pub fn average_positions(&mut self, samples: Option<usize>) -> Result<Vec<Vector3D>, Error> {
        let multiplier = self.supercell_matrix()?;
        let structure = self.require_structure()?;
        let cell = self.require_simulation_cell()?;
        self.compute_relative_trajectory()?;

        let reference = structure.supercell_positions(multiplier)?;
        return average_positions(
            self.relative_trajectory.value()?.view(),
            &reference,
            &cell,
            samples,
            &mut rand::thread_rng(),
        );
    }

    /// Get the paths of the scratch files currently backing derived arrays
    pub fn scratch_files(&self) -> Vec<&Path> {
        [&self.derived_velocity, &self.velocity_mass_average, &self.relative_trajectory]
            .into_iter()
            .filter_map(|derived| derived.get())
            .filter_map(|storage| storage.path())
            .collect()
    }

    /// Set the time of each frame
    pub fn set_time(&mut self, time: Vec<f64>) -> Result<(), Error> {
        if let Some(n_frames) = self.number_of_frames() {
            check_series_length(Some(&time), n_frames, "time")?;
        }

        self.time = Some(time);
        self.time_step_average.invalidate();
        self.derived_velocity.invalidate();
        self.velocity_mass_average.invalidate();
        Ok(())
    }

    /// Set the potential energy of each frame
    pub fn set_energy(&mut self, energy: Vec<f64>) -> Result<(), Error> {
        if let Some(n_frames) = self.number_of_frames() {
            check_series_length(Some(&energy), n_frames, "energy")?;
        }

        self.energy = Some(energy);
        Ok(())
    }

    /// Set the periodic cell used in the simulation
    pub fn set_simulation_cell(&mut self, cell: UnitCell) {
        self.simulation_cell = Some(cell);
        self.invalidate_geometry();
    }

    /// Replace the reference structure. The order of atoms in the trajectory
    /// is not resolved again.
    pub fn set_structure(&mut self, structure: Arc<Structure>) {
        self.structure = Some(structure);
        self.invalidate_geometry();
    }

    /// Set or remove the atomic velocities, given in the same atoms order as
    /// the trajectory used to create this `Dynamics`
    pub fn set_velocity(&mut self, velocity: Option<Array3<f64>>) -> Result<(), Error> {
        let velocity = match velocity {
            Some(velocity) => {
                check_trajectory_shape(velocity.view(), "velocity")?;
                if let Some(ref trajectory) = self.trajectory {
                    if trajectory.shape() != velocity.shape() {
                        return Err(Error::InvalidParameter(format!(
                            "velocity shape {:?} does not match the trajectory shape {:?}",
                            velocity.shape(), trajectory.shape()
                        )));
                    }
                }

                match self.resolution.as_ref().and_then(|r| r.permutation.as_ref()) {
                    Some(permutation) => Some(permutation.apply(velocity.view())?),
                    None => Some(velocity),
                }
            }
            None => None,
        };

        self.velocity = velocity;
        self.derived_velocity.invalidate();
        self.velocity_mass_average.invalidate();
        Ok(())
    }

    /// Only keep the last `last_steps` frames of the trajectory, velocity,
    /// energy and time. All the quantities derived from them are discarded.
    ///
    /// If `last_steps` is larger than the number of frames, all frames are
    /// kept.
    pub fn crop_trajectory(&mut self, last_steps: usize) -> Result<(), Error> {
        if last_steps == 0 {
            return Err(Error::InvalidParameter("can not crop the trajectory to 0 steps".into()));
        }

        let n_frames = match self.number_of_frames() {
            Some(n_frames) => n_frames,
            None => return Err(Error::MissingData("there is no trajectory or velocity to crop".into())),
        };

        let kept = if last_steps > n_frames {
            warn!(
                "requested {} steps, but only {} are available: keeping all of them",
                last_steps, n_frames
            );
            n_frames
        } else {
            last_steps
        };
        let start = n_frames - kept;

        if let Some(ref mut trajectory) = self.trajectory {
            *trajectory = trajectory.slice(s![start.., .., ..]).to_owned();
        }

        if let Some(ref mut velocity) = self.velocity {
            *velocity = velocity.slice(s![start.., .., ..]).to_owned();
        }

        if let Some(ref mut energy) = self.energy {
            energy.drain(..start);
        }

        if let Some(ref mut time) = self.time {
            time.drain(..start);
        }

        self.time_step_average.invalidate();
        self.derived_velocity.invalidate();
        self.velocity_mass_average.invalidate();
        self.relative_trajectory.invalidate();
        self.mean_displacement_matrix.invalidate();

        info!("using {} steps", kept);
        Ok(())
    }

    fn invalidate_geometry(&mut self) {
        self.supercell_matrix.invalidate();
        self.relative_trajectory.invalidate();
        self.derived_velocity.invalidate();
        self.velocity_mass_average.invalidate();
        self.mean_displacement_matrix.invalidate();
    }

    fn require_structure(&self) -> Result<Arc<Structure>, Error> {
        match self.structure {
            Some(ref structure) => Ok(Arc::clone(structure)),
            None => Err(Error::MissingData("no reference structure was provided".into())),
        }
    }

    fn require_simulation_cell(&self) -> Result<UnitCell, Error> {
        self.simulation_cell.ok_or_else(|| Error::MissingData("no simulation cell was provided".into()))
    }

    fn compute_relative_trajectory(&mut self) -> Result<(), Error> {
        if self.relative_trajectory.is_cached() {
            return Ok(());
        }

        let multiplier = self.supercell_matrix()?;
        let structure = self.require_structure()?;
        let cell = self.require_simulation_cell()?;
        let reference = structure.supercell_positions(multiplier)?;

        let trajectory = self.trajectory()?;
        let mut relative = self.storage.zeros("relative_trajectory", trajectory.dim())?;
        relative_trajectory_into(trajectory, &reference, &cell, relative.view_mut())?;

        self.relative_trajectory.store(relative);
        Ok(())
    }

    fn compute_derived_velocity(&mut self) -> Result<(), Error> {
        if self.derived_velocity.is_cached() {
            return Ok(());
        }

        info!("no velocity provided, computing it from the trajectory");
        let time_step = self.time_step_average()?;
        self.compute_relative_trajectory()?;

        let relative = self.relative_trajectory.value()?.view();
        let mut velocity = self.storage.zeros("velocity", relative.dim())?;
        finite_difference_velocity_into(relative, time_step, velocity.view_mut())?;

        self.derived_velocity.store(velocity);
        Ok(())
    }

    fn compute_velocity_mass_average(&mut self) -> Result<(), Error> {
        if self.velocity_mass_average.is_cached() {
            return Ok(());
        }

        let multiplier = self.supercell_matrix()?;
        let structure = self.require_structure()?;
        let masses = structure.supercell_masses(multiplier)?;

        if self.velocity.is_none() {
            self.compute_derived_velocity()?;
        }

        let velocity = match self.velocity {
            Some(ref velocity) => velocity.view(),
            None => self.derived_velocity.value()?.view(),
        };

        let mut weighted = self.storage.zeros("velocity_mass_average", velocity.dim())?;
        mass_weighted_velocity_into(velocity, &masses, weighted.view_mut())?;

        self.velocity_mass_average.store(weighted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::structure::test_utils::test_structure;

    /// Two atoms in a 2x1x1 supercell of the chain structure, vibrating along
    /// x with opposite phases
    fn chain_dynamics(options: DynamicsOptions) -> Dynamics {
        let structure = Arc::new(test_structure("chain"));
        let reference = structure.supercell_positions([2, 1, 1]).unwrap();

        let n_frames = 6;
        let trajectory = Array3::from_shape_fn((n_frames, reference.len(), 3), |(t, atom, d)| {
            let sign = if t % 2 == 0 { 1.0 } else { -1.0 };
            let shift = if d == 0 { sign * 0.1 * (atom + 1) as f64 } else { 0.0 };
            reference[atom][d] + shift
        });

        Dynamics::builder()
            .structure(structure)
            .trajectory(trajectory)
            .time((0..n_frames).map(|t| 0.5 * t as f64).collect())
            .energy(vec![0.0; n_frames])
            .simulation_cell(UnitCell::orthorhombic(8.0, 3.0, 3.0))
            .options(options)
            .build()
            .unwrap()
    }

    #[test]
    fn derived_state() {
        let mut derived = Derived::<f64>::default();
        assert!(!derived.is_cached());
        assert!(derived.get().is_none());
        assert!(derived.value().is_err());

        assert_eq!(*derived.get_or_try_init(|| Ok(3.0)).unwrap(), 3.0);
        assert!(derived.is_cached());
        // not called again once cached
        assert_eq!(*derived.get_or_try_init(|| panic!("should not be called")).unwrap(), 3.0);

        derived.invalidate();
        assert!(derived.is_invalidated());
        assert!(derived.get_or_try_init(|| Err(Error::MissingData("test".into()))).is_err());
        assert!(derived.is_invalidated());
    }

    #[test]
    fn lazy_quantities() {
        let mut dynamics = chain_dynamics(DynamicsOptions::default());
        assert!(dynamics.resolution().unwrap().permutation.is_none());
        assert_eq!(dynamics.number_of_frames(), Some(6));

        assert_eq!(dynamics.supercell_matrix().unwrap(), [2, 1, 1]);
        assert_eq!(dynamics.number_of_atoms().unwrap(), 4);
        assert_relative_eq!(dynamics.time_step_average().unwrap(), 0.5);

        let relative = dynamics.relative_trajectory().unwrap().to_owned();
        assert_relative_eq!(relative[[0, 0, 0]], 0.1, epsilon = 1e-12);
        assert_relative_eq!(relative[[1, 3, 0]], -0.4, epsilon = 1e-12);
        assert_relative_eq!(relative[[1, 3, 1]], 0.0, epsilon = 1e-12);

        // velocity from finite differences, first frame is one-sided
        let velocity = dynamics.velocity().unwrap().to_owned();
        assert_relative_eq!(velocity[[0, 0, 0]], -0.4, epsilon = 1e-12);
        assert_relative_eq!(velocity[[2, 0, 0]], 0.0, epsilon = 1e-12);

        // masses are 1 for the first two atoms, and 4 for the last two
        let weighted = dynamics.velocity_mass_average().unwrap().to_owned();
        assert_relative_eq!(weighted[[0, 0, 0]], velocity[[0, 0, 0]], epsilon = 1e-12);
        assert_relative_eq!(weighted[[0, 2, 0]], 2.0 * velocity[[0, 2, 0]], epsilon = 1e-12);

        let matrices = dynamics.mean_displacement_matrix().unwrap();
        assert_eq!(matrices.len(), 2);
        // type 0: atoms with amplitude 0.1 and 0.2
        assert_relative_eq!(matrices[0][0][0], (0.01 + 0.04) / 2.0, epsilon = 1e-12);
        // type 1: atoms with amplitude 0.3 and 0.4
        assert_relative_eq!(matrices[1][0][0], (0.09 + 0.16) / 2.0, epsilon = 1e-12);
        assert_eq!(matrices[1][1][1], 0.0);

        let positions = dynamics.average_positions(None).unwrap();
        let reference = test_structure("chain").supercell_positions([2, 1, 1]).unwrap();
        for (position, expected) in positions.iter().zip(&reference) {
            assert_relative_eq!(*position, *expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn setters_invalidate() {
        let mut dynamics = chain_dynamics(DynamicsOptions::default());
        assert_relative_eq!(dynamics.time_step_average().unwrap(), 0.5);
        dynamics.velocity().unwrap();
        assert!(dynamics.derived_velocity.is_cached());

        dynamics.set_time((0..6).map(|t| t as f64).collect()).unwrap();
        assert!(dynamics.derived_velocity.is_invalidated());
        assert_relative_eq!(dynamics.time_step_average().unwrap(), 1.0);
        assert!(dynamics.set_time(vec![0.0, 1.0]).is_err());

        dynamics.mean_displacement_matrix().unwrap();
        dynamics.set_simulation_cell(UnitCell::orthorhombic(12.0, 3.0, 3.0));
        assert!(dynamics.supercell_matrix.is_invalidated());
        assert!(dynamics.relative_trajectory.is_invalidated());
        assert!(dynamics.mean_displacement_matrix.is_invalidated());
        assert_eq!(dynamics.supercell_matrix().unwrap(), [3, 1, 1]);
        // the trajectory does not match the new cell anymore
        assert!(dynamics.relative_trajectory().is_err());
    }

    #[test]
    fn supplied_velocity() {
        let mut dynamics = chain_dynamics(DynamicsOptions::default());
        let velocity = Array3::from_elem((6, 4, 3), 2.0);
        dynamics.set_velocity(Some(velocity)).unwrap();

        assert!(dynamics.velocity().unwrap().iter().all(|&v| v == 2.0));
        assert!(!dynamics.derived_velocity.is_cached());

        let weighted = dynamics.velocity_mass_average().unwrap();
        assert_eq!(weighted[[0, 0, 0]], 2.0);
        assert_eq!(weighted[[0, 3, 2]], 4.0);

        assert!(dynamics.set_velocity(Some(Array3::zeros((6, 3, 3)))).is_err());
    }

    #[test]
    fn crop() {
        let mut dynamics = chain_dynamics(DynamicsOptions::default());
        dynamics.relative_trajectory().unwrap();
        let supercell = dynamics.supercell_matrix().unwrap();

        dynamics.crop_trajectory(4).unwrap();
        assert_eq!(dynamics.number_of_frames(), Some(4));
        assert_eq!(dynamics.time().unwrap(), &[1.0, 1.5, 2.0, 2.5]);
        assert_eq!(dynamics.energy().unwrap().len(), 4);
        assert!(dynamics.relative_trajectory.is_invalidated());
        assert!(dynamics.supercell_matrix.is_cached());
        assert_eq!(dynamics.supercell_matrix().unwrap(), supercell);
        assert_eq!(dynamics.relative_trajectory().unwrap().dim(), (4, 4, 3));

        // larger than available keeps everything
        dynamics.crop_trajectory(10).unwrap();
        assert_eq!(dynamics.number_of_frames(), Some(4));

        assert!(dynamics.crop_trajectory(0).is_err());
    }

    #[test]
    fn missing_data() {
        let mut dynamics = Dynamics::builder().build().unwrap();
        assert!(matches!(dynamics.trajectory(), Err(Error::MissingData(_))));
        assert!(matches!(dynamics.supercell_matrix(), Err(Error::MissingData(_))));
        assert!(matches!(dynamics.time_step_average(), Err(Error::MissingData(_))));
        assert!(matches!(dynamics.crop_trajectory(3), Err(Error::MissingData(_))));
        assert!(dynamics.resolution().is_none());

        let error = Dynamics::builder()
            .trajectory(Array3::zeros((3, 2, 3)))
            .time(vec![0.0, 1.0])
            .build()
            .unwrap_err();
        assert!(matches!(error, Error::InvalidParameter(_)));

        let error = Dynamics::builder()
            .trajectory(Array3::zeros((3, 2, 2)))
            .build()
            .unwrap_err();
        assert!(matches!(error, Error::InvalidParameter(_)));
    }

    #[test]
    fn memory_mapped() {
        let directory = tempfile::tempdir().unwrap();
        let options = DynamicsOptions {
            memmap: true,
            scratch_directory: Some(directory.path().to_path_buf()),
            ..Default::default()
        };

        let mut dynamics = chain_dynamics(options);
        let in_memory = chain_dynamics(DynamicsOptions::default()).relative_trajectory().unwrap().to_owned();
        assert_eq!(dynamics.relative_trajectory().unwrap(), in_memory);
        dynamics.velocity().unwrap();

        let files = dynamics.scratch_files().iter().map(|p| p.to_path_buf()).collect::<Vec<_>>();
        assert_eq!(files.len(), 2);
        for file in &files {
            assert!(file.exists());
            assert!(file.starts_with(directory.path()));
        }

        dynamics.crop_trajectory(3).unwrap();
        assert!(dynamics.scratch_files().is_empty());
        for file in &files {
            assert!(!file.exists());
        }

        dynamics.relative_trajectory().unwrap();
        assert_eq!(dynamics.scratch_files().len(), 1);

        std::mem::drop(dynamics);
        assert_eq!(std::fs::read_dir(directory.path()).unwrap().count(), 0);
    }
}
