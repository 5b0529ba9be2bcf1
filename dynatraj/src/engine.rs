//! Collecting a [`Dynamics`] directly from a running simulation engine.
use std::sync::Arc;

use log::{debug, info};
use ndarray::Array3;

use crate::arrangement::ArrangementResolver;
use crate::{Dynamics, DynamicsOptions, Error, Structure, UnitCell, Vector3D};

/// A simulation engine which can be advanced step by step, and queried for
/// the current state of the system.
///
/// Positions and velocities are returned in the engine's own order of atoms.
pub trait TrajectorySource {
    /// Get the periodic cell of the simulation
    fn simulation_cell(&self) -> Result<UnitCell, Error>;
    /// Get the current Cartesian positions of all atoms
    fn positions(&self) -> Result<Vec<Vector3D>, Error>;
    /// Get the current velocities of all atoms
    fn velocities(&self) -> Result<Vec<Vector3D>, Error>;
    /// Get the current potential energy of the system
    fn potential_energy(&self) -> Result<f64, Error>;
    /// Run the simulation for `steps` time steps
    fn advance(&mut self, steps: usize) -> Result<(), Error>;
}

/// Parameters for sampling a running simulation
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SamplingOptions {
    /// Total simulated time to sample, after relaxation
    pub total_time: f64,
    /// Time step of the simulation
    pub time_step: f64,
    /// Simulated time to discard before starting to sample
    #[serde(default)]
    pub relaxation_time: f64,
    /// Number of time steps between consecutive samples
    #[serde(default = "serde_default_sampling_interval")]
    pub sampling_interval: usize,
    /// Only store velocities, not positions
    #[serde(default)]
    pub velocity_only: bool,
}

fn serde_default_sampling_interval() -> usize {
    return 1;
}

impl SamplingOptions {
    /// Parse sampling options from a JSON string
    pub fn from_json(json: &str) -> Result<SamplingOptions, Error> {
        let options = serde_json::from_str::<SamplingOptions>(json)?;
        options.validate()?;
        return Ok(options);
    }

    /// Check that these options make sense
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.time_step > 0.0 && self.time_step.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "time_step must be a positive number, got {}", self.time_step
            )));
        }

        if !(self.total_time > 0.0 && self.total_time.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "total_time must be a positive number, got {}", self.total_time
            )));
        }

        if !(self.relaxation_time >= 0.0 && self.relaxation_time.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "relaxation_time must be a positive number, got {}", self.relaxation_time
            )));
        }

        if self.sampling_interval == 0 {
            return Err(Error::InvalidParameter("sampling_interval must be at least 1".into()));
        }

        if self.number_of_samples() == 0 {
            return Err(Error::InvalidParameter(format!(
                "total_time ({}) is too short to take a single sample every {} steps of {}",
                self.total_time, self.sampling_interval, self.time_step
            )));
        }

        Ok(())
    }

    /// Number of steps to run before sampling
    pub fn relaxation_steps(&self) -> usize {
        f64::round(self.relaxation_time / self.time_step) as usize
    }

    /// Number of frames to collect
    pub fn number_of_samples(&self) -> usize {
        f64::round(self.total_time / self.time_step / self.sampling_interval as f64) as usize
    }
}

/// Run the simulation in `source` and collect its trajectory into a new
/// [`Dynamics`].
///
/// The order of atoms is resolved once, on the positions before any time
/// step is run, and every collected frame is re-ordered to structure order as
/// it is sampled.
#[time_graph::instrument(name = "collect_dynamics")]
pub fn collect_dynamics(
    source: &mut dyn TrajectorySource,
    structure: Arc<Structure>,
    sampling: &SamplingOptions,
    options: DynamicsOptions,
) -> Result<Dynamics, Error> {
    sampling.validate()?;
    options.validate()?;

    let cell = source.simulation_cell()?;

    let initial = source.positions()?;
    let resolver = ArrangementResolver::new(options.arrangement_threshold);
    let resolution = resolver.resolve(&initial, &structure)?;

    let n_atoms = structure.supercell_size(resolution.cell_size);
    if initial.len() != n_atoms {
        return Err(Error::Arrangement(format!(
            "the engine contains {} atoms, but a {:?} supercell of the structure contains {} atoms",
            initial.len(), resolution.cell_size, n_atoms
        )));
    }

    let relaxation = sampling.relaxation_steps();
    if relaxation > 0 {
        info!("relaxing the system for {} steps", relaxation);
        source.advance(relaxation)?;
    }

    let n_samples = sampling.number_of_samples();
    info!("collecting {} frames of {} atoms", n_samples, n_atoms);

    let reorder = |frame: Vec<Vector3D>| -> Result<Vec<Vector3D>, Error> {
        if frame.len() != n_atoms {
            return Err(Error::InvalidParameter(format!(
                "the engine returned {} atoms, expected {}", frame.len(), n_atoms
            )));
        }

        match resolution.permutation {
            Some(ref permutation) => permutation.apply_frame(&frame),
            None => Ok(frame),
        }
    };

    let mut positions = if sampling.velocity_only {
        None
    } else {
        Some(Array3::zeros((n_samples, n_atoms, 3)))
    };
    let mut velocities = Array3::zeros((n_samples, n_atoms, 3));
    let mut energy = Vec::with_capacity(n_samples);
    let mut time = Vec::with_capacity(n_samples);

    for sample in 0..n_samples {
        source.advance(sampling.sampling_interval)?;

        let frame = reorder(source.velocities()?)?;
        for (atom, velocity) in frame.iter().enumerate() {
            for d in 0..3 {
                velocities[[sample, atom, d]] = velocity[d];
            }
        }

        if let Some(ref mut positions) = positions {
            let frame = reorder(source.positions()?)?;
            for (atom, position) in frame.iter().enumerate() {
                for d in 0..3 {
                    positions[[sample, atom, d]] = position[d];
                }
            }
        }

        energy.push(source.potential_energy()?);
        time.push((sample * sampling.sampling_interval) as f64 * sampling.time_step);
        debug!("collected frame {}/{}", sample + 1, n_samples);
    }

    let mut builder = Dynamics::builder()
        .structure(structure)
        .velocity(velocities)
        .energy(energy)
        .time(time)
        .simulation_cell(cell)
        .options(options)
        .resolved(resolution);

    if let Some(positions) = positions {
        builder = builder.trajectory(positions);
    }

    return builder.build();
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::arrangement::IndexingScheme;
    use crate::structure::test_utils::test_structure;

    /// Atoms moving at constant velocity, stored in atom-major order
    struct MovingAtoms {
        cell: UnitCell,
        initial: Vec<Vector3D>,
        velocities: Vec<Vector3D>,
        time_step: f64,
        step: usize,
    }

    impl MovingAtoms {
        fn new(structure: &Structure, size: [usize; 3]) -> MovingAtoms {
            let n_atoms = structure.supercell_size(size);
            let initial = (0..n_atoms).map(|i| {
                let site = IndexingScheme::AtomMajor.site(i, size, structure.size());
                let shift = Vector3D::new(site.cell[0] as f64, site.cell[1] as f64, site.cell[2] as f64);
                structure.positions()[site.sublattice] + structure.cell().cartesian(shift)
            }).collect();

            let velocities = (0..n_atoms).map(|i| Vector3D::new(0.001 * i as f64, 0.0, 0.0)).collect();

            MovingAtoms {
                cell: structure.cell().replicated(size),
                initial: initial,
                velocities: velocities,
                time_step: 0.1,
                step: 0,
            }
        }
    }

    impl TrajectorySource for MovingAtoms {
        fn simulation_cell(&self) -> Result<UnitCell, Error> {
            Ok(self.cell)
        }

        fn positions(&self) -> Result<Vec<Vector3D>, Error> {
            let time = self.step as f64 * self.time_step;
            Ok(self.initial.iter().zip(&self.velocities).map(|(x, v)| x + v * time).collect())
        }

        fn velocities(&self) -> Result<Vec<Vector3D>, Error> {
            Ok(self.velocities.clone())
        }

        fn potential_energy(&self) -> Result<f64, Error> {
            Ok(-(self.step as f64))
        }

        fn advance(&mut self, steps: usize) -> Result<(), Error> {
            self.step += steps;
            Ok(())
        }
    }

    #[test]
    fn sampling_options() {
        let options = SamplingOptions::from_json(r#"{"total_time": 1.0, "time_step": 0.1}"#).unwrap();
        assert_eq!(options.sampling_interval, 1);
        assert_eq!(options.relaxation_steps(), 0);
        assert_eq!(options.number_of_samples(), 10);

        let options = SamplingOptions::from_json(r#"{
            "total_time": 1.0, "time_step": 0.1, "sampling_interval": 2, "relaxation_time": 0.3
        }"#).unwrap();
        assert_eq!(options.relaxation_steps(), 3);
        assert_eq!(options.number_of_samples(), 5);

        assert!(SamplingOptions::from_json(r#"{"total_time": 1.0, "time_step": 0.0}"#).is_err());
        assert!(SamplingOptions::from_json(r#"{"total_time": 0.01, "time_step": 0.1}"#).is_err());
        assert!(SamplingOptions::from_json(r#"{"total_time": 1.0, "time_step": 0.1, "sampling_interval": 0}"#).is_err());
    }

    #[test]
    fn collect() {
        let structure = Arc::new(test_structure("CsCl"));
        let size = [2, 2, 1];
        let mut source = MovingAtoms::new(&structure, size);

        let sampling = SamplingOptions {
            total_time: 0.5,
            time_step: 0.1,
            relaxation_time: 0.2,
            sampling_interval: 1,
            velocity_only: false,
        };

        let mut dynamics = collect_dynamics(&mut source, Arc::clone(&structure), &sampling, DynamicsOptions::default()).unwrap();
        assert_eq!(source.step, 7);

        let resolution = dynamics.resolution().unwrap();
        assert_eq!(resolution.scheme, IndexingScheme::AtomMajor);
        let permutation = resolution.permutation.clone().unwrap();

        assert_eq!(dynamics.number_of_frames(), Some(5));
        assert_eq!(dynamics.energy().unwrap(), &[-3.0, -4.0, -5.0, -6.0, -7.0]);
        assert_relative_eq!(dynamics.time_step_average().unwrap(), 0.1, epsilon = 1e-12);
        assert_eq!(dynamics.supercell_matrix().unwrap(), size);

        // frames are stored in structure order
        let expected = structure.supercell_positions(size).unwrap();
        let trajectory = dynamics.trajectory().unwrap();
        for (atom, position) in expected.iter().enumerate() {
            let engine_index = permutation.indices()[atom];
            let shift = 0.001 * engine_index as f64 * 0.3;
            assert_relative_eq!(trajectory[[0, atom, 0]], position[0] + shift, epsilon = 1e-12);
            assert_relative_eq!(trajectory[[0, atom, 1]], position[1], epsilon = 1e-12);
        }

        let velocity = dynamics.velocity().unwrap();
        for atom in 0..expected.len() {
            let engine_index = permutation.indices()[atom];
            assert_relative_eq!(velocity[[2, atom, 0]], 0.001 * engine_index as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn resolved_before_relaxation() {
        let structure = Arc::new(test_structure("CsCl"));
        let mut source = MovingAtoms::new(&structure, [2, 1, 1]);
        // atoms drift by more than half a cell during relaxation
        source.velocities = vec![Vector3D::new(1.0, 0.0, 0.0); 4];

        let sampling = SamplingOptions {
            total_time: 0.2,
            time_step: 0.1,
            relaxation_time: 0.7,
            sampling_interval: 1,
            velocity_only: false,
        };

        let dynamics = collect_dynamics(&mut source, structure, &sampling, DynamicsOptions::default()).unwrap();
        let resolution = dynamics.resolution().unwrap();
        assert_eq!(resolution.scheme, IndexingScheme::AtomMajor);
        assert_eq!(resolution.cell_size, [2, 1, 1]);
        assert!(resolution.error < 1e-12);
    }

    #[test]
    fn missing_atoms() {
        let structure = Arc::new(test_structure("CsCl"));
        let mut source = MovingAtoms::new(&structure, [2, 1, 1]);
        // the engine only reports 3 of the 4 atoms of the supercell
        source.initial.truncate(3);
        source.velocities.truncate(3);

        let sampling = SamplingOptions {
            total_time: 0.3,
            time_step: 0.1,
            relaxation_time: 0.0,
            sampling_interval: 1,
            velocity_only: false,
        };

        let error = collect_dynamics(&mut source, structure, &sampling, DynamicsOptions::default()).unwrap_err();
        assert!(matches!(error, Error::Arrangement(_)));
        assert_eq!(source.step, 0);
    }

    #[test]
    fn velocity_only() {
        let structure = Arc::new(test_structure("chain"));
        let mut source = MovingAtoms::new(&structure, [3, 1, 1]);

        let sampling = SamplingOptions {
            total_time: 0.4,
            time_step: 0.1,
            relaxation_time: 0.0,
            sampling_interval: 2,
            velocity_only: true,
        };

        let mut dynamics = collect_dynamics(&mut source, structure, &sampling, DynamicsOptions::default()).unwrap();
        assert_eq!(source.step, 4);
        assert!(dynamics.trajectory().is_err());
        assert_eq!(dynamics.number_of_frames(), Some(2));
        assert_eq!(dynamics.time().unwrap(), &[0.0, 0.2]);
        assert_eq!(dynamics.velocity().unwrap().dim(), (2, 6, 3));
    }
}
