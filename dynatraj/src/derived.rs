//! Quantities derived from a relative trajectory: velocities, time step,
//! averaged positions and mean displacement matrices.
use log::debug;
use ndarray::{s, ArrayView3, ArrayViewMut3, Axis};
use rand::Rng;

use crate::displacements::{check_trajectory_shape, fold_to_cell};
use crate::{Error, Matrix3, UnitCell, Vector3D};

/// Draw `samples` frame indices uniformly (with replacement) in
/// `0..n_frames`. If more samples than frames are requested, the number of
/// samples is reduced to the number of frames.
pub fn sample_frames(n_frames: usize, samples: usize, rng: &mut impl Rng) -> Result<Vec<usize>, Error> {
    if n_frames == 0 {
        return Err(Error::MissingData("can not sample frames from an empty trajectory".into()));
    }

    if samples == 0 {
        return Err(Error::InvalidParameter("the number of samples must be at least 1".into()));
    }

    let samples = if samples > n_frames {
        debug!("reducing the number of samples from {} to the number of frames ({})", samples, n_frames);
        n_frames
    } else {
        samples
    };

    return Ok((0..samples).map(|_| rng.gen_range(0..n_frames)).collect());
}

/// Get the average spacing between consecutive entries of `time`
pub fn average_time_step(time: &[f64]) -> Result<f64, Error> {
    if time.len() < 2 {
        return Err(Error::MissingData(format!(
            "at least two time values are required to get the time step, got {}", time.len()
        )));
    }

    let total = time.windows(2).map(|w| w[1] - w[0]).sum::<f64>();
    return Ok(total / (time.len() - 1) as f64);
}

/// Multiply the velocity of each atom in a `(frames, atoms, 3)` array by the
/// square root of its mass, writing the result in `output`.
pub fn mass_weighted_velocity_into(
    velocity: ArrayView3<'_, f64>,
    masses: &[f64],
    mut output: ArrayViewMut3<'_, f64>,
) -> Result<(), Error> {
    check_trajectory_shape(velocity, "velocity")?;
    if velocity.shape() != output.shape() {
        return Err(Error::InvalidParameter(format!(
            "output shape {:?} does not match the velocity shape {:?}",
            output.shape(), velocity.shape()
        )));
    }

    if masses.len() != velocity.shape()[1] {
        return Err(Error::InvalidParameter(format!(
            "velocity contains {} atoms, but got {} masses",
            velocity.shape()[1], masses.len()
        )));
    }

    for (atom, &mass) in masses.iter().enumerate() {
        let weight = f64::sqrt(mass);
        output.index_axis_mut(Axis(1), atom).assign(&(&velocity.index_axis(Axis(1), atom) * weight));
    }

    return Ok(());
}

/// Compute velocities from a `(frames, atoms, 3)` relative trajectory with
/// finite differences, writing them in `output`.
///
/// Interior frames use second order central differences, the first and last
/// frames use first order one-sided differences.
#[time_graph::instrument(name = "finite_difference_velocity")]
pub fn finite_difference_velocity_into(
    relative: ArrayView3<'_, f64>,
    time_step: f64,
    mut output: ArrayViewMut3<'_, f64>,
) -> Result<(), Error> {
    check_trajectory_shape(relative, "relative trajectory")?;
    if relative.shape() != output.shape() {
        return Err(Error::InvalidParameter(format!(
            "output shape {:?} does not match the trajectory shape {:?}",
            output.shape(), relative.shape()
        )));
    }

    let n_frames = relative.shape()[0];
    if n_frames < 2 {
        return Err(Error::InvalidParameter(format!(
            "at least two frames are required to compute velocities, got {}", n_frames
        )));
    }

    if !(time_step.is_finite() && time_step > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "time step must be a positive number, got {}", time_step
        )));
    }

    let first = (&relative.slice(s![1, .., ..]) - &relative.slice(s![0, .., ..])) / time_step;
    output.slice_mut(s![0, .., ..]).assign(&first);

    let last = (&relative.slice(s![n_frames - 1, .., ..]) - &relative.slice(s![n_frames - 2, .., ..])) / time_step;
    output.slice_mut(s![n_frames - 1, .., ..]).assign(&last);

    if n_frames > 2 {
        let central = (&relative.slice(s![2.., .., ..]) - &relative.slice(s![..n_frames - 2, .., ..])) / (2.0 * time_step);
        output.slice_mut(s![1..n_frames - 1, .., ..]).assign(&central);
    }

    return Ok(());
}

/// Get the average position of each atom, by adding the mean displacement in
/// the `relative` trajectory to the `reference` position and folding the
/// result back inside `cell`.
///
/// If `samples` is `Some`, the mean displacement is computed over that many
/// randomly selected frames instead of all of them.
pub fn average_positions(
    relative: ArrayView3<'_, f64>,
    reference: &[Vector3D],
    cell: &UnitCell,
    samples: Option<usize>,
    rng: &mut impl Rng,
) -> Result<Vec<Vector3D>, Error> {
    check_trajectory_shape(relative, "relative trajectory")?;
    if reference.len() != relative.shape()[1] {
        return Err(Error::InvalidParameter(format!(
            "relative trajectory contains {} atoms, but got {} reference positions",
            relative.shape()[1], reference.len()
        )));
    }

    let frames = match samples {
        Some(samples) => sample_frames(relative.shape()[0], samples, rng)?,
        None => {
            if relative.shape()[0] == 0 {
                return Err(Error::MissingData("can not average an empty trajectory".into()));
            }
            (0..relative.shape()[0]).collect()
        }
    };

    let mut mean = vec![Vector3D::zero(); reference.len()];
    for &frame in &frames {
        for (atom, displacement) in relative.index_axis(Axis(0), frame).outer_iter().enumerate() {
            mean[atom] += Vector3D::new(displacement[0], displacement[1], displacement[2]);
        }
    }

    let positions = mean.into_iter()
        .zip(reference)
        .map(|(sum, &position)| fold_to_cell(position + sum / frames.len() as f64, cell))
        .collect();

    return Ok(positions);
}

/// Compute the mean displacement matrix `<u u^T>` for each atom type, from a
/// `(frames, atoms, 3)` relative trajectory.
///
/// `atom_type_index` gives the type index of each atom, and
/// `atom_type_counts` the number of atoms of each type in the primitive cell.
/// The result is normalized by the number of frames and the number of unit
/// cells in the supercell (`multiplier`).
#[time_graph::instrument(name = "mean_displacement_matrix")]
pub fn mean_displacement_matrix(
    relative: ArrayView3<'_, f64>,
    atom_type_index: &[usize],
    atom_type_counts: &[usize],
    multiplier: [usize; 3],
) -> Result<Vec<Matrix3>, Error> {
    check_trajectory_shape(relative, "relative trajectory")?;
    if atom_type_index.len() != relative.shape()[1] {
        return Err(Error::InvalidParameter(format!(
            "relative trajectory contains {} atoms, but got {} atom types",
            relative.shape()[1], atom_type_index.len()
        )));
    }

    let n_frames = relative.shape()[0];
    if n_frames == 0 {
        return Err(Error::MissingData("can not compute displacements of an empty trajectory".into()));
    }

    let mut result = vec![Matrix3::zero(); atom_type_counts.len()];
    for (atom, displacements) in relative.axis_iter(Axis(1)).enumerate() {
        let type_index = atom_type_index[atom];
        if type_index >= atom_type_counts.len() || atom_type_counts[type_index] == 0 {
            return Err(Error::InvalidParameter(format!(
                "atom {} has type index {}, which is not part of the structure types",
                atom, type_index
            )));
        }

        let mut sum = Matrix3::zero();
        for displacement in displacements.outer_iter() {
            let u = Vector3D::new(displacement[0], displacement[1], displacement[2]);
            sum += Matrix3::outer(u, u);
        }

        result[type_index] += sum / atom_type_counts[type_index] as f64;
    }

    let normalization = (multiplier.iter().product::<usize>() * n_frames) as f64;
    for matrix in &mut result {
        *matrix = *matrix / normalization;
    }

    return Ok(result);
}
