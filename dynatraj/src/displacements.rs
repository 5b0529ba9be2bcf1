//! Displacements of atoms from their equilibrium positions, continuous across
//! periodic boundaries.
use ndarray::{ArrayView2, ArrayView3, ArrayViewMut2, ArrayViewMut3, Axis};

use crate::{Error, UnitCell, Vector3D};

/// Compute the displacement of a single atom from its `reference` position
/// along a `(frames, 3)` series of `positions`, writing it to `output`.
///
/// The displacement in the first frame is taken as the nearest periodic image
/// of `position - reference`. For the following frames, the step from the
/// previous frame is folded back to its nearest image before being
/// accumulated, removing the jumps created when the atom crosses a boundary
/// of the periodic `cell`.
pub fn atomic_displacement(
    positions: ArrayView2<'_, f64>,
    reference: Vector3D,
    cell: &UnitCell,
    mut output: ArrayViewMut2<'_, f64>,
) {
    debug_assert_eq!(positions.dim(), output.dim());

    let mut previous: Option<Vector3D> = None;
    for (position, mut displacement) in positions.outer_iter().zip(output.outer_iter_mut()) {
        let raw = Vector3D::new(position[0], position[1], position[2]) - reference;

        let current = match previous {
            None => {
                let mut image = raw;
                cell.vector_image(&mut image);
                image
            }
            Some(previous) => {
                let mut step = raw - previous;
                cell.vector_image(&mut step);
                previous + step
            }
        };

        displacement[0] = current[0];
        displacement[1] = current[1];
        displacement[2] = current[2];
        previous = Some(current);
    }
}

/// Build the relative trajectory from a `(frames, atoms, 3)` `trajectory`, the
/// equilibrium position of each atom in `reference` and the periodic `cell`
/// of the simulation. The result is written to `output`, which must have the
/// same shape as `trajectory`.
#[time_graph::instrument(name = "relative_trajectory")]
pub fn relative_trajectory_into(
    trajectory: ArrayView3<'_, f64>,
    reference: &[Vector3D],
    cell: &UnitCell,
    mut output: ArrayViewMut3<'_, f64>,
) -> Result<(), Error> {
    check_trajectory_shape(trajectory, "trajectory")?;
    if trajectory.shape() != output.shape() {
        return Err(Error::InvalidParameter(format!(
            "output shape {:?} does not match the trajectory shape {:?}",
            output.shape(), trajectory.shape()
        )));
    }

    if reference.len() != trajectory.shape()[1] {
        return Err(Error::InvalidParameter(format!(
            "trajectory contains {} atoms, but the reference structure contains {} atoms",
            trajectory.shape()[1], reference.len()
        )));
    }

    for (atom, &position) in reference.iter().enumerate() {
        atomic_displacement(
            trajectory.index_axis(Axis(1), atom),
            position,
            cell,
            output.index_axis_mut(Axis(1), atom),
        );
    }

    return Ok(());
}

/// Bring `position` back inside the `cell`, choosing the periodic image
/// closest to the center of the cell.
///
/// Ties are broken to even, so that positions exactly on the faces of the cell
/// are left untouched and folding twice gives the same result as folding
/// once.
pub fn fold_to_cell(position: Vector3D, cell: &UnitCell) -> Vector3D {
    let shift = cell.fractional(position - cell.center()).map(f64::round_ties_even);
    return position - cell.cartesian(shift);
}

/// Check that `array` has the `(frames, atoms, 3)` shape of a trajectory
pub(crate) fn check_trajectory_shape(array: ArrayView3<'_, f64>, name: &str) -> Result<(), Error> {
    if array.shape()[2] != 3 {
        return Err(Error::InvalidParameter(format!(
            "{} must have a (frames, atoms, 3) shape, got {:?}", name, array.shape()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array2, Array3};

    #[test]
    fn boundary_crossing() {
        // a single atom vibrating around x = 0 in a box of size 10, wrapped
        // in [0, 10)
        let cell = UnitCell::cubic(10.0);
        let unwrapped = [0.2, 0.1, -0.1, -0.3, -0.2, 0.1, 0.3];
        let mut positions = Array2::zeros((unwrapped.len(), 3));
        for (i, &x) in unwrapped.iter().enumerate() {
            positions[[i, 0]] = f64::rem_euclid(x, 10.0);
            positions[[i, 1]] = 4.0;
            positions[[i, 2]] = 4.0;
        }

        let mut displacement = Array2::zeros((unwrapped.len(), 3));
        atomic_displacement(positions.view(), Vector3D::new(0.0, 4.0, 4.0), &cell, displacement.view_mut());

        for (i, &x) in unwrapped.iter().enumerate() {
            assert_relative_eq!(displacement[[i, 0]], x, epsilon = 1e-12);
            assert_eq!(displacement[[i, 1]], 0.0);
            assert_eq!(displacement[[i, 2]], 0.0);
        }

        for i in 1..unwrapped.len() {
            let step = f64::abs(displacement[[i, 0]] - displacement[[i - 1, 0]]);
            assert!(step < 5.0);
        }
    }

    #[test]
    fn diffusion_is_continuous() {
        // an atom moving steadily along x, crossing the box several times
        let cell = UnitCell::cubic(4.0);
        let n_frames = 40;
        let mut positions = Array2::zeros((n_frames, 3));
        for i in 0..n_frames {
            positions[[i, 0]] = f64::rem_euclid(0.5 * i as f64, 4.0);
        }

        let mut displacement = Array2::zeros((n_frames, 3));
        atomic_displacement(positions.view(), Vector3D::zero(), &cell, displacement.view_mut());

        for i in 0..n_frames {
            assert_relative_eq!(displacement[[i, 0]], 0.5 * i as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn triclinic_boundary_crossing() {
        let cell = UnitCell::triclinic(5.0, 5.0, 5.0, 90.0, 90.0, 60.0);
        let reference = cell.cartesian(Vector3D::new(0.01, 0.5, 0.5));

        let fractional = [0.01, -0.01, 0.02, -0.02];
        let mut positions = Array2::zeros((fractional.len(), 3));
        for (i, &x) in fractional.iter().enumerate() {
            let mut position = cell.cartesian(Vector3D::new(x, 0.5, 0.5));
            cell.wrap_vector(&mut position);
            positions[[i, 0]] = position[0];
            positions[[i, 1]] = position[1];
            positions[[i, 2]] = position[2];
        }

        let mut displacement = Array2::zeros((fractional.len(), 3));
        atomic_displacement(positions.view(), reference, &cell, displacement.view_mut());

        for (i, &x) in fractional.iter().enumerate() {
            let expected = cell.cartesian(Vector3D::new(x - 0.01, 0.0, 0.0));
            assert_relative_eq!(displacement[[i, 0]], expected[0], epsilon = 1e-10);
            assert_relative_eq!(displacement[[i, 1]], expected[1], epsilon = 1e-10);
            assert_relative_eq!(displacement[[i, 2]], expected[2], epsilon = 1e-10);
        }
    }

    #[test]
    fn relative_trajectory() {
        let cell = UnitCell::orthorhombic(8.0, 3.0, 3.0);
        let reference = [Vector3D::new(0.0, 0.0, 0.0), Vector3D::new(4.0, 1.5, 1.5)];
        let trajectory = Array3::from_shape_fn((3, 2, 3), |(frame, atom, d)| {
            let shift = 0.1 * frame as f64;
            if atom == 0 {
                f64::rem_euclid(-shift, [8.0, 3.0, 3.0][d])
            } else {
                reference[1][d] + shift
            }
        });

        let mut relative = Array3::zeros((3, 2, 3));
        relative_trajectory_into(trajectory.view(), &reference, &cell, relative.view_mut()).unwrap();

        for frame in 0..3 {
            for d in 0..3 {
                assert_relative_eq!(relative[[frame, 0, d]], -0.1 * frame as f64, epsilon = 1e-12);
                assert_relative_eq!(relative[[frame, 1, d]], 0.1 * frame as f64, epsilon = 1e-12);
            }
        }

        let error = relative_trajectory_into(trajectory.view(), &reference[..1], &cell, relative.view_mut());
        assert!(error.is_err());

        let mut wrong_shape = Array3::zeros((2, 2, 3));
        let error = relative_trajectory_into(trajectory.view(), &reference, &cell, wrong_shape.view_mut());
        assert!(error.is_err());
    }

    #[test]
    fn fold() {
        let cell = UnitCell::orthorhombic(2.0, 3.0, 4.0);

        let folded = fold_to_cell(Vector3D::new(2.5, -1.0, 9.0), &cell);
        assert_relative_eq!(folded, Vector3D::new(0.5, 2.0, 1.0), epsilon = 1e-12);

        // positions on the faces of the cell are kept as-is
        let face = Vector3D::new(0.0, 3.0, 2.0);
        assert_eq!(fold_to_cell(face, &cell), face);

        let cell = UnitCell::triclinic(3.0, 4.0, 5.0, 80.0, 95.0, 110.0);
        for position in [Vector3D::new(-7.3, 12.1, 4.4), Vector3D::new(0.0, 0.0, 0.0), Vector3D::new(2.9, -0.1, 15.0)] {
            let once = fold_to_cell(position, &cell);
            let twice = fold_to_cell(once, &cell);
            assert_eq!(once, twice);

            let fractional = cell.fractional(once);
            for i in 0..3 {
                assert!(fractional[i] >= -1e-12 && fractional[i] <= 1.0 + 1e-12);
            }
        }
    }
}
