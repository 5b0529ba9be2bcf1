use log::info;

use crate::{Error, UnitCell};

/// Default relative tolerance on the deviation from an integer ratio between
/// simulation and reference cell lengths
pub const DEFAULT_SUPERCELL_TOLERANCE: f64 = 0.01;

/// Infer how many times the `reference` cell is replicated along each lattice
/// vector to create the `simulation` cell.
///
/// The ratios between the lengths of the lattice vectors are rounded to the
/// closest integer. If the (signed) sum of rounding differences, normalized by
/// the norm of the ratios, exceeds `tolerance`, the cells are not compatible
/// and an [`Error::IncompatibleCell`] is returned.
pub fn infer_supercell(simulation: &UnitCell, reference: &UnitCell, tolerance: f64) -> Result<[usize; 3], Error> {
    let simulation_lengths = simulation.lengths();
    let reference_lengths = reference.lengths();

    let mut exact = [0.0; 3];
    for i in 0..3 {
        exact[i] = simulation_lengths[i] / reference_lengths[i];
    }
    let rounded = exact.map(f64::round);

    let norm = f64::sqrt(exact.iter().map(|x| x * x).sum::<f64>());
    let deviation = f64::abs((0..3).map(|i| rounded[i] - exact[i]).sum::<f64>()) / norm;

    if !(deviation <= tolerance) || rounded.iter().any(|&r| r < 1.0) {
        return Err(Error::IncompatibleCell(format!(
            "cell size relation is not integer: [{:.4}, {:.4}, {:.4}] (deviation {:.4} > tolerance {})",
            exact[0], exact[1], exact[2], deviation, tolerance
        )));
    }

    let multiplier = rounded.map(|r| r as usize);
    info!("MD cell size relation: {:?}", multiplier);

    return Ok(multiplier);
}
