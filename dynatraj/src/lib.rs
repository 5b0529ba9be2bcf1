#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unreadable_literal, clippy::option_if_let_else, clippy::range_plus_one)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]
#![allow(clippy::default_trait_access)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

//! Reconciliation of molecular dynamics trajectories with a reference crystal
//! structure: resolving the order of atoms used by the simulation engine,
//! inferring the supercell, removing periodic boundary jumps and computing
//! derived quantities (velocities, mean displacement matrices, average
//! positions).

pub mod types;
pub use types::*;

mod errors;
pub use self::errors::Error;

pub mod structure;
pub use self::structure::{Structure, UnitCell, CellShape};

pub mod arrangement;
pub use self::arrangement::{Arrangement, ArrangementResolver, IndexingScheme, LatticeSite, Resolution};

pub mod supercell;
pub use self::supercell::infer_supercell;

pub mod displacements;
pub mod derived;
pub mod storage;

mod options;
pub use self::options::DynamicsOptions;

mod dynamics;
pub use self::dynamics::{Derived, Dynamics, DynamicsBuilder};

pub mod engine;
pub use self::engine::{collect_dynamics, SamplingOptions, TrajectorySource};
