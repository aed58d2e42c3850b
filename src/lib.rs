// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
// GPU / graphics allowances — casts and float comparisons are intentional
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! GPU-resident Galton board simulation engine built on wgpu.
//!
//! A pyramidal peg lattice, a growing ball population, and a floor slab
//! share one GPU scene buffer of fixed-size instance records. A compute
//! kernel integrates ball motion and collisions entirely on the device;
//! the CPU only appends newly spawned balls and never reads positions
//! back.
//!
//! # Key entry points
//!
//! - [`GaltonBoard`] - lattice, pools, physics, and spawner wired together
//! - [`BoardConfig`] - board geometry and simulation tuning
//! - [`scene::SceneAggregator`] - the shared scene buffer and its pools
//! - [`physics::BallPhysics`] - the compute-dispatch side of the simulation
//! - `Viewer` (feature `viewer`) - standalone winit window
//!
//! # Architecture
//!
//! Every renderable object lives in an [`scene::ObjectPool`] occupying a
//! fixed region of the shared buffer: a count header followed by
//! 80-byte records (column-major transform plus color). The physics
//! kernel and the instanced render shader both index that layout
//! directly, so a simulation step is one uniform write and one dispatch.

pub mod board;
pub mod camera;
pub mod error;
pub mod gpu;
pub mod lattice;
pub mod mesh;
pub mod physics;
pub mod renderer;
pub mod scene;
pub mod spawner;
pub mod util;
#[cfg(feature = "viewer")]
pub mod viewer;

pub use board::{BoardConfig, GaltonBoard};
pub use error::GaltonError;
#[cfg(feature = "viewer")]
pub use viewer::Viewer;
