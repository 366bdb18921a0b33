//! Core data structures representing MD trajectories and cell geometry.
//!
//! This module provides the foundational types that flow through
//! `hma-post`:
//!
//! - [`vec`] – Plain `[f64; 3]` vector alias and arithmetic helpers.
//! - [`cell`] – Periodic simulation cell (row-vector convention) and the
//!   coordinate tag distinguishing fractional from Cartesian positions.
//! - [`trajectory`] – One simulation's worth of per-step data, assembled
//!   by the [`crate::io`] readers and consumed read-only by the
//!   estimation pipeline.
//!
//! The data model intentionally keeps [`Trajectory`] free of validation:
//! readers can assemble it incrementally, and the estimator enforces the
//! shape and reference-configuration preconditions once at construction.
//!
//! [`Trajectory`]: trajectory::Trajectory

pub mod cell;
pub mod trajectory;
pub mod vec;

pub use cell::{Cell, Coordinates};
pub use trajectory::Trajectory;
