//! Frequency accuracy of a pulse-per-period signal, measured through a
//! serial receiver that turns every pulse into one received byte.
//!
//! [`baud`] picks the line rate, [`scheduler`] and [`drift`] form the
//! measurement state machine (composed in [`meter`]), and [`engine`] drives it
//! from a [`transport`] source into [`report`] sinks.

pub mod baud;
pub mod clock;
pub mod config;
pub mod drift;
pub mod engine;
pub mod error;
pub mod icount;
pub mod meter;
pub mod report;
pub mod scheduler;
pub mod transport;
