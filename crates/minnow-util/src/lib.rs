#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Shared filesystem helpers for minnow. No logging.

pub mod fs;
