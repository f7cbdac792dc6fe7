#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! National percentile ranking.
//!
//! Places each target area within the national distribution of every
//! metric, corrected so that a higher percentile always means a more
//! deprived position.

pub mod percentile;
