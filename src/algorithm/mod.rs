//! Algorithm implementations for observational study matching
//!
//! This module contains the nearest-neighbour matching algorithms that pair
//! treated records with controls by propensity score.

pub mod matching;
