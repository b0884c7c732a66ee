//! Screening phases, each a pure function over trees and directories.

pub mod candidates;
pub mod classification;
pub mod discovery;
pub mod neighborhood;
pub mod problematic;
pub mod suspicious;
