//! Bracket resolution for the tape machine.
//!
//! Two strategies that must agree on every input:
//!
//! - [`scan_partner`] walks the source from a bracket, tracking nesting depth.
//!   It is the reference definition and costs O(n) per lookup.
//! - [`BracketMap`] pairs every bracket in one O(n) stack pass, after which a
//!   lookup is O(1).

mod scan;
mod table;

pub use scan::scan_partner;
pub use table::BracketMap;
