//! Batch glyph extraction over a label-organized tree of raw scans.

pub mod cutter;
