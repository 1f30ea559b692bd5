//! Simulation driver tests.


/// Binary trace reader.
pub mod trace_reader;
