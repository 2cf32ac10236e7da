pub mod amplitudes;
pub mod atom;
pub mod batch;
pub mod config;
pub mod conversion;
pub mod geometry;
pub mod molecular_data;
pub mod molecule;
pub mod operators;
pub mod periodic_table;
pub mod psi4;
pub mod tensor;
