// Schedule Grid Library
// Exports all modules for the binary, tests and benches

pub mod models;
pub mod services;
pub mod utils;
