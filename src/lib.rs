pub mod campaign;
pub mod config;
pub mod error;
pub mod loss;
pub mod od;
pub mod perturb;
pub mod sim;
pub mod telemetry;
mod xml;

pub use error::{CalibrationError, Result};

#[cfg(test)]
mod test;
