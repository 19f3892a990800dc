//! Utility functions and types

pub mod data_loader;

pub use data_loader::{cleaned_file_path, load, DataLoader, DataSaver, FileFormat, SUPPORTED_EXTENSIONS};

/// Round half-to-even at `decimals` digits
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round_ties_even() / factor
}
