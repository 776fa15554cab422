//! Directory export adapters.

pub mod csv_export;

pub use csv_export::{groups_to_csv, write_export};
