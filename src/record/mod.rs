//! Link record persistence.

mod csv;

pub use csv::CsvRecorder;
