//! Patient event and lab tables.
//!
//! This module holds the record types the feature functions consume and
//! the JSON / JSON Lines readers and writers used by the CLI.

pub mod io;
pub mod types;

pub use io::{parse_records, read_records, render_records, write_output, write_records, TableFormat};
pub use types::{LabReading, LabValue, PatientEvent, PatientLab};
