//! Upload ingestion: reading CSV exports into tagged [`RawTable`]s and
//! profiling their columns.
//!
//! [`RawTable`]: bizdiag_model::RawTable

pub mod cell;
pub mod csv_table;
pub mod error;
pub mod profile;

pub use cell::{
    PeriodText, cell_number, classify_cell, is_null_token, parse_date_text, parse_month_text,
    parse_numeric_text, parse_period_text,
};
pub use csv_table::{read_csv_reader, read_csv_str, read_csv_table};
pub use error::{IngestError, Result};
pub use profile::{ProfileOptions, profile_table, profile_table_with_options};
