//! Terminal output for the command line tool

pub mod output;
pub mod table;

pub use output::{error, header, info, success, warn};
pub use table::{reviews_table, sessions_table, stats_table};
