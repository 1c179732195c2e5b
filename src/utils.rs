pub mod confirm;
pub mod lib_duckdb;
