pub mod daily_values;
pub mod lib_opendata;
