pub mod daily_values_archive;
