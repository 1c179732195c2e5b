pub mod aemet;
pub mod prod_db;
