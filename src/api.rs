pub mod aemet;
