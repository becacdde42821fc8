pub mod fuzzwork;
pub mod marker_store;
pub mod mysql_client;
pub mod prod_db;
