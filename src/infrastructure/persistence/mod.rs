pub mod csv_file;
pub mod csv_format;
pub mod export;
pub mod in_memory_store;
pub mod migrations;
pub mod sqlite_store;
