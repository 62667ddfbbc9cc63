pub mod csv_dataset;
