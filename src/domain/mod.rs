pub mod incident;
pub mod record_table;
