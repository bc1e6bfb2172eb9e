pub mod csv_export;
pub mod group_partitioner;
pub mod header_sniffer;
pub mod prediction_session;
pub mod result_renderer;
pub mod row_merger;
pub mod sort_key;
