pub mod aggregator;
pub mod summary_service;
