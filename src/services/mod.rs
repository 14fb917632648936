pub mod stats_api;
