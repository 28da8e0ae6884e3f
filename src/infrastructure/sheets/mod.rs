pub mod auth;
pub mod http_client;
pub mod value_range_factory;
pub mod worksheet_manager;
