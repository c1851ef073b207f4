pub mod app_config;
pub mod memory_gateway;

pub use app_config::Config;
pub use memory_gateway::InMemoryGateway;
