pub mod health;
pub mod recommendations;

pub use health::health_check;
pub use recommendations::{generate_response, recommendations_config};
