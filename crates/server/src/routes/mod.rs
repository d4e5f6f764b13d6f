pub mod breakers;
pub mod health;
pub mod metrics;
