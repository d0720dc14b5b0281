pub mod health;
pub mod latency;
pub mod page;
pub mod routes;
