//! Service modules for business logic

pub mod fan_out;

pub use fan_out::PublishFanOut;
