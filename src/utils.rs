pub mod amount;
pub mod converter;
