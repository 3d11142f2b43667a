pub mod kyc;
pub mod payments;
pub mod price;
pub mod simulation;
pub mod transactions;
pub mod usdt;
pub mod users;
