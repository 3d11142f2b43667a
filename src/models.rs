pub mod kyc;
pub mod payments;
pub mod price;
pub mod transactions;
pub mod users;
