pub mod account;
pub mod aloka_puja;
pub mod causes;
pub mod donations;
pub mod donors;
pub mod general;
pub mod payments;
pub mod receipts;
pub mod reports;
