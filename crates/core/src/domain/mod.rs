pub mod contract;
pub mod request;
pub mod suggestion;
pub mod trade;
