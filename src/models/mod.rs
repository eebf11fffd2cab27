pub mod report;
pub mod ticket;
