// File I/O: retail chain spreadsheets, master data and the sales table

pub mod master;
pub mod normalize;
pub mod sink;
pub mod xlsx;

pub use master::load_master;
pub use normalize::load_chain;
pub use sink::write_sales;
