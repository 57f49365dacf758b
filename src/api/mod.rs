pub mod access;
pub mod access_log;
pub mod employee;
pub mod report;
