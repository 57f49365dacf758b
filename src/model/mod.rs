pub mod access_log;
pub mod access_log_edit;
pub mod employee;
pub mod role;
