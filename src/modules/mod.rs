pub mod data_import;
pub mod deployment;
pub mod notification;
pub mod table;
