pub mod core;
pub mod crm;
pub mod main_module;
pub mod reports;
