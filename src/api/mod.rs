pub mod admin;
pub mod employee;
pub mod kiosk;
pub mod punch;
