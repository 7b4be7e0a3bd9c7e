pub mod advertisements;
pub mod clients;
pub mod contacts;
pub mod internships;
pub mod team;
