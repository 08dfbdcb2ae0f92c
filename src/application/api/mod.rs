pub mod date_time_codec;
pub mod person;
pub mod route;
pub mod router;
