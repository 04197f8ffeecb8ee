pub mod controller;
pub mod env;
pub mod errors;
pub mod models;
pub mod structs;
pub mod util;
