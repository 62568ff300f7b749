pub mod login;
pub mod schema;
