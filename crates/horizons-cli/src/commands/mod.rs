pub mod admin;
pub mod inspect;
