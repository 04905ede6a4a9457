pub mod auth;
pub mod books;
pub mod profile;
pub mod search;
