pub mod appwrite;
pub mod auth;
pub mod dashboard;
pub mod database;
pub mod forms;
pub mod models;
pub mod records;
pub mod tracker;
