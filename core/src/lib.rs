pub mod aggregate;
pub mod cache;
pub mod db;
pub mod format;
pub mod manual;
pub mod models;
pub mod pantry;
pub mod service;
pub mod state;
pub mod storage;
