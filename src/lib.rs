pub mod config;
pub mod jbbot;
pub mod jbdb;
pub mod models;
pub mod ojcli;
pub mod submission;
