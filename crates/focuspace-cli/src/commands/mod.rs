pub mod catalog;
pub mod config;
pub mod prefs;
pub mod run;
