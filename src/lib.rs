// src/lib.rs

pub mod api;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod models;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod stats;

pub use error::{Result, SchedulerError};
pub use models::{AppState, Difficulty, Outcome, Problem, ProgressRecord, ProgressView, Stats};
