pub mod repo;
pub mod rules;
pub mod service;
