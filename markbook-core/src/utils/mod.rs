// src/utils/mod.rs
pub mod atomic;
pub mod logbook;
pub mod path;
