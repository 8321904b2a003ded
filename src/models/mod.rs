//! Core data models for the paste service.

pub mod paste;
