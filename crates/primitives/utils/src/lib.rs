#![allow(clippy::new_without_default)]

pub mod parsers;
pub mod service;
