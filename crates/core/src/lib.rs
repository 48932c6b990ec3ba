#![deny(warnings)]

pub mod config;
pub mod normalize;
pub mod proxy;
pub mod record;
pub mod relay;
pub mod translate;
