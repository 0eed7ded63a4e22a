//! Edge-Infer server library: configuration, engine context, network
//! infrastructure, and the per-connection request pipeline.

pub mod application;
pub mod domain;
pub mod engine;
pub mod infrastructure;
