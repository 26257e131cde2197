pub mod api;
pub mod config;
pub mod controller;
pub mod display;
pub mod domain;
pub mod provisioning;
pub mod sensors;
pub mod simulation;
pub mod telemetry;
