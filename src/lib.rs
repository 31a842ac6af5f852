pub mod calibration;
pub mod config;
pub mod device;
pub mod error;
pub mod pose;
pub mod runtime;
pub mod tracker;
pub mod vmt;
