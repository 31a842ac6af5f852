use thiserror::Error;

use crate::pose::JointTag;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackingError {
    #[error("Landmark '{}' is not tracked", .0.as_str())]
    NotTracked(JointTag),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("Calibration is already sampling")]
    AlreadySampling,

    #[error("Calibration cannot be reset while sampling")]
    SamplingInProgress,

    #[error("Calibration prerequisites not met (body tracking: {body_tracking}, vr device: {device_ready})")]
    NotReady { body_tracking: bool, device_ready: bool },
}

pub type TrackingResult<T> = Result<T, TrackingError>;
