pub mod keypoint;

pub use keypoint::{JointTag, Landmark, Observation, ObservationBatch};
