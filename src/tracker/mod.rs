pub mod fusion;
pub mod landmarks;
pub mod lerp;
pub mod smooth;

pub use fusion::{
    Anchor, AnchorTargets, BodyTrackingSource, DeviceTrackingSource, PoseFusion, PoseSource,
    SkeletonMapper, SourcePose, TrackingWeights,
};
pub use landmarks::LandmarkStore;
pub use smooth::Smoother;
