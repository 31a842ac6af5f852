use serde::{Deserialize, Serialize};

use crate::vmt::TrackerPose;

/// VRランタイムから毎フレーム受け取るデバイス姿勢
///
/// `None` は未接続。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    #[serde(default)]
    pub head: Option<TrackerPose>,
    #[serde(default)]
    pub left_controller: Option<TrackerPose>,
    #[serde(default)]
    pub right_controller: Option<TrackerPose>,
}

impl DeviceSnapshot {
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// HMDが接続されていればVRデバイス初期化済みとみなす
    pub fn is_initialized(&self) -> bool {
        self.head.is_some()
    }

    pub fn connected_count(&self) -> usize {
        [self.head, self.left_controller, self.right_controller]
            .iter()
            .filter(|p| p.is_some())
            .count()
    }
}
