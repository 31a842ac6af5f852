use crate::tracker::lerp::{lerp_position, nlerp};
use crate::vmt::TrackerPose;

/// EMAベースのポーズ平滑化フィルタ
///
/// 位置: 成分ごとのEMA
/// 回転: NLERP (Normalized Linear Interpolation)
#[derive(Debug, Clone)]
pub struct Smoother {
    alpha_position: f32,
    alpha_rotation: f32,
    prev: Option<TrackerPose>,
}

impl Smoother {
    pub fn new(alpha_position: f32, alpha_rotation: f32) -> Self {
        Self {
            alpha_position: alpha_position.clamp(0.0, 1.0),
            alpha_rotation: alpha_rotation.clamp(0.0, 1.0),
            prev: None,
        }
    }

    /// 次回の apply から反映される
    pub fn set_alphas(&mut self, alpha_position: f32, alpha_rotation: f32) {
        self.alpha_position = alpha_position.clamp(0.0, 1.0);
        self.alpha_rotation = alpha_rotation.clamp(0.0, 1.0);
    }

    pub fn alphas(&self) -> (f32, f32) {
        (self.alpha_position, self.alpha_rotation)
    }

    pub fn last(&self) -> Option<TrackerPose> {
        self.prev
    }

    pub fn apply(&mut self, pose: TrackerPose) -> TrackerPose {
        let prev = match self.prev {
            Some(prev) => prev,
            None => {
                self.prev = Some(pose);
                return pose;
            }
        };

        let position = lerp_position(&prev.position, &pose.position, self.alpha_position);
        let rotation = nlerp(&prev.rotation, &pose.rotation, self.alpha_rotation);

        let result = TrackerPose::new(position, rotation);
        self.prev = Some(result);
        result
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }
}
