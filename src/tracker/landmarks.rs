use crate::config::LandmarkConfig;
use crate::error::{TrackingError, TrackingResult};
use crate::pose::{JointTag, Landmark, ObservationBatch};
use crate::tracker::lerp::lerp_position;

/// 直近の追跡ランドマーク集合
///
/// 閾値未満・欠損したタグは集合から取り除かれる（0埋めで残さない）。
/// 追跡中のタグのみ前回値とEMAで平滑化する。
#[derive(Debug, Clone)]
pub struct LandmarkStore {
    confidence_threshold: f32,
    alpha: f32,
    landmarks: [Option<Landmark>; JointTag::COUNT],
}

impl LandmarkStore {
    pub fn new(confidence_threshold: f32, alpha: f32) -> Self {
        Self {
            confidence_threshold,
            alpha: alpha.clamp(0.0, 1.0),
            landmarks: [None; JointTag::COUNT],
        }
    }

    pub fn from_config(config: &LandmarkConfig) -> Self {
        Self::new(config.confidence_threshold, config.smoothing)
    }

    /// 次回の update から反映される
    pub fn set_confidence_threshold(&mut self, threshold: f32) {
        self.confidence_threshold = threshold;
    }

    /// 次回の update から反映される
    pub fn set_smoothing(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn smoothing(&self) -> f32 {
        self.alpha
    }

    /// 観測バッチで追跡集合を丸ごと置き換える
    pub fn update(&mut self, observations: &ObservationBatch) {
        let mut next = [None; JointTag::COUNT];
        for tag in JointTag::ALL {
            let Some(obs) = observations.get(&tag) else {
                continue;
            };
            if !obs.is_valid(self.confidence_threshold) {
                continue;
            }
            let position = match &self.landmarks[tag.index()] {
                Some(prev) => lerp_position(&prev.position, &obs.position, self.alpha),
                None => obs.position,
            };
            next[tag.index()] = Some(Landmark {
                position,
                confidence: obs.confidence,
            });
        }
        self.landmarks = next;
    }

    pub fn is_tracked(&self, tag: JointTag) -> bool {
        self.landmarks[tag.index()].is_some()
    }

    pub fn get(&self, tag: JointTag) -> Option<&Landmark> {
        self.landmarks[tag.index()].as_ref()
    }

    pub fn position(&self, tag: JointTag) -> TrackingResult<[f32; 3]> {
        self.get(tag)
            .map(|lm| lm.position)
            .ok_or(TrackingError::NotTracked(tag))
    }

    /// 未追跡なら 0.0
    pub fn confidence(&self, tag: JointTag) -> f32 {
        self.get(tag).map_or(0.0, |lm| lm.confidence)
    }

    /// 全タグが追跡中か
    pub fn all_tracked(&self, tags: &[JointTag]) -> bool {
        tags.iter().all(|&t| self.is_tracked(t))
    }

    pub fn tracked_count(&self) -> usize {
        self.landmarks.iter().filter(|l| l.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (JointTag, &Landmark)> {
        JointTag::ALL
            .iter()
            .filter_map(move |&tag| self.get(tag).map(|lm| (tag, lm)))
    }

    pub fn clear(&mut self) {
        self.landmarks = [None; JointTag::COUNT];
    }
}

impl Default for LandmarkStore {
    fn default() -> Self {
        Self::from_config(&LandmarkConfig::default())
    }
}
