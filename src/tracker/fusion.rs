use anyhow::Result;
use tracing::debug;

use crate::calibration::SimilarityTransform;
use crate::config::FusionConfig;
use crate::device::DeviceSnapshot;
use crate::pose::JointTag;
use crate::tracker::landmarks::LandmarkStore;
use crate::tracker::lerp::lerp_position;
use crate::tracker::smooth::Smoother;
use crate::vmt::TrackerPose;

/// ポーズ融合で駆動するアンカー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Anchor {
    Head,
    LeftHand,
    RightHand,
}

impl Anchor {
    pub const COUNT: usize = 3;
    pub const ALL: [Anchor; Self::COUNT] = [Self::Head, Self::LeftHand, Self::RightHand];

    pub fn index(self) -> usize {
        self as usize
    }

    /// ボディトラッキング側で対応するランドマーク
    pub fn landmark(self) -> JointTag {
        match self {
            Self::Head => JointTag::Nose,
            Self::LeftHand => JointTag::LeftWrist,
            Self::RightHand => JointTag::RightWrist,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::LeftHand => "left_hand",
            Self::RightHand => "right_hand",
        }
    }
}

/// ソースが返すアンカー姿勢。ボディトラッキングは回転を持たない
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourcePose {
    pub position: [f32; 3],
    pub rotation: Option<[f32; 4]>,
}

pub trait PoseSource {
    /// データが無いフレームは None
    fn anchor_pose(&self, anchor: Anchor) -> Option<SourcePose>;
}

/// LandmarkStore の Nose / LeftWrist / RightWrist をVR空間へ写像して返す
pub struct BodyTrackingSource<'a> {
    store: &'a LandmarkStore,
    transform: SimilarityTransform,
}

impl<'a> BodyTrackingSource<'a> {
    pub fn new(store: &'a LandmarkStore, transform: SimilarityTransform) -> Self {
        Self { store, transform }
    }
}

impl PoseSource for BodyTrackingSource<'_> {
    fn anchor_pose(&self, anchor: Anchor) -> Option<SourcePose> {
        let position = self.store.position(anchor.landmark()).ok()?;
        Some(SourcePose {
            position: self.transform.apply(&position),
            rotation: None,
        })
    }
}

/// HMD / コントローラ姿勢
pub struct DeviceTrackingSource<'a> {
    snapshot: &'a DeviceSnapshot,
}

impl<'a> DeviceTrackingSource<'a> {
    pub fn new(snapshot: &'a DeviceSnapshot) -> Self {
        Self { snapshot }
    }
}

impl PoseSource for DeviceTrackingSource<'_> {
    fn anchor_pose(&self, anchor: Anchor) -> Option<SourcePose> {
        let pose = match anchor {
            Anchor::Head => self.snapshot.head,
            Anchor::LeftHand => self.snapshot.left_controller,
            Anchor::RightHand => self.snapshot.right_controller,
        }?;
        Some(SourcePose {
            position: pose.position,
            rotation: Some(pose.rotation),
        })
    }
}

/// 各ソースの信頼重み。書き込み時に [0, 1] へクランプ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingWeights {
    body: f32,
    vr: f32,
}

impl TrackingWeights {
    pub fn new(body: f32, vr: f32) -> Self {
        Self {
            body: clamp_weight(body),
            vr: clamp_weight(vr),
        }
    }

    pub fn body(&self) -> f32 {
        self.body
    }

    pub fn vr(&self) -> f32 {
        self.vr
    }

    /// デバイス姿勢をボディ位置へ寄せる割合
    ///
    /// どちらかの重みが0なら他方のソースを素通しする: body=0 は係数0でデバイスそのまま、
    /// vr=0 (かつ body>0) は body の値に関わらず係数1でボディ位置そのまま。
    pub fn blend_factor(&self) -> f32 {
        if self.vr <= 0.0 && self.body > 0.0 {
            1.0
        } else {
            self.body
        }
    }
}

impl Default for TrackingWeights {
    fn default() -> Self {
        Self::new(0.5, 0.5)
    }
}

fn clamp_weight(w: f32) -> f32 {
    if w.is_nan() {
        0.0
    } else {
        w.clamp(0.0, 1.0)
    }
}

/// アンカーごとの融合済みターゲット姿勢
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnchorTargets {
    poses: [Option<TrackerPose>; Anchor::COUNT],
}

impl AnchorTargets {
    pub fn get(&self, anchor: Anchor) -> Option<TrackerPose> {
        self.poses[anchor.index()]
    }

    pub fn set(&mut self, anchor: Anchor, pose: TrackerPose) {
        self.poses[anchor.index()] = Some(pose);
    }

    /// 定義済みのアンカーのみ
    pub fn iter(&self) -> impl Iterator<Item = (Anchor, &TrackerPose)> {
        Anchor::ALL
            .iter()
            .filter_map(move |&a| self.poses[a.index()].as_ref().map(|p| (a, p)))
    }

    pub fn defined_count(&self) -> usize {
        self.poses.iter().filter(|p| p.is_some()).count()
    }
}

/// 融合結果を受け取ってアバターのボーンを駆動する側
pub trait SkeletonMapper {
    fn apply(&mut self, targets: &AnchorTargets) -> Result<()>;
}

/// ボディトラッキングとVRデバイスの2ソース融合
pub struct PoseFusion {
    weights: TrackingWeights,
    transform: SimilarityTransform,
    smoothers: [Smoother; Anchor::COUNT],
    /// 平滑化前の融合値（回転保持に使う）
    raw: [Option<TrackerPose>; Anchor::COUNT],
    targets: AnchorTargets,
}

impl PoseFusion {
    pub fn new(weights: TrackingWeights, position_smoothing: f32, rotation_smoothing: f32) -> Self {
        Self {
            weights,
            transform: SimilarityTransform::identity(),
            smoothers: std::array::from_fn(|_| Smoother::new(position_smoothing, rotation_smoothing)),
            raw: [None; Anchor::COUNT],
            targets: AnchorTargets::default(),
        }
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(
            TrackingWeights::new(config.body_weight, config.vr_weight),
            config.position_smoothing,
            config.rotation_smoothing,
        )
    }

    pub fn weights(&self) -> TrackingWeights {
        self.weights
    }

    pub fn set_weights(&mut self, body: f32, vr: f32) {
        self.weights = TrackingWeights::new(body, vr);
        debug!("Tracking weights: body={:.3}, vr={:.3}", self.weights.body, self.weights.vr);
    }

    pub fn set_body_weight(&mut self, body: f32) {
        self.set_weights(body, self.weights.vr);
    }

    pub fn set_vr_weight(&mut self, vr: f32) {
        self.set_weights(self.weights.body, vr);
    }

    pub fn set_smoothing(&mut self, position: f32, rotation: f32) {
        for s in &mut self.smoothers {
            s.set_alphas(position, rotation);
        }
    }

    pub fn body_transform(&self) -> SimilarityTransform {
        self.transform
    }

    pub fn set_body_transform(&mut self, transform: SimilarityTransform) {
        self.transform = transform;
    }

    pub fn targets(&self) -> &AnchorTargets {
        &self.targets
    }

    /// 1フレーム分の融合。データが無いアンカーは直前の値で固定
    pub fn update(&mut self, body: &dyn PoseSource, device: &dyn PoseSource) -> &AnchorTargets {
        for anchor in Anchor::ALL {
            let i = anchor.index();
            let Some(fused) = self.fuse_anchor(anchor, body, device) else {
                continue;
            };
            self.raw[i] = Some(fused);
            let smoothed = self.smoothers[i].apply(fused);
            self.targets.set(anchor, smoothed);
        }
        &self.targets
    }

    fn fuse_anchor(
        &self,
        anchor: Anchor,
        body: &dyn PoseSource,
        device: &dyn PoseSource,
    ) -> Option<TrackerPose> {
        let held_rotation = self.raw[anchor.index()]
            .map(|p| p.rotation)
            .unwrap_or(TrackerPose::identity().rotation);

        match (device.anchor_pose(anchor), body.anchor_pose(anchor)) {
            (None, None) => None,
            (Some(dev), None) => Some(pose_from_source(&dev, held_rotation)),
            (None, Some(body)) => Some(pose_from_source(&body, held_rotation)),
            (Some(dev), Some(body)) => {
                let position = lerp_position(&dev.position, &body.position, self.weights.blend_factor());
                Some(TrackerPose::new(position, dev.rotation.unwrap_or(held_rotation)))
            }
        }
    }

    pub fn reset(&mut self) {
        for s in &mut self.smoothers {
            s.reset();
        }
        self.raw = [None; Anchor::COUNT];
        self.targets = AnchorTargets::default();
    }
}

impl Default for PoseFusion {
    fn default() -> Self {
        Self::from_config(&FusionConfig::default())
    }
}

fn pose_from_source(source: &SourcePose, fallback_rotation: [f32; 4]) -> TrackerPose {
    TrackerPose::new(source.position, source.rotation.unwrap_or(fallback_rotation))
}
