use nalgebra::Vector3;

use crate::pose::JointTag;
use crate::tracker::LandmarkStore;

/// キャリブレーションで計測する体格メトリクス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyMetric {
    Height,
    ArmSpan,
    LegLength,
    ShoulderWidth,
}

/// 縮約時に使う成分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Y成分
    Vertical,
    /// X成分の絶対値
    Horizontal,
}

impl BodyMetric {
    pub const COUNT: usize = 4;
    pub const ALL: [BodyMetric; Self::COUNT] =
        [Self::Height, Self::ArmSpan, Self::LegLength, Self::ShoulderWidth];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Height => "height",
            Self::ArmSpan => "arm_span",
            Self::LegLength => "leg_length",
            Self::ShoulderWidth => "shoulder_width",
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Self::Height | Self::LegLength => Axis::Vertical,
            Self::ArmSpan | Self::ShoulderWidth => Axis::Horizontal,
        }
    }

    /// サンプル取得に必要なランドマーク
    pub fn required_landmarks(self) -> &'static [JointTag] {
        use JointTag::*;
        match self {
            Self::Height => &[Nose, LeftAnkle, RightAnkle],
            Self::ArmSpan => &[LeftWrist, RightWrist],
            Self::LegLength => &[LeftHip, RightHip, LeftAnkle, RightAnkle],
            Self::ShoulderWidth => &[LeftShoulder, RightShoulder],
        }
    }

    /// 現フレームのサンプルベクトル。必要なランドマークが1つでも欠けていれば None
    pub fn sample(self, store: &LandmarkStore) -> Option<Vector3<f32>> {
        use JointTag::*;
        let p = |tag: JointTag| store.position(tag).ok().map(Vector3::from);
        let mid = |a: JointTag, b: JointTag| Some((p(a)? + p(b)?) * 0.5);
        match self {
            // 頭頂ではなく鼻から足首中点まで
            Self::Height => Some(p(Nose)? - mid(LeftAnkle, RightAnkle)?),
            Self::ArmSpan => Some(p(RightWrist)? - p(LeftWrist)?),
            Self::LegLength => Some(mid(LeftHip, RightHip)? - mid(LeftAnkle, RightAnkle)?),
            Self::ShoulderWidth => Some(p(RightShoulder)? - p(LeftShoulder)?),
        }
    }

    /// 平均ベクトルからスカラー値を取り出す
    pub fn component(self, v: &Vector3<f32>) -> f32 {
        match self.axis() {
            Axis::Vertical => v.y,
            Axis::Horizontal => v.x.abs(),
        }
    }
}

/// メトリクス1つ分の縮約結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSummary {
    pub mean: Vector3<f32>,
    /// 平均からの二乗距離の平均
    pub variance: f32,
    pub sample_count: usize,
}

/// サンプル列の平均と分散。空なら None
pub fn summarize(samples: &[Vector3<f32>]) -> Option<MetricSummary> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f32;
    let mean = samples.iter().fold(Vector3::zeros(), |acc, s| acc + s) / n;
    let variance = samples.iter().map(|s| (s - mean).norm_squared()).sum::<f32>() / n;
    Some(MetricSummary {
        mean,
        variance,
        sample_count: samples.len(),
    })
}

/// 安定度 = clamp01(1 - variance / scale)。2サンプル未満は 0
pub fn stability_score(samples: &[Vector3<f32>], scale: f32) -> f32 {
    if samples.len() < 2 || scale <= 0.0 {
        return 0.0;
    }
    match summarize(samples) {
        Some(summary) => (1.0 - summary.variance / scale).clamp(0.0, 1.0),
        None => 0.0,
    }
}
