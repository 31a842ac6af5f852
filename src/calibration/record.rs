use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

use super::metrics::BodyMetric;
use crate::config::CalibrationConfig;
use crate::tracker::lerp::lerp;

/// ボディトラッキング空間 → VR空間の相似変換
///
/// `pivot` を中心に一様スケールしてから平行移動する: `s * (p - pivot) + pivot + t`。
/// キャリブレーション時の鼻位置を pivot にすると、その点は `pivot + t`（HMD位置）に写る。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTransform {
    pub scale: f32,
    pub translation: [f32; 3],
    #[serde(default)]
    pub pivot: [f32; 3],
}

impl SimilarityTransform {
    /// 原点中心
    pub fn new(scale: f32, translation: [f32; 3]) -> Self {
        Self::about(scale, [0.0; 3], translation)
    }

    pub fn about(scale: f32, pivot: [f32; 3], translation: [f32; 3]) -> Self {
        Self {
            scale,
            translation,
            pivot,
        }
    }

    pub fn identity() -> Self {
        Self::new(1.0, [0.0; 3])
    }

    /// 身長から求めるスケール。未計測なら 1.0
    pub fn scale_for_height(user_height: f32, reference_height: f32) -> f32 {
        if user_height > 0.0 && reference_height > 0.0 {
            user_height / reference_height
        } else {
            1.0
        }
    }

    pub fn apply(&self, p: &[f32; 3]) -> [f32; 3] {
        std::array::from_fn(|i| (p[i] - self.pivot[i]) * self.scale + self.pivot[i] + self.translation[i])
    }
}

impl Default for SimilarityTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// キャリブレーション結果から推奨される融合重み
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendedWeights {
    pub body: f32,
    pub vr: f32,
}

impl RecommendedWeights {
    /// body = lerp(min, max, quality), vr = 1 - body
    pub fn from_quality(quality: f32, config: &CalibrationConfig) -> Self {
        let body = lerp(config.min_body_weight, config.max_body_weight, quality).clamp(0.0, 1.0);
        Self { body, vr: 1.0 - body }
    }
}

/// キャリブレーション1回分の結果
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationRecord {
    pub user_height: f32,
    pub arm_span: f32,
    pub leg_length: f32,
    pub shoulder_width: f32,
    /// HMD位置 - Nose位置
    pub headset_offset: [f32; 3],
    /// 左コントローラ位置 - LeftWrist位置
    pub left_controller_offset: [f32; 3],
    /// 右コントローラ位置 - RightWrist位置
    pub right_controller_offset: [f32; 3],
    /// BodyMetric::ALL 順
    pub stability: [f32; BodyMetric::COUNT],
    pub tracking_quality: f32,
    pub transform: SimilarityTransform,
    /// 保存されていなかった場合は None（融合器の設定値を変えない）
    pub weights: Option<RecommendedWeights>,
}

impl CalibrationRecord {
    /// 身長が一度でも計測されていれば校正済み
    pub fn is_calibrated(&self) -> bool {
        self.user_height > 0.0
    }

    pub fn metric(&self, metric: BodyMetric) -> f32 {
        match metric {
            BodyMetric::Height => self.user_height,
            BodyMetric::ArmSpan => self.arm_span,
            BodyMetric::LegLength => self.leg_length,
            BodyMetric::ShoulderWidth => self.shoulder_width,
        }
    }

    pub fn set_metric(&mut self, metric: BodyMetric, value: f32) {
        match metric {
            BodyMetric::Height => self.user_height = value,
            BodyMetric::ArmSpan => self.arm_span = value,
            BodyMetric::LegLength => self.leg_length = value,
            BodyMetric::ShoulderWidth => self.shoulder_width = value,
        }
    }

    pub fn stability(&self, metric: BodyMetric) -> f32 {
        self.stability[metric.index()]
    }

    /// 設定ストア向けのフラットなスカラー表現
    pub fn to_fields(&self) -> BTreeMap<String, f32> {
        let mut fields = BTreeMap::new();
        for metric in BodyMetric::ALL {
            fields.insert(field_name(metric).to_string(), self.metric(metric));
            fields.insert(format!("stability_{}", metric.as_str()), self.stability(metric));
        }
        put_vec3(&mut fields, "headset_offset", &self.headset_offset);
        put_vec3(&mut fields, "left_controller_offset", &self.left_controller_offset);
        put_vec3(&mut fields, "right_controller_offset", &self.right_controller_offset);
        put_vec3(&mut fields, "transform_translation", &self.transform.translation);
        put_vec3(&mut fields, "transform_pivot", &self.transform.pivot);
        fields.insert("transform_scale".to_string(), self.transform.scale);
        fields.insert("tracking_quality".to_string(), self.tracking_quality);
        if let Some(weights) = self.weights {
            fields.insert("body_weight".to_string(), weights.body);
            fields.insert("vr_weight".to_string(), weights.vr);
        }
        fields
    }

    /// 欠けているキーはデフォルト値
    ///
    /// 変換が保存されていなければ身長とHMDオフセットから作り直す。
    /// 重みが無ければ tracking_quality から導出し、それも無ければ None。
    pub fn from_fields(fields: &BTreeMap<String, f32>, config: &CalibrationConfig) -> Self {
        let get = |key: &str| fields.get(key).copied();
        let mut record = Self::default();
        for metric in BodyMetric::ALL {
            record.set_metric(metric, get(field_name(metric)).unwrap_or(0.0));
            record.stability[metric.index()] =
                get(format!("stability_{}", metric.as_str()).as_str()).unwrap_or(0.0);
        }
        record.headset_offset = get_vec3(fields, "headset_offset");
        record.left_controller_offset = get_vec3(fields, "left_controller_offset");
        record.right_controller_offset = get_vec3(fields, "right_controller_offset");

        record.transform = match get("transform_scale") {
            Some(scale) => SimilarityTransform::about(
                scale,
                get_vec3(fields, "transform_pivot"),
                get_vec3(fields, "transform_translation"),
            ),
            None => SimilarityTransform::new(
                SimilarityTransform::scale_for_height(record.user_height, config.reference_height),
                record.headset_offset,
            ),
        };

        let quality = get("tracking_quality");
        record.tracking_quality = quality.unwrap_or(0.0);
        record.weights = match (get("body_weight"), get("vr_weight")) {
            (Some(body), Some(vr)) => Some(RecommendedWeights { body, vr }),
            _ => quality.map(|q| RecommendedWeights::from_quality(q, config)),
        };
        record
    }
}

fn field_name(metric: BodyMetric) -> &'static str {
    match metric {
        BodyMetric::Height => "user_height",
        other => other.as_str(),
    }
}

fn put_vec3(fields: &mut BTreeMap<String, f32>, prefix: &str, v: &[f32; 3]) {
    for (axis, value) in ["x", "y", "z"].iter().zip(v.iter()) {
        fields.insert(format!("{}_{}", prefix, axis), *value);
    }
}

fn get_vec3(fields: &BTreeMap<String, f32>, prefix: &str) -> [f32; 3] {
    let get = |axis: &str| {
        fields
            .get(&format!("{}_{}", prefix, axis))
            .copied()
            .unwrap_or(0.0)
    };
    [get("x"), get("y"), get("z")]
}

// --- Save / Load ---

pub fn save_record<P: AsRef<Path>>(path: P, record: &CalibrationRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(&record.to_fields())?;
    fs::write(path.as_ref(), json).context("Failed to write calibration record")?;
    Ok(())
}

/// ファイルが無ければデフォルト（ゼロ）のレコード
pub fn load_record<P: AsRef<Path>>(path: P, config: &CalibrationConfig) -> Result<CalibrationRecord> {
    let path = path.as_ref();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No calibration record at {}, starting uncalibrated", path.display());
            return Ok(CalibrationRecord::default());
        }
        Err(e) => return Err(e).context("Failed to read calibration record"),
    };
    let fields: BTreeMap<String, f32> =
        serde_json::from_str(&content).context("Failed to parse calibration record")?;
    Ok(CalibrationRecord::from_fields(&fields, config))
}
