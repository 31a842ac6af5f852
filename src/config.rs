use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub landmarks: LandmarkConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub vmt: VmtConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LandmarkConfig {
    /// 追跡扱いとする最小信頼度
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// EMA係数 (1.0 = 平滑化なし)
    #[serde(default = "default_landmark_smoothing")]
    pub smoothing: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FusionConfig {
    #[serde(default = "default_body_weight")]
    pub body_weight: f32,
    #[serde(default = "default_vr_weight")]
    pub vr_weight: f32,
    /// 融合結果の位置EMA係数
    #[serde(default = "default_position_smoothing")]
    pub position_smoothing: f32,
    /// 融合結果の回転NLERP係数
    #[serde(default = "default_rotation_smoothing")]
    pub rotation_smoothing: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationConfig {
    /// サンプリング時間（秒）
    #[serde(default = "default_duration_secs")]
    pub duration_secs: f32,
    /// サンプリング回数
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
    /// スケール算出の基準身長（メートル）
    #[serde(default = "default_reference_height")]
    pub reference_height: f32,
    /// 安定度スコアの分散スケール（m^2）
    #[serde(default = "default_stability_scale")]
    pub stability_scale: f32,
    /// トラッキング品質0のときのbody重み
    #[serde(default = "default_min_body_weight")]
    pub min_body_weight: f32,
    /// トラッキング品質1のときのbody重み
    #[serde(default = "default_max_body_weight")]
    pub max_body_weight: f32,
    /// キャリブレーション結果の保存先
    #[serde(default = "default_record_path")]
    pub record_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// 観測バッチの取り込みレート (Hz)
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VmtConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_vmt_addr")]
    pub addr: String,
    /// head / left hand / right hand に割り当てる先頭トラッカー番号
    #[serde(default)]
    pub first_index: i32,
}

fn default_confidence_threshold() -> f32 { 0.5 }
fn default_landmark_smoothing() -> f32 { 0.3 }
fn default_body_weight() -> f32 { 0.5 }
fn default_vr_weight() -> f32 { 0.5 }
fn default_position_smoothing() -> f32 { 0.5 }
fn default_rotation_smoothing() -> f32 { 0.5 }
fn default_duration_secs() -> f32 { 5.0 }
fn default_sample_count() -> usize { 50 }
fn default_reference_height() -> f32 { 1.7 }
fn default_stability_scale() -> f32 { 0.1 }
fn default_min_body_weight() -> f32 { 0.3 }
fn default_max_body_weight() -> f32 { 0.9 }
fn default_record_path() -> String { "calibration.json".to_string() }
fn default_rate_hz() -> f32 { 30.0 }
fn default_vmt_addr() -> String { crate::vmt::VMT_DEFAULT_ADDR.to_string() }

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            smoothing: default_landmark_smoothing(),
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            body_weight: default_body_weight(),
            vr_weight: default_vr_weight(),
            position_smoothing: default_position_smoothing(),
            rotation_smoothing: default_rotation_smoothing(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
            sample_count: default_sample_count(),
            reference_height: default_reference_height(),
            stability_scale: default_stability_scale(),
            min_body_weight: default_min_body_weight(),
            max_body_weight: default_max_body_weight(),
            record_path: default_record_path(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { rate_hz: default_rate_hz() }
    }
}

impl Default for VmtConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_vmt_addr(),
            first_index: 0,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;
        Ok(config)
    }

    /// 読み込みに失敗した場合はデフォルト設定を返す
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{:#}; using default config", e);
                Self::default()
            }
        }
    }
}
