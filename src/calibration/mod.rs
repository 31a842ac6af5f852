//! 体格キャリブレーション
//!
//! 一定時間ランドマークをサンプリングし、体格メトリクスとデバイスオフセットを
//! 1つの [`CalibrationRecord`] に縮約する。結果の重みと相似変換は
//! [`PoseFusion`] に書き戻される。
//!
//! 状態遷移: `Idle → Sampling → Reducing → Applied → Idle`
//! Reducing / Applied は `tick` の中で完了し、外から観測される保持時間はない。

pub mod metrics;
pub mod record;

use nalgebra::Vector3;
use tracing::{debug, info, warn};

use crate::config::CalibrationConfig;
use crate::device::DeviceSnapshot;
use crate::error::CalibrationError;
use crate::tracker::{Anchor, LandmarkStore, PoseFusion};
use crate::vmt::TrackerPose;

pub use metrics::{stability_score, summarize, BodyMetric, MetricSummary};
pub use record::{load_record, save_record, CalibrationRecord, RecommendedWeights, SimilarityTransform};

/// トラッキング品質の算出に使うメトリクス
const QUALITY_METRICS: [BodyMetric; 3] = [BodyMetric::Height, BodyMetric::ArmSpan, BodyMetric::LegLength];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    Idle,
    Sampling,
    Reducing,
    Applied,
}

/// キャリブレーション開始の前提条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationReadiness {
    /// ボディトラッカーが何かしら追跡している
    pub body_tracking: bool,
    /// VRデバイス（HMD）が初期化済み
    pub device_ready: bool,
}

impl CalibrationReadiness {
    pub fn evaluate(store: &LandmarkStore, device: &DeviceSnapshot) -> Self {
        Self {
            body_tracking: store.tracked_count() > 0,
            device_ready: device.is_initialized(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.body_tracking && self.device_ready
    }
}

type ProgressObserver = Box<dyn FnMut(f32)>;
type CompleteObserver = Box<dyn FnMut(&CalibrationRecord)>;

pub struct CalibrationEngine {
    config: CalibrationConfig,
    state: CalibrationState,
    elapsed: f32,
    samples_taken: usize,
    samples: [Vec<Vector3<f32>>; BodyMetric::COUNT],
    enabled: [bool; BodyMetric::COUNT],
    record: CalibrationRecord,
    progress: f32,
    progress_observers: Vec<ProgressObserver>,
    complete_observers: Vec<CompleteObserver>,
}

impl CalibrationEngine {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            state: CalibrationState::Idle,
            elapsed: 0.0,
            samples_taken: 0,
            samples: Default::default(),
            enabled: [true; BodyMetric::COUNT],
            record: CalibrationRecord::default(),
            progress: 0.0,
            progress_observers: Vec::new(),
            complete_observers: Vec::new(),
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn is_sampling(&self) -> bool {
        self.state == CalibrationState::Sampling
    }

    /// 経過時間 / サンプリング時間 (0.0..=1.0)
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn record(&self) -> &CalibrationRecord {
        &self.record
    }

    /// 永続化されていたレコードを復元する
    pub fn restore(&mut self, record: CalibrationRecord) {
        self.record = record;
    }

    pub fn set_metric_enabled(&mut self, metric: BodyMetric, enabled: bool) {
        self.enabled[metric.index()] = enabled;
    }

    pub fn is_metric_enabled(&self, metric: BodyMetric) -> bool {
        self.enabled[metric.index()]
    }

    /// 今回のセッションで集めたサンプル
    pub fn samples(&self, metric: BodyMetric) -> &[Vector3<f32>] {
        &self.samples[metric.index()]
    }

    pub fn on_progress<F: FnMut(f32) + 'static>(&mut self, observer: F) {
        self.progress_observers.push(Box::new(observer));
    }

    pub fn on_complete<F: FnMut(&CalibrationRecord) + 'static>(&mut self, observer: F) {
        self.complete_observers.push(Box::new(observer));
    }

    fn sample_interval(&self) -> f32 {
        self.config.duration_secs / self.config.sample_count.max(1) as f32
    }

    pub fn start_calibration(&mut self, readiness: CalibrationReadiness) -> Result<(), CalibrationError> {
        if self.is_sampling() {
            warn!("Calibration already in progress; ignoring start request");
            return Err(CalibrationError::AlreadySampling);
        }
        if !readiness.is_ready() {
            warn!(
                "Calibration prerequisites not met (body tracking: {}, vr device: {})",
                readiness.body_tracking, readiness.device_ready
            );
            return Err(CalibrationError::NotReady {
                body_tracking: readiness.body_tracking,
                device_ready: readiness.device_ready,
            });
        }

        for s in &mut self.samples {
            s.clear();
        }
        self.elapsed = 0.0;
        self.samples_taken = 0;
        self.progress = 0.0;
        self.state = CalibrationState::Sampling;
        info!(
            "Calibration started: {:.1}s, {} samples",
            self.config.duration_secs, self.config.sample_count
        );
        Ok(())
    }

    /// フレームループから毎フレーム呼ぶ。セッションが完了したフレームのみレコードを返す
    pub fn tick(
        &mut self,
        dt: f32,
        store: &LandmarkStore,
        device: &DeviceSnapshot,
        fusion: &mut PoseFusion,
    ) -> Option<CalibrationRecord> {
        if !self.is_sampling() {
            return None;
        }
        self.elapsed += dt.max(0.0);

        let interval = self.sample_interval();
        let sample_count = self.config.sample_count.max(1);
        while self.samples_taken < sample_count
            && self.samples_taken as f32 * interval <= self.elapsed
        {
            self.take_sample(store);
        }

        if self.elapsed < self.config.duration_secs {
            return None;
        }

        self.state = CalibrationState::Reducing;
        self.set_progress(1.0);
        let record = self.reduce(store, device);

        self.state = CalibrationState::Applied;
        self.apply(&record, fusion);
        self.record = record;
        for observer in &mut self.complete_observers {
            observer(&record);
        }
        info!(
            "Calibration complete: height={:.3}m, arm_span={:.3}m, quality={:.3}, scale={:.3}",
            record.user_height, record.arm_span, record.tracking_quality, record.transform.scale
        );

        self.state = CalibrationState::Idle;
        Some(record)
    }

    fn take_sample(&mut self, store: &LandmarkStore) {
        for metric in BodyMetric::ALL {
            if !self.enabled[metric.index()] || !store.all_tracked(metric.required_landmarks()) {
                continue;
            }
            if let Some(sample) = metric.sample(store) {
                self.samples[metric.index()].push(sample);
            }
        }
        self.samples_taken += 1;
        debug!("Calibration sample {}/{}", self.samples_taken, self.config.sample_count);
        let fraction = if self.config.duration_secs > 0.0 {
            self.elapsed / self.config.duration_secs
        } else {
            1.0
        };
        self.set_progress(fraction);
    }

    fn set_progress(&mut self, fraction: f32) {
        self.progress = fraction.clamp(0.0, 1.0);
        let progress = self.progress;
        for observer in &mut self.progress_observers {
            observer(progress);
        }
    }

    /// 集めたサンプルと現フレームのデバイス姿勢からレコードを作る
    ///
    /// サンプルが無いメトリクス・取得できないオフセットは直前のレコードの値を引き継ぐ。
    fn reduce(&self, store: &LandmarkStore, device: &DeviceSnapshot) -> CalibrationRecord {
        let mut record = self.record;

        for metric in BodyMetric::ALL {
            let samples = &self.samples[metric.index()];
            if let Some(summary) = summarize(samples) {
                record.set_metric(metric, metric.component(&summary.mean));
            } else {
                debug!("No samples for {}, keeping {:.3}", metric.as_str(), record.metric(metric));
            }
            record.stability[metric.index()] = stability_score(samples, self.config.stability_scale);
        }

        let offset = |anchor: Anchor, pose: Option<TrackerPose>| -> Option<([f32; 3], [f32; 3])> {
            let d = pose?.position;
            let b = store.position(anchor.landmark()).ok()?;
            Some(([d[0] - b[0], d[1] - b[1], d[2] - b[2]], b))
        };
        // 鼻が取れなかった場合は前回の変換の中心を使う
        let mut pivot = record.transform.pivot;
        if let Some((o, nose)) = offset(Anchor::Head, device.head) {
            record.headset_offset = o;
            pivot = nose;
        }
        if let Some((o, _)) = offset(Anchor::LeftHand, device.left_controller) {
            record.left_controller_offset = o;
        }
        if let Some((o, _)) = offset(Anchor::RightHand, device.right_controller) {
            record.right_controller_offset = o;
        }

        record.tracking_quality = QUALITY_METRICS
            .iter()
            .map(|m| record.stability(*m))
            .sum::<f32>()
            / QUALITY_METRICS.len() as f32;

        let scale = SimilarityTransform::scale_for_height(record.user_height, self.config.reference_height);
        record.transform = SimilarityTransform::about(scale, pivot, record.headset_offset);
        record.weights = Some(RecommendedWeights::from_quality(record.tracking_quality, &self.config));
        record
    }

    /// レコードの重みと変換を融合器へ反映する。重みが無ければ融合器の値のまま
    pub fn apply(&self, record: &CalibrationRecord, fusion: &mut PoseFusion) {
        if let Some(weights) = record.weights {
            fusion.set_weights(weights.body, weights.vr);
        }
        fusion.set_body_transform(record.transform);
    }

    pub fn reset_calibration(&mut self) -> Result<(), CalibrationError> {
        if self.is_sampling() {
            warn!("Cannot reset calibration while sampling");
            return Err(CalibrationError::SamplingInProgress);
        }
        self.record = CalibrationRecord::default();
        self.progress = 0.0;
        self.state = CalibrationState::Idle;
        info!("Calibration reset");
        Ok(())
    }
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new(CalibrationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{JointTag, Observation, ObservationBatch};
    use std::cell::RefCell;
    use std::rc::Rc;

    const READY: CalibrationReadiness = CalibrationReadiness {
        body_tracking: true,
        device_ready: true,
    };

    fn v(x: f32, y: f32, z: f32) -> Vector3<f32> {
        Vector3::new(x, y, z)
    }

    fn standing_batch(height: f32) -> ObservationBatch {
        use JointTag::*;
        let entries = [
            (Nose, [0.0, height, 0.0]),
            (LeftShoulder, [-0.2, 1.45, 0.0]),
            (RightShoulder, [0.2, 1.45, 0.0]),
            (LeftWrist, [-0.85, 1.4, 0.0]),
            (RightWrist, [0.85, 1.4, 0.0]),
            (LeftHip, [-0.1, 0.9, 0.0]),
            (RightHip, [0.1, 0.9, 0.0]),
            (LeftAnkle, [-0.1, 0.0, 0.0]),
            (RightAnkle, [0.1, 0.0, 0.0]),
        ];
        entries
            .iter()
            .map(|&(t, p)| (t, Observation::new(p, 0.9)))
            .collect()
    }

    fn standing_store(height: f32) -> LandmarkStore {
        let mut store = LandmarkStore::new(0.5, 1.0);
        store.update(&standing_batch(height));
        store
    }

    fn devices() -> DeviceSnapshot {
        DeviceSnapshot {
            head: Some(TrackerPose::new([0.0, 1.7, 0.1], [0.0, 0.0, 0.0, 1.0])),
            left_controller: Some(TrackerPose::new([-0.85, 1.4, 0.05], [0.0, 0.0, 0.0, 1.0])),
            right_controller: Some(TrackerPose::new([0.85, 1.45, 0.0], [0.0, 0.0, 0.0, 1.0])),
        }
    }

    fn short_engine() -> CalibrationEngine {
        CalibrationEngine::new(CalibrationConfig {
            duration_secs: 1.0,
            sample_count: 10,
            ..CalibrationConfig::default()
        })
    }

    /// 完了までフレームを回す
    fn run_session(
        engine: &mut CalibrationEngine,
        store: &LandmarkStore,
        device: &DeviceSnapshot,
        fusion: &mut PoseFusion,
        dt: f32,
    ) -> Option<CalibrationRecord> {
        for _ in 0..10_000 {
            if let Some(record) = engine.tick(dt, store, device, fusion) {
                return Some(record);
            }
        }
        None
    }

    #[test]
    fn test_initial_state_idle_with_default_record() {
        let engine = CalibrationEngine::default();
        assert_eq!(engine.state(), CalibrationState::Idle);
        assert_eq!(*engine.record(), CalibrationRecord::default());
    }

    #[test]
    fn test_start_requires_readiness() {
        let mut engine = CalibrationEngine::default();
        let not_ready = CalibrationReadiness {
            body_tracking: true,
            device_ready: false,
        };
        assert_eq!(
            engine.start_calibration(not_ready),
            Err(CalibrationError::NotReady {
                body_tracking: true,
                device_ready: false
            })
        );
        assert_eq!(engine.state(), CalibrationState::Idle);
    }

    #[test]
    fn test_readiness_from_sources() {
        let store = standing_store(1.7);
        assert!(CalibrationReadiness::evaluate(&store, &devices()).is_ready());
        assert!(!CalibrationReadiness::evaluate(&LandmarkStore::default(), &devices()).is_ready());
        assert!(!CalibrationReadiness::evaluate(&store, &DeviceSnapshot::disconnected()).is_ready());
    }

    #[test]
    fn test_start_while_sampling_is_rejected() {
        let mut engine = short_engine();
        let store = standing_store(1.7);
        let mut fusion = PoseFusion::default();
        engine.start_calibration(READY).unwrap();
        engine.tick(0.35, &store, &devices(), &mut fusion);
        let taken = engine.samples(BodyMetric::Height).len();

        assert_eq!(engine.start_calibration(READY), Err(CalibrationError::AlreadySampling));
        assert_eq!(engine.state(), CalibrationState::Sampling);
        // セッションはリセットされず継続
        assert_eq!(engine.samples(BodyMetric::Height).len(), taken);
    }

    #[test]
    fn test_sample_count_follows_wall_clock() {
        let mut engine = short_engine();
        let store = standing_store(1.7);
        let mut fusion = PoseFusion::default();
        engine.start_calibration(READY).unwrap();

        // 0.0, 0.1, 0.2 のサンプルtick
        engine.tick(0.25, &store, &devices(), &mut fusion);
        assert_eq!(engine.samples(BodyMetric::Height).len(), 3);

        let record = run_session(&mut engine, &store, &devices(), &mut fusion, 1.0 / 90.0);
        assert!(record.is_some());
        assert_eq!(engine.samples(BodyMetric::Height).len(), 10);
        assert_eq!(engine.state(), CalibrationState::Idle);
    }

    #[test]
    fn test_duration_independent_of_frame_rate() {
        let store = standing_store(1.7);
        for dt in [1.0 / 30.0, 1.0 / 120.0, 0.5] {
            let mut engine = short_engine();
            let mut fusion = PoseFusion::default();
            engine.start_calibration(READY).unwrap();
            let mut frames = 0;
            let mut elapsed = 0.0;
            while engine.tick(dt, &store, &devices(), &mut fusion).is_none() {
                frames += 1;
                elapsed += dt;
                assert!(frames < 10_000);
            }
            assert!(elapsed + dt >= 1.0 - 1e-4, "dt={} finished early at {}", dt, elapsed);
            assert_eq!(engine.samples(BodyMetric::ArmSpan).len(), 10);
        }
    }

    #[test]
    fn test_progress_observer_reports_fraction() {
        let mut engine = short_engine();
        let store = standing_store(1.7);
        let mut fusion = PoseFusion::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        engine.on_progress(move |p| sink.borrow_mut().push(p));

        engine.start_calibration(READY).unwrap();
        run_session(&mut engine, &store, &devices(), &mut fusion, 0.05).unwrap();

        let seen = seen.borrow();
        assert!(seen.len() >= 10);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!(seen.iter().all(|p| (0.0..=1.0).contains(p)));
        assert_eq!(*seen.last().unwrap(), 1.0);
    }

    #[test]
    fn test_completion_observer_and_fusion_update() {
        let mut engine = short_engine();
        let store = standing_store(1.7);
        let mut fusion = PoseFusion::default();
        let completed = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&completed);
        engine.on_complete(move |r| *sink.borrow_mut() = Some(*r));

        engine.start_calibration(READY).unwrap();
        let record = run_session(&mut engine, &store, &devices(), &mut fusion, 1.0 / 60.0).unwrap();

        assert_eq!(*completed.borrow(), Some(record));
        assert_eq!(*engine.record(), record);
        // 静止ポーズ → 全メトリクス安定 → body重みは最大
        assert!((record.tracking_quality - 1.0).abs() < 1e-5);
        assert!((fusion.weights().body() - 0.9).abs() < 1e-5);
        assert!((fusion.weights().vr() - 0.1).abs() < 1e-5);
        assert_eq!(fusion.body_transform(), record.transform);
    }

    #[test]
    fn test_reduced_metrics_and_offsets() {
        let mut engine = short_engine();
        let store = standing_store(1.7);
        let mut fusion = PoseFusion::default();
        engine.start_calibration(READY).unwrap();
        let record = run_session(&mut engine, &store, &devices(), &mut fusion, 0.1).unwrap();

        assert!((record.user_height - 1.7).abs() < 1e-5);
        assert!((record.arm_span - 1.7).abs() < 1e-5);
        assert!((record.leg_length - 0.9).abs() < 1e-5);
        assert!((record.shoulder_width - 0.4).abs() < 1e-5);

        let h = record.headset_offset;
        assert!(h[0].abs() < 1e-6 && h[1].abs() < 1e-6 && (h[2] - 0.1).abs() < 1e-6);
        assert!((record.left_controller_offset[2] - 0.05).abs() < 1e-6);
        assert!((record.right_controller_offset[1] - 0.05).abs() < 1e-5);

        assert!((record.transform.scale - 1.0).abs() < 1e-5);
        assert_eq!(record.transform.translation, record.headset_offset);
    }

    #[test]
    fn test_transform_aligns_nose_with_headset_for_short_user() {
        use crate::tracker::{BodyTrackingSource, DeviceTrackingSource};

        let mut engine = short_engine();
        let store = standing_store(1.5);
        let snap = devices();
        let mut fusion = PoseFusion::default();
        engine.start_calibration(READY).unwrap();
        let record = run_session(&mut engine, &store, &snap, &mut fusion, 0.1).unwrap();

        assert!((record.transform.scale - 1.5 / 1.7).abs() < 1e-5);
        // オフセットは生の値のまま
        assert!((record.headset_offset[1] - 0.2).abs() < 1e-5);

        let hmd = snap.head.unwrap().position;
        let nose = store.position(JointTag::Nose).unwrap();
        let mapped = record.transform.apply(&nose);
        for i in 0..3 {
            assert!((mapped[i] - hmd[i]).abs() < 1e-5, "axis {}: {} vs {}", i, mapped[i], hmd[i]);
        }

        let body = BodyTrackingSource::new(&store, fusion.body_transform());
        fusion.update(&body, &DeviceTrackingSource::new(&snap));
        let head = fusion.targets().get(Anchor::Head).unwrap();
        assert!((head.position[1] - hmd[1]).abs() < 1e-5);
    }

    #[test]
    fn test_reduce_height_samples_deterministic() {
        let mut engine = short_engine();
        engine.samples[BodyMetric::Height.index()] =
            vec![v(0.0, 1.70, 0.0), v(0.0, 1.72, 0.0), v(0.0, 1.68, 0.0)];
        engine.samples[BodyMetric::ArmSpan.index()] =
            vec![v(1.70, 0.0, 0.0), v(1.72, 0.0, 0.0), v(1.68, 0.0, 0.0)];
        engine.samples[BodyMetric::LegLength.index()] =
            vec![v(0.0, 0.80, 0.0), v(0.0, 0.82, 0.0), v(0.0, 0.78, 0.0)];

        let record = engine.reduce(&LandmarkStore::default(), &DeviceSnapshot::disconnected());

        assert!((record.user_height - 1.70).abs() < 1e-5);
        let variance = (0.0f32 + 0.0004 + 0.0004) / 3.0;
        let expected_stability = 1.0 - variance / 0.1;
        assert!((record.stability(BodyMetric::Height) - expected_stability).abs() < 1e-4);
        assert!((record.tracking_quality - expected_stability).abs() < 1e-4);
        let weights = record.weights.unwrap();
        assert!((weights.body - 0.899).abs() < 1e-3);
        assert!((weights.body + weights.vr - 1.0).abs() < 1e-6);
        assert!((record.transform.scale - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_zero_samples_keep_prior_values() {
        let mut engine = short_engine();
        let prior = CalibrationRecord {
            user_height: 1.8,
            arm_span: 1.75,
            leg_length: 0.85,
            shoulder_width: 0.42,
            headset_offset: [0.0, 0.1, 0.0],
            ..CalibrationRecord::default()
        };
        engine.restore(prior);

        // 鼻と手首がなく Height / ArmSpan はサンプルできない
        let mut batch = standing_batch(1.7);
        batch.remove(&JointTag::Nose);
        batch.remove(&JointTag::LeftWrist);
        let mut store = LandmarkStore::new(0.5, 1.0);
        store.update(&batch);
        let mut fusion = PoseFusion::default();

        engine.start_calibration(READY).unwrap();
        let record = run_session(&mut engine, &store, &devices(), &mut fusion, 0.1).unwrap();

        assert!(engine.samples(BodyMetric::Height).is_empty());
        assert_eq!(record.user_height, 1.8);
        assert_eq!(record.arm_span, 1.75);
        assert_eq!(record.stability(BodyMetric::Height), 0.0);
        // ヘッドのオフセットも鼻が無いので前回値
        assert_eq!(record.headset_offset, [0.0, 0.1, 0.0]);
        // 取得できたメトリクスは更新される
        assert!((record.leg_length - 0.9).abs() < 1e-5);
        assert!((record.transform.scale - 1.8 / 1.7).abs() < 1e-5);
    }

    #[test]
    fn test_disabled_metric_collects_nothing() {
        let mut engine = short_engine();
        engine.set_metric_enabled(BodyMetric::ShoulderWidth, false);
        let store = standing_store(1.7);
        let mut fusion = PoseFusion::default();
        engine.start_calibration(READY).unwrap();
        run_session(&mut engine, &store, &devices(), &mut fusion, 0.1).unwrap();
        assert!(engine.samples(BodyMetric::ShoulderWidth).is_empty());
        assert_eq!(engine.record().shoulder_width, 0.0);
    }

    #[test]
    fn test_reset_rejected_while_sampling() {
        let mut engine = short_engine();
        engine.start_calibration(READY).unwrap();
        assert_eq!(engine.reset_calibration(), Err(CalibrationError::SamplingInProgress));
        assert_eq!(engine.state(), CalibrationState::Sampling);
    }

    #[test]
    fn test_reset_clears_record() {
        let mut engine = short_engine();
        let store = standing_store(1.7);
        let mut fusion = PoseFusion::default();
        engine.start_calibration(READY).unwrap();
        run_session(&mut engine, &store, &devices(), &mut fusion, 0.1).unwrap();
        assert!(engine.record().user_height > 0.0);

        engine.reset_calibration().unwrap();
        assert_eq!(*engine.record(), CalibrationRecord::default());
        assert_eq!(engine.state(), CalibrationState::Idle);
    }

    #[test]
    fn test_new_session_supersedes_previous() {
        let mut engine = short_engine();
        let mut fusion = PoseFusion::default();

        engine.start_calibration(READY).unwrap();
        run_session(&mut engine, &standing_store(1.7), &devices(), &mut fusion, 0.1).unwrap();
        engine.start_calibration(READY).unwrap();
        let second = run_session(&mut engine, &standing_store(1.9), &devices(), &mut fusion, 0.1).unwrap();

        assert!((second.user_height - 1.9).abs() < 1e-5);
        assert_eq!(engine.samples(BodyMetric::Height).len(), 10);
    }

    #[test]
    fn test_tick_when_idle_is_noop() {
        let mut engine = short_engine();
        let mut fusion = PoseFusion::default();
        let before = fusion.weights();
        assert!(engine
            .tick(5.0, &standing_store(1.7), &devices(), &mut fusion)
            .is_none());
        assert_eq!(fusion.weights(), before);
    }
}
