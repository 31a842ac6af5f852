//! フレームループから駆動するコンポジションルート
//!
//! LandmarkStore / PoseFusion / CalibrationEngine を1つずつ所有し、
//! `tick(dt)` で取り込み → キャリブレーション → 融合の順に進める。
//! 取り込みは独立した間隔タイマーで間引かれ、融合はそれより高いレートで
//! 呼ばれても問題ない（新しい観測が無ければ同じ値を平滑化するだけ）。

use std::sync::mpsc::{Receiver, TryRecvError};

use tracing::debug;

use crate::calibration::{
    CalibrationEngine, CalibrationReadiness, CalibrationRecord, SimilarityTransform,
};
use crate::config::Config;
use crate::device::DeviceSnapshot;
use crate::error::CalibrationError;
use crate::pose::ObservationBatch;
use crate::tracker::{
    AnchorTargets, BodyTrackingSource, DeviceTrackingSource, LandmarkStore, PoseFusion,
};

/// 姿勢推定側から観測バッチを受け取る口。新しいバッチが無ければ None（待たない）
pub trait ObservationSource {
    fn poll(&mut self) -> Option<ObservationBatch>;
}

/// 推論スレッドからのチャネル。溜まっている場合は最新のバッチのみ使う
impl ObservationSource for Receiver<ObservationBatch> {
    fn poll(&mut self) -> Option<ObservationBatch> {
        let mut latest = None;
        loop {
            match self.try_recv() {
                Ok(batch) => latest = Some(batch),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        latest
    }
}

/// 経過時間を積算し、一定間隔ごとに発火するタイマー
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    interval: f32,
    accumulator: f32,
}

impl IntervalTimer {
    /// 最初の advance で即発火する
    pub fn from_rate(rate_hz: f32) -> Self {
        let interval = if rate_hz > 0.0 { 1.0 / rate_hz } else { 0.0 };
        Self {
            interval,
            accumulator: interval,
        }
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// 1間隔以上経っていれば true。何間隔分遅れていても発火は1回
    pub fn advance(&mut self, dt: f32) -> bool {
        self.accumulator += dt.max(0.0);
        if self.accumulator < self.interval {
            return false;
        }
        if self.interval > 0.0 {
            self.accumulator %= self.interval;
        } else {
            self.accumulator = 0.0;
        }
        true
    }
}

/// 1フレーム分の出力
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutput {
    pub targets: AnchorTargets,
    /// このフレームでキャリブレーションが完了した場合のみ
    pub calibration: Option<CalibrationRecord>,
    /// このフレームで観測バッチを取り込んだか
    pub ingested: bool,
}

pub struct AvatarRuntime {
    store: LandmarkStore,
    fusion: PoseFusion,
    calibration: CalibrationEngine,
    ingest_timer: IntervalTimer,
    device: DeviceSnapshot,
}

impl AvatarRuntime {
    pub fn new(config: &Config) -> Self {
        Self {
            store: LandmarkStore::from_config(&config.landmarks),
            fusion: PoseFusion::from_config(&config.fusion),
            calibration: CalibrationEngine::new(config.calibration.clone()),
            ingest_timer: IntervalTimer::from_rate(config.ingest.rate_hz),
            device: DeviceSnapshot::disconnected(),
        }
    }

    pub fn store(&self) -> &LandmarkStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut LandmarkStore {
        &mut self.store
    }

    pub fn fusion(&self) -> &PoseFusion {
        &self.fusion
    }

    pub fn fusion_mut(&mut self) -> &mut PoseFusion {
        &mut self.fusion
    }

    pub fn calibration(&self) -> &CalibrationEngine {
        &self.calibration
    }

    pub fn calibration_mut(&mut self) -> &mut CalibrationEngine {
        &mut self.calibration
    }

    /// 直近フレームのデバイス姿勢
    pub fn device(&self) -> &DeviceSnapshot {
        &self.device
    }

    pub fn tick(
        &mut self,
        dt: f32,
        source: &mut dyn ObservationSource,
        device: &DeviceSnapshot,
    ) -> FrameOutput {
        self.device = *device;

        let mut ingested = false;
        if self.ingest_timer.advance(dt) {
            if let Some(batch) = source.poll() {
                self.store.update(&batch);
                ingested = true;
            } else {
                debug!("No new observation batch; keeping {} landmarks", self.store.tracked_count());
            }
        }

        let calibration = self
            .calibration
            .tick(dt, &self.store, &self.device, &mut self.fusion);

        let body = BodyTrackingSource::new(&self.store, self.fusion.body_transform());
        let dev = DeviceTrackingSource::new(&self.device);
        let targets = *self.fusion.update(&body, &dev);

        FrameOutput {
            targets,
            calibration,
            ingested,
        }
    }

    pub fn readiness(&self) -> CalibrationReadiness {
        CalibrationReadiness::evaluate(&self.store, &self.device)
    }

    pub fn start_calibration(&mut self) -> Result<(), CalibrationError> {
        let readiness = self.readiness();
        self.calibration.start_calibration(readiness)
    }

    /// レコードを初期化し、相似変換も恒等に戻す。重みは変更しない
    pub fn reset_calibration(&mut self) -> Result<(), CalibrationError> {
        self.calibration.reset_calibration()?;
        self.fusion.set_body_transform(SimilarityTransform::identity());
        Ok(())
    }

    /// 永続化されていたレコードを復元して融合器に反映する
    pub fn restore_calibration(&mut self, record: CalibrationRecord) {
        if record.is_calibrated() {
            self.calibration.apply(&record, &mut self.fusion);
        }
        self.calibration.restore(record);
    }
}

impl Default for AvatarRuntime {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
