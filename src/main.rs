use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::{info, warn};

use talava_avatar::calibration::{load_record, save_record};
use talava_avatar::config::Config;
use talava_avatar::device::DeviceSnapshot;
use talava_avatar::error::CalibrationError;
use talava_avatar::pose::ObservationBatch;
use talava_avatar::runtime::{AvatarRuntime, ObservationSource};
use talava_avatar::tracker::SkeletonMapper;
use talava_avatar::vmt::VmtMapper;

const CONFIG_PATH: &str = "config.toml";

/// 記録ファイルの1行
#[derive(Debug, Deserialize)]
struct RecordedFrame {
    dt: f32,
    /// この行で推論結果が届いた場合のみ
    #[serde(default)]
    observations: Option<ObservationBatch>,
    #[serde(default)]
    devices: DeviceSnapshot,
}

/// 記録から取り出した直近の未取り込みバッチ
#[derive(Default)]
struct ReplaySource {
    pending: Option<ObservationBatch>,
}

impl ObservationSource for ReplaySource {
    fn poll(&mut self) -> Option<ObservationBatch> {
        self.pending.take()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talava_avatar=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let calibrate = args.iter().any(|a| a == "--calibrate");
    let Some(recording) = args.iter().find(|a| !a.starts_with("--")) else {
        bail!("usage: talava-avatar <recording.jsonl> [--calibrate]");
    };

    info!("Talava Avatar ({})", env!("AVATAR_VERSION"));
    let config = Config::load_or_default(CONFIG_PATH);
    info!(
        "Landmarks: threshold={}, smoothing={}",
        config.landmarks.confidence_threshold, config.landmarks.smoothing
    );
    info!(
        "Fusion: body={}, vr={}, smooth=({}, {})",
        config.fusion.body_weight,
        config.fusion.vr_weight,
        config.fusion.position_smoothing,
        config.fusion.rotation_smoothing
    );

    let mut runtime = AvatarRuntime::new(&config);
    let record = load_record(&config.calibration.record_path, &config.calibration)?;
    if record.is_calibrated() {
        info!("Restored calibration: height={:.3}m", record.user_height);
    }
    runtime.restore_calibration(record);
    runtime
        .calibration_mut()
        .on_progress(|p| info!("Calibration {:>3.0}%", p * 100.0));

    let mut mapper = if config.vmt.enabled {
        info!("VMT target: {}", config.vmt.addr);
        Some(VmtMapper::new(&config.vmt.addr, config.vmt.first_index)?)
    } else {
        None
    };

    let file = File::open(recording).with_context(|| format!("Failed to open {}", recording))?;
    let mut source = ReplaySource::default();
    let mut calibration_pending = calibrate;
    let mut frames = 0usize;
    let mut last_targets = None;

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: RecordedFrame = serde_json::from_str(&line)
            .with_context(|| format!("Invalid frame at line {}", line_no + 1))?;
        if let Some(batch) = frame.observations {
            source.pending = Some(batch);
        }

        let output = runtime.tick(frame.dt, &mut source, &frame.devices);
        frames += 1;

        if calibration_pending && runtime.readiness().is_ready() {
            match runtime.start_calibration() {
                Ok(()) | Err(CalibrationError::AlreadySampling) => calibration_pending = false,
                Err(e) => warn!("{}", e),
            }
        }

        if let Some(record) = output.calibration {
            save_record(&config.calibration.record_path, &record)?;
            info!("Saved calibration to {}", config.calibration.record_path);
        }

        if let Some(ref mut m) = mapper {
            m.apply(&output.targets)?;
        }
        last_targets = Some(output.targets);
    }

    if calibration_pending {
        warn!("Calibration was requested but prerequisites never became ready");
    }
    if runtime.calibration().is_sampling() {
        warn!("Recording ended before calibration finished");
    }

    info!("Replayed {} frames", frames);
    if let Some(targets) = last_targets {
        for (anchor, pose) in targets.iter() {
            info!(
                "{:>10}: pos=[{:.3}, {:.3}, {:.3}] rot=[{:.3}, {:.3}, {:.3}, {:.3}]",
                anchor.as_str(),
                pose.position[0],
                pose.position[1],
                pose.position[2],
                pose.rotation[0],
                pose.rotation[1],
                pose.rotation[2],
                pose.rotation[3]
            );
        }
    }

    Ok(())
}
