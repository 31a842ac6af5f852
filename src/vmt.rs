use anyhow::{Context, Result};
use rosc::{encoder, OscMessage, OscPacket, OscType};
use serde::{Deserialize, Serialize};
use std::net::UdpSocket;

use crate::tracker::{Anchor, AnchorTargets, SkeletonMapper};

/// VMTのデフォルトアドレス
pub const VMT_DEFAULT_ADDR: &str = "127.0.0.1:39570";

/// VMT enable: トラッカー(VIVE互換モード)
const ENABLE_TRACKER: i32 = 7;

/// 位置と回転
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerPose {
    /// 位置 (x, y, z)
    pub position: [f32; 3],
    /// 回転 (クォータニオン: x, y, z, w)
    pub rotation: [f32; 4],
}

impl TrackerPose {
    pub fn new(position: [f32; 3], rotation: [f32; 4]) -> Self {
        Self { position, rotation }
    }

    /// 原点、回転なし
    pub fn identity() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// VMTへ送信するOSCメッセージを構築
/// 引数: index, enable, timeoffset, x, y, z, qx, qy, qz, qw
pub fn build_osc_message(index: i32, enable: i32, pose: &TrackerPose) -> OscMessage {
    let mut args = vec![
        OscType::Int(index),
        OscType::Int(enable),
        OscType::Float(0.0), // timeoffset
    ];
    args.extend(pose.position.iter().map(|&v| OscType::Float(v)));
    args.extend(pose.rotation.iter().map(|&v| OscType::Float(v)));
    OscMessage {
        addr: "/VMT/Room/Unity".to_string(),
        args,
    }
}

pub fn encode_osc_message(msg: &OscMessage) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(msg.clone());
    let encoded = encoder::encode(&packet)?;
    Ok(encoded)
}

/// 融合済みアンカーをVMT仮想トラッカーとして送出するスケルトンマッパー
///
/// Head / LeftHand / RightHand を `first_index` から連番で割り当てる。
/// 未定義のアンカーは送信しない（直前の値がVMT側で保持される）。
pub struct VmtMapper {
    socket: UdpSocket,
    target_addr: String,
    first_index: i32,
}

impl VmtMapper {
    pub fn new(target_addr: &str, first_index: i32) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").context("Failed to bind VMT socket")?;
        Ok(Self {
            socket,
            target_addr: target_addr.to_string(),
            first_index,
        })
    }

    pub fn tracker_index(&self, anchor: Anchor) -> i32 {
        self.first_index + anchor.index() as i32
    }

    pub fn send(&self, index: i32, pose: &TrackerPose) -> Result<()> {
        let msg = build_osc_message(index, ENABLE_TRACKER, pose);
        let data = encode_osc_message(&msg)?;
        self.socket
            .send_to(&data, &self.target_addr)
            .with_context(|| format!("Failed to send to VMT at {}", self.target_addr))?;
        Ok(())
    }
}

impl SkeletonMapper for VmtMapper {
    fn apply(&mut self, targets: &AnchorTargets) -> Result<()> {
        for (anchor, pose) in targets.iter() {
            self.send(self.tracker_index(anchor), pose)?;
        }
        Ok(())
    }
}
