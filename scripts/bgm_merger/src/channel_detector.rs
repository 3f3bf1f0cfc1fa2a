//! 推断脚本使用哪个通道播放背景音乐。
//!
//! 不同脚本会把音乐放在不同的 BGM 通道上，其它通道用来播放环境音效。
//! 音效通道会反复播放许多短片段，而音乐通道播放的是少量的长音轨，
//! 因此按时长阈值区分音乐和音效，再统计每个通道播放音乐的次数即可。

use std::{collections::BTreeMap, path::PathBuf};

use tracing::{debug, info};

use crate::{audio_probe::AudioProbe, script_patterns::play_bgm_file_name};

/// 脚本中的音频文件名不带扩展名
const AUDIO_EXTENSION: &str = "ogg";

/// 尝试从单行脚本中得到播放音乐的通道。
///
/// 以下情况返回 `None`：
/// - 该行不是 `PlayBGM` 调用
/// - 所有搜索目录中都找不到该音频文件或无法读取
/// - 音频时长小于阈值，说明它是音效而不是音乐
pub fn try_get_bgm_music_channel(
    line: &str,
    search_folders: &[PathBuf],
    music_threshold_seconds: f64,
    probe: &dyn AudioProbe,
) -> Option<u32> {
    let (channel, file_name) = play_bgm_file_name(line)?;

    let audio_length = search_folders.iter().find_map(|folder| {
        let path = folder.join(format!("{file_name}.{AUDIO_EXTENSION}"));
        match probe.duration_seconds(&path) {
            Ok(seconds) => Some(seconds),
            Err(e) => {
                debug!("无法读取 {} 的时长: {e}", path.display());
                None
            }
        }
    })?;

    let is_music = audio_length >= music_threshold_seconds;
    debug!(
        "通道 {channel} 上的音频 {file_name} 时长 {audio_length} 秒，类型: {}",
        if is_music { "音乐" } else { "音效" }
    );

    is_music.then_some(channel)
}

/// 统计每个通道播放音乐的次数，返回次数最多的通道。
///
/// 次数相同时取编号最小的通道。没有任何音乐播放时返回 `None`。
pub fn detect_bgm_channel<S: AsRef<str>>(
    lines: &[S],
    search_folders: &[PathBuf],
    music_threshold_seconds: f64,
    probe: &dyn AudioProbe,
) -> Option<u32> {
    let mut channel_counter: BTreeMap<u32, u32> = BTreeMap::new();

    for line in lines {
        if let Some(channel) =
            try_get_bgm_music_channel(line.as_ref(), search_folders, music_threshold_seconds, probe)
        {
            *channel_counter.entry(channel).or_insert(0) += 1;
        }
    }

    for (channel, count) in &channel_counter {
        info!("通道 {channel} 播放音乐 {count} 次");
    }

    channel_counter
        .into_iter()
        .max_by(|(channel_a, count_a), (channel_b, count_b)| {
            count_a.cmp(count_b).then(channel_b.cmp(channel_a))
        })
        .map(|(channel, _)| channel)
}
