//! 音频时长探测。
//!
//! 脚本中的音频文件都是 Ogg 容器（Vorbis 或 Opus）。时长由最后一页的
//! granule position 除以采样率得出，不需要解码音频。

use std::{fs, path::Path};

use tracing::debug;

use crate::types::MergeError;

const OGG_CAPTURE_PATTERN: &[u8] = b"OggS";
const OGG_PAGE_HEADER_LEN: usize = 27;
const VORBIS_ID_HEADER: &[u8] = b"\x01vorbis";
const OPUS_ID_HEADER: &[u8] = b"OpusHead";
/// Opus 的 granule position 固定以 48 kHz 计数
const OPUS_GRANULE_RATE: f64 = 48_000.0;

/// 根据路径返回音频时长（秒）。文件缺失或无法读取时返回错误。
pub trait AudioProbe {
    fn duration_seconds(&self, path: &Path) -> Result<f64, MergeError>;
}

/// 读取 Ogg Vorbis / Ogg Opus 文件头部和尾页来计算时长。
#[derive(Debug, Default, Clone, Copy)]
pub struct OggDurationProbe;

impl AudioProbe for OggDurationProbe {
    fn duration_seconds(&self, path: &Path) -> Result<f64, MergeError> {
        let data = fs::read(path)?;
        ogg_duration_seconds(&data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CodecTiming {
    Vorbis { sample_rate: u32 },
    Opus { pre_skip: u16 },
}

impl CodecTiming {
    fn from_id_packet(packet: &[u8]) -> Result<Self, MergeError> {
        if packet.starts_with(VORBIS_ID_HEADER) {
            let sample_rate = read_u32_le(packet, 12)
                .ok_or_else(|| MergeError::AudioProbe("Vorbis 标识头过短".to_string()))?;
            if sample_rate == 0 {
                return Err(MergeError::AudioProbe("Vorbis 采样率为 0".to_string()));
            }
            Ok(Self::Vorbis { sample_rate })
        } else if packet.starts_with(OPUS_ID_HEADER) {
            let pre_skip = packet
                .get(10..12)
                .map(|b| u16::from_le_bytes([b[0], b[1]]))
                .ok_or_else(|| MergeError::AudioProbe("Opus 标识头过短".to_string()))?;
            Ok(Self::Opus { pre_skip })
        } else {
            Err(MergeError::AudioProbe("不支持的 Ogg 编码".to_string()))
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn seconds(self, granule_position: i64) -> f64 {
        match self {
            Self::Vorbis { sample_rate } => granule_position as f64 / f64::from(sample_rate),
            Self::Opus { pre_skip } => {
                (granule_position - i64::from(pre_skip)).max(0) as f64 / OPUS_GRANULE_RATE
            }
        }
    }
}

struct OggPage<'a> {
    granule_position: i64,
    serial: u32,
    payload: &'a [u8],
}

/// 解析从 `offset` 开始的一页，返回该页和下一页的偏移。数据不完整时返回 `None`。
fn parse_page(data: &[u8], offset: usize) -> Option<(OggPage<'_>, usize)> {
    let header = data.get(offset..offset + OGG_PAGE_HEADER_LEN)?;
    if !header.starts_with(OGG_CAPTURE_PATTERN) {
        return None;
    }

    let granule_position = i64::from_le_bytes(header[6..14].try_into().ok()?);
    let serial = read_u32_le(header, 14)?;
    let segment_count = usize::from(header[26]);

    let table_start = offset + OGG_PAGE_HEADER_LEN;
    let segment_table = data.get(table_start..table_start + segment_count)?;
    let body_len: usize = segment_table.iter().map(|&len| usize::from(len)).sum();

    let body_start = table_start + segment_count;
    let payload = data.get(body_start..body_start + body_len)?;

    Some((
        OggPage {
            granule_position,
            serial,
            payload,
        },
        body_start + body_len,
    ))
}

fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

/// 计算内存中 Ogg 数据的时长（秒）。
pub fn ogg_duration_seconds(data: &[u8]) -> Result<f64, MergeError> {
    let (first_page, mut offset) = parse_page(data, 0)
        .ok_or_else(|| MergeError::AudioProbe("不是有效的 Ogg 文件".to_string()))?;
    let timing = CodecTiming::from_id_packet(first_page.payload)?;
    let serial = first_page.serial;

    let mut last_granule = (first_page.granule_position >= 0).then_some(first_page.granule_position);
    while offset < data.len() {
        let Some((page, next_offset)) = parse_page(data, offset) else {
            debug!("Ogg 数据在偏移 {offset} 处中断，使用已读取的最后一页");
            break;
        };
        // -1 表示该页没有完整结束的数据包
        if page.serial == serial && page.granule_position >= 0 {
            last_granule = Some(page.granule_position);
        }
        offset = next_offset;
    }

    let granule_position =
        last_granule.ok_or_else(|| MergeError::AudioProbe("找不到有效的 granule position".to_string()))?;
    Ok(timing.seconds(granule_position))
}
