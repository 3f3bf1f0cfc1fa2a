//! # 合并脚本处理
//!
//! 输入是已经和 PS3 XML 合并过的原版脚本：原脚本的每一行都保留，
//! 中间夹杂着 PS3 的 XML 块。这里把每个 XML 块转换成一条 BGM 指令，
//! 插到合适的位置，然后去掉原脚本在音乐通道上的 BGM 指令。

use std::{fs, path::Path};

use tracing::{debug, info, warn};

use crate::{
    audio_probe::AudioProbe,
    channel_detector::detect_bgm_channel,
    chunk_finder::Ps3ChunkFinder,
    chunk_generator::generate_chunk_instruction,
    config::MergerConfig,
    script_patterns::{has_fade_out_bgm_on_channel, has_play_bgm_on_channel, is_dialogue},
    types::{Instruction, InstructionKind, LineEnding, MergeError},
};

/// 无法检测到音乐通道时使用的通道
pub const FALLBACK_BGM_CHANNEL: u32 = 2;

/// 在脚本最后的 `}` 之前插入，保证脚本结束前音乐已经淡出
const END_OF_SCRIPT_FADE: &str = "\tFadeOutBGM(0,1000,FALSE);";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplicePoint {
    /// 先遇到了对话行，追加到末尾
    Append,
    /// 先遇到了同类型的指令，替换它
    Replace(usize),
}

fn is_bgm_on_channel(line: &str, channel: u32) -> bool {
    has_play_bgm_on_channel(line, channel) || has_fade_out_bgm_on_channel(line, channel)
}

/// 从输出末尾向前查找插入位置。
fn find_splice_point(
    output: &[Instruction],
    instruction: &Instruction,
    bgm_channel: u32,
) -> Option<SplicePoint> {
    let find_play_bgm = matches!(instruction.kind(), InstructionKind::PlayBgm { .. });

    output
        .iter()
        .enumerate()
        .rev()
        .find_map(|(index, existing)| {
            let line = existing.to_script_text();
            if is_dialogue(&line) {
                Some(SplicePoint::Append)
            } else if (find_play_bgm && has_play_bgm_on_channel(&line, bgm_channel))
                || (!find_play_bgm && has_fade_out_bgm_on_channel(&line, bgm_channel))
            {
                Some(SplicePoint::Replace(index))
            } else {
                None
            }
        })
}

/// 将块生成的指令插入输出：尽量靠近下一句对话，但与之前同通道的同类指令合并而不是重复。
fn splice_instruction(output: &mut Vec<Instruction>, instruction: Instruction, bgm_channel: u32) {
    match find_splice_point(output, &instruction, bgm_channel) {
        Some(SplicePoint::Append) => output.push(instruction),
        Some(SplicePoint::Replace(index)) => output[index] = instruction,
        None => debug!("找不到对话行或可替换的指令，丢弃: {instruction}"),
    }
}

/// 使用给定的音乐通道合并脚本。
///
/// # 参数
///
/// * `lines` - 合并脚本的所有行（不含换行符）。
/// * `bgm_channel` - 原脚本中播放音乐的通道。
/// * `line_ending` - 拼接 XML 块时使用的换行符。
///
/// # 返回
///
/// * `Ok(Vec<Instruction>)` - 最终输出的所有行。
/// * `Err(MergeError)` - 某个 XML 块格式错误。
pub fn merge_with_channel<S: AsRef<str>>(
    lines: &[S],
    bgm_channel: u32,
    line_ending: LineEnding,
) -> Result<Vec<Instruction>, MergeError> {
    let mut output: Vec<Instruction> = Vec::with_capacity(lines.len());
    let mut chunk_finder = Ps3ChunkFinder::new(line_ending);

    for line in lines {
        let line = line.as_ref();

        if let Some(ps3_chunk) = chunk_finder.update(line)
            && let Some(instruction) = generate_chunk_instruction(&ps3_chunk)?
        {
            splice_instruction(&mut output, instruction, bgm_channel);
        }

        if !chunk_finder.last_line_was_xml() {
            if line.trim() == "}" {
                output.push(Instruction::generic(END_OF_SCRIPT_FADE, false));
            }
            output.push(Instruction::generic(line, false));
        }
    }

    // 去掉原脚本在音乐通道上的 BGM 指令，它们已被 PS3 的指令取代
    output.retain(|instruction| {
        instruction.is_from_ps3() || !is_bgm_on_channel(&instruction.to_script_text(), bgm_channel)
    });

    Ok(output)
}

/// 检测音乐通道，失败时回退到 [`FALLBACK_BGM_CHANNEL`]。
pub fn resolve_bgm_channel<S: AsRef<str>>(
    lines: &[S],
    config: &MergerConfig,
    probe: &dyn AudioProbe,
) -> u32 {
    match detect_bgm_channel(
        lines,
        &config.bgm_folders,
        config.music_threshold_seconds,
        probe,
    ) {
        Some(channel) => {
            info!("检测到通道 [{channel}] 为 BGM 通道");
            channel
        }
        None => {
            warn!("无法检测 BGM 通道，插入 PS3 音乐时将使用通道 {FALLBACK_BGM_CHANNEL}");
            FALLBACK_BGM_CHANNEL
        }
    }
}

/// 检测音乐通道并合并脚本。
pub fn merge_script<S: AsRef<str>>(
    lines: &[S],
    config: &MergerConfig,
    probe: &dyn AudioProbe,
) -> Result<Vec<Instruction>, MergeError> {
    let bgm_channel = resolve_bgm_channel(lines, config, probe);
    merge_with_channel(lines, bgm_channel, config.line_ending)
}

/// 每条指令一行，每行后都附加换行符。
#[must_use]
pub fn render_script(instructions: &[Instruction], line_ending: LineEnding) -> String {
    let mut script = String::new();
    for instruction in instructions {
        script.push_str(&instruction.to_script_text());
        script.push_str(line_ending.as_str());
    }
    script
}

/// 以 UTF-8 读取脚本的所有行，去掉开头的 BOM。
pub fn read_script_lines(path: impl AsRef<Path>) -> Result<Vec<String>, MergeError> {
    let content = fs::read_to_string(path.as_ref())?;
    Ok(content
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::to_owned)
        .collect())
}

/// 写出脚本，必要时创建上级目录。
pub fn write_script(
    path: impl AsRef<Path>,
    instructions: &[Instruction],
    line_ending: LineEnding,
) -> Result<(), MergeError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_script(instructions, line_ending))?;
    Ok(())
}

/// 读取合并脚本，插入 PS3 的 BGM 指令后写到 `output_path`。
pub fn merge_script_file(
    merged_script_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &MergerConfig,
    probe: &dyn AudioProbe,
) -> Result<(), MergeError> {
    let merged_script_path = merged_script_path.as_ref();
    info!("开始向脚本插入 BGM: {}", merged_script_path.display());

    let lines = read_script_lines(merged_script_path)?;
    let instructions = merge_script(&lines, config, probe)?;
    write_script(output_path, &instructions, config.line_ending)
}
