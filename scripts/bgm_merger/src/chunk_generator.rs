//! 把一个 PS3 XML 块转换为最多一条输出指令。

use tracing::debug;

use crate::{
    instruction_reader::Ps3InstructionReader,
    types::{Instruction, InstructionKind, MergeError, Ps3InstructionType},
};

/// 生成的指令固定使用的 BGM 通道
pub const PS3_OUTPUT_BGM_CHANNEL: u32 = 2;

const ATTR_BGM_FILE: &str = "bgm_file";
const ATTR_DURATION: &str = "duration";

/// 按出现顺序读取块中所有的 `BGM_PLAY` / `BGM_FADE` 指令。未知类型会被忽略。
pub fn parse_chunk_instructions(ps3_chunk: &str) -> Result<Vec<Instruction>, MergeError> {
    let mut instructions = Vec::new();
    let mut reader = Ps3InstructionReader::new(ps3_chunk);

    while reader.advance_to_next_instruction()? {
        match reader.instruction_type()? {
            Some(Ps3InstructionType::BgmPlay) => {
                let bgm_file_name = reader.required_attribute(ATTR_BGM_FILE)?;
                instructions.push(Instruction::play_bgm(
                    PS3_OUTPUT_BGM_CHANNEL,
                    bgm_file_name,
                    true,
                ));
            }
            Some(Ps3InstructionType::BgmFade) => {
                let duration = reader.integer_attribute(ATTR_DURATION)?;
                instructions.push(Instruction::fade_out_bgm(
                    PS3_OUTPUT_BGM_CHANNEL,
                    duration,
                    true,
                ));
            }
            Some(Ps3InstructionType::Dialogue) | None => {}
        }
    }

    Ok(instructions)
}

/// 生成该块应当插入的唯一一条指令。
///
/// 块中可能有多个临时的音乐变化，只有最终状态才有意义：
/// 有 `PlayBGM` 时取最后一条 `PlayBGM`，否则取最后一条 `FadeOutBGM`。
pub fn generate_chunk_instruction(ps3_chunk: &str) -> Result<Option<Instruction>, MergeError> {
    let mut last_play = None;
    let mut last_fade = None;

    for instruction in parse_chunk_instructions(ps3_chunk)? {
        match instruction.kind() {
            InstructionKind::PlayBgm { .. } => {
                debug!("发现 BGM 播放: {instruction}");
                last_play = Some(instruction);
            }
            InstructionKind::FadeOutBgm { .. } => {
                debug!("发现 BGM 淡出: {instruction}");
                last_fade = Some(instruction);
            }
            InstructionKind::Generic { .. } => {}
        }
    }

    let selected = last_play.or(last_fade);
    if let Some(instruction) = &selected {
        debug!("该块选定的指令: {instruction}");
    }
    Ok(selected)
}
