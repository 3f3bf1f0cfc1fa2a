//! 定义了 BGM 合并流程中使用的核心数据类型。

use std::{fmt, io, num::ParseIntError};

use quick_xml::{
    Error as QuickXmlErrorMain, encoding::EncodingError,
    events::attributes::AttrError as QuickXmlAttrError,
};
use serde::{Deserialize, Serialize};
use strum_macros::EnumString;
use thiserror::Error;

//=============================================================================
// 1. 错误枚举
//=============================================================================

/// 定义 PS3 指令解析和脚本合并过程中可能发生的各种错误。
#[derive(Error, Debug)]
pub enum MergeError {
    /// XML 读取错误，通常来自 `quick-xml` 库。
    #[error("XML 错误: {0}")]
    Xml(#[from] QuickXmlErrorMain),
    /// XML 属性解析错误，通常来自 `quick-xml` 库。
    #[error("XML 属性错误: {0}")]
    Attribute(#[from] QuickXmlAttrError),
    /// XML 文本编码或解码错误。
    #[error("文本编码或解码错误: {0}")]
    Encoding(#[from] EncodingError),
    /// 指令流中出现了 `<ins>` 之外的非空内容。
    #[error("指令流格式错误: {0}")]
    MalformedInstructionStream(String),
    /// 整数属性无法解析。
    #[error("属性 '{attribute}' 的值 '{value}' 不是有效的整数: {source}")]
    InvalidInteger {
        attribute: String,
        value: String,
        #[source]
        source: ParseIntError,
    },
    /// `<ins>` 元素缺少必需的属性。
    #[error("指令缺少属性: {0}")]
    MissingAttribute(String),
    /// 无法读取音频文件的时长。
    #[error("音频探测失败: {0}")]
    AudioProbe(String),
    /// 配置项的值无效。
    #[error("无效的配置: {0}")]
    InvalidConfig(String),
    /// 配置文件不是有效的 TOML。
    #[error("配置文件解析错误: {0}")]
    TomlDeserialize(#[from] toml::de::Error),
    /// 文件读写等IO错误。
    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),
    /// JSON 序列化错误。
    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<MergeError> for std::io::Error {
    fn from(err: MergeError) -> Self {
        Self::other(err)
    }
}

//=============================================================================
// 2. PS3 指令
//=============================================================================

/// `<ins type="...">` 中我们关心的指令类型。其余类型会被忽略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString)]
pub enum Ps3InstructionType {
    /// 对话行
    #[strum(serialize = "DIALOGUE")]
    Dialogue,
    /// 播放背景音乐
    #[strum(serialize = "BGM_PLAY")]
    BgmPlay,
    /// 淡出背景音乐
    #[strum(serialize = "BGM_FADE")]
    BgmFade,
}

/// 从独立的 PS3 XML 文档中提取出的一条对话指令。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueInstruction {
    /// `num` 属性
    pub sequence_number: i32,
    /// `dlgtype` 属性
    pub dialogue_type: i32,
    /// `data` 属性
    pub data: String,
    /// 自上一条对话指令以来遇到的所有其它 `<ins>` 元素的原始 XML，按出现顺序排列。
    pub preceding_raw_xml: Vec<String>,
    /// 本条对话指令自身的原始 XML。
    pub raw_xml: String,
}

//=============================================================================
// 3. 输出脚本指令
//=============================================================================

/// PS3 的时长单位为帧，每秒 60 帧。
const PS3_TICKS_PER_SECOND: f64 = 60.0;

/// 将 PS3 的帧数时长转换为毫秒，四舍五入到整数。
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn ps3_duration_to_millis(ticks: i32) -> i64 {
    (f64::from(ticks) / PS3_TICKS_PER_SECOND * 1000.0).round() as i64
}

/// 输出脚本中一行指令的具体内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionKind {
    PlayBgm { channel: u32, file_name: String },
    FadeOutBgm { channel: u32, fade_time_ms: i64 },
    /// 原样输出的脚本行，自带缩进
    Generic { text: String },
}

/// 输出脚本中的一行。构造后不可变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    kind: InstructionKind,
    /// 是否由 PS3 XML 解析生成（而不是从原脚本中复制）
    from_ps3: bool,
}

impl Instruction {
    #[must_use]
    pub fn play_bgm(channel: u32, file_name: impl Into<String>, from_ps3: bool) -> Self {
        Self {
            kind: InstructionKind::PlayBgm {
                channel,
                file_name: file_name.into(),
            },
            from_ps3,
        }
    }

    /// 以 PS3 帧数时长构造淡出指令。
    #[must_use]
    pub fn fade_out_bgm(channel: u32, ps3_duration: i32, from_ps3: bool) -> Self {
        Self {
            kind: InstructionKind::FadeOutBgm {
                channel,
                fade_time_ms: ps3_duration_to_millis(ps3_duration),
            },
            from_ps3,
        }
    }

    #[must_use]
    pub fn generic(text: impl Into<String>, from_ps3: bool) -> Self {
        Self {
            kind: InstructionKind::Generic { text: text.into() },
            from_ps3,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &InstructionKind {
        &self.kind
    }

    #[must_use]
    pub const fn is_from_ps3(&self) -> bool {
        self.from_ps3
    }

    /// 原样行已经带有自己的格式，不再添加制表符。
    #[must_use]
    pub const fn suppresses_indentation(&self) -> bool {
        matches!(self.kind, InstructionKind::Generic { .. })
    }

    /// 返回写入脚本的完整一行（不含换行符）。
    ///
    /// 生成的指令前必须有一个制表符，否则游戏引擎无法识别。
    #[must_use]
    pub fn to_script_text(&self) -> String {
        if self.suppresses_indentation() {
            self.to_string()
        } else {
            format!("\t{self}")
        }
    }
}

impl fmt::Display for Instruction {
    /// 输出不带缩进的指令文本。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            InstructionKind::PlayBgm { channel, file_name } => {
                write!(f, "PlayBGM( {channel}, \"{file_name}\", 128, 0 );")
            }
            InstructionKind::FadeOutBgm {
                channel,
                fade_time_ms,
            } => write!(f, "FadeOutBGM( {channel}, {fade_time_ms}, FALSE );"),
            InstructionKind::Generic { text } => f.write_str(text),
        }
    }
}

//=============================================================================
// 4. 输出格式
//=============================================================================

/// 输出脚本和 XML 块使用的换行符。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}
