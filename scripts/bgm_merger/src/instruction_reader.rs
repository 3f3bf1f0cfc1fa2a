//! # PS3 指令流读取器
//!
//! PS3 导出的脚本是一串 `<ins>` 元素，除指令元素外不应包含任何有意义的文本。
//! 读取器每次前进到下一个 `<ins>` 元素，遇到非空白的文本或其它节点时立即报错。

use std::borrow::Cow;

use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use tracing::debug;

use crate::types::{MergeError, Ps3InstructionType};

const TAG_INS: &[u8] = b"ins";

const ATTR_TYPE: &str = "type";

/// 读取器当前所在的 `<ins>` 元素。
#[derive(Debug)]
struct CurrentInstruction<'a> {
    element: BytesStart<'a>,
    /// 元素在源文本中的完整切片，包括结束标签
    raw_xml: &'a str,
}

/// 在 XML 文本上逐条拉取 `<ins>` 指令的游标。
///
/// `<ins>` 元素的内部内容会随元素一起被跳过，不参与非空文本检查。
pub struct Ps3InstructionReader<'a> {
    input: &'a str,
    reader: Reader<&'a [u8]>,
    current: Option<CurrentInstruction<'a>>,
}

impl<'a> Ps3InstructionReader<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        let mut reader = Reader::from_str(input);
        let config = reader.config_mut();
        config.trim_text(false);
        config.expand_empty_elements = false;
        // 合并脚本中的 XML 块经常只有孤立的 `</PS3_SECTION>` 结束标签
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        Self {
            input,
            reader,
            current: None,
        }
    }

    /// 前进到下一个 `<ins>` 元素。
    ///
    /// # 返回
    ///
    /// * `Ok(true)` - 已定位到一条指令，可以读取其属性。
    /// * `Ok(false)` - 输入已读完。
    /// * `Err(MergeError::MalformedInstructionStream)` - 遇到了非空白的文本或其它节点。
    pub fn advance_to_next_instruction(&mut self) -> Result<bool, MergeError> {
        self.current = None;

        loop {
            let start = self.position();
            match self.reader.read_event()? {
                Event::Start(e) if e.name().as_ref() == TAG_INS => {
                    self.reader.read_to_end(e.name())?;
                    self.set_current(e, start)?;
                    return Ok(true);
                }
                Event::Empty(e) if e.name().as_ref() == TAG_INS => {
                    self.set_current(e, start)?;
                    return Ok(true);
                }
                Event::Start(_) | Event::Empty(_) | Event::End(_) | Event::Comment(_) => {}
                Event::Decl(_) => debug!("跳过 XML 声明"),
                Event::Text(e) => reject_non_blank("Text", &e.xml_content()?)?,
                Event::CData(e) => reject_non_blank("CDATA", &e.decode()?)?,
                // 字符引用按其代表的字符检查，`&#32;` 之类的空白同样跳过
                Event::GeneralRef(e) => match e.resolve_char_ref()? {
                    Some(ch) => reject_non_blank("Reference", &ch.to_string())?,
                    None => reject_non_blank("Reference", &String::from_utf8_lossy(&e))?,
                },
                Event::PI(e) => reject_non_blank("PI", &String::from_utf8_lossy(&e))?,
                Event::DocType(e) => reject_non_blank("DocType", &String::from_utf8_lossy(&e))?,
                Event::Eof => return Ok(false),
            }
        }
    }

    /// 读取当前指令的字符串属性。不在指令上或属性不存在时返回 `None`。
    pub fn attribute(&self, name: &str) -> Result<Option<String>, MergeError> {
        let Some(current) = &self.current else {
            return Ok(None);
        };

        current
            .element
            .try_get_attribute(name)?
            .map(|attr| {
                attr.decode_and_unescape_value(self.reader.decoder())
                    .map(Cow::into_owned)
                    .map_err(MergeError::from)
            })
            .transpose()
    }

    /// 读取必需的字符串属性。
    pub fn required_attribute(&self, name: &str) -> Result<String, MergeError> {
        self.attribute(name)?
            .ok_or_else(|| MergeError::MissingAttribute(name.to_string()))
    }

    /// 读取必需的整数属性，允许首尾空白。
    pub fn integer_attribute(&self, name: &str) -> Result<i32, MergeError> {
        let value = self.required_attribute(name)?;
        value
            .trim()
            .parse::<i32>()
            .map_err(|source| MergeError::InvalidInteger {
                attribute: name.to_string(),
                value,
                source,
            })
    }

    /// 当前指令的 `type` 属性。未知或缺失的类型返回 `None`。
    pub fn instruction_type(&self) -> Result<Option<Ps3InstructionType>, MergeError> {
        Ok(self
            .attribute(ATTR_TYPE)?
            .and_then(|value| value.parse::<Ps3InstructionType>().ok()))
    }

    /// 当前指令在源文本中的原始 XML。
    #[must_use]
    pub fn raw_xml(&self) -> Option<&'a str> {
        self.current.as_ref().map(|current| current.raw_xml)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn position(&self) -> usize {
        self.reader.buffer_position() as usize
    }

    fn set_current(&mut self, element: BytesStart<'a>, start: usize) -> Result<(), MergeError> {
        let end = self.position();
        let raw_xml = self.input.get(start..end).ok_or_else(|| {
            MergeError::MalformedInstructionStream(format!("无法截取位置 {start}..{end} 处的指令"))
        })?;

        self.current = Some(CurrentInstruction { element, raw_xml });
        Ok(())
    }
}

fn reject_non_blank(node_kind: &str, value: &str) -> Result<(), MergeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Ok(())
    } else {
        Err(MergeError::MalformedInstructionStream(format!(
            "非空的 '{node_kind}' 节点: {}",
            trimmed.escape_debug()
        )))
    }
}
