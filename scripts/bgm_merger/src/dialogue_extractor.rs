//! 从独立的 PS3 XML 文档中提取对话指令。

use std::{fs, path::Path};

use tracing::debug;

use crate::{
    instruction_reader::Ps3InstructionReader,
    types::{DialogueInstruction, MergeError, Ps3InstructionType},
};

const ATTR_NUM: &str = "num";
const ATTR_DLGTYPE: &str = "dlgtype";
const ATTR_DATA: &str = "data";

/// 读取 PS3 XML 文件并提取其中所有的对话指令。
pub fn extract_dialogues_from_file(
    path: impl AsRef<Path>,
) -> Result<Vec<DialogueInstruction>, MergeError> {
    let content = fs::read_to_string(path.as_ref())?;
    extract_dialogues(content.trim_start_matches('\u{feff}'))
}

/// 提取 XML 文档中的所有 `DIALOGUE` 指令。
///
/// 每条对话指令都会携带自上一条对话以来出现的其它 `<ins>` 元素的原始 XML，
/// 以便之后重建或审查。最后一条对话之后的指令不会出现在结果中。
///
/// # 返回
///
/// * `Ok(Vec<DialogueInstruction>)` - 按出现顺序排列的对话指令。
/// * `Err(MergeError)` - 指令流格式错误，或 `num`/`dlgtype` 不是整数。
pub fn extract_dialogues(xml: &str) -> Result<Vec<DialogueInstruction>, MergeError> {
    let mut dialogues = Vec::new();
    let mut preceding_raw_xml: Vec<String> = Vec::new();
    let mut reader = Ps3InstructionReader::new(xml);

    while reader.advance_to_next_instruction()? {
        let raw_xml = reader.raw_xml().unwrap_or_default().to_string();

        if reader.instruction_type()? == Some(Ps3InstructionType::Dialogue) {
            let dialogue = DialogueInstruction {
                sequence_number: reader.integer_attribute(ATTR_NUM)?,
                dialogue_type: reader.integer_attribute(ATTR_DLGTYPE)?,
                data: reader.attribute(ATTR_DATA)?.unwrap_or_default(),
                preceding_raw_xml: std::mem::take(&mut preceding_raw_xml),
                raw_xml,
            };
            dialogues.push(dialogue);
        } else {
            preceding_raw_xml.push(raw_xml);
        }
    }

    debug!(
        "提取到 {} 条对话指令，末尾有 {} 条指令未归属任何对话",
        dialogues.len(),
        preceding_raw_xml.len()
    );

    Ok(dialogues)
}

/// 将对话指令序列化为格式化的 JSON。
pub fn dialogues_to_json(dialogues: &[DialogueInstruction]) -> Result<String, MergeError> {
    Ok(serde_json::to_string_pretty(dialogues)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<PS3_SCRIPT>
  <ins type="BGM_PLAY" bgm_file="msys01"/>
  <ins type="MIX_CHANNEL_FADE" duration="60"></ins>
  <ins type="DIALOGUE" num="12" dlgtype="1" data="Hello &amp; welcome"/>
  <ins type="DIALOGUE" num="13" dlgtype="0" data="Second"/>
  <ins type="BGM_FADE" duration="90"/>
</PS3_SCRIPT>
"#;

    #[test]
    fn test_extract_dialogues() {
        let dialogues = extract_dialogues(SAMPLE).unwrap();
        assert_eq!(dialogues.len(), 2);

        let first = &dialogues[0];
        assert_eq!(first.sequence_number, 12);
        assert_eq!(first.dialogue_type, 1);
        assert_eq!(first.data, "Hello & welcome");
        assert_eq!(
            first.preceding_raw_xml,
            vec![
                r#"<ins type="BGM_PLAY" bgm_file="msys01"/>"#.to_string(),
                r#"<ins type="MIX_CHANNEL_FADE" duration="60"></ins>"#.to_string(),
            ]
        );
        assert_eq!(
            first.raw_xml,
            r#"<ins type="DIALOGUE" num="12" dlgtype="1" data="Hello &amp; welcome"/>"#
        );

        let second = &dialogues[1];
        assert_eq!(second.sequence_number, 13);
        assert!(second.preceding_raw_xml.is_empty());
    }

    #[test]
    fn test_raw_xml_reproduces_source() {
        let body = concat!(
            r#"<ins type="BGM_PLAY" bgm_file="a"/>"#,
            r#"<ins type="MIX_CHANNEL_FADE" duration="60"></ins>"#,
            r#"<ins type="DIALOGUE" num="1" dlgtype="0" data="x"/>"#,
            r#"<ins type="BGM_FADE" duration="30"/>"#,
            r#"<ins type="DIALOGUE" num="2" dlgtype="0" data="y"></ins>"#,
        );
        let xml = format!("<r>{body}</r>");

        let dialogues = extract_dialogues(&xml).unwrap();
        assert_eq!(dialogues.len(), 2);

        let rebuilt: String = dialogues
            .iter()
            .flat_map(|d| d.preceding_raw_xml.iter().chain(std::iter::once(&d.raw_xml)))
            .map(String::as_str)
            .collect();
        assert_eq!(rebuilt, body);
    }

    #[test]
    fn test_dialogues_to_json() {
        let dialogues = extract_dialogues(SAMPLE).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&dialogues_to_json(&dialogues).unwrap()).unwrap();

        assert_eq!(json[0]["sequence_number"], 12);
        assert_eq!(json[0]["data"], "Hello & welcome");
        assert_eq!(json[0]["preceding_raw_xml"].as_array().unwrap().len(), 2);
        assert_eq!(json[1]["dialogue_type"], 0);
    }

    #[test]
    fn test_invalid_integer_aborts_extraction() {
        let xml = r#"<r><ins type="DIALOGUE" num="x1" dlgtype="0" data=""/></r>"#;
        assert!(matches!(
            extract_dialogues(xml),
            Err(MergeError::InvalidInteger { .. })
        ));
    }

    #[test]
    fn test_malformed_stream_aborts_extraction() {
        let xml = r#"<r>oops<ins type="DIALOGUE" num="1" dlgtype="0" data=""/></r>"#;
        assert!(matches!(
            extract_dialogues(xml),
            Err(MergeError::MalformedInstructionStream(_))
        ));
    }
}
