//! 用于识别合并脚本中各类行的正则表达式。

use std::sync::LazyLock;

use regex::Regex;

/// XML 块的开始行，例如 `<?xml version="1.0"?>`
static PS3_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<\?xml").expect("PS3_START 正则无效"));
/// XML 块的结束行，例如 `</PS3_SECTION> <!-- END -->`
static PS3_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</PS3_SECTION").expect("PS3_END 正则无效"));

/// 提取 `PlayBGM( 2, "file"` 中的通道和文件名
static PLAY_BGM_FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"PlayBGM\(\s*(\d+)\s*,\s*"([^"]*)""#).expect("PLAY_BGM_FILE_NAME 正则无效")
});
static PLAY_BGM_CHANNEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\tPlayBGM\(\s*(\d+)").expect("PLAY_BGM_CHANNEL 正则无效"));
static FADE_OUT_BGM_CHANNEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\tFadeOutBGM\(\s*(\d+)").expect("FADE_OUT_BGM_CHANNEL 正则无效")
});
static DIALOGUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\tOutputLine\(").expect("DIALOGUE 正则无效"));

pub(crate) fn is_ps3_start(line: &str) -> bool {
    PS3_START.is_match(line)
}

pub(crate) fn is_ps3_end(line: &str) -> bool {
    PS3_END.is_match(line)
}

pub(crate) fn is_dialogue(line: &str) -> bool {
    DIALOGUE.is_match(line)
}

/// 解析 `PlayBGM(channel, "file"` 调用，返回 `(channel, file)`。
pub(crate) fn play_bgm_file_name(line: &str) -> Option<(u32, &str)> {
    let captures = PLAY_BGM_FILE_NAME.captures(line)?;
    let channel = captures.get(1)?.as_str().parse().ok()?;
    Some((channel, captures.get(2)?.as_str()))
}

fn channel_matches(regex: &Regex, line: &str, channel: u32) -> bool {
    regex
        .captures(line)
        .and_then(|captures| captures.get(1)?.as_str().parse::<u32>().ok())
        == Some(channel)
}

/// 该行是否为指定通道上的 `PlayBGM`（需以制表符开头）。
pub(crate) fn has_play_bgm_on_channel(line: &str, channel: u32) -> bool {
    channel_matches(&PLAY_BGM_CHANNEL, line, channel)
}

/// 该行是否为指定通道上的 `FadeOutBGM`（需以制表符开头）。
pub(crate) fn has_fade_out_bgm_on_channel(line: &str, channel: u32) -> bool {
    channel_matches(&FADE_OUT_BGM_CHANNEL, line, channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_markers() {
        assert!(is_ps3_start(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(is_ps3_start("<?XML version=\"1.0\"?>"));
        assert!(!is_ps3_start("\tOutputLine(\"xml\");"));
        assert!(is_ps3_end("</PS3_SECTION> <!-- END -->"));
        assert!(is_ps3_end("</ps3_section -->"));
        assert!(!is_ps3_end("<PS3_SECTION>"));
    }

    #[test]
    fn test_play_bgm_file_name() {
        assert_eq!(
            play_bgm_file_name("\tPlayBGM( 1, \"msys02\", 128, 0 );"),
            Some((1, "msys02"))
        );
        assert_eq!(
            play_bgm_file_name("PlayBGM(12,\"lsys11\");"),
            Some((12, "lsys11"))
        );
        assert_eq!(play_bgm_file_name("\tFadeOutBGM( 1, 1000, FALSE );"), None);
        assert_eq!(play_bgm_file_name("PlayBGM( 1, msys02 );"), None);
    }

    #[test]
    fn test_channel_matchers() {
        assert!(has_play_bgm_on_channel("\tPlayBGM( 2, \"a\", 128, 0 );", 2));
        assert!(has_play_bgm_on_channel("\tplaybgm(2,\"a\");", 2));
        assert!(!has_play_bgm_on_channel("\tPlayBGM( 1, \"a\", 128, 0 );", 2));
        assert!(!has_play_bgm_on_channel("PlayBGM( 2, \"a\", 128, 0 );", 2));
        assert!(!has_play_bgm_on_channel("\tPlayBGM( 22, \"a\", 128, 0 );", 2));

        assert!(has_fade_out_bgm_on_channel("\tFadeOutBGM( 2, 1000, FALSE );", 2));
        assert!(has_fade_out_bgm_on_channel("\tFadeOutBGM(0,1000,FALSE);", 0));
        assert!(!has_fade_out_bgm_on_channel("\tFadeOutBGM(0,1000,FALSE);", 2));
        assert!(!has_fade_out_bgm_on_channel("\tPlayBGM( 2, \"a\", 128, 0 );", 2));
    }

    #[test]
    fn test_dialogue_marker() {
        assert!(is_dialogue("\tOutputLine(NULL, \"hi\");"));
        assert!(!is_dialogue("OutputLine(NULL, \"hi\");"));
        assert!(!is_dialogue("\tPlayBGM( 2, \"a\", 128, 0 );"));
    }
}
