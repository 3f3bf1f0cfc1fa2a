//! 逐行扫描合并脚本，找出其中嵌入的 PS3 XML 块。
//!
//! 合并脚本大致如下，只有读到 `</PS3_SECTION>` 那一行时才会返回整个块：
//!
//! ```text
//! 	OutputLine(NULL, "...");
//! <?xml version="1.0" encoding="UTF-8"?>
//! <PS3_SECTION>  <!-- ~~~~START~~~~ -->
//! <ins type="MIX_CHANNEL_FADE" duration="60"></ins>
//! </PS3_SECTION> <!-- ~~~~END~~~~ -->
//! ```

use crate::{
    script_patterns::{is_ps3_end, is_ps3_start},
    types::LineEnding,
};

/// 两状态的 XML 块查找器：在块外 / 在块内。
#[derive(Debug, Default)]
pub struct Ps3ChunkFinder {
    inside_ps3_xml: bool,
    last_line_was_xml: bool,
    line_ending: LineEnding,
    buffer: String,
}

impl Ps3ChunkFinder {
    #[must_use]
    pub fn new(line_ending: LineEnding) -> Self {
        Self {
            line_ending,
            ..Default::default()
        }
    }

    /// 处理一行脚本。读到块结束行时返回整个块（每行后附换行符），否则返回 `None`。
    pub fn update(&mut self, line: &str) -> Option<String> {
        if self.inside_ps3_xml {
            self.push_line(line);

            if is_ps3_end(line) {
                self.inside_ps3_xml = false;
                return Some(std::mem::take(&mut self.buffer));
            }
        } else {
            self.last_line_was_xml = is_ps3_start(line);
            if self.last_line_was_xml {
                self.push_line(line);
                self.inside_ps3_xml = true;
            }
        }

        None
    }

    /// 最近一次 `update` 的行是否属于 XML 块。
    #[must_use]
    pub const fn last_line_was_xml(&self) -> bool {
        self.last_line_was_xml
    }

    fn push_line(&mut self, line: &str) {
        self.buffer.push_str(line);
        self.buffer.push_str(self.line_ending.as_str());
    }
}
