use serde::{Deserialize, Serialize};

/// 写入器支持的文本编码。
///
/// 默认值为不带字节序标记（BOM）的 UTF-8：生成的文件在各平台工具链中都能按原样比较。
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf8WithBom,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    /// 流首部的字节序标记；`Utf8` 为空。
    pub fn preamble(self) -> &'static [u8] {
        match self {
            TextEncoding::Utf8 => &[],
            TextEncoding::Utf8WithBom => &[0xEF, 0xBB, 0xBF],
            TextEncoding::Utf16Le => &[0xFF, 0xFE],
            TextEncoding::Utf16Be => &[0xFE, 0xFF],
        }
    }

    /// 将 `text` 编码后追加到 `out`，不包含字节序标记。
    pub fn encode_into(self, text: &str, out: &mut Vec<u8>) {
        match self {
            TextEncoding::Utf8 | TextEncoding::Utf8WithBom => out.extend_from_slice(text.as_bytes()),
            TextEncoding::Utf16Le => {
                out.reserve(text.len() * 2);
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
            }
            TextEncoding::Utf16Be => {
                out.reserve(text.len() * 2);
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
            }
        }
    }
}
