//! 归档文本解码
//!
//! 导出的归档把 UTF-8 字节逐个写成了 `\u00XX` 转义，JSON 解析后每个字符
//! 实际上是一个字节。这里把字符还原成字节，再按 UTF-8 重新解码。

/// 修复被按单字节解释的 UTF-8 文本
///
/// - 纯 ASCII 原样返回
/// - 含有大于 U+00FF 字符的输入本身就是正确的 Unicode，原样返回
/// - 非法字节序列替换为 U+FFFD，不会失败
pub fn decode_string(raw: &str) -> String {
    if raw.is_ascii() {
        return raw.to_string();
    }

    let mut bytes = Vec::with_capacity(raw.len());
    for ch in raw.chars() {
        match u8::try_from(u32::from(ch)) {
            Ok(byte) => bytes.push(byte),
            Err(_) => return raw.to_string(),
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}

/// 可选字段的解码
pub fn decode_option(raw: Option<&str>) -> Option<String> {
    raw.map(decode_string)
}
