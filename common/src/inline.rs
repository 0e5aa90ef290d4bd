//! インライン画像の参照規約
//!
//! 添付画像には `Img{N}` 形式の Content-ID を振り、
//! HTML本文からは `cid:` スキームで参照する。

/// インライン画像の表示幅
pub const INLINE_IMAGE_WIDTH: u32 = 900;
/// インライン画像の表示高さ
pub const INLINE_IMAGE_HEIGHT: u32 = 500;

/// 宛先文字列の区切り文字
pub const RECIPIENT_DELIMITER: char = ';';

/// N番目（0始まり）の画像の Content-ID
pub fn content_id(index: usize) -> String {
    format!("Img{}", index)
}

/// Content-ID を参照する本文用タグ
pub fn inline_image_tag(content_id: &str) -> String {
    format!(
        r#"<img src="cid:{}" width="{}" height="{}" /><br>"#,
        content_id, INLINE_IMAGE_WIDTH, INLINE_IMAGE_HEIGHT
    )
}

/// `;` 区切りの宛先文字列を個々のアドレスに分割
pub fn split_recipients(to: &str) -> Vec<String> {
    to.split(RECIPIENT_DELIMITER)
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .collect()
}
