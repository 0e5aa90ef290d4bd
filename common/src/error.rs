//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// images / attachments 引数の形が不正
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// サイズコード列が画像列より短い
    #[error("Size code index {index} out of range (only {len} size codes given)")]
    SizeCodeOutOfRange { index: usize, len: usize },
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_argument() {
        let error = Error::InvalidArgument("images must be a folder path or a list".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid argument: images must be a folder path or a list"
        );
    }

    #[test]
    fn test_error_display_out_of_range() {
        let error = Error::SizeCodeOutOfRange { index: 3, len: 2 };
        let display = format!("{}", error);
        assert!(display.contains("index 3"));
        assert!(display.contains("only 2"));
    }

    #[test]
    fn test_error_debug() {
        let error = Error::InvalidArgument("テスト".to_string());
        let debug = format!("{:?}", error);
        assert!(debug.contains("InvalidArgument"));
        assert!(debug.contains("テスト"));
    }
}
