use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotoOfficeError {
    #[error(transparent)]
    Common(#[from] photo_office_common::Error),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("テンプレートが見つかりません: {0}")]
    TemplateNotFound(String),

    #[error("テンプレートが不正: {0}")]
    Template(String),

    #[error("画像の挿入に失敗: {path}: {reason}")]
    ImageInsert { path: String, reason: String },

    #[error("メール送信エラー: {0}")]
    MailDispatch(String),

    #[error("確認画面の表示に失敗: {0}")]
    Review(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("XML解析エラー: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("ZIPエラー: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PhotoOfficeError>;
