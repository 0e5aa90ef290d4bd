//! データモデルの型定義
//!
//! CLIとジョブファイルで共有される型:
//! - ImageRef / ImageSet: 解決済み画像パスの順序付き列
//! - ImageSource: 画像指定（フォルダ or 明示リスト）
//! - SizeCode / SurfaceKind: 配置プリセットの選択キー
//! - ArtifactSpec / MessageSpec: 出力物ごとの指定

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// 1枚の画像への解決済みパス（重複可、順序に意味がある）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(PathBuf);

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// ファイル名部分（添付ファイル名に使用）
    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.0.display().to_string())
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for ImageRef {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// 呼び出しごとに1回だけ構築される画像列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSet(Vec<ImageRef>);

impl ImageSet {
    pub fn new(images: Vec<ImageRef>) -> Self {
        Self(images)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageRef> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ImageRef] {
        &self.0
    }
}

impl FromIterator<ImageRef> for ImageSet {
    fn from_iter<I: IntoIterator<Item = ImageRef>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ImageSet {
    type Item = &'a ImageRef;
    type IntoIter = std::slice::Iter<'a, ImageRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// 画像の指定方法
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// 画像フォルダ（拡張子でフィルタ）
    Directory(PathBuf),
    /// 明示的な順序付きリスト（フィルタなし）
    List(Vec<String>),
}

impl ImageSource {
    /// JSON値から変換（文字列 = フォルダ、配列 = リスト）
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::String(dir) => Ok(ImageSource::Directory(PathBuf::from(dir))),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        Error::InvalidArgument(format!(
                            "image list entries must be strings, got {}",
                            item
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(ImageSource::List),
            other => Err(Error::InvalidArgument(format!(
                "images should be a list of image file names or the images folder path, got {}",
                other
            ))),
        }
    }
}

/// 別添ファイル指定をJSON値から変換
///
/// 文字列1件、文字列配列、または `false` / `null`（添付なし）を受け付ける。
pub fn attachments_from_json(value: &Value) -> Result<Vec<PathBuf>> {
    match value {
        Value::Null | Value::Bool(false) => Ok(Vec::new()),
        Value::String(path) => Ok(vec![PathBuf::from(path)]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(PathBuf::from).ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "attachment entries must be strings, got {}",
                        item
                    ))
                })
            })
            .collect(),
        other => Err(Error::InvalidArgument(format!(
            "attachments should be a path, a list of paths or false, got {}",
            other
        ))),
    }
}

/// 画像ごとのサイズコード（1..5 など）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeCode(pub u8);

impl From<u8> for SizeCode {
    fn from(code: u8) -> Self {
        SizeCode(code)
    }
}

impl fmt::Display for SizeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 出力先の面の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    /// スライド（pptx）
    Deck,
    /// 文書ページ（docx）
    Document,
}

impl SurfaceKind {
    pub fn extension(&self) -> &'static str {
        match self {
            SurfaceKind::Deck => "pptx",
            SurfaceKind::Document => "docx",
        }
    }

    /// タイトルから保存ファイル名を生成
    ///
    /// スライドは空白をアンダースコアに置換、文書はタイトルそのまま。
    pub fn file_name(&self, title: &str) -> String {
        match self {
            SurfaceKind::Deck => format!("{}.{}", title.replace(' ', "_"), self.extension()),
            SurfaceKind::Document => format!("{}.{}", title, self.extension()),
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceKind::Deck => write!(f, "deck"),
            SurfaceKind::Document => write!(f, "document"),
        }
    }
}

/// 出力物の指定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub title: String,
    pub save_path: PathBuf,
    pub kind: SurfaceKind,
}

impl ArtifactSpec {
    pub const DEFAULT_TITLE: &'static str = "Presentation";

    pub fn new(title: impl Into<String>, save_path: impl Into<PathBuf>, kind: SurfaceKind) -> Self {
        Self {
            title: title.into(),
            save_path: save_path.into(),
            kind,
        }
    }

    /// `{save_path}/{正規化タイトル}.{拡張子}`
    pub fn output_path(&self) -> PathBuf {
        self.save_path.join(self.kind.file_name(&self.title))
    }
}

/// メッセージの指定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSpec {
    /// 宛先（`;` 区切りの1文字列）
    pub to: String,
    pub subject: String,
    /// HTML本文（インライン画像タグはこの後ろに追加される）
    pub body: String,
    pub images: Option<ImageSource>,
    /// 画像を本文にインライン表示するか
    pub images_on_body: bool,
    /// 画像とは別の添付ファイル
    pub attachments: Vec<PathBuf>,
    /// true: 即送信 / false: 確認用に開く
    pub send: bool,
}

impl Default for MessageSpec {
    fn default() -> Self {
        Self {
            to: String::new(),
            subject: String::new(),
            body: String::new(),
            images: None,
            images_on_body: true,
            attachments: Vec::new(),
            send: true,
        }
    }
}
