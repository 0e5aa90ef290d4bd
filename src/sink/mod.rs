//! 出力先（シンク）の抽象
//!
//! レイアウト計算はシンクに依存せず、pptx / docx / メール送信などの
//! 実体はここのトレイト越しにだけ扱う。

pub mod docx;
pub mod eml;
pub mod memory;
mod ooxml;
pub mod pptx;

use crate::config::Config;
use crate::error::Result;
use crate::message::Message;
use photo_office_common::{ImageRef, Placement, SurfaceKind};
use std::path::Path;

pub use docx::DocxSink;
pub use eml::EmlSink;
pub use memory::{MemoryMailbox, MemorySink, Surface, SurfaceRole};
pub use pptx::{DeckLayouts, PptxSink};

/// スライド・文書を組み立てる出力先
pub trait ArtifactSink {
    fn kind(&self) -> SurfaceKind;

    /// 表紙（タイトル面）を追加
    fn add_title_surface(&mut self, title: &str) -> Result<()>;

    /// 本文面（スライド / 段落）を追加
    fn add_content_surface(&mut self) -> Result<()>;

    /// 直近の本文面に画像を配置
    fn add_picture(&mut self, image: &ImageRef, placement: &Placement) -> Result<()>;

    /// 結び面を追加
    fn add_closing_surface(&mut self) -> Result<()>;

    /// 内容を持つ面の数
    fn surface_count(&self) -> usize;

    fn save(&mut self, path: &Path) -> Result<()>;
}

/// メールの出力先
pub trait MessageSink {
    /// 即時送信
    fn dispatch(&mut self, message: &Message) -> Result<()>;

    /// 確認用に開く（閉じられるまで戻らない）
    fn open_for_review(&mut self, message: &Message) -> Result<()>;
}

/// 面の種類に応じた実ファイル用シンクを生成
pub fn open_artifact_sink(kind: SurfaceKind, config: &Config) -> Result<Box<dyn ArtifactSink>> {
    match kind {
        SurfaceKind::Deck => {
            let layouts = DeckLayouts {
                title: config.title_layout,
                content: config.content_layout,
                closing: config.closing_layout,
            };
            Ok(Box::new(PptxSink::open(&config.deck_template, layouts)?))
        }
        SurfaceKind::Document => Ok(Box::new(DocxSink::new())),
    }
}
