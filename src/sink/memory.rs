//! メモリ上のシンク
//!
//! ファイルを書かずに面・画像配置・メールを記録する。
//! `--dry-run` とテストで使用。

use super::{ArtifactSink, MessageSink};
use crate::error::Result;
use crate::message::Message;
use photo_office_common::{ImageRef, Placement, SurfaceKind};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceRole {
    /// 白紙文書の先頭段落
    Blank,
    Title(String),
    Content,
    Closing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub role: SurfaceRole,
    pub pictures: Vec<(ImageRef, Placement)>,
}

impl Surface {
    fn new(role: SurfaceRole) -> Self {
        Self { role, pictures: Vec::new() }
    }
}

#[derive(Debug)]
pub struct MemorySink {
    kind: SurfaceKind,
    pub surfaces: Vec<Surface>,
    pub saved_to: Option<PathBuf>,
    failing: HashSet<PathBuf>,
}

impl MemorySink {
    /// 文書は実ファイル同様に空段落1つから始める
    pub fn new(kind: SurfaceKind) -> Self {
        let surfaces = match kind {
            SurfaceKind::Deck => Vec::new(),
            SurfaceKind::Document => vec![Surface::new(SurfaceRole::Blank)],
        };
        Self {
            kind,
            surfaces,
            saved_to: None,
            failing: HashSet::new(),
        }
    }

    /// 指定パスの画像挿入を失敗させる
    pub fn with_failures<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.failing.extend(paths.into_iter().map(Into::into));
        self
    }

    /// 配置済み画像を順に列挙
    pub fn pictures(&self) -> Vec<&(ImageRef, Placement)> {
        self.surfaces.iter().flat_map(|s| s.pictures.iter()).collect()
    }
}

impl ArtifactSink for MemorySink {
    fn kind(&self) -> SurfaceKind {
        self.kind
    }

    fn add_title_surface(&mut self, title: &str) -> Result<()> {
        self.surfaces.push(Surface::new(SurfaceRole::Title(title.to_string())));
        Ok(())
    }

    fn add_content_surface(&mut self) -> Result<()> {
        self.surfaces.push(Surface::new(SurfaceRole::Content));
        Ok(())
    }

    fn add_picture(&mut self, image: &ImageRef, placement: &Placement) -> Result<()> {
        if self.failing.contains(image.path()) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("cannot read image {}", image),
            )
            .into());
        }
        if let Some(surface) = self.surfaces.last_mut() {
            surface.pictures.push((image.clone(), *placement));
        }
        Ok(())
    }

    fn add_closing_surface(&mut self) -> Result<()> {
        if self.kind == SurfaceKind::Deck {
            self.surfaces.push(Surface::new(SurfaceRole::Closing));
        }
        Ok(())
    }

    fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        self.saved_to = Some(path.to_path_buf());
        Ok(())
    }
}

/// 送信・確認されたメールを記録する
#[derive(Debug, Default)]
pub struct MemoryMailbox {
    pub dispatched: Vec<Message>,
    pub reviewed: Vec<Message>,
}

impl MessageSink for MemoryMailbox {
    fn dispatch(&mut self, message: &Message) -> Result<()> {
        self.dispatched.push(message.clone());
        Ok(())
    }

    fn open_for_review(&mut self, message: &Message) -> Result<()> {
        self.reviewed.push(message.clone());
        Ok(())
    }
}
