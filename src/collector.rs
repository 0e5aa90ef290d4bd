//! 画像収集モジュール
//!
//! フォルダ指定または明示リストを、解決済みパスの順序付き列にまとめる。

use crate::error::{PhotoOfficeError, Result};
use photo_office_common::{ImageRef, ImageSet, ImageSource};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// 対象拡張子（大文字小文字を区別）
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif"];

pub fn is_image_name(name: &str) -> bool {
    IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// 画像指定を解決
///
/// - フォルダ: 直下のエントリを拡張子で絞り込み、ファイル名順に並べる
/// - リスト: `base_path` が空でなければ各要素を結合、空ならそのまま
pub fn collect(source: &ImageSource, base_path: &str) -> Result<ImageSet> {
    let images = match source {
        ImageSource::Directory(folder) => scan_folder(folder)?,
        ImageSource::List(items) if base_path.is_empty() => {
            items.iter().map(ImageRef::new).collect()
        }
        ImageSource::List(items) => {
            let base = Path::new(base_path);
            items.iter().map(|item| ImageRef::new(base.join(item))).collect()
        }
    };

    debug!(count = images.len(), "collected images");
    Ok(images)
}

fn scan_folder(folder: &Path) -> Result<ImageSet> {
    if !folder.exists() {
        return Err(PhotoOfficeError::FolderNotFound(folder.display().to_string()));
    }
    if !folder.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotADirectory,
            format!("フォルダではありません: {}", folder.display()),
        )
        .into());
    }

    let mut images = Vec::new();

    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1) // 直下のみ（再帰しない）
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;

        // 判定だけ表示名で行い、パスは元のファイル名のまま使う
        if is_image_name(&entry.file_name().to_string_lossy()) {
            images.push(ImageRef::new(entry.into_path()));
        }
    }

    Ok(ImageSet::new(images))
}
