//! Photo Office Common Library
//!
//! 画像 → 出力物レイアウトの中核（I/Oなし）。
//! CLI・ジョブファイル・各シンクから共有される。

pub mod types;
pub mod layout;
pub mod inline;
pub mod error;

pub use types::{
    attachments_from_json, ArtifactSpec, ImageRef, ImageSet, ImageSource, MessageSpec, SizeCode,
    SurfaceKind,
};
pub use layout::{default_placement, placement_for, Placement, Preset};
pub use inline::{content_id, inline_image_tag, split_recipients};
pub use error::{Error, Result};
