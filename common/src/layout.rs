//! 配置ポリシーモジュール
//!
//! サイズコード → 配置（原点 + 寸法）の対応表。
//! 単位は EMU（English Metric Unit, 1インチ = 914400 EMU）で、
//! pptx / docx の座標系と一致させている。

use crate::error::{Error, Result};
use crate::types::{SizeCode, SurfaceKind};

// ============================================
// 変換係数
// ============================================

/// inch → EMU
pub const EMU_PER_INCH: i64 = 914_400;

/// inch → twip（docx の段落インデント用）
pub const TWIPS_PER_INCH: i64 = 1_440;

// ============================================
// 面サイズ（inch）
// ============================================

/// スライド（16:9）
pub const SLIDE_WIDTH_IN: f32 = 10.0;
pub const SLIDE_HEIGHT_IN: f32 = 5.625;

/// 文書本文幅（Letter 8.5inch - 余白 1inch × 2）
pub const DOCUMENT_BODY_WIDTH_IN: f32 = 6.5;

// ============================================
// 配置
// ============================================

/// 面上の配置（EMU）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Placement {
    /// inch 単位で生成
    pub fn inches(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            x: inches_to_emu(left),
            y: inches_to_emu(top),
            width: inches_to_emu(width),
            height: inches_to_emu(height),
        }
    }

    /// 文書本文内で水平中央に置く配置
    fn centered_in_body(width: f32, height: f32) -> Self {
        Self::inches((DOCUMENT_BODY_WIDTH_IN - width) / 2.0, 0.0, width, height)
    }

    pub fn right(&self) -> i64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height
    }
}

/// 名前付きプリセット
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub code: u8,
    pub name: &'static str,
    pub left_in: f32,
    pub top_in: f32,
    pub width_in: f32,
    pub height_in: f32,
}

impl Preset {
    pub fn placement(&self) -> Placement {
        Placement::inches(self.left_in, self.top_in, self.width_in, self.height_in)
    }
}

/// スライド用プリセット（5種）
pub const DECK_PRESETS: &[Preset] = &[
    Preset { code: 1, name: "wide", left_in: 1.0, top_in: 0.7, width_in: 8.0, height_in: 4.5 },
    Preset { code: 2, name: "narrow", left_in: 2.0, top_in: 0.7, width_in: 6.0, height_in: 4.5 },
    Preset { code: 3, name: "tall", left_in: 2.5, top_in: 0.5, width_in: 5.0, height_in: 4.9 },
    Preset { code: 4, name: "full", left_in: 0.5, top_in: 0.7, width_in: 9.0, height_in: 4.5 },
    Preset { code: 5, name: "marker", left_in: 0.0, top_in: 0.7, width_in: 0.1, height_in: 0.1 },
];

/// 文書用プリセット（3種、幅 × 高さ。原点は本文中央揃え）
pub const DOCUMENT_PRESETS: &[Preset] = &[
    Preset { code: 1, name: "landscape", left_in: 0.75, top_in: 0.0, width_in: 5.0, height_in: 3.0 },
    Preset { code: 2, name: "square", left_in: 1.25, top_in: 0.0, width_in: 4.0, height_in: 4.0 },
    Preset { code: 3, name: "large", left_in: 0.75, top_in: 0.0, width_in: 5.0, height_in: 4.0 },
];

/// サイズコードなしの既定配置
pub fn default_placement(kind: SurfaceKind) -> Placement {
    match kind {
        // 中央寄せの大領域
        SurfaceKind::Deck => Placement::inches(1.0, 0.7, 8.0, 4.5),
        // 中央寄せの中領域
        SurfaceKind::Document => Placement::centered_in_body(4.0, 4.0),
    }
}

/// 面の種類ごとのプリセット表
pub fn presets(kind: SurfaceKind) -> &'static [Preset] {
    match kind {
        SurfaceKind::Deck => DECK_PRESETS,
        SurfaceKind::Document => DOCUMENT_PRESETS,
    }
}

/// サイズコードからプリセットを検索
pub fn preset_for(code: SizeCode, kind: SurfaceKind) -> Option<&'static Preset> {
    presets(kind).iter().find(|preset| preset.code == code.0)
}

/// index 番目の画像の配置を決定
///
/// - `size_codes` が空: 面ごとの既定配置
/// - 範囲外の index: `SizeCodeOutOfRange`
/// - 未知のコード: `Ok(None)`（呼び出し側で画像をスキップ）
pub fn placement_for(
    index: usize,
    size_codes: &[SizeCode],
    kind: SurfaceKind,
) -> Result<Option<Placement>> {
    if size_codes.is_empty() {
        return Ok(Some(default_placement(kind)));
    }

    let code = size_codes.get(index).ok_or(Error::SizeCodeOutOfRange {
        index,
        len: size_codes.len(),
    })?;

    Ok(preset_for(*code, kind).map(Preset::placement))
}

// ============================================
// ヘルパー関数
// ============================================

/// inch → EMU 変換
#[inline]
pub fn inches_to_emu(inches: f32) -> i64 {
    (inches as f64 * EMU_PER_INCH as f64).round() as i64
}

/// EMU → twip 変換
#[inline]
pub fn emu_to_twips(emu: i64) -> i64 {
    emu * TWIPS_PER_INCH / EMU_PER_INCH
}
