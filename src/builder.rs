//! 出力物組み立てモジュール
//!
//! 表紙 → 画像ごとの本文面 → 結び面（スライドのみ）の順に面を追加し、
//! 最後に1回だけ保存する。

use crate::error::Result;
use crate::sink::ArtifactSink;
use indicatif::ProgressBar;
use photo_office_common::{placement_for, ArtifactSpec, Error, ImageSet, SizeCode, SurfaceKind};
use std::path::PathBuf;
use tracing::{info, warn};

/// 画像列から出力物を組み立てて保存
pub fn build<S: ArtifactSink + ?Sized>(
    images: &ImageSet,
    spec: &ArtifactSpec,
    size_codes: &[SizeCode],
    sink: &mut S,
) -> Result<PathBuf> {
    build_with_progress(images, spec, size_codes, sink, &ProgressBar::hidden())
}

pub fn build_with_progress<S: ArtifactSink + ?Sized>(
    images: &ImageSet,
    spec: &ArtifactSpec,
    size_codes: &[SizeCode],
    sink: &mut S,
    progress: &ProgressBar,
) -> Result<PathBuf> {
    if sink.kind() != spec.kind {
        return Err(Error::InvalidArgument(format!(
            "{} sink cannot build a {} artifact",
            sink.kind(),
            spec.kind
        ))
        .into());
    }

    if spec.kind == SurfaceKind::Deck {
        sink.add_title_surface(&spec.title)?;
    }

    progress.set_length(images.len() as u64);

    for (index, image) in images.iter().enumerate() {
        let placement = placement_for(index, size_codes, spec.kind)?;

        match spec.kind {
            SurfaceKind::Deck => {
                sink.add_content_surface()?;
                match placement {
                    Some(placement) => sink.add_picture(image, &placement)?,
                    None => warn!(
                        index,
                        code = %size_codes[index],
                        image = %image,
                        "unknown size code, slide left without picture"
                    ),
                }
            }
            SurfaceKind::Document => match placement {
                Some(placement) => {
                    sink.add_content_surface()?;
                    if let Err(err) = sink.add_picture(image, &placement) {
                        // サイズ指定なしのときだけ挿入失敗を読み飛ばす
                        if !size_codes.is_empty() {
                            return Err(err);
                        }
                        warn!(image = %image, error = %err, "skipping image that could not be inserted");
                    }
                }
                None => warn!(
                    index,
                    code = %size_codes[index],
                    image = %image,
                    "unknown size code, image skipped"
                ),
            },
        }

        progress.inc(1);
    }

    if spec.kind == SurfaceKind::Deck {
        sink.add_closing_surface()?;
    }

    let output_path = spec.output_path();
    sink.save(&output_path)?;
    progress.finish_and_clear();

    info!(
        path = %output_path.display(),
        surfaces = sink.surface_count(),
        "artifact saved"
    );
    Ok(output_path)
}

/// CLI・ジョブで使うサイズコード列の変換（空 = 指定なし）
pub fn size_codes_from(values: &[u8]) -> Vec<SizeCode> {
    values.iter().copied().map(SizeCode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PhotoOfficeError;
    use crate::sink::{MemorySink, SurfaceRole};
    use photo_office_common::{default_placement, ImageRef, Placement};

    fn images(names: &[&str]) -> ImageSet {
        names.iter().map(|n| ImageRef::new(*n)).collect()
    }

    fn deck_spec() -> ArtifactSpec {
        ArtifactSpec::new("Site Visit", "/out", SurfaceKind::Deck)
    }

    fn doc_spec() -> ArtifactSpec {
        ArtifactSpec::new("Site Visit", "/out", SurfaceKind::Document)
    }

    #[test]
    fn test_deck_surface_order() {
        let mut sink = MemorySink::new(SurfaceKind::Deck);
        let path = build(&images(&["a.png", "b.png", "c.png"]), &deck_spec(), &[], &mut sink).unwrap();

        assert_eq!(path, PathBuf::from("/out/Site_Visit.pptx"));
        assert_eq!(sink.saved_to, Some(path));
        assert_eq!(sink.surface_count(), 3 + 2);
        assert_eq!(sink.surfaces[0].role, SurfaceRole::Title("Site Visit".into()));
        assert_eq!(sink.surfaces[4].role, SurfaceRole::Closing);
        for surface in &sink.surfaces[1..4] {
            assert_eq!(surface.role, SurfaceRole::Content);
            assert_eq!(surface.pictures.len(), 1);
            assert_eq!(surface.pictures[0].1, default_placement(SurfaceKind::Deck));
        }
    }

    #[test]
    fn test_document_surface_count() {
        let mut sink = MemorySink::new(SurfaceKind::Document);
        let path = build(&images(&["a.png", "b.png"]), &doc_spec(), &[], &mut sink).unwrap();

        assert_eq!(path, PathBuf::from("/out/Site Visit.docx"));
        assert_eq!(sink.surface_count(), 2 + 1);
        assert_eq!(sink.surfaces[0].role, SurfaceRole::Blank);
        assert_eq!(sink.pictures().len(), 2);
    }

    #[test]
    fn test_empty_image_set() {
        let mut deck = MemorySink::new(SurfaceKind::Deck);
        build(&ImageSet::default(), &deck_spec(), &[], &mut deck).unwrap();
        assert_eq!(deck.surface_count(), 2);

        let mut doc = MemorySink::new(SurfaceKind::Document);
        build(&ImageSet::default(), &doc_spec(), &[], &mut doc).unwrap();
        assert_eq!(doc.surface_count(), 1);
    }

    #[test]
    fn test_deck_size_codes() {
        let mut sink = MemorySink::new(SurfaceKind::Deck);
        let codes = size_codes_from(&[2, 4]);
        build(&images(&["a.png", "b.png"]), &deck_spec(), &codes, &mut sink).unwrap();

        let pictures = sink.pictures();
        assert_eq!(pictures[0].1, Placement::inches(2.0, 0.7, 6.0, 4.5));
        assert_eq!(pictures[1].1, Placement::inches(0.5, 0.7, 9.0, 4.5));
    }

    #[test]
    fn test_unknown_code_keeps_deck_slide() {
        let mut sink = MemorySink::new(SurfaceKind::Deck);
        let codes = size_codes_from(&[1, 7]);
        build(&images(&["a.png", "b.png"]), &deck_spec(), &codes, &mut sink).unwrap();

        assert_eq!(sink.surface_count(), 4);
        assert!(sink.surfaces[2].pictures.is_empty());
    }

    #[test]
    fn test_unknown_code_skips_document_image() {
        let mut sink = MemorySink::new(SurfaceKind::Document);
        let codes = size_codes_from(&[5, 1]);
        build(&images(&["a.png", "b.png"]), &doc_spec(), &codes, &mut sink).unwrap();

        assert_eq!(sink.surface_count(), 2);
        assert_eq!(sink.pictures()[0].0, ImageRef::new("b.png"));
    }

    #[test]
    fn test_short_size_codes_fail_without_saving() {
        let mut sink = MemorySink::new(SurfaceKind::Deck);
        let codes = size_codes_from(&[1]);
        let err = build(&images(&["a.png", "b.png"]), &deck_spec(), &codes, &mut sink).unwrap_err();

        assert!(matches!(
            err,
            PhotoOfficeError::Common(Error::SizeCodeOutOfRange { index: 1, len: 1 })
        ));
        assert!(sink.saved_to.is_none());
    }

    #[test]
    fn test_document_default_layout_skips_failed_insert() {
        let mut sink = MemorySink::new(SurfaceKind::Document).with_failures(["b.png"]);
        build(&images(&["a.png", "b.png", "c.png"]), &doc_spec(), &[], &mut sink).unwrap();

        let placed: Vec<_> = sink.pictures().iter().map(|(image, _)| image.clone()).collect();
        assert_eq!(placed, vec![ImageRef::new("a.png"), ImageRef::new("c.png")]);
        assert!(sink.saved_to.is_some());
    }

    #[test]
    fn test_document_with_codes_propagates_failed_insert() {
        let mut sink = MemorySink::new(SurfaceKind::Document).with_failures(["b.png"]);
        let codes = size_codes_from(&[1, 2]);
        let err = build(&images(&["a.png", "b.png"]), &doc_spec(), &codes, &mut sink).unwrap_err();

        assert!(matches!(err, PhotoOfficeError::Io(_)));
        assert!(sink.saved_to.is_none());
    }

    #[test]
    fn test_deck_propagates_failed_insert() {
        let mut sink = MemorySink::new(SurfaceKind::Deck).with_failures(["a.png"]);
        let err = build(&images(&["a.png"]), &deck_spec(), &[], &mut sink).unwrap_err();

        assert!(matches!(err, PhotoOfficeError::Io(_)));
        assert!(sink.saved_to.is_none());
    }

    #[test]
    fn test_kind_mismatch() {
        let mut sink = MemorySink::new(SurfaceKind::Document);
        let err = build(&images(&["a.png"]), &deck_spec(), &[], &mut sink).unwrap_err();
        assert!(matches!(err, PhotoOfficeError::Common(Error::InvalidArgument(_))));
    }
}
