//! docx 出力
//!
//! 白紙の WordprocessingML パッケージを生成し、画像を段落ごとの
//! インライン図として配置する。

use super::ooxml::{
    escape_xml, media_type, relationship, relationships_part, write_package, NS_DRAWINGML,
    NS_RELATIONSHIPS, REL_TYPE_IMAGE, XML_DECLARATION,
};
use super::ArtifactSink;
use crate::error::Result;
use photo_office_common::layout::emu_to_twips;
use photo_office_common::{ImageRef, Placement, SurfaceKind};
use std::path::Path;

const NS_WORDPROCESSINGML: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_WP_DRAWING: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_PICTURE: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const REL_TYPE_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const DOCUMENT_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";

/// Letter 縦、余白 1inch（twip）
const SECTION_PROPERTIES: &str = concat!(
    "<w:sectPr><w:pgSz w:w=\"12240\" w:h=\"15840\"/>",
    "<w:pgMar w:top=\"1440\" w:right=\"1440\" w:bottom=\"1440\" w:left=\"1440\" ",
    "w:header=\"720\" w:footer=\"720\" w:gutter=\"0\"/></w:sectPr>"
);

#[derive(Debug, Default)]
struct Paragraph {
    indent_twips: Option<i64>,
    runs: Vec<String>,
}

impl Paragraph {
    fn to_xml(&self) -> String {
        let properties = match self.indent_twips.filter(|indent| *indent > 0) {
            Some(indent) => format!(r#"<w:pPr><w:ind w:left="{}"/></w:pPr>"#, indent),
            None => String::new(),
        };

        if properties.is_empty() && self.runs.is_empty() {
            return "<w:p/>".to_string();
        }
        format!("<w:p>{}{}</w:p>", properties, self.runs.concat())
    }
}

#[derive(Debug)]
struct Media {
    name: String,
    extension: String,
    mime: String,
    data: Vec<u8>,
}

/// 白紙文書の docx シンク
#[derive(Debug)]
pub struct DocxSink {
    paragraphs: Vec<Paragraph>,
    media: Vec<Media>,
}

impl Default for DocxSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DocxSink {
    /// 白紙文書（空段落1つ）で開始
    pub fn new() -> Self {
        Self {
            paragraphs: vec![Paragraph::default()],
            media: Vec::new(),
        }
    }

    fn document_xml(&self) -> String {
        let body: String = self.paragraphs.iter().map(Paragraph::to_xml).collect();
        format!(
            r#"{}<w:document xmlns:w="{}" xmlns:r="{}" xmlns:wp="{}"><w:body>{}{}</w:body></w:document>"#,
            XML_DECLARATION,
            NS_WORDPROCESSINGML,
            NS_RELATIONSHIPS,
            NS_WP_DRAWING,
            body,
            SECTION_PROPERTIES
        )
    }

    fn content_types_xml(&self) -> String {
        let mut defaults = String::new();
        let mut seen: Vec<&str> = Vec::new();
        for media in &self.media {
            if seen.contains(&media.extension.as_str()) {
                continue;
            }
            seen.push(&media.extension);
            defaults.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                media.extension, media.mime
            ));
        }

        format!(
            concat!(
                "{}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
                "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
                "<Default Extension=\"xml\" ContentType=\"application/xml\"/>{}",
                "<Override PartName=\"/word/document.xml\" ContentType=\"{}\"/></Types>"
            ),
            XML_DECLARATION, defaults, DOCUMENT_CONTENT_TYPE
        )
    }

    fn document_rels_xml(&self) -> String {
        let relationships: Vec<String> = self
            .media
            .iter()
            .enumerate()
            .map(|(index, media)| {
                relationship(&format!("rId{}", index + 1), REL_TYPE_IMAGE, &format!("media/{}", media.name))
            })
            .collect();
        relationships_part(&relationships)
    }
}

impl ArtifactSink for DocxSink {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Document
    }

    // 文書には表紙面がない（タイトルはファイル名だけに使う）
    fn add_title_surface(&mut self, _title: &str) -> Result<()> {
        Ok(())
    }

    fn add_content_surface(&mut self) -> Result<()> {
        self.paragraphs.push(Paragraph::default());
        Ok(())
    }

    fn add_picture(&mut self, image: &ImageRef, placement: &Placement) -> Result<()> {
        let data = std::fs::read(image.path())?;
        let (extension, mime) = media_type(image.path());
        let number = self.media.len() + 1;
        let rid = format!("rId{}", number);

        let run = format!(
            concat!(
                "<w:r><w:drawing><wp:inline distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\">",
                "<wp:extent cx=\"{cx}\" cy=\"{cy}\"/><wp:docPr id=\"{n}\" name=\"Picture {n}\"/>",
                "<wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a=\"{a}\" noChangeAspect=\"1\"/></wp:cNvGraphicFramePr>",
                "<a:graphic xmlns:a=\"{a}\"><a:graphicData uri=\"{pic}\"><pic:pic xmlns:pic=\"{pic}\">",
                "<pic:nvPicPr><pic:cNvPr id=\"{n}\" name=\"{name}\"/><pic:cNvPicPr/></pic:nvPicPr>",
                "<pic:blipFill><a:blip r:embed=\"{rid}\"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>",
                "<pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>",
                "<a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr></pic:pic>",
                "</a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"
            ),
            cx = placement.width,
            cy = placement.height,
            n = number,
            a = NS_DRAWINGML,
            pic = NS_PICTURE,
            name = escape_xml(&image.file_name()),
            rid = rid,
        );

        // 白紙文書には必ず段落が1つある
        if let Some(paragraph) = self.paragraphs.last_mut() {
            paragraph.indent_twips = Some(emu_to_twips(placement.x));
            paragraph.runs.push(run);
        }

        self.media.push(Media {
            name: format!("image{}.{}", number, extension),
            extension,
            mime,
            data,
        });
        Ok(())
    }

    /// 文書には結び面がない
    fn add_closing_surface(&mut self) -> Result<()> {
        Ok(())
    }

    fn surface_count(&self) -> usize {
        self.paragraphs.len()
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        let root_rels = relationships_part(&[relationship(
            "rId1",
            REL_TYPE_OFFICE_DOCUMENT,
            "word/document.xml",
        )]);

        let mut parts: Vec<(String, Vec<u8>)> = vec![
            ("[Content_Types].xml".to_string(), self.content_types_xml().into_bytes()),
            ("_rels/.rels".to_string(), root_rels.into_bytes()),
            ("word/document.xml".to_string(), self.document_xml().into_bytes()),
            ("word/_rels/document.xml.rels".to_string(), self.document_rels_xml().into_bytes()),
        ];
        for media in &self.media {
            parts.push((format!("word/media/{}", media.name), media.data.clone()));
        }

        write_package(path, parts.iter().map(|(name, data)| (name.as_str(), data.as_slice())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photo_office_common::layout::inches_to_emu;

    #[test]
    fn test_blank_document_has_one_paragraph() {
        let sink = DocxSink::new();
        assert_eq!(sink.surface_count(), 1);
        assert!(sink.document_xml().contains("<w:body><w:p/><w:sectPr>"));
    }

    #[test]
    fn test_picture_paragraph_indent() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("a.jpg");
        std::fs::write(&image_path, b"jpeg").unwrap();

        let mut sink = DocxSink::new();
        sink.add_content_surface().unwrap();
        sink.add_picture(&ImageRef::new(&image_path), &Placement::inches(1.25, 0.0, 4.0, 4.0))
            .unwrap();

        let xml = sink.document_xml();
        assert!(xml.contains(r#"<w:ind w:left="1800"/>"#));
        assert!(xml.contains(&format!(r#"<wp:extent cx="{0}" cy="{0}"/>"#, inches_to_emu(4.0))));
        assert!(xml.contains(r#"<a:blip r:embed="rId1"/>"#));
        assert!(sink.content_types_xml().contains(r#"<Default Extension="jpg" ContentType="image/jpeg"/>"#));
        assert!(sink.document_rels_xml().contains(r#"Target="media/image1.jpg""#));
    }

    #[test]
    fn test_missing_image_fails_without_media() {
        let mut sink = DocxSink::new();
        sink.add_content_surface().unwrap();
        let result = sink.add_picture(
            &ImageRef::new("/nonexistent/a.png"),
            &Placement::inches(0.0, 0.0, 1.0, 1.0),
        );
        assert!(result.is_err());
        assert!(sink.media.is_empty());
    }

    #[test]
    fn test_title_adds_no_surface() {
        let mut sink = DocxSink::new();
        sink.add_title_surface("Report & photos").unwrap();
        assert_eq!(sink.surface_count(), 1);
        assert!(!sink.document_xml().contains("Report"));
        assert!(!sink.document_xml().contains("w:pStyle"));
    }
}
