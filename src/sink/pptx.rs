//! pptx 出力
//!
//! 外部テンプレート（.pptx）を開き、指定レイアウトを参照するスライドを
//! 末尾に追加して保存する。テンプレート内の既存スライド・マスタ・テーマは
//! そのまま引き継ぐ。

use super::ooxml::{
    append_to_root, attribute_values, element_prefix, escape_xml, into_text, max_numbered,
    media_type, missing_default_types, namespace_prefix, qualified, relationship,
    relationships_part, write_elements, write_package, Element, NS_DRAWINGML, NS_RELATIONSHIPS,
    REL_TYPE_IMAGE, XML_DECLARATION,
};
use super::ArtifactSink;
use crate::error::{PhotoOfficeError, Result};
use photo_office_common::{ImageRef, Placement, SurfaceKind};
use std::fs::File;
use std::io::{BufReader, Read};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

const CONTENT_TYPES: &str = "[Content_Types].xml";
const PRESENTATION: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

const NS_PRESENTATIONML: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const REL_TYPE_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_TYPE_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const SLIDE_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

/// スライドIDの下限（ECMA-376: 256 以上）
const MIN_SLIDE_ID: u32 = 256;

const SLIDE_LIST: &str = "sldIdLst";

/// presentation.xml で sldIdLst より前に来る要素
const MASTER_LISTS: &[&str] = &["sldMasterIdLst", "notesMasterIdLst", "handoutMasterIdLst"];

/// テンプレート内のレイアウト番号（slideLayoutN.xml の N）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeckLayouts {
    pub title: usize,
    pub content: usize,
    pub closing: usize,
}

impl Default for DeckLayouts {
    fn default() -> Self {
        Self { title: 1, content: 4, closing: 5 }
    }
}

#[derive(Debug)]
struct PendingSlide {
    layout: usize,
    shapes: Vec<String>,
    relationships: Vec<String>,
    next_shape_id: u32,
}

impl PendingSlide {
    fn new(layout: usize) -> Self {
        let layout_rel = relationship(
            "rId1",
            REL_TYPE_SLIDE_LAYOUT,
            &format!("../slideLayouts/slideLayout{}.xml", layout),
        );
        Self {
            layout,
            shapes: Vec::new(),
            relationships: vec![layout_rel],
            next_shape_id: 2,
        }
    }

    fn take_shape_id(&mut self) -> u32 {
        let id = self.next_shape_id;
        self.next_shape_id += 1;
        id
    }

    fn add_relationship(&mut self, rel_type: &str, target: &str) -> String {
        let rid = format!("rId{}", self.relationships.len() + 1);
        self.relationships.push(relationship(&rid, rel_type, target));
        rid
    }

    fn to_xml(&self) -> String {
        format!(
            concat!(
                "{decl}<p:sld xmlns:a=\"{a}\" xmlns:r=\"{r}\" xmlns:p=\"{p}\">",
                "<p:cSld><p:spTree>",
                "<p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>",
                "<p:grpSpPr/>{shapes}</p:spTree></p:cSld>",
                "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"
            ),
            decl = XML_DECLARATION,
            a = NS_DRAWINGML,
            r = NS_RELATIONSHIPS,
            p = NS_PRESENTATIONML,
            shapes = self.shapes.concat(),
        )
    }
}

/// テンプレートベースの pptx シンク
#[derive(Debug)]
pub struct PptxSink {
    /// テンプレートのエントリ（順序維持）
    entries: Vec<(String, Vec<u8>)>,
    content_types: String,
    presentation: String,
    presentation_rels: String,
    layouts: DeckLayouts,
    slides: Vec<PendingSlide>,
    media: Vec<(String, Vec<u8>)>,
    first_slide_number: u32,
    first_media_number: u32,
}

impl PptxSink {
    /// テンプレートを開く
    pub fn open(template: &Path, layouts: DeckLayouts) -> Result<Self> {
        if !template.exists() {
            return Err(PhotoOfficeError::TemplateNotFound(template.display().to_string()));
        }

        let file = File::open(template)?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;
        let mut entries = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            entries.push((entry.name().to_string(), data));
        }

        debug!(template = %template.display(), entries = entries.len(), "opened deck template");
        Self::from_entries(entries, layouts)
    }

    fn from_entries(mut entries: Vec<(String, Vec<u8>)>, layouts: DeckLayouts) -> Result<Self> {
        let content_types = take_text(&mut entries, CONTENT_TYPES)?;
        let presentation = take_text(&mut entries, PRESENTATION)?;
        let presentation_rels = take_text(&mut entries, PRESENTATION_RELS)?;

        for layout in [layouts.title, layouts.content, layouts.closing] {
            let name = format!("ppt/slideLayouts/slideLayout{}.xml", layout);
            if !entries.iter().any(|(entry, _)| *entry == name) {
                return Err(PhotoOfficeError::Template(format!(
                    "スライドレイアウトがありません: {}",
                    name
                )));
            }
        }

        let first_slide_number = max_entry_number(&entries, "ppt/slides/slide") + 1;
        let first_media_number = max_entry_number(&entries, "ppt/media/image") + 1;

        Ok(Self {
            entries,
            content_types,
            presentation,
            presentation_rels,
            layouts,
            slides: Vec::new(),
            media: Vec::new(),
            first_slide_number,
            first_media_number,
        })
    }

    fn slide_number(&self, index: usize) -> u32 {
        self.first_slide_number + index as u32
    }

    fn current_slide(&mut self) -> Result<&mut PendingSlide> {
        self.slides
            .last_mut()
            .ok_or_else(|| PhotoOfficeError::Template("画像を置くスライドがありません".into()))
    }

    /// 追加スライドを presentation.xml / rels / [Content_Types].xml に登録
    fn register_slides(&self) -> Result<(String, String, String)> {
        let rel_ids = attribute_values(&self.presentation_rels, "Relationship", "Id")?;
        let slide_ids = attribute_values(&self.presentation, "sldId", "id")?;
        let mut next_rid = max_numbered(&rel_ids, "rId") + 1;
        let mut next_slide_id = max_numbered(&slide_ids, "").max(MIN_SLIDE_ID - 1) + 1;

        let mut slides = Vec::with_capacity(self.slides.len());
        let mut relationships = Vec::with_capacity(self.slides.len());
        let mut overrides = Vec::with_capacity(self.slides.len());

        for index in 0..self.slides.len() {
            let number = self.slide_number(index);
            let rid = format!("rId{}", next_rid);
            relationships.push(
                Element::new("Relationship")
                    .attr("Id", rid.as_str())
                    .attr("Type", REL_TYPE_SLIDE)
                    .attr("Target", format!("slides/slide{}.xml", number)),
            );
            overrides.push(
                Element::new("Override")
                    .attr("PartName", format!("/ppt/slides/slide{}.xml", number))
                    .attr("ContentType", SLIDE_CONTENT_TYPE),
            );
            slides.push((next_slide_id, rid));

            next_rid += 1;
            next_slide_id += 1;
        }

        let mut type_entries =
            missing_default_types(&self.content_types, self.media.iter().map(|(name, _)| Path::new(name)))?;
        type_entries.extend(overrides);

        let content_types = append_to_root(&self.content_types, &type_entries)?;
        let presentation_rels = append_to_root(&self.presentation_rels, &relationships)?;
        let presentation = insert_slide_ids(&self.presentation, &slides)?;

        Ok((content_types, presentation, presentation_rels))
    }
}

impl ArtifactSink for PptxSink {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Deck
    }

    fn add_title_surface(&mut self, title: &str) -> Result<()> {
        let mut slide = PendingSlide::new(self.layouts.title);
        let id = slide.take_shape_id();
        // タイトルのプレースホルダに文字列を入れる（位置・書式はレイアウトから継承）
        slide.shapes.push(format!(
            concat!(
                "<p:sp><p:nvSpPr><p:cNvPr id=\"{id}\" name=\"Title {id}\"/>",
                "<p:cNvSpPr><a:spLocks noGrp=\"1\"/></p:cNvSpPr>",
                "<p:nvPr><p:ph type=\"ctrTitle\"/></p:nvPr></p:nvSpPr><p:spPr/>",
                "<p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang=\"en-US\" dirty=\"0\"/>",
                "<a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>"
            ),
            id = id,
            text = escape_xml(title),
        ));
        self.slides.push(slide);
        Ok(())
    }

    fn add_content_surface(&mut self) -> Result<()> {
        self.slides.push(PendingSlide::new(self.layouts.content));
        Ok(())
    }

    fn add_picture(&mut self, image: &ImageRef, placement: &Placement) -> Result<()> {
        let data = std::fs::read(image.path())?;
        let (extension, _) = media_type(image.path());
        let media_number = self.first_media_number + self.media.len() as u32;
        let media_name = format!("ppt/media/image{}.{}", media_number, extension);

        let slide = self.current_slide()?;
        let rid = slide.add_relationship(
            REL_TYPE_IMAGE,
            &format!("../media/image{}.{}", media_number, extension),
        );
        let id = slide.take_shape_id();
        slide.shapes.push(format!(
            concat!(
                "<p:pic><p:nvPicPr><p:cNvPr id=\"{id}\" name=\"Picture {id}\" descr=\"{descr}\"/>",
                "<p:cNvPicPr><a:picLocks noChangeAspect=\"1\"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>",
                "<p:blipFill><a:blip r:embed=\"{rid}\"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>",
                "<p:spPr><a:xfrm><a:off x=\"{x}\" y=\"{y}\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>",
                "<a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></p:spPr></p:pic>"
            ),
            id = id,
            descr = escape_xml(&image.file_name()),
            rid = rid,
            x = placement.x,
            y = placement.y,
            cx = placement.width,
            cy = placement.height,
        ));

        self.media.push((media_name, data));
        Ok(())
    }

    fn add_closing_surface(&mut self) -> Result<()> {
        self.slides.push(PendingSlide::new(self.layouts.closing));
        Ok(())
    }

    fn surface_count(&self) -> usize {
        self.slides.len()
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        let (content_types, presentation, presentation_rels) = self.register_slides()?;

        let mut parts: Vec<(String, Vec<u8>)> = vec![
            (CONTENT_TYPES.to_string(), content_types.into_bytes()),
            (PRESENTATION.to_string(), presentation.into_bytes()),
            (PRESENTATION_RELS.to_string(), presentation_rels.into_bytes()),
        ];

        for (index, slide) in self.slides.iter().enumerate() {
            let number = self.slide_number(index);
            debug!(slide = number, layout = slide.layout, shapes = slide.shapes.len(), "writing slide");
            parts.push((format!("ppt/slides/slide{}.xml", number), slide.to_xml().into_bytes()));
            parts.push((
                format!("ppt/slides/_rels/slide{}.xml.rels", number),
                relationships_part(&slide.relationships).into_bytes(),
            ));
        }

        let entries = self
            .entries
            .iter()
            .chain(parts.iter())
            .chain(self.media.iter())
            .map(|(name, data)| (name.as_str(), data.as_slice()));

        // [Content_Types].xml を先頭に
        let (first, rest): (Vec<_>, Vec<_>) = entries.partition(|(name, _)| *name == CONTENT_TYPES);
        write_package(path, first.into_iter().chain(rest))
    }
}

fn take_text(entries: &mut Vec<(String, Vec<u8>)>, name: &str) -> Result<String> {
    let position = entries
        .iter()
        .position(|(entry, _)| entry == name)
        .ok_or_else(|| PhotoOfficeError::Template(format!("{} がありません", name)))?;
    let (_, data) = entries.remove(position);
    String::from_utf8(data)
        .map_err(|e| PhotoOfficeError::Template(format!("{} が UTF-8 ではありません: {}", name, e)))
}

/// `{prefix}<数字>.` 形式のエントリ名の最大番号
fn max_entry_number(entries: &[(String, Vec<u8>)], prefix: &str) -> u32 {
    entries
        .iter()
        .filter_map(|(name, _)| name.strip_prefix(prefix))
        .filter_map(|rest| rest.split('.').next())
        .filter_map(|digits| digits.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

/// sldIdLst にスライドIDを追加
///
/// 無ければマスタ系リストの直後に作る。要素名は presentation.xml の
/// ルートと同じプレフィックス、`r:id` は関係名前空間に束縛済みのプレフィックス
/// （未宣言ならルートに `xmlns:r` を足す）。
fn insert_slide_ids(presentation: &str, slides: &[(u32, String)]) -> Result<String> {
    if slides.is_empty() {
        return Ok(presentation.to_string());
    }

    let bound = namespace_prefix(presentation, NS_RELATIONSHIPS)?;
    let rel_prefix = bound.clone().unwrap_or_else(|| "r".to_string());
    let rel_id = qualified(Some(&rel_prefix), "id");
    let entries: Vec<Element> = slides
        .iter()
        .map(|(id, rid)| {
            Element::new("sldId")
                .attr("id", id.to_string())
                .attr(rel_id.as_str(), rid.as_str())
        })
        .collect();

    let mut reader = Reader::from_str(presentation);
    let mut writer = Writer::new(Vec::with_capacity(presentation.len() + entries.len() * 48));
    let mut depth = 0usize;
    let mut prefix: Option<String> = None;
    let mut inserted = false;

    loop {
        match reader.read_event()? {
            Event::Start(mut e) => {
                if depth == 0 {
                    prefix = element_prefix(&e);
                    if bound.is_none() {
                        let declaration = format!("xmlns:{}", rel_prefix);
                        e.push_attribute((declaration.as_str(), NS_RELATIONSHIPS));
                    }
                } else if depth == 1 && !inserted && !is_local(&e, SLIDE_LIST) && !is_master_list(&e) {
                    write_slide_list(&mut writer, prefix.as_deref(), &entries)?;
                    inserted = true;
                }
                depth += 1;
                writer.write_event(Event::Start(e))?;
            }
            Event::Empty(e) if depth == 1 && !inserted && is_local(&e, SLIDE_LIST) => {
                writer.write_event(Event::Start(e.borrow()))?;
                write_elements(&mut writer, prefix.as_deref(), &entries)?;
                writer.write_event(Event::End(e.to_end()))?;
                inserted = true;
            }
            Event::Empty(e) if depth == 1 && !inserted && !is_master_list(&e) => {
                write_slide_list(&mut writer, prefix.as_deref(), &entries)?;
                inserted = true;
                writer.write_event(Event::Empty(e))?;
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                let closes_list = depth == 1 && e.local_name().as_ref() == SLIDE_LIST.as_bytes();
                if !inserted && closes_list {
                    write_elements(&mut writer, prefix.as_deref(), &entries)?;
                    inserted = true;
                } else if !inserted && depth == 0 {
                    write_slide_list(&mut writer, prefix.as_deref(), &entries)?;
                    inserted = true;
                }
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    if !inserted {
        return Err(PhotoOfficeError::Template(format!("{} にルート要素がありません", PRESENTATION)));
    }
    into_text(writer)
}

fn is_local(element: &BytesStart, local: &str) -> bool {
    element.local_name().as_ref() == local.as_bytes()
}

fn is_master_list(element: &BytesStart) -> bool {
    MASTER_LISTS.iter().any(|local| is_local(element, local))
}

fn write_slide_list(
    writer: &mut Writer<Vec<u8>>,
    prefix: Option<&str>,
    entries: &[Element],
) -> Result<()> {
    let name = qualified(prefix, SLIDE_LIST);
    writer.write_event(Event::Start(BytesStart::new(name.as_str())))?;
    write_elements(writer, prefix, entries)?;
    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    Ok(())
}
