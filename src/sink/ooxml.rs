//! OOXML パッケージ（pptx / docx）共通ヘルパー

use crate::error::{PhotoOfficeError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const XML_DECLARATION: &str =
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

pub const NS_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const NS_PACKAGE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";
pub const NS_DRAWINGML: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const REL_TYPE_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// 画像ファイルの拡張子（小文字）と MIME タイプ
///
/// 中身は検査せず、拡張子だけで判定する。
pub fn media_type(path: &Path) -> (String, String) {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "bin".to_string());
    let mime = image::ImageFormat::from_extension(&extension)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    (extension, mime)
}

pub fn relationship(id: &str, rel_type: &str, target: &str) -> String {
    format!(
        r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
        id,
        rel_type,
        escape_xml(target)
    )
}

pub fn relationships_part(relationships: &[String]) -> String {
    format!(
        r#"{}<Relationships xmlns="{}">{}</Relationships>"#,
        XML_DECLARATION,
        NS_PACKAGE_RELATIONSHIPS,
        relationships.concat()
    )
}

/// 追加する空要素
///
/// 要素名は書き込み先の親要素と同じプレフィックスで修飾する。
/// 属性名はそのまま（`r:id` などは呼び出し側で修飾済み）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    local: &'static str,
    attributes: Vec<(String, String)>,
}

impl Element {
    pub fn new(local: &'static str) -> Self {
        Self { local, attributes: Vec::new() }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }
}

pub fn qualified(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    }
}

pub fn element_prefix(element: &BytesStart) -> Option<String> {
    element
        .name()
        .prefix()
        .map(|prefix| String::from_utf8_lossy(prefix.as_ref()).into_owned())
}

pub fn write_elements<W: Write>(
    writer: &mut Writer<W>,
    prefix: Option<&str>,
    elements: &[Element],
) -> Result<()> {
    for element in elements {
        let mut start = BytesStart::new(qualified(prefix, element.local));
        for (key, value) in &element.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        writer.write_event(Event::Empty(start))?;
    }
    Ok(())
}

pub fn into_text(writer: Writer<Vec<u8>>) -> Result<String> {
    String::from_utf8(writer.into_inner())
        .map_err(|e| PhotoOfficeError::Template(format!("XML が UTF-8 ではありません: {}", e)))
}

/// 要素の属性値を文書順に列挙
///
/// 要素名はプレフィックスを無視して比較する。属性は修飾なしのものだけ
/// （`sldId` の `id` と `r:id` を区別するため）。
pub fn attribute_values(xml: &str, element: &str, attribute: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut values = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == element.as_bytes() =>
            {
                for attr in e.attributes().flatten() {
                    if attr.key.prefix().is_none() && attr.key.as_ref() == attribute.as_bytes() {
                        values.push(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(values)
}

/// ルート要素で `namespace` に束縛されたプレフィックス
pub fn namespace_prefix(xml: &str, namespace: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let prefix = e.attributes().flatten().find_map(|attr| {
                    let bound = attr.key.as_ref().strip_prefix(b"xmlns:")?;
                    (attr.value.as_ref() == namespace.as_bytes())
                        .then(|| String::from_utf8_lossy(bound).into_owned())
                });
                return Ok(prefix);
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// `rId7` のような値の最大番号（該当なしは 0）
pub fn max_numbered(values: &[String], prefix: &str) -> u32 {
    values
        .iter()
        .filter_map(|value| value.strip_prefix(prefix))
        .filter_map(|digits| digits.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

/// ルート要素の末尾に子要素を追加
pub fn append_to_root(xml: &str, children: &[Element]) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + children.len() * 96));
    let mut depth = 0usize;
    let mut root_prefix: Option<String> = None;
    let mut appended = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if depth == 0 {
                    root_prefix = element_prefix(&e);
                }
                depth += 1;
                writer.write_event(Event::Start(e))?;
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    write_elements(&mut writer, root_prefix.as_deref(), children)?;
                    appended = true;
                }
                writer.write_event(Event::End(e))?;
            }
            // `<Types/>` のような空のルート
            Event::Empty(e) if depth == 0 => {
                let prefix = element_prefix(&e);
                writer.write_event(Event::Start(e.borrow()))?;
                write_elements(&mut writer, prefix.as_deref(), children)?;
                writer.write_event(Event::End(e.to_end()))?;
                appended = true;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    if !appended {
        return Err(PhotoOfficeError::Template("ルート要素がありません".into()));
    }
    into_text(writer)
}

/// `[Content_Types].xml` に無い拡張子の Default 要素
///
/// 拡張子は大文字小文字を区別しない（OPC の規則）。
pub fn missing_default_types<'a, I>(content_types: &str, media: I) -> Result<Vec<Element>>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut known: Vec<String> = attribute_values(content_types, "Default", "Extension")?
        .into_iter()
        .map(|extension| extension.to_lowercase())
        .collect();

    let mut defaults = Vec::new();
    for path in media {
        let (extension, mime) = media_type(path);
        if known.contains(&extension) {
            continue;
        }
        defaults.push(Element::new("Default").attr("Extension", extension.as_str()).attr("ContentType", mime));
        known.push(extension);
    }
    Ok(defaults)
}

/// パッケージ全体をZIPとして保存
pub fn write_package<'a, I>(path: &Path, entries: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, data) in entries {
        zip.start_file(name, options)?;
        zip.write_all(data)?;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
        assert_eq!(escape_xml("現場写真"), "現場写真");
    }

    #[test]
    fn test_media_type() {
        assert_eq!(
            media_type(Path::new("/p/a.PNG")),
            ("png".to_string(), "image/png".to_string())
        );
        assert_eq!(media_type(Path::new("b.jpg")).1, "image/jpeg");
        assert_eq!(media_type(Path::new("c.gif")).1, "image/gif");
        assert_eq!(media_type(Path::new("d.xyz")).1, "application/octet-stream");
    }

    #[test]
    fn test_max_numbered() {
        let ids = vec!["rId2".to_string(), "rId10".to_string(), "rIdX".to_string()];
        assert_eq!(max_numbered(&ids, "rId"), 10);
        assert_eq!(max_numbered(&[], "rId"), 0);
        assert_eq!(max_numbered(&["300".to_string(), "256".to_string()], ""), 300);
    }

    #[test]
    fn test_attribute_values_ignores_element_prefix() {
        let xml = r#"<pml:presentation xmlns:pml="urn:p" xmlns:rel="urn:r"><pml:sldIdLst><pml:sldId id="256" rel:id="rId2"/><pml:sldId id="261" rel:id="rId3"/></pml:sldIdLst></pml:presentation>"#;
        assert_eq!(attribute_values(xml, "sldId", "id").unwrap(), vec!["256", "261"]);
        assert_eq!(namespace_prefix(xml, "urn:r").unwrap(), Some("rel".to_string()));
        assert_eq!(namespace_prefix(xml, "urn:none").unwrap(), None);
    }

    #[test]
    fn test_append_to_root() {
        let rels = r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="urn:rels"><Relationship Id="rId1" Type="t" Target="a.xml"/></Relationships>"#;
        let appended = append_to_root(
            rels,
            &[Element::new("Relationship").attr("Id", "rId2").attr("Type", "t").attr("Target", "b&c.xml")],
        )
        .unwrap();
        assert!(appended.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(appended.ends_with(
            r#"<Relationship Id="rId2" Type="t" Target="b&amp;c.xml"/></Relationships>"#
        ));

        let empty = append_to_root("<ct:Types xmlns:ct=\"urn:ct\"/>", &[Element::new("Default").attr("Extension", "png")])
            .unwrap();
        assert_eq!(empty, r#"<ct:Types xmlns:ct="urn:ct"><ct:Default Extension="png"/></ct:Types>"#);
    }

    #[test]
    fn test_append_to_malformed_xml_fails() {
        let err = append_to_root("<Types><Default></Types>", &[]).unwrap_err();
        assert!(matches!(err, PhotoOfficeError::Xml(_)));
    }

    #[test]
    fn test_missing_default_types() {
        let types = r#"<Types><Default Extension="PNG" ContentType="image/png"/></Types>"#;
        let media = [Path::new("image1.png"), Path::new("image2.jpg"), Path::new("image3.jpg")];
        let defaults = missing_default_types(types, media).unwrap();
        assert_eq!(
            defaults,
            vec![Element::new("Default").attr("Extension", "jpg").attr("ContentType", "image/jpeg")]
        );
    }
}
