//! Document extraction for PDF and OOXML (docx, pptx) files.
//!
//! Each backend concatenates its natural units (pages, paragraphs, shape
//! text boxes) with newlines, in document order. Empty units are kept.

use super::Extractor;
use crate::error::{MedleyError, Result};
use async_trait::async_trait;
use quick_xml::events::Event;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Maximum decompressed bytes to read from a single ZIP entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// PDF backend: one unit per page.
pub struct PdfExtractor;

#[async_trait]
impl Extractor for PdfExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let pages = run_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
                .map_err(|e| MedleyError::DecodeFailure(format!("PDF: {}", e)))
        })
        .await?;

        debug!("Extracted {} PDF pages", pages.len());
        Ok(pages.join("\n"))
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

/// DOCX backend: one unit per paragraph.
pub struct DocxExtractor;

#[async_trait]
impl Extractor for DocxExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let paragraphs = run_blocking(move || docx_paragraphs(&bytes)).await?;

        debug!("Extracted {} DOCX paragraphs", paragraphs.len());
        Ok(paragraphs.join("\n"))
    }

    fn name(&self) -> &str {
        "docx"
    }
}

/// PPTX backend: one unit per text-bearing shape, slides in order.
pub struct PptxExtractor;

#[async_trait]
impl Extractor for PptxExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let shapes = run_blocking(move || pptx_shape_texts(&bytes)).await?;

        debug!("Extracted {} PPTX text shapes", shapes.len());
        Ok(shapes.join("\n"))
    }

    fn name(&self) -> &str {
        "pptx"
    }
}

/// Run CPU-bound parsing off the async worker threads.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| MedleyError::DecodeFailure(format!("extraction task failed: {}", e)))?
}

fn ooxml_err(e: impl std::fmt::Display) -> MedleyError {
    MedleyError::DecodeFailure(format!("OOXML: {}", e))
}

fn open_archive(bytes: &[u8]) -> Result<zip::ZipArchive<std::io::Cursor<&[u8]>>> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(ooxml_err)
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>> {
    let entry = archive.by_name(name).map_err(ooxml_err)?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(ooxml_err)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ooxml_err(format!("{} exceeds size limit", name)));
    }
    Ok(out)
}

/// Paragraph texts of `word/document.xml`, in order of their opening tag.
///
/// Paragraphs nested in text boxes become units of their own; the enclosing
/// paragraph keeps the runs around the box.
fn docx_paragraphs(bytes: &[u8]) -> Result<Vec<String>> {
    let mut archive = open_archive(bytes)?;
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml")?;

    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    // Indices into `paragraphs` of the currently open paragraphs.
    let mut open: Vec<usize> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => {
                    open.push(paragraphs.len());
                    paragraphs.push(String::new());
                }
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                let innermost = open.last().copied();
                match (e.local_name().as_ref(), innermost) {
                    (b"p", _) => paragraphs.push(String::new()),
                    (b"tab", Some(i)) => paragraphs[i].push('\t'),
                    (b"br" | b"cr", Some(i)) => paragraphs[i].push('\n'),
                    _ => {}
                }
            }
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(ooxml_err)?;
                if let Some(&i) = open.last() {
                    paragraphs[i].push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"p" => {
                    open.pop();
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

/// Text of every shape carrying a text body, slide by slide.
fn pptx_shape_texts(bytes: &[u8]) -> Result<Vec<String>> {
    let mut archive = open_archive(bytes)?;

    let slide_names = match presentation_slide_order(&mut archive)? {
        Some(names) => names,
        None => numbered_slide_parts(&archive),
    };

    let mut shapes = Vec::new();
    for name in slide_names {
        let xml = read_zip_entry_bounded(&mut archive, &name)?;
        shapes.extend(slide_shape_texts(&xml)?);
    }
    Ok(shapes)
}

/// Slide parts sorted by the number in their file name.
fn numbered_slide_parts(archive: &zip::ZipArchive<std::io::Cursor<&[u8]>>) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

/// Slide parts in presentation order, from the `sldIdLst` of
/// `ppt/presentation.xml` resolved through its relationships.
///
/// `None` when the deck has no presentation part.
fn presentation_slide_order(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<Option<Vec<String>>> {
    if archive.index_for_name("ppt/presentation.xml").is_none() {
        return Ok(None);
    }

    let presentation = read_zip_entry_bounded(archive, "ppt/presentation.xml")?;
    let mut slide_rel_ids = Vec::new();
    for_each_element(&presentation, |name, e| {
        if name == b"sldId" {
            // The relationship id is the prefixed `r:id`; the bare `id` is numeric.
            if let Some(rel) = attribute(e, |key| {
                key.prefix().is_some() && key.local_name().as_ref() == b"id"
            }) {
                slide_rel_ids.push(rel);
            }
        }
    })?;

    let rels = read_zip_entry_bounded(archive, "ppt/_rels/presentation.xml.rels")?;
    let mut targets = std::collections::HashMap::new();
    for_each_element(&rels, |name, e| {
        if name == b"Relationship" {
            let id = attribute(e, |key| key.as_ref() == b"Id");
            let target = attribute(e, |key| key.as_ref() == b"Target");
            if let (Some(id), Some(target)) = (id, target) {
                targets.insert(id, target);
            }
        }
    })?;

    let names = slide_rel_ids
        .iter()
        .filter_map(|rel| targets.get(rel))
        .map(|target| match target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("ppt/{}", target),
        })
        .filter(|name| archive.index_for_name(name).is_some())
        .collect();

    Ok(Some(names))
}

/// Call `f` with the local name of every start or empty element.
fn for_each_element(
    xml: &[u8],
    mut f: impl FnMut(&[u8], &quick_xml::events::BytesStart),
) -> Result<()> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => f(e.local_name().as_ref(), &e),
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn attribute(
    e: &quick_xml::events::BytesStart,
    matches: impl Fn(quick_xml::name::QName) -> bool,
) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| matches(attr.key))
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
}

#[derive(Default)]
struct ShapeText {
    has_body: bool,
    paragraphs: Vec<String>,
    current: Option<String>,
}

fn slide_shape_texts(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut shapes = Vec::new();
    let mut shape: Option<ShapeText> = None;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sp" => shape = Some(ShapeText::default()),
                b"txBody" => {
                    if let Some(s) = shape.as_mut() {
                        s.has_body = true;
                    }
                }
                b"p" => {
                    if let Some(s) = shape.as_mut() {
                        s.current = Some(String::new());
                    }
                }
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if let Some(s) = shape.as_mut() {
                    match e.local_name().as_ref() {
                        b"p" => s.paragraphs.push(String::new()),
                        b"br" => push_char(&mut s.current, '\n'),
                        _ => {}
                    }
                }
            }
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(ooxml_err)?;
                if let Some(p) = shape.as_mut().and_then(|s| s.current.as_mut()) {
                    p.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"p" => {
                    if let Some(s) = shape.as_mut() {
                        if let Some(p) = s.current.take() {
                            s.paragraphs.push(p);
                        }
                    }
                }
                b"t" => in_text = false,
                b"sp" => {
                    if let Some(s) = shape.take() {
                        if s.has_body {
                            shapes.push(s.paragraphs.join("\n"));
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(shapes)
}

fn push_char(target: &mut Option<String>, c: char) {
    if let Some(s) = target.as_mut() {
        s.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            for (name, body) in entries {
                zip.start_file(*name, zip::write::SimpleFileOptions::default())
                    .unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    #[test]
    fn test_docx_paragraphs_keep_order_and_empties() {
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"{}\"><w:body>\
             <w:p><w:r><w:t>First </w:t></w:r><w:r><w:t>line</w:t></w:r></w:p>\
             <w:p/>\
             <w:p><w:r><w:t>Fish &amp; chips</w:t></w:r></w:p>\
             </w:body></w:document>",
            W_NS
        );
        let bytes = zip_with(&[("word/document.xml", xml.as_str())]);

        let paragraphs = docx_paragraphs(&bytes).unwrap();
        assert_eq!(paragraphs, vec!["First line", "", "Fish & chips"]);
    }

    #[test]
    fn test_docx_text_box_keeps_enclosing_paragraph() {
        let xml = format!(
            "<w:document xmlns:w=\"{}\"><w:body>\
             <w:p><w:r><w:t>Outer</w:t></w:r>\
             <w:r><w:txbxContent><w:p><w:r><w:t>Inner</w:t></w:r></w:p></w:txbxContent></w:r>\
             <w:r><w:t xml:space=\"preserve\"> tail</w:t></w:r></w:p>\
             <w:p><w:r><w:t>After</w:t></w:r></w:p>\
             </w:body></w:document>",
            W_NS
        );
        let bytes = zip_with(&[("word/document.xml", xml.as_str())]);

        let paragraphs = docx_paragraphs(&bytes).unwrap();
        assert_eq!(paragraphs, vec!["Outer tail", "Inner", "After"]);
    }

    #[test]
    fn test_docx_missing_document_is_decode_failure() {
        let bytes = zip_with(&[("word/other.xml", "<x/>")]);
        assert!(matches!(
            docx_paragraphs(&bytes).unwrap_err(),
            MedleyError::DecodeFailure(_)
        ));
    }

    #[test]
    fn test_invalid_zip_is_decode_failure() {
        assert!(matches!(
            pptx_shape_texts(b"not a zip").unwrap_err(),
            MedleyError::DecodeFailure(_)
        ));
    }

    fn slide(shapes: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?><p:sld \
             xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\" \
             xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\">\
             <p:cSld><p:spTree>{}</p:spTree></p:cSld></p:sld>",
            shapes
        )
    }

    #[test]
    fn test_pptx_shapes_in_slide_order() {
        let title = "<p:sp><p:txBody><a:p><a:r><a:t>Title</a:t></a:r></a:p></p:txBody></p:sp>";
        let body = "<p:sp><p:txBody><a:p><a:r><a:t>one</a:t></a:r></a:p>\
                    <a:p><a:r><a:t>two</a:t></a:r></a:p></p:txBody></p:sp>";
        let empty = "<p:sp><p:txBody><a:p/></p:txBody></p:sp>";
        let picture = "<p:pic><p:nvPicPr/></p:pic>";
        let no_body = "<p:sp><p:spPr/></p:sp>";

        let slide10 = slide(title);
        let slide2 = slide(&format!("{}{}", body, picture));
        let slide1 = slide(&format!("{}{}{}", title, empty, no_body));
        let bytes = zip_with(&[
            ("ppt/slides/slide10.xml", slide10.as_str()),
            ("ppt/slides/slide2.xml", slide2.as_str()),
            ("ppt/slides/slide1.xml", slide1.as_str()),
        ]);

        let shapes = pptx_shape_texts(&bytes).unwrap();
        assert_eq!(shapes, vec!["Title", "", "one\ntwo", "Title"]);
    }

    #[test]
    fn test_pptx_follows_presentation_order() {
        let presentation = "<?xml version=\"1.0\"?><p:presentation \
             xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\" \
             xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
             <p:sldIdLst><p:sldId id=\"256\" r:id=\"rId3\"/><p:sldId id=\"257\" r:id=\"rId2\"/></p:sldIdLst>\
             </p:presentation>";
        let rels = "<?xml version=\"1.0\"?><Relationships \
             xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
             <Relationship Id=\"rId1\" Type=\"slideMaster\" Target=\"slideMasters/slideMaster1.xml\"/>\
             <Relationship Id=\"rId2\" Type=\"slide\" Target=\"slides/slide1.xml\"/>\
             <Relationship Id=\"rId3\" Type=\"slide\" Target=\"slides/slide2.xml\"/>\
             </Relationships>";
        let first = slide("<p:sp><p:txBody><a:p><a:r><a:t>moved last</a:t></a:r></a:p></p:txBody></p:sp>");
        let second = slide("<p:sp><p:txBody><a:p><a:r><a:t>moved first</a:t></a:r></a:p></p:txBody></p:sp>");
        let bytes = zip_with(&[
            ("ppt/presentation.xml", presentation),
            ("ppt/_rels/presentation.xml.rels", rels),
            ("ppt/slides/slide1.xml", first.as_str()),
            ("ppt/slides/slide2.xml", second.as_str()),
        ]);

        let shapes = pptx_shape_texts(&bytes).unwrap();
        assert_eq!(shapes, vec!["moved first", "moved last"]);
    }

    #[tokio::test]
    async fn test_pdf_garbage_is_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();

        let err = PdfExtractor.extract(&path).await.unwrap_err();
        assert!(matches!(err, MedleyError::DecodeFailure(_)));
    }

    #[tokio::test]
    async fn test_docx_extractor_joins_with_newlines() {
        let xml = format!(
            "<w:document xmlns:w=\"{}\"><w:body>\
             <w:p><w:r><w:t>alpha</w:t></w:r></w:p>\
             <w:p><w:r><w:t>beta</w:t></w:r></w:p>\
             </w:body></w:document>",
            W_NS
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.docx");
        std::fs::write(&path, zip_with(&[("word/document.xml", xml.as_str())])).unwrap();

        let text = DocxExtractor.extract(&path).await.unwrap();
        assert_eq!(text, "alpha\nbeta");
    }
}
