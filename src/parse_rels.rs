use crate::constants::PKG_RELS_NAMESPACE;
use crate::types::Relationship;
use crate::xml_util::escape_xml;
use crate::{Error, Result};
use roxmltree::Document;

/// Parses relationship (`.rels`) XML data of any package part.
///
/// Relationships map resource IDs to their targets. Unlike the slide content itself, a `.rels` part
/// is small and fully modeled, so it is rewritten from these values instead of being spliced.
///
/// # Errors
///
/// An error is returned if:
/// - The XML data is not valid UTF-8.
/// - Malformed or invalid XML structure is detected.
pub fn parse_rels(xml_data: &[u8]) -> Result<Vec<Relationship>> {
    let xml_str = std::str::from_utf8(xml_data)?;
    let doc = Document::parse(xml_str)?;
    let root = doc.root_element();

    let mut rels = Vec::new();
    for rel in root.children().filter(|n| n.is_element() && n.tag_name().name() == "Relationship") {
        let (Some(id), Some(rel_type), Some(target)) =
            (rel.attribute("Id"), rel.attribute("Type"), rel.attribute("Target"))
        else {
            continue;
        };

        rels.push(Relationship {
            id: id.to_string(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            external: rel.attribute("TargetMode") == Some("External"),
        });
    }

    Ok(rels)
}

/// Serializes relationships back into a `.rels` part.
pub fn write_rels(rels: &[Relationship]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(&format!(r#"<Relationships xmlns="{}">"#, PKG_RELS_NAMESPACE));
    for rel in rels {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
            escape_xml(&rel.id),
            escape_xml(&rel.rel_type),
            escape_xml(&rel.target),
            if rel.external { r#" TargetMode="External""# } else { "" }
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// Returns the first relationship of the given type.
pub fn find_by_type<'r>(rels: &'r [Relationship], rel_type: &str) -> Option<&'r Relationship> {
    rels.iter().find(|r| r.rel_type == rel_type)
}

/// Allocates a relationship id of the form `rIdN` that is not yet taken.
pub fn next_rel_id(rels: &[Relationship]) -> String {
    let highest = rels
        .iter()
        .filter_map(|r| r.id.strip_prefix("rId"))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    let mut candidate = highest + 1;
    while rels.iter().any(|r| r.id == format!("rId{}", candidate)) {
        candidate += 1;
    }
    format!("rId{}", candidate)
}

/// Constructs the path to the relationships part of a given part.
///
/// # Example
///
/// ```
/// // For a part "ppt/slides/slide1.xml"
/// // Returns "ppt/slides/_rels/slide1.xml.rels"
/// ```
pub fn rels_path_for(part_name: &str) -> String {
    match part_name.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part_name),
    }
}

/// Resolves a relationship target relative to the part that owns the relationship.
///
/// `("ppt/slides/slide1.xml", "../media/image1.png")` resolves to `ppt/media/image1.png`.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = source_part
        .rsplit_once('/')
        .map(|(dir, _)| dir.split('/').collect())
        .unwrap_or_default();

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Expresses `target_part` relative to the directory of `source_part`.
pub fn relative_target(source_part: &str, target_part: &str) -> String {
    let source_dir: Vec<&str> = source_part
        .rsplit_once('/')
        .map(|(dir, _)| dir.split('/').collect())
        .unwrap_or_default();
    let target: Vec<&str> = target_part.split('/').collect();

    let common = source_dir
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = std::iter::repeat("..").take(source_dir.len() - common).collect();
    parts.extend_from_slice(&target[common..]);
    parts.join("/")
}

pub(crate) fn missing_part(name: &str) -> Error {
    Error::MissingPart(name.to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use super::*;
    use crate::constants::{IMAGE_NAMESPACE, SLIDE_LAYOUT_REL_TYPE};

    fn load_xml(filename: &str) -> Vec<u8> {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("tests");
        path.push("test_data");
        path.push("xml");
        path.push(filename);
        fs::read(path).expect("Unable to read test data file")
    }

    #[test]
    fn test_parse_slide_rels_with_images() {
        let xml_data = load_xml("rels_with_images.xml");
        let rels = parse_rels(&xml_data).expect("rels should parse");

        assert_eq!(rels.len(), 3);
        assert_eq!(rels[0].rel_type, SLIDE_LAYOUT_REL_TYPE);
        assert_eq!(rels[1].id, "rId2");
        assert_eq!(rels[1].rel_type, IMAGE_NAMESPACE);
        assert_eq!(rels[1].target, "../media/image1.png");
        assert_eq!(rels[2].target, "../media/image2.jpg");
        assert!(rels.iter().all(|r| !r.external));
    }

    #[test]
    fn test_parse_slide_rels_empty() {
        let xml_data = load_xml("rels_without_images.xml");
        let rels = parse_rels(&xml_data).expect("rels should parse");
        assert!(rels.iter().all(|r| r.rel_type != IMAGE_NAMESPACE));
    }

    #[test]
    fn test_write_then_parse_keeps_external_mode() {
        let rels = vec![
            Relationship { id: "rId1".into(), rel_type: SLIDE_LAYOUT_REL_TYPE.into(), target: "../slideLayouts/slideLayout1.xml".into(), external: false },
            Relationship { id: "rId7".into(), rel_type: "http://example.com/link".into(), target: "https://example.com/?a=1&b=2".into(), external: true },
        ];
        let parsed = parse_rels(write_rels(&rels).as_bytes()).unwrap();
        assert_eq!(parsed, rels);
    }

    #[test]
    fn test_next_rel_id_skips_taken_ids() {
        let rels = vec![
            Relationship { id: "rId1".into(), rel_type: String::new(), target: String::new(), external: false },
            Relationship { id: "rId3".into(), rel_type: String::new(), target: String::new(), external: false },
            Relationship { id: "custom".into(), rel_type: String::new(), target: String::new(), external: false },
        ];
        assert_eq!(next_rel_id(&rels), "rId4");
        assert_eq!(next_rel_id(&[]), "rId1");
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(rels_path_for("ppt/slides/slide1.xml"), "ppt/slides/_rels/slide1.xml.rels");
        assert_eq!(rels_path_for("ppt/presentation.xml"), "ppt/_rels/presentation.xml.rels");
        assert_eq!(resolve_target("ppt/slides/slide1.xml", "../media/image1.png"), "ppt/media/image1.png");
        assert_eq!(resolve_target("ppt/presentation.xml", "slides/slide2.xml"), "ppt/slides/slide2.xml");
        assert_eq!(resolve_target("ppt/slides/slide1.xml", "/ppt/media/x.png"), "ppt/media/x.png");
        assert_eq!(relative_target("ppt/slides/slide4.xml", "ppt/media/image9.png"), "../media/image9.png");
        assert_eq!(relative_target("ppt/presentation.xml", "ppt/slides/slide4.xml"), "slides/slide4.xml");
    }
}
