use crate::constants::CONTENT_TYPES_NAMESPACE;
use crate::xml_util::escape_xml;
use crate::Result;
use roxmltree::Document;

/// The `[Content_Types].xml` part: content types by extension and by part name.
///
/// Part names are stored without their leading `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    pub defaults: Vec<(String, String)>,
    pub overrides: Vec<(String, String)>,
}

impl ContentTypes {
    pub fn parse(xml_data: &[u8]) -> Result<Self> {
        let xml_str = std::str::from_utf8(xml_data)?;
        let doc = Document::parse(xml_str)?;
        let mut types = ContentTypes::default();

        for node in doc.root_element().children().filter(|n| n.is_element()) {
            match node.tag_name().name() {
                "Default" => {
                    if let (Some(ext), Some(ct)) = (node.attribute("Extension"), node.attribute("ContentType")) {
                        types.defaults.push((ext.to_ascii_lowercase(), ct.to_string()));
                    }
                }
                "Override" => {
                    if let (Some(part), Some(ct)) = (node.attribute("PartName"), node.attribute("ContentType")) {
                        types.overrides.push((part.trim_start_matches('/').to_string(), ct.to_string()));
                    }
                }
                _ => {}
            }
        }

        Ok(types)
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<Types xmlns="{}">"#, CONTENT_TYPES_NAMESPACE));
        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(r#"<Default Extension="{}" ContentType="{}"/>"#, escape_xml(ext), escape_xml(ct)));
        }
        for (part, ct) in &self.overrides {
            xml.push_str(&format!(r#"<Override PartName="/{}" ContentType="{}"/>"#, escape_xml(part), escape_xml(ct)));
        }
        xml.push_str("</Types>");
        xml
    }

    /// Content type of a part: its override, else the default for its extension.
    pub fn content_type_of(&self, part_name: &str) -> Option<&str> {
        if let Some((_, ct)) = self.overrides.iter().find(|(p, _)| p == part_name) {
            return Some(ct);
        }
        let ext = part_name.rsplit_once('.')?.1.to_ascii_lowercase();
        self.defaults.iter().find(|(e, _)| *e == ext).map(|(_, ct)| ct.as_str())
    }

    pub fn ensure_default(&mut self, extension: &str, content_type: &str) {
        let extension = extension.to_ascii_lowercase();
        if !self.defaults.iter().any(|(e, _)| *e == extension) {
            self.defaults.push((extension, content_type.to_string()));
        }
    }

    pub fn add_override(&mut self, part_name: &str, content_type: &str) {
        self.overrides.retain(|(p, _)| p != part_name);
        self.overrides.push((part_name.to_string(), content_type.to_string()));
    }

    pub fn remove_override(&mut self, part_name: &str) {
        self.overrides.retain(|(p, _)| p != part_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SLIDE_CONTENT_TYPE;

    const TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="XML" ContentType="application/xml"/><Override PartName="/ppt/slides/slide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/></Types>"#;

    #[test]
    fn test_lookup_by_override_and_extension() {
        let types = ContentTypes::parse(TYPES.as_bytes()).unwrap();
        assert_eq!(types.content_type_of("ppt/slides/slide1.xml"), Some(SLIDE_CONTENT_TYPE));
        assert_eq!(types.content_type_of("docProps/app.xml"), Some("application/xml"));
        assert_eq!(types.content_type_of("ppt/media/image1.png"), None);
    }

    #[test]
    fn test_edits_survive_serialization() {
        let mut types = ContentTypes::parse(TYPES.as_bytes()).unwrap();
        types.ensure_default("PNG", "image/png");
        types.ensure_default("png", "image/x-other");
        types.add_override("ppt/slides/slide2.xml", SLIDE_CONTENT_TYPE);
        types.remove_override("ppt/slides/slide1.xml");

        let reparsed = ContentTypes::parse(types.to_xml().as_bytes()).unwrap();
        assert_eq!(reparsed, types);
        assert_eq!(reparsed.content_type_of("ppt/media/image4.png"), Some("image/png"));
        assert_eq!(reparsed.overrides.len(), 1);
    }
}
