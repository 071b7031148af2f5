use crate::constants::{A_NAMESPACE, P_NAMESPACE, RELS_NAMESPACE};
use crate::types::{
    Geometry, PictureElement, PlaceholderRef, ShapeInfo, ShapeKind, ShapeTree, SlideElement, TextElement,
};
use crate::xml_util::{child, parse_bool, prefix_for, splice};
use crate::{Error, Formatting, Result, Run};
use roxmltree::{Document, Node};

/// Element children of `<p:spTree>` that describe the tree itself rather than a shape.
const TREE_PROPERTIES: [&str; 3] = ["nvGrpSpPr", "grpSpPr", "extLst"];

/// Parses the shape tree (`<p:cSld>/<p:spTree>`) of a slide, layout or master part.
///
/// Every direct child shape is classified once with [`classify`] and recorded together with its
/// byte range, so later edits can splice the source text without re-deriving anything.
///
/// # Errors
///
/// Parsing fails if the XML is malformed or if the `<p:cSld>` or `<p:spTree>` element is missing.
pub fn parse_shape_tree(xml: &str) -> Result<ShapeTree> {
    let doc = Document::parse(xml)?;
    let sp_tree = find_sp_tree(&doc)?;

    let range = sp_tree.range();
    if xml[range.clone()].ends_with("/>") {
        return Err(Error::ParseError("<p:spTree> has no content"));
    }
    let insert_at = xml[..range.end].rfind("</").ok_or(Error::ParseError("unterminated <p:spTree>"))?;

    let max_id = sp_tree
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "cNvPr")
        .filter_map(|n| n.attribute("id"))
        .filter_map(|id| id.parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    let shapes = sp_tree
        .children()
        .filter(|n| n.is_element() && !TREE_PROPERTIES.contains(&n.tag_name().name()))
        .enumerate()
        .map(|(index, node)| parse_shape(&node, index))
        .collect();

    Ok(ShapeTree { shapes, insert_at, max_id })
}

fn find_sp_tree<'a, 'input>(doc: &'a Document<'input>) -> Result<Node<'a, 'input>> {
    let c_sld = doc
        .root_element()
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "cSld" && n.tag_name().namespace() == Some(P_NAMESPACE))
        .ok_or(Error::ParseError("No <p:cSld> tag was found"))?;

    child(&c_sld, P_NAMESPACE, "spTree").ok_or(Error::ParseError("No <p:spTree> tag was found"))
}

/// Decides what a shape means for image placement.
///
/// A picture placeholder wins over everything else, whether it is still an empty `<p:sp>` or
/// an already filled `<p:pic>`. Only pictures without any placeholder role are free pictures.
pub fn classify(tag: &str, placeholder: Option<&PlaceholderRef>) -> ShapeKind {
    match (tag, placeholder.map(|ph| ph.ph_type.as_str())) {
        (_, Some("pic")) => ShapeKind::PicturePlaceholder,
        (_, Some("title" | "ctrTitle")) => ShapeKind::TitlePlaceholder,
        ("pic", None) => ShapeKind::FreePicture,
        _ => ShapeKind::Other,
    }
}

fn parse_shape(node: &Node, tree_index: usize) -> ShapeInfo {
    let tag = node.tag_name().name().to_string();
    let non_visual = node
        .children()
        .find(|n| n.is_element() && n.tag_name().name().starts_with("nv") && n.tag_name().namespace() == Some(P_NAMESPACE));

    let c_nv_pr = non_visual.and_then(|nv| child(&nv, P_NAMESPACE, "cNvPr"));
    let id = c_nv_pr
        .and_then(|n| n.attribute("id"))
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);
    let name = c_nv_pr.and_then(|n| n.attribute("name")).unwrap_or_default().to_string();
    let description = c_nv_pr.and_then(|n| n.attribute("descr")).map(str::to_string);

    let placeholder = non_visual
        .and_then(|nv| child(&nv, P_NAMESPACE, "nvPr"))
        .and_then(|nv_pr| child(&nv_pr, P_NAMESPACE, "ph"))
        .map(|ph| PlaceholderRef {
            ph_type: ph.attribute("type").unwrap_or("obj").to_string(),
            idx: ph.attribute("idx").and_then(|v| v.parse().ok()).unwrap_or(0),
            xml: node.document().input_text()[ph.range()].to_string(),
        });

    let embed = node
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "blip" && n.tag_name().namespace() == Some(A_NAMESPACE))
        .and_then(|blip| blip.attribute((RELS_NAMESPACE, "embed")))
        .map(str::to_string);

    let source = node.document().input_text();
    let sp_pr = child(node, P_NAMESPACE, "spPr");
    let outline = sp_pr.and_then(|n| child(&n, A_NAMESPACE, "ln"));

    ShapeInfo {
        tree_index,
        kind: classify(&tag, placeholder.as_ref()),
        tag,
        id,
        name,
        description,
        placeholder,
        geometry: parse_geometry(node),
        embed,
        sp_pr: sp_pr.map(|n| source[n.range()].to_string()),
        outline: outline.map(|n| source[n.range()].to_string()),
        range: node.range(),
    }
}

/// Reads the geometry written on a shape: `<p:spPr>/<a:xfrm>` for shapes and pictures,
/// `<p:grpSpPr>/<a:xfrm>` for groups and `<p:xfrm>` for graphic frames.
fn parse_geometry(node: &Node) -> Option<Geometry> {
    let xfrm = node.children().filter(|n| n.is_element()).find_map(|c| match c.tag_name().name() {
        "spPr" | "grpSpPr" => child(&c, A_NAMESPACE, "xfrm"),
        "xfrm" => Some(c),
        _ => None,
    })?;

    parse_xfrm(&xfrm)
}

/// Parses an `<a:xfrm>` (or `<p:xfrm>`) element into a [`Geometry`].
pub fn parse_xfrm(xfrm: &Node) -> Option<Geometry> {
    let off = xfrm.children().find(|n| n.is_element() && n.tag_name().name() == "off")?;
    let ext = xfrm.children().find(|n| n.is_element() && n.tag_name().name() == "ext")?;

    Some(Geometry {
        left: off.attribute("x")?.parse().ok()?,
        top: off.attribute("y")?.parse().ok()?,
        width: ext.attribute("cx")?.parse().ok()?,
        height: ext.attribute("cy")?.parse().ok()?,
        rotation: xfrm.attribute("rot").and_then(|v| v.parse().ok()).unwrap_or(0),
        flip_h: xfrm.attribute("flipH").map(parse_bool).unwrap_or(false),
        flip_v: xfrm.attribute("flipV").map(parse_bool).unwrap_or(false),
    })
}

/// Namespace declarations in scope at the root element, as `(prefix, uri)` pairs.
pub fn root_namespaces(xml: &str) -> Result<Vec<(Option<String>, String)>> {
    let doc = Document::parse(xml)?;
    Ok(doc
        .root_element()
        .namespaces()
        .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
        .collect())
}

/// Parses a slide into read-only elements: titles and other text with their run formatting,
/// and pictures with the geometry written on them.
///
/// Picture placeholders that inherit their position carry `geometry: None` here; the
/// container fills it in from the layout.
pub fn parse_slide_xml(xml_data: &[u8]) -> Result<Vec<SlideElement>> {
    let xml_str = std::str::from_utf8(xml_data)?;
    let doc = Document::parse(xml_str)?;
    let sp_tree = find_sp_tree(&doc)?;

    let mut elements = Vec::new();
    for node in sp_tree
        .children()
        .filter(|n| n.is_element() && !TREE_PROPERTIES.contains(&n.tag_name().name()))
    {
        let info = parse_shape(&node, 0);
        let element = match info.kind {
            ShapeKind::PicturePlaceholder | ShapeKind::FreePicture if info.tag == "pic" => {
                SlideElement::Picture(PictureElement {
                    placeholder: info.placeholder,
                    geometry: info.geometry,
                    description: info.description,
                    embed: info.embed,
                    media_part: None,
                })
            }
            ShapeKind::TitlePlaceholder => match child(&node, P_NAMESPACE, "txBody") {
                Some(tx_body) => SlideElement::Title(parse_text(&tx_body)?),
                None => SlideElement::Title(TextElement { runs: Vec::new() }),
            },
            _ => match child(&node, P_NAMESPACE, "txBody") {
                Some(tx_body) => SlideElement::Text(parse_text(&tx_body)?),
                None => SlideElement::Unknown,
            },
        };
        elements.push(element);
    }

    Ok(elements)
}

/// Parses the text body node (`<p:txBody>`) for all paragraph nodes (`<a:p>`) containing text runs
fn parse_text(tx_body_node: &Node) -> Result<TextElement> {
    let mut runs = Vec::new();

    for p_node in tx_body_node.children().filter(|n| {
        n.is_element()
            && n.tag_name().name() == "p"
            && n.tag_name().namespace() == Some(A_NAMESPACE)
    }) {
        let mut paragraph_runs = parse_paragraph(&p_node)?;
        runs.append(&mut paragraph_runs);
    }

    Ok(TextElement { runs })
}

fn parse_paragraph(p_node: &Node) -> Result<Vec<Run>> {
    p_node
        .children()
        .filter(|n| {
            n.is_element()
                && n.tag_name().name() == "r"
                && n.tag_name().namespace() == Some(A_NAMESPACE)
        })
        .map(|r_node| parse_run(&r_node))
        .collect()
}

/// Parses a single run properties node (`<a:rPr>`) and extracting the text content from the text node (`<a:t>`)
/// as well as the format including _bold_, _italic_, _underlined_, the _language_ and the font size
fn parse_run(r_node: &Node) -> Result<Run> {
    let mut text = String::new();
    let mut formatting = Formatting::default();

    if let Some(r_pr_node) = child(r_node, A_NAMESPACE, "rPr") {
        if let Some(b_attr) = r_pr_node.attribute("b") {
            formatting.bold = parse_bool(b_attr);
        }
        if let Some(i_attr) = r_pr_node.attribute("i") {
            formatting.italic = parse_bool(i_attr);
        }
        if let Some(u_attr) = r_pr_node.attribute("u") {
            formatting.underlined = u_attr != "none";
        }
        if let Some(lang_attr) = r_pr_node.attribute("lang") {
            formatting.lang = lang_attr.to_string();
        }
        formatting.size = r_pr_node.attribute("sz").and_then(|v| v.parse().ok());
    }

    if let Some(t) = child(r_node, A_NAMESPACE, "t").and_then(|t_node| t_node.text()) {
        text.push_str(t);
    }
    Ok(Run { text, formatting })
}

/// A slide entry of `<p:sldIdLst>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideRef {
    pub id: u32,
    pub rel_id: String,
}

#[derive(Debug, Clone)]
pub struct PresentationInfo {
    pub slides: Vec<SlideRef>,
    /// `(cx, cy)` of `<p:sldSz>`.
    pub slide_size: (i64, i64),
}

/// Reads the slide list and slide size of `ppt/presentation.xml`.
pub fn parse_presentation(xml: &str) -> Result<PresentationInfo> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();

    let slides = child(&root, P_NAMESPACE, "sldIdLst")
        .map(|list| {
            list.children()
                .filter(|n| n.is_element() && n.tag_name().name() == "sldId")
                .filter_map(|n| {
                    Some(SlideRef {
                        id: n.attribute("id")?.parse().ok()?,
                        rel_id: n.attribute((RELS_NAMESPACE, "id"))?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let slide_size = child(&root, P_NAMESPACE, "sldSz")
        .and_then(|sz| Some((sz.attribute("cx")?.parse().ok()?, sz.attribute("cy")?.parse().ok()?)))
        .unwrap_or((crate::constants::DEFAULT_SLIDE_WIDTH, crate::constants::DEFAULT_SLIDE_HEIGHT));

    Ok(PresentationInfo { slides, slide_size })
}

/// Appends a `<p:sldId>` pointing at `rel_id` to the slide list, creating the list if needed.
///
/// Returns the rewritten XML and the new slide id (at least 256, as the format requires).
pub fn add_slide_id(xml: &str, rel_id: &str) -> Result<(String, u32)> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    let p = prefix_for(&root, P_NAMESPACE, "p");
    let r = prefix_for(&root, RELS_NAMESPACE, "r");

    let list = child(&root, P_NAMESPACE, "sldIdLst");
    let next_id = list
        .iter()
        .flat_map(|l| l.children())
        .filter(|n| n.is_element() && n.tag_name().name() == "sldId")
        .filter_map(|n| n.attribute("id")?.parse::<u32>().ok())
        .max()
        .unwrap_or(255)
        .max(255)
        + 1;

    let entry = format!(r#"<{p}:sldId id="{next_id}" {r}:id="{rel_id}"/>"#);
    let updated = match list {
        Some(list) => crate::xml_util::append_child(xml, list.range(), &entry),
        None => {
            // The slide list follows the master lists in the schema sequence.
            let anchor = ["handoutMasterIdLst", "notesMasterIdLst", "sldMasterIdLst"]
                .iter()
                .find_map(|name| child(&root, P_NAMESPACE, name))
                .ok_or(Error::ParseError("presentation has no <p:sldMasterIdLst>"))?;
            let at = anchor.range().end;
            splice(xml, at..at, &format!("<{p}:sldIdLst>{entry}</{p}:sldIdLst>"))
        }
    };

    Ok((updated, next_id))
}

/// Removes every `<p:sldId>` whose relationship id is listed in `rel_ids`.
pub fn remove_slide_ids(xml: &str, rel_ids: &[String]) -> Result<String> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();

    let mut ranges: Vec<_> = child(&root, P_NAMESPACE, "sldIdLst")
        .iter()
        .flat_map(|l| l.children())
        .filter(|n| n.is_element() && n.tag_name().name() == "sldId")
        .filter(|n| {
            n.attribute((RELS_NAMESPACE, "id"))
                .is_some_and(|id| rel_ids.iter().any(|r| r == id))
        })
        .map(|n| n.range())
        .collect();

    // Back to front so earlier ranges stay valid.
    ranges.sort_by_key(|r| std::cmp::Reverse(r.start));
    let mut updated = xml.to_string();
    for range in ranges {
        updated = splice(&updated, range, "");
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:cSld><p:spTree>
<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
<p:grpSpPr/>
<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/>
<p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="en-US" b="1" sz="2800"/><a:t>Holiday</a:t></a:r></a:p></p:txBody></p:sp>
<p:sp><p:nvSpPr><p:cNvPr id="3" name="Picture Placeholder 2"/><p:cNvSpPr/><p:nvPr><p:ph type="pic" idx="13"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>
<p:pic><p:nvPicPr><p:cNvPr id="7" name="Picture 6" descr="cat.png"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr>
<p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>
<p:spPr><a:xfrm rot="5400000" flipH="1"><a:off x="100" y="200"/><a:ext cx="300" cy="400"/></a:xfrm></p:spPr></p:pic>
<p:sp><p:nvSpPr><p:cNvPr id="4" name="Body"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>
</p:spTree></p:cSld></p:sld>"#;

    #[test]
    fn test_parse_shape_tree_classifies_each_shape() {
        let tree = parse_shape_tree(SLIDE).unwrap();
        let kinds: Vec<_> = tree.shapes.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![ShapeKind::TitlePlaceholder, ShapeKind::PicturePlaceholder, ShapeKind::FreePicture, ShapeKind::Other]
        );
        assert_eq!(tree.max_id, 7);
        assert!(SLIDE[tree.insert_at..].starts_with("</p:spTree>"));

        let body = &tree.shapes[3];
        assert_eq!(body.placeholder.as_ref().unwrap().ph_type, "obj");
        assert_eq!(body.placeholder.as_ref().unwrap().idx, 1);
    }

    #[test]
    fn test_parse_shape_tree_reads_geometry_and_embed() {
        let tree = parse_shape_tree(SLIDE).unwrap();
        let pic = &tree.shapes[2];
        assert_eq!(pic.tree_index, 2);
        assert_eq!(pic.embed.as_deref(), Some("rId2"));
        assert_eq!(pic.description.as_deref(), Some("cat.png"));
        let geometry = pic.geometry.unwrap();
        assert_eq!(geometry.bounds(), (100, 200, 300, 400));
        assert_eq!(geometry.rotation, 5_400_000);
        assert!(geometry.flip_h);
        assert!(!geometry.flip_v);
        assert!(SLIDE[pic.range.clone()].starts_with("<p:pic>"));

        let ph = &tree.shapes[1];
        assert!(ph.geometry.is_none());
        assert_eq!(ph.placeholder.as_ref().unwrap().xml, r#"<p:ph type="pic" idx="13"/>"#);
    }

    #[test]
    fn test_classify_filled_picture_placeholder() {
        let ph = PlaceholderRef { ph_type: "pic".into(), idx: 1, xml: String::new() };
        assert_eq!(classify("pic", Some(&ph)), ShapeKind::PicturePlaceholder);
        let obj = PlaceholderRef { ph_type: "obj".into(), idx: 1, xml: String::new() };
        assert_eq!(classify("pic", Some(&obj)), ShapeKind::Other);
        assert_eq!(classify("pic", None), ShapeKind::FreePicture);
        assert_eq!(classify("graphicFrame", None), ShapeKind::Other);
    }

    #[test]
    fn test_parse_slide_xml_reads_title_formatting() {
        let elements = parse_slide_xml(SLIDE.as_bytes()).unwrap();
        match &elements[0] {
            SlideElement::Title(title) => {
                assert_eq!(title.text(), "Holiday");
                assert!(title.runs[0].formatting.bold);
                assert_eq!(title.runs[0].formatting.size, Some(2800));
            }
            other => panic!("expected a title, got {:?}", other),
        }
        assert!(matches!(elements[2], SlideElement::Picture(_)));
    }

    #[test]
    fn test_missing_sp_tree_is_an_error() {
        let xml = r#"<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld/></p:sld>"#;
        assert!(matches!(parse_shape_tree(xml), Err(Error::ParseError(_))));
    }

    const PRESENTATION: &str = r#"<p:presentation xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst><p:sldId id="256" r:id="rId2"/><p:sldId id="257" r:id="rId3"/></p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/></p:presentation>"#;

    #[test]
    fn test_parse_presentation() {
        let info = parse_presentation(PRESENTATION).unwrap();
        assert_eq!(info.slides.len(), 2);
        assert_eq!(info.slides[1], SlideRef { id: 257, rel_id: "rId3".into() });
        assert_eq!(info.slide_size, (12_192_000, 6_858_000));
    }

    #[test]
    fn test_add_and_remove_slide_ids() {
        let (xml, id) = add_slide_id(PRESENTATION, "rId9").unwrap();
        assert_eq!(id, 258);
        let info = parse_presentation(&xml).unwrap();
        assert_eq!(info.slides.last().unwrap().rel_id, "rId9");

        let xml = remove_slide_ids(&xml, &["rId2".to_string(), "rId3".to_string()]).unwrap();
        let info = parse_presentation(&xml).unwrap();
        assert_eq!(info.slides, vec![SlideRef { id: 258, rel_id: "rId9".into() }]);
    }

    #[test]
    fn test_add_slide_id_creates_missing_list() {
        let xml = r#"<p:presentation xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldSz cx="9144000" cy="6858000"/></p:presentation>"#;
        let (xml, id) = add_slide_id(xml, "rId5").unwrap();
        assert_eq!(id, 256);
        assert_eq!(parse_presentation(&xml).unwrap().slides.len(), 1);
    }
}
