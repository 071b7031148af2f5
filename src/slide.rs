use crate::constants::{A_NAMESPACE, IMAGE_NAMESPACE, P_NAMESPACE, RELS_NAMESPACE, SLIDES_DIR};
use crate::layout::LayoutInfo;
use crate::media::SrcRect;
use crate::parse_rels::{next_rel_id, relative_target, resolve_target};
use crate::parse_xml::parse_shape_tree;
use crate::types::{Geometry, PictureElement, PlaceholderRef, Relationship, ShapeInfo, ShapeTree, SlideElement};
use crate::xml_util::{append_child, child, escape_xml, qualified_name, splice};
use crate::{Error, Result};
use roxmltree::Document;
use std::collections::HashMap;

/// A read-only view of one slide of a package.
#[derive(Debug)]
pub struct Slide {
    pub rel_path: String,
    pub slide_number: u32,
    pub elements: Vec<SlideElement>,
}

impl Slide {
    pub fn new(rel_path: String, slide_number: u32, elements: Vec<SlideElement>) -> Self {
        Self { rel_path, slide_number, elements }
    }

    /// Text of the title placeholder, or of the first text shape when the slide has none.
    pub fn title(&self) -> Option<String> {
        self.elements
            .iter()
            .find_map(|e| match e {
                SlideElement::Title(text) => Some(text.text()),
                _ => None,
            })
            .or_else(|| {
                self.elements.iter().find_map(|e| match e {
                    SlideElement::Text(text) => Some(text.text()),
                    _ => None,
                })
            })
    }

    pub fn pictures(&self) -> impl Iterator<Item = &PictureElement> {
        self.elements.iter().filter_map(|e| match e {
            SlideElement::Picture(picture) => Some(picture),
            _ => None,
        })
    }

    /// Resolves the `r:embed` of every picture to the media part it points at.
    pub fn link_images(&mut self, rels: &[Relationship]) {
        let id_to_target: HashMap<&str, String> = rels
            .iter()
            .filter(|r| r.rel_type == IMAGE_NAMESPACE && !r.external)
            .map(|r| (r.id.as_str(), resolve_target(&self.rel_path, &r.target)))
            .collect();

        for element in &mut self.elements {
            if let SlideElement::Picture(ref mut picture) = element {
                if let Some(target) = picture.embed.as_deref().and_then(|id| id_to_target.get(id)) {
                    picture.media_part = Some(target.clone());
                }
            }
        }
    }

    /// Fills in the geometry placeholder pictures inherit from their layout.
    pub fn inherit_geometry(&mut self, layout: &LayoutInfo) {
        for element in &mut self.elements {
            if let SlideElement::Picture(ref mut picture) = element {
                if picture.geometry.is_none() {
                    picture.geometry = picture.placeholder.as_ref().and_then(|ph| layout.inherited_geometry(ph));
                }
            }
        }
    }
}

/// A slide under construction: its XML text and relationships, not yet part of the package.
///
/// Shapes are addressed by their position in the shape tree. Every replacement swaps exactly one
/// element for one element in a single splice, so positions stay stable while a slide is filled
/// and the old and new content of a slot never coexist.
#[derive(Debug, Clone)]
pub struct SlideDraft {
    xml: String,
    rels: Vec<Relationship>,
}

impl SlideDraft {
    /// Wraps slide XML, declaring the `a`, `p` and `r` prefixes on the root when they are missing,
    /// since every shape this crate writes uses them.
    pub fn new(xml: String, rels: Vec<Relationship>) -> Result<Self> {
        let xml = ensure_standard_prefixes(&xml)?;
        parse_shape_tree(&xml)?;
        Ok(Self { xml, rels })
    }

    pub fn xml(&self) -> &str {
        &self.xml
    }

    pub fn rels(&self) -> &[Relationship] {
        &self.rels
    }

    pub fn into_parts(self) -> (String, Vec<Relationship>) {
        (self.xml, self.rels)
    }

    pub fn shapes(&self) -> Result<ShapeTree> {
        parse_shape_tree(&self.xml)
    }

    pub fn next_shape_id(&self) -> Result<u32> {
        Ok(self.shapes()?.max_id + 1)
    }

    /// Relationship id for an image part, reusing an existing relationship to the same part.
    pub fn image_rel(&mut self, media_part: &str) -> String {
        let target = relative_target(&format!("{}/slide.xml", SLIDES_DIR), media_part);
        if let Some(rel) = self
            .rels
            .iter()
            .find(|r| r.rel_type == IMAGE_NAMESPACE && r.target == target && !r.external)
        {
            return rel.id.clone();
        }

        let id = next_rel_id(&self.rels);
        self.rels.push(Relationship {
            id: id.clone(),
            rel_type: IMAGE_NAMESPACE.to_string(),
            target,
            external: false,
        });
        id
    }

    /// Replaces the shape at `tree_index` with `new_xml` in one splice.
    pub fn replace_shape_at(&mut self, tree_index: usize, new_xml: &str) -> Result<()> {
        let tree = self.shapes()?;
        let shape = tree
            .shapes
            .get(tree_index)
            .ok_or(Error::ParseError("no shape at this position"))?;
        let updated = splice(&self.xml, shape.range.clone(), new_xml);
        Document::parse(&updated)?;
        self.xml = updated;
        Ok(())
    }

    /// Appends a shape at the end of the shape tree, i.e. on top of all others.
    pub fn append_shape(&mut self, new_xml: &str) -> Result<()> {
        let tree = self.shapes()?;
        let updated = splice(&self.xml, tree.insert_at..tree.insert_at, new_xml);
        Document::parse(&updated)?;
        self.xml = updated;
        Ok(())
    }

    /// Removes the shape at `tree_index`. Later shapes move up by one position.
    pub fn remove_shape_at(&mut self, tree_index: usize) -> Result<()> {
        self.replace_shape_at(tree_index, "")
    }

    /// Replaces the text of the shape at `tree_index` with a single run, keeping its
    /// `<a:bodyPr>` and `<a:lstStyle>`.
    pub fn set_text(&mut self, tree_index: usize, text: &str) -> Result<()> {
        let tree = self.shapes()?;
        let shape = tree
            .shapes
            .get(tree_index)
            .ok_or(Error::ParseError("no shape at this position"))?;
        if shape.tag != "sp" {
            return Err(Error::ParseError("only <p:sp> shapes carry text"));
        }

        let updated = {
            let doc = Document::parse(&self.xml)?;
            let node = doc
                .root_element()
                .descendants()
                .find(|n| n.is_element() && n.range() == shape.range)
                .ok_or(Error::ParseError("shape vanished from the tree"))?;
            self.text_replaced(&node, text)
        };

        Document::parse(&updated)?;
        self.xml = updated;
        Ok(())
    }

    fn text_replaced(&self, node: &roxmltree::Node, text: &str) -> String {
        match child(node, P_NAMESPACE, "txBody") {
            Some(tx_body) => {
                let keep = |name: &str| child(&tx_body, A_NAMESPACE, name).map(|n| self.xml[n.range()].to_string());
                let body = text_body_xml(
                    keep("bodyPr").as_deref().unwrap_or("<a:bodyPr/>"),
                    keep("lstStyle").as_deref().unwrap_or("<a:lstStyle/>"),
                    &run_xml(text, None, false),
                );
                let name = qualified_name(&self.xml, &tx_body.range());
                let body = body.replacen("<p:txBody>", &format!("<{}>", name), 1);
                let body = replace_last(&body, "</p:txBody>", &format!("</{}>", name));
                splice(&self.xml, tx_body.range(), &body)
            }
            None => append_child(
                &self.xml,
                node.range(),
                &text_body_xml("<a:bodyPr/>", "<a:lstStyle/>", &run_xml(text, None, false)),
            ),
        }
    }
}

fn replace_last(haystack: &str, from: &str, to: &str) -> String {
    match haystack.rfind(from) {
        Some(at) => format!("{}{}{}", &haystack[..at], to, &haystack[at + from.len()..]),
        None => haystack.to_string(),
    }
}

/// Declares `xmlns:a`, `xmlns:p` and `xmlns:r` on the root element when they are not bound.
fn ensure_standard_prefixes(xml: &str) -> Result<String> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();

    let mut declarations = String::new();
    for (prefix, uri) in [("a", A_NAMESPACE), ("p", P_NAMESPACE), ("r", RELS_NAMESPACE)] {
        match root.lookup_namespace_uri(Some(prefix)) {
            Some(bound) if bound == uri => {}
            Some(_) => return Err(Error::ParseError("standard prefix bound to a foreign namespace")),
            None => declarations.push_str(&format!(r#" xmlns:{}="{}""#, prefix, uri)),
        }
    }

    if declarations.is_empty() {
        return Ok(xml.to_string());
    }
    let range = root.range();
    let at = range.start + 1 + qualified_name(xml, &range).len();
    Ok(splice(xml, at..at, &declarations))
}

/// Builds a complete slide part around the given shapes.
///
/// `namespaces` are extra declarations copied from the template slide so cloned shapes keep
/// their extension prefixes.
pub fn new_slide_xml(namespaces: &[(Option<String>, String)], shapes: &str) -> String {
    let mut declarations = format!(
        r#" xmlns:a="{}" xmlns:r="{}" xmlns:p="{}""#,
        A_NAMESPACE, RELS_NAMESPACE, P_NAMESPACE
    );
    for (prefix, uri) in namespaces {
        match prefix.as_deref() {
            None | Some("a" | "r" | "p" | "xml") => {}
            Some(prefix) => declarations.push_str(&format!(r#" xmlns:{}="{}""#, prefix, escape_xml(uri))),
        }
    }

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n<p:sld{}><p:cSld><p:spTree>",
            r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
            r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
            "{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"
        ),
        declarations, shapes
    )
}

/// An empty placeholder shape referring to a layout placeholder.
///
/// `sp_pr` is the source text of a `<p:spPr>` to keep; without it the shape takes its
/// position from the layout.
pub fn placeholder_sp_xml(id: u32, name: &str, ph: &PlaceholderRef, sp_pr: Option<&str>) -> String {
    let mut ph_xml = String::from("<p:ph");
    if ph.ph_type != "obj" {
        ph_xml.push_str(&format!(r#" type="{}""#, escape_xml(&ph.ph_type)));
    }
    if ph.idx != 0 {
        ph_xml.push_str(&format!(r#" idx="{}""#, ph.idx));
    }
    ph_xml.push_str("/>");

    let text_body = match ph.ph_type.as_str() {
        "title" | "ctrTitle" | "subTitle" | "body" | "obj" => "<p:txBody><a:bodyPr/><a:lstStyle/><a:p/></p:txBody>",
        _ => "",
    };

    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr>{}</p:nvPr></p:nvSpPr>{}{}</p:sp>"#,
        id,
        escape_xml(name),
        ph_xml,
        sp_pr.unwrap_or("<p:spPr/>"),
        text_body
    )
}

/// A filled picture placeholder built from an existing placeholder shape of the same slide.
///
/// The `<p:ph>` element, id, name and `<p:spPr>` are carried over, so position and formatting
/// keep coming from the placeholder and its layout.
pub fn placeholder_picture_xml(shape: &ShapeInfo, rel_id: &str, description: &str, crop: Option<SrcRect>) -> Result<String> {
    let ph = shape
        .placeholder
        .as_ref()
        .ok_or(Error::ParseError("shape is not a placeholder"))?;
    if shape.tag != "sp" && shape.tag != "pic" {
        return Err(Error::ParseError("placeholder cannot hold a picture"));
    }

    let src_rect = crop.map(|c| c.to_xml()).unwrap_or_default();
    Ok(format!(
        concat!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{}" name="{}" descr="{}"/>"#,
            r#"<p:cNvPicPr><a:picLocks noGrp="1" noChangeAspect="1"/></p:cNvPicPr><p:nvPr>{}</p:nvPr></p:nvPicPr>"#,
            r#"<p:blipFill><a:blip r:embed="{}"/>{}<a:stretch><a:fillRect/></a:stretch></p:blipFill>{}</p:pic>"#
        ),
        shape.id,
        escape_xml(&shape.name),
        escape_xml(description),
        ph.xml,
        rel_id,
        src_rect,
        shape.sp_pr.as_deref().unwrap_or("<p:spPr/>"),
    ))
}

/// A free-standing picture at an explicit geometry, with an optional `<a:ln>` outline.
pub fn free_picture_xml(
    id: u32,
    name: &str,
    description: &str,
    rel_id: &str,
    geometry: &Geometry,
    outline: Option<&str>,
) -> String {
    format!(
        concat!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{}" name="{}" descr="{}"/>"#,
            r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#,
            r#"<p:blipFill><a:blip r:embed="{}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
            r#"<p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>{}</p:spPr></p:pic>"#
        ),
        id,
        escape_xml(name),
        escape_xml(description),
        rel_id,
        xfrm_xml(geometry),
        outline.unwrap_or_default(),
    )
}

/// A text box holding one run.
pub fn text_box_xml(id: u32, text: &str, geometry: &Geometry, size: Option<u32>, bold: bool) -> String {
    format!(
        concat!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="TextBox {}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#,
            r#"<p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>{}</p:sp>"#
        ),
        id,
        id.saturating_sub(1),
        xfrm_xml(geometry),
        text_body_xml(
            r#"<a:bodyPr wrap="square" rtlCol="0"><a:spAutoFit/></a:bodyPr>"#,
            "<a:lstStyle/>",
            &run_xml(text, size, bold)
        ),
    )
}

fn xfrm_xml(geometry: &Geometry) -> String {
    let mut attrs = String::new();
    if geometry.rotation != 0 {
        attrs.push_str(&format!(r#" rot="{}""#, geometry.rotation));
    }
    if geometry.flip_h {
        attrs.push_str(r#" flipH="1""#);
    }
    if geometry.flip_v {
        attrs.push_str(r#" flipV="1""#);
    }
    format!(
        r#"<a:xfrm{}><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        attrs, geometry.left, geometry.top, geometry.width, geometry.height
    )
}

fn text_body_xml(body_pr: &str, lst_style: &str, paragraph_content: &str) -> String {
    format!("<p:txBody>{}{}<a:p>{}</a:p></p:txBody>", body_pr, lst_style, paragraph_content)
}

fn run_xml(text: &str, size: Option<u32>, bold: bool) -> String {
    let mut r_pr = String::from(r#"<a:rPr lang="en-US""#);
    if let Some(size) = size {
        r_pr.push_str(&format!(r#" sz="{}""#, size));
    }
    if bold {
        r_pr.push_str(r#" b="1""#);
    }
    r_pr.push_str(r#" dirty="0"/>"#);
    format!("<a:r>{}<a:t>{}</a:t></a:r>", r_pr, escape_xml(text))
}
