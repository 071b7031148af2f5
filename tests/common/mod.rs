#![allow(dead_code)]

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const GROUP_PROPERTIES: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#;

const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT_BASE: &str = "application/vnd.openxmlformats-officedocument.presentationml";

pub const SLIDE_WIDTH: i64 = 9_144_000;
pub const SLIDE_HEIGHT: i64 = 6_858_000;

pub type Bounds = (i64, i64, i64, i64);

fn xfrm(bounds: Bounds) -> String {
    let (x, y, cx, cy) = bounds;
    format!(r#"<a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#)
}

pub fn title_placeholder(id: u32, text: Option<&str>) -> String {
    let body = match text {
        Some(text) => format!(r#"<p:txBody><a:bodyPr anchor="b"/><a:lstStyle/><a:p><a:r><a:rPr lang="de-DE"/><a:t>{text}</a:t></a:r></a:p></p:txBody>"#),
        None => r#"<p:txBody><a:bodyPr anchor="b"/><a:lstStyle/><a:p/></p:txBody>"#.to_string(),
    };
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Title {n}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/>{body}</p:sp>"#,
        n = id - 1
    )
}

/// An empty picture placeholder; without bounds it inherits its position from the layout.
pub fn picture_placeholder(id: u32, idx: u32, bounds: Option<Bounds>) -> String {
    let sp_pr = match bounds {
        Some(bounds) => format!("<p:spPr>{}</p:spPr>", xfrm(bounds)),
        None => "<p:spPr/>".to_string(),
    };
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Picture Placeholder {n}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="pic" idx="{idx}"/></p:nvPr></p:nvSpPr>{sp_pr}</p:sp>"#,
        n = id - 1
    )
}

/// A picture placeholder that already shows an image, placed at `bounds`.
pub fn filled_picture_placeholder(id: u32, idx: u32, rel_id: &str, bounds: Bounds) -> String {
    format!(
        concat!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture Placeholder {n}" descr="template.png"/><p:cNvPicPr><a:picLocks noGrp="1"/></p:cNvPicPr>"#,
            r#"<p:nvPr><p:ph type="pic" idx="{idx}"/></p:nvPr></p:nvPicPr>"#,
            r#"<p:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
            r#"<p:spPr>{xfrm}</p:spPr></p:pic>"#
        ),
        id = id,
        n = id - 1,
        idx = idx,
        rel_id = rel_id,
        xfrm = xfrm(bounds)
    )
}

pub fn free_picture(id: u32, rel_id: &str, bounds: Bounds, extra_sp_pr: &str) -> String {
    format!(
        concat!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {n}" descr="template.png"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr>"#,
            r#"<p:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
            r#"<p:spPr>{xfrm}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>{extra}</p:spPr></p:pic>"#
        ),
        id = id,
        n = id - 1,
        rel_id = rel_id,
        xfrm = xfrm(bounds),
        extra = extra_sp_pr
    )
}

pub fn text_shape(id: u32, text: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="TextBox {n}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{xfrm}</p:spPr><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US"/><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>"#,
        n = id - 1,
        xfrm = xfrm((0, 6_000_000, 9_144_000, 400_000))
    )
}

/// Assembles a minimal template package: one master, one layout and up to a few slides that all
/// share the same shapes.
pub struct TemplateBuilder {
    layout_type: String,
    layout_shapes: Vec<String>,
    slide_shapes: Vec<String>,
    slide_count: usize,
    link_layout: bool,
    template_image: bool,
    notes: bool,
    slide_namespaces: String,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self {
            layout_type: "picTx".into(),
            layout_shapes: Vec::new(),
            slide_shapes: Vec::new(),
            slide_count: 1,
            link_layout: true,
            template_image: false,
            notes: false,
            slide_namespaces: NS.to_string(),
        }
    }

    pub fn layout_type(mut self, layout_type: &str) -> Self {
        self.layout_type = layout_type.into();
        self
    }

    pub fn layout_shape(mut self, shape: String) -> Self {
        self.layout_shapes.push(shape);
        self
    }

    pub fn slide_shape(mut self, shape: String) -> Self {
        self.slide_shapes.push(shape);
        self
    }

    pub fn slide_count(mut self, count: usize) -> Self {
        self.slide_count = count;
        self
    }

    /// Leaves the slide without a relationship to its layout.
    pub fn unlinked_layout(mut self) -> Self {
        self.link_layout = false;
        self
    }

    /// Adds `ppt/media/image1.png` referenced as `rId2` from every slide.
    pub fn template_image(mut self) -> Self {
        self.template_image = true;
        self
    }

    /// Namespace declarations of the slide root elements, `NS` by default.
    pub fn slide_namespaces(mut self, declarations: &str) -> Self {
        self.slide_namespaces = declarations.into();
        self
    }

    /// Gives every slide a notes part.
    pub fn notes(mut self) -> Self {
        self.notes = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut parts: Vec<(String, Vec<u8>)> = Vec::new();
        let mut overrides = vec![
            ("ppt/presentation.xml".to_string(), format!("{}.presentation.main+xml", CT_BASE)),
            ("ppt/slideMasters/slideMaster1.xml".to_string(), format!("{}.slideMaster+xml", CT_BASE)),
            ("ppt/slideLayouts/slideLayout1.xml".to_string(), format!("{}.slideLayout+xml", CT_BASE)),
        ];

        parts.push((
            "_rels/.rels".into(),
            rels(&[("rId1", "officeDocument", "ppt/presentation.xml")]).into_bytes(),
        ));

        let mut pres_rels = vec![("rId1".to_string(), "slideMaster".to_string(), "slideMasters/slideMaster1.xml".to_string())];
        let mut slide_ids = String::new();
        for n in 1..=self.slide_count {
            let rel_id = format!("rId{}", n + 1);
            slide_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="{}"/>"#, 255 + n, rel_id));
            pres_rels.push((rel_id, "slide".into(), format!("slides/slide{}.xml", n)));
        }
        let slide_list = if slide_ids.is_empty() { String::new() } else { format!("<p:sldIdLst>{}</p:sldIdLst>", slide_ids) };
        parts.push((
            "ppt/presentation.xml".into(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>{slide_list}<p:sldSz cx="{SLIDE_WIDTH}" cy="{SLIDE_HEIGHT}"/><p:notesSz cx="{SLIDE_HEIGHT}" cy="{SLIDE_WIDTH}"/></p:presentation>"#
            )
            .into_bytes(),
        ));
        let pres_rels_ref: Vec<(&str, &str, &str)> = pres_rels.iter().map(|(a, b, c)| (a.as_str(), b.as_str(), c.as_str())).collect();
        parts.push(("ppt/_rels/presentation.xml.rels".into(), rels(&pres_rels_ref).into_bytes()));

        parts.push(("ppt/slideMasters/slideMaster1.xml".into(), master_xml().into_bytes()));
        parts.push((
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
            rels(&[("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")]).into_bytes(),
        ));

        parts.push((
            "ppt/slideLayouts/slideLayout1.xml".into(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldLayout {NS} type="{}" preserve="1"><p:cSld name="Layout"><p:spTree>{GROUP_PROPERTIES}{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
                self.layout_type,
                self.layout_shapes.concat()
            )
            .into_bytes(),
        ));
        parts.push((
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(),
            rels(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]).into_bytes(),
        ));

        if self.template_image {
            parts.push(("ppt/media/image1.png".into(), png(4, 3, [10, 10, 10])));
        }

        for n in 1..=self.slide_count {
            parts.push((
                format!("ppt/slides/slide{}.xml", n),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {}><p:cSld><p:spTree>{GROUP_PROPERTIES}{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
                    self.slide_namespaces,
                    self.slide_shapes.concat()
                )
                .into_bytes(),
            ));
            overrides.push((format!("ppt/slides/slide{}.xml", n), format!("{}.slide+xml", CT_BASE)));

            let mut slide_rels = Vec::new();
            if self.link_layout {
                slide_rels.push(("rId1".to_string(), "slideLayout".to_string(), "../slideLayouts/slideLayout1.xml".to_string()));
            }
            if self.template_image {
                slide_rels.push(("rId2".into(), "image".into(), "../media/image1.png".into()));
            }
            if self.notes {
                slide_rels.push(("rId3".into(), "notesSlide".into(), format!("../notesSlides/notesSlide{}.xml", n)));
                parts.push((
                    format!("ppt/notesSlides/notesSlide{}.xml", n),
                    format!(r#"<p:notes {NS}><p:cSld><p:spTree>{GROUP_PROPERTIES}</p:spTree></p:cSld></p:notes>"#).into_bytes(),
                ));
                parts.push((
                    format!("ppt/notesSlides/_rels/notesSlide{}.xml.rels", n),
                    rels(&[("rId1", "slide", &format!("../slides/slide{}.xml", n))]).into_bytes(),
                ));
                overrides.push((format!("ppt/notesSlides/notesSlide{}.xml", n), format!("{}.notesSlide+xml", CT_BASE)));
            }
            let slide_rels_ref: Vec<(&str, &str, &str)> = slide_rels.iter().map(|(a, b, c)| (a.as_str(), b.as_str(), c.as_str())).collect();
            parts.push((format!("ppt/slides/_rels/slide{}.xml.rels", n), rels(&slide_rels_ref).into_bytes()));
        }

        let mut content_types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/>"#,
        );
        for (part, content_type) in &overrides {
            content_types.push_str(&format!(r#"<Override PartName="/{}" ContentType="{}"/>"#, part, content_type));
        }
        content_types.push_str("</Types>");

        let mut entries = vec![("[Content_Types].xml".to_string(), content_types.into_bytes())];
        entries.extend(parts);
        zip_bytes(&entries)
    }
}

fn master_xml() -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldMaster {ns}><p:cSld><p:spTree>{group}"#,
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title Placeholder 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr>{title}</p:spPr></p:sp>"#,
            r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Text Placeholder 2"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr>{body}</p:spPr></p:sp>"#,
            r#"</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#,
            r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
        ),
        ns = NS,
        group = GROUP_PROPERTIES,
        title = xfrm(MASTER_TITLE),
        body = xfrm(MASTER_BODY),
    )
}

pub const MASTER_TITLE: Bounds = (457_200, 274_638, 8_229_600, 1_143_000);
pub const MASTER_BODY: Bounds = (457_200, 1_600_200, 8_229_600, 4_525_963);

fn rels(entries: &[(&str, &str, &str)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (id, kind, target) in entries {
        xml.push_str(&format!(r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#, id, REL_BASE, kind, target));
    }
    xml.push_str("</Relationships>");
    xml
}

pub fn zip_bytes(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(name.as_str(), SimpleFileOptions::default()).unwrap();
        } else {
            writer.start_file(name.as_str(), SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

pub fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode(width, height, color, ImageOutputFormat::Png)
}

pub fn encode(width: u32, height: u32, color: [u8; 3], format: ImageOutputFormat) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
    let mut data = Vec::new();
    image.write_to(&mut Cursor::new(&mut data), format).unwrap();
    data
}

/// 1x1 lossless WebP.
pub const WEBP: [u8; 34] = [
    0x52, 0x49, 0x46, 0x46, 0x1a, 0x00, 0x00, 0x00, 0x57, 0x45, 0x42, 0x50, 0x56, 0x50, 0x38, 0x4c, 0x0d, 0x00,
    0x00, 0x00, 0x2f, 0x00, 0x00, 0x00, 0x10, 0x07, 0x10, 0x11, 0x11, 0x88, 0x88, 0xfe, 0x07, 0x00,
];

/// Archive with one directory per group, each holding small PNGs with the given names.
pub fn image_archive(groups: &[(&str, &[&str])]) -> Vec<u8> {
    let mut entries = Vec::new();
    for (g, (group, images)) in groups.iter().enumerate() {
        entries.push((format!("{}/", group), Vec::new()));
        for (i, image) in images.iter().enumerate() {
            let shade = (40 * g + 20 * i) as u8;
            entries.push((format!("{}/{}", group, image), png(16, 12, [shade, 100, 200])));
        }
    }
    zip_bytes(&entries)
}

/// Scenario template: a title and two picture placeholders at (0,0,200,150) and (200,0,200,150)
/// that the slide inherits from its layout.
pub fn two_slot_template() -> Vec<u8> {
    TemplateBuilder::new()
        .layout_shape(title_placeholder(2, None))
        .layout_shape(picture_placeholder(3, 1, Some((0, 0, 200, 150))))
        .layout_shape(picture_placeholder(4, 2, Some((200, 0, 200, 150))))
        .slide_shape(title_placeholder(2, Some("Template")))
        // document order deliberately differs from the visual order
        .slide_shape(picture_placeholder(4, 2, None))
        .slide_shape(picture_placeholder(3, 1, None))
        .build()
}
