use std::ops::Range;
use std::path::PathBuf;

/// Position and size of a shape in EMU, plus the rotation and flips of its `<a:xfrm>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
    /// Rotation in 60000ths of a degree.
    pub rotation: i32,
    pub flip_h: bool,
    pub flip_v: bool,
}

impl Geometry {
    pub fn new(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self { left, top, width, height, ..Self::default() }
    }

    /// `(left, top, width, height)`, the part of the geometry slot matching compares.
    pub fn bounds(&self) -> (i64, i64, i64, i64) {
        (self.left, self.top, self.width, self.height)
    }
}

/// What a shape on a slide means for image placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    PicturePlaceholder,
    FreePicture,
    TitlePlaceholder,
    Other,
}

impl ShapeKind {
    pub fn is_image_slot(self) -> bool {
        matches!(self, ShapeKind::PicturePlaceholder | ShapeKind::FreePicture)
    }
}

/// The `<p:ph>` reference of a placeholder shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderRef {
    /// `type` attribute, `obj` when absent.
    pub ph_type: String,
    /// `idx` attribute, `0` when absent.
    pub idx: u32,
    /// Source text of the `<p:ph>` element, copied verbatim onto new shapes.
    pub xml: String,
}

/// One direct child of a `<p:spTree>`, classified once.
#[derive(Debug, Clone)]
pub struct ShapeInfo {
    /// Position among the element children of the shape tree.
    pub tree_index: usize,
    /// Local tag name: `sp`, `pic`, `grpSp`, `graphicFrame`, `cxnSp`, ...
    pub tag: String,
    pub kind: ShapeKind,
    pub id: u32,
    pub name: String,
    pub description: Option<String>,
    pub placeholder: Option<PlaceholderRef>,
    /// Geometry written on the shape itself; placeholders often inherit it instead.
    pub geometry: Option<Geometry>,
    /// `r:embed` of the shape's `<a:blip>`, if any.
    pub embed: Option<String>,
    /// Source text of the shape's `<p:spPr>`.
    pub sp_pr: Option<String>,
    /// Source text of the `<a:ln>` outline inside `<p:spPr>`.
    pub outline: Option<String>,
    /// Byte range of the element in the source XML.
    pub range: Range<usize>,
}

/// A parsed `<p:spTree>`.
#[derive(Debug, Clone, Default)]
pub struct ShapeTree {
    pub shapes: Vec<ShapeInfo>,
    /// Byte offset of the `</p:spTree>` closing tag; new shapes are inserted here.
    pub insert_at: usize,
    /// Highest `cNvPr` id in use, including the group shape of the tree itself.
    pub max_id: u32,
}

/// A single entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// One archive directory and its qualifying images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageGroup {
    /// Directory name, used as the slide title.
    pub name: String,
    pub image_paths: Vec<PathBuf>,
}

impl ImageGroup {
    pub fn image_count(&self) -> usize {
        self.image_paths.len()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.image_paths
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }
}

#[derive(Debug)]
pub enum SlideElement {
    Title(TextElement),
    Text(TextElement),
    Picture(PictureElement),
    Unknown,
}

#[derive(Debug)]
pub struct TextElement {
    pub runs: Vec<Run>,
}

impl TextElement {
    pub fn text(&self) -> String {
        self.runs.iter().map(Run::extract).collect()
    }
}

#[derive(Debug)]
pub struct PictureElement {
    pub placeholder: Option<PlaceholderRef>,
    /// Effective geometry, inherited from the layout when the shape has none.
    pub geometry: Option<Geometry>,
    pub description: Option<String>,
    pub embed: Option<String>,
    /// Package part of the embedded image, e.g. `ppt/media/image3.png`.
    pub media_part: Option<String>,
}

#[derive(Debug, Default)]
pub struct Formatting {
    pub bold: bool,
    pub italic: bool,
    pub underlined: bool,
    pub lang: String,
    /// Font size in hundredths of a point.
    pub size: Option<u32>,
}

#[derive(Debug)]
pub struct Run {
    pub text: String,
    pub formatting: Formatting,
}

impl Run {
    pub fn extract(&self) -> String {
        self.text.to_string()
    }
}
