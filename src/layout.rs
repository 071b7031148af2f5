use crate::constants::{P_NAMESPACE, SKIPPED_PLACEHOLDER_TYPES};
use crate::parse_xml::parse_shape_tree;
use crate::types::{Geometry, PlaceholderRef, ShapeInfo, ShapeTree};
use crate::Result;
use roxmltree::Document;

/// A slide layout together with the shape tree of its master, used to resolve the geometry that
/// placeholders inherit and to seed new slides with the layout's placeholders.
#[derive(Debug, Clone)]
pub struct LayoutInfo {
    pub part_name: String,
    /// `type` attribute of `<p:sldLayout>` (`blank`, `title`, `picTx`, ...).
    pub layout_type: Option<String>,
    pub tree: ShapeTree,
    pub master_tree: Option<ShapeTree>,
}

impl LayoutInfo {
    pub fn parse(part_name: &str, layout_xml: &str, master_xml: Option<&str>) -> Result<Self> {
        let doc = Document::parse(layout_xml)?;
        let root = doc.root_element();
        let layout_type = (root.tag_name().namespace() == Some(P_NAMESPACE))
            .then(|| root.attribute("type"))
            .flatten()
            .map(str::to_string);

        let master_tree = master_xml.map(parse_shape_tree).transpose()?;

        Ok(Self {
            part_name: part_name.to_string(),
            layout_type,
            tree: parse_shape_tree(layout_xml)?,
            master_tree,
        })
    }

    pub fn is_blank(&self) -> bool {
        self.layout_type.as_deref() == Some("blank")
    }

    /// Geometry a placeholder inherits: the layout placeholder with the same `idx` first,
    /// then the master placeholder of the corresponding type.
    pub fn inherited_geometry(&self, ph: &PlaceholderRef) -> Option<Geometry> {
        let layout_ph = self
            .tree
            .shapes
            .iter()
            .find(|s| s.placeholder.as_ref().is_some_and(|p| p.idx == ph.idx));

        if let Some(geometry) = layout_ph.and_then(|s| s.geometry) {
            return Some(geometry);
        }

        let ph_type = layout_ph
            .and_then(|s| s.placeholder.as_ref())
            .map_or(ph.ph_type.as_str(), |p| p.ph_type.as_str());
        let wanted = master_type(ph_type);

        self.master_tree
            .as_ref()?
            .shapes
            .iter()
            .find(|s| s.placeholder.as_ref().is_some_and(|p| master_type(&p.ph_type) == wanted))
            .and_then(|s| s.geometry)
    }

    /// Geometry written on the shape, else what it inherits through this layout.
    pub fn effective_geometry(&self, shape: &ShapeInfo) -> Option<Geometry> {
        shape
            .geometry
            .or_else(|| shape.placeholder.as_ref().and_then(|ph| self.inherited_geometry(ph)))
    }

    /// Layout placeholders copied onto a new slide; date, footer and slide number stay on the layout.
    pub fn cloneable_placeholders(&self) -> impl Iterator<Item = &ShapeInfo> {
        self.tree.shapes.iter().filter(|s| {
            s.placeholder
                .as_ref()
                .is_some_and(|p| !SKIPPED_PLACEHOLDER_TYPES.contains(&p.ph_type.as_str()))
        })
    }
}

/// Master placeholders only come as title, body and the footer family.
fn master_type(ph_type: &str) -> &str {
    match ph_type {
        "title" | "ctrTitle" => "title",
        "dt" | "ftr" | "sldNum" | "hdr" => ph_type,
        _ => "body",
    }
}
