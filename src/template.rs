use crate::container::PptxContainer;
use crate::layout::LayoutInfo;
use crate::parse_xml::parse_shape_tree;
use crate::types::{Geometry, Relationship, ShapeInfo, ShapeKind, ShapeTree};
use crate::{Error, Result};
use log::{debug, info, warn};

/// An image slot of the template slide.
#[derive(Debug, Clone)]
pub struct SlotDescriptor {
    pub kind: ShapeKind,
    /// Resolved through layout and master inheritance; `None` when nothing declares a position.
    pub geometry: Option<Geometry>,
    pub shape: ShapeInfo,
}

/// Everything new slides take from the template's first slide.
#[derive(Debug, Clone)]
pub struct SlotTemplate {
    pub slide_part: String,
    pub slide_xml: String,
    pub slide_rels: Vec<Relationship>,
    /// The slide's layout, `None` when its relationship is missing or broken.
    pub layout: Option<LayoutInfo>,
    pub tree: ShapeTree,
    /// Slots in `(top, left)` order.
    pub slots: Vec<SlotDescriptor>,
    pub title: Option<ShapeInfo>,
}

impl SlotTemplate {
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_slot_less(&self) -> bool {
        self.slots.is_empty()
    }

    /// Free-standing pictures of the template slide in document order.
    pub fn free_pictures(&self) -> impl Iterator<Item = &ShapeInfo> {
        self.tree.shapes.iter().filter(|s| s.kind == ShapeKind::FreePicture)
    }

    /// Source text of a template shape.
    pub fn shape_xml(&self, shape: &ShapeInfo) -> &str {
        &self.slide_xml[shape.range.clone()]
    }
}

/// Reads the image slots off the first slide of a template package.
pub struct TemplateAnalyzer;

impl TemplateAnalyzer {
    /// # Errors
    ///
    /// [`Error::EmptyDocument`] when the package has no slides; parsing errors of the first slide
    /// are propagated.
    pub fn analyze(container: &PptxContainer) -> Result<SlotTemplate> {
        let slide_part = container
            .slide_paths()?
            .into_iter()
            .next()
            .ok_or(Error::EmptyDocument)?;

        let slide_xml = container.part_str(&slide_part)?.to_string();
        let slide_rels = container.rels_of(&slide_part)?;
        let tree = parse_shape_tree(&slide_xml)?;

        let layout = match container.layout_of(&slide_part)? {
            Some(layout_part) => match container.load_layout(&layout_part) {
                Ok(layout) => Some(layout),
                Err(e) => {
                    warn!("Layout {} of the template slide is unreadable: {}", layout_part, e);
                    None
                }
            },
            None => None,
        };

        let slots = order_slots(
            tree.shapes
                .iter()
                .filter(|s| s.kind.is_image_slot())
                .map(|shape| SlotDescriptor {
                    kind: shape.kind,
                    geometry: match &layout {
                        Some(layout) => layout.effective_geometry(shape),
                        None => shape.geometry,
                    },
                    shape: shape.clone(),
                })
                .collect(),
        );

        let title = tree
            .shapes
            .iter()
            .find(|s| s.kind == ShapeKind::TitlePlaceholder)
            .cloned();

        for slot in &slots {
            debug!("slot {} ({:?}) at {:?}", slot.shape.name, slot.kind, slot.geometry.map(|g| g.bounds()));
        }
        info!(
            "Template slide {} has {} image slots{}",
            slide_part,
            slots.len(),
            if title.is_some() { " and a title placeholder" } else { "" }
        );

        Ok(SlotTemplate {
            slide_part,
            slide_xml,
            slide_rels,
            layout,
            tree,
            slots,
            title,
        })
    }
}

/// Orders slots by `(top, left)`. Slots without a position go last, keeping document order.
pub fn order_slots(mut slots: Vec<SlotDescriptor>) -> Vec<SlotDescriptor> {
    slots.sort_by_key(|slot| match slot.geometry {
        Some(g) => (0, g.top, g.left),
        None => (1, 0, 0),
    });
    slots
}
