use crate::constants::{
    FALLBACK_IMAGE_HEIGHT, FALLBACK_IMAGE_LEFT, FALLBACK_IMAGE_TOP, NOTES_SLIDE_REL_TYPE, SLIDES_DIR,
    SLIDE_LAYOUT_REL_TYPE, TITLE_BOX, TITLE_FONT_SIZE,
};
use crate::container::PptxContainer;
use crate::layout::LayoutInfo;
use crate::media::{crop_to_fill, load_image};
use crate::parse_rels::{next_rel_id, relative_target, resolve_target};
use crate::parse_xml::root_namespaces;
use crate::policy::{select_image, MismatchPolicy};
use crate::report::{Report, SlotAssignment};
use crate::run_config::SlideSource;
use crate::slide::{
    free_picture_xml, new_slide_xml, placeholder_picture_xml, placeholder_sp_xml, text_box_xml, SlideDraft,
};
use crate::template::SlotTemplate;
use crate::types::{Geometry, Relationship, ShapeInfo, ShapeKind};
use crate::{Error, Result};
use log::{debug, info};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const COMMENTS_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";

/// Ways of putting an image into a slot, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Turn the placeholder into a filled picture placeholder.
    InsertIntoPlaceholder,
    /// Replace the shape with a free picture at the slot's geometry.
    RecreateAsPicture,
}

pub fn strategy_for(kind: ShapeKind) -> &'static [Strategy] {
    match kind {
        ShapeKind::PicturePlaceholder => &[Strategy::InsertIntoPlaceholder, Strategy::RecreateAsPicture],
        ShapeKind::FreePicture => &[Strategy::RecreateAsPicture],
        ShapeKind::TitlePlaceholder | ShapeKind::Other => &[],
    }
}

/// A slot of a slide under construction.
#[derive(Debug, Clone)]
struct DraftSlot {
    shape: ShapeInfo,
    geometry: Option<Geometry>,
}

/// An image already stored in the package.
#[derive(Debug, Clone)]
struct StoredMedia {
    part: String,
    size: (u32, u32),
}

/// The slide a synthesized slide is built on.
struct SlideBase {
    layout_part: String,
    layout: LayoutInfo,
    /// Substitute layout without the template's placeholders.
    bare: bool,
}

/// A slide that made it into the package.
#[derive(Debug, Clone)]
pub struct SynthesizedSlide {
    pub slide_part: String,
    pub assignments: Vec<SlotAssignment>,
}

/// Builds one slide per image group from a [`SlotTemplate`].
pub struct SlideSynthesizer<'t> {
    template: &'t SlotTemplate,
    source: SlideSource,
    base: SlideBase,
    slide_width: i64,
    media: HashMap<PathBuf, StoredMedia>,
}

impl<'t> SlideSynthesizer<'t> {
    /// Resolves the layout new slides are based on.
    ///
    /// A template slide without a usable layout falls back to a blank layout, else to the first
    /// layout without its placeholders, and records the degradation in `report`.
    ///
    /// # Errors
    ///
    /// [`Error::LayoutUnavailable`] only when the package has no readable slide layout at all.
    pub fn new(
        container: &PptxContainer,
        template: &'t SlotTemplate,
        source: SlideSource,
        report: &mut Report,
    ) -> Result<Self> {
        let base = match &template.layout {
            Some(layout) => SlideBase {
                layout_part: layout.part_name.clone(),
                layout: layout.clone(),
                bare: false,
            },
            None => {
                report.warning(Error::LayoutUnavailable(template.slide_part.clone()).to_string());
                report.layout_fallback = true;
                fallback_base(container, &template.slide_part)?
            }
        };
        debug!("new slides use {}{}", base.layout_part, if base.bare { " (bare)" } else { "" });

        Ok(Self {
            template,
            source,
            base,
            slide_width: container.slide_size()?.0,
            media: HashMap::new(),
        })
    }

    /// Builds the slide for one group and appends it to the package.
    ///
    /// `images` are the group's images in fill order. Images that cannot be read or placed are
    /// skipped with a warning. Any other failure abandons the group: the slide is not added and
    /// media stored for it are removed again.
    pub fn synthesize(
        &mut self,
        container: &mut PptxContainer,
        title: &str,
        images: &[PathBuf],
        policy: MismatchPolicy,
        report: &mut Report,
    ) -> Result<SynthesizedSlide> {
        let mut stored = Vec::new();
        let result = self.build(container, title, images, policy, report, &mut stored);
        if result.is_err() {
            for path in stored {
                if let Some(media) = self.media.remove(&path) {
                    container.remove_part(&media.part);
                }
            }
        }
        result
    }

    fn build(
        &mut self,
        container: &mut PptxContainer,
        title: &str,
        images: &[PathBuf],
        policy: MismatchPolicy,
        report: &mut Report,
        stored: &mut Vec<PathBuf>,
    ) -> Result<SynthesizedSlide> {
        let mut draft = self.new_draft()?;
        self.set_title(&mut draft, title, report)?;

        let slots = self.slots_of(&draft)?;
        let mut assignments = Vec::with_capacity(slots.len());

        if slots.is_empty() {
            let placed = self.place_fallback(container, &mut draft, images, report, stored)?;
            assignments.push(SlotAssignment { slot: 0, shape_name: String::new(), image: placed });
        } else {
            let mut unfilled = Vec::new();
            for (index, slot) in slots.iter().enumerate() {
                let placed = match select_image(policy, index, images.len()) {
                    Some(image) => self.fill_slot(container, &mut draft, slot, &images[image], report, stored),
                    None => None,
                };
                if placed.is_none() {
                    unfilled.push(slot);
                }
                assignments.push(SlotAssignment {
                    slot: index,
                    shape_name: slot.shape.name.clone(),
                    image: placed,
                });
            }
            clear_unfilled(&mut draft, unfilled)?;
        }

        let (xml, rels) = draft.into_parts();
        let slide_part = container.add_slide(xml, &rels)?;
        info!("Created {} for {}", slide_part, title);
        Ok(SynthesizedSlide { slide_part, assignments })
    }

    fn new_draft(&self) -> Result<SlideDraft> {
        let rels = self.slide_rels();
        match self.source {
            SlideSource::CloneTemplate => SlideDraft::new(self.template.slide_xml.clone(), rels),
            SlideSource::Layout => {
                let namespaces = root_namespaces(&self.template.slide_xml)?;
                let mut next_id = self.template.tree.max_id + 1;
                let mut shapes = String::new();
                if !self.base.bare {
                    for layout_shape in self.base.layout.cloneable_placeholders() {
                        if let Some(ph) = &layout_shape.placeholder {
                            shapes.push_str(&placeholder_sp_xml(next_id, &layout_shape.name, ph, None));
                            next_id += 1;
                        }
                    }
                }
                for picture in self.template.free_pictures() {
                    shapes.push_str(self.template.shape_xml(picture));
                }
                SlideDraft::new(new_slide_xml(&namespaces, &shapes), rels)
            }
        }
    }

    /// The template slide's relationships rebased onto a new slide part, minus notes and
    /// comments, with the layout relationship pointing at the resolved layout.
    fn slide_rels(&self) -> Vec<Relationship> {
        let new_part = format!("{}/slide.xml", SLIDES_DIR);
        let mut rels: Vec<Relationship> = self
            .template
            .slide_rels
            .iter()
            .filter(|r| r.rel_type != NOTES_SLIDE_REL_TYPE && r.rel_type != COMMENTS_REL_TYPE)
            .map(|r| rebase(r, &self.template.slide_part, &new_part))
            .collect();

        let layout_target = relative_target(&new_part, &self.base.layout_part);
        match rels.iter_mut().find(|r| r.rel_type == SLIDE_LAYOUT_REL_TYPE) {
            Some(rel) => {
                rel.target = layout_target;
                rel.external = false;
            }
            None => {
                let id = next_rel_id(&rels);
                rels.push(Relationship {
                    id,
                    rel_type: SLIDE_LAYOUT_REL_TYPE.to_string(),
                    target: layout_target,
                    external: false,
                });
            }
        }
        rels
    }

    fn set_title(&self, draft: &mut SlideDraft, title: &str, report: &mut Report) -> Result<()> {
        let tree = draft.shapes()?;
        let placeholder = tree.shapes.iter().find(|s| s.kind == ShapeKind::TitlePlaceholder && s.tag == "sp");

        if let Some(shape) = placeholder {
            match draft.set_text(shape.tree_index, title) {
                Ok(()) => return Ok(()),
                Err(e) => report.warning(format!("Could not set title for slide {}: {}", title, e)),
            }
        }

        let (left, top, width, height) = TITLE_BOX;
        let id = draft.next_shape_id()?;
        draft.append_shape(&text_box_xml(
            id,
            title,
            &Geometry::new(left, top, width, height),
            Some(TITLE_FONT_SIZE),
            true,
        ))
    }

    /// Image slots of the draft in `(top, left)` order, positionless ones last.
    fn slots_of(&self, draft: &SlideDraft) -> Result<Vec<DraftSlot>> {
        let mut slots: Vec<DraftSlot> = draft
            .shapes()?
            .shapes
            .into_iter()
            .filter(|s| s.kind.is_image_slot())
            .map(|shape| DraftSlot {
                geometry: self.base.layout.effective_geometry(&shape),
                shape,
            })
            .collect();
        slots.sort_by_key(|slot| match slot.geometry {
            Some(g) => (0, g.top, g.left),
            None => (1, 0, 0),
        });
        Ok(slots)
    }

    /// Puts one image into a slot. Returns the image's file name when it was placed.
    fn fill_slot(
        &mut self,
        container: &mut PptxContainer,
        draft: &mut SlideDraft,
        slot: &DraftSlot,
        image: &Path,
        report: &mut Report,
        stored: &mut Vec<PathBuf>,
    ) -> Option<String> {
        let file_name = file_name(image);
        let media = match self.media_for(container, image, stored) {
            Ok(media) => media,
            Err(e) => {
                report.warning(format!("Skipping image {}: {}", file_name, e));
                return None;
            }
        };
        let rel_id = draft.image_rel(&media.part);

        for strategy in strategy_for(slot.shape.kind) {
            let result = match strategy {
                Strategy::InsertIntoPlaceholder => {
                    let crop = slot.geometry.and_then(|g| crop_to_fill(media.size, (g.width, g.height)));
                    placeholder_picture_xml(&slot.shape, &rel_id, &file_name, crop)
                        .and_then(|xml| draft.replace_shape_at(slot.shape.tree_index, &xml))
                }
                Strategy::RecreateAsPicture => match slot.geometry {
                    Some(geometry) => draft.replace_shape_at(
                        slot.shape.tree_index,
                        &free_picture_xml(
                            slot.shape.id,
                            &slot.shape.name,
                            &file_name,
                            &rel_id,
                            &geometry,
                            slot.shape.outline.as_deref(),
                        ),
                    ),
                    None => Err(Error::ParseError("slot has no position")),
                },
            };

            match result {
                Ok(()) => {
                    debug!("{} -> {} ({:?})", file_name, slot.shape.name, strategy);
                    return Some(file_name);
                }
                Err(e) => report.warning(format!("{:?} failed for {} in {}: {}", strategy, file_name, slot.shape.name, e)),
            }
        }

        report.warning(format!("Could not place {} in {}", file_name, slot.shape.name));
        None
    }

    /// Places the first readable image of the group on a slide without slots.
    fn place_fallback(
        &mut self,
        container: &mut PptxContainer,
        draft: &mut SlideDraft,
        images: &[PathBuf],
        report: &mut Report,
        stored: &mut Vec<PathBuf>,
    ) -> Result<Option<String>> {
        let geometry = Geometry::new(
            FALLBACK_IMAGE_LEFT,
            FALLBACK_IMAGE_TOP,
            self.slide_width - 2 * FALLBACK_IMAGE_LEFT,
            FALLBACK_IMAGE_HEIGHT,
        );

        for image in images {
            let file_name = file_name(image);
            let media = match self.media_for(container, image, stored) {
                Ok(media) => media,
                Err(e) => {
                    report.warning(format!("Skipping image {}: {}", file_name, e));
                    continue;
                }
            };
            let rel_id = draft.image_rel(&media.part);
            let id = draft.next_shape_id()?;
            let name = format!("Picture {}", id - 1);
            draft.append_shape(&free_picture_xml(id, &name, &file_name, &rel_id, &geometry, None))?;
            return Ok(Some(file_name));
        }

        report.warning("No readable image for a slide without image slots".to_string());
        Ok(None)
    }

    /// Stores an image once per run and returns its part.
    fn media_for(&mut self, container: &mut PptxContainer, path: &Path, stored: &mut Vec<PathBuf>) -> Result<StoredMedia> {
        if let Some(media) = self.media.get(path) {
            return Ok(media.clone());
        }

        let prepared = load_image(path)?;
        if prepared.transcoded {
            debug!("{} transcoded to {}", path.display(), prepared.extension);
        }
        let size = (prepared.width, prepared.height);
        let part = container.add_media(prepared.data, prepared.extension, prepared.content_type);
        let media = StoredMedia { part, size };

        self.media.insert(path.to_path_buf(), media.clone());
        stored.push(path.to_path_buf());
        Ok(media)
    }
}

fn fallback_base(container: &PptxContainer, slide_part: &str) -> Result<SlideBase> {
    let layouts: Vec<LayoutInfo> = container
        .layout_parts()
        .iter()
        .filter_map(|part| container.load_layout(part).ok())
        .collect();

    if let Some(blank) = layouts.iter().find(|l| l.is_blank()) {
        return Ok(SlideBase {
            layout_part: blank.part_name.clone(),
            layout: blank.clone(),
            bare: false,
        });
    }

    layouts
        .into_iter()
        .next()
        .map(|layout| SlideBase {
            layout_part: layout.part_name.clone(),
            layout,
            bare: true,
        })
        .ok_or_else(|| Error::LayoutUnavailable(slide_part.to_string()))
}

/// Leaves no template image behind in slots that got nothing.
///
/// Filled picture placeholders revert to empty placeholders that keep their own `<p:spPr>`.
/// Free pictures are removed, back to front so earlier positions stay valid.
fn clear_unfilled(draft: &mut SlideDraft, unfilled: Vec<&DraftSlot>) -> Result<()> {
    let mut unfilled: Vec<&DraftSlot> = unfilled.into_iter().filter(|s| s.shape.embed.is_some()).collect();
    unfilled.sort_by_key(|s| std::cmp::Reverse(s.shape.tree_index));

    for slot in unfilled {
        match (&slot.shape.kind, &slot.shape.placeholder) {
            (ShapeKind::PicturePlaceholder, Some(ph)) => {
                let empty = placeholder_sp_xml(slot.shape.id, &slot.shape.name, ph, slot.shape.sp_pr.as_deref());
                draft.replace_shape_at(slot.shape.tree_index, &empty)?
            }
            _ => draft.remove_shape_at(slot.shape.tree_index)?,
        }
    }
    Ok(())
}

fn rebase(rel: &Relationship, from_part: &str, to_part: &str) -> Relationship {
    if rel.external {
        return rel.clone();
    }
    Relationship {
        target: relative_target(to_part, &resolve_target(from_part, &rel.target)),
        ..rel.clone()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_table() {
        assert_eq!(
            strategy_for(ShapeKind::PicturePlaceholder),
            &[Strategy::InsertIntoPlaceholder, Strategy::RecreateAsPicture]
        );
        assert_eq!(strategy_for(ShapeKind::FreePicture), &[Strategy::RecreateAsPicture]);
        assert!(strategy_for(ShapeKind::TitlePlaceholder).is_empty());
        assert!(strategy_for(ShapeKind::Other).is_empty());
    }

    #[test]
    fn test_rebase_keeps_the_same_part() {
        let rel = Relationship {
            id: "rId2".into(),
            rel_type: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image".into(),
            target: "../../media/image1.png".into(),
            external: false,
        };
        let rebased = rebase(&rel, "ppt/slides/deck/slide1.xml", "ppt/slides/slide.xml");
        assert_eq!(rebased.target, "../media/image1.png");
        assert_eq!(rebased.id, "rId2");

        let link = Relationship { external: true, target: "https://example.com".into(), ..rel };
        assert_eq!(rebase(&link, "ppt/slides/deck/slide1.xml", "ppt/slides/slide.xml").target, "https://example.com");
    }
}
