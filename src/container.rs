use super::{Error, Result, Slide};
use crate::constants::{
    CONTENT_TYPES_PART, DEFAULT_PRESENTATION_PART, LAYOUTS_DIR, MEDIA_DIR, NOTES_SLIDE_REL_TYPE,
    OFFICE_DOCUMENT_REL_TYPE, PACKAGE_RELS_PART, SLIDES_DIR, SLIDE_CONTENT_TYPE, SLIDE_LAYOUT_REL_TYPE,
    SLIDE_MASTER_REL_TYPE, SLIDE_REL_TYPE,
};
use crate::content_types::ContentTypes;
use crate::layout::LayoutInfo;
use crate::parse_rels::{self, find_by_type, missing_part, next_rel_id, rels_path_for, resolve_target};
use crate::parse_xml::{self, PresentationInfo};
use crate::types::Relationship;
use log::debug;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Holds the internal representation of a loaded PowerPoint (pptx) package.
///
/// All parts are read into memory when the container is opened and written back in their
/// original order by [`PptxContainer::save_to_bytes`]. Slide content is edited as text by the
/// callers; the container owns the package bookkeeping around it: relationships, content types,
/// the slide list of `presentation.xml` and part naming.
pub struct PptxContainer {
    part_order: Vec<String>,
    parts: HashMap<String, Vec<u8>>,
    content_types: ContentTypes,
    presentation_part: String,
}

impl PptxContainer {
    /// Opens a PowerPoint pptx file and loads all of its parts.
    ///
    /// # Errors
    ///
    /// Errors are returned on file access problems or failures during the unzipping process.
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Loads a package from an in-memory pptx file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(reader)?;

        let mut part_order = Vec::with_capacity(archive.len());
        let mut parts = HashMap::with_capacity(archive.len());
        let mut content_types = None;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            let mut content = Vec::new();
            file.read_to_end(&mut content)?;

            if name == CONTENT_TYPES_PART {
                content_types = Some(ContentTypes::parse(&content)?);
                continue;
            }
            part_order.push(name.clone());
            parts.insert(name, content);
        }

        let content_types = content_types.ok_or_else(|| missing_part(CONTENT_TYPES_PART))?;

        let mut container = Self {
            part_order,
            parts,
            content_types,
            presentation_part: DEFAULT_PRESENTATION_PART.to_string(),
        };

        let package_rels = container.rels_of_package()?;
        if let Some(rel) = find_by_type(&package_rels, OFFICE_DOCUMENT_REL_TYPE) {
            container.presentation_part = resolve_target("", &rel.target);
        }
        if !container.has_part(&container.presentation_part) {
            return Err(missing_part(&container.presentation_part));
        }

        debug!("loaded package with {} parts", container.part_order.len());
        Ok(container)
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    /// Reads a part of the package by its internal path.
    pub fn part(&self, name: &str) -> Result<&[u8]> {
        self.parts.get(name).map(Vec::as_slice).ok_or_else(|| missing_part(name))
    }

    pub fn part_str(&self, name: &str) -> Result<&str> {
        Ok(std::str::from_utf8(self.part(name)?)?)
    }

    /// Inserts or replaces a part. New parts are written after the existing ones.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        if self.parts.insert(name.to_string(), data).is_none() {
            self.part_order.push(name.to_string());
        }
    }

    pub fn remove_part(&mut self, name: &str) {
        if self.parts.remove(name).is_some() {
            self.part_order.retain(|p| p != name);
        }
        self.content_types.remove_override(name);
    }

    pub fn part_names(&self) -> &[String] {
        &self.part_order
    }

    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    /// Relationships of a part; a part without a `.rels` part has none.
    pub fn rels_of(&self, part_name: &str) -> Result<Vec<Relationship>> {
        match self.parts.get(&rels_path_for(part_name)) {
            Some(data) => parse_rels::parse_rels(data),
            None => Ok(Vec::new()),
        }
    }

    pub fn set_rels(&mut self, part_name: &str, rels: &[Relationship]) {
        self.set_part(&rels_path_for(part_name), parse_rels::write_rels(rels).into_bytes());
    }

    fn rels_of_package(&self) -> Result<Vec<Relationship>> {
        match self.parts.get(PACKAGE_RELS_PART) {
            Some(data) => parse_rels::parse_rels(data),
            None => Ok(Vec::new()),
        }
    }

    pub fn presentation_part(&self) -> &str {
        &self.presentation_part
    }

    pub fn presentation(&self) -> Result<PresentationInfo> {
        parse_xml::parse_presentation(self.part_str(&self.presentation_part)?)
    }

    /// Part names of all slides, in presentation order.
    pub fn slide_paths(&self) -> Result<Vec<String>> {
        let presentation = self.presentation()?;
        let rels = self.rels_of(&self.presentation_part)?;

        let mut paths = Vec::with_capacity(presentation.slides.len());
        for slide in &presentation.slides {
            let rel = rels
                .iter()
                .find(|r| r.id == slide.rel_id)
                .ok_or(Error::ParseError("slide id without relationship"))?;
            paths.push(resolve_target(&self.presentation_part, &rel.target));
        }
        Ok(paths)
    }

    pub fn slide_count(&self) -> Result<usize> {
        Ok(self.presentation()?.slides.len())
    }

    pub fn slide_size(&self) -> Result<(i64, i64)> {
        Ok(self.presentation()?.slide_size)
    }

    /// The layout part a slide is based on, if its relationship resolves to an existing part.
    pub fn layout_of(&self, slide_part: &str) -> Result<Option<String>> {
        let rels = self.rels_of(slide_part)?;
        Ok(find_by_type(&rels, SLIDE_LAYOUT_REL_TYPE)
            .map(|rel| resolve_target(slide_part, &rel.target))
            .filter(|part| self.has_part(part)))
    }

    /// All slide layout parts, ordered by their number.
    pub fn layout_parts(&self) -> Vec<String> {
        let mut layouts: Vec<String> = self
            .part_order
            .iter()
            .filter(|p| p.starts_with(LAYOUTS_DIR) && p.ends_with(".xml") && !p.contains("/_rels/"))
            .cloned()
            .collect();
        layouts.sort_by_key(|p| (part_number(p).unwrap_or(u32::MAX), p.clone()));
        layouts
    }

    /// Parses a layout and the master it belongs to.
    pub fn load_layout(&self, layout_part: &str) -> Result<LayoutInfo> {
        let layout_xml = self.part_str(layout_part)?;
        let rels = self.rels_of(layout_part)?;
        let master_xml = match find_by_type(&rels, SLIDE_MASTER_REL_TYPE) {
            Some(rel) => self.part_str(&resolve_target(layout_part, &rel.target)).ok(),
            None => None,
        };
        LayoutInfo::parse(layout_part, layout_xml, master_xml)
    }

    /// Adds a slide part with its relationships at the end of the slide list.
    ///
    /// Returns the new part name (`ppt/slides/slideN.xml`).
    pub fn add_slide(&mut self, xml: String, rels: &[Relationship]) -> Result<String> {
        let number = self.next_part_number(SLIDES_DIR, "slide");
        let part_name = format!("{}/slide{}.xml", SLIDES_DIR, number);

        let mut pres_rels = self.rels_of(&self.presentation_part)?;
        let rel_id = next_rel_id(&pres_rels);
        let (pres_xml, _) = parse_xml::add_slide_id(self.part_str(&self.presentation_part)?, &rel_id)?;

        pres_rels.push(Relationship {
            id: rel_id,
            rel_type: SLIDE_REL_TYPE.to_string(),
            target: parse_rels::relative_target(&self.presentation_part, &part_name),
            external: false,
        });

        let presentation_part = self.presentation_part.clone();
        self.set_part(&presentation_part, pres_xml.into_bytes());
        self.set_rels(&presentation_part, &pres_rels);
        self.set_part(&part_name, xml.into_bytes());
        self.set_rels(&part_name, rels);
        self.content_types.add_override(&part_name, SLIDE_CONTENT_TYPE);

        debug!("added {}", part_name);
        Ok(part_name)
    }

    /// Stores an image under `ppt/media/imageN.<extension>` and returns the part name.
    pub fn add_media(&mut self, data: Vec<u8>, extension: &str, content_type: &str) -> String {
        let number = self.next_part_number(MEDIA_DIR, "image");
        let part_name = format!("{}/image{}.{}", MEDIA_DIR, number, extension);
        self.content_types.ensure_default(extension, content_type);
        self.set_part(&part_name, data);
        part_name
    }

    /// Removes slides from the presentation together with their notes.
    pub fn remove_slides(&mut self, slide_parts: &[String]) -> Result<()> {
        if slide_parts.is_empty() {
            return Ok(());
        }

        let presentation_part = self.presentation_part.clone();
        let mut pres_rels = self.rels_of(&presentation_part)?;
        let removed_ids: Vec<String> = pres_rels
            .iter()
            .filter(|r| r.rel_type == SLIDE_REL_TYPE)
            .filter(|r| slide_parts.contains(&resolve_target(&presentation_part, &r.target)))
            .map(|r| r.id.clone())
            .collect();

        let pres_xml = parse_xml::remove_slide_ids(self.part_str(&presentation_part)?, &removed_ids)?;
        pres_rels.retain(|r| !removed_ids.contains(&r.id));
        self.set_part(&presentation_part, pres_xml.into_bytes());
        self.set_rels(&presentation_part, &pres_rels);

        for slide_part in slide_parts {
            for rel in self.rels_of(slide_part)? {
                if rel.rel_type == NOTES_SLIDE_REL_TYPE {
                    let notes_part = resolve_target(slide_part, &rel.target);
                    self.remove_part(&rels_path_for(&notes_part));
                    self.remove_part(&notes_part);
                }
            }
            self.remove_part(&rels_path_for(slide_part));
            self.remove_part(slide_part);
            debug!("removed {}", slide_part);
        }

        Ok(())
    }

    /// Parses all slides, in presentation order, into read-only views.
    pub fn parse_all(&self) -> Result<Vec<Slide>> {
        self.slide_paths()?
            .iter()
            .enumerate()
            .map(|(i, path)| self.load_slide(path, i as u32 + 1))
            .collect()
    }

    /// Loads a single slide view.
    ///
    /// Picture targets are resolved through the slide's relationships and placeholder pictures
    /// get the geometry they inherit from the layout.
    pub fn load_slide(&self, slide_path: &str, slide_number: u32) -> Result<Slide> {
        let elements = parse_xml::parse_slide_xml(self.part(slide_path)?)?;
        let rels = self.rels_of(slide_path)?;
        let layout = match self.layout_of(slide_path)? {
            Some(part) => Some(self.load_layout(&part)?),
            None => None,
        };

        let mut slide = Slide::new(slide_path.to_string(), slide_number, elements);
        slide.link_images(&rels);
        if let Some(layout) = &layout {
            slide.inherit_geometry(layout);
        }
        Ok(slide)
    }

    /// Serializes the package into a new pptx file in memory.
    ///
    /// # Errors
    ///
    /// Any fault of the zip writer yields [`Error::Serialization`]; no partial output is returned.
    pub fn save_to_bytes(&self) -> Result<Vec<u8>> {
        self.write_zip().map_err(Error::Serialization)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.save_to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn write_zip(&self) -> zip::result::ZipResult<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        writer.start_file(CONTENT_TYPES_PART, options)?;
        writer.write_all(self.content_types.to_xml().as_bytes())?;

        for name in &self.part_order {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(&self.parts[name])?;
        }

        Ok(writer.finish()?.into_inner())
    }

    fn next_part_number(&self, dir: &str, stem: &str) -> u32 {
        let prefix = format!("{}/{}", dir, stem);
        self.part_order
            .iter()
            .filter(|p| p.starts_with(&prefix) && !p[prefix.len()..].contains('/'))
            .filter_map(|p| part_number(p))
            .max()
            .unwrap_or(0)
            + 1
    }
}

/// Number embedded in a part file name: `ppt/slides/slide12.xml` gives 12.
fn part_number(part_name: &str) -> Option<u32> {
    let file = part_name.rsplit('/').next()?;
    let stem = file.split('.').next()?;
    let digits: String = stem.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    digits.chars().rev().collect::<String>().parse().ok()
}
