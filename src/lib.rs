//! Builds PowerPoint slides from a template presentation and a ZIP archive of image folders.
//!
//! Every top-level folder of the archive becomes one slide: the folder name is the title and
//! the folder's images fill the picture slots of the template's first slide.
//!
//! ```no_run
//! use slide_sync::{RunConfig, SlideSync};
//!
//! # fn main() -> slide_sync::Result<()> {
//! let outcome = SlideSync::new(RunConfig::default())
//!     .run(&std::fs::read("template.pptx")?, &std::fs::read("photos.zip")?)?;
//! outcome.document.save(std::path::Path::new("template_Modified.pptx"))?;
//! # Ok(())
//! # }
//! ```

mod constants;
mod content_types;
mod parse_rels;
mod parse_xml;
mod xml_util;

pub mod archive;
pub mod container;
pub mod layout;
pub mod media;
pub mod pipeline;
pub mod policy;
pub mod report;
pub mod run_config;
pub mod slide;
pub mod synth;
pub mod template;
pub mod types;

pub use archive::{ArchiveExtractor, Extraction, Workspace};
pub use container::PptxContainer;
pub use content_types::ContentTypes;
pub use parse_xml::classify;
pub use pipeline::{default_output_path, Outcome, SlideSync};
pub use policy::{Mismatch, MismatchPolicy, MismatchResolver, UseConfigured};
pub use report::{EntryLevel, GroupOutcome, GroupStatus, Report, ReportEntry, SlotAssignment};
pub use run_config::{ImageOrdering, ReplaceMode, RunConfig, RunConfigBuilder, SlideSource};
pub use slide::{Slide, SlideDraft};
pub use synth::SlideSynthesizer;
pub use template::{SlotDescriptor, SlotTemplate, TemplateAnalyzer};
pub use types::*;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsupported image format")]
    UnsupportedImage,

    #[error("Archive cannot be read: {0}")]
    Archive(#[source] zip::result::ZipError),

    #[error("No valid folders with images found in the archive")]
    NoValidGroups,

    #[error("Template has no slides")]
    EmptyDocument,

    #[error("No usable slide layout for {0}")]
    LayoutUnavailable(String),

    #[error("Presentation cannot be written: {0}")]
    Serialization(#[source] zip::result::ZipError),

    #[error("Missing package part: {0}")]
    MissingPart(String),

    #[error("Parse error: {0}")]
    ParseError(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
