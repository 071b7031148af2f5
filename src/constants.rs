//! Namespaces, relationship types, content types and fixed geometry used
//! throughout the package model.

pub const P_NAMESPACE: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
pub const A_NAMESPACE: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const RELS_NAMESPACE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const PKG_RELS_NAMESPACE: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const CONTENT_TYPES_NAMESPACE: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

pub const IMAGE_NAMESPACE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const SLIDE_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
pub const SLIDE_LAYOUT_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
pub const SLIDE_MASTER_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
pub const NOTES_SLIDE_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
pub const OFFICE_DOCUMENT_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

pub const SLIDE_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const PACKAGE_RELS_PART: &str = "_rels/.rels";
pub const DEFAULT_PRESENTATION_PART: &str = "ppt/presentation.xml";

pub const SLIDES_DIR: &str = "ppt/slides";
pub const MEDIA_DIR: &str = "ppt/media";
pub const LAYOUTS_DIR: &str = "ppt/slideLayouts";

/// English Metric Units per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// 10in x 7.5in, used when `p:sldSz` is absent.
pub const DEFAULT_SLIDE_WIDTH: i64 = 9_144_000;
pub const DEFAULT_SLIDE_HEIGHT: i64 = 6_858_000;

/// Fallback title text box: 0.5in, 0.2in, 9in x 0.6in.
pub const TITLE_BOX: (i64, i64, i64, i64) = (
    EMU_PER_INCH / 2,
    EMU_PER_INCH / 5,
    9 * EMU_PER_INCH,
    EMU_PER_INCH * 6 / 10,
);
/// Fallback title font size in hundredths of a point.
pub const TITLE_FONT_SIZE: u32 = 2800;

/// Origin and height of the single image placed on slides without slots.
/// The width spans the slide between margins equal to `FALLBACK_IMAGE_LEFT`.
pub const FALLBACK_IMAGE_LEFT: i64 = EMU_PER_INCH;
pub const FALLBACK_IMAGE_TOP: i64 = EMU_PER_INCH * 3 / 2;
pub const FALLBACK_IMAGE_HEIGHT: i64 = EMU_PER_INCH * 9 / 2;

/// File name suffixes accepted as images inside the archive.
pub const IMAGE_EXTENSIONS: [&str; 7] = [".png", ".jpg", ".jpeg", ".gif", ".bmp", ".tiff", ".webp"];

/// Layout placeholders that are not copied onto new slides.
pub const SKIPPED_PLACEHOLDER_TYPES: [&str; 3] = ["dt", "ftr", "sldNum"];
