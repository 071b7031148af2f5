use crate::archive::{ArchiveExtractor, Workspace};
use crate::container::PptxContainer;
use crate::policy::{decide, find_mismatches, GroupDecision, MismatchResolver, SkipReason, UseConfigured};
use crate::report::{GroupOutcome, GroupStatus, Report};
use crate::run_config::{ImageOrdering, ReplaceMode, RunConfig};
use crate::synth::SlideSynthesizer;
use crate::template::TemplateAnalyzer;
use crate::types::ImageGroup;
use crate::Result;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

/// The finished document of a run together with its report.
pub struct Outcome {
    pub document: PptxContainer,
    pub report: Report,
}

impl Outcome {
    /// Serializes the document.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.document.save_to_bytes()
    }
}

/// Turns a template presentation and an archive of image folders into one slide per folder.
///
/// # Example
///
/// ```no_run
/// use slide_sync::{MismatchPolicy, RunConfig, SlideSync};
///
/// # fn main() -> slide_sync::Result<()> {
/// let template = std::fs::read("template.pptx")?;
/// let archive = std::fs::read("photos.zip")?;
///
/// let config = RunConfig::builder().mismatch_policy(MismatchPolicy::Repeat).build();
/// let outcome = SlideSync::new(config).run(&template, &archive)?;
/// std::fs::write("template_Modified.pptx", outcome.to_bytes()?)?;
/// println!("{}", outcome.report.summary());
/// # Ok(())
/// # }
/// ```
pub struct SlideSync {
    config: RunConfig,
}

impl SlideSync {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs with the configured mismatch policy.
    pub fn run(&self, template: &[u8], archive: &[u8]) -> Result<Outcome> {
        self.run_with_resolver(template, archive, &mut UseConfigured)
    }

    /// Runs, asking `resolver` for the policy once if any group mismatches the slot count.
    ///
    /// # Errors
    ///
    /// Fails on an unreadable archive or template, an archive without image folders, a template
    /// without slides, or a package without any slide layout. Problems with single images or
    /// groups are recorded in the report instead.
    pub fn run_with_resolver(
        &self,
        template: &[u8],
        archive: &[u8],
        resolver: &mut dyn MismatchResolver,
    ) -> Result<Outcome> {
        let mut report = Report::default();

        // Dropping the workspace removes everything extracted, on every path out of this function.
        let workspace = Workspace::create(self.config.temp_root.as_deref())?;
        let extraction = ArchiveExtractor::new(&workspace).extract(archive)?;
        for dir in &extraction.empty_dirs {
            report.warning(format!("Folder {} has no images and will be skipped", dir));
        }
        report.empty_dirs = extraction.empty_dirs.clone();
        report.groups_total = extraction.groups.len();

        let mut document = PptxContainer::from_bytes(template)?;
        let template = TemplateAnalyzer::analyze(&document)?;
        let original_slides = document.slide_paths()?;
        let slot_count = template.slot_count();
        report.info(format!(
            "Template has {} image slots, {} folders with images",
            slot_count,
            extraction.groups.len()
        ));

        let mismatches = find_mismatches(&extraction.groups, slot_count);
        let policy = if mismatches.is_empty() {
            self.config.mismatch_policy
        } else {
            for mismatch in &mismatches {
                report.info(format!("Mismatch in {}", mismatch));
            }
            let policy = resolver.resolve(&mismatches, self.config.mismatch_policy);
            report.info(format!("Applying mismatch policy {}", policy));
            report.policy_applied = Some(policy);
            policy
        };

        let mut synthesizer = SlideSynthesizer::new(&document, &template, self.config.slide_source, &mut report)?;
        let mut rng = make_rng(self.config.ordering);

        for group in &extraction.groups {
            let images = ordered_images(group, rng.as_mut());
            report.info(format!("Processing folder {} ({} images)", group.name, images.len()));

            let status = match decide(policy, images.len(), slot_count) {
                GroupDecision::Skip(SkipReason::NoImages) => {
                    report.warning(format!("Folder {} has no images and will be skipped", group.name));
                    GroupStatus::Skipped(SkipReason::NoImages)
                }
                GroupDecision::Skip(SkipReason::Mismatch) => {
                    report.info(format!(
                        "Skipping folder {} due to mismatch (images {} vs slots {})",
                        group.name,
                        images.len(),
                        slot_count
                    ));
                    GroupStatus::Skipped(SkipReason::Mismatch)
                }
                GroupDecision::Abort => {
                    report.error(format!(
                        "Stopping at folder {}: {} images for {} slots",
                        group.name,
                        images.len(),
                        slot_count
                    ));
                    report.record(GroupOutcome {
                        group: group.name.clone(),
                        image_count: images.len(),
                        status: GroupStatus::Aborted,
                        assignments: Vec::new(),
                    });
                    break;
                }
                GroupDecision::Fill => {
                    match synthesizer.synthesize(&mut document, &group.name, &images, policy, &mut report) {
                        Ok(slide) => {
                            report.record(GroupOutcome {
                                group: group.name.clone(),
                                image_count: images.len(),
                                status: GroupStatus::Created { slide_part: slide.slide_part },
                                assignments: slide.assignments,
                            });
                            continue;
                        }
                        Err(e) => {
                            report.error(format!("Folder {} failed: {}", group.name, e));
                            GroupStatus::Failed(e.to_string())
                        }
                    }
                }
            };

            report.record(GroupOutcome {
                group: group.name.clone(),
                image_count: images.len(),
                status,
                assignments: Vec::new(),
            });
        }

        if self.config.replace_mode == ReplaceMode::ReplaceAll {
            document.remove_slides(&original_slides)?;
            report.info(format!("Removed {} original slides", original_slides.len()));
        }

        let summary = report.summary();
        report.info(summary);
        Ok(Outcome { document, report })
    }

    /// Reads both inputs from disk, runs, and writes the result to `output`.
    pub fn run_files(
        &self,
        template: &Path,
        archive: &Path,
        output: &Path,
        resolver: &mut dyn MismatchResolver,
    ) -> Result<Report> {
        let template_bytes = std::fs::read(template)?;
        let archive_bytes = std::fs::read(archive)?;
        let outcome = self.run_with_resolver(&template_bytes, &archive_bytes, resolver)?;
        if outcome.report.slides_created == 0 {
            warn!("No slides were created, {} is not written", output.display());
            return Ok(outcome.report);
        }
        outcome.document.save(output)?;
        debug!("wrote {}", output.display());
        Ok(outcome.report)
    }
}

/// `<stem>_Modified.pptx` next to the template.
pub fn default_output_path(template: &Path) -> PathBuf {
    let stem = template
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "presentation".to_string());
    template.with_file_name(format!("{}_Modified.pptx", stem))
}

fn make_rng(ordering: ImageOrdering) -> Option<StdRng> {
    match ordering {
        ImageOrdering::Sequential => None,
        ImageOrdering::Random { seed: Some(seed) } => Some(StdRng::seed_from_u64(seed)),
        ImageOrdering::Random { seed: None } => Some(StdRng::from_os_rng()),
    }
}

/// The group's images in fill order: by file name, or shuffled when an rng is given.
fn ordered_images(group: &ImageGroup, rng: Option<&mut StdRng>) -> Vec<PathBuf> {
    let mut images = group.image_paths.clone();
    match rng {
        Some(rng) => images.shuffle(rng),
        None => images.sort_by(|a, b| a.file_name().cmp(&b.file_name())),
    }
    images
}
