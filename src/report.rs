use crate::policy::{MismatchPolicy, SkipReason};
use log::Level;
use std::fmt;

/// Severity of a report entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryLevel {
    Info,
    Warning,
    Error,
}

impl EntryLevel {
    fn log_level(self) -> Level {
        match self {
            EntryLevel::Info => Level::Info,
            EntryLevel::Warning => Level::Warn,
            EntryLevel::Error => Level::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub level: EntryLevel,
    pub message: String,
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            EntryLevel::Info => "info",
            EntryLevel::Warning => "warning",
            EntryLevel::Error => "error",
        };
        write!(f, "[{}] {}", tag, self.message)
    }
}

/// The image that went into one slot of a synthesized slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAssignment {
    pub slot: usize,
    pub shape_name: String,
    /// File name of the placed image, `None` when the slot stayed empty.
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupStatus {
    Created { slide_part: String },
    Skipped(SkipReason),
    /// Synthesis failed and the group left nothing behind.
    Failed(String),
    /// Stopped here by the abort policy.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutcome {
    pub group: String,
    pub image_count: usize,
    pub status: GroupStatus,
    pub assignments: Vec<SlotAssignment>,
}

impl GroupOutcome {
    pub fn images_placed(&self) -> usize {
        self.assignments.iter().filter(|a| a.image.is_some()).count()
    }
}

/// What a run did, group by group, plus every message it logged.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub slides_created: usize,
    pub images_placed: usize,
    pub groups_total: usize,
    pub groups_skipped: usize,
    pub groups_failed: usize,
    /// Directories of the archive that held no images.
    pub empty_dirs: Vec<String>,
    /// `None` when no group mismatched the slot count.
    pub policy_applied: Option<MismatchPolicy>,
    /// Group at which the abort policy stopped the run.
    pub aborted_at: Option<String>,
    /// Whether new slides use a substitute for the template slide's layout.
    pub layout_fallback: bool,
    pub groups: Vec<GroupOutcome>,
    pub entries: Vec<ReportEntry>,
}

impl Report {
    pub fn info(&mut self, message: impl Into<String>) {
        self.push(EntryLevel::Info, message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(EntryLevel::Warning, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(EntryLevel::Error, message.into());
    }

    fn push(&mut self, level: EntryLevel, message: String) {
        log::log!(level.log_level(), "{}", message);
        self.entries.push(ReportEntry { level, message });
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.level == EntryLevel::Warning)
    }

    /// Warnings and errors, in the order they were recorded.
    pub fn problems(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.level >= EntryLevel::Warning)
    }

    pub fn group(&self, name: &str) -> Option<&GroupOutcome> {
        self.groups.iter().find(|g| g.group == name)
    }

    pub fn record(&mut self, outcome: GroupOutcome) {
        match &outcome.status {
            GroupStatus::Created { .. } => {
                self.slides_created += 1;
                self.images_placed += outcome.images_placed();
            }
            GroupStatus::Skipped(_) => self.groups_skipped += 1,
            GroupStatus::Failed(_) => self.groups_failed += 1,
            GroupStatus::Aborted => self.aborted_at = Some(outcome.group.clone()),
        }
        self.groups.push(outcome);
    }

    /// One-line summary for the end of a run.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} slides created, {} images placed, {} of {} folders skipped, {} failed",
            self.slides_created, self.images_placed, self.groups_skipped, self.groups_total, self.groups_failed
        );
        if let Some(group) = &self.aborted_at {
            summary.push_str(&format!(", aborted at {}", group));
        }
        summary
    }
}
