use crate::types::ImageGroup;
use std::fmt;
use std::str::FromStr;

/// How a group is handled when its image count differs from the number of slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum MismatchPolicy {
    /// Fill slots in order while both slots and images remain.
    #[default]
    Truncate,
    /// Cycle through the group's images until every slot is filled.
    Repeat,
    /// Produce no slide for a mismatching group.
    SkipGroup,
    /// Stop at the first mismatching group, keeping the slides made so far.
    Abort,
}

impl MismatchPolicy {
    pub const ALL: [MismatchPolicy; 4] = [
        MismatchPolicy::Truncate,
        MismatchPolicy::Repeat,
        MismatchPolicy::SkipGroup,
        MismatchPolicy::Abort,
    ];

    pub fn description(self) -> &'static str {
        match self {
            MismatchPolicy::Truncate => "Use available images, leave extra slots empty",
            MismatchPolicy::Repeat => "Repeat images to fill all slots",
            MismatchPolicy::SkipGroup => "Skip folders that don't match",
            MismatchPolicy::Abort => "Stop processing",
        }
    }
}

impl FromStr for MismatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "truncate" => Ok(MismatchPolicy::Truncate),
            "repeat" => Ok(MismatchPolicy::Repeat),
            "skip-group" | "skip_group" | "skip" => Ok(MismatchPolicy::SkipGroup),
            "abort" => Ok(MismatchPolicy::Abort),
            _ => Err(format!("unknown mismatch policy: {}", s)),
        }
    }
}

impl fmt::Display for MismatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MismatchPolicy::Truncate => "truncate",
            MismatchPolicy::Repeat => "repeat",
            MismatchPolicy::SkipGroup => "skip-group",
            MismatchPolicy::Abort => "abort",
        };
        f.write_str(name)
    }
}

/// A group whose image count differs from the template's slot count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub group: String,
    pub image_count: usize,
    pub slot_count: usize,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} images for {} slots", self.group, self.image_count, self.slot_count)
    }
}

/// Groups that need a policy decision.
///
/// Empty groups are always skipped and a slot-less template takes one image per group, so
/// neither counts as a mismatch.
pub fn find_mismatches(groups: &[ImageGroup], slot_count: usize) -> Vec<Mismatch> {
    if slot_count == 0 {
        return Vec::new();
    }
    groups
        .iter()
        .filter(|group| group.image_count() > 0 && group.image_count() != slot_count)
        .map(|group| Mismatch {
            group: group.name.clone(),
            image_count: group.image_count(),
            slot_count,
        })
        .collect()
}

/// Why a group produced no slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoImages,
    Mismatch,
}

/// What to do with one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupDecision {
    Fill,
    Skip(SkipReason),
    Abort,
}

pub fn decide(policy: MismatchPolicy, image_count: usize, slot_count: usize) -> GroupDecision {
    if image_count == 0 {
        return GroupDecision::Skip(SkipReason::NoImages);
    }
    if slot_count == 0 || image_count == slot_count {
        return GroupDecision::Fill;
    }
    match policy {
        MismatchPolicy::Truncate | MismatchPolicy::Repeat => GroupDecision::Fill,
        MismatchPolicy::SkipGroup => GroupDecision::Skip(SkipReason::Mismatch),
        MismatchPolicy::Abort => GroupDecision::Abort,
    }
}

/// Index of the image that goes into `slot`, or `None` when the slot stays empty.
pub fn select_image(policy: MismatchPolicy, slot: usize, image_count: usize) -> Option<usize> {
    if image_count == 0 {
        return None;
    }
    match policy {
        MismatchPolicy::Repeat => Some(slot % image_count),
        _ => (slot < image_count).then_some(slot),
    }
}

/// Image index per slot for a group of `image_count` images.
pub fn assign(policy: MismatchPolicy, slot_count: usize, image_count: usize) -> Vec<Option<usize>> {
    (0..slot_count).map(|slot| select_image(policy, slot, image_count)).collect()
}

/// Picks the policy for a run once mismatches are known.
///
/// Consulted at most once per run, before any slide is synthesized.
pub trait MismatchResolver {
    fn resolve(&mut self, mismatches: &[Mismatch], default: MismatchPolicy) -> MismatchPolicy;
}

impl<F> MismatchResolver for F
where
    F: FnMut(&[Mismatch], MismatchPolicy) -> MismatchPolicy,
{
    fn resolve(&mut self, mismatches: &[Mismatch], default: MismatchPolicy) -> MismatchPolicy {
        self(mismatches, default)
    }
}

/// Resolver that keeps the configured policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct UseConfigured;

impl MismatchResolver for UseConfigured {
    fn resolve(&mut self, _mismatches: &[Mismatch], default: MismatchPolicy) -> MismatchPolicy {
        default
    }
}
