use crate::policy::MismatchPolicy;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Configuration of a single synchronization run.
///
/// Use [`RunConfig::builder()`] to create a configuration instance.
/// This allows you to customize only the desired fields while falling back to sensible defaults for the rest.
///
/// # Configuration Options
///
/// | Parameter | Type | Default | Description |
/// |-----------|------|---------|-------------|
/// | `ordering` | [`ImageOrdering`] | `Sequential` | Order in which a group's images fill the slots |
/// | `mismatch_policy` | [`MismatchPolicy`] | `Truncate` | What to do when image and slot counts differ |
/// | `replace_mode` | [`ReplaceMode`] | `Append` | Whether the template's own slides are kept |
/// | `slide_source` | [`SlideSource`] | `Layout` | How a new slide is derived from the template slide |
/// | `temp_root` | `Option<PathBuf>` | `None` | Parent of the run's temp dir, system temp dir when unset |
///
/// # Example
///
/// ```
/// use slide_sync::{MismatchPolicy, RunConfig};
///
/// let config = RunConfig::builder()
///     .mismatch_policy(MismatchPolicy::Repeat)
///     .build();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    pub ordering: ImageOrdering,
    pub mismatch_policy: MismatchPolicy,
    pub replace_mode: ReplaceMode,
    pub slide_source: SlideSource,
    pub temp_root: Option<PathBuf>,
}

impl RunConfig {
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }
}

/// Builder for [`RunConfig`].
///
/// Allows setting individual configuration fields while falling back to defaults for any unspecified values
#[derive(Debug, Default)]
pub struct RunConfigBuilder {
    ordering: Option<ImageOrdering>,
    mismatch_policy: Option<MismatchPolicy>,
    replace_mode: Option<ReplaceMode>,
    slide_source: Option<SlideSource>,
    temp_root: Option<PathBuf>,
}

impl RunConfigBuilder {
    pub fn ordering(mut self, value: ImageOrdering) -> Self {
        self.ordering = Some(value);
        self
    }

    /// Sets the policy used when a group's image count differs from the slot count.
    pub fn mismatch_policy(mut self, value: MismatchPolicy) -> Self {
        self.mismatch_policy = Some(value);
        self
    }

    pub fn replace_mode(mut self, value: ReplaceMode) -> Self {
        self.replace_mode = Some(value);
        self
    }

    pub fn slide_source(mut self, value: SlideSource) -> Self {
        self.slide_source = Some(value);
        self
    }

    /// Sets the directory the run's temporary workspace is created in.
    pub fn temp_root(mut self, value: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(value.into());
        self
    }

    /// Builds the final [`RunConfig`] instance, applying default values for any fields that were not set.
    pub fn build(self) -> RunConfig {
        RunConfig {
            ordering: self.ordering.unwrap_or_default(),
            mismatch_policy: self.mismatch_policy.unwrap_or_default(),
            replace_mode: self.replace_mode.unwrap_or_default(),
            slide_source: self.slide_source.unwrap_or_default(),
            temp_root: self.temp_root,
        }
    }
}

/// Order in which a group's images are assigned to slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageOrdering {
    /// Lexicographic by file name.
    #[default]
    Sequential,
    /// A fresh permutation per group. With a seed the permutation is reproducible.
    Random { seed: Option<u64> },
}

impl FromStr for ImageOrdering {
    type Err = String;

    /// Parses `sequential`, `random` or `random:<seed>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(ImageOrdering::Sequential),
            "random" => Ok(ImageOrdering::Random { seed: None }),
            other => match other.strip_prefix("random:") {
                Some(seed) => seed
                    .parse()
                    .map(|seed| ImageOrdering::Random { seed: Some(seed) })
                    .map_err(|_| format!("invalid seed: {}", seed)),
                None => Err(format!("unknown ordering: {}", s)),
            },
        }
    }
}

impl fmt::Display for ImageOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageOrdering::Sequential => write!(f, "sequential"),
            ImageOrdering::Random { seed: None } => write!(f, "random"),
            ImageOrdering::Random { seed: Some(seed) } => write!(f, "random:{}", seed),
        }
    }
}

/// What happens to the slides the template already has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplaceMode {
    #[default]
    Append,
    /// Removes the template's slides once the new ones are in place.
    ReplaceAll,
}

impl FromStr for ReplaceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "append" => Ok(ReplaceMode::Append),
            "replace-all" | "replace_all" => Ok(ReplaceMode::ReplaceAll),
            _ => Err(format!("unknown replace mode: {}", s)),
        }
    }
}

impl fmt::Display for ReplaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplaceMode::Append => write!(f, "append"),
            ReplaceMode::ReplaceAll => write!(f, "replace-all"),
        }
    }
}

/// How a new slide is derived from the template slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlideSource {
    /// Fresh slide on the template slide's layout.
    #[default]
    Layout,
    /// Copy of the template slide's whole shape tree.
    CloneTemplate,
}

impl FromStr for SlideSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "layout" => Ok(SlideSource::Layout),
            "clone" | "clone-template" => Ok(SlideSource::CloneTemplate),
            _ => Err(format!("unknown slide source: {}", s)),
        }
    }
}

impl fmt::Display for SlideSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlideSource::Layout => write!(f, "layout"),
            SlideSource::CloneTemplate => write!(f, "clone"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = RunConfig::builder().build();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.ordering, ImageOrdering::Sequential);
        assert_eq!(config.mismatch_policy, MismatchPolicy::Truncate);
        assert_eq!(config.replace_mode, ReplaceMode::Append);
        assert_eq!(config.slide_source, SlideSource::Layout);
        assert!(config.temp_root.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = RunConfig::builder()
            .ordering(ImageOrdering::Random { seed: Some(7) })
            .mismatch_policy(MismatchPolicy::SkipGroup)
            .replace_mode(ReplaceMode::ReplaceAll)
            .slide_source(SlideSource::CloneTemplate)
            .temp_root("/tmp/scratch")
            .build();
        assert_eq!(config.ordering, ImageOrdering::Random { seed: Some(7) });
        assert_eq!(config.mismatch_policy, MismatchPolicy::SkipGroup);
        assert_eq!(config.replace_mode, ReplaceMode::ReplaceAll);
        assert_eq!(config.slide_source, SlideSource::CloneTemplate);
        assert_eq!(config.temp_root, Some(PathBuf::from("/tmp/scratch")));
    }

    #[test]
    fn test_ordering_from_str() {
        assert_eq!("Sequential".parse(), Ok(ImageOrdering::Sequential));
        assert_eq!("random".parse(), Ok(ImageOrdering::Random { seed: None }));
        assert_eq!("random:42".parse(), Ok(ImageOrdering::Random { seed: Some(42) }));
        assert!("random:x".parse::<ImageOrdering>().is_err());
        assert!("shuffled".parse::<ImageOrdering>().is_err());
        assert_eq!(ImageOrdering::Random { seed: Some(42) }.to_string(), "random:42");
    }

    #[test]
    fn test_mode_and_source_from_str() {
        assert_eq!("replace-all".parse(), Ok(ReplaceMode::ReplaceAll));
        assert_eq!("APPEND".parse(), Ok(ReplaceMode::Append));
        assert_eq!("clone".parse(), Ok(SlideSource::CloneTemplate));
        assert!("copy".parse::<SlideSource>().is_err());
        assert_eq!(SlideSource::CloneTemplate.to_string(), "clone");
    }
}
