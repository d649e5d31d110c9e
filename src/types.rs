use std::fmt;
use std::hash::{Hash, Hasher};

/// A path relative to the watched root.
///
/// Separators are normalised to `/` on construction. Equality and hashing
/// ignore ASCII case, so `Src/Main.cpp` and `src/main.cpp` deduplicate to a
/// single entry.
#[derive(Debug, Clone, Eq)]
pub struct RelativePath {
    display: String,
    key: String,
}

impl RelativePath {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let display = normalize_separators(raw.as_ref());
        let key = display.to_lowercase();
        Self { display, key }
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }

    pub fn is_empty(&self) -> bool {
        self.display.is_empty()
    }
}

fn normalize_separators(raw: &str) -> String {
    let replaced = raw.replace('\\', "/");
    let trimmed = replaced.trim_start_matches("./");
    trimmed.to_string()
}

impl PartialEq for RelativePath {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Hash for RelativePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<&str> for RelativePath {
    fn from(value: &str) -> Self {
        RelativePath::new(value)
    }
}

/// Whether and how the configure stage runs on the next pipeline run.
///
/// Ordered by strength so that escalation is a `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ConfigureMode {
    /// Configure is skipped entirely.
    #[default]
    None,
    /// Configure runs without the fresh flag.
    Normal,
    /// Configure runs with `--fresh`.
    Fresh,
}

impl ConfigureMode {
    /// Combine with another request, keeping the stronger of the two.
    pub fn escalate(self, requested: ConfigureMode) -> ConfigureMode {
        self.max(requested)
    }

    pub fn is_fresh(self) -> bool {
        self == ConfigureMode::Fresh
    }
}

/// The three pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Configure,
    Build,
    Test,
}

impl Stage {
    pub fn pre_hook(self) -> HookPoint {
        match self {
            Stage::Configure => HookPoint::PreConfigure,
            Stage::Build => HookPoint::PreBuild,
            Stage::Test => HookPoint::PreTest,
        }
    }

    pub fn post_hook(self) -> HookPoint {
        match self {
            Stage::Configure => HookPoint::PostConfigure,
            Stage::Build => HookPoint::PostBuild,
            Stage::Test => HookPoint::PostTest,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Configure => "configure",
            Stage::Build => "build",
            Stage::Test => "test",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a user script hooks into the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    PreConfigure,
    PostConfigure,
    PreBuild,
    PostBuild,
    PreTest,
    PostTest,
}

impl HookPoint {
    pub fn stage(self) -> Stage {
        match self {
            HookPoint::PreConfigure | HookPoint::PostConfigure => Stage::Configure,
            HookPoint::PreBuild | HookPoint::PostBuild => Stage::Build,
            HookPoint::PreTest | HookPoint::PostTest => Stage::Test,
        }
    }

    pub fn is_pre(self) -> bool {
        matches!(
            self,
            HookPoint::PreConfigure | HookPoint::PreBuild | HookPoint::PreTest
        )
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = if self.is_pre() { "pre" } else { "post" };
        write!(f, "{phase}-{}", self.stage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn relative_paths_compare_case_insensitively() {
        let a = RelativePath::new("Src/Main.cpp");
        let b = RelativePath::new("src\\main.CPP");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 1);

        assert_eq!(RelativePath::new("src/Ärger.cpp"), RelativePath::new("SRC/ärger.cpp"));
    }

    #[test]
    fn relative_path_keeps_original_casing_for_display() {
        let p = RelativePath::new("./include\\Widget.h");
        assert_eq!(p.as_str(), "include/Widget.h");
        assert_eq!(p.to_string(), "include/Widget.h");
    }

    #[test]
    fn configure_mode_escalation_never_downgrades() {
        assert_eq!(ConfigureMode::None.escalate(ConfigureMode::Normal), ConfigureMode::Normal);
        assert_eq!(ConfigureMode::Fresh.escalate(ConfigureMode::Normal), ConfigureMode::Fresh);
        assert_eq!(ConfigureMode::Normal.escalate(ConfigureMode::None), ConfigureMode::Normal);
    }

    #[test]
    fn hook_points_display_phase_and_stage() {
        assert_eq!(HookPoint::PreBuild.to_string(), "pre-build");
        assert_eq!(Stage::Test.post_hook().to_string(), "post-test");
    }
}
