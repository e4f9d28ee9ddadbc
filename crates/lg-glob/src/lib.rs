//! lg-glob
#![deny(unsafe_code)]
//!
//! Focused glob compilation and include/exclude matching utilities, shared by
//! the workspace manager's file staging and the linter runner's target
//! selection.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Result of evaluating a path against include/exclude glob rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchDecision {
    /// Path passes both include and exclude filters.
    Allowed,
    /// Path matched an exclude pattern.
    DeniedByExclude,
    /// Path did not match any include pattern (when includes are specified).
    DeniedByMissingInclude,
}

impl MatchDecision {
    /// Returns `true` only for [`MatchDecision::Allowed`].
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Compiled include/exclude glob pair for path filtering.
///
/// Exclude patterns take precedence: a path matching an exclude glob is denied
/// even if it also matches an include glob. Empty pattern lists are treated as
/// "no constraint" (all paths pass).
#[derive(Debug, Clone)]
pub struct IncludeExcludeGlobs {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl IncludeExcludeGlobs {
    /// Compile include and exclude pattern lists into a reusable matcher.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: build_globset(include)?,
            exclude: build_globset(exclude)?,
        })
    }

    /// Evaluate a [`Path`] against the compiled glob rules.
    pub fn decide_path(&self, candidate: &Path) -> MatchDecision {
        if self
            .exclude
            .as_ref()
            .is_some_and(|set| set.is_match(candidate))
        {
            return MatchDecision::DeniedByExclude;
        }
        if self
            .include
            .as_ref()
            .is_some_and(|set| !set.is_match(candidate))
        {
            return MatchDecision::DeniedByMissingInclude;
        }
        MatchDecision::Allowed
    }

    /// Convenience wrapper around [`decide_path`](Self::decide_path) for string slices.
    pub fn decide_str(&self, candidate: &str) -> MatchDecision {
        self.decide_path(Path::new(candidate))
    }
}

/// Compile a list of glob patterns into a [`GlobSet`], returning `None` for empty input.
pub fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut b = GlobSetBuilder::new();
    for p in patterns {
        b.add(Glob::new(p).with_context(|| format!("invalid glob: {p}"))?);
    }
    Ok(Some(b.build()?))
}

#[cfg(test)]
mod tests {
    use super::{IncludeExcludeGlobs, MatchDecision};

    fn patterns(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn allows_everything_without_patterns() {
        let rules = IncludeExcludeGlobs::new(&Vec::new(), &Vec::new()).expect("compile rules");
        assert_eq!(rules.decide_str("src/lib.rs"), MatchDecision::Allowed);
        assert_eq!(rules.decide_str("README.md"), MatchDecision::Allowed);
    }

    #[test]
    fn include_patterns_gate_matches() {
        let rules = IncludeExcludeGlobs::new(&patterns(&["src/**"]), &Vec::new())
            .expect("compile include rules");
        assert_eq!(rules.decide_str("src/lib.rs"), MatchDecision::Allowed);
        assert_eq!(
            rules.decide_str("README.md"),
            MatchDecision::DeniedByMissingInclude
        );
    }

    #[test]
    fn exclude_patterns_take_precedence() {
        let rules =
            IncludeExcludeGlobs::new(&patterns(&["src/**"]), &patterns(&["src/private/**"]))
                .expect("compile include/exclude rules");
        assert_eq!(
            rules.decide_str("src/private/secrets.txt"),
            MatchDecision::DeniedByExclude
        );
    }

    #[test]
    fn invalid_pattern_returns_error() {
        let err = IncludeExcludeGlobs::new(&patterns(&["["]), &Vec::new())
            .expect_err("invalid glob should fail");
        assert!(
            err.to_string().contains("invalid glob"),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn multiple_exclude_patterns() {
        let rules =
            IncludeExcludeGlobs::new(&Vec::new(), &patterns(&["*.log", "target/**", "*.tmp"]))
                .expect("compile rules");
        assert_eq!(rules.decide_str("build.log"), MatchDecision::DeniedByExclude);
        assert_eq!(
            rules.decide_str("target/debug/bin"),
            MatchDecision::DeniedByExclude
        );
        assert_eq!(rules.decide_str("src/main.rs"), MatchDecision::Allowed);
    }

    #[test]
    fn build_globset_with_empty_returns_none() {
        let result = super::build_globset(&[]).expect("should succeed");
        assert!(result.is_none());
    }

    #[test]
    fn build_globset_with_patterns_returns_some() {
        let result = super::build_globset(&patterns(&["*.rs", "src/**"])).expect("should succeed");
        assert!(result.is_some());
        let set = result.unwrap();
        assert!(set.is_match("main.rs"));
        assert!(set.is_match("src/lib.rs"));
        assert!(!set.is_match("README.md"));
    }

    #[test]
    fn match_decision_is_allowed() {
        assert!(MatchDecision::Allowed.is_allowed());
        assert!(!MatchDecision::DeniedByExclude.is_allowed());
        assert!(!MatchDecision::DeniedByMissingInclude.is_allowed());
    }
}
