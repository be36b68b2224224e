//! Toolset selection — permissive, inclusive, and deliberately not a
//! classifier.
//!
//! This is the one place in the gateway where message text is inspected at
//! all, and the inspection is narrow by design: a small substring check that
//! only ever *adds* toolsets, never excludes one. The cost of including a
//! toolset the turn doesn't end up needing is a few hundred marginal prompt
//! tokens; the cost of excluding one the model actually needed is total
//! feature failure. A turn selecting all five toolsets is a normal,
//! unremarkable outcome — not a bug to fix.

use crate::Toolset;

/// Everything the selector is allowed to look at beyond the message text.
#[derive(Debug, Clone, Default)]
pub struct SelectorContext {
    /// Whether the conversation already has artifacts (derived from recent
    /// history by the caller).
    pub has_artifacts: bool,
    /// Whether a class entity has already been resolved for this turn.
    pub class_id: Option<String>,
}

const GENERATION_KEYWORDS: &[&str] = &["generate", "create", "出题", "ppt", "quiz", "幻灯片"];
const MODIFY_KEYWORDS: &[&str] = &["change", "replace", "modify", "修改", "revise", "改成"];
const ANALYSIS_KEYWORDS: &[&str] = &["scores", "analyze", "analysis", "成绩", "mastery", "分析"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    needles.iter().any(|n| lower.contains(&n.to_lowercase()))
}

/// Select the toolsets a turn's prompt should carry.
///
/// Pure function, no I/O: `base_data` and `platform` are always present;
/// `generation`, `artifact_ops`, and `analysis` are added permissively based
/// on loose keyword hints and structured context, never excluded based on
/// them.
pub fn select_toolsets(message_text: &str, context: &SelectorContext) -> Vec<Toolset> {
    let mut toolsets = vec![Toolset::BaseData, Toolset::Platform];

    if contains_any(message_text, GENERATION_KEYWORDS) {
        toolsets.push(Toolset::Generation);
    }

    if context.has_artifacts || contains_any(message_text, MODIFY_KEYWORDS) {
        toolsets.push(Toolset::ArtifactOps);
    }

    if context.class_id.is_some() || contains_any(message_text, ANALYSIS_KEYWORDS) {
        toolsets.push(Toolset::Analysis);
    }

    toolsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_data_and_platform_always_present() {
        let toolsets = select_toolsets("hello there", &SelectorContext::default());
        assert!(toolsets.contains(&Toolset::BaseData));
        assert!(toolsets.contains(&Toolset::Platform));
        assert_eq!(toolsets.len(), 2);
    }

    #[test]
    fn generation_keyword_adds_generation() {
        let toolsets = select_toolsets("请出 5 道英语语法选择题", &SelectorContext::default());
        assert!(toolsets.contains(&Toolset::Generation));
    }

    #[test]
    fn has_artifacts_adds_artifact_ops_even_without_keywords() {
        let ctx = SelectorContext { has_artifacts: true, class_id: None };
        let toolsets = select_toolsets("looks good", &ctx);
        assert!(toolsets.contains(&Toolset::ArtifactOps));
    }

    #[test]
    fn modify_keyword_adds_artifact_ops() {
        let toolsets = select_toolsets("把第 3 题改成填空题", &SelectorContext::default());
        assert!(toolsets.contains(&Toolset::ArtifactOps));
    }

    #[test]
    fn class_id_adds_analysis_even_without_keywords() {
        let ctx = SelectorContext { has_artifacts: false, class_id: Some("1a".into()) };
        let toolsets = select_toolsets("anything", &ctx);
        assert!(toolsets.contains(&Toolset::Analysis));
    }

    #[test]
    fn analysis_keyword_adds_analysis() {
        let toolsets = select_toolsets("analyze class 1A's scores", &SelectorContext::default());
        assert!(toolsets.contains(&Toolset::Analysis));
    }

    #[test]
    fn selection_is_never_exclusive() {
        // A message matching every keyword category should select all five,
        // demonstrating the selector never narrows to a single toolset.
        let ctx = SelectorContext { has_artifacts: true, class_id: Some("1a".into()) };
        let toolsets = select_toolsets("generate a quiz and analyze scores then change it", &ctx);
        assert_eq!(toolsets.len(), 5);
    }

    #[test]
    fn case_insensitive_matching() {
        let toolsets = select_toolsets("GENERATE a quiz", &SelectorContext::default());
        assert!(toolsets.contains(&Toolset::Generation));
    }
}
