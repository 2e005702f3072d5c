//! Free-text reference extraction: issue and PR numbers mentioned in
//! bodies, comments, and changelogs, scoped to one repository.
//!
//! Lookalike identifiers from non-platform trackers (`ticket #99`,
//! `JIRA ... #123`) are subtracted from the result, and numbers are
//! constrained to 1-7 digits.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Keyword + `#N` with up to 50 non-`#`, non-newline characters between.
#[allow(clippy::unwrap_used)] // static pattern
static KEYWORD_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:pr|pull(?:[ \t]+request)?|issue|fix(?:es|ed)?|close[sd]?|resolve[sd]?|ref(?:er(?:ence[sd]?)?)?)\b[^#\n]{0,50}#(\d+)",
    )
    .unwrap()
});

/// Bracketed changelog references: `[#N]` and `[PR #N]`. The bare `[Issue
/// #N]` form is intentionally not admitted.
#[allow(clippy::unwrap_used)] // static pattern
static BRACKET_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(?:PR[ \t]+)?#(\d+)\]").unwrap()
});

#[allow(clippy::unwrap_used)] // static pattern
static GH_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bGH-(\d+)\b").unwrap()
});

/// Numbers preceded by a known non-platform tracker word are never
/// references into the repository.
#[allow(clippy::unwrap_used)] // static pattern
static TRACKER_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:ticket|jira|trac|redmine)\b[^#\n]{0,50}#(\d+)").unwrap()
});

const MAX_REF_DIGITS: usize = 7;

/// Extracts the ordered, unique list of referenced issue/PR numbers for one
/// `owner/repo`.
#[derive(Debug, Clone)]
pub struct ReferenceExtractor {
    url_ref: Regex,
}

impl ReferenceExtractor {
    /// The URL rule is anchored to this repository; owner and repo are
    /// escaped literally.
    #[must_use]
    pub fn new(owner: &str, repo: &str) -> Self {
        let pattern = format!(
            r"https?://[^/\s]+/{}/{}/(?:issues|pull)/(\d+)",
            regex::escape(owner),
            regex::escape(repo)
        );
        #[allow(clippy::unwrap_used)] // escaped literals inside a fixed shape
        let url_ref = Regex::new(&pattern).unwrap();
        Self { url_ref }
    }

    /// Run all match rules over `text`, subtract tracker lookalikes,
    /// dedupe preserving first occurrence, and apply `limit` if given.
    #[must_use]
    pub fn extract(&self, text: &str, limit: Option<usize>) -> Vec<u64> {
        let mut hits: Vec<(usize, u64)> = Vec::new();
        for re in [&self.url_ref, &KEYWORD_REF, &BRACKET_REF, &GH_REF] {
            collect_numbers(re, text, &mut hits);
        }

        let mut excluded: Vec<(usize, u64)> = Vec::new();
        collect_numbers(&TRACKER_REF, text, &mut excluded);
        let excluded: HashSet<u64> = excluded.into_iter().map(|(_, n)| n).collect();

        hits.sort_by_key(|&(pos, _)| pos);
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (_, number) in hits {
            if excluded.contains(&number) || !seen.insert(number) {
                continue;
            }
            out.push(number);
            if limit.is_some_and(|cap| out.len() >= cap) {
                break;
            }
        }
        out
    }
}

fn collect_numbers(re: &Regex, text: &str, out: &mut Vec<(usize, u64)>) {
    for caps in re.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            if m.as_str().len() > MAX_REF_DIGITS {
                continue;
            }
            if let Ok(number) = m.as_str().parse::<u64>() {
                if number > 0 {
                    out.push((m.start(), number));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<u64> {
        ReferenceExtractor::new("octo", "widgets").extract(text, None)
    }

    #[test]
    fn keyword_forms_are_recognized() {
        assert_eq!(extract("fixes #12"), vec![12]);
        assert_eq!(extract("Closed by #9"), vec![9]);
        assert_eq!(extract("resolves the bug in #101"), vec![101]);
        assert_eq!(extract("see pull request #44"), vec![44]);
        assert_eq!(extract("referenced in #7"), vec![7]);
        assert_eq!(extract("PR number was #3"), vec![3]);
    }

    #[test]
    fn bare_hash_numbers_are_not_references() {
        assert_eq!(extract("released build #500 of the app"), Vec::<u64>::new());
    }

    #[test]
    fn keyword_window_is_bounded() {
        let filler = "x".repeat(60);
        assert_eq!(extract(&format!("fixes {filler} #12")), Vec::<u64>::new());
        let short = "x".repeat(40);
        assert_eq!(extract(&format!("fixes {short} #12")), vec![12]);
    }

    #[test]
    fn keyword_window_does_not_cross_newlines() {
        assert_eq!(extract("fixes\n#12"), Vec::<u64>::new());
    }

    #[test]
    fn url_references_match_this_repo_only() {
        let text = "see https://github.com/octo/widgets/issues/31 and \
                    https://github.com/octo/widgets/pull/32 but not \
                    https://github.com/other/repo/issues/33";
        assert_eq!(extract(text), vec![31, 32]);
    }

    #[test]
    fn url_references_match_any_host() {
        assert_eq!(
            extract("https://git.example.net/octo/widgets/issues/5"),
            vec![5]
        );
    }

    #[test]
    fn bracketed_changelog_forms() {
        assert_eq!(extract("changelog: [#42] and [PR #43]"), vec![42, 43]);
        // The `[Issue #N]` bracket form is not admitted; the bare keyword
        // rule still catches it because "issue" precedes "#44".
        assert_eq!(extract("[Issue #44]"), vec![44]);
    }

    #[test]
    fn gh_prefixed_tokens() {
        assert_eq!(extract("regressed by GH-77"), vec![77]);
        assert_eq!(extract("NIGH-77 is not a reference"), Vec::<u64>::new());
    }

    #[test]
    fn tracker_lookalikes_are_rejected() {
        // Seed scenario S4.
        assert_eq!(extract("see ticket #999 and fixes #12"), vec![12]);
        assert_eq!(extract("JIRA issue #555"), Vec::<u64>::new());
        assert_eq!(extract("filed in redmine as #321; fixes #5"), vec![5]);
    }

    #[test]
    fn tracker_rejection_wins_even_when_rules_overlap() {
        // "trac ... #88" also matches the keyword window via "ref"-less
        // forms? It should stay excluded regardless of other matches.
        assert_eq!(extract("trac ref #88"), Vec::<u64>::new());
    }

    #[test]
    fn results_are_unique_and_ordered_by_position() {
        let text = "fixes #12, also fixes #12, then closes #3 and [#12]";
        assert_eq!(extract(text), vec![12, 3]);
    }

    #[test]
    fn limit_takes_first_n_in_original_order() {
        let text = "fixes #5, fixes #6, fixes #7, fixes #8";
        let refs = ReferenceExtractor::new("octo", "widgets").extract(text, Some(2));
        assert_eq!(refs, vec![5, 6]);
    }

    #[test]
    fn numbers_are_capped_at_seven_digits() {
        assert_eq!(extract("fixes #1234567"), vec![1_234_567]);
        assert_eq!(extract("fixes #12345678"), Vec::<u64>::new());
        assert_eq!(extract("fixes #0"), Vec::<u64>::new());
    }

    #[test]
    fn extraction_is_idempotent_over_serialized_output() {
        let text = "fixes [#42] and closes #43, see GH-44";
        let extractor = ReferenceExtractor::new("octo", "widgets");
        let refs = extractor.extract(text, None);
        let serialized = refs
            .iter()
            .map(|n| format!("[#{n}]"))
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(extractor.extract(&serialized, None), refs);
    }

    #[test]
    fn owner_and_repo_are_escaped_literally() {
        let extractor = ReferenceExtractor::new("dot.owner", "re+po");
        assert_eq!(
            extractor.extract("https://github.com/dot.owner/re+po/issues/9", None),
            vec![9]
        );
        assert_eq!(
            extractor.extract("https://github.com/dotXowner/re+po/issues/9", None),
            Vec::<u64>::new()
        );
    }
}
