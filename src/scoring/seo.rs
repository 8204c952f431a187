use std::ops::RangeInclusive;

use serde::Serialize;

use super::{contains_ci, ContentScorer};
use crate::content::{word_count, ContentDraft};

/// Highest score a post can reach.
pub const MAX_SEO_SCORE: u32 = 100;

// ============================================================================
// Weights
// ============================================================================

/// Points for a text field whose length falls in an ideal band, with a
/// smaller award for anything at least `min_len` long.
#[derive(Debug, Clone, PartialEq)]
pub struct LengthBand {
    pub ideal: RangeInclusive<usize>,
    pub ideal_points: u32,
    pub min_len: usize,
    pub min_points: u32,
}

impl LengthBand {
    fn points(&self, len: usize) -> u32 {
        if self.ideal.contains(&len) {
            self.ideal_points
        } else if len >= self.min_len {
            self.min_points
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeoWeights {
    pub title: LengthBand,
    pub description: LengthBand,
    pub keyword_present: u32,
    pub keyword_in_title: u32,
    pub keyword_in_description: u32,
    pub keyword_in_body: u32,
    /// `(min_words, points)` tiers, highest threshold first. The first tier
    /// the body reaches wins.
    pub body_tiers: Vec<(usize, u32)>,
    pub image_present: u32,
    pub image_alt: u32,
    pub excerpt_min_len: usize,
    pub excerpt_points: u32,
}

impl Default for SeoWeights {
    fn default() -> Self {
        Self {
            title: LengthBand {
                ideal: 30..=60,
                ideal_points: 20,
                min_len: 20,
                min_points: 10,
            },
            description: LengthBand {
                ideal: 120..=160,
                ideal_points: 20,
                min_len: 100,
                min_points: 10,
            },
            keyword_present: 5,
            keyword_in_title: 5,
            keyword_in_description: 5,
            keyword_in_body: 5,
            body_tiers: vec![(800, 20), (500, 15), (300, 10)],
            image_present: 5,
            image_alt: 5,
            excerpt_min_len: 100,
            excerpt_points: 10,
        }
    }
}

impl SeoWeights {
    fn body_points(&self, words: usize) -> u32 {
        self.body_tiers
            .iter()
            .find(|(min_words, _)| words >= *min_words)
            .map_or(0, |(_, points)| *points)
    }

    fn body_max(&self) -> u32 {
        self.body_tiers.iter().map(|(_, p)| *p).max().unwrap_or(0)
    }
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeoSignal {
    Title,
    Description,
    FocusKeyword,
    ContentLength,
    FeaturedImage,
    Excerpt,
}

/// Points awarded for one signal, with a message the dashboard shows to the
/// editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeoCheck {
    pub signal: SeoSignal,
    pub points: u32,
    pub max_points: u32,
    pub message: String,
}

impl SeoCheck {
    pub fn passed(&self) -> bool {
        self.points == self.max_points
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeoReport {
    pub score: u8,
    pub checks: Vec<SeoCheck>,
}

impl SeoReport {
    /// Checks that did not earn full marks.
    pub fn suggestions(&self) -> impl Iterator<Item = &SeoCheck> {
        self.checks.iter().filter(|c| !c.passed())
    }
}

// ============================================================================
// Scorer
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SeoScorer {
    weights: SeoWeights,
}

impl SeoScorer {
    pub fn new(weights: SeoWeights) -> Self {
        Self { weights }
    }

    /// Score a draft and explain each signal.
    pub fn report(&self, draft: &ContentDraft) -> SeoReport {
        let checks = vec![
            self.check_title(draft),
            self.check_description(draft),
            self.check_keyword(draft),
            self.check_body(draft),
            self.check_image(draft),
            self.check_excerpt(draft),
        ];
        let total: u32 = checks.iter().map(|c| c.points).sum();

        SeoReport {
            score: total.min(MAX_SEO_SCORE) as u8,
            checks,
        }
    }

    fn check_title(&self, draft: &ContentDraft) -> SeoCheck {
        let band = &self.weights.title;
        let len = draft.title.chars().count();
        SeoCheck {
            signal: SeoSignal::Title,
            points: band.points(len),
            max_points: band.ideal_points,
            message: length_message("Title", len, band),
        }
    }

    fn check_description(&self, draft: &ContentDraft) -> SeoCheck {
        let band = &self.weights.description;
        let len = draft.seo_description.chars().count();
        SeoCheck {
            signal: SeoSignal::Description,
            points: band.points(len),
            max_points: band.ideal_points,
            message: length_message("SEO description", len, band),
        }
    }

    fn check_keyword(&self, draft: &ContentDraft) -> SeoCheck {
        let w = &self.weights;
        let max_points =
            w.keyword_present + w.keyword_in_title + w.keyword_in_description + w.keyword_in_body;

        let Some(keyword) = draft.keyword() else {
            return SeoCheck {
                signal: SeoSignal::FocusKeyword,
                points: 0,
                max_points,
                message: "No focus keyword set".to_string(),
            };
        };

        let needle = keyword.to_lowercase();
        let mut points = w.keyword_present;
        let mut missing = Vec::new();

        if contains_ci(&draft.title, &needle) {
            points += w.keyword_in_title;
        } else {
            missing.push("title");
        }
        if contains_ci(&draft.seo_description, &needle) {
            points += w.keyword_in_description;
        } else {
            missing.push("SEO description");
        }
        if contains_ci(&draft.body, &needle) {
            points += w.keyword_in_body;
        } else {
            missing.push("content");
        }

        let message = if missing.is_empty() {
            format!("Focus keyword \"{keyword}\" appears in title, description and content")
        } else {
            format!(
                "Focus keyword \"{keyword}\" missing from: {}",
                missing.join(", ")
            )
        };

        SeoCheck {
            signal: SeoSignal::FocusKeyword,
            points,
            max_points,
            message,
        }
    }

    fn check_body(&self, draft: &ContentDraft) -> SeoCheck {
        let words = word_count(&draft.body);
        let points = self.weights.body_points(words);
        let max_points = self.weights.body_max();
        let message = match self.weights.body_tiers.first() {
            Some((target, _)) if points < max_points => {
                format!("Content is {words} words (aim for {target}+)")
            }
            _ => format!("Content is {words} words"),
        };
        SeoCheck {
            signal: SeoSignal::ContentLength,
            points,
            max_points,
            message,
        }
    }

    fn check_image(&self, draft: &ContentDraft) -> SeoCheck {
        let w = &self.weights;
        let (points, message) = match (draft.image_url(), draft.image_alt()) {
            (Some(_), Some(_)) => (
                w.image_present + w.image_alt,
                "Featured image with alt text",
            ),
            (Some(_), None) => (w.image_present, "Featured image is missing alt text"),
            (None, _) => (0, "No featured image"),
        };
        SeoCheck {
            signal: SeoSignal::FeaturedImage,
            points,
            max_points: w.image_present + w.image_alt,
            message: message.to_string(),
        }
    }

    fn check_excerpt(&self, draft: &ContentDraft) -> SeoCheck {
        let w = &self.weights;
        let len = draft.excerpt.chars().count();
        let points = if len >= w.excerpt_min_len {
            w.excerpt_points
        } else {
            0
        };
        SeoCheck {
            signal: SeoSignal::Excerpt,
            points,
            max_points: w.excerpt_points,
            message: format!(
                "Excerpt is {len} characters (minimum {})",
                w.excerpt_min_len
            ),
        }
    }
}

impl ContentScorer for SeoScorer {
    type Input = ContentDraft;
    type Weights = SeoWeights;
    type Score = u8;

    fn weights(&self) -> &SeoWeights {
        &self.weights
    }

    fn score(&self, draft: &ContentDraft) -> u8 {
        self.report(draft).score
    }
}

fn length_message(field: &str, len: usize, band: &LengthBand) -> String {
    format!(
        "{field} is {len} characters (ideal {}-{})",
        band.ideal.start(),
        band.ideal.end()
    )
}

/// Score a draft with the default weights.
pub fn score(draft: &ContentDraft) -> u8 {
    SeoScorer::default().score(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    fn full_draft() -> ContentDraft {
        let mut title = "Weekend tips ".to_string();
        title.push_str(&"x".repeat(45 - title.len()));
        let mut description = "Our tips for round one. ".to_string();
        description.push_str(&"y".repeat(140 - description.len()));
        let mut body = words(899);
        body.push_str(" tips");

        ContentDraft {
            title,
            body,
            excerpt: "e".repeat(120),
            seo_description: description,
            focus_keyword: Some("tips".to_string()),
            featured_image_url: Some("https://cdn.example.com/hero.jpg".to_string()),
            featured_image_alt: Some("Players running onto the ground".to_string()),
        }
    }

    #[test]
    fn test_full_marks() {
        let draft = full_draft();
        assert_eq!(draft.title.chars().count(), 45);
        assert_eq!(draft.seo_description.chars().count(), 140);
        assert_eq!(word_count(&draft.body), 900);

        let report = SeoScorer::default().report(&draft);
        assert_eq!(report.score, 100);
        assert_eq!(report.suggestions().count(), 0);
    }

    #[test]
    fn test_empty_draft_scores_zero() {
        assert_eq!(score(&ContentDraft::default()), 0);
    }

    #[test]
    fn test_title_bands() {
        let scorer = SeoScorer::default();
        let title_points = |len: usize| {
            let draft = ContentDraft {
                title: "t".repeat(len),
                ..Default::default()
            };
            scorer.report(&draft).checks[0].points
        };
        assert_eq!(title_points(19), 0);
        assert_eq!(title_points(20), 10);
        assert_eq!(title_points(29), 10);
        assert_eq!(title_points(30), 20);
        assert_eq!(title_points(60), 20);
        assert_eq!(title_points(61), 10);
    }

    #[test]
    fn test_description_bands() {
        let desc_score = |len: usize| {
            score(&ContentDraft {
                seo_description: "d".repeat(len),
                ..Default::default()
            })
        };
        assert_eq!(desc_score(99), 0);
        assert_eq!(desc_score(100), 10);
        assert_eq!(desc_score(120), 20);
        assert_eq!(desc_score(160), 20);
        assert_eq!(desc_score(161), 10);
    }

    #[test]
    fn test_keyword_presence_only() {
        let draft = ContentDraft {
            focus_keyword: Some("tips".to_string()),
            ..Default::default()
        };
        assert_eq!(score(&draft), 5);
    }

    #[test]
    fn test_keyword_is_case_insensitive_substring() {
        let draft = ContentDraft {
            title: "BETTING Guide".to_string(),
            focus_keyword: Some("Bet".to_string()),
            ..Default::default()
        };
        // present (5) + in title (5); title is only 13 chars
        assert_eq!(score(&draft), 10);
    }

    #[test]
    fn test_keyword_checks_each_field() {
        let draft = ContentDraft {
            body: "Our NRL tips".to_string(),
            seo_description: "nrl".to_string(),
            focus_keyword: Some("NRL".to_string()),
            ..Default::default()
        };
        let report = SeoScorer::default().report(&draft);
        let keyword = &report.checks[2];
        assert_eq!(keyword.signal, SeoSignal::FocusKeyword);
        assert_eq!(keyword.points, 15);
        assert!(keyword.message.contains("title"));
    }

    #[test]
    fn test_body_tiers() {
        let body_score = |n: usize| {
            score(&ContentDraft {
                body: words(n),
                ..Default::default()
            })
        };
        assert_eq!(body_score(0), 0);
        assert_eq!(body_score(299), 0);
        assert_eq!(body_score(300), 10);
        assert_eq!(body_score(500), 15);
        assert_eq!(body_score(799), 15);
        assert_eq!(body_score(800), 20);
    }

    #[test]
    fn test_image_and_alt() {
        let with_image = ContentDraft {
            featured_image_url: Some("https://cdn.example.com/a.jpg".to_string()),
            ..Default::default()
        };
        assert_eq!(score(&with_image), 5);

        let with_alt = ContentDraft {
            featured_image_alt: Some("alt".to_string()),
            ..with_image.clone()
        };
        assert_eq!(score(&with_alt), 10);

        let alt_only = ContentDraft {
            featured_image_alt: Some("alt".to_string()),
            ..Default::default()
        };
        assert_eq!(score(&alt_only), 0);
    }

    #[test]
    fn test_excerpt_threshold() {
        let excerpt_score = |len: usize| {
            score(&ContentDraft {
                excerpt: "e".repeat(len),
                ..Default::default()
            })
        };
        assert_eq!(excerpt_score(99), 0);
        assert_eq!(excerpt_score(100), 10);
    }

    #[test]
    fn test_lengths_count_characters_not_bytes() {
        // 30 two-byte characters
        let draft = ContentDraft {
            title: "é".repeat(30),
            ..Default::default()
        };
        assert_eq!(score(&draft), 20);
    }

    #[test]
    fn test_custom_weights_clamped() {
        let weights = SeoWeights {
            excerpt_points: 90,
            ..Default::default()
        };
        let scorer = SeoScorer::new(weights);
        let mut draft = full_draft();
        draft.excerpt = "e".repeat(150);
        assert_eq!(scorer.score(&draft), 100);
        assert_eq!(scorer.weights().excerpt_points, 90);
    }

    #[test]
    fn test_report_lists_every_signal() {
        let report = SeoScorer::default().report(&ContentDraft::default());
        let signals: Vec<_> = report.checks.iter().map(|c| c.signal).collect();
        assert_eq!(
            signals,
            vec![
                SeoSignal::Title,
                SeoSignal::Description,
                SeoSignal::FocusKeyword,
                SeoSignal::ContentLength,
                SeoSignal::FeaturedImage,
                SeoSignal::Excerpt,
            ]
        );
        let max: u32 = report.checks.iter().map(|c| c.max_points).sum();
        assert_eq!(max, 100);
    }

    fn arb_draft() -> impl Strategy<Value = ContentDraft> {
        (
            ".{0,80}",
            ".{0,400}",
            ".{0,200}",
            ".{0,200}",
            proptest::option::of(".{0,12}"),
            proptest::option::of(".{0,30}"),
            proptest::option::of(".{0,30}"),
        )
            .prop_map(|(title, body, excerpt, desc, kw, url, alt)| ContentDraft {
                title,
                body,
                excerpt,
                seo_description: desc,
                focus_keyword: kw,
                featured_image_url: url,
                featured_image_alt: alt,
            })
    }

    proptest! {
        #[test]
        fn prop_score_bounded(draft in arb_draft()) {
            let s = score(&draft);
            prop_assert!(s <= 100);
        }

        #[test]
        fn prop_more_words_never_lowers_score(draft in arb_draft(), extra in 0usize..1200) {
            let before = score(&draft);
            let mut longer = draft.clone();
            longer.body.push(' ');
            longer.body.push_str(&words(extra));
            prop_assert!(score(&longer) >= before);
        }

        #[test]
        fn prop_adding_image_and_alt_never_lowers_score(draft in arb_draft()) {
            let before = score(&draft);
            let mut with_image = draft.clone();
            with_image.featured_image_url = Some("https://cdn.example.com/a.jpg".to_string());
            let mid = score(&with_image);
            with_image.featured_image_alt = Some("alt".to_string());
            prop_assert!(mid >= before);
            prop_assert!(score(&with_image) >= mid);
        }

        #[test]
        fn prop_longer_excerpt_never_lowers_score(draft in arb_draft(), extra in 0usize..200) {
            let before = score(&draft);
            let mut longer = draft.clone();
            longer.excerpt.push_str(&"e".repeat(extra));
            prop_assert!(score(&longer) >= before);
        }
    }
}
