use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Closed set of review-comment categories. Comment text the classifier
/// cannot place lands in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentCategory {
    Audio,
    Subtitle,
    Cut,
    Font,
    Color,
    Timing,
    Logo,
    Cta,
    Footage,
    Other,
}

impl CommentCategory {
    pub const ALL: [CommentCategory; 10] = [
        CommentCategory::Audio,
        CommentCategory::Subtitle,
        CommentCategory::Cut,
        CommentCategory::Font,
        CommentCategory::Color,
        CommentCategory::Timing,
        CommentCategory::Logo,
        CommentCategory::Cta,
        CommentCategory::Footage,
        CommentCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommentCategory::Audio => "audio",
            CommentCategory::Subtitle => "subtitle",
            CommentCategory::Cut => "cut",
            CommentCategory::Font => "font",
            CommentCategory::Color => "color",
            CommentCategory::Timing => "timing",
            CommentCategory::Logo => "logo",
            CommentCategory::Cta => "cta",
            CommentCategory::Footage => "footage",
            CommentCategory::Other => "other",
        }
    }
}

/// The categorization collaborator. The pipeline only consumes category
/// counts, so anything that can label a comment string plugs in here.
pub trait CommentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> CommentCategory;
}

/// Keyword-table classifier over the review vocabulary the team actually
/// uses (Portuguese with the usual English loanwords). Checked in order, so
/// "corte" wins before the shorter "cor" can shadow it.
#[derive(Debug, Default, Clone)]
pub struct KeywordClassifier;

const CATEGORY_KEYWORDS: &[(&[&str], CommentCategory)] = &[
    (
        &["áudio", "audio", "som ", "trilha", "volume"],
        CommentCategory::Audio,
    ),
    (&["legenda", "subtitle"], CommentCategory::Subtitle),
    (&["corte", "cortar", "cortes"], CommentCategory::Cut),
    (&["fonte", "tipografia", "font"], CommentCategory::Font),
    (&["timing", "ritmo", "sincron", "lento", "rápido"], CommentCategory::Timing),
    (&["logo", "logotipo", "marca d"], CommentCategory::Logo),
    (&["cta", "call to action"], CommentCategory::Cta),
    (&["footage", "b-roll", "broll", "imagem"], CommentCategory::Footage),
    (&["cor ", "cores", "colorir", "color"], CommentCategory::Color),
];

impl CommentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> CommentCategory {
        let lower = text.to_lowercase();
        // Trailing space in padded keywords ("som ", "cor ") needs a word
        // boundary at end-of-string too.
        let padded = format!("{lower} ");
        for (keywords, category) in CATEGORY_KEYWORDS {
            if keywords.iter().any(|k| padded.contains(k)) {
                return *category;
            }
        }
        CommentCategory::Other
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub category: CommentCategory,
    pub count: u64,
    /// Share of all comments, 0–100.
    pub pct: f64,
}

/// Per-category counts and percentages over a set of comments.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedbackCounts {
    pub total: u64,
    pub categories: Vec<CategoryCount>,
}

/// Aggregate classified comments into counts. Every category is present in
/// the output, zero-count ones included, in the fixed category order.
pub fn count_categories<'a, I>(texts: I, classifier: &dyn CommentClassifier) -> FeedbackCounts
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<CommentCategory, u64> = HashMap::new();
    let mut total = 0u64;
    for text in texts {
        *counts.entry(classifier.classify(text)).or_insert(0) += 1;
        total += 1;
    }

    let categories = CommentCategory::ALL
        .iter()
        .map(|category| {
            let count = counts.get(category).copied().unwrap_or(0);
            let pct = if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            CategoryCount {
                category: *category,
                count,
                pct,
            }
        })
        .collect();

    FeedbackCounts { total, categories }
}

/// In-process memo of per-task feedback counts. Owned by the pipeline
/// context rather than living in module-level state, so independent runs
/// never share entries. Entries expire after `max_age`.
#[derive(Debug)]
pub struct FeedbackCache {
    max_age: Duration,
    entries: HashMap<String, (Instant, FeedbackCounts)>,
}

impl FeedbackCache {
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, task_id: &str) -> Option<FeedbackCounts> {
        let (stored_at, counts) = self.entries.get(task_id)?;
        if stored_at.elapsed() > self.max_age {
            return None;
        }
        Some(counts.clone())
    }

    pub fn insert(&mut self, task_id: &str, counts: FeedbackCounts) {
        self.entries
            .insert(task_id.to_string(), (Instant::now(), counts));
    }

    /// Drop expired entries (housekeeping between syncs).
    pub fn evict_stale(&mut self) {
        let max_age = self.max_age;
        self.entries.retain(|_, (at, _)| at.elapsed() <= max_age);
    }
}
