//! Text helpers shared by speech generation and judgment parsing.

use std::sync::LazyLock;

use regex::Regex;

/// Reasoning/internal tags some models wrap around their scratch work.
const REASONING_TAGS: &[&str] = &[
    "thinking",
    "think",
    "reflection",
    "reflect",
    "internal",
    "reasoning",
    "thought",
    "scratchpad",
];

static REASONING_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    REASONING_TAGS
        .iter()
        .filter_map(|tag| Regex::new(&format!(r"(?is)<{tag}[^>]*>.*?</{tag}>", tag = tag)).ok())
        .collect()
});

/// Remove `<think>...</think>`-style blocks and trim the result.
///
/// Other markup is left untouched: debate text and judge JSON are stored as
/// the model wrote them.
pub fn strip_reasoning(response: &str) -> String {
    let mut result = response.to_string();
    for re in REASONING_BLOCKS.iter() {
        result = re.replace_all(&result, "").into_owned();
    }
    result.trim().to_string()
}

/// Whitespace-delimited word count.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
