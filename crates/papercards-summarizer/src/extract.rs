//! Turning a model completion into flashcard text fields.
//!
//! Models do not reliably honour the requested JSON shape, so every field has
//! a fallback derived from the free-text `answer`.

use serde_json::{Map, Value};

const HEADLINE_WORDS: usize = 12;
const INSIGHT_SENTENCES: usize = 2;
const WHY_MAX_CHARS: usize = 240;

const LABELS: &[&str] =
  &["headline:", "insight:", "why it matters:", "why it matters"];

/// The text fields extracted from one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
  pub headline:       String,
  pub insight:        String,
  pub why_it_matters: Option<String>,
}

/// Parse completion text into a JSON object. Markdown code fences are
/// tolerated; anything that is not a JSON object becomes `{"answer": text}`.
pub fn parse_completion(text: &str) -> Map<String, Value> {
  let trimmed = strip_fences(text.trim());
  match serde_json::from_str::<Value>(trimmed) {
    Ok(Value::Object(map)) => map,
    _ => {
      let mut map = Map::new();
      map.insert("answer".into(), Value::String(text.trim().to_owned()));
      map
    }
  }
}

/// Extract the flashcard fields, or `None` if the completion holds no words.
pub fn extract(parsed: &Map<String, Value>) -> Option<Extracted> {
  let field = |key: &str| {
    parsed
      .get(key)
      .and_then(Value::as_str)
      .map(clean_text)
      .filter(|s| !s.is_empty())
  };

  let answer = field("answer")
    .or_else(|| field("insight"))
    .unwrap_or_default();

  let headline = field("headline").unwrap_or_else(|| first_words(&answer, HEADLINE_WORDS));
  if headline.is_empty() {
    return None;
  }

  let insight = field("insight").unwrap_or_else(|| insight_from(&answer, &headline));
  if insight.is_empty() {
    return None;
  }

  let why_it_matters = field("why_it_matters")
    .or_else(|| field("answer"))
    .filter(|why| {
      !why.eq_ignore_ascii_case(&insight) && !why.eq_ignore_ascii_case(&headline)
    })
    .map(|why| truncate_chars(&why, WHY_MAX_CHARS));

  Some(Extracted { headline, insight, why_it_matters })
}

/// Strip markdown emphasis and a leading field label, and collapse
/// whitespace.
pub fn clean_text(text: &str) -> String {
  let mut cleaned = text.replace("**", "").replace('\n', " ");
  cleaned = cleaned.trim().to_owned();
  for label in LABELS {
    if let Some(rest) = strip_prefix_ignore_case(&cleaned, label) {
      cleaned = rest.trim_matches(|c: char| c == ' ' || c == '-' || c == ':').to_owned();
    }
  }
  cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_words(text: &str, n: usize) -> String {
  text.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

/// The first sentences of `answer` once a repeated headline is removed.
fn insight_from(answer: &str, headline: &str) -> String {
  let body = strip_prefix_ignore_case(answer, headline)
    .map(|rest| rest.trim_start_matches(|c: char| c == ' ' || c == '.' || c == '-' || c == ':'))
    .filter(|rest| !rest.is_empty())
    .unwrap_or(answer);

  body
    .split(". ")
    .take(INSIGHT_SENTENCES)
    .collect::<Vec<_>>()
    .join(". ")
    .trim()
    .to_owned()
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
  let head = text.get(..prefix.len())?;
  head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

fn strip_fences(text: &str) -> &str {
  let Some(inner) = text.strip_prefix("```") else {
    return text;
  };
  let inner = inner.strip_prefix("json").unwrap_or(inner);
  inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn truncate_chars(text: &str, max: usize) -> String { text.chars().take(max).collect() }
