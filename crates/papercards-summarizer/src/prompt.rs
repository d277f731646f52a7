//! Prompt construction for flashcard summaries.

/// Characters of paper text sent to the model.
pub const SNIPPET_CHARS: usize = 1500;

/// Build the user prompt for one paper.
pub fn build_prompt(title: &str, content: &str) -> String {
  let snippet: String = content.chars().take(SNIPPET_CHARS).collect();
  format!(
    "You are summarizing an arXiv paper into a concise flashcard.\n\
     Title: {title}\n\
     Text snippet:\n\
     {snippet}\n\n\
     Respond with a JSON object with the keys \"headline\" (at most 12 words), \
     \"insight\" (1-2 sentences) and \"why_it_matters\" (one short sentence)."
  )
}
