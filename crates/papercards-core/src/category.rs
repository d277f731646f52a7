//! The fixed domain of subject tags flashcards are grouped by.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator as _};

use crate::{Error, Result};

/// An arXiv-style subject category. Part of every flashcard's identity.
///
/// The string form is the arXiv tag itself and is matched case-sensitively.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  AsRefStr,
)]
pub enum Category {
  #[serde(rename = "cs.AI")]
  #[strum(to_string = "cs.AI")]
  CsAi,
  #[serde(rename = "cs.LG")]
  #[strum(to_string = "cs.LG")]
  CsLg,
  #[serde(rename = "cs.CL")]
  #[strum(to_string = "cs.CL")]
  CsCl,
  #[serde(rename = "cs.CV")]
  #[strum(to_string = "cs.CV")]
  CsCv,
  #[serde(rename = "cs.IR")]
  #[strum(to_string = "cs.IR")]
  CsIr,
  #[serde(rename = "stat.ML")]
  #[strum(to_string = "stat.ML")]
  StatMl,
}

impl Category {
  /// Parse a tag string, mapping anything outside the domain to
  /// [`Error::UnknownCategory`].
  pub fn parse(tag: &str) -> Result<Self> {
    tag
      .parse()
      .map_err(|_| Error::UnknownCategory(tag.to_owned()))
  }

  /// Every category in declaration order.
  pub fn all() -> Vec<Self> { Self::iter().collect() }

  pub fn as_tag(&self) -> &str { self.as_ref() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_and_displays_arxiv_tags() {
    for category in Category::all() {
      let tag = category.to_string();
      assert_eq!(Category::parse(&tag).unwrap(), category);
      assert_eq!(category.as_tag(), tag);
    }
    assert_eq!(Category::parse("stat.ML").unwrap(), Category::StatMl);
  }

  #[test]
  fn rejects_unknown_and_miscased_tags() {
    assert!(matches!(
      Category::parse("physics.optics"),
      Err(Error::UnknownCategory(t)) if t == "physics.optics"
    ));
    assert!(Category::parse("cs.ai").is_err());
    assert!(Category::parse("").is_err());
  }

  #[test]
  fn serde_uses_the_tag_string() {
    let json = serde_json::to_string(&Category::CsLg).unwrap();
    assert_eq!(json, "\"cs.LG\"");
    let back: Category = serde_json::from_str("\"cs.CV\"").unwrap();
    assert_eq!(back, Category::CsCv);
  }

  #[test]
  fn domain_has_six_categories() {
    assert_eq!(Category::all().len(), 6);
  }
}
