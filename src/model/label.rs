//! The closed label vocabulary.

use serde::{Deserialize, Serialize};

/// Class assigned to a span by the weak labeler or the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "title")]
    Title,
    H1,
    H2,
    H3,
    H4,
    #[serde(rename = "body")]
    Body,
}

impl Label {
    /// Every label, in encoder order.
    pub const ALL: [Label; 6] = [
        Label::Title,
        Label::H1,
        Label::H2,
        Label::H3,
        Label::H4,
        Label::Body,
    ];

    /// Name used in the corpus file and in JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Title => "title",
            Label::H1 => "H1",
            Label::H2 => "H2",
            Label::H3 => "H3",
            Label::H4 => "H4",
            Label::Body => "body",
        }
    }

    /// Parse a label name; heading levels are case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "title" | "Title" | "TITLE" => Some(Label::Title),
            "body" | "Body" | "BODY" => Some(Label::Body),
            "H1" | "h1" => Some(Label::H1),
            "H2" | "h2" => Some(Label::H2),
            "H3" | "h3" => Some(Label::H3),
            "H4" | "h4" => Some(Label::H4),
            _ => None,
        }
    }

    /// Heading label for a one-based heading rank (1 → H1 … 4 → H4).
    pub fn heading(rank: usize) -> Option<Self> {
        match rank {
            1 => Some(Label::H1),
            2 => Some(Label::H2),
            3 => Some(Label::H3),
            4 => Some(Label::H4),
            _ => None,
        }
    }

    /// Whether this is one of the H1–H4 levels.
    pub fn is_heading(&self) -> bool {
        matches!(self, Label::H1 | Label::H2 | Label::H3 | Label::H4)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_names() {
        for label in Label::ALL {
            assert_eq!(Label::parse(label.as_str()), Some(label));
        }
        assert_eq!(Label::parse("h2"), Some(Label::H2));
        assert_eq!(Label::parse("H5"), None);
    }

    #[test]
    fn test_label_serde_names() {
        let json = serde_json::to_string(&[Label::Title, Label::H3, Label::Body]).unwrap();
        assert_eq!(json, r#"["title","H3","body"]"#);
    }

    #[test]
    fn test_heading_rank() {
        assert_eq!(Label::heading(1), Some(Label::H1));
        assert_eq!(Label::heading(4), Some(Label::H4));
        assert_eq!(Label::heading(5), None);
        assert!(Label::H4.is_heading());
        assert!(!Label::Title.is_heading());
        assert!(!Label::Body.is_heading());
    }
}
