//! Ticker-to-group classification for linear uploads.
//!
//! Groups are assigned by an ordered list of substring rules with a fallback
//! label, so the policy can be swapped or tested in isolation instead of
//! living in the upload handler.

/// One classification rule: first rule whose needle occurs in the ticker wins.
#[derive(Debug, Clone)]
pub struct GroupRule {
    pub contains: String,
    pub label: String,
}

impl GroupRule {
    pub fn new(contains: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            contains: contains.into(),
            label: label.into(),
        }
    }
}

/// Ordered substring-rule classifier with a fallback group.
#[derive(Debug, Clone)]
pub struct GroupClassifier {
    rules: Vec<GroupRule>,
    fallback: String,
}

impl GroupClassifier {
    pub fn new(rules: Vec<GroupRule>, fallback: impl Into<String>) -> Self {
        Self {
            rules,
            fallback: fallback.into(),
        }
    }

    /// Label for a ticker: rules are checked in order, the fallback applies
    /// when none match.
    pub fn classify(&self, ticker: &str) -> &str {
        self.rules
            .iter()
            .find(|rule| ticker.contains(&rule.contains))
            .map(|rule| rule.label.as_str())
            .unwrap_or(&self.fallback)
    }
}

impl Default for GroupClassifier {
    /// The fuel-ticker policy: "95" and "92" petrol grades, "ДТ" diesel,
    /// everything else "Other".
    fn default() -> Self {
        Self::new(
            vec![
                GroupRule::new("95", "95"),
                GroupRule::new("92", "92"),
                GroupRule::new("ДТ", "ДТ"),
            ],
            "Other",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let classifier = GroupClassifier::default();
        assert_eq!(classifier.classify("AI95"), "95");
        assert_eq!(classifier.classify("AI-92-K5"), "92");
        assert_eq!(classifier.classify("ДТ-Л"), "ДТ");
        assert_eq!(classifier.classify("GAS"), "Other");
    }

    #[test]
    fn test_rules_apply_in_order() {
        // A ticker matching several needles takes the first rule.
        let classifier = GroupClassifier::default();
        assert_eq!(classifier.classify("AI9592"), "95");
    }

    #[test]
    fn test_custom_policy() {
        let classifier = GroupClassifier::new(
            vec![GroupRule::new("BTC", "crypto")],
            "equity",
        );
        assert_eq!(classifier.classify("BTCUSDT"), "crypto");
        assert_eq!(classifier.classify("VCB"), "equity");
    }
}
