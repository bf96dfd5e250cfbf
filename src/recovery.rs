/// What to do when a recognized error pattern shows up in the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Kill the download, ask the user for fresh cookies, retry once
    PromptForCookies,
}

/// Maps recognized output substrings to recovery actions
///
/// The downloader reports auth walls (age restriction, bot checks) as plain
/// error text. Matching is case-insensitive substring containment; rules
/// are checked in insertion order.
pub struct RecoveryClassifier {
    rules: Vec<(String, RecoveryAction)>,
}

impl RecoveryClassifier {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule; `pattern` is matched case-insensitively
    pub fn with_rule(mut self, pattern: &str, action: RecoveryAction) -> Self {
        self.rules.push((pattern.to_lowercase(), action));
        self
    }

    /// Classify one finished output line
    pub fn classify(&self, line: &str) -> Option<RecoveryAction> {
        let line = line.to_lowercase();
        self.rules
            .iter()
            .find(|(pattern, _)| line.contains(pattern))
            .map(|(_, action)| *action)
    }
}

impl Default for RecoveryClassifier {
    fn default() -> Self {
        Self::new()
            .with_rule("sign in to confirm your age", RecoveryAction::PromptForCookies)
            .with_rule("age-restricted", RecoveryAction::PromptForCookies)
            .with_rule(
                "sign in to confirm you're not a bot",
                RecoveryAction::PromptForCookies,
            )
            .with_rule("use --cookies", RecoveryAction::PromptForCookies)
    }
}
