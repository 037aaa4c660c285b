//! Social media post planner.

use super::TextInput;

pub const DEFAULT_TOPIC: &str = "The 1947 Roswell Incident";

/// How a line of generated ideas is displayed.
///
/// This is deliberately not a markdown parser: only a leading `* ` or `- `
/// marker is recognized, and everything else is shown as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Bullet(&'a str),
    Plain(&'a str),
}

pub fn classify_line(line: &str) -> LineKind<'_> {
    match line.strip_prefix("* ").or_else(|| line.strip_prefix("- ")) {
        Some(rest) => LineKind::Bullet(rest),
        None => LineKind::Plain(line),
    }
}

#[derive(Debug)]
pub struct PlannerView {
    pub topic: TextInput,
    pub ideas: String,
    pub loading: bool,
    pub scroll: u16,
}

impl PlannerView {
    pub fn new() -> Self {
        Self {
            topic: TextInput::with_value(DEFAULT_TOPIC),
            ideas: String::new(),
            loading: false,
            scroll: 0,
        }
    }

    /// Returns the topic to generate for, or `None` if blank or already running
    pub fn begin_generate(&mut self) -> Option<String> {
        if self.loading || self.topic.is_blank() {
            return None;
        }
        self.loading = true;
        self.ideas.clear();
        self.scroll = 0;
        Some(self.topic.value.clone())
    }

    pub fn apply(&mut self, ideas: String) {
        self.ideas = ideas;
        self.loading = false;
    }

    pub fn lines(&self) -> impl Iterator<Item = LineKind<'_>> {
        self.ideas.lines().map(classify_line)
    }
}
