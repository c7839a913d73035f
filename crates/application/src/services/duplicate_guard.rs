//! Fuzzy duplicate detection against existing calendar titles

/// Normalize an event title for comparison
///
/// Lowercases, strips leading decoration (emoji, bullets, brackets) and
/// collapses runs of whitespace.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let stripped = lowered.trim_start_matches(|c: char| !c.is_alphanumeric());
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized titles of events already on the calendar
#[derive(Debug, Clone, Default)]
pub struct CalendarTitleSet {
    titles: Vec<String>,
}

impl CalendarTitleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw calendar titles
    pub fn from_titles<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for title in titles {
            set.insert(title.as_ref());
        }
        set
    }

    /// Add a raw title; blank titles are ignored
    pub fn insert(&mut self, title: &str) {
        let normalized = normalize_title(title);
        if !normalized.is_empty() && !self.titles.contains(&normalized) {
            self.titles.push(normalized);
        }
    }

    /// Remove a raw title previously inserted
    pub fn remove(&mut self, title: &str) {
        let normalized = normalize_title(title);
        self.titles.retain(|t| *t != normalized);
    }

    /// Whether `title` duplicates an existing one
    ///
    /// Two titles match when either normalized form contains the other. An
    /// empty title never matches.
    pub fn matches(&self, title: &str) -> bool {
        let candidate = normalize_title(title);
        if candidate.is_empty() {
            return false;
        }
        self.titles
            .iter()
            .any(|existing| existing.contains(&candidate) || candidate.contains(existing.as_str()))
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}
