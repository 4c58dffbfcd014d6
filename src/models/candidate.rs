/// What happened to a watermark stage for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkStatus {
    Disabled,
    Applied,
    Failed,
}

/// Per-stage results of a transformed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    pub resized: bool,
    pub watermark: WatermarkStatus,
}

impl StageReport {
    pub fn is_clean(&self) -> bool {
        self.resized && self.watermark != WatermarkStatus::Failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    /// Not an image; copied through verbatim.
    Copied,
    Transformed(StageReport),
    Failed(String),
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

/// A file found in the input folder that has no counterpart in the output
/// folder yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    /// Filled in by the classifier; `None` until then or when unrecognised.
    pub mime: Option<&'static str>,
    pub outcome: Outcome,
}

impl Candidate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            outcome: Outcome::Pending,
        }
    }
}

/// Candidates selected for a single batch run, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkSet {
    candidates: Vec<Candidate>,
}

impl WorkSet {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.name.as_str())
    }
}

impl FromIterator<String> for WorkSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            candidates: iter.into_iter().map(Candidate::new).collect(),
        }
    }
}

impl IntoIterator for WorkSet {
    type Item = Candidate;
    type IntoIter = std::vec::IntoIter<Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.into_iter()
    }
}
