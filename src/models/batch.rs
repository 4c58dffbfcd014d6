use super::candidate::{Candidate, Outcome};
use std::fmt;
use std::time::Duration;

/// Terminal outcomes of one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub items: Vec<Candidate>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchCounts {
    pub transformed: usize,
    /// Transformed, but at least one stage failed along the way.
    pub degraded: usize,
    pub copied: usize,
    pub failed: usize,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn counts(&self) -> BatchCounts {
        let mut counts = BatchCounts::default();
        for item in &self.items {
            match &item.outcome {
                Outcome::Transformed(report) => {
                    counts.transformed += 1;
                    if !report.is_clean() {
                        counts.degraded += 1;
                    }
                }
                Outcome::Copied => counts.copied += 1,
                Outcome::Failed(_) | Outcome::Pending => counts.failed += 1,
            }
        }
        counts
    }

    pub fn outcome_of(&self, name: &str) -> Option<&Outcome> {
        self.items
            .iter()
            .find(|item| item.name == name)
            .map(|item| &item.outcome)
    }
}

impl fmt::Display for BatchCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} transformed ({} degraded), {} copied, {} failed",
            self.transformed, self.degraded, self.copied, self.failed
        )
    }
}

/// Whole seconds from one second up, milliseconds below.
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis > 1000 {
        format!("{}s", (millis as f64 / 1000.0).round() as u64)
    } else {
        format!("{}ms", millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::{StageReport, WatermarkStatus};

    fn item(name: &str, outcome: Outcome) -> Candidate {
        Candidate {
            name: name.to_string(),
            mime: None,
            outcome,
        }
    }

    #[test]
    fn test_counts_by_outcome() {
        let result = BatchResult {
            items: vec![
                item(
                    "a.jpg",
                    Outcome::Transformed(StageReport {
                        resized: true,
                        watermark: WatermarkStatus::Applied,
                    }),
                ),
                item(
                    "b.jpg",
                    Outcome::Transformed(StageReport {
                        resized: false,
                        watermark: WatermarkStatus::Disabled,
                    }),
                ),
                item("c.txt", Outcome::Copied),
                item("d.png", Outcome::Failed("corrupt".to_string())),
            ],
            elapsed: Duration::from_millis(5),
        };

        let counts = result.counts();
        assert_eq!(
            counts,
            BatchCounts {
                transformed: 2,
                degraded: 1,
                copied: 1,
                failed: 1,
            }
        );
        assert_eq!(
            counts.to_string(),
            "2 transformed (1 degraded), 1 copied, 1 failed"
        );
        assert_eq!(result.outcome_of("c.txt"), Some(&Outcome::Copied));
        assert_eq!(result.outcome_of("zzz"), None);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(250)), "250ms");
        assert_eq!(format_elapsed(Duration::from_millis(1000)), "1000ms");
        assert_eq!(format_elapsed(Duration::from_millis(1499)), "1s");
        assert_eq!(format_elapsed(Duration::from_millis(2500)), "3s");
    }
}
