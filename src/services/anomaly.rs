/// Tab-switch violations at or past this count force submission.
pub const TAB_VIOLATION_THRESHOLD: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationVerdict {
    /// Persist the count and warn the client.
    Warn(i32),
    /// Auto-submit the attempt and flag it for human review.
    ForceSubmit,
}

/// Counts suspicious client events (tab/window blur) per attempt and decides
/// when the attempt must be force-finalized.
#[derive(Debug, Clone, Copy)]
pub struct AnomalyDetector {
    threshold: i32,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self {
            threshold: TAB_VIOLATION_THRESHOLD,
        }
    }
}

impl AnomalyDetector {
    #[cfg(test)]
    pub fn with_threshold(threshold: i32) -> Self {
        Self { threshold }
    }

    pub fn assess(&self, violation_count: i32) -> ViolationVerdict {
        if violation_count >= self.threshold {
            ViolationVerdict::ForceSubmit
        } else {
            ViolationVerdict::Warn(violation_count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_warns_with_count() {
        let detector = AnomalyDetector::default();
        assert_eq!(detector.assess(1), ViolationVerdict::Warn(1));
        assert_eq!(detector.assess(3), ViolationVerdict::Warn(3));
    }

    #[test]
    fn threshold_forces_submit() {
        let detector = AnomalyDetector::default();
        assert_eq!(detector.assess(4), ViolationVerdict::ForceSubmit);
        assert_eq!(detector.assess(7), ViolationVerdict::ForceSubmit);
    }

    #[test]
    fn custom_threshold_is_respected() {
        let detector = AnomalyDetector::with_threshold(2);
        assert_eq!(detector.assess(1), ViolationVerdict::Warn(1));
        assert_eq!(detector.assess(2), ViolationVerdict::ForceSubmit);
    }
}
