/// Code-execution budget for one conversation attempt.
///
/// Owned by the dispatcher of that attempt, so a fresh attempt always
/// starts from zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionQuota {
    max: usize,
    used: usize,
}

impl ExecutionQuota {
    pub fn new(max: usize) -> Self {
        Self { max, used: 0 }
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max
    }

    /// Count one dispatched execution
    pub fn record(&mut self) {
        self.used += 1;
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn remaining(&self) -> usize {
        self.max.saturating_sub(self.used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_exhausts_at_max() {
        let mut quota = ExecutionQuota::new(2);
        assert!(!quota.is_exhausted());
        quota.record();
        assert_eq!(quota.remaining(), 1);
        quota.record();
        assert!(quota.is_exhausted());
        assert_eq!(quota.used(), 2);
    }

    #[test]
    fn test_zero_quota_starts_exhausted() {
        assert!(ExecutionQuota::new(0).is_exhausted());
    }
}
