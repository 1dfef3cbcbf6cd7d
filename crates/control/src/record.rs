/// Cached `(min, max, def)` of a control, as returned by `obtain_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlLimits {
    pub min: i32,
    pub max: i32,
    pub def: i32,
}

/// Per-control cache entry. `min == 0 && max == 0` means "not fetched yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlRecord {
    pub min: i32,
    pub max: i32,
    pub def: i32,
    pub current: Option<i32>,
}

impl ControlRecord {
    pub fn is_populated(&self) -> bool {
        self.min != 0 || self.max != 0
    }

    pub fn limits(&self) -> ControlLimits {
        ControlLimits {
            min: self.min,
            max: self.max,
            def: self.def,
        }
    }

    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min.min(self.max), self.max.max(self.min))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_and_clamp() {
        let mut record = ControlRecord::default();
        assert!(!record.is_populated(), "Zeroed record is the unfetched sentinel");

        record.min = -10;
        record.max = 10;
        assert!(record.is_populated());
        assert_eq!(record.clamp(-11), -10);
        assert_eq!(record.clamp(11), 10);
        assert_eq!(record.clamp(3), 3);
    }
}
