//! Box counter shared by every item of an order

use serde::{Deserialize, Serialize};

use crate::Violation;

/// Total physical shipping boxes. Zero means not entered yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoxCount(u32);

impl BoxCount {
    pub const FIELD: &'static str = "box_count";

    pub fn new(count: u32) -> Self {
        Self(count)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_set(self) -> bool {
        self.0 > 0
    }

    /// Checked at submission only; the value may be edited freely before.
    pub fn validate(self) -> Option<Violation> {
        (!self.is_set()).then(|| Violation::BoxCountRequired {
            field: Self::FIELD.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_required() {
        assert_eq!(
            BoxCount::default().validate(),
            Some(Violation::BoxCountRequired {
                field: "box_count".to_string()
            })
        );
        assert_eq!(BoxCount::new(3).validate(), None);
    }
}
