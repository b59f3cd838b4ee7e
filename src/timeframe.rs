//! The higher timeframes the swing detector and downstream consumers share.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum Htf {
    H1,
    H4,
}

impl Htf {
    /// Nominal bar duration in milliseconds, used to convert the age of a
    /// `KeyLevel` into "bars ago" for C6's recency score.
    pub fn bar_duration_ms(self) -> i64 {
        match self {
            Htf::H1 => 3_600_000,
            Htf::H4 => 14_400_000,
        }
    }
}
