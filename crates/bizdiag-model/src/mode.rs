use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pack::PackType;

/// Confidence tier of a run. Ordering follows precedence: `Pnl` is highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OperatingMode {
    #[serde(rename = "DIRECTIONAL_MODE", alias = "DIRECTIONAL")]
    Directional,
    #[serde(rename = "OPS_MODE", alias = "OPS")]
    Ops,
    #[serde(rename = "PNL_MODE", alias = "PNL")]
    Pnl,
}

impl OperatingMode {
    /// Highest precedence first.
    pub const BY_PRECEDENCE: [OperatingMode; 3] = [
        OperatingMode::Pnl,
        OperatingMode::Ops,
        OperatingMode::Directional,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperatingMode::Pnl => "PNL_MODE",
            OperatingMode::Ops => "OPS_MODE",
            OperatingMode::Directional => "DIRECTIONAL_MODE",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeAssessment {
    pub mode: OperatingMode,
    pub confidence: f64,
    pub months_available: usize,
    pub completeness: f64,
    pub packs_present: Vec<PackType>,
    pub reasons: Vec<String>,
}

impl ModeAssessment {
    pub fn has_pack(&self, pack: PackType) -> bool {
        self.packs_present.contains(&pack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_matches_ordering() {
        assert!(OperatingMode::Pnl > OperatingMode::Ops);
        assert!(OperatingMode::Ops > OperatingMode::Directional);
        let mut sorted = OperatingMode::BY_PRECEDENCE.to_vec();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(sorted, OperatingMode::BY_PRECEDENCE.to_vec());
    }

    #[test]
    fn accepts_short_aliases() {
        let mode: OperatingMode = serde_json::from_str("\"OPS\"").unwrap();
        assert_eq!(mode, OperatingMode::Ops);
        assert_eq!(serde_json::to_string(&mode).unwrap(), "\"OPS_MODE\"");
    }
}
