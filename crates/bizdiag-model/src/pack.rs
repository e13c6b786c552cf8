use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Category of uploaded data.
///
/// Variant order is the precedence used when two packs supply the same field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PackType {
    #[serde(rename = "PNL", alias = "pnl")]
    Pnl,
    #[serde(rename = "REVENUE", alias = "revenue")]
    Revenue,
    #[serde(rename = "LABOR", alias = "labor")]
    Labor,
}

impl PackType {
    pub const ALL: [PackType; 3] = [PackType::Pnl, PackType::Revenue, PackType::Labor];

    pub fn as_str(self) -> &'static str {
        match self {
            PackType::Pnl => "PNL",
            PackType::Revenue => "REVENUE",
            PackType::Labor => "LABOR",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PackType::Pnl => "P&L",
            PackType::Revenue => "Revenue",
            PackType::Labor => "Labor",
        }
    }
}

impl fmt::Display for PackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PNL" | "P&L" | "PL" => Ok(PackType::Pnl),
            "REVENUE" | "SALES" => Ok(PackType::Revenue),
            "LABOR" | "LABOUR" | "PAYROLL" => Ok(PackType::Labor),
            _ => Err(ModelError::UnknownPack(s.to_string())),
        }
    }
}
