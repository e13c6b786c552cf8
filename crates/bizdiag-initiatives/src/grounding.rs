//! Numbers in collaborator prose must come from the request.
//!
//! Every number the collaborator was shown is grounded, and values between
//! -1 and 1 are also grounded as percentages. A number in draft text that
//! rounds from none of them is rejected. Bare single digits and day counts
//! pass unchecked.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

fn number_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?P<number>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)(?P<days>\s*day(?:s\b|\(s\)|\b))?",
        )
        .ok()
    })
    .as_ref()
}

#[derive(Debug, Clone, Copy)]
struct Quoted<'a> {
    raw: &'a str,
    value: f64,
    decimals: i32,
    days: bool,
}

impl Quoted<'_> {
    fn is_exempt(&self) -> bool {
        self.days || (self.decimals == 0 && self.raw.len() == 1)
    }
}

fn quoted_numbers(text: &str) -> impl Iterator<Item = Quoted<'_>> {
    let captures = number_pattern()
        .into_iter()
        .flat_map(move |pattern| pattern.captures_iter(text));
    captures.filter_map(|captures| {
        let raw = captures.name("number")?.as_str();
        let value = raw
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())?;
        let decimals = raw
            .split_once('.')
            .map_or(0, |(_, fraction)| i32::try_from(fraction.len()).unwrap_or(i32::MAX));
        Some(Quoted {
            raw,
            value,
            decimals,
            days: captures.name("days").is_some(),
        })
    })
}

/// Values a draft may quote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundedNumbers {
    values: Vec<f64>,
}

impl GroundedNumbers {
    /// Every number in a request payload, including numbers inside strings
    /// such as periods and labels.
    pub fn from_json(payload: &Value) -> Self {
        let mut grounded = Self::default();
        grounded.collect(payload);
        grounded
    }

    fn collect(&mut self, value: &Value) {
        match value {
            Value::Number(number) => {
                if let Some(number) = number.as_f64() {
                    self.push(number);
                }
            }
            Value::String(text) => {
                for quoted in quoted_numbers(text) {
                    self.push(quoted.value);
                }
            }
            Value::Array(items) => items.iter().for_each(|item| self.collect(item)),
            Value::Object(fields) => fields.values().for_each(|item| self.collect(item)),
            Value::Null | Value::Bool(_) => {}
        }
    }

    fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        let value = value.abs();
        self.values.push(value);
        if value <= 1.0 {
            self.values.push(value * 100.0);
        }
    }

    /// True when some grounded value rounds to `quoted` at `decimals` places.
    fn grounds(&self, quoted: f64, decimals: i32) -> bool {
        let tolerance = 0.5 * 10f64.powi(-decimals) + 1e-9;
        self.values
            .iter()
            .any(|value| (value - quoted).abs() <= tolerance)
    }

    /// Numbers written in `text` that nothing grounds, in order of appearance.
    pub fn ungrounded<'a>(&self, text: &'a str) -> Vec<&'a str> {
        quoted_numbers(text)
            .filter(|quoted| !quoted.is_exempt())
            .filter(|quoted| !self.grounds(quoted.value, quoted.decimals))
            .map(|quoted| quoted.raw)
            .collect()
    }
}
