//! Canonical cache keys (spec §4.1, §6) — `namespace:kind:field1:field2:...:vN`.
//!
//! Centralized here so nothing else in the crate builds a key by hand
//! (spec §9 "ambient cache-key construction ... forbid ad-hoc key formation
//! elsewhere").

use std::fmt;

use crate::error::CoreError;

/// A fully-qualified, deterministic cache key. Two `CacheKey`s built from
/// equal inputs always serialize identically (spec §8 property 1).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: String,
    kind: String,
    fields: Vec<String>,
    version: u32,
}

impl CacheKey {
    pub fn new(
        namespace: impl Into<String>,
        kind: impl Into<String>,
        fields: Vec<String>,
        version: u32,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            kind: kind.into(),
            fields,
            version,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// The wire-format string, e.g. `concall:transcript:RELIANCE.NS:Q1:2025:v1`.
    pub fn to_wire(&self) -> String {
        let mut parts = Vec::with_capacity(self.fields.len() + 3);
        parts.push(self.namespace.clone());
        parts.push(self.kind.clone());
        parts.extend(self.fields.iter().cloned());
        parts.push(format!("v{}", self.version));
        parts.join(":")
    }

    /// Parse the wire format back into components.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() < 3 {
            return Err(CoreError::InvalidInput(format!(
                "malformed cache key: '{s}'"
            )));
        }
        let (namespace, rest) = (parts[0], &parts[1..]);
        let (kind, rest) = (rest[0], &rest[1..]);
        let Some((version_part, field_parts)) = rest.split_last() else {
            return Err(CoreError::InvalidInput(format!(
                "malformed cache key: '{s}'"
            )));
        };
        let version = version_part
            .strip_prefix('v')
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| {
                CoreError::InvalidInput(format!("malformed cache key version in '{s}'"))
            })?;
        Ok(CacheKey::new(
            namespace,
            kind,
            field_parts.iter().map(|f| (*f).to_string()).collect(),
            version,
        ))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

/// Quarter tokens, normalized to exactly one of these four (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub fn as_str(self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }

    /// Parse loose inputs (`"q1"`, `"1"`, `"Quarter 1"`) into a canonical
    /// token. Anything else is `InvalidQuarter` (spec §4.1).
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let normalized = input.trim().to_lowercase();
        let digit = normalized
            .chars()
            .filter(char::is_ascii_digit)
            .collect::<String>();

        let candidate = if !digit.is_empty() {
            digit
        } else {
            normalized.clone()
        };

        match candidate.as_str() {
            "1" | "q1" => Ok(Quarter::Q1),
            "2" | "q2" => Ok(Quarter::Q2),
            "3" | "q3" => Ok(Quarter::Q3),
            "4" | "q4" => Ok(Quarter::Q4),
            _ => Err(CoreError::InvalidInput(format!(
                "invalid quarter token: '{input}'"
            ))),
        }
    }
}

/// Validate a fiscal year against spec §4.1: `2000 <= y <= currentYear+1`.
pub fn validate_fiscal_year(year: i32, current_year: i32) -> Result<i32, CoreError> {
    if (2000..=current_year + 1).contains(&year) {
        Ok(year)
    } else {
        Err(CoreError::InvalidInput(format!(
            "fiscal year {year} out of range [2000, {}]",
            current_year + 1
        )))
    }
}

/// Build the transcript capability's cache key:
/// `concall:transcript:{SYMBOL}:{QUARTER}:{FY}:v{version}`.
pub fn transcript_key(symbol: &str, quarter: Quarter, fiscal_year: i32, version: u32) -> CacheKey {
    CacheKey::new(
        "concall",
        "transcript",
        vec![
            symbol.to_string(),
            quarter.as_str().to_string(),
            fiscal_year.to_string(),
        ],
        version,
    )
}

/// Build the exchange-rate capability's cache key: `fx:{FROM}:{TO}:v{version}`.
pub fn fx_key(from: &str, to: &str, version: u32) -> CacheKey {
    CacheKey::new(
        "fx",
        "rate",
        vec![from.to_uppercase(), to.to_uppercase()],
        version,
    )
}

/// Build the price-bars capability's cache key.
pub fn bars_key(symbol: &str, interval: &str, start: &str, end: &str, version: u32) -> CacheKey {
    CacheKey::new(
        "bars",
        "timeseries",
        vec![
            symbol.to_string(),
            interval.to_string(),
            start.to_string(),
            end.to_string(),
        ],
        version,
    )
}

/// Build the news capability's cache key.
pub fn news_key(query_hash: &str, window: &str, version: u32) -> CacheKey {
    CacheKey::new(
        "news",
        "articles",
        vec![query_hash.to_string(), window.to_string()],
        version,
    )
}

/// Build an AI derivative's cache key (summary/sentiment/RAG chunks).
pub fn ai_derivative_key(transcript_id: &str, kind: &str, version: u32) -> CacheKey {
    CacheKey::new(
        "concall",
        format!("derivative:{kind}"),
        vec![transcript_id.to_string()],
        version,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_determinism() {
        let a = transcript_key("RELIANCE.NS", Quarter::Q1, 2025, 1);
        let b = transcript_key("RELIANCE.NS", Quarter::Q1, 2025, 1);
        assert_eq!(a.to_wire(), b.to_wire());
        assert_eq!(a.to_wire(), "concall:transcript:RELIANCE.NS:Q1:2025:v1");
    }

    #[test]
    fn changing_a_field_changes_the_key() {
        let a = transcript_key("RELIANCE.NS", Quarter::Q1, 2025, 1);
        let b = transcript_key("RELIANCE.NS", Quarter::Q2, 2025, 1);
        assert_ne!(a.to_wire(), b.to_wire());
    }

    #[test]
    fn version_bump_invalidates_class() {
        let a = fx_key("USD", "INR", 1);
        let b = fx_key("USD", "INR", 2);
        assert_ne!(a.to_wire(), b.to_wire());
        assert_eq!(a.to_wire(), "fx:rate:USD:INR:v1");
    }

    #[test]
    fn round_trip_parse() {
        let key = transcript_key("RELIANCE.NS", Quarter::Q1, 2025, 1);
        let parsed = CacheKey::parse(&key.to_wire()).unwrap();
        assert_eq!(key, parsed);
    }

    #[test]
    fn quarter_normalization() {
        assert_eq!(Quarter::parse("q1").unwrap(), Quarter::Q1);
        assert_eq!(Quarter::parse("1").unwrap(), Quarter::Q1);
        assert_eq!(Quarter::parse("Quarter 1").unwrap(), Quarter::Q1);
        assert!(Quarter::parse("5").is_err());
        assert!(Quarter::parse("banana").is_err());
    }

    #[test]
    fn fiscal_year_bounds() {
        assert!(validate_fiscal_year(1999, 2026).is_err());
        assert!(validate_fiscal_year(2000, 2026).is_ok());
        assert!(validate_fiscal_year(2027, 2026).is_ok());
        assert!(validate_fiscal_year(2028, 2026).is_err());
    }
}
