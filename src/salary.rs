use once_cell::sync::Lazy;
use regex::Regex;

/// Accepted salary notations, e.g. `$50,000`, `$40,000 - $60,000`, `25 per hour`.
pub static SALARY_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^[\$£€¥₹]?[\d,]+(\s?-\s?[\$£€¥₹]?[\d,]+)?(\s?(per\s)?(hour|day|week|month|year|annually))?$",
    )
    .expect("salary format pattern compiles")
});

static AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("amount pattern compiles"));

static PERIOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(hour|hr|day|week|month|year|annum|annually)")
        .expect("period pattern compiles")
});

pub fn is_valid_salary(raw: &str) -> bool {
    SALARY_FORMAT.is_match(raw.trim())
}

/// Annualized salary bounds in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalaryRange {
    pub min: u64,
    pub max: u64,
}

impl SalaryRange {
    /// True if the range reaches `min_salary` and starts at or below `max_salary`.
    pub fn within(&self, min_salary: Option<u64>, max_salary: Option<u64>) -> bool {
        min_salary.is_none_or(|floor| self.max >= floor)
            && max_salary.is_none_or(|ceiling| self.min <= ceiling)
    }
}

fn yearly_multiplier(raw: &str) -> u64 {
    match PERIOD
        .find(raw)
        .map(|m| m.as_str().to_ascii_lowercase())
        .as_deref()
    {
        Some("hour" | "hr") => 2080,
        Some("day") => 260,
        Some("week") => 52,
        Some("month") => 12,
        _ => 1,
    }
}

/// Parses a free-form salary string into an annualized range.
///
/// Currency symbols and thousands separators are ignored; a single amount yields a
/// zero-width range. Returns `None` when no amount is present.
pub fn annualized_range(raw: &str) -> Option<SalaryRange> {
    let amounts: Vec<f64> = AMOUNT
        .find_iter(raw)
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .take(2)
        .collect();

    let (lo, hi) = match amounts.as_slice() {
        [] => return None,
        [one] => (*one, *one),
        [a, b, ..] => (a.min(*b), a.max(*b)),
    };

    let factor = yearly_multiplier(raw) as f64;
    Some(SalaryRange {
        min: (lo * factor).round() as u64,
        max: (hi * factor).round() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_documented_formats() {
        for ok in [
            "$50,000",
            "$40,000 - $60,000",
            "£30,000-£35,000",
            "25 per hour",
            "€3,000 month",
            "120,000 annually",
        ] {
            assert!(is_valid_salary(ok), "{ok} should be valid");
        }
    }

    #[test]
    fn rejects_free_text() {
        for bad in ["competitive", "$50k", "about 40,000", "$25/hour"] {
            assert!(!is_valid_salary(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn annualizes_periods() {
        assert_eq!(
            annualized_range("$25 per hour"),
            Some(SalaryRange { min: 52_000, max: 52_000 })
        );
        assert_eq!(
            annualized_range("$3,000 - $4,000 month"),
            Some(SalaryRange { min: 36_000, max: 48_000 })
        );
        assert_eq!(
            annualized_range("$40,000 - $60,000"),
            Some(SalaryRange { min: 40_000, max: 60_000 })
        );
        assert_eq!(annualized_range("negotiable"), None);
    }

    #[test]
    fn range_bounds() {
        let range = SalaryRange { min: 40_000, max: 60_000 };
        assert!(range.within(Some(50_000), None));
        assert!(range.within(None, Some(40_000)));
        assert!(!range.within(Some(70_000), None));
        assert!(!range.within(None, Some(30_000)));
    }
}
