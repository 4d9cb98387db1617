use std::time::Instant;
use tracing::info;

/// Logs start and elapsed wall-clock time of a command on drop.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "⏱  Finished: {} (took {:.2?})",
            self.label,
            self.start.elapsed()
        );
    }
}

/// Format an integer with thousands separators.
pub fn fmt_number(n: i64) -> String {
    let s = n.unsigned_abs().to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3 + 1);
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    if n < 0 {
        result.push('-');
    }
    result.chars().rev().collect()
}

/// KRW prices: whole won, grouped. Index levels keep two decimals.
pub fn fmt_price(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        return fmt_number(value as i64);
    }
    let whole = value.trunc() as i64;
    let cents = (value.fract().abs() * 100.0).round() as i64;
    if cents == 100 {
        return format!("{}.00", fmt_number(whole + value.signum() as i64));
    }
    let sign = if value < 0.0 && whole == 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, fmt_number(whole), cents)
}

/// Signed percentage with two decimals, e.g. `+1.25%`.
pub fn fmt_pct(pct: f64) -> String {
    format!("{:+.2}%", pct)
}

/// Optional metric cell; `N/A` when the company page had no value.
pub fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{:.2}", v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_number() {
        assert_eq!(fmt_number(1_234_567), "1,234,567");
        assert_eq!(fmt_number(0), "0");
        assert_eq!(fmt_number(-42_000), "-42,000");
        assert_eq!(fmt_number(999), "999");
    }

    #[test]
    fn test_fmt_price() {
        assert_eq!(fmt_price(71_500.0), "71,500");
        assert_eq!(fmt_price(2_650.37), "2,650.37");
        assert_eq!(fmt_price(-0.5), "-0.50");
        assert_eq!(fmt_price(9.999), "10.00");
    }

    #[test]
    fn test_fmt_pct_and_opt() {
        assert_eq!(fmt_pct(1.25), "+1.25%");
        assert_eq!(fmt_pct(-0.4), "-0.40%");
        assert_eq!(fmt_opt(None), "N/A");
        assert_eq!(fmt_opt(Some(0.604)), "0.60");
    }
}
