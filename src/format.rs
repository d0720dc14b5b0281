//! Human-readable number formatting shared by the report, spreadsheet and
//! web page.

pub const MISSING: &str = "n/a";

/// `1234567.891` → `$1,234,567.89`. Negative values keep the sign in front.
pub fn usd(v: f64) -> String {
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}${}", group_thousands(&format!("{:.2}", v.abs())))
}

pub fn opt_usd(v: Option<f64>) -> String {
    v.map(usd).unwrap_or_else(|| MISSING.to_string())
}

/// `2.5` → `+2.50%`.
pub fn signed_pct(v: f64) -> String {
    format!("{v:+.2}%")
}

pub fn opt_signed_pct(v: Option<f64>) -> String {
    v.map(signed_pct).unwrap_or_else(|| MISSING.to_string())
}

/// Insert `,` every three digits of the integer part of a plain decimal string.
fn group_thousands(plain: &str) -> String {
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (plain, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{grouped}.{f}"),
        None => grouped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usd_groups_thousands() {
        assert_eq!(usd(800000.0), "$800,000.00");
        assert_eq!(usd(1234567.891), "$1,234,567.89");
        assert_eq!(usd(999.999), "$1,000.00");
        assert_eq!(usd(0.5), "$0.50");
        assert_eq!(usd(-1500.0), "-$1,500.00");
    }

    #[test]
    fn missing_values_render_placeholder() {
        assert_eq!(opt_usd(None), "n/a");
        assert_eq!(opt_signed_pct(None), "n/a");
    }

    #[test]
    fn pct_is_signed() {
        assert_eq!(signed_pct(2.5), "+2.50%");
        assert_eq!(signed_pct(-1.0), "-1.00%");
    }
}
