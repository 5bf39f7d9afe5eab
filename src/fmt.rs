/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    if !val.is_finite() {
        return "N/A".to_string();
    }
    let negative = val < 0.0;
    let abs = val.abs();
    let cents = format!("{:.2}", abs);
    let parts: Vec<&str> = cents.split('.').collect();
    let int_part = parts[0];
    let dec_part = parts[1];

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

/// `money` for optional amounts; missing values render as N/A.
pub fn money_opt(val: Option<f64>) -> String {
    val.map(money).unwrap_or_else(|| "N/A".to_string())
}

/// Plain two-decimal amount without currency symbol, for local-currency figures.
pub fn amount_opt(val: Option<f64>) -> String {
    val.map(|v| format!("{v:.2}")).unwrap_or_default()
}

/// ISO `YYYY-MM-DD` to `DD/MM/YYYY`; anything unparseable is returned as-is.
pub fn day_month_year(date: &str) -> String {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "$1,234.56");
        assert_eq!(money(-500.00), "-$500.00");
        assert_eq!(money(0.0), "$0.00");
        assert_eq!(money(1000000.99), "$1,000,000.99");
        assert_eq!(money(42.10), "$42.10");
    }

    #[test]
    fn test_money_opt_missing() {
        assert_eq!(money_opt(None), "N/A");
        assert_eq!(money_opt(Some(51.25)), "$51.25");
        assert_eq!(money_opt(Some(f64::INFINITY)), "N/A");
        assert_eq!(money(f64::NAN), "N/A");
    }

    #[test]
    fn test_day_month_year() {
        assert_eq!(day_month_year("2025-10-15"), "15/10/2025");
        assert_eq!(day_month_year("sometime"), "sometime");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
