use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;

use caltrack_core::models::{convert_to_grams, validate_amount_g};

/// Parse an amount with optional unit into grams.
/// Accepts: "200", "200g", "0.5kg", "6 oz", "2 tbsp", etc.
pub(crate) fn parse_amount(s: &str) -> Result<f64> {
    let s = s.trim();

    let grams = if let Ok(g) = parse_grams(s) {
        g
    } else if let Some((qty, unit)) = split_number_unit(s) {
        to_grams(qty, unit, s)?
    } else {
        bail!("Invalid amount: '{s}'. Use '150', '150g', '6 oz', '2 tbsp', etc.");
    };

    validate_amount_g(grams)?;
    Ok(grams)
}

fn to_grams(qty: f64, unit: &str, original: &str) -> Result<f64> {
    match convert_to_grams(qty, unit) {
        Some((grams, is_approx)) => {
            if is_approx {
                eprintln!("Note: {qty} {unit} ≈ {grams:.0}g (approximate, assumes water density)");
            }
            Ok(grams)
        }
        None => bail!(
            "Unknown unit '{unit}' in '{original}'. Supported: g, kg, lb, oz, tbsp, tsp, ml, l"
        ),
    }
}

/// Split "500ml" or "2.5tbsp" into (500.0, "ml") or (2.5, "tbsp").
fn split_number_unit(s: &str) -> Option<(f64, &str)> {
    let idx = s.find(|c: char| c.is_alphabetic())?;
    if idx == 0 {
        return None;
    }
    let (num_part, unit_part) = s.split_at(idx);
    let qty: f64 = num_part.trim().parse().ok()?;
    if unit_part.is_empty() {
        return None;
    }
    Some((qty, unit_part))
}

pub(crate) fn parse_grams(s: &str) -> Result<f64> {
    let trimmed = s.trim_end_matches('g').trim();
    let value: f64 = trimmed
        .parse()
        .with_context(|| format!("Invalid amount: '{s}'. Use a number like '150' or '150g'"))?;
    if value <= 0.0 {
        bail!("Amount must be greater than 0 g");
    }
    Ok(value)
}

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Text progress bar, e.g. `[##########----------]  50%`. `fraction` is clamped to 0..=1.
pub(crate) fn progress_bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
    let filled = ((fraction * width as f64).round() as usize).min(width);
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        fraction * 100.0
    )
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grams() {
        assert!((parse_grams("200").unwrap() - 200.0).abs() < f64::EPSILON);
        assert!((parse_grams("200g").unwrap() - 200.0).abs() < f64::EPSILON);
        assert!((parse_grams("200.5g").unwrap() - 200.5).abs() < f64::EPSILON);
        assert!((parse_grams("200 ").unwrap() - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_grams_invalid() {
        assert!(parse_grams("abc").is_err());
        assert!(parse_grams("0").is_err());
        assert!(parse_grams("-50g").is_err());
    }

    #[test]
    fn test_parse_amount_units() {
        assert!((parse_amount("150").unwrap() - 150.0).abs() < f64::EPSILON);
        assert!((parse_amount("0.5kg").unwrap() - 500.0).abs() < f64::EPSILON);
        assert!((parse_amount("2 oz").unwrap() - 56.7).abs() < 1e-9);
        assert!((parse_amount("3tbsp").unwrap() - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_amount_rejects() {
        assert!(parse_amount("2 cups").is_err());
        assert!(parse_amount("lots").is_err());
        // Above the 1000 g cap
        assert!(parse_amount("2kg").is_err());
        assert!(parse_amount("0g").is_err());
    }

    #[test]
    fn test_split_number_unit() {
        assert_eq!(split_number_unit("500ml"), Some((500.0, "ml")));
        assert_eq!(split_number_unit("2.5tbsp"), Some((2.5, "tbsp")));
        assert_eq!(split_number_unit("ml"), None);
        assert_eq!(split_number_unit("500"), None);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today - chrono::Duration::days(1)
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            today + chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-01-15".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert!(parse_date(Some("nope".to_string())).is_err());
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.5, 10), "[#####-----]  50%");
        assert_eq!(progress_bar(0.0, 4), "[----]   0%");
        assert_eq!(progress_bar(1.7, 4), "[####] 100%");
        assert_eq!(progress_bar(-0.3, 4), "[----]   0%");
        assert_eq!(progress_bar(f64::NAN, 4), "[----]   0%");
    }

    #[test]
    fn test_json_error() {
        assert_eq!(json_error("bad \"input\""), r#"{"error":"bad \"input\""}"#);
    }

    #[test]
    fn test_no_neg_zero() {
        assert_eq!(no_neg_zero(-0.0).to_bits(), 0.0_f64.to_bits());
        assert_eq!(no_neg_zero(5.0), 5.0);
        assert_eq!(no_neg_zero(-3.0), -3.0);
    }
}
