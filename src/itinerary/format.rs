use chrono::NaiveDate;

/// Formats with Indonesian grouping: `10000.5` becomes `10.000,5`.
pub fn format_number(value: f64) -> String {
    let thousandths = (value.abs() * 1000.0).round() as u64;
    let integer = thousandths / 1000;
    let fraction = thousandths % 1000;

    let digits = integer.to_string().chars().rev().collect::<Vec<_>>();
    let grouped = digits
        .chunks(3)
        .map(|chunk| chunk.iter().rev().collect::<String>())
        .rev()
        .collect::<Vec<_>>()
        .join(".");

    let sign = if value.is_sign_negative() && thousandths > 0 {
        "-"
    } else {
        ""
    };

    if fraction == 0 {
        format!("{sign}{grouped}")
    } else {
        let decimals = format!("{fraction:03}");
        format!("{sign}{grouped},{}", decimals.trim_end_matches('0'))
    }
}

pub fn format_currency(value: f64, currency: &str) -> String {
    format!("{currency} {}", format_number(value))
}

/// `Jan 01 - Jan 05, 2024`
pub fn format_date_range(start: NaiveDate, end: NaiveDate) -> String {
    format!("{} - {}", start.format("%b %d"), end.format("%b %d, %Y"))
}

pub fn format_day_label(date: NaiveDate) -> String {
    date.format("%a, %b %d").to_string()
}

#[cfg(test)]
mod tests {
    use super::{format_currency, format_date_range, format_number};
    use chrono::NaiveDate;

    #[test]
    fn groups_thousands_with_dots() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(10000.0), "10.000");
        assert_eq!(format_number(1234567.0), "1.234.567");
        assert_eq!(format_number(-2500.0), "-2.500");
    }

    #[test]
    fn keeps_up_to_three_fraction_digits() {
        assert_eq!(format_number(1500.5), "1.500,5");
        assert_eq!(format_number(0.1234), "0,123");
    }

    #[test]
    fn prefixes_currency_code() {
        assert_eq!(format_currency(10000.0, "IDR"), "IDR 10.000");
    }

    #[test]
    fn formats_date_range_with_year_on_end() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(format_date_range(start, end), "Jan 01 - Jan 05, 2024");
    }
}
