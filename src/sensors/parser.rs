//! Pipe-delimited SDR output parser.
//! Input:  "CPU1 Temp        | 0Eh | ok  |  3.1 | 45 degrees C"
//! Filter: rows whose name column contains the sensor class (case-insensitive)

/// Minimum number of `|`-separated columns in a usable row.
const MIN_COLUMNS: usize = 5;

/// Maximum reading among rows whose sensor name contains `sensor_class`.
/// Rows that are short, unnamed or unreadable ("no reading", "disabled") are skipped.
pub fn parse_max_temperature(table: &str, sensor_class: &str) -> Option<i64> {
    let class = sensor_class.to_lowercase();

    table
        .lines()
        .filter_map(|line| {
            let cols: Vec<&str> = line.split('|').collect();
            if cols.len() < MIN_COLUMNS || !cols[0].to_lowercase().contains(&class) {
                return None;
            }
            leading_integer(cols[4])
        })
        .max()
}

/// "45 degrees C" -> 45, "47.5 degrees C" -> 47, "-3 C" -> -3, "no reading" -> None
fn leading_integer(field: &str) -> Option<i64> {
    let field = field.trim_start();
    let (sign, digits) = match field.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, field),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|v| sign * v)
}

#[cfg(test)]
mod tests {
    use super::*;

    const R640: &str = "\
Inlet Temp       | 04h | ok  |  7.1 | 22 degrees C
Exhaust Temp     | 01h | ok  |  7.1 | 38 degrees C
CPU1 Temp        | 0Eh | ok  |  3.1 | 47 degrees C
CPU2 Temp        | 0Fh | ok  |  3.2 | 52 degrees C
";

    #[test]
    fn returns_hottest_matching_sensor() {
        assert_eq!(parse_max_temperature(R640, "CPU"), Some(52));
    }

    #[test]
    fn class_match_ignores_case() {
        assert_eq!(parse_max_temperature(R640, "cpu"), Some(52));
        assert_eq!(parse_max_temperature(R640, "exhaust"), Some(38));
    }

    #[test]
    fn no_matching_class_is_none() {
        assert_eq!(parse_max_temperature(R640, "GPU"), None);
    }

    #[test]
    fn empty_or_garbage_input_is_none() {
        assert_eq!(parse_max_temperature("", "CPU"), None);
        assert_eq!(parse_max_temperature("OK", "CPU"), None);
        assert_eq!(parse_max_temperature("Error: Unable to establish IPMI v2 / RMCP+ session", "CPU"), None);
    }

    #[test]
    fn short_rows_are_skipped() {
        let table = "CPU1 Temp | 0Eh | ok | 3.1\nCPU2 Temp | 0Fh | ok | 3.2 | 61 degrees C";
        assert_eq!(parse_max_temperature(table, "CPU"), Some(61));
    }

    #[test]
    fn unreadable_values_are_skipped() {
        let table = "\
CPU1 Temp        | 0Eh | ns  |  3.1 | No Reading
CPU2 Temp        | 0Fh | ok  |  3.2 | Disabled
CPU3 Temp        | 10h | ok  |  3.3 | 58 degrees C
";
        assert_eq!(parse_max_temperature(table, "CPU"), Some(58));
    }

    #[test]
    fn only_unreadable_rows_is_none() {
        let table = "CPU1 Temp | 0Eh | ns | 3.1 | No Reading";
        assert_eq!(parse_max_temperature(table, "CPU"), None);
    }

    #[test]
    fn extra_columns_are_tolerated() {
        let table = "CPU1 Temp | 0Eh | ok | 3.1 | 70 degrees C | extra";
        assert_eq!(parse_max_temperature(table, "CPU"), Some(70));
    }

    #[test]
    fn leading_integer_handles_units_and_fractions() {
        assert_eq!(leading_integer(" 45 degrees C"), Some(45));
        assert_eq!(leading_integer("47.5 degrees C"), Some(47));
        assert_eq!(leading_integer("88C"), Some(88));
        assert_eq!(leading_integer("-3 degrees C"), Some(-3));
        assert_eq!(leading_integer("degrees 45"), None);
        assert_eq!(leading_integer(""), None);
        assert_eq!(leading_integer("-"), None);
    }
}
