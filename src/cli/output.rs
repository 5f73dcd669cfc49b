//! Console output helpers for CLI commands

use crate::engine::MatchResult;

/// Print a section header
pub fn print_section(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:20} {}", format!("{key}:"), value);
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i.is_multiple_of(3) {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}

/// Print the final standings of one match
pub fn print_match_result(index: usize, result: &MatchResult) {
    let status = if result.aborted { ", aborted" } else { "" };
    println!(
        "\nMatch {} ({} rounds{status})",
        index + 1,
        format_number(result.rounds_played as u64)
    );
    for standing in &result.standings {
        println!("  {standing}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(4096), "4,096");
        assert_eq!(format_number(16_777_216), "16,777,216");
    }
}
