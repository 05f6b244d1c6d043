//! Key-claim extraction from free text

/// Longest claim forwarded to providers, in characters
pub const MAX_CLAIM_CHARS: usize = 200;

/// First sentence of `text` (split on '.'), trimmed and cut to
/// [`MAX_CLAIM_CHARS`] characters. Empty sentences before the first real one
/// are skipped.
pub fn extract_key_claim(text: &str) -> String {
    let trimmed = text.trim();
    let first = trimmed
        .split('.')
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("");
    first.chars().take(MAX_CLAIM_CHARS).collect::<String>().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sentence() {
        assert_eq!(
            extract_key_claim("  The earth is flat. Everyone knows it. "),
            "The earth is flat"
        );
    }

    #[test]
    fn test_no_period() {
        assert_eq!(extract_key_claim("Vaccines cause autism"), "Vaccines cause autism");
    }

    #[test]
    fn test_leading_periods_skipped() {
        assert_eq!(extract_key_claim("... Bananas are berries."), "Bananas are berries");
    }

    #[test]
    fn test_truncated_on_char_boundary() {
        let long = "é".repeat(250);
        let claim = extract_key_claim(&long);
        assert_eq!(claim.chars().count(), MAX_CLAIM_CHARS);
    }

    #[test]
    fn test_blank_input() {
        assert_eq!(extract_key_claim("   "), "");
        assert_eq!(extract_key_claim("..."), "");
    }
}
