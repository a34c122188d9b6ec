//! Region (state / union territory) codes accepted as plate prefixes

/// Two-letter codes a registration number may start with
pub const REGION_CODES: [&str; 34] = [
    "AN", "AP", "AR", "AS", "BR", "CH", "CT", "DL", "DN", "GA", "GJ", "HR", "HP", "JK", "JH", "KA",
    "KL", "MP", "MH", "MN", "ML", "MZ", "NL", "OR", "PY", "PB", "RJ", "SK", "TN", "TS", "TR", "UP",
    "UT", "WB",
];

pub fn is_region_code(code: &str) -> bool {
    REGION_CODES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert!(is_region_code("DL"));
        assert!(is_region_code("WB"));
        assert!(is_region_code("TS"));
    }

    #[test]
    fn test_unknown_codes() {
        assert!(!is_region_code("XX"));
        assert!(!is_region_code("dl"));
        assert!(!is_region_code("D"));
        assert!(!is_region_code(""));
    }

    #[test]
    fn test_codes_are_unique_two_letter_uppercase() {
        let mut seen = std::collections::HashSet::new();
        for code in REGION_CODES {
            assert_eq!(code.len(), 2);
            assert!(code.chars().all(|c| c.is_ascii_uppercase()));
            assert!(seen.insert(code), "duplicate region code {code}");
        }
    }
}
