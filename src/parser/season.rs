use std::sync::LazyLock;

use regex::Regex;

pub const DEFAULT_SEASON: &str = "1";

static SEASON_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bS(\d{1,2})(?:E\d{1,4})?\b",
        r"(?i)\bSeason\s*(\d{1,2})\b",
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\s+Season\b",
        r"第([0-9一二三四五六七八九十]{1,3})[季期]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("season pattern is valid"))
    .collect()
});

/// Season number found in `text`, without leading zeros.
pub fn detect_season(text: &str) -> Option<String> {
    SEASON_PATTERNS.iter().find_map(|re| {
        let raw = re.captures(text)?.get(1)?.as_str();
        let n = parse_number(raw)?;
        (n > 0).then(|| n.to_string())
    })
}

/// Season of a release, preferring the show name over the episode title.
pub fn resolve_season(anime_name: Option<&str>, title: &str) -> String {
    anime_name
        .and_then(detect_season)
        .or_else(|| detect_season(title))
        .unwrap_or_else(|| DEFAULT_SEASON.to_string())
}

fn parse_number(raw: &str) -> Option<u32> {
    if let Ok(n) = raw.parse::<u32>() {
        return Some(n);
    }
    parse_chinese_numeral(raw)
}

/// 1-99 written with Chinese numerals, e.g. 二, 十, 十二, 二十三.
fn parse_chinese_numeral(raw: &str) -> Option<u32> {
    fn digit(c: char) -> Option<u32> {
        "一二三四五六七八九"
            .chars()
            .position(|d| d == c)
            .map(|i| i as u32 + 1)
    }

    let chars: Vec<char> = raw.chars().collect();
    match chars.as_slice() {
        [c] if *c == '十' => Some(10),
        [c] => digit(*c),
        ['十', u] => Some(10 + digit(*u)?),
        [t, '十'] => Some(digit(*t)? * 10),
        [t, '十', u] => Some(digit(*t)? * 10 + digit(*u)?),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sxxexx() {
        assert_eq!(detect_season("Show S01E01 1080p"), Some("1".into()));
        assert_eq!(detect_season("Show S02E11 1080p"), Some("2".into()));
        assert_eq!(detect_season("Show - S3 - 05"), Some("3".into()));
    }

    #[test]
    fn test_season_word() {
        assert_eq!(detect_season("Show Season 2 - 03"), Some("2".into()));
        assert_eq!(detect_season("Show 2nd Season - 03"), Some("2".into()));
        assert_eq!(detect_season("Show 3rd season [01]"), Some("3".into()));
    }

    #[test]
    fn test_chinese_season() {
        assert_eq!(detect_season("葬送的芙莉莲 第二季"), Some("2".into()));
        assert_eq!(detect_season("某番 第十一期"), Some("11".into()));
        assert_eq!(detect_season("某番 第2季"), Some("2".into()));
        assert_eq!(detect_season("某番 第二十季"), Some("20".into()));
    }

    #[test]
    fn test_no_season() {
        assert_eq!(detect_season("[Sub] Show - 01 [1080p]"), None);
        assert_eq!(detect_season("Show S0"), None);
    }

    #[test]
    fn test_resolve_prefers_name() {
        assert_eq!(resolve_season(Some("Show 第三季"), "Show S02E01"), "3");
        assert_eq!(resolve_season(Some("Show"), "Show S02E01"), "2");
        assert_eq!(resolve_season(None, "[Sub] Show - 01"), DEFAULT_SEASON);
    }
}
