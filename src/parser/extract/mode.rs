use super::find_word;
use crate::listing::OperatingMode;

const MODE_KEYWORDS: &[(&str, OperatingMode)] = &[
    ("remote", OperatingMode::Remote),
    ("fully remote", OperatingMode::Remote),
    ("work from home", OperatingMode::Remote),
    ("wfh", OperatingMode::Remote),
    ("zdalna", OperatingMode::Remote),
    ("zdalnie", OperatingMode::Remote),
    ("hybrid", OperatingMode::Hybrid),
    ("hybrydowa", OperatingMode::Hybrid),
    ("hybrydowo", OperatingMode::Hybrid),
    ("on-site", OperatingMode::OnSite),
    ("onsite", OperatingMode::OnSite),
    ("on site", OperatingMode::OnSite),
    ("in-office", OperatingMode::OnSite),
    ("in office", OperatingMode::OnSite),
    ("full office", OperatingMode::OnSite),
    ("office work", OperatingMode::OnSite),
    ("stacjonarna", OperatingMode::OnSite),
    ("stacjonarnie", OperatingMode::OnSite),
];

/// The work-mode field decides when it names a mode; otherwise the description does.
pub fn classify(work_modes: Option<&str>, description: Option<&str>) -> OperatingMode {
    [work_modes, description]
        .into_iter()
        .flatten()
        .find_map(earliest_mode)
        .unwrap_or(OperatingMode::Unknown)
}

fn earliest_mode(text: &str) -> Option<OperatingMode> {
    let lower = text.to_lowercase();
    MODE_KEYWORDS
        .iter()
        .filter_map(|(needle, mode)| find_word(&lower, needle).map(|pos| (pos, *mode)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, mode)| mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_in_description() {
        let d = "Required skills: Python, AWS, Power BI, 3+ years experience, hybrid work";
        assert_eq!(classify(None, Some(d)), OperatingMode::Hybrid);
    }

    #[test]
    fn board_field_wins_over_description() {
        assert_eq!(
            classify(Some("praca zdalna"), Some("our hybrid office in Warsaw")),
            OperatingMode::Remote
        );
    }

    #[test]
    fn earliest_keyword_wins() {
        assert_eq!(
            classify(Some("hybrid work, remote work"), None),
            OperatingMode::Hybrid
        );
        assert_eq!(classify(Some("praca stacjonarna"), None), OperatingMode::OnSite);
        assert_eq!(classify(Some("Full office work"), None), OperatingMode::OnSite);
    }

    #[test]
    fn absent_keyword_is_unknown() {
        assert_eq!(classify(None, None), OperatingMode::Unknown);
        assert_eq!(classify(Some("flexible"), Some("remotely managed")), OperatingMode::Unknown);
    }
}
