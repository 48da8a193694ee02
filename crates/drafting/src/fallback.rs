//! Ordered field resolvers.
//!
//! Every draft field is resolved through an explicit list of tiers,
//! evaluated in order; the first non-empty value wins and later tiers never
//! override it. This is the hard contract behind the ad/ad-set/campaign/
//! account-defaults fallback chain.

/// Returns the first non-empty tier, or an empty string when every tier is
/// empty.
pub fn resolve_text(tiers: &[Option<&str>]) -> String {
    tiers
        .iter()
        .flatten()
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_default()
}

/// Returns the first positive tier.
pub fn resolve_amount(tiers: &[Option<f64>]) -> Option<f64> {
    tiers.iter().flatten().copied().find(|v| *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_non_empty_wins() {
        let resolved = resolve_text(&[Some("ad value"), Some("template value"), Some("default")]);
        assert_eq!(resolved, "ad value");
    }

    #[test]
    fn test_empty_tiers_fall_through() {
        let resolved = resolve_text(&[Some(""), None, Some("  "), Some("account default")]);
        assert_eq!(resolved, "account default");
    }

    #[test]
    fn test_later_tier_never_overrides_earlier_value() {
        // Tier ordering is total: a non-empty tier k beats any tier k+1.
        let tiers: [Option<&str>; 4] = [Some("tier0"), Some("tier1"), Some("tier2"), Some("tier3")];
        for k in 0..tiers.len() {
            let mut case = tiers;
            for slot in case.iter_mut().take(k) {
                *slot = Some("");
            }
            assert_eq!(resolve_text(&case), format!("tier{}", k));
        }
    }

    #[test]
    fn test_all_empty_resolves_to_empty_string() {
        assert_eq!(resolve_text(&[None, Some(""), None]), "");
    }

    #[test]
    fn test_amount_skips_non_positive() {
        assert_eq!(resolve_amount(&[Some(0.0), None, Some(150.0)]), Some(150.0));
        assert_eq!(resolve_amount(&[None, Some(-5.0)]), None);
    }
}
