//! Carrier identification from free-form carrier names.

use std::fmt;

/// Carriers with a dedicated adapter, plus a catch-all for everything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CarrierKind {
    Ppl,
    Gls,
    Dhl,
    /// Any carrier without an integration; carries the original name.
    Generic(String),
}

impl CarrierKind {
    /// Classifies a carrier name by case-insensitive substring.
    ///
    /// `"DHL Express"` and `"dhl-parcel"` both resolve to [`CarrierKind::Dhl`].
    /// Names matching none of the integrated carriers resolve to
    /// [`CarrierKind::Generic`].
    pub fn from_carrier_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("dhl") {
            CarrierKind::Dhl
        } else if lower.contains("gls") {
            CarrierKind::Gls
        } else if lower.contains("ppl") {
            CarrierKind::Ppl
        } else {
            CarrierKind::Generic(name.trim().to_string())
        }
    }

    pub fn is_generic(&self) -> bool {
        matches!(self, CarrierKind::Generic(_))
    }
}

impl fmt::Display for CarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CarrierKind::Ppl => f.write_str("PPL"),
            CarrierKind::Gls => f.write_str("GLS"),
            CarrierKind::Dhl => f.write_str("DHL"),
            CarrierKind::Generic(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_match_is_case_insensitive() {
        assert_eq!(CarrierKind::from_carrier_name("DHL Express"), CarrierKind::Dhl);
        assert_eq!(CarrierKind::from_carrier_name("dhl-parcel"), CarrierKind::Dhl);
        assert_eq!(CarrierKind::from_carrier_name("GLS CZ"), CarrierKind::Gls);
        assert_eq!(CarrierKind::from_carrier_name("ppl"), CarrierKind::Ppl);
        assert_eq!(CarrierKind::from_carrier_name("PPL Parcel Connect"), CarrierKind::Ppl);
    }

    #[test]
    fn test_unknown_carriers_are_generic() {
        let kind = CarrierKind::from_carrier_name(" Zasilkovna ");
        assert_eq!(kind, CarrierKind::Generic("Zasilkovna".to_string()));
        assert!(kind.is_generic());
        assert_eq!(kind.to_string(), "Zasilkovna");
    }

    #[test]
    fn test_resolution_is_pure() {
        for name in ["DHL", "gls", "Ppl", "Other"] {
            assert_eq!(
                CarrierKind::from_carrier_name(name),
                CarrierKind::from_carrier_name(name)
            );
        }
    }
}
