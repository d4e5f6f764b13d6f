//! Ordered phrase tables mapping carrier status text onto [`TrackingStatus`].
//!
//! Free text is matched by case-insensitive substring and the first matching
//! entry wins, so every phrase table lists negated or compound phrases
//! (`"nedoručen"`, `"not delivered"`, `"in zustellung"`) before the shorter
//! phrases they contain. Carrier status codes are a separate vocabulary and
//! are only ever compared whole against the code tables.

use domain::TrackingStatus::{self, Created, Delivered, Exception, InTransit, OutForDelivery};

/// One ordered list of `(phrase, status)` pairs. Phrases are lowercase.
pub type PhraseTable = &'static [(&'static str, TrackingStatus)];

/// English phrases shared by all carriers.
pub const ENGLISH: PhraseTable = &[
    ("not delivered", Exception),
    ("undelivered", Exception),
    ("undeliverable", Exception),
    ("delivery failed", Exception),
    ("failed delivery", Exception),
    ("returned to sender", Exception),
    ("return to sender", Exception),
    ("refused", Exception),
    ("damaged", Exception),
    ("exception", Exception),
    ("out for delivery", OutForDelivery),
    ("with delivery courier", OutForDelivery),
    ("ready for pickup", OutForDelivery),
    ("delivered", Delivered),
    ("pre-transit", Created),
    ("shipment information received", Created),
    ("label created", Created),
    ("data received", Created),
    ("in transit", InTransit),
    ("transit", InTransit),
    ("picked up", InTransit),
    ("departed", InTransit),
    ("arrived", InTransit),
    ("processed", InTransit),
    ("hub", InTransit),
    ("depot", InTransit),
];

/// Czech phrases used by PPL and GLS CZ.
pub const CZECH: PhraseTable = &[
    ("nedoručen", Exception),
    ("nezastižen", Exception),
    ("odmítnut", Exception),
    ("poškozen", Exception),
    ("vrácen", Exception),
    ("doručován", OutForDelivery),
    ("předána k doručení", OutForDelivery),
    ("připravena k vyzvednutí", OutForDelivery),
    ("doručen", Delivered),
    ("data o zásilce", Created),
    ("zaevidován", Created),
    ("na cestě", InTransit),
    ("přeprav", InTransit),
    ("převzat", InTransit),
    ("depo", InTransit),
    ("překladiš", InTransit),
];

/// German phrases used by DHL and GLS DE.
pub const GERMAN: PhraseTable = &[
    ("nicht zugestellt", Exception),
    ("zustellung nicht möglich", Exception),
    ("zurück an absender", Exception),
    ("beschädigt", Exception),
    ("in zustellung", OutForDelivery),
    ("zustellfahrzeug", OutForDelivery),
    ("zugestellt", Delivered),
    ("elektronisch angekündigt", Created),
    ("unterwegs", InTransit),
    ("paketzentrum", InTransit),
    ("abgeholt", InTransit),
];

/// GLS `progressBar.statusInfo` codes. Matched whole, see [`match_code`].
pub const GLS_CODES: PhraseTable = &[
    ("notdelivered", Exception),
    ("indelivery", OutForDelivery),
    ("delivered", Delivered),
    ("preadvice", Created),
    ("intransit", InTransit),
    ("inwarehouse", InTransit),
];

/// DHL unified tracking `statusCode` values. Matched whole, see [`match_code`].
pub const DHL_CODES: PhraseTable = &[
    ("failure", Exception),
    ("delivered", Delivered),
    ("pre-transit", Created),
    ("transit", InTransit),
];

/// Returns the status of the first phrase contained in `text`, searching
/// `tables` in order. Unmatched text maps to [`TrackingStatus::Unknown`].
pub fn match_status(tables: &[PhraseTable], text: &str) -> TrackingStatus {
    let text = text.to_lowercase();
    tables
        .iter()
        .flat_map(|table| table.iter())
        .find(|(phrase, _)| text.contains(phrase))
        .map(|(_, status)| *status)
        .unwrap_or_default()
}

/// Looks up a carrier status code, ignoring case and surrounding whitespace.
///
/// Codes are compared for equality, never by substring.
pub fn match_code(codes: PhraseTable, code: &str) -> TrackingStatus {
    let code = code.trim();
    codes
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(code))
        .map(|(_, status)| *status)
        .unwrap_or_default()
}

/// Tries each candidate text in turn, returning the first known status.
pub fn match_first<'a, I>(tables: &[PhraseTable], candidates: I) -> TrackingStatus
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .map(|text| match_status(tables, text))
        .find(|status| *status != TrackingStatus::Unknown)
        .unwrap_or_default()
}

/// Classifies a carrier report made of an optional machine code and
/// free-text labels. A recognised code is authoritative; otherwise the
/// texts are matched against the phrase tables.
pub fn classify<'a, I>(
    codes: PhraseTable,
    code: Option<&str>,
    tables: &[PhraseTable],
    texts: I,
) -> TrackingStatus
where
    I: IntoIterator<Item = &'a str>,
{
    match code.map(|c| match_code(codes, c)) {
        Some(status) if status != TrackingStatus::Unknown => status,
        _ => match_first(tables, texts),
    }
}
