//! Static classification vocabulary.
//!
//! Prefix tokens map to a primary category folder, suffix tokens to a subtype
//! folder. A handful of domains replace the generic suffix vocabulary with their
//! own; those overrides are held in a fixed, ordered list so that resolution never
//! depends on map iteration order.

/// Prefix token to primary category folder.
pub const PREFIX_CATEGORIES: &[(&str, &str)] = &[
    ("air", "Airports"),
    ("cem", "Cemeteries"),
    ("cit", "Cities"),
    ("cty", "Counties"),
    ("gov", "Government_Lands"),
    ("offs", "OffshoreSurveys"),
    ("pipe", "Pipelines"),
    ("rail", "Railroads"),
    ("road", "Roads"),
    ("ship", "ShipChannels"),
    ("subd", "Subdivisions"),
    ("surv", "Surveys"),
    ("watr", "Water"),
    ("well", "Wells"),
];

/// Suffix token to subtype folder, used when no domain override applies.
pub const GENERIC_SUBTYPES: &[(&str, &str)] = &[
    ("l", "ln"),
    ("p", "poly"),
    ("g", "Cnty_poly_named"),
    ("i", "GulfAreas_poly"),
    ("k", "Cnty_poly_unnamed"),
    ("Labpt", "Label_pts"),
    ("Abspt", "Abs_pts"),
    ("b", "BayTrct_poly"),
    ("a", "area"),
    ("s", "SHL_pts"),
];

/// Domain-specific subtype tables, checked in this order. The first domain key the
/// prefix token starts with is the only override consulted.
pub const DOMAIN_OVERRIDES: &[(&str, &[(&str, &str)])] = &[
    ("well", &[("s", "SHLpts"), ("b", "BHLpts"), ("l", "PATHln")]),
    (
        "surv",
        &[
            ("l", "Surv_ln"),
            ("p", "Surv_poly"),
            ("b", "BayTrct_poly"),
            ("Abspt", "Abs_pts"),
            ("Labpt", "Surv_Label_pts"),
        ],
    ),
    ("subd", &[("l", "Subd_ln"), ("Labpt", "Subd_Label_pts")]),
    ("watr", &[("l", "Wtr_ln"), ("a", "Wtr_area")]),
    ("offs", &[("a", "OffSh_Surv_poly")]),
];

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, value)| *value)
}

/// Primary category folder for a prefix token, if the token is in the vocabulary.
pub fn category_for_prefix(prefix_token: &str) -> Option<&'static str> {
    lookup(PREFIX_CATEGORIES, prefix_token)
}

/// Override table for the first domain whose key the prefix token starts with.
pub fn domain_override(prefix_token: &str) -> Option<(&'static str, &'static [(&'static str, &'static str)])> {
    DOMAIN_OVERRIDES
        .iter()
        .find(|(domain, _)| prefix_token.starts_with(domain))
        .map(|(domain, table)| (*domain, *table))
}

/// Resolve the subtype folder: domain override first, then the generic table.
pub fn subtype_for(prefix_token: &str, suffix_token: &str) -> Option<&'static str> {
    domain_override(prefix_token)
        .and_then(|(_, table)| lookup(table, suffix_token))
        .or_else(|| lookup(GENERIC_SUBTYPES, suffix_token))
}
