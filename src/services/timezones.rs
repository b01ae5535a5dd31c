use chrono_tz::{Tz, TZ_VARIANTS};

/// Shorthand names accepted in addition to canonical IANA ids.
const ALIASES: &[(&str, &str)] = &[
    ("moscow", "Europe/Moscow"),
    ("msk", "Europe/Moscow"),
    ("warsaw", "Europe/Warsaw"),
    ("poland", "Europe/Warsaw"),
    ("minsk", "Europe/Minsk"),
    ("kiev", "Europe/Kyiv"),
    ("kyiv", "Europe/Kyiv"),
    ("london", "Europe/London"),
    ("utc", "UTC"),
    ("gmt", "UTC"),
];

/// Resolves free-form user input to a timezone. Tries, in order: the alias
/// table, a case-insensitive exact match, a strict IANA parse, and finally a
/// substring match that only counts when it is unambiguous.
pub fn resolve(input: &str) -> Option<Tz> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();
    if lower.is_empty() {
        return None;
    }

    if let Some((_, canonical)) = ALIASES.iter().find(|(alias, _)| *alias == lower) {
        return canonical.parse().ok();
    }

    if let Some(tz) = TZ_VARIANTS.iter().find(|tz| tz.name().to_lowercase() == lower) {
        return Some(*tz);
    }

    if let Ok(tz) = trimmed.parse::<Tz>() {
        return Some(tz);
    }

    let mut matches = TZ_VARIANTS
        .iter()
        .filter(|tz| tz.name().to_lowercase().contains(&lower));
    match (matches.next(), matches.next()) {
        (Some(tz), None) => Some(*tz),
        _ => None,
    }
}

// ── Tests ────────────────────────────────────────────────────────────
