//! Abbreviations that end in a period without ending a sentence.

/// Lowercased, without the final period.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "rev", "gen", "gov", "sen", "capt",
    "col", "lt", "sgt", "vs", "inc", "ltd", "co", "corp", "dept", "univ", "assn", "bros",
    "fig", "figs", "eq", "eqs", "vol", "vols", "ch", "sec", "para", "pp", "ed", "eds", "approx",
    "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec", "ave",
    "blvd", "rd", "al", "cf", "viz", "e.g", "i.e", "a.m", "p.m", "ph.d",
];

/// Whether `word` (the token before a period, period excluded) is a known
/// abbreviation or a single-letter initial.
pub(crate) fn is_abbreviation(word: &str) -> bool {
    if is_initial(word) {
        return true;
    }
    let lower = word.to_lowercase();
    ABBREVIATIONS.contains(&lower.as_str())
}

/// `J` in `J. Smith`. The pronoun `I` is not an initial.
pub(crate) fn is_initial(word: &str) -> bool {
    let mut chars = word.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase() && c != 'I')
}

/// Internal periods, as in `e.g` or `U.S`.
pub(crate) fn is_dotted(word: &str) -> bool {
    word.len() > 1 && word.contains('.') && !word.ends_with('.')
        && word.split('.').all(|part| !part.is_empty() && part.chars().all(char::is_alphabetic))
}
