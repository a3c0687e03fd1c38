use icu_normalizer::ComposingNormalizerBorrowed;

use crate::catalog::{AcceptedResponse, Character, ResponseKind};

/// Trim surrounding whitespace and compose to NFC so that precomposed and
/// combining-mark spellings of the same text compare equal.
pub fn normalize(text: &str) -> String {
    let nfc = ComposingNormalizerBorrowed::new_nfc();
    nfc.normalize(text.trim()).into_owned()
}

/// Latin forms are folded with the root-locale lowercase mapping so the
/// comparison does not depend on the writing system's own locale.
fn fold_latin(text: &str) -> String {
    text.to_lowercase()
}

pub fn matches_form(response: &str, accepted: &AcceptedResponse) -> bool {
    let typed = normalize(response);
    let expected = normalize(&accepted.text);
    if expected.is_empty() {
        return false;
    }
    match accepted.kind {
        ResponseKind::Latin => fold_latin(&typed) == fold_latin(&expected),
        ResponseKind::Locale => typed == expected,
    }
}

/// True when the response satisfies any accepted form of the character.
pub fn is_correct(response: &str, character: &Character) -> bool {
    character
        .responses()
        .iter()
        .any(|accepted| matches_form(response, accepted))
}
