pub mod components;
pub mod layout;
pub mod theme;

use rust_i18n::t;

/// Primary language subtag of a POSIX locale string (`el_GR.UTF-8` -> `el`).
pub fn locale_code(lang: &str) -> &str {
    lang.split(['_', '.', '-', '@']).next().unwrap_or("")
}

/// Switch UI strings to the locale named by `lang` when a translation
/// exists. Returns whether it switched.
pub fn init_locale(lang: &str) -> bool {
    let code = locale_code(lang);
    if rust_i18n::available_locales!().iter().any(|l| *l == code) {
        rust_i18n::set_locale(code);
        return true;
    }
    false
}

pub fn quiz_hint() -> String {
    t!("quiz.hint").to_string()
}
