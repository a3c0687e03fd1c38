/// One change to the response buffer: the full new text, and whether the
/// change removed characters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseInput {
    pub text: String,
    pub is_deletion: bool,
}

impl ResponseInput {
    pub fn typed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_deletion: false,
        }
    }

    pub fn deleted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_deletion: true,
        }
    }
}

pub fn process_char(response: &str, ch: char) -> ResponseInput {
    let mut text = response.to_string();
    text.push(ch);
    ResponseInput::typed(text)
}

/// Drop the last grapheme-ish unit (one `char`). Backspace on an empty
/// buffer is still reported as a deletion.
pub fn process_backspace(response: &str) -> ResponseInput {
    let mut text = response.to_string();
    text.pop();
    ResponseInput::deleted(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_char_appends() {
        let input = process_char("k", 'a');
        assert_eq!(input, ResponseInput::typed("ka"));
    }

    #[test]
    fn test_process_backspace_removes_last_char() {
        let input = process_backspace("άλ");
        assert_eq!(input.text, "ά");
        assert!(input.is_deletion);
    }

    #[test]
    fn test_backspace_on_empty_is_deletion() {
        let input = process_backspace("");
        assert_eq!(input.text, "");
        assert!(input.is_deletion);
    }
}
