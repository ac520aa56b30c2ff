//! "Jump to page" text box.

/// Digit-only text buffer that resolves a typed page number to a page index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JumpInput {
    text: String,
}

impl JumpInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Append typed text, keeping only ASCII digits.
    pub fn insert(&mut self, typed: &str) {
        self.text.extend(typed.chars().filter(char::is_ascii_digit));
    }

    /// Replace the whole buffer (paste or controlled input), filtering non-digits.
    pub fn set_text(&mut self, value: &str) {
        self.text.clear();
        self.insert(value);
    }

    pub fn backspace(&mut self) {
        self.text.pop();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Resolve the buffer against `page_numbers` and clear it on success.
    pub fn submit(&mut self, page_numbers: &[u32]) -> Option<usize> {
        let index = resolve_page_number(&self.text, page_numbers)?;
        self.text.clear();
        Some(index)
    }
}

/// Map a typed 1-based page number onto a zero-based index.
///
/// An exact match wins; otherwise the first page whose number is larger than the
/// request; otherwise the last page. Empty, non-numeric or zero input resolves to
/// nothing, as does an empty catalog. `page_numbers` must be sorted ascending.
pub fn resolve_page_number(input: &str, page_numbers: &[u32]) -> Option<usize> {
    let input = input.trim();
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let requested: u32 = match input.parse() {
        Ok(n) => n,
        // Only digits but too long: the largest page number there is.
        Err(_) => u32::MAX,
    };
    if requested == 0 || page_numbers.is_empty() {
        return None;
    }

    match page_numbers.binary_search(&requested) {
        Ok(index) => Some(index),
        Err(index) if index < page_numbers.len() => Some(index),
        Err(_) => Some(page_numbers.len() - 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_gap() {
        let numbers = [1, 2, 5, 6];
        assert_eq!(resolve_page_number("2", &numbers), Some(1));
        assert_eq!(resolve_page_number("4", &numbers), Some(2));
        assert_eq!(resolve_page_number("3", &numbers), Some(2));
        assert_eq!(resolve_page_number("99", &numbers), Some(3));
    }

    #[test]
    fn test_invalid_input_is_ignored() {
        let numbers = [1, 2, 3];
        assert_eq!(resolve_page_number("", &numbers), None);
        assert_eq!(resolve_page_number("0", &numbers), None);
        assert_eq!(resolve_page_number("-1", &numbers), None);
        assert_eq!(resolve_page_number("2a", &numbers), None);
        assert_eq!(resolve_page_number("2", &[]), None);
        assert_eq!(
            resolve_page_number("99999999999999999999", &numbers),
            Some(2)
        );
    }

    #[test]
    fn test_buffer_filters_digits() {
        let mut input = JumpInput::new();
        input.insert("1a2");
        assert_eq!(input.text(), "12");
        input.backspace();
        input.insert("-4");
        assert_eq!(input.text(), "14");

        assert_eq!(input.submit(&[1, 2, 5, 6]), Some(3));
        assert_eq!(input.text(), "");

        input.set_text("abc");
        assert_eq!(input.submit(&[1, 2]), None);
    }
}
