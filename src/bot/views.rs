//! Inline keyboards

use crate::bot::update::{Button, Keyboard};
use crate::translate::catalog::{language_name, POPULAR_LANGUAGES};

/// Language picker shown after `/translate`: one button per popular
/// language, plus a cancel row.
#[must_use]
pub fn language_keyboard() -> Keyboard {
    let mut rows: Vec<Vec<Button>> = POPULAR_LANGUAGES
        .iter()
        .filter_map(|code| {
            language_name(code).map(|name| vec![Button::new(name, format!("lang_{code}"))])
        })
        .collect();
    rows.push(vec![Button::new("Отмена", "cancel")]);
    Keyboard { rows }
}

/// Follow-up buttons under a quick-translate reply.
#[must_use]
pub fn quick_followup_keyboard() -> Keyboard {
    Keyboard {
        rows: vec![vec![
            Button::new("На английский", "quick_en"),
            Button::new("На испанский", "quick_es"),
        ]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_keyboard_layout() {
        let kb = language_keyboard();
        // Six popular languages, one per row, plus the cancel row
        assert_eq!(kb.rows.len(), 7);
        assert_eq!(kb.rows[0][0].data, "lang_ru");
        let last = kb.rows.last().expect("cancel row");
        assert_eq!(last[0].data, "cancel");
    }

    #[test]
    fn test_quick_followup_layout() {
        let kb = quick_followup_keyboard();
        assert_eq!(kb.rows.len(), 1);
        assert_eq!(kb.rows[0][0].data, "quick_en");
        assert_eq!(kb.rows[0][1].data, "quick_es");
    }
}
