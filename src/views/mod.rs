//! Per-view state machines.
//!
//! These own local view state and decide when a remote operation may start;
//! the app shell spawns the operation and feeds results back through `apply`.

pub mod chat;
pub mod dashboard;
pub mod planner;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line editable text with a character cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

impl TextInput {
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    /// Take the value out, leaving the input empty
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_input_edits_multibyte_text() {
        let mut input = TextInput::with_value("Varginha");
        input.insert('é');
        assert_eq!(input.value, "Varginhaé");
        input.left();
        input.backspace();
        assert_eq!(input.value, "Varginhé");
        input.home();
        input.delete();
        assert_eq!(input.value, "arginhé");
        input.end();
        input.right();
        assert_eq!(input.cursor, 7);
    }

    #[test]
    fn test_take_resets_cursor() {
        let mut input = TextInput::with_value("Tic Tac");
        assert_eq!(input.take(), "Tic Tac");
        assert!(input.is_blank());
        assert_eq!(input.cursor, 0);
    }
}
