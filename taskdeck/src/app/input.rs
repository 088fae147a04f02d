//! Single-line text inputs and simple labelled forms.

use std::collections::BTreeMap;

use crossterm::event::{KeyCode, KeyEvent};

/// An editable line of text with a cursor counted in chars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    #[must_use]
    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_index(&self) -> usize {
        self.value
            .char_indices()
            .nth(self.cursor)
            .map_or(self.value.len(), |(i, _)| i)
    }

    pub fn enter_char(&mut self, c: char) {
        let index = self.byte_index();
        self.value.insert(index, c);
        self.cursor += 1;
    }

    pub fn delete_char(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let index = self.byte_index();
            self.value.remove(index);
        }
    }

    pub const fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Applies an editing key. Returns whether the text changed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) => {
                self.enter_char(c);
                true
            }
            KeyCode::Backspace => {
                let before = self.cursor;
                self.delete_char();
                before != self.cursor
            }
            KeyCode::Left => {
                self.move_left();
                false
            }
            KeyCode::Right => {
                self.move_right();
                false
            }
            KeyCode::Home => {
                self.cursor = 0;
                false
            }
            KeyCode::End => {
                self.cursor = self.value.chars().count();
                false
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    /// Server-side field name, used to look up field errors.
    pub key: &'static str,
    pub label: &'static str,
    pub input: TextInput,
    /// Rendered masked.
    pub secret: bool,
}

impl FormField {
    #[must_use]
    pub fn text(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            input: TextInput::default(),
            secret: false,
        }
    }

    #[must_use]
    pub fn secret(key: &'static str, label: &'static str) -> Self {
        Self {
            secret: true,
            ..Self::text(key, label)
        }
    }

    /// This field's entry in a server field-error map.
    #[must_use]
    pub fn error_in<'a>(&self, errors: &'a BTreeMap<String, String>) -> Option<&'a str> {
        errors.get(self.key).map(String::as_str)
    }

    #[must_use]
    pub fn filled(mut self, value: impl Into<String>) -> Self {
        self.input = TextInput::with_value(value);
        self
    }
}

/// A vertical list of fields with one focused at a time.
///
/// `focus` may equal `fields.len()` when a caller adds a non-text slot
/// after the text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub fields: Vec<FormField>,
    pub focus: usize,
    /// Local error shown under the form.
    pub error: Option<String>,
    slots: usize,
}

impl Form {
    #[must_use]
    pub fn new(fields: Vec<FormField>) -> Self {
        let slots = fields.len();
        Self {
            fields,
            focus: 0,
            error: None,
            slots,
        }
    }

    /// Adds `extra` focusable slots after the text fields.
    #[must_use]
    pub const fn with_extra_slots(mut self, extra: usize) -> Self {
        self.slots = self.fields.len() + extra;
        self
    }

    #[must_use]
    pub fn login() -> Self {
        Self::new(vec![
            FormField::text("email", "Email"),
            FormField::secret("password", "Password"),
        ])
    }

    #[must_use]
    pub fn register() -> Self {
        Self::new(vec![
            FormField::text("name", "Name"),
            FormField::text("email", "Email"),
            FormField::secret("password", "Password"),
            FormField::secret("password_confirmation", "Confirm password"),
        ])
    }

    /// Trimmed value of the field named `key`, or "" if absent.
    #[must_use]
    pub fn value(&self, key: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map_or("", |f| f.input.value().trim())
    }

    /// Untrimmed value, for passwords.
    #[must_use]
    pub fn raw(&self, key: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map_or("", |f| f.input.value())
    }

    pub fn next(&mut self) {
        self.focus = (self.focus + 1) % self.slots.max(1);
    }

    pub fn prev(&mut self) {
        let slots = self.slots.max(1);
        self.focus = (self.focus + slots - 1) % slots;
    }

    #[must_use]
    pub fn focused(&self) -> Option<&FormField> {
        self.fields.get(self.focus)
    }

    /// Routes an editing key to the focused text field.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let changed = self
            .fields
            .get_mut(self.focus)
            .is_some_and(|field| field.input.handle_key(key));
        if changed {
            self.error = None;
        }
        changed
    }
}
