use std::path::{Path, PathBuf};

use tui_input::Input;

use crate::config::LabelPresets;
use crate::record::{Contact, Labeled};

/// Which form field currently receives key input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Name,
    Address,
    Phone(usize),
    Mail(usize),
    Comments,
}

/// One text + category cell, as used by the address field and every
/// phone/mail row.
pub struct FieldRow {
    pub text: Input,
    pub label: String,
}

impl FieldRow {
    fn blank(presets: &[String]) -> Self {
        Self {
            text: Input::default(),
            label: presets.first().cloned().unwrap_or_default(),
        }
    }

    fn from_pair(pair: &Labeled) -> Self {
        Self {
            text: Input::new(pair.text.clone()),
            label: pair.label.clone(),
        }
    }

    /// Advance to the next preset label. A label loaded from disk that is
    /// not in the preset list cycles to the first preset.
    pub fn cycle_label(&mut self, presets: &[String]) {
        if presets.is_empty() {
            return;
        }
        let next = presets
            .iter()
            .position(|label| label == &self.label)
            .map(|index| (index + 1) % presets.len())
            .unwrap_or(0);
        self.label = presets[next].clone();
    }

    fn to_pair(&self) -> Option<Labeled> {
        let text = self.text.value();
        if text.is_empty() {
            return None;
        }
        Some(Labeled::new(text, self.label.clone()))
    }
}

/// The on-screen form. This is the only mutable state between saves; the
/// controller never edits a record in place, it rebuilds one from here.
pub struct FormState {
    pub name: Input,
    pub address: FieldRow,
    pub phones: Vec<FieldRow>,
    pub mails: Vec<FieldRow>,
    pub comments: Input,
    pub focus: Focus,
}

impl FormState {
    /// Build the form from a loaded record. The name field comes from the
    /// source file name, not the record; name is filesystem identity.
    pub fn from_contact(contact: &Contact, name: &str, presets: &LabelPresets) -> Self {
        let address = contact
            .address
            .as_ref()
            .map(FieldRow::from_pair)
            .unwrap_or_else(|| FieldRow::blank(&presets.address));

        let phones = rows_from_pairs(&contact.phones, &presets.phone);
        let mails = rows_from_pairs(&contact.mails, &presets.mail);

        Self {
            name: Input::new(name.to_string()),
            address,
            phones,
            mails,
            comments: Input::new(contact.comments.clone().unwrap_or_default()),
            focus: Focus::Name,
        }
    }

    pub fn empty(presets: &LabelPresets) -> Self {
        Self::from_contact(&Contact::default(), "", presets)
    }

    /// Derive `(destination, candidate record)` from current form state.
    /// Pure and idempotent; rows with empty text are never included and the
    /// destination is absent when the trimmed name is blank.
    pub fn collect(&self, dir: &Path) -> (Option<PathBuf>, Contact) {
        let name = self.name.value().trim();
        let dst = if name.is_empty() {
            None
        } else {
            Some(dir.join(name))
        };

        let comments = self.comments.value();
        let contact = Contact {
            address: self.address.to_pair(),
            phones: self.phones.iter().filter_map(FieldRow::to_pair).collect(),
            mails: self.mails.iter().filter_map(FieldRow::to_pair).collect(),
            comments: (!comments.is_empty()).then(|| comments.to_string()),
        };

        (dst, contact)
    }

    pub fn focused_input_mut(&mut self) -> &mut Input {
        match self.focus {
            Focus::Name => &mut self.name,
            Focus::Address => &mut self.address.text,
            Focus::Phone(index) => {
                let index = index.min(self.phones.len() - 1);
                &mut self.phones[index].text
            }
            Focus::Mail(index) => {
                let index = index.min(self.mails.len() - 1);
                &mut self.mails[index].text
            }
            Focus::Comments => &mut self.comments,
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = match self.focus {
            Focus::Name => Focus::Address,
            Focus::Address => Focus::Phone(0),
            Focus::Phone(index) if index + 1 < self.phones.len() => Focus::Phone(index + 1),
            Focus::Phone(_) => Focus::Mail(0),
            Focus::Mail(index) if index + 1 < self.mails.len() => Focus::Mail(index + 1),
            Focus::Mail(_) => Focus::Comments,
            Focus::Comments => Focus::Name,
        };
    }

    pub fn focus_prev(&mut self) {
        self.focus = match self.focus {
            Focus::Name => Focus::Comments,
            Focus::Address => Focus::Name,
            Focus::Phone(0) => Focus::Address,
            Focus::Phone(index) => Focus::Phone(index - 1),
            Focus::Mail(0) => Focus::Phone(self.phones.len() - 1),
            Focus::Mail(index) => Focus::Mail(index - 1),
            Focus::Comments => Focus::Mail(self.mails.len() - 1),
        };
    }

    /// Append a row to the focused repeating section and move focus onto it.
    /// No-op outside the phone/mail sections.
    pub fn append_row(&mut self, presets: &LabelPresets) -> bool {
        match self.focus {
            Focus::Phone(_) => {
                self.phones.push(FieldRow::blank(&presets.phone));
                self.focus = Focus::Phone(self.phones.len() - 1);
                true
            }
            Focus::Mail(_) => {
                self.mails.push(FieldRow::blank(&presets.mail));
                self.focus = Focus::Mail(self.mails.len() - 1);
                true
            }
            _ => false,
        }
    }

    /// Remove the focused row. Each section keeps at least one row on
    /// screen; the last row is cleared instead of removed.
    pub fn remove_row(&mut self, presets: &LabelPresets) -> bool {
        match self.focus {
            Focus::Phone(index) => {
                if self.phones.len() > 1 {
                    self.phones.remove(index);
                    self.focus = Focus::Phone(index.min(self.phones.len() - 1));
                } else {
                    self.phones[0] = FieldRow::blank(&presets.phone);
                }
                true
            }
            Focus::Mail(index) => {
                if self.mails.len() > 1 {
                    self.mails.remove(index);
                    self.focus = Focus::Mail(index.min(self.mails.len() - 1));
                } else {
                    self.mails[0] = FieldRow::blank(&presets.mail);
                }
                true
            }
            _ => false,
        }
    }

    /// Cycle the category label of the focused field, if it has one.
    pub fn cycle_focused_label(&mut self, presets: &LabelPresets) -> bool {
        match self.focus {
            Focus::Address => {
                self.address.cycle_label(&presets.address);
                true
            }
            Focus::Phone(index) => {
                self.phones[index].cycle_label(&presets.phone);
                true
            }
            Focus::Mail(index) => {
                self.mails[index].cycle_label(&presets.mail);
                true
            }
            _ => false,
        }
    }
}

fn rows_from_pairs(pairs: &[Labeled], presets: &[String]) -> Vec<FieldRow> {
    if pairs.is_empty() {
        vec![FieldRow::blank(presets)]
    } else {
        pairs.iter().map(FieldRow::from_pair).collect()
    }
}
