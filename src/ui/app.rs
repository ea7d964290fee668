use std::fs;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tui_input::backend::crossterm::EventHandler;
use tui_widgets::popup::PopupState;

use crate::config::Config;
use crate::form::FormState;
use crate::record::Contact;
use crate::store;

use super::draw;

#[derive(Debug, Clone)]
pub struct ConfirmModal {
    pub title: String,
    pub message: String,
    pub action: ConfirmAction,
}

/// Action to perform when a confirm modal is accepted
#[derive(Debug, Clone)]
pub enum ConfirmAction {
    /// Rename the current file onto an existing destination
    OverwriteRename { dst: PathBuf },
    /// Write over an existing file the rename step did not cover
    OverwriteWrite { dst: PathBuf },
    /// Quit and discard unsaved changes
    DiscardChanges,
}

pub struct App<'a> {
    config: &'a Config,
    pub form: FormState,
    /// Directory all destination names resolve against, taken from the
    /// initial path's parent. Empty when the editor started pathless.
    dir: PathBuf,
    /// Current source path. Set even when no file exists there yet.
    source: Option<PathBuf>,
    /// Last record value known to match what is on disk at `source`.
    persisted: Contact,
    status: Option<(String, Instant)>,
    pub confirm_modal: Option<ConfirmModal>,
    pub modal_popup: PopupState,
    should_quit: bool,
}

/// Title shown for a given name field value.
pub fn title_for<'t>(name: &'t str, default_title: &'t str) -> &'t str {
    let name = name.trim();
    if name.is_empty() {
        default_title
    } else {
        name
    }
}

impl<'a> App<'a> {
    pub fn new(path: Option<PathBuf>, config: &'a Config) -> Self {
        let (dir, form, source, persisted) = match path {
            Some(path) => {
                let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let record = store::load_or_empty(&path);
                let form = FormState::from_contact(&record, &name, &config.labels);
                (dir, form, Some(path), record)
            }
            None => (
                PathBuf::new(),
                FormState::empty(&config.labels),
                None,
                Contact::default(),
            ),
        };

        Self {
            config,
            form,
            dir,
            source,
            persisted,
            status: None,
            confirm_modal: None,
            modal_popup: PopupState::default(),
            should_quit: false,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        let mut shown_title = String::new();
        loop {
            self.expire_status();

            // Reactive title binding: follows the name field, falls back to
            // the configured default when it is blank.
            let title = self.title().to_string();
            if title != shown_title {
                stdout().execute(SetTitle(title.as_str()))?;
                shown_title = title;
            }

            draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(250))? {
                match event::read()? {
                    Event::Key(key) => {
                        if self.handle_key(key)? {
                            break;
                        }
                    }
                    Event::Resize(_, _) => {}
                    _ => {}
                }
            }
        }
        Ok(())
    }

    pub fn title(&self) -> &str {
        title_for(self.form.name.value(), &self.config.default_title)
    }

    pub fn source_display(&self) -> Option<String> {
        self.source.as_ref().map(|p| p.display().to_string())
    }

    pub fn status_text(&self) -> Option<&str> {
        self.status.as_ref().map(|(message, _)| message.as_str())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        // Ctrl+C always quits (hardcoded for safety)
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return Ok(true);
        }

        if self.confirm_modal.is_some() {
            self.handle_confirm_modal_key(key)?;
            return Ok(self.should_quit);
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('s') | KeyCode::Char('S') => {
                    self.save()?;
                    return Ok(false);
                }
                KeyCode::Char('q') | KeyCode::Char('Q') => {
                    return Ok(self.request_close());
                }
                KeyCode::Char('n') | KeyCode::Char('N') => {
                    if !self.form.append_row(&self.config.labels) {
                        self.set_status("Focus a phone or mail row to add one");
                    }
                    return Ok(false);
                }
                KeyCode::Char('d') | KeyCode::Char('D') => {
                    self.form.remove_row(&self.config.labels);
                    return Ok(false);
                }
                KeyCode::Char('l') | KeyCode::Char('L') => {
                    if !self.form.cycle_focused_label(&self.config.labels) {
                        self.set_status("This field has no category label");
                    }
                    return Ok(false);
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::Esc => Ok(self.request_close()),
            KeyCode::Tab | KeyCode::Enter | KeyCode::Down => {
                self.form.focus_next();
                Ok(false)
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.form.focus_prev();
                Ok(false)
            }
            _ => {
                let _ = self.form.focused_input_mut().handle_event(&Event::Key(key));
                Ok(false)
            }
        }
    }

    fn handle_confirm_modal_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(modal) = self.confirm_modal.take() else {
            return Ok(());
        };

        // Decline: abort only the specific pending action
        if matches!(key.code, KeyCode::Esc)
            || matches!(key.code, KeyCode::Char(c) if c.eq_ignore_ascii_case(&'n'))
        {
            match modal.action {
                ConfirmAction::OverwriteRename { dst } => {
                    // Declining covers the rename only; the write step still
                    // runs and makes its own overwrite decision for the target.
                    let (_, candidate) = self.form.collect(&self.dir);
                    self.write_step(dst, candidate, false)?;
                }
                ConfirmAction::OverwriteWrite { .. } => {
                    self.set_status("Save cancelled");
                }
                ConfirmAction::DiscardChanges => {}
            }
            return Ok(());
        }

        // Confirm
        if matches!(key.code, KeyCode::Enter)
            || matches!(key.code, KeyCode::Char(c) if c.eq_ignore_ascii_case(&'y'))
        {
            match modal.action {
                ConfirmAction::OverwriteRename { dst } => {
                    self.rename_source_to(&dst)?;
                    let (_, candidate) = self.form.collect(&self.dir);
                    self.write_step(dst, candidate, true)?;
                }
                ConfirmAction::OverwriteWrite { dst } => {
                    let (_, candidate) = self.form.collect(&self.dir);
                    self.write_step(dst, candidate, true)?;
                }
                ConfirmAction::DiscardChanges => {
                    self.should_quit = true;
                }
            }
            return Ok(());
        }

        // Put the modal back if key wasn't handled
        self.confirm_modal = Some(modal);
        Ok(())
    }

    /// The save decision procedure. Collects a candidate from form state,
    /// decides whether a rename and/or overwrite confirmation is needed,
    /// then runs the write step. Write failures are fatal and propagate.
    pub fn save(&mut self) -> Result<()> {
        let (dst, candidate) = self.form.collect(&self.dir);
        let Some(dst) = dst else {
            self.set_status("Cannot save without a name");
            return Ok(());
        };

        if let Some(source) = self.source.clone() {
            if source != dst {
                if dst.exists() {
                    self.confirm_modal = Some(ConfirmModal {
                        title: "OVERWRITE".to_string(),
                        message: format!("{} already exists. Overwrite?", file_name_of(&dst)),
                        action: ConfirmAction::OverwriteRename { dst },
                    });
                    return Ok(());
                }
                self.rename_source_to(&dst)?;
            }
        }

        self.write_step(dst, candidate, false)
    }

    /// Move the current file to `dst` and repoint the source path. A source
    /// that was never written has nothing to move on disk.
    fn rename_source_to(&mut self, dst: &Path) -> Result<()> {
        if let Some(source) = &self.source {
            if source.exists() {
                fs::rename(source, dst).with_context(|| {
                    format!(
                        "failed to rename {} to {}",
                        source.display(),
                        dst.display()
                    )
                })?;
            }
        }
        self.source = Some(dst.to_path_buf());
        self.set_status("Saved");
        Ok(())
    }

    /// Write `candidate` to `dst` unless nothing changed. Writing over an
    /// existing file that is not the current source asks for consent first,
    /// so a declined rename cannot silently clobber its target.
    fn write_step(&mut self, dst: PathBuf, candidate: Contact, consent_given: bool) -> Result<()> {
        let exists = dst.exists();
        if exists && candidate == self.persisted {
            return Ok(());
        }

        let is_source = self.source.as_deref() == Some(dst.as_path());
        if exists && !is_source && !consent_given {
            self.confirm_modal = Some(ConfirmModal {
                title: "OVERWRITE".to_string(),
                message: format!(
                    "Saving would overwrite {}. Overwrite?",
                    file_name_of(&dst)
                ),
                action: ConfirmAction::OverwriteWrite { dst },
            });
            return Ok(());
        }

        store::save(&dst, &candidate)?;
        self.persisted = candidate;
        self.source = Some(dst);
        self.set_status("Saved");
        Ok(())
    }

    /// Returns true when the window may close now. A dirty form raises the
    /// discard confirmation instead and leaves state untouched.
    pub fn request_close(&mut self) -> bool {
        let (dst, candidate) = self.form.collect(&self.dir);
        if dst == self.source && candidate == self.persisted {
            return true;
        }

        let shown = self.title().to_string();
        self.confirm_modal = Some(ConfirmModal {
            title: "UNSAVED CHANGES".to_string(),
            message: format!("Quit without saving changes to {shown}?"),
            action: ConfirmAction::DiscardChanges,
        });
        false
    }

    fn set_status<S: Into<String>>(&mut self, message: S) {
        self.status = Some((message.into(), Instant::now()));
    }

    fn expire_status(&mut self) {
        if let Some((_, since)) = &self.status {
            if since.elapsed() >= Duration::from_millis(self.config.status_ttl_ms) {
                self.status = None;
            }
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Labeled;
    use tui_input::Input;

    fn config() -> Config {
        Config::default()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn set(input: &mut Input, value: &str) {
        *input = Input::new(value.to_string());
    }

    #[test]
    fn test_title_for() {
        assert_eq!(title_for("alice", "Contact editor"), "alice");
        assert_eq!(title_for("", "Contact editor"), "Contact editor");
        assert_eq!(title_for("   ", "Contact editor"), "Contact editor");
    }

    #[test]
    fn test_save_without_name_is_nonfatal() {
        let config = config();
        let mut app = App::new(None, &config);
        app.save().unwrap();

        assert_eq!(app.status_text(), Some("Cannot save without a name"));
        assert_eq!(app.source, None);
        assert!(app.persisted.is_empty());
    }

    #[test]
    fn test_save_writes_new_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("alice");
        let config = config();
        let mut app = App::new(Some(path.clone()), &config);

        set(&mut app.form.comments, "met at the conference");
        app.save().unwrap();

        assert!(path.exists());
        assert_eq!(app.status_text(), Some("Saved"));
        assert_eq!(
            store::load(&path).unwrap().comments.as_deref(),
            Some("met at the conference")
        );
        assert_eq!(app.persisted.comments.as_deref(), Some("met at the conference"));
    }

    #[test]
    fn test_repeated_save_performs_no_second_write() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("alice");
        let config = config();
        let mut app = App::new(Some(path.clone()), &config);

        set(&mut app.form.comments, "hello");
        app.save().unwrap();

        // Plant a sentinel. If the second save rewrote the file the
        // sentinel would be gone.
        fs::write(&path, "sentinel").unwrap();
        app.save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "sentinel");
        assert!(app.confirm_modal.is_none());
    }

    #[test]
    fn test_rename_without_conflict_needs_no_prompt() {
        let dir = tempfile::TempDir::new().unwrap();
        let bob = dir.path().join("bob");
        let config = config();
        let mut app = App::new(Some(bob.clone()), &config);

        set(&mut app.form.comments, "old friend");
        app.save().unwrap();
        assert!(bob.exists());

        set(&mut app.form.name, "robert");
        app.save().unwrap();

        let robert = dir.path().join("robert");
        assert!(app.confirm_modal.is_none());
        assert!(!bob.exists());
        assert!(robert.exists());
        assert_eq!(app.source, Some(robert.clone()));
        assert_eq!(
            store::load(&robert).unwrap().comments.as_deref(),
            Some("old friend")
        );
    }

    #[test]
    fn test_rename_onto_existing_file_prompts_and_confirm_overwrites() {
        let dir = tempfile::TempDir::new().unwrap();
        let bob = dir.path().join("bob");
        let carol = dir.path().join("carol");
        fs::write(&carol, "{\"comments\": \"the other carol\"}").unwrap();

        let config = config();
        let mut app = App::new(Some(bob.clone()), &config);
        set(&mut app.form.comments, "moving in");
        app.save().unwrap();

        set(&mut app.form.name, "carol");
        app.save().unwrap();

        let modal = app.confirm_modal.as_ref().expect("overwrite prompt");
        assert!(modal.message.contains("carol already exists"));
        assert!(matches!(modal.action, ConfirmAction::OverwriteRename { .. }));

        app.handle_confirm_modal_key(key(KeyCode::Char('y'))).unwrap();
        assert!(!bob.exists());
        assert_eq!(
            store::load(&carol).unwrap().comments.as_deref(),
            Some("moving in")
        );
        assert_eq!(app.source, Some(carol));
    }

    #[test]
    fn test_declined_rename_with_unchanged_content_writes_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let bob = dir.path().join("bob");
        let carol = dir.path().join("carol");
        fs::write(&carol, "{\"comments\": \"the other carol\"}").unwrap();

        let config = config();
        let mut app = App::new(Some(bob.clone()), &config);
        set(&mut app.form.comments, "unchanged");
        app.save().unwrap();

        set(&mut app.form.name, "carol");
        app.save().unwrap();
        assert!(app.confirm_modal.is_some());

        app.handle_confirm_modal_key(key(KeyCode::Char('n'))).unwrap();

        // Candidate equals the persisted record, so the write step stays
        // quiet: no second prompt, both files untouched.
        assert!(app.confirm_modal.is_none());
        assert!(bob.exists());
        assert_eq!(
            store::load(&carol).unwrap().comments.as_deref(),
            Some("the other carol")
        );
        assert_eq!(app.source, Some(bob));
    }

    #[test]
    fn test_declined_rename_with_changed_content_asks_again_before_writing() {
        let dir = tempfile::TempDir::new().unwrap();
        let bob = dir.path().join("bob");
        let carol = dir.path().join("carol");
        fs::write(&carol, "{\"comments\": \"the other carol\"}").unwrap();

        let config = config();
        let mut app = App::new(Some(bob.clone()), &config);
        set(&mut app.form.comments, "v1");
        app.save().unwrap();

        set(&mut app.form.name, "carol");
        set(&mut app.form.comments, "v2");
        app.save().unwrap();
        app.handle_confirm_modal_key(key(KeyCode::Char('n'))).unwrap();

        // Rename was declined but content differs, so the write step asks
        // for consent on its own target instead of clobbering it.
        let modal = app.confirm_modal.as_ref().expect("write consent prompt");
        assert!(matches!(modal.action, ConfirmAction::OverwriteWrite { .. }));

        app.handle_confirm_modal_key(key(KeyCode::Char('y'))).unwrap();
        assert_eq!(store::load(&carol).unwrap().comments.as_deref(), Some("v2"));
        // The declined rename never moved the old file
        assert!(bob.exists());
        assert_eq!(app.source, Some(carol));
    }

    #[test]
    fn test_declining_write_consent_cancels_save() {
        let dir = tempfile::TempDir::new().unwrap();
        let bob = dir.path().join("bob");
        let carol = dir.path().join("carol");
        fs::write(&carol, "{\"comments\": \"the other carol\"}").unwrap();

        let config = config();
        let mut app = App::new(Some(bob), &config);
        set(&mut app.form.comments, "v1");
        app.save().unwrap();

        set(&mut app.form.name, "carol");
        set(&mut app.form.comments, "v2");
        app.save().unwrap();
        app.handle_confirm_modal_key(key(KeyCode::Char('n'))).unwrap();
        app.handle_confirm_modal_key(key(KeyCode::Esc)).unwrap();

        assert_eq!(app.status_text(), Some("Save cancelled"));
        assert_eq!(
            store::load(&carol).unwrap().comments.as_deref(),
            Some("the other carol")
        );
    }

    #[test]
    fn test_request_close_clean_form_closes_silently() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("alice");
        let config = config();
        let mut app = App::new(Some(path), &config);

        set(&mut app.form.comments, "hello");
        app.save().unwrap();

        assert!(app.request_close());
        assert!(app.confirm_modal.is_none());
    }

    #[test]
    fn test_request_close_on_untouched_new_form() {
        let config = config();
        let mut app = App::new(None, &config);
        assert!(app.request_close());
    }

    #[test]
    fn test_request_close_dirty_prompts_and_decline_keeps_editing() {
        let config = config();
        let mut app = App::new(None, &config);
        set(&mut app.form.name, "alice");

        assert!(!app.request_close());
        let modal = app.confirm_modal.as_ref().expect("discard prompt");
        assert!(modal.message.contains("alice"));

        app.handle_confirm_modal_key(key(KeyCode::Char('n'))).unwrap();
        assert!(app.confirm_modal.is_none());
        assert!(!app.should_quit);
        assert_eq!(app.form.name.value(), "alice");

        assert!(!app.request_close());
        app.handle_confirm_modal_key(key(KeyCode::Char('y'))).unwrap();
        assert!(app.should_quit);
    }

    #[test]
    fn test_corrupt_source_file_starts_empty_and_clean() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mangled");
        fs::write(&path, "]] not json").unwrap();

        let config = config();
        let mut app = App::new(Some(path.clone()), &config);
        assert_eq!(app.form.name.value(), "mangled");
        let (dst, candidate) = app.form.collect(&app.dir);
        assert_eq!(dst, Some(path));
        assert!(candidate.is_empty());

        // Nothing was edited, so closing needs no prompt
        assert!(app.request_close());
    }

    #[test]
    fn test_loaded_record_populates_form() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("alice");
        let record = Contact {
            address: Some(Labeled::new("123 Main St", "Home")),
            phones: vec![Labeled::new("555-1234", "Mobile")],
            mails: Vec::new(),
            comments: None,
        };
        store::save(&path, &record).unwrap();

        let config = config();
        let app = App::new(Some(path), &config);
        assert_eq!(app.form.address.text.value(), "123 Main St");
        assert_eq!(app.form.phones[0].label, "Mobile");
        assert_eq!(app.persisted, record);
    }

    #[test]
    fn test_typing_goes_to_focused_field_and_ctrl_c_quits() {
        let config = config();
        let mut app = App::new(None, &config);

        assert!(!app.handle_key(key(KeyCode::Char('x'))).unwrap());
        assert_eq!(app.form.name.value(), "x");

        assert!(!app.handle_key(key(KeyCode::Tab)).unwrap());
        assert!(!app.handle_key(key(KeyCode::Char('y'))).unwrap());
        assert_eq!(app.form.address.text.value(), "y");

        assert!(app.handle_key(ctrl('c')).unwrap());
    }

    #[test]
    fn test_status_expires_after_ttl() {
        let mut config = config();
        config.status_ttl_ms = 0;
        let mut app = App::new(None, &config);

        app.set_status("blink");
        app.expire_status();
        assert_eq!(app.status_text(), None);
    }
}
