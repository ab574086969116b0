use std::sync::Arc;

use anyhow::{Context, Result, bail};
use autosave::{JournalPage, LoadSource, SaveStatus};
use catalogs::Catalog;
use form_codec::{DATE_FIELD, FieldKind, FieldValue, FormSurface, MemoryForm};
use journal_types::{Entry, EntryDate, SessionGate};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::command::{Command, HELP};

enum Flow {
    Continue,
    Quit,
}

pub struct Repl {
    page: JournalPage<MemoryForm>,
    gate: Option<Arc<dyn SessionGate>>,
}

impl Repl {
    pub fn new(page: JournalPage<MemoryForm>, gate: Option<Arc<dyn SessionGate>>) -> Self {
        Self { page, gate }
    }

    /// Reads commands until `quit` or end of input. A pending save and any
    /// remote writes still in flight are finished on the way out.
    pub async fn run(self, date_override: Option<EntryDate>) -> Result<()> {
        if let Some(gate) = &self.gate {
            self.page.resolve_session(gate.as_ref()).await;
        }
        let source = self.page.open(date_override).await;
        self.announce(source);
        spawn_status_printer(&self.page);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
            let command = match Command::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(err) => {
                    println!("{err:#}");
                    continue;
                }
            };
            match self.execute(command).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(err) => println!("{err:#}"),
            }
        }

        if let Some(entry) = self.page.shutdown().await? {
            info!(date = %entry.date, "pending save flushed on exit");
        }
        Ok(())
    }

    fn announce(&self, source: LoadSource) {
        let date = self
            .page
            .active_date()
            .map(|date| date.human())
            .unwrap_or_default();
        let origin = match source {
            LoadSource::Remote => "loaded from your account",
            LoadSource::Local => "loaded from this device",
            LoadSource::Empty => "new entry",
        };
        let who = match self.page.account() {
            Some(account) => format!("signed in as {}", account.email),
            None => "not signed in".to_string(),
        };
        println!("{date}: {origin} ({who}). Type `help` for commands.");
    }

    fn gate(&self) -> Result<&Arc<dyn SessionGate>> {
        self.gate
            .as_ref()
            .context("remote sync is not configured; set `remote` in config.json")
    }

    async fn execute(&self, command: Command) -> Result<Flow> {
        match command {
            Command::Set { field, value } => self.set_text(&field, value)?,
            Command::Check { field, checked } => {
                self.expect_kind(&field, FieldKind::Boolean)?;
                self.page.edit(|form| form.set_checked(&field, checked));
            }
            Command::Attach { field, count } => {
                self.expect_kind(&field, FieldKind::FileMarker)?;
                self.page.edit(|form| form.select_files(&field, count));
            }
            Command::Date(date) => {
                let source = self.page.switch_date(date).await?;
                self.announce(source);
            }
            Command::Reset => {
                self.page.reset_today();
                println!("Cleared.");
            }
            Command::Show => print_form(&self.page.form().lock()),
            Command::List => print_library(&self.page.entries()),
            Command::Delete(date) => {
                if self.page.delete(&date)? {
                    println!("Deleted {}.", date.human());
                } else {
                    println!("No entry for {}.", date.human());
                }
            }
            Command::Options(field) => print_options(&field)?,
            Command::Login(email) => {
                self.gate()?.request_code(&email).await?;
                println!("Code sent to {email}. Run `verify {email} <code>`.");
            }
            Command::Verify { email, code } => {
                let account = self.gate()?.verify_code(&email, &code).await?;
                self.page.set_account(Some(account));
                let source = self.page.load(None).await;
                self.announce(source);
            }
            Command::Logout => {
                self.gate()?.sign_out().await?;
                self.page.set_account(None);
                println!("Signed out.");
            }
            Command::Save => match self.page.flush()? {
                Some(_) => {}
                None => println!("Nothing to save."),
            },
            Command::Help => println!("{HELP}"),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn expect_kind(&self, field: &str, expected: FieldKind) -> Result<()> {
        let kind = self.page.form().lock().kind_of(field);
        match kind {
            Some(kind) if kind == expected => Ok(()),
            Some(kind) => bail!("`{field}` is a {kind:?} field"),
            None => bail!("unknown field `{field}`"),
        }
    }

    fn set_text(&self, field: &str, value: String) -> Result<()> {
        if field == DATE_FIELD {
            bail!("use `date YYYY-MM-DD` to change the day");
        }
        self.expect_kind(field, FieldKind::Text)?;
        check_option(field, &value)?;
        self.page.edit(|form| form.set_text(field, value));
        Ok(())
    }
}

/// Select fields only take values from their catalog.
fn check_option(field: &str, value: &str) -> Result<()> {
    match Catalog::for_field(field) {
        Some(catalog) if !catalog.contains(value) => bail!(
            "`{value}` is not a {} option, see `options {field}`",
            catalog.name()
        ),
        _ => Ok(()),
    }
}

fn spawn_status_printer(page: &JournalPage<MemoryForm>) {
    let mut status = page.status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            match &*status.borrow_and_update() {
                SaveStatus::Saved { date, .. } => println!("Saved ✓ {}", date.human()),
                SaveStatus::Failed { message } => {
                    warn!(%message, "save failure shown to user");
                    println!("Save failed: {message}");
                }
                SaveStatus::Idle => {}
            }
        }
    });
}

fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Flag(true) => "[x]".to_string(),
        FieldValue::Flag(false) => "[ ]".to_string(),
        FieldValue::Files { file_count } => format!("{file_count} file(s)"),
        other => other.to_text(),
    }
}

fn print_form(form: &MemoryForm) {
    let snapshot = form_codec::capture(form);
    for descriptor in form.descriptors() {
        let value = snapshot
            .get(&descriptor.id)
            .map(render_value)
            .unwrap_or_default();
        println!("{:>18} ({}): {value}", descriptor.label, descriptor.id);
    }
}

pub fn print_library(entries: &[Entry]) {
    if entries.is_empty() {
        println!("No entries yet.");
        return;
    }
    for entry in entries {
        let title = if entry.title.is_empty() {
            "(untitled)"
        } else {
            entry.title.as_str()
        };
        let tags: Vec<&str> = [entry.mood.as_str(), entry.era.as_str()]
            .into_iter()
            .filter(|tag| !tag.is_empty())
            .collect();
        println!("{}  {:<14} {title}  {}", entry.date, entry.date.human(), tags.join(" · "));
    }
}

fn print_options(field: &str) -> Result<()> {
    let catalog = Catalog::for_field(field)
        .with_context(|| format!("`{field}` has no fixed options"))?;
    for option in catalog.options() {
        if option.value == option.label {
            println!("{}", option.value);
        } else {
            println!("{:<8} {}", option.value, option.label);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_fields_reject_values_outside_catalog() {
        assert!(check_option("mood", "Still Standing").is_ok());
        assert!(check_option("mood", "").is_ok());
        assert!(check_option("mood", "Ecstatic Beyond Words").is_err());
        assert!(check_option("weight", "180").is_ok());
        assert!(check_option("title", "anything at all").is_ok());
    }

    #[test]
    fn renders_each_value_kind() {
        assert_eq!(render_value(&FieldValue::Flag(true)), "[x]");
        assert_eq!(render_value(&FieldValue::Files { file_count: 2 }), "2 file(s)");
        assert_eq!(render_value(&FieldValue::text("A")), "A");
    }
}
