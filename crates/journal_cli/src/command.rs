use anyhow::{Context, Result, bail};
use journal_types::EntryDate;

pub const HELP: &str = "\
commands:
  set <field> <value>      set a text or select field (empty value clears it)
  check <field>            tick a checkbox
  uncheck <field>          untick a checkbox
  attach <field> <count>   pretend <count> files were picked
  date <YYYY-MM-DD>        save and switch to another day
  reset                    blank entry for today
  show                     print the current form
  list                     print saved entries, newest first
  delete <YYYY-MM-DD>      delete a saved entry
  options <field>          print the choices of a select field
  login <email>            email a one-time sign-in code
  verify <email> <code>    sign in with the code
  logout                   sign out
  save                     save now instead of waiting
  help                     this text
  quit                     save and exit";

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set { field: String, value: String },
    Check { field: String, checked: bool },
    Attach { field: String, count: u32 },
    Date(EntryDate),
    Reset,
    Show,
    List,
    Delete(EntryDate),
    Options(String),
    Login(String),
    Verify { email: String, code: String },
    Logout,
    Save,
    Help,
    Quit,
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (input, ""),
    }
}

fn required<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    if value.is_empty() {
        bail!("missing {what}");
    }
    Ok(value)
}

fn date_arg(raw: &str) -> Result<EntryDate> {
    EntryDate::parse(required(raw, "date")?)
        .with_context(|| format!("`{raw}` is not a YYYY-MM-DD date"))
}

impl Command {
    /// Parses a prompt line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let (verb, rest) = split_word(line);
        let command = match verb {
            "" => return Ok(None),
            "set" => {
                let (field, value) = split_word(rest);
                Command::Set {
                    field: required(field, "field")?.to_string(),
                    value: value.trim_end().to_string(),
                }
            }
            "check" | "uncheck" => Command::Check {
                field: required(rest, "field")?.to_string(),
                checked: verb == "check",
            },
            "attach" => {
                let (field, count) = split_word(rest);
                let count = required(count, "count")?;
                Command::Attach {
                    field: required(field, "field")?.to_string(),
                    count: count
                        .parse()
                        .with_context(|| format!("`{count}` is not a file count"))?,
                }
            }
            "date" => Command::Date(date_arg(rest)?),
            "reset" => Command::Reset,
            "show" => Command::Show,
            "list" | "ls" => Command::List,
            "delete" | "rm" => Command::Delete(date_arg(rest)?),
            "options" => Command::Options(required(rest, "field")?.to_string()),
            "login" => Command::Login(required(rest, "email")?.to_string()),
            "verify" => {
                let (email, code) = split_word(rest);
                Command::Verify {
                    email: required(email, "email")?.to_string(),
                    code: required(code.trim_end(), "code")?.to_string(),
                }
            }
            "logout" => Command::Logout,
            "save" => Command::Save,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("unknown command `{other}`, try `help`"),
        };
        Ok(Some(command))
    }
}
