//! Line-driven terminal form backed by a `RateSync`

use super::ui;
use crate::core::query::parse_date;
use crate::core::{RateProvider, RateSource};
use crate::sync::{EventBus, FormEvent, FormView, MemoryView, RateSync};
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use indicatif::ProgressBar;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str = "Commands: usd <amount> | ved <amount> | date <YYYY-MM-DD|-> | source <BCV|paralelo> | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Usd(String),
    Ved(String),
    Date(Option<NaiveDate>),
    Source(RateSource),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    let (word, arg) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let arg = arg.trim();

    match word.to_lowercase().as_str() {
        "usd" | "$" => Ok(Command::Usd(arg.to_string())),
        "ved" | "bs" => Ok(Command::Ved(arg.to_string())),
        "date" => Ok(Command::Date(parse_date(arg)?)),
        "source" => Ok(Command::Source(arg.parse()?)),
        "help" | "?" | "" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(anyhow!("Unknown command: {other}")),
    }
}

/// Prints every field change to stdout and shows a spinner while disabled.
pub struct TerminalView {
    form: MemoryView,
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalView {
    pub fn new(source: RateSource, date: Option<NaiveDate>) -> Self {
        Self {
            form: MemoryView::new(source, date),
            spinner: Mutex::new(None),
        }
    }

    pub fn form(&self) -> &MemoryView {
        &self.form
    }
}

impl FormView for TerminalView {
    fn set_controls_enabled(&self, enabled: bool) {
        self.form.set_controls_enabled(enabled);
        let mut spinner = self.spinner.lock().unwrap_or_else(PoisonError::into_inner);
        if enabled {
            if let Some(pb) = spinner.take() {
                pb.finish_and_clear();
            }
        } else if spinner.is_none() {
            *spinner = Some(ui::new_spinner("Fetching rate..."));
        }
    }

    fn set_rate_text(&self, text: &str) {
        self.form.set_rate_text(text);
        println!(
            "{} {}",
            ui::style_text("Rate:", ui::StyleType::TotalLabel),
            ui::style_text(text, ui::StyleType::TotalValue)
        );
    }

    fn usd_value(&self) -> Option<Decimal> {
        self.form.usd_value()
    }

    fn set_usd_text(&self, text: &str) {
        self.form.set_usd_text(text);
        println!("$ {}", ui::style_text(text, ui::StyleType::TotalValue));
    }

    fn set_ved_text(&self, text: &str) {
        self.form.set_ved_text(text);
        println!("Bs. {}", ui::style_text(text, ui::StyleType::TotalValue));
    }

    fn source(&self) -> RateSource {
        self.form.source()
    }

    fn date(&self) -> Option<NaiveDate> {
        self.form.date()
    }
}

/// Applies a command to the form and returns false once the user quits.
pub fn apply_command<V>(sync: &RateSync<V>, form: &MemoryView, command: Command) -> bool
where
    V: FormView + 'static,
{
    let bus = sync.bus();
    match command {
        // The date field stays usable while a fetch is outstanding.
        Command::Date(date) => {
            form.set_date(date);
            bus.emit(&FormEvent::DateChanged(date));
        }
        Command::Usd(_) | Command::Ved(_) | Command::Source(_) if !form.controls_enabled() => {
            println!(
                "{}",
                ui::style_text("Waiting for the rate, try again", ui::StyleType::Error)
            );
        }
        Command::Usd(text) => {
            form.set_usd_text(&text);
            bus.emit(&FormEvent::UsdInput(text));
        }
        Command::Ved(text) => {
            form.set_ved_text(&text);
            bus.emit(&FormEvent::VedInput(text));
        }
        Command::Source(source) => {
            form.set_source(source);
            bus.emit(&FormEvent::SourceChanged(source));
        }
        Command::Help => println!("{}", ui::style_text(HELP, ui::StyleType::Subtle)),
        Command::Quit => return false,
    }
    true
}

pub async fn run_interactive(
    provider: Arc<dyn RateProvider>,
    source: RateSource,
    date: Option<NaiveDate>,
) -> Result<()> {
    let view = Arc::new(TerminalView::new(source, date));
    let sync = RateSync::new(provider, Arc::clone(&view), EventBus::new());
    sync.wire();

    println!("{}", ui::style_text("USD / VED converter", ui::StyleType::Title));
    println!("{}", ui::style_text(HELP, ui::StyleType::Subtle));
    // The initial fetch runs detached; its outcome reaches the form through the bus.
    drop(sync.start());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(command) => {
                debug!(?command, "Applying command");
                if !apply_command(&sync, view.form(), command) {
                    break;
                }
            }
            Err(e) => println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error)),
        }
    }
    Ok(())
}
