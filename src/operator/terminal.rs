//! [`Operator`] implementation for an interactive terminal.

use std::{thread, time::Duration};

use console::{style, Term};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};

use super::{keyboard::poll_cancel, Operator};
use crate::{
    board::DeviceDescriptor,
    request::{self, RequestKind},
};

/// Where to learn how to get a device connection string.
const CONNECTION_STRING_HELP: &str = "https://aka.ms/AA35xln";

/// Typed instead of a value to cancel.
const CANCEL: &str = "-";

/// How long to wait for a key press between two polls of the serial ports.
const WAIT_PERIOD: Duration = Duration::from_secs(1);

/// Talks to the operator on the terminal, with colored prompts and menus.
pub struct ConsoleOperator {
    term: Term,
    theme: ColorfulTheme,
    spinner: Option<ProgressBar>,
}
impl ConsoleOperator {
    pub fn new() -> Self {
        ConsoleOperator {
            term: Term::stderr(),
            theme: ColorfulTheme::default(),
            spinner: None,
        }
    }

    fn finish_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    fn input(
        &self,
        prompt: &str,
        default: Option<&str>,
        validate: fn(&str) -> crate::Result<()>,
    ) -> Option<String> {
        let mut input = Input::<String>::with_theme(&self.theme);
        input
            .with_prompt(format!("{} (`{}` to cancel)", prompt, CANCEL))
            .allow_empty(true)
            .validate_with(move |value: &String| -> Result<(), String> {
                if value.is_empty() || value == CANCEL {
                    Ok(())
                } else {
                    validate(value).map_err(|e| e.to_string())
                }
            });
        if let Some(default) = default {
            input.default(default.to_owned()).show_default(false);
        }

        match input.interact_text_on(&self.term) {
            Ok(value) if value.is_empty() || value == CANCEL => None,
            Ok(value) => Some(value),
            Err(ref e) => {
                info!("error: {}", e.to_string());
                None
            }
        }
    }
}
impl Default for ConsoleOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl Operator for ConsoleOperator {
    fn choose_kind(&mut self) -> Option<RequestKind> {
        let kinds = [RequestKind::ConnectionString, RequestKind::UniqueDeviceSecret];
        let items: Vec<String> = kinds
            .iter()
            .map(|kind| format!("Configure the {}", kind))
            .collect();

        let selection = Select::with_theme(&self.theme)
            .with_prompt(format!(
                "Select what to write to the device (`{}` to cancel):",
                style("Esc").cyan()
            ))
            .items(&items)
            .default(0)
            .interact_on_opt(&self.term);
        match selection {
            Ok(Some(index)) => Some(kinds[index]),
            Ok(None) => {
                debug!("no configuration kind was selected");
                None
            }
            Err(ref e) => {
                info!("error: {}", e.to_string());
                None
            }
        }
    }

    fn connection_string(&mut self, stored: Option<&str>) -> Option<String> {
        if let Some(stored) = stored {
            let summary =
                request::summarize_connection_string(stored).unwrap_or_else(|| "stored".into());
            let items = [
                format!("Use the stored connection string ({})", summary),
                "Input a device connection string".to_owned(),
            ];
            let selection = Select::with_theme(&self.theme)
                .with_prompt("Choose an option:")
                .items(&items)
                .default(0)
                .interact_on_opt(&self.term);
            match selection {
                Ok(Some(0)) => return Some(stored.to_owned()),
                Ok(Some(_)) => {}
                Ok(None) => return None,
                Err(ref e) => {
                    info!("error: {}", e.to_string());
                    return None;
                }
            }
        }

        let value = self.input(
            "Device connection string (HostName=...;DeviceId=...;SharedAccessKey=...)",
            None,
            request::validate_connection_string,
        );
        if value.is_none() {
            self.guide(&format!(
                "Need help to get a device connection string? See {}",
                style(CONNECTION_STRING_HELP).cyan()
            ));
        }
        value
    }

    fn unique_device_secret(&mut self, suggested: &str) -> Option<String> {
        self.input(
            "Unique device secret (64 hexadecimal characters)",
            Some(suggested),
            request::validate_uds,
        )
    }

    fn guide(&mut self, message: &str) {
        self.finish_spinner();
        let _ = self
            .term
            .write_line(&format!("{}", style(format!("[DC] 👉 {}", message)).yellow()));
    }

    fn confirm(&mut self, message: &str) -> bool {
        self.finish_spinner();
        Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(true)
            .interact_on(&self.term)
            .unwrap_or(false)
    }

    fn serial_output(&mut self, line: &str) {
        let _ = self
            .term
            .write_line(&format!("{} {}", style("[DC] device >").dim(), line));
    }

    fn keep_waiting(&mut self, board: &DeviceDescriptor, waited: Duration) -> bool {
        let pb = self.spinner.get_or_insert_with(|| {
            let pb = ProgressBar::new_spinner();
            pb.enable_steady_tick(120);
            pb.set_style(
                ProgressStyle::default_spinner()
                    // For more spinners check out the cli-spinners project:
                    // https://github.com/sindresorhus/cli-spinners/blob/master/spinners.json
                    .tick_strings(&["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"])
                    .template("[DC] {spinner:.blue} {msg}"),
            );
            pb
        });
        pb.set_message(format!(
            "[{:03}s] ⏳ Waiting for {} to be connected (ESC to cancel)...",
            style(waited.as_secs()).dim(),
            style(board.name).cyan()
        ));

        match poll_cancel(WAIT_PERIOD) {
            Ok(true) => {
                pb.finish_with_message(format!(
                    "❌ Waiting for {} canceled after {} seconds",
                    style(board.name).cyan(),
                    style(waited.as_secs()).dim()
                ));
                self.spinner = None;
                false
            }
            Ok(false) => true,
            Err(ref e) => {
                // No usable terminal, just pace the polling.
                debug!("cannot poll the keyboard: {}", e);
                thread::sleep(WAIT_PERIOD);
                true
            }
        }
    }

    fn success(&mut self, message: &str) {
        self.finish_spinner();
        let _ = self
            .term
            .write_line(&format!("{}", style(format!("[DC] ✅ {}", message)).green()));
    }

    fn failure(&mut self, message: &str) {
        self.finish_spinner();
        let _ = self
            .term
            .write_line(&format!("{}", style(format!("[DC] 💥 {}", message)).red()));
    }
}
