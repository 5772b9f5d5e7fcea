use std::io::stdout;
use std::time::Duration;

use crossterm::{
    cursor::{Hide, MoveToColumn, Show},
    event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
    Result,
};

/// Wait up to `timeout` for a key press and tell whether the operator asked
/// to cancel with `Esc` or `Ctrl+C`.
pub(crate) fn poll_cancel(timeout: Duration) -> Result<bool> {
    enable_raw_mode()?;
    execute!(stdout(), Hide)?;
    let ready = poll(timeout);
    // Leave raw mode whatever happened while polling.
    execute!(stdout(), MoveToColumn(0), Show)?;
    disable_raw_mode()?;

    if !ready? {
        return Ok(false);
    }

    // It's guaranteed that read() wont block if `poll` returns `Ok(true)`
    let event = read()?;
    // As we are in raw mode, Ctrl+C is captured here as a key event.
    let ctrl_c = Event::Key(KeyEvent {
        modifiers: KeyModifiers::CONTROL,
        code: KeyCode::Char('c'),
    });
    Ok(event == Event::Key(KeyCode::Esc.into()) || event == ctrl_c)
}
