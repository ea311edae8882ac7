use std::io::IsTerminal;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use crate::shutdown::ShutdownSignal;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Watch the console for Esc or q and raise `shutdown` when one is pressed.
///
/// Returns `None` when stdin is not a terminal (frames piped into another
/// process, service mode); Ctrl+C still works there.
pub fn spawn_quit_key_monitor(shutdown: Arc<ShutdownSignal>) -> Option<JoinHandle<()>> {
    if !std::io::stdin().is_terminal() {
        debug!("stdin is not a terminal, quit keys disabled");
        return None;
    }

    Some(thread::spawn(move || {
        while !shutdown.is_shutdown() {
            match event::poll(POLL_INTERVAL) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    debug!("Console input unavailable: {}", e);
                    return;
                }
            }
            if let Ok(Event::Key(key)) = event::read()
                && is_quit_key(&key)
            {
                debug!("Quit key pressed: {:?}", key.code);
                shutdown.trigger();
            }
        }
    }))
}

fn is_quit_key(event: &KeyEvent) -> bool {
    match event.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('c') => event.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_keys() {
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Char('Q'), KeyModifiers::SHIFT)));
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn test_other_keys_ignored() {
        assert!(!is_quit_key(&KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE)));
        assert!(!is_quit_key(&KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
        assert!(!is_quit_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
    }
}
