use crate::sim::PetAction;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct InputEvent {
    pub(crate) key: KeyCode,
    pub(crate) mods: KeyModifiers,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Pet(PetAction),
    HelpToggle,
    Quit,
}

pub(crate) fn collect_input_nonblocking(max_wait: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    // the first poll doubles as the frame wait
    let mut timeout = max_wait;
    while event::poll(timeout)? {
        timeout = Duration::ZERO;
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press {
                out.push(InputEvent {
                    key: k.code,
                    mods: k.modifiers,
                });
                if out.len() >= 16 {
                    break;
                }
            }
        }
    }
    Ok(out)
}

pub(crate) fn map_event(help_open: bool, ev: InputEvent) -> Option<Command> {
    if ev.mods.contains(KeyModifiers::CONTROL) {
        return match ev.key {
            KeyCode::Char('c') => Some(Command::Quit),
            _ => None,
        };
    }

    match ev.key {
        KeyCode::Char('q') | KeyCode::Char('Q') => return Some(Command::Quit),
        KeyCode::Char('?') => return Some(Command::HelpToggle),
        KeyCode::Esc if help_open => return Some(Command::HelpToggle),
        KeyCode::Esc => return Some(Command::Quit),
        _ => {}
    }

    if help_open {
        return None;
    }

    let action = match ev.key {
        KeyCode::Char('f') | KeyCode::Char('F') => PetAction::Feed,
        KeyCode::Char('p') | KeyCode::Char('P') => PetAction::Play,
        KeyCode::Char('s') | KeyCode::Char('S') => PetAction::ToggleSleep,
        KeyCode::Char('h') | KeyCode::Char('H') => PetAction::Heal,
        KeyCode::Char(' ') => PetAction::TogglePause,
        KeyCode::Char('r') | KeyCode::Char('R') => PetAction::Reset,
        _ => return None,
    };
    Some(Command::Pet(action))
}
