use crate::panel::{Button, PanelAction};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InputEvent {
    Action(PanelAction),
    Resize(u16, u16),
}

/// Waits up to `timeout` for the next meaningful event.
pub(crate) fn next_event(timeout: Duration) -> anyhow::Result<Option<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    Ok(match event::read()? {
        Event::Key(k) if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat => {
            map_key(k).map(InputEvent::Action)
        }
        Event::Resize(w, h) => Some(InputEvent::Resize(w, h)),
        _ => None,
    })
}

pub(crate) fn map_key(k: KeyEvent) -> Option<PanelAction> {
    if matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        && k.modifiers.contains(KeyModifiers::CONTROL)
    {
        return Some(PanelAction::Quit);
    }
    match k.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(PanelAction::Quit),
        KeyCode::Up | KeyCode::Char('k') => Some(PanelAction::Up),
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => Some(PanelAction::Down),
        KeyCode::Left | KeyCode::Char('-') | KeyCode::Char('_') => Some(PanelAction::Decrease),
        KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => Some(PanelAction::Increase),
        KeyCode::Enter | KeyCode::Char(' ') => Some(PanelAction::Press),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(PanelAction::Hotkey(Button::Shuffle)),
        KeyCode::Char('d') | KeyCode::Char('D') => Some(PanelAction::Hotkey(Button::Download)),
        _ => None,
    }
}
