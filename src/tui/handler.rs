use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::InputMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    Refresh,
    ShowSettings,
    ShowDashboard,
    OpenTokenPage,
    EditRange,
    ResetRange,
    ShowHelp,
    HideHelp,
    // Token form actions
    TokenInputChar(char),
    TokenInputBackspace,
    TokenInputConfirm,
    TokenInputCancel,
    // Date range input actions
    RangeInputChar(char),
    RangeInputBackspace,
    RangeInputConfirm,
    RangeInputCancel,
}

pub fn handle_key_event(key: KeyEvent, mode: InputMode, show_help: bool) -> Option<AppAction> {
    // Ctrl-C always quits
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(AppAction::Quit);
    }

    // If help is showing, any key closes it
    if show_help {
        return Some(AppAction::HideHelp);
    }

    match mode {
        InputMode::Token => match key.code {
            KeyCode::Enter => Some(AppAction::TokenInputConfirm),
            KeyCode::Esc => Some(AppAction::TokenInputCancel),
            KeyCode::Backspace => Some(AppAction::TokenInputBackspace),
            KeyCode::Char(c) => Some(AppAction::TokenInputChar(c)),
            _ => None,
        },

        InputMode::Range => match key.code {
            KeyCode::Enter => Some(AppAction::RangeInputConfirm),
            KeyCode::Esc => Some(AppAction::RangeInputCancel),
            KeyCode::Backspace => Some(AppAction::RangeInputBackspace),
            KeyCode::Char(c) => Some(AppAction::RangeInputChar(c)),
            _ => None,
        },

        InputMode::Normal => match key.code {
            KeyCode::Char('q') => Some(AppAction::Quit),
            KeyCode::Char('r') => Some(AppAction::Refresh),
            KeyCode::Char('s') => Some(AppAction::ShowSettings),
            KeyCode::Char('o') => Some(AppAction::OpenTokenPage),
            KeyCode::Char('c') => Some(AppAction::EditRange),
            KeyCode::Char('y') => Some(AppAction::ResetRange),
            KeyCode::Char('?') => Some(AppAction::ShowHelp),
            KeyCode::Esc => Some(AppAction::ShowDashboard),
            _ => None,
        },
    }
}
