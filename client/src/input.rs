//! Keyboard and mouse handling, turned into game events
//!
//! Only key presses matter: every press is one event, held keys do not repeat
//! moves. While a chat is open the keyboard types into the chat line instead
//! of moving the player.

use macroquad::prelude::*;
use shared::{Direction, MAX_CHAT_CHARS};

/// One discrete action produced by the input surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Move(Direction),
    OpenChat,
    CloseChat,
    Cancel,
    Submit(String),
}

/// Maps a pressed key to an event, ignoring keys used for typing
pub fn key_to_event(key: KeyCode, chat_open: bool) -> Option<InputEvent> {
    if chat_open {
        return match key {
            KeyCode::Escape => Some(InputEvent::Cancel),
            _ => None,
        };
    }

    match key {
        KeyCode::Up | KeyCode::W => Some(InputEvent::Move(Direction::Up)),
        KeyCode::Down | KeyCode::S => Some(InputEvent::Move(Direction::Down)),
        KeyCode::Left | KeyCode::A => Some(InputEvent::Move(Direction::Left)),
        KeyCode::Right | KeyCode::D => Some(InputEvent::Move(Direction::Right)),
        KeyCode::C => Some(InputEvent::OpenChat),
        _ => None,
    }
}

/// The chat line being typed, capped at [`MAX_CHAT_CHARS`] characters
#[derive(Debug, Clone, Default)]
pub struct ChatInput {
    text: String,
}

impl ChatInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the character was refused
    pub fn push(&mut self, c: char) -> bool {
        if c.is_control() || self.len() >= MAX_CHAT_CHARS {
            return false;
        }
        self.text.push(c);
        true
    }

    pub fn backspace(&mut self) {
        self.text.pop();
    }

    /// Empties the line and returns what was typed
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

pub struct InputManager {
    chat_input: ChatInput,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            chat_input: ChatInput::new(),
        }
    }

    /// Collects this frame's events.
    ///
    /// `close_box` is the screen rectangle of the chat's close button while a
    /// chat is open.
    pub fn update(&mut self, chat_open: bool, close_box: Option<Rect>) -> Vec<InputEvent> {
        let mut events = Vec::new();

        // Drained every frame, typing only counts while the chat is open.
        let mut typed = Vec::new();
        while let Some(c) = get_char_pressed() {
            typed.push(c);
        }

        if !chat_open {
            self.chat_input.clear();
        }

        for key in get_keys_pressed() {
            if let Some(event) = key_to_event(key, chat_open) {
                events.push(event);
            }
        }

        if chat_open {
            for c in typed {
                self.chat_input.push(c);
            }
            if is_key_pressed(KeyCode::Backspace) {
                self.chat_input.backspace();
            }
            if is_key_pressed(KeyCode::Enter) || is_key_pressed(KeyCode::KpEnter) {
                events.push(InputEvent::Submit(self.chat_input.take()));
            }

            if let Some(close_box) = close_box {
                let (x, y) = mouse_position();
                if is_mouse_button_pressed(MouseButton::Left) && close_box.contains(vec2(x, y)) {
                    events.push(InputEvent::CloseChat);
                }
            }
        }

        events
    }

    pub fn chat_input(&self) -> &ChatInput {
        &self.chat_input
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
