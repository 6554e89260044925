use crate::game::GameState;
use crate::input::ChatInput;
use crate::network::ConnectionState;
use macroquad::prelude::*;
use shared::{Position, Tile, HOUSE_SIZE, MAX_CHAT_CHARS};
use std::time::Instant;

const HUD_HEIGHT: f32 = 28.0;
const CHAT_WIDTH: f32 = 360.0;
const CHAT_HEIGHT: f32 = 240.0;
const CLOSE_BOX_SIZE: f32 = 18.0;
const CHAT_LINE_HEIGHT: f32 = 18.0;

/// Where the grid sits on screen for the current window size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub tile: f32,
    pub origin_x: f32,
    pub origin_y: f32,
}

impl Layout {
    /// Largest square tile that fits `rows` x `cols` below the status line,
    /// centred horizontally
    pub fn fit(screen_w: f32, screen_h: f32, rows: usize, cols: usize) -> Self {
        let rows = rows.max(1) as f32;
        let cols = cols.max(1) as f32;
        let available_h = (screen_h - HUD_HEIGHT).max(0.0);
        let tile = (screen_w / cols).min(available_h / rows).floor().max(1.0);

        Layout {
            tile,
            origin_x: ((screen_w - tile * cols) / 2.0).max(0.0),
            origin_y: HUD_HEIGHT,
        }
    }

    pub fn cell(&self, pos: Position) -> (f32, f32) {
        (
            self.origin_x + pos.col as f32 * self.tile,
            self.origin_y + pos.row as f32 * self.tile,
        )
    }
}

/// The chat overlay, anchored to the bottom-right corner
pub fn chat_rect(screen_w: f32, screen_h: f32) -> Rect {
    let w = CHAT_WIDTH.min(screen_w);
    let h = CHAT_HEIGHT.min(screen_h);
    Rect::new(screen_w - w, screen_h - h, w, h)
}

pub fn chat_close_box(screen_w: f32, screen_h: f32) -> Rect {
    let chat = chat_rect(screen_w, screen_h);
    Rect::new(
        chat.x + chat.w - CLOSE_BOX_SIZE - 4.0,
        chat.y + 4.0,
        CLOSE_BOX_SIZE,
        CLOSE_BOX_SIZE,
    )
}

fn tile_color(tile: Tile) -> Color {
    match tile {
        Tile::Grass | Tile::HouseAnchor | Tile::PlayerSpawn => Color::from_rgba(92, 160, 72, 255),
        Tile::Tree => Color::from_rgba(34, 92, 40, 255),
        Tile::Wall => Color::from_rgba(96, 96, 104, 255),
        Tile::Path => Color::from_rgba(196, 170, 120, 255),
    }
}

fn status_text(state: ConnectionState) -> (&'static str, Color) {
    match state {
        ConnectionState::Connecting => ("Connecting...", YELLOW),
        ConnectionState::Connected => ("Connected", GREEN),
        ConnectionState::Disconnected => ("Disconnected, retrying", ORANGE),
        ConnectionState::Closed => ("Connection closed", RED),
    }
}

pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Renderer
    }

    pub fn render(&mut self, game: &GameState, chat_input: &ChatInput, now: Instant) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        let room = game.room();
        let layout = Layout::fit(screen_width(), screen_height(), room.rows(), room.cols());

        self.draw_tiles(game, &layout);
        self.draw_houses(game, &layout);

        for (name, peer) in game.peers().iter() {
            self.draw_player(&layout, peer.position, (0.0, 0.0), Color::from_rgba(255, 68, 68, 255));
            self.draw_name(&layout, peer.position, name);
        }

        let offset = self.local_offset(game, &layout, now);
        let on_path = room.tile(game.position()) == Some(Tile::Path);
        let color = if on_path {
            Color::from_rgba(64, 200, 255, 255)
        } else {
            Color::from_rgba(40, 120, 255, 255)
        };
        self.draw_player(&layout, game.position(), offset, color);
        self.draw_name(&layout, game.position(), game.identity().as_str());

        self.draw_status(game);

        match game.chat() {
            Some(_) => self.draw_chat(game, chat_input),
            None => {
                if let Some(peer) = game.adjacent() {
                    self.draw_prompt(peer);
                }
            }
        }
    }

    pub fn render_loading(&mut self, room_id: &str) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        let text = format!("Loading map {}...", room_id);
        let size = measure_text(&text, None, 32, 1.0);
        draw_text(
            &text,
            (screen_width() - size.width) / 2.0,
            screen_height() / 2.0,
            32.0,
            WHITE,
        );
    }

    /// Persistent screen shown when the room could not be fetched
    pub fn render_load_failure(&mut self, reason: &str) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        let title = "Failed to load map";
        let size = measure_text(title, None, 40, 1.0);
        let x = (screen_width() - size.width) / 2.0;
        let y = screen_height() / 2.0;
        draw_text(title, x, y, 40.0, RED);

        let detail = measure_text(reason, None, 18, 1.0);
        draw_text(
            reason,
            ((screen_width() - detail.width) / 2.0).max(4.0),
            y + 32.0,
            18.0,
            LIGHTGRAY,
        );
    }

    fn draw_tiles(&mut self, game: &GameState, layout: &Layout) {
        for (r, row) in game.room().iter_rows().enumerate() {
            for (c, tile) in row.iter().enumerate() {
                let (x, y) = layout.cell(Position::new(r as i32, c as i32));
                draw_rectangle(x, y, layout.tile, layout.tile, tile_color(*tile));

                if *tile == Tile::Tree {
                    let half = layout.tile / 2.0;
                    draw_circle(x + half, y + half, half * 0.8, Color::from_rgba(20, 64, 28, 255));
                }
            }
        }
    }

    fn draw_houses(&mut self, game: &GameState, layout: &Layout) {
        let size = layout.tile * HOUSE_SIZE as f32;

        for house in game.room().houses() {
            let (x, y) = layout.cell(house.anchor);
            draw_rectangle(x, y, size, size, Color::from_rgba(150, 82, 48, 255));
            draw_triangle(
                vec2(x, y + size * 0.4),
                vec2(x + size / 2.0, y),
                vec2(x + size, y + size * 0.4),
                Color::from_rgba(120, 40, 32, 255),
            );
            draw_rectangle(
                x + size * 0.4,
                y + size * 0.6,
                size * 0.2,
                size * 0.4,
                Color::from_rgba(70, 40, 20, 255),
            );
            draw_rectangle_lines(x, y, size, size, 2.0, BLACK);
        }
    }

    fn local_offset(&self, game: &GameState, layout: &Layout, now: Instant) -> (f32, f32) {
        if game.is_colliding(now) {
            let shake = (get_time() * 60.0).sin() as f32;
            (shake * layout.tile * 0.1, 0.0)
        } else if game.is_moving(now) {
            (0.0, -layout.tile * 0.1)
        } else {
            (0.0, 0.0)
        }
    }

    fn draw_player(&mut self, layout: &Layout, pos: Position, offset: (f32, f32), color: Color) {
        let (x, y) = layout.cell(pos);
        let inset = layout.tile * 0.15;
        let size = layout.tile - inset * 2.0;

        draw_rectangle(x + inset + offset.0, y + inset + offset.1, size, size, color);
        draw_rectangle_lines(x + inset + offset.0, y + inset + offset.1, size, size, 2.0, WHITE);
    }

    fn draw_name(&mut self, layout: &Layout, pos: Position, name: &str) {
        let (x, y) = layout.cell(pos);
        let size = measure_text(name, None, 14, 1.0);
        draw_text(name, x + (layout.tile - size.width) / 2.0, y - 2.0, 14.0, WHITE);
    }

    fn draw_status(&mut self, game: &GameState) {
        let (text, color) = status_text(game.connection());
        draw_rectangle(10.0, 9.0, 10.0, 10.0, color);
        draw_text(text, 26.0, 19.0, 18.0, WHITE);

        let who = format!("{} | {} peers", game.identity(), game.peers().len());
        let size = measure_text(&who, None, 18, 1.0);
        draw_text(&who, screen_width() - size.width - 10.0, 19.0, 18.0, WHITE);
    }

    fn draw_prompt(&mut self, peer: &str) {
        let text = format!("Press C to chat with {}", peer);
        let size = measure_text(&text, None, 22, 1.0);
        let x = (screen_width() - size.width) / 2.0;
        let y = screen_height() - 20.0;

        draw_rectangle(x - 8.0, y - 22.0, size.width + 16.0, 30.0, Color::from_rgba(0, 0, 0, 180));
        draw_text(&text, x, y, 22.0, YELLOW);
    }

    fn draw_chat(&mut self, game: &GameState, chat_input: &ChatInput) {
        let Some(session) = game.chat() else {
            return;
        };
        let panel = chat_rect(screen_width(), screen_height());
        let close = chat_close_box(screen_width(), screen_height());

        draw_rectangle(panel.x, panel.y, panel.w, panel.h, Color::from_rgba(12, 12, 20, 220));
        draw_rectangle_lines(panel.x, panel.y, panel.w, panel.h, 2.0, WHITE);

        let title = format!("Chat with {}", session.recipient());
        draw_text(&title, panel.x + 8.0, panel.y + 18.0, 18.0, WHITE);

        draw_rectangle_lines(close.x, close.y, close.w, close.h, 1.0, WHITE);
        draw_line(close.x + 4.0, close.y + 4.0, close.x + close.w - 4.0, close.y + close.h - 4.0, 2.0, WHITE);
        draw_line(close.x + close.w - 4.0, close.y + 4.0, close.x + 4.0, close.y + close.h - 4.0, 2.0, WHITE);

        let input_y = panel.y + panel.h - 12.0;
        let log_bottom = input_y - CHAT_LINE_HEIGHT - 8.0;
        let visible = ((log_bottom - (panel.y + 28.0)) / CHAT_LINE_HEIGHT).max(0.0) as usize;
        let entries = session.entries();
        let start = entries.len().saturating_sub(visible);

        for (i, entry) in entries[start..].iter().enumerate() {
            let color = if entry.is_system() {
                GRAY
            } else if entry.sender == game.identity().as_str() {
                SKYBLUE
            } else {
                WHITE
            };
            let line = format!("[{}] {}: {}", entry.display_time(), entry.sender, entry.text);
            let y = panel.y + 28.0 + CHAT_LINE_HEIGHT * (i as f32 + 1.0);
            draw_text(&line, panel.x + 8.0, y, 16.0, color);
        }

        draw_line(panel.x, log_bottom + 4.0, panel.x + panel.w, log_bottom + 4.0, 1.0, GRAY);
        draw_text(&format!("> {}", chat_input.as_str()), panel.x + 8.0, input_y, 16.0, WHITE);

        let counter = format!("CHARS: {}/{}", chat_input.len(), MAX_CHAT_CHARS);
        let size = measure_text(&counter, None, 14, 1.0);
        draw_text(&counter, panel.x + panel.w - size.width - 8.0, input_y - CHAT_LINE_HEIGHT, 14.0, GRAY);
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
