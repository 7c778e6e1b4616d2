//! Draw commands and frame batching for the render sink
//!
//! The simulation never talks to a drawing surface directly: each tick it
//! submits an ordered batch of [`DrawCmd`]s into whatever [`RenderSink`] is
//! passed in, and the peer replays them however it likes. Sinks are handed
//! to the draw calls per tick, never cached by an entity.

use serde::{Deserialize, Serialize};

use crate::game::r#match::MatchPhase;
use crate::ws::protocol::PlayerSide;

/// One drawing instruction, in the order it must be replayed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCmd {
    /// Wipe the whole surface
    Clear,

    /// Filled circle
    Circle {
        x: f32,
        y: f32,
        radius: f32,
        color: String,
    },

    /// Filled rectangle
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: String,
    },

    /// Text run
    Text {
        x: f32,
        y: f32,
        font: String,
        color: String,
        text: String,
    },

    /// Cursor affordance over the play surface
    Cursor { hidden: bool },
}

/// Anything that accepts a tick's draw commands
pub trait RenderSink {
    fn submit(&mut self, cmd: DrawCmd);
}

/// Per-tick command batch, drained into a frame broadcast
#[derive(Debug, Default)]
pub struct FrameBuffer {
    commands: Vec<DrawCmd>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_commands(self) -> Vec<DrawCmd> {
        self.commands
    }

    pub fn commands(&self) -> &[DrawCmd] {
        &self.commands
    }
}

impl RenderSink for FrameBuffer {
    fn submit(&mut self, cmd: DrawCmd) {
        self.commands.push(cmd);
    }
}

/// Decides which ticks' frames get broadcast to the peer
pub struct FrameCadence {
    ticks_since_frame: u32,
    frame_interval: u32,
}

impl FrameCadence {
    pub fn new(frame_interval: u32) -> Self {
        Self {
            ticks_since_frame: 0,
            frame_interval,
        }
    }

    /// Check if it's time to send a frame
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_frame += 1;
        if self.ticks_since_frame >= self.frame_interval {
            self.ticks_since_frame = 0;
            true
        } else {
            false
        }
    }

    /// Force a frame on the next check (used after scoring and phase changes)
    pub fn force_next(&mut self) {
        self.ticks_since_frame = self.frame_interval;
    }
}

const HINT_FONT: &str = "60px Arial";
const SCORE_FONT: &str = "200px Arial";
const WINNER_FONT: &str = "120px Arial";
const OVERLAY_INK: &str = "rgb(0, 0, 0)";
const SCORE_INK: &str = "rgba(0, 0, 0, 0.1)";
const START_HINT: &str = "Press Enter to start";

/// Draw the score/hint overlay for the current phase.
///
/// Idle with a fresh 0-0 shows only the start hint; any other unfinished
/// state shows the translucent score line (plus the hint while idle); a
/// finished match shows the winner banner.
pub fn draw_overlay(
    sink: &mut impl RenderSink,
    phase: MatchPhase,
    first_score: u32,
    second_score: u32,
    field_width: f32,
    field_height: f32,
) {
    let center_x = field_width / 2.0;
    let banner_y = field_height / 4.0;

    match phase {
        MatchPhase::Idle if first_score == 0 && second_score == 0 => {
            draw_hint(sink, center_x, banner_y);
        }
        MatchPhase::Idle | MatchPhase::Active => {
            sink.submit(DrawCmd::Text {
                x: center_x,
                y: banner_y,
                font: SCORE_FONT.to_string(),
                color: SCORE_INK.to_string(),
                text: format!("{} - {}", first_score, second_score),
            });
            if matches!(phase, MatchPhase::Idle) {
                draw_hint(sink, center_x, banner_y + 60.0);
            }
        }
        MatchPhase::Finished => {
            let winner = if first_score > second_score {
                PlayerSide::Left
            } else {
                PlayerSide::Right
            };
            let number = match winner {
                PlayerSide::Left => "1",
                PlayerSide::Right => "2",
            };
            sink.submit(DrawCmd::Text {
                x: center_x,
                y: banner_y,
                font: WINNER_FONT.to_string(),
                color: OVERLAY_INK.to_string(),
                text: format!("Player {} wins!", number),
            });
        }
    }
}

fn draw_hint(sink: &mut impl RenderSink, x: f32, y: f32) {
    sink.submit(DrawCmd::Text {
        x,
        y,
        font: HINT_FONT.to_string(),
        color: OVERLAY_INK.to_string(),
        text: START_HINT.to_string(),
    });
}
