//! Paddle entity and vertical motion

use uuid::Uuid;

use crate::render::{DrawCmd, RenderSink};
use crate::ws::protocol::PlayerSide;

pub const PADDLE_WIDTH: f32 = 10.0;
pub const PADDLE_HEIGHT: f32 = 100.0;

const LEFT_COLOR: &str = "rgb(30,142,217)";
const RIGHT_COLOR: &str = "rgb(230, 60, 60)";

/// One player's paddle. Position integrates `speed_y` while a match is
/// active; excursions past the field bounds are corrected on the following
/// tick rather than prevented up front.
#[derive(Debug, Clone)]
pub struct Paddle {
    pub side: PlayerSide,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub speed_y: f32,
    pub score: u32,
    /// Peer identity steering this paddle, when known
    pub peer_id: Option<Uuid>,
    color: &'static str,
}

impl Paddle {
    pub fn new(side: PlayerSide, x: f32, y: f32) -> Self {
        Self {
            side,
            x,
            y,
            width: PADDLE_WIDTH,
            height: PADDLE_HEIGHT,
            speed_y: 0.0,
            score: 0,
            peer_id: None,
            color: match side {
                PlayerSide::Left => LEFT_COLOR,
                PlayerSide::Right => RIGHT_COLOR,
            },
        }
    }

    /// Advance one tick of vertical motion.
    ///
    /// Frozen while the match is idle. When active: a position already past
    /// a bound (last tick's overshoot) is snapped to that bound with the
    /// velocity zeroed; otherwise the velocity is applied unconditionally,
    /// so a single tick may overshoot and be corrected on the next one.
    pub fn advance(&mut self, started: bool, field_height: f32) {
        if !started {
            return;
        }

        let y_limit = field_height - self.height;

        if self.y < 0.0 || self.y > y_limit {
            self.speed_y = 0.0;

            if self.y < 0.0 {
                self.y = 0.0;
            } else {
                self.y = y_limit;
            }
        } else {
            self.y += self.speed_y;
        }
    }

    pub fn draw(&self, sink: &mut impl RenderSink) {
        sink.submit(DrawCmd::Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            color: self.color.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELD_HEIGHT: f32 = 720.0;

    #[test]
    fn frozen_while_idle() {
        let mut paddle = Paddle::new(PlayerSide::Left, 30.0, 100.0);
        paddle.speed_y = 4.0;

        paddle.advance(false, FIELD_HEIGHT);

        assert_eq!(paddle.y, 100.0, "idle paddle must not move");
        assert_eq!(paddle.speed_y, 4.0, "idle paddle keeps its velocity");
    }

    #[test]
    fn integrates_velocity_while_active() {
        let mut paddle = Paddle::new(PlayerSide::Left, 30.0, 100.0);
        paddle.speed_y = -2.0;

        paddle.advance(true, FIELD_HEIGHT);

        assert_eq!(paddle.y, 98.0);
    }

    #[test]
    fn in_bounds_motion_may_overshoot() {
        // One tick from inside the field can cross the bound; the correction
        // happens on the following tick.
        let y_limit = FIELD_HEIGHT - PADDLE_HEIGHT;
        let mut paddle = Paddle::new(PlayerSide::Right, 1240.0, y_limit - 1.0);
        paddle.speed_y = 4.0;

        paddle.advance(true, FIELD_HEIGHT);
        assert_eq!(paddle.y, y_limit + 3.0, "overshoot is not clamped predictively");

        paddle.advance(true, FIELD_HEIGHT);
        assert_eq!(paddle.y, y_limit, "excursion snapped on the next tick");
        assert_eq!(paddle.speed_y, 0.0, "velocity zeroed at the bound");
    }

    #[test]
    fn top_excursion_snaps_to_zero() {
        let mut paddle = Paddle::new(PlayerSide::Left, 30.0, -5.0);
        paddle.speed_y = -2.0;

        paddle.advance(true, FIELD_HEIGHT);

        assert_eq!(paddle.y, 0.0);
        assert_eq!(paddle.speed_y, 0.0);
    }

    #[test]
    fn draw_emits_one_rect() {
        let mut frame = crate::render::FrameBuffer::new();
        let paddle = Paddle::new(PlayerSide::Left, 30.0, 100.0);

        paddle.draw(&mut frame);

        assert_eq!(
            frame.commands(),
            &[DrawCmd::Rect {
                x: 30.0,
                y: 100.0,
                width: PADDLE_WIDTH,
                height: PADDLE_HEIGHT,
                color: LEFT_COLOR.to_string(),
            }]
        );
    }
}
