//! Ball entity and collision resolution
//!
//! The coordinate system is screen-like: y grows downward, so a negative
//! vertical speed moves the ball up. Geometry is self-healing: positions
//! that end up inside a paddle or past a field edge are corrected on the
//! tick that observes them, never rejected.

use rand::Rng;

use crate::render::{DrawCmd, RenderSink};
use crate::ws::protocol::PlayerSide;

use super::paddle::Paddle;

/// Hard cap on horizontal speed magnitude
pub const MAX_X_SPEED: f32 = 9.0;
/// Soft bound on vertical speed; the randomized overflow path may exceed it
pub const MAX_Y_SPEED: f32 = 2.0;
pub const BALL_RADIUS: f32 = 10.0;

const BALL_COLOR: &str = "black";

/// Residual bounce draws start here so a bounce can never be exactly zero,
/// which would leave the ball on a purely horizontal line forever.
const MIN_RESIDUAL: f32 = f32::EPSILON;

/// The ball. Owned by the match controller, repositioned (never recreated)
/// across resets and resizes.
#[derive(Debug, Clone)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub speed_x: f32,
    pub speed_y: f32,
}

impl Ball {
    pub fn new(field_width: f32, field_height: f32) -> Self {
        Self {
            x: field_width / 2.0,
            y: field_height / 2.0,
            radius: BALL_RADIUS,
            speed_x: 0.0,
            speed_y: 0.0,
        }
    }

    /// Put the ball back at the field center
    pub fn center(&mut self, field_width: f32, field_height: f32) {
        self.x = field_width / 2.0;
        self.y = field_height / 2.0;
    }

    pub fn stop(&mut self) {
        self.speed_x = 0.0;
        self.speed_y = 0.0;
    }

    /// Launch the ball toward a random side with a random vertical component
    pub fn serve(&mut self, rng: &mut impl Rng) {
        let y_speed = rng.gen::<f32>() * 2.0;

        self.speed_y = if rng.gen::<f32>() > 0.45 {
            y_speed
        } else {
            -y_speed
        };

        self.speed_x = if rng.gen::<f32>() > 0.45 { 2.0 } else { -2.0 };
    }

    /// Resolve one tick of ball motion against the already-advanced paddles
    /// and the field bounds. Returns the side that scored, if any.
    ///
    /// The sequence is fixed: paddle contact (reflection, then edge-band or
    /// face disambiguation), then the lateral bound check, then horizontal
    /// speed growth and x integration, then the vertical bound reflection
    /// and y integration last.
    pub fn resolve(
        &mut self,
        first: &mut Paddle,
        second: &mut Paddle,
        field_width: f32,
        field_height: f32,
        difficulty: f32,
        rng: &mut impl Rng,
    ) -> Option<PlayerSide> {
        let x_limit = field_width - self.radius;
        let y_limit = field_height - self.radius;

        // Contact with either paddle's front-facing box reverses the ball.
        // The four edge-band regions cannot overlap between the paddles
        // because the paddles sit on opposite sides of the field, so the
        // fixed evaluation order below is safe without further checks.
        if self.touches(first) || self.touches(second) {
            self.speed_x = -self.speed_x;

            let bounce = rng.gen_range(0.0f32..3.0);

            if self.in_top_band(first) {
                self.y = first.y - self.radius * 2.0;
                self.bounce_up(bounce, rng);
            } else if self.in_bottom_band(first) {
                self.y = first.y + first.height + self.radius * 2.0;
                self.bounce_down(bounce, rng);
            } else if self.in_top_band(second) {
                self.y = second.y - self.radius * 2.0;
                self.bounce_up(bounce, rng);
            } else if self.in_bottom_band(second) {
                self.y = second.y + second.height + self.radius * 2.0;
                self.bounce_down(bounce, rng);
            } else {
                // Face contact: force the ball flush against the touching
                // paddle so it cannot lodge inside the rectangle.
                if self.touches(first) {
                    self.x = first.x + first.width + self.radius;
                } else {
                    self.x = second.x - self.radius;
                }

                // New vertical trajectory, additive on the current speed and
                // folded back when it would cross the soft bound.
                if rng.gen::<f32>() > 0.45 {
                    self.speed_y = if self.speed_y + bounce < MAX_Y_SPEED {
                        self.speed_y + bounce
                    } else {
                        self.speed_y - bounce
                    };
                } else {
                    self.speed_y = if self.speed_y - bounce > -MAX_Y_SPEED {
                        self.speed_y - bounce
                    } else {
                        self.speed_y + bounce
                    };
                }
            }
        }

        // A ball past either lateral limit stops dead and scores for the
        // opposite side; otherwise horizontal speed compounds while below
        // the cap and the ball advances.
        let mut scored = None;

        if self.x < self.radius || self.x > x_limit {
            self.speed_x = 0.0;
            self.speed_y = 0.0;

            if self.x <= self.radius {
                self.x = self.radius;
                second.score += 1;
                scored = Some(PlayerSide::Right);
            } else {
                self.x = x_limit;
                first.score += 1;
                scored = Some(PlayerSide::Left);
            }
        } else {
            if self.speed_x.abs() < MAX_X_SPEED {
                self.speed_x = (self.speed_x * (1.0 + difficulty / 10_000.0))
                    .clamp(-MAX_X_SPEED, MAX_X_SPEED);
            }
            self.x += self.speed_x;
        }

        // Elastic reflection off the top/bottom edges, always last.
        if self.y <= self.radius {
            self.y = self.radius;
            self.speed_y = -self.speed_y;
        } else if self.y >= y_limit {
            self.y = y_limit - self.radius;
            self.speed_y = -self.speed_y;
        }

        self.y += self.speed_y;

        scored
    }

    pub fn draw(&self, sink: &mut impl RenderSink) {
        sink.submit(DrawCmd::Circle {
            x: self.x,
            y: self.y,
            radius: self.radius,
            color: BALL_COLOR.to_string(),
        });
    }

    /// Rectangle-vs-circle overlap against a paddle's front-facing box
    fn touches(&self, paddle: &Paddle) -> bool {
        self.x - self.radius <= paddle.x + paddle.width
            && self.x + self.radius >= paddle.x
            && self.y + self.radius >= paddle.y
            && self.y <= paddle.y + paddle.height
    }

    /// The ball edge facing this paddle: its left edge for the left paddle,
    /// its right edge for the right paddle
    fn facing_edge(&self, paddle: &Paddle) -> f32 {
        match paddle.side {
            PlayerSide::Left => self.x - self.radius,
            PlayerSide::Right => self.x + self.radius,
        }
    }

    fn within_paddle_span(&self, paddle: &Paddle) -> bool {
        let edge = self.facing_edge(paddle);
        edge >= paddle.x && edge <= paddle.x + paddle.width
    }

    /// Contact localized to within half a radius of the paddle's top edge
    fn in_top_band(&self, paddle: &Paddle) -> bool {
        self.within_paddle_span(paddle)
            && self.y + self.radius >= paddle.y
            && self.y + self.radius <= paddle.y + self.radius / 2.0
    }

    /// Contact localized to within half a radius of the paddle's bottom edge
    fn in_bottom_band(&self, paddle: &Paddle) -> bool {
        let bottom = paddle.y + paddle.height;
        self.within_paddle_span(paddle)
            && self.y >= bottom - self.radius / 2.0
            && self.y <= bottom
    }

    /// Bounce upward: magnitude bounded by `MAX_Y_SPEED`, with a small
    /// non-zero residual when the drawn value would overshoot the bound
    fn bounce_up(&mut self, value: f32, rng: &mut impl Rng) {
        self.speed_y = if -value > -MAX_Y_SPEED {
            -value
        } else {
            -rng.gen_range(MIN_RESIDUAL..2.0)
        };
    }

    /// Bounce downward, mirror of [`Self::bounce_up`]
    fn bounce_down(&mut self, value: f32, rng: &mut impl Rng) {
        self.speed_y = if value < MAX_Y_SPEED {
            value
        } else {
            rng.gen_range(MIN_RESIDUAL..2.0)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const FIELD_WIDTH: f32 = 1280.0;
    const FIELD_HEIGHT: f32 = 720.0;
    const DIFFICULTY: f32 = 1.0;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    /// Ball at field center, paddles parked near the bottom corners where
    /// they cannot interfere
    fn fixture() -> (Ball, Paddle, Paddle) {
        let ball = Ball::new(FIELD_WIDTH, FIELD_HEIGHT);
        let first = Paddle::new(PlayerSide::Left, 30.0, 600.0);
        let second = Paddle::new(PlayerSide::Right, 1240.0, 600.0);
        (ball, first, second)
    }

    fn resolve(
        ball: &mut Ball,
        first: &mut Paddle,
        second: &mut Paddle,
        rng: &mut ChaCha8Rng,
    ) -> Option<PlayerSide> {
        ball.resolve(first, second, FIELD_WIDTH, FIELD_HEIGHT, DIFFICULTY, rng)
    }

    #[test]
    fn crossing_left_bound_scores_for_right() {
        let (mut ball, mut first, mut second) = fixture();
        ball.x = ball.radius - 2.0;
        ball.y = FIELD_HEIGHT / 2.0;
        ball.speed_x = -2.0;

        let scored = resolve(&mut ball, &mut first, &mut second, &mut rng());

        assert_eq!(scored, Some(PlayerSide::Right));
        assert_eq!(second.score, 1);
        assert_eq!(first.score, 0);
        assert_eq!(ball.x, ball.radius, "ball snapped to the boundary");
        assert_eq!((ball.speed_x, ball.speed_y), (0.0, 0.0));
    }

    #[test]
    fn crossing_right_bound_scores_for_left() {
        let (mut ball, mut first, mut second) = fixture();
        ball.x = FIELD_WIDTH - ball.radius + 3.0;
        ball.speed_x = 2.0;

        let scored = resolve(&mut ball, &mut first, &mut second, &mut rng());

        assert_eq!(scored, Some(PlayerSide::Left));
        assert_eq!(first.score, 1);
        assert_eq!(ball.x, FIELD_WIDTH - ball.radius);
        assert_eq!((ball.speed_x, ball.speed_y), (0.0, 0.0));
    }

    #[test]
    fn ball_stays_confined_and_scores_exactly_once() {
        // Launch left with no paddle in the way; the ball must cross, snap,
        // and score exactly once over many ticks.
        let (mut ball, mut first, mut second) = fixture();
        let mut rng = rng();
        ball.speed_x = -2.0;

        let mut points = 0;
        for _ in 0..2000 {
            if resolve(&mut ball, &mut first, &mut second, &mut rng).is_some() {
                points += 1;
            }
            assert!(ball.x >= 0.0 && ball.x <= FIELD_WIDTH);
        }

        assert_eq!(points, 1);
        assert_eq!(second.score, 1);
    }

    #[test]
    fn horizontal_speed_grows_monotonically_below_cap() {
        let (mut ball, mut first, mut second) = fixture();
        let mut rng = rng();
        ball.speed_x = 2.0;
        ball.speed_y = 0.0;

        let mut previous = ball.speed_x;
        for _ in 0..200 {
            // Keep the ball mid-field so only the growth path runs
            ball.x = FIELD_WIDTH / 2.0;
            resolve(&mut ball, &mut first, &mut second, &mut rng);
            assert!(ball.speed_x >= previous, "growth must be non-decreasing");
            assert!(ball.speed_x <= MAX_X_SPEED);
            previous = ball.speed_x;
        }
    }

    #[test]
    fn horizontal_speed_stops_growing_at_cap() {
        let (mut ball, mut first, mut second) = fixture();
        ball.speed_x = MAX_X_SPEED;

        resolve(&mut ball, &mut first, &mut second, &mut rng());

        assert_eq!(ball.speed_x, MAX_X_SPEED, "no growth at the cap");

        ball.x = FIELD_WIDTH / 2.0;
        ball.speed_x = 8.9999;
        resolve(&mut ball, &mut first, &mut second, &mut rng());
        assert!(ball.speed_x <= MAX_X_SPEED, "growth never exceeds the cap");
    }

    #[test]
    fn top_edge_band_reverses_and_lifts_the_ball() {
        let (mut ball, mut first, mut second) = fixture();
        first.y = 300.0;
        // Leading edge inside the paddle span, ball bottom just inside the
        // top edge band
        ball.x = 45.0;
        ball.y = 291.0;
        ball.speed_x = -2.0;

        resolve(&mut ball, &mut first, &mut second, &mut rng());

        assert!(ball.speed_x > 0.0, "horizontal velocity reversed");
        assert!((ball.speed_x - 2.0).abs() < 0.01);
        assert!(
            ball.speed_y <= 0.0 && ball.speed_y > -MAX_Y_SPEED,
            "upward bounce within the soft bound, got {}",
            ball.speed_y
        );
        // Snapped above the paddle, then the tick's vertical integration
        assert_eq!(ball.y, first.y - 2.0 * ball.radius + ball.speed_y);
        assert!(!ball.touches(&first), "ball pushed clear of the paddle");
    }

    #[test]
    fn bottom_edge_band_reverses_and_drops_the_ball() {
        let (mut ball, mut first, mut second) = fixture();
        first.y = 300.0;
        let bottom = first.y + first.height;
        ball.x = 45.0;
        ball.y = bottom - 2.0;
        ball.speed_x = -2.0;

        resolve(&mut ball, &mut first, &mut second, &mut rng());

        assert!(ball.speed_x > 0.0);
        assert!(
            ball.speed_y >= 0.0 && ball.speed_y < MAX_Y_SPEED,
            "downward bounce within the soft bound, got {}",
            ball.speed_y
        );
        assert_eq!(ball.y, bottom + 2.0 * ball.radius + ball.speed_y);
        assert!(!ball.touches(&first));
    }

    #[test]
    fn edge_band_bounce_is_bounded_for_any_draw() {
        for seed in 0..64 {
            let (mut ball, mut first, mut second) = fixture();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            first.y = 300.0;
            ball.x = 45.0;
            ball.y = 291.0;
            ball.speed_x = -2.0;

            resolve(&mut ball, &mut first, &mut second, &mut rng);

            assert!(
                ball.speed_y <= 0.0 && ball.speed_y > -MAX_Y_SPEED,
                "seed {}: bounce {} escaped the bound",
                seed,
                ball.speed_y
            );
        }
    }

    #[test]
    fn face_contact_forces_ball_flush() {
        let (mut ball, mut first, mut second) = fixture();
        first.y = 300.0;
        // Dead-center face hit, outside both edge bands
        ball.x = 45.0;
        ball.y = 350.0;
        ball.speed_x = -2.0;

        resolve(&mut ball, &mut first, &mut second, &mut rng());

        assert!(ball.speed_x > 0.0, "reflected off the face");
        assert!(
            ball.x >= first.x + first.width + ball.radius,
            "repositioned in front of the paddle, got {}",
            ball.x
        );
        assert!(ball.speed_y.abs() < 3.0);
        assert!(!ball.touches(&first), "no lingering overlap");
    }

    #[test]
    fn face_contact_on_right_paddle_mirrors() {
        let (mut ball, mut first, mut second) = fixture();
        second.y = 300.0;
        ball.x = FIELD_WIDTH - 45.0;
        ball.y = 350.0;
        ball.speed_x = 2.0;

        resolve(&mut ball, &mut first, &mut second, &mut rng());

        assert!(ball.speed_x < 0.0);
        assert!(ball.x <= second.x - ball.radius);
        assert!(!ball.touches(&second));
    }

    #[test]
    fn top_wall_reflects_elastically() {
        let (mut ball, mut first, mut second) = fixture();
        ball.x = FIELD_WIDTH / 2.0;
        ball.y = 9.0;
        ball.speed_y = -1.5;

        resolve(&mut ball, &mut first, &mut second, &mut rng());

        assert_eq!(ball.speed_y, 1.5, "vertical velocity inverted, no randomization");
        assert_eq!(ball.y, ball.radius + 1.5);
    }

    #[test]
    fn bottom_wall_reflects_elastically() {
        let (mut ball, mut first, mut second) = fixture();
        ball.x = FIELD_WIDTH / 2.0;
        ball.y = FIELD_HEIGHT - 8.0;
        ball.speed_y = 1.5;

        resolve(&mut ball, &mut first, &mut second, &mut rng());

        assert_eq!(ball.speed_y, -1.5);
        assert_eq!(ball.y, FIELD_HEIGHT - ball.radius - ball.radius - 1.5);
    }

    #[test]
    fn serve_launches_at_fixed_horizontal_speed() {
        for seed in 0..32 {
            let mut ball = Ball::new(FIELD_WIDTH, FIELD_HEIGHT);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            ball.serve(&mut rng);

            assert_eq!(ball.speed_x.abs(), 2.0, "seed {}", seed);
            assert!(ball.speed_y.abs() < 2.0, "seed {}", seed);
        }
    }

    #[test]
    fn draw_emits_one_circle() {
        let (ball, _, _) = fixture();
        let mut frame = crate::render::FrameBuffer::new();

        ball.draw(&mut frame);

        assert_eq!(
            frame.commands(),
            &[DrawCmd::Circle {
                x: FIELD_WIDTH / 2.0,
                y: FIELD_HEIGHT / 2.0,
                radius: BALL_RADIUS,
                color: BALL_COLOR.to_string(),
            }]
        );
    }
}
