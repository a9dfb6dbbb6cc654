//! 转台运动模型
//!
//! 两轴独立以恒定角速度逼近目标。方位角在 `[0, 360)` 内线性运动，不跨越正北。

use rotbridge_protocol::Position;
use std::time::Duration;

/// 模拟转台
#[derive(Debug, Clone)]
pub struct SimulatedRotator {
    current: Position,
    target: Position,
    /// 角速度（度/秒），`<= 0` 表示瞬间到位
    slew_rate: f64,
}

impl SimulatedRotator {
    pub fn new(slew_rate: f64) -> Self {
        let park = Position::new(0.0, 0.0);
        Self {
            current: park,
            target: park,
            slew_rate,
        }
    }

    pub fn position(&self) -> Position {
        self.current
    }

    pub fn target(&self) -> Position {
        self.target
    }

    pub fn is_moving(&self) -> bool {
        self.current != self.target
    }

    pub fn set_target(&mut self, target: Position) {
        self.target = target;
        if self.slew_rate <= 0.0 {
            self.current = target;
        }
    }

    /// 原地停止
    pub fn stop(&mut self) {
        self.target = self.current;
    }

    /// 推进 `elapsed` 时长
    pub fn advance(&mut self, elapsed: Duration) {
        if self.slew_rate <= 0.0 {
            self.current = self.target;
            return;
        }
        let step = self.slew_rate * elapsed.as_secs_f64();
        self.current = Position::new(
            approach(self.current.azimuth, self.target.azimuth, step),
            approach(self.current.elevation, self.target.elevation, step),
        );
    }
}

fn approach(from: f64, to: f64, step: f64) -> f64 {
    let delta = to - from;
    if delta.abs() <= step {
        to
    } else {
        from + step.copysign(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slews_toward_target() {
        let mut rotator = SimulatedRotator::new(10.0);
        rotator.set_target(Position::new(30.0, 15.0));
        assert!(rotator.is_moving());

        rotator.advance(Duration::from_secs(1));
        assert_eq!(rotator.position(), Position::new(10.0, 10.0));

        rotator.advance(Duration::from_secs(1));
        assert_eq!(rotator.position(), Position::new(20.0, 15.0));

        rotator.advance(Duration::from_secs(5));
        assert_eq!(rotator.position(), Position::new(30.0, 15.0));
        assert!(!rotator.is_moving());
    }

    #[test]
    fn test_moves_backwards() {
        let mut rotator = SimulatedRotator::new(10.0);
        rotator.set_target(Position::new(350.0, 80.0));
        rotator.advance(Duration::from_secs(60));

        rotator.set_target(Position::new(300.0, 60.0));
        rotator.advance(Duration::from_secs(1));
        assert_eq!(rotator.position(), Position::new(340.0, 70.0));
    }

    #[test]
    fn test_instant_when_rate_is_zero() {
        let mut rotator = SimulatedRotator::new(0.0);
        rotator.set_target(Position::new(180.0, 45.0));
        assert_eq!(rotator.position(), Position::new(180.0, 45.0));
        assert!(!rotator.is_moving());
    }

    #[test]
    fn test_stop_holds_position() {
        let mut rotator = SimulatedRotator::new(5.0);
        rotator.set_target(Position::new(100.0, 0.0));
        rotator.advance(Duration::from_secs(2));
        rotator.stop();
        rotator.advance(Duration::from_secs(10));
        assert_eq!(rotator.position(), Position::new(10.0, 0.0));
        assert_eq!(rotator.target(), rotator.position());
    }
}
