//! Simulated time and per-subsystem cadence gates.
//!
//! [`SimClock`] is the single source of truth for simulated time. Each
//! orchestrator pass advances it by the step time multiplied by the
//! sim-speed multiplier, so every cadence below is measured in simulated
//! seconds and a faster sim speed runs every subsystem more often per step.
//!
//! # Design Principles
//!
//! - Time only moves forward; negative or non-finite steps advance nothing.
//! - A [`Cadence`] never fires twice for the same instant.
//! - Gates are polled in data-flow order by the orchestrator, once per pass.

use crate::config::{CadenceConfig, clamp_interval, clamp_sim_speed};

/// Simulated time and pass counter.
#[derive(Debug, Clone, PartialEq)]
pub struct SimClock {
    /// Simulated seconds elapsed.
    time: f64,

    /// Orchestrator passes completed.
    tick: u64,

    /// Multiplier from step time to simulated time.
    sim_speed: f64,
}

impl SimClock {
    /// Create a clock at time zero.
    pub fn new(sim_speed: f64) -> Self {
        Self {
            time: 0.0,
            tick: 0,
            sim_speed: clamp_sim_speed(sim_speed),
        }
    }

    /// Advance by `step_sec` of step time. Returns the simulated seconds
    /// that elapsed.
    pub fn advance(&mut self, step_sec: f64) -> f64 {
        let step = if step_sec.is_finite() && step_sec > 0.0 {
            step_sec * self.sim_speed
        } else {
            0.0
        };
        self.time += step;
        self.tick = self.tick.saturating_add(1);
        step
    }

    /// Simulated seconds elapsed.
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Orchestrator passes completed.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Current sim-speed multiplier.
    pub const fn sim_speed(&self) -> f64 {
        self.sim_speed
    }

    /// Change the sim-speed multiplier, clamped to a safe range.
    pub fn set_sim_speed(&mut self, sim_speed: f64) {
        self.sim_speed = clamp_sim_speed(sim_speed);
    }

    /// Return to time zero, keeping the sim speed.
    pub const fn reset(&mut self) {
        self.time = 0.0;
        self.tick = 0;
    }
}

/// Gate that fires once each time `interval` simulated seconds have passed
/// since it last fired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cadence {
    interval: f64,
    last: f64,
}

impl Cadence {
    /// Create a gate that first fires at `interval`.
    pub fn new(interval: f64) -> Self {
        Self {
            interval: clamp_interval("cadence", interval),
            last: 0.0,
        }
    }

    /// Seconds between firings.
    pub const fn interval(&self) -> f64 {
        self.interval
    }

    /// Change the interval without moving the last firing.
    pub fn set_interval(&mut self, interval: f64) {
        self.interval = clamp_interval("cadence", interval);
    }

    /// Seconds since the gate last fired.
    pub fn elapsed(&self, now: f64) -> f64 {
        (now - self.last).max(0.0)
    }

    /// Whether the gate would fire at `now`.
    pub fn is_due(&self, now: f64) -> bool {
        now - self.last >= self.interval
    }

    /// Fire if due. Returns the seconds since the previous firing when it
    /// fires.
    pub fn poll(&mut self, now: f64) -> Option<f64> {
        if !self.is_due(now) {
            return None;
        }
        let elapsed = self.elapsed(now);
        self.last = now;
        Some(elapsed)
    }

    /// Forget every firing.
    pub const fn reset(&mut self) {
        self.last = 0.0;
    }
}

/// One gate per subsystem group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cadences {
    /// Institution detection and tribe rebuild.
    pub detection: Cadence,
    /// Totem, ritual, and role forces.
    pub forces: Cadence,
    /// Justice.
    pub justice: Cadence,
    /// Culture, prestige, leaders, and economy.
    pub macro_tick: Cadence,
}

impl Cadences {
    /// Build gates from configuration.
    pub fn new(config: &CadenceConfig) -> Self {
        Self {
            detection: Cadence::new(config.detection_sec),
            forces: Cadence::new(config.force_sec),
            justice: Cadence::new(config.justice_sec),
            macro_tick: Cadence::new(config.macro_tick_sec),
        }
    }

    /// Change every interval, keeping the last firings.
    pub fn reconfigure(&mut self, config: &CadenceConfig) {
        self.detection.set_interval(config.detection_sec);
        self.forces.set_interval(config.force_sec);
        self.justice.set_interval(config.justice_sec);
        self.macro_tick.set_interval(config.macro_tick_sec);
    }

    /// Reset every gate.
    pub const fn reset(&mut self) {
        self.detection.reset();
        self.forces.reset();
        self.justice.reset();
        self.macro_tick.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_scales_by_sim_speed() {
        let mut clock = SimClock::new(2.0);
        let step = clock.advance(0.5);
        assert!((step - 1.0).abs() < f64::EPSILON);
        assert!((clock.time() - 1.0).abs() < f64::EPSILON);
        assert_eq!(clock.tick(), 1);
    }

    #[test]
    fn bad_steps_do_not_move_time() {
        let mut clock = SimClock::new(1.0);
        clock.advance(-1.0);
        clock.advance(f64::NAN);
        assert!(clock.time().abs() < f64::EPSILON);
        assert_eq!(clock.tick(), 2);
    }

    #[test]
    fn sim_speed_is_clamped() {
        let mut clock = SimClock::new(1.0);
        clock.set_sim_speed(1_000.0);
        assert!(clock.sim_speed() <= crate::config::MAX_SIM_SPEED);
    }

    #[test]
    fn cadence_fires_once_per_interval() {
        let mut gate = Cadence::new(2.0);
        assert!(gate.poll(1.0).is_none());
        let fired = gate.poll(2.5);
        assert!(fired.is_some_and(|e| (e - 2.5).abs() < f64::EPSILON));
        assert!(gate.poll(2.5).is_none());
        assert!(gate.poll(4.0).is_none());
        assert!(gate.poll(4.5).is_some());
    }

    #[test]
    fn zero_interval_is_clamped() {
        let gate = Cadence::new(0.0);
        assert!(gate.interval() > 0.0);
    }
}
