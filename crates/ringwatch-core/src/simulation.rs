use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::sample::SleepPhase;

/// Source of every value the ring does not report over a characteristic.
///
/// With [`VitalsSource::Simulated`](crate::config::VitalsSource) it also
/// supplies heart rate and oxygen. Sleep phase and step increments always
/// come from here.
pub trait Simulation: Send {
    fn heart_rate(&mut self) -> f64;
    fn oxygen_level(&mut self) -> f64;
    fn sleep_phase(&mut self, heart_rate: f64, oxygen_level: f64) -> SleepPhase;
    fn step_increment(&mut self) -> u32;
}

/// Resting-adult ranges: 60-80 bpm, 95-98 % SpO2, 0-9 steps per tick.
pub struct RandomSimulation {
    rng: StdRng,
}

impl RandomSimulation {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Simulation for RandomSimulation {
    fn heart_rate(&mut self) -> f64 {
        self.rng.gen_range(60.0..80.0)
    }

    fn oxygen_level(&mut self) -> f64 {
        self.rng.gen_range(95.0..98.0)
    }

    fn sleep_phase(&mut self, _heart_rate: f64, _oxygen_level: f64) -> SleepPhase {
        match self.rng.gen_range(0..3) {
            0 => SleepPhase::Light,
            1 => SleepPhase::Deep,
            _ => SleepPhase::Rem,
        }
    }

    fn step_increment(&mut self) -> u32 {
        self.rng.gen_range(0..10)
    }
}

/// Replays fixed sequences. Each queue repeats its last value once drained;
/// an empty queue yields the fallback.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSimulation {
    heart_rates: VecDeque<f64>,
    oxygen_levels: VecDeque<f64>,
    sleep_phases: VecDeque<SleepPhase>,
    step_increments: VecDeque<u32>,
}

impl ScriptedSimulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heart_rates(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.heart_rates = values.into_iter().collect();
        self
    }

    pub fn oxygen_levels(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.oxygen_levels = values.into_iter().collect();
        self
    }

    pub fn sleep_phases(mut self, values: impl IntoIterator<Item = SleepPhase>) -> Self {
        self.sleep_phases = values.into_iter().collect();
        self
    }

    pub fn step_increments(mut self, values: impl IntoIterator<Item = u32>) -> Self {
        self.step_increments = values.into_iter().collect();
        self
    }
}

fn next_or_last<T: Copy>(queue: &mut VecDeque<T>, fallback: T) -> T {
    if queue.len() > 1 {
        queue.pop_front().unwrap_or(fallback)
    } else {
        queue.front().copied().unwrap_or(fallback)
    }
}

impl Simulation for ScriptedSimulation {
    fn heart_rate(&mut self) -> f64 {
        next_or_last(&mut self.heart_rates, 70.0)
    }

    fn oxygen_level(&mut self) -> f64 {
        next_or_last(&mut self.oxygen_levels, 97.0)
    }

    fn sleep_phase(&mut self, _heart_rate: f64, _oxygen_level: f64) -> SleepPhase {
        next_or_last(&mut self.sleep_phases, SleepPhase::Unknown)
    }

    fn step_increment(&mut self) -> u32 {
        next_or_last(&mut self.step_increments, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_random_simulation_is_reproducible_and_in_range() {
        let mut a = RandomSimulation::seeded(7);
        let mut b = RandomSimulation::seeded(7);

        for _ in 0..50 {
            let hr = a.heart_rate();
            let spo2 = a.oxygen_level();
            assert_eq!(hr, b.heart_rate());
            assert_eq!(spo2, b.oxygen_level());
            assert!((60.0..80.0).contains(&hr));
            assert!((95.0..98.0).contains(&spo2));
            assert_ne!(a.sleep_phase(hr, spo2), SleepPhase::Unknown);
            assert!(a.step_increment() < 10);
            b.sleep_phase(hr, spo2);
            b.step_increment();
        }
    }

    #[test]
    fn scripted_simulation_replays_then_holds_last_value() {
        let mut sim = ScriptedSimulation::new()
            .heart_rates([61.0, 62.0])
            .step_increments([3]);

        assert_eq!(sim.heart_rate(), 61.0);
        assert_eq!(sim.heart_rate(), 62.0);
        assert_eq!(sim.heart_rate(), 62.0);
        assert_eq!(sim.step_increment(), 3);
        assert_eq!(sim.step_increment(), 3);
        assert_eq!(sim.oxygen_level(), 97.0);
        assert_eq!(sim.sleep_phase(62.0, 97.0), SleepPhase::Unknown);
    }
}
