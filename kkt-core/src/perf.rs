use std::time::{Duration, Instant};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PerfSection {
    Assemble,
    Factorize,
    Solve,
    Check,
}

impl PerfSection {
    pub const ALL: [PerfSection; 4] = [
        PerfSection::Assemble,
        PerfSection::Factorize,
        PerfSection::Solve,
        PerfSection::Check,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PerfSection::Assemble => "assemble",
            PerfSection::Factorize => "factorize",
            PerfSection::Solve => "solve",
            PerfSection::Check => "check",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct PerfTimers {
    pub assemble: Duration,
    pub factorize: Duration,
    pub solve: Duration,
    pub check: Duration,
}

impl PerfTimers {
    pub fn scoped<'a>(&'a mut self, section: PerfSection) -> PerfGuard<'a> {
        PerfGuard { section, start: Instant::now(), timers: self }
    }

    pub fn add(&mut self, section: PerfSection, dt: Duration) {
        match section {
            PerfSection::Assemble => self.assemble += dt,
            PerfSection::Factorize => self.factorize += dt,
            PerfSection::Solve => self.solve += dt,
            PerfSection::Check => self.check += dt,
        }
    }

    pub fn get(&self, section: PerfSection) -> Duration {
        match section {
            PerfSection::Assemble => self.assemble,
            PerfSection::Factorize => self.factorize,
            PerfSection::Solve => self.solve,
            PerfSection::Check => self.check,
        }
    }

    pub fn total(&self) -> Duration {
        self.assemble + self.factorize + self.solve + self.check
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub struct PerfGuard<'a> {
    section: PerfSection,
    start: Instant,
    timers: &'a mut PerfTimers,
}

impl Drop for PerfGuard<'_> {
    fn drop(&mut self) {
        self.timers.add(self.section, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_guard_accumulates() {
        let mut timers = PerfTimers::default();
        {
            let _g = timers.scoped(PerfSection::Solve);
            std::thread::sleep(Duration::from_millis(1));
        }
        timers.add(PerfSection::Solve, Duration::from_millis(2));

        assert!(timers.get(PerfSection::Solve) >= Duration::from_millis(3));
        assert_eq!(timers.get(PerfSection::Factorize), Duration::ZERO);
        assert_eq!(timers.total(), timers.solve);

        timers.reset();
        assert_eq!(timers.total(), Duration::ZERO);
    }
}
