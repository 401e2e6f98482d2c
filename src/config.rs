use crate::error::{Chip8Error, Result};

/// the COSMAC VIP managed roughly this many CHIP-8 instructions a second;
/// timer-driven games are tuned for it
pub const DEFAULT_INSTRUCTIONS_PER_SECOND: f64 = 700.0;

/// Knobs the host may turn. Everything else about the machine is fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// target pace of the fetch/decode/execute loop
    pub instructions_per_second: f64,
    /// seed for CXNN; `None` seeds from entropy
    pub rng_seed: Option<u64>,
}

impl Config {
    pub fn new(instructions_per_second: f64, rng_seed: Option<u64>) -> Result<Self> {
        let config = Config {
            instructions_per_second,
            rng_seed,
        };
        config.validate()?;
        Ok(config)
    }

    /// the instruction rate must be a finite, positive number
    pub fn validate(&self) -> Result<()> {
        check_rate(self.instructions_per_second)
    }
}

/// rejects rates the pacing loop can't turn into a cycle time
pub fn check_rate(rate: f64) -> Result<()> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(Chip8Error::InvalidConfig(format!(
            "instructions per second must be finite and above zero, not {}",
            rate
        )))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            instructions_per_second: DEFAULT_INSTRUCTIONS_PER_SECOND,
            rng_seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rate() {
        let c = Config::default();
        assert_eq!(c.instructions_per_second, 700.0);
        assert_eq!(c.rng_seed, None);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_new_accepts_positive_rate() -> Result<()> {
        let c = Config::new(1.5, Some(3))?;
        assert_eq!(c.instructions_per_second, 1.5);
        Ok(())
    }

    #[test]
    fn test_new_rejects_unusable_rates() {
        for rate in [0.0, -700.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Config::new(rate, None),
                Err(Chip8Error::InvalidConfig(_))
            ));
        }
    }
}
