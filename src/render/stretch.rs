/// Intensity stretches applied after the display interval
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Log stretch exponent base.
const LOG_A: f64 = 100.0;

/// Asinh stretch softening.
const ASINH_A: f64 = 0.1;

/// How normalized pixel values are remapped before display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StretchMode {
    #[default]
    Linear,
    Log,
    Asinh,
}

impl StretchMode {
    pub const ALL: [StretchMode; 3] = [StretchMode::Linear, StretchMode::Log, StretchMode::Asinh];

    /// Remap a value in `[0, 1]`; inputs outside are clipped first.
    pub fn apply(self, x: f64) -> f64 {
        let x = x.clamp(0.0, 1.0);
        match self {
            StretchMode::Linear => x,
            StretchMode::Log => (LOG_A * x + 1.0).ln() / (LOG_A + 1.0).ln(),
            StretchMode::Asinh => (x / ASINH_A).asinh() / (1.0 / ASINH_A).asinh(),
        }
    }
}

impl fmt::Display for StretchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StretchMode::Linear => "Linear",
            StretchMode::Log => "Log",
            StretchMode::Asinh => "Asinh",
        };
        write!(f, "{}", name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown stretch {0:?} (expected LinearStretch, LogStretch or AsinhStretch)")]
pub struct UnknownStretch(pub String);

impl FromStr for StretchMode {
    type Err = UnknownStretch;

    /// Accepts the manifest names (`LogStretch`) and the short forms (`log`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let short = lower.strip_suffix("stretch").unwrap_or(&lower);
        match short {
            "linear" => Ok(StretchMode::Linear),
            "log" => Ok(StretchMode::Log),
            "asinh" => Ok(StretchMode::Asinh),
            _ => Err(UnknownStretch(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_endpoints_fixed() {
        for mode in StretchMode::ALL {
            assert_relative_eq!(mode.apply(0.0), 0.0);
            assert_relative_eq!(mode.apply(1.0), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_monotonic_and_clipped() {
        for mode in StretchMode::ALL {
            let mut last = mode.apply(-1.0);
            assert_eq!(last, 0.0);
            for i in 1..=100 {
                let y = mode.apply(i as f64 / 100.0);
                assert!(y > last, "{} not increasing at {}", mode, i);
                last = y;
            }
            assert_eq!(mode.apply(3.0), mode.apply(1.0));
        }
    }

    #[test]
    fn test_nonlinear_stretches_lift_faint_values() {
        assert!(StretchMode::Log.apply(0.1) > 0.5);
        assert!(StretchMode::Asinh.apply(0.1) > 0.2);
        assert_relative_eq!(StretchMode::Linear.apply(0.1), 0.1);
    }

    #[test]
    fn test_parse() {
        assert_eq!("LinearStretch".parse(), Ok(StretchMode::Linear));
        assert_eq!("LogStretch".parse(), Ok(StretchMode::Log));
        assert_eq!("asinh".parse(), Ok(StretchMode::Asinh));
        assert!("SqrtStretch".parse::<StretchMode>().is_err());
        assert_eq!(StretchMode::default(), StretchMode::Linear);
    }
}
