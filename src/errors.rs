use std::error::Error;
use std::fmt;

/// An error type indicating that evolution cannot continue.
#[derive(Debug)]
pub enum EvolutionError {
    /// Every species was removed during a generation
    /// transition, either through stagnation or because
    /// none earned a breeding allocation.
    AllSpeciesExtinct {
        /// The generation during which the last species died.
        generation: usize,
    },
    /// The configured settings were rejected before training.
    InvalidSettings(SettingsError),
}

/// An error type indicating a settings value outside
/// its permitted range.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
    /// A probability setting was outside `[0, 1]`.
    ProbabilityOutOfRange {
        setting: &'static str,
        value: f32,
    },
    /// The elimination percentage was outside `(0, 1]`.
    EliminationPercentageOutOfRange { value: f32 },
    /// A width setting that feeds a random range was not positive.
    NonPositiveRange {
        setting: &'static str,
        value: f32,
    },
}

impl fmt::Display for EvolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllSpeciesExtinct { generation } => {
                write!(f, "all species died out in generation {}", generation)
            }
            Self::InvalidSettings(err) => write!(f, "invalid settings: {}", err),
        }
    }
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProbabilityOutOfRange { setting, value } => write!(
                f,
                "{} must lie within [0, 1], got {}",
                setting, value
            ),
            Self::EliminationPercentageOutOfRange { value } => write!(
                f,
                "generation_elimination_percentage must lie within (0, 1], got {}",
                value
            ),
            Self::NonPositiveRange { setting, value } => {
                write!(f, "{} must be positive, got {}", setting, value)
            }
        }
    }
}

impl Error for EvolutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidSettings(err) => Some(err),
            _ => None,
        }
    }
}

impl Error for SettingsError {}
