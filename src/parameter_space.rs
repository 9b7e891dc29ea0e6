//! Surface-hopping option axes and their cartesian product.
//!
//! The parameter loop screens six categorical axes, always combined in the
//! same order:
//!
//! | Axis | Codes |
//! |------|-------|
//! | representation | 1 diagonal (SHARC), 2 MCH |
//! | coupling | 1 nacdt (not available), 2 nacdr, 3 overlap |
//! | ekincorrect | 1 none, 2 parallel_vel, 3 parallel_nac, 4 parallel_diff |
//! | reflect | same codes as ekincorrect |
//! | decoherence | 1 none, 2 edc, 3 afssh |
//! | hopping | 1 off, 2 sharc, 3 gfsh |
//!
//! Every axis is validated before the product is formed, so every produced
//! [`ParameterPoint`] is a runnable combination.

use itertools::{iproduct, Itertools};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised for unusable screening requests.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionError {
    /// The code names no option of the axis
    #[error("Unknown {axis} option code {code}")]
    UnknownCode {
        /// Axis keyword
        axis: &'static str,
        /// Offending code
        code: u8,
    },
    /// The option exists but cannot be used
    #[error("{axis} option {code} ({name}) is not available")]
    Unavailable {
        /// Axis keyword
        axis: &'static str,
        /// Option code
        code: u8,
        /// Option name
        name: &'static str,
    },
    /// An axis was given an empty code list
    #[error("No {axis} option selected for screening")]
    EmptyAxis {
        /// Axis keyword
        axis: &'static str,
    },
    /// The option needs a coupling that is not the only one screened
    #[error("{axis} option '{option}' requires every coupling option to be '{required}'")]
    MissingRequirement {
        /// Axis keyword
        axis: &'static str,
        /// Option name
        option: &'static str,
        /// Name of the required coupling
        required: &'static str,
    },
}

type Result<T> = std::result::Result<T, OptionError>;

/// One categorical option of a screening axis.
pub trait ScreeningOption: Copy + PartialEq + Sized + 'static {
    /// Axis name used in messages and input files
    const AXIS: &'static str;

    /// Every option of the axis in code order.
    fn all() -> &'static [Self];

    /// Numeric code (1-based).
    fn code(self) -> u8;

    /// Short option name.
    fn name(self) -> &'static str;

    /// One-line description for help output.
    fn description(self) -> &'static str;

    /// Whether the option can be run at all.
    fn is_available(self) -> bool {
        true
    }

    /// Looks an option up by code, rejecting unknown and unavailable ones.
    fn from_code(code: u8) -> Result<Self> {
        let option = Self::all()
            .iter()
            .copied()
            .find(|option| option.code() == code)
            .ok_or(OptionError::UnknownCode {
                axis: Self::AXIS,
                code,
            })?;
        if !option.is_available() {
            return Err(OptionError::Unavailable {
                axis: Self::AXIS,
                code,
                name: option.name(),
            });
        }
        Ok(option)
    }
}

/// Electronic representation the dynamics is propagated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    /// Diagonal representation (SHARC dynamics)
    Diagonal,
    /// Spin-free MCH representation (regular surface hopping)
    Mch,
}

impl ScreeningOption for Representation {
    const AXIS: &'static str = "representation";

    fn all() -> &'static [Self] {
        &[Representation::Diagonal, Representation::Mch]
    }

    fn code(self) -> u8 {
        match self {
            Representation::Diagonal => 1,
            Representation::Mch => 2,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Representation::Diagonal => "diagonal",
            Representation::Mch => "mch",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Representation::Diagonal => "Diagonal representation (SHARC dynamics)",
            Representation::Mch => "MCH representation (regular surface hopping)",
        }
    }
}

/// Quantity describing non-adiabatic effects between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coupling {
    /// Time derivative couplings
    Nacdt,
    /// Non-adiabatic coupling vectors
    Nacdr,
    /// Wavefunction overlaps (local diabatization)
    Overlap,
}

impl ScreeningOption for Coupling {
    const AXIS: &'static str = "coupling";

    fn all() -> &'static [Self] {
        &[Coupling::Nacdt, Coupling::Nacdr, Coupling::Overlap]
    }

    fn code(self) -> u8 {
        match self {
            Coupling::Nacdt => 1,
            Coupling::Nacdr => 2,
            Coupling::Overlap => 3,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Coupling::Nacdt => "nacdt",
            Coupling::Nacdr => "nacdr",
            Coupling::Overlap => "overlap",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Coupling::Nacdt => "< a|d/dt|b >, Hammes-Schiffer-Tully scheme (not available)",
            Coupling::Nacdr => "< a|d/dR|b >, original Tully scheme",
            Coupling::Overlap => "< a(t0)|b(t) >, local diabatization scheme",
        }
    }

    fn is_available(self) -> bool {
        self != Coupling::Nacdt
    }
}

/// Kinetic energy adjustment after a hop; also used for frustrated-hop
/// reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EkinCorrect {
    /// No adjustment
    None,
    /// Along the velocity vector
    ParallelVel,
    /// Along the non-adiabatic coupling vector
    ParallelNac,
    /// Along the gradient difference vector
    ParallelDiff,
}

impl EkinCorrect {
    /// Coupling every trajectory must use for this option to work.
    pub fn required_coupling(self) -> Option<Coupling> {
        match self {
            EkinCorrect::ParallelNac => Some(Coupling::Nacdr),
            _ => None,
        }
    }

    /// Description of the option when used for reflection.
    pub fn reflect_description(self) -> &'static str {
        match self {
            EkinCorrect::None => "Do not reflect at a frustrated hop",
            EkinCorrect::ParallelVel => "Reflect the full velocity vector",
            EkinCorrect::ParallelNac => {
                "Reflect the velocity component along the non-adiabatic coupling vector"
            }
            EkinCorrect::ParallelDiff => {
                "Reflect the velocity component along the gradient difference vector"
            }
        }
    }
}

impl ScreeningOption for EkinCorrect {
    const AXIS: &'static str = "ekincorrect";

    fn all() -> &'static [Self] {
        &[
            EkinCorrect::None,
            EkinCorrect::ParallelVel,
            EkinCorrect::ParallelNac,
            EkinCorrect::ParallelDiff,
        ]
    }

    fn code(self) -> u8 {
        match self {
            EkinCorrect::None => 1,
            EkinCorrect::ParallelVel => 2,
            EkinCorrect::ParallelNac => 3,
            EkinCorrect::ParallelDiff => 4,
        }
    }

    fn name(self) -> &'static str {
        match self {
            EkinCorrect::None => "none",
            EkinCorrect::ParallelVel => "parallel_vel",
            EkinCorrect::ParallelNac => "parallel_nac",
            EkinCorrect::ParallelDiff => "parallel_diff",
        }
    }

    fn description(self) -> &'static str {
        match self {
            EkinCorrect::None => "Do not conserve total energy; hops are never frustrated",
            EkinCorrect::ParallelVel => "Rescale the full velocity vector",
            EkinCorrect::ParallelNac => {
                "Rescale the velocity component along the non-adiabatic coupling vector"
            }
            EkinCorrect::ParallelDiff => {
                "Rescale the velocity component along the gradient difference vector"
            }
        }
    }
}

/// Decoherence correction scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decoherence {
    /// No correction
    None,
    /// Energy-based decoherence
    Edc,
    /// Augmented FSSH
    Afssh,
}

impl Decoherence {
    /// Scheme parameter passed along with the option, if any.
    pub fn parameter(self) -> Option<f64> {
        match self {
            Decoherence::Edc => Some(0.1),
            _ => None,
        }
    }
}

impl ScreeningOption for Decoherence {
    const AXIS: &'static str = "decoherence";

    fn all() -> &'static [Self] {
        &[Decoherence::None, Decoherence::Edc, Decoherence::Afssh]
    }

    fn code(self) -> u8 {
        match self {
            Decoherence::None => 1,
            Decoherence::Edc => 2,
            Decoherence::Afssh => 3,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Decoherence::None => "none",
            Decoherence::Edc => "edc",
            Decoherence::Afssh => "afssh",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Decoherence::None => "No decoherence correction",
            Decoherence::Edc => "Energy-based decoherence (Granucci, Persico, Zoccante)",
            Decoherence::Afssh => "Augmented FSSH (Jain, Alguire, Subotnik)",
        }
    }
}

/// Surface hopping probability scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoppingScheme {
    /// No hops
    Off,
    /// Standard SHARC probabilities
    Sharc,
    /// Global flux surface hopping
    Gfsh,
}

impl ScreeningOption for HoppingScheme {
    const AXIS: &'static str = "hopping";

    fn all() -> &'static [Self] {
        &[HoppingScheme::Off, HoppingScheme::Sharc, HoppingScheme::Gfsh]
    }

    fn code(self) -> u8 {
        match self {
            HoppingScheme::Off => 1,
            HoppingScheme::Sharc => 2,
            HoppingScheme::Gfsh => 3,
        }
    }

    fn name(self) -> &'static str {
        match self {
            HoppingScheme::Off => "off",
            HoppingScheme::Sharc => "sharc",
            HoppingScheme::Gfsh => "gfsh",
        }
    }

    fn description(self) -> &'static str {
        match self {
            HoppingScheme::Off => "Surface hops off",
            HoppingScheme::Sharc => "Standard SHARC hopping probabilities",
            HoppingScheme::Gfsh => "Global flux surface hopping probabilities",
        }
    }
}

/// Choice for one axis: a single option or a list to screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisChoice {
    /// One option for every point
    Fixed(u8),
    /// Every listed option is screened
    Screen(Vec<u8>),
}

impl AxisChoice {
    /// Builds a choice from a list of codes: one code is fixed, more are
    /// screened.
    pub fn from_codes(codes: Vec<u8>) -> Self {
        match codes.as_slice() {
            [code] => AxisChoice::Fixed(*code),
            _ => AxisChoice::Screen(codes),
        }
    }

    fn codes(&self) -> &[u8] {
        match self {
            AxisChoice::Fixed(code) => std::slice::from_ref(code),
            AxisChoice::Screen(codes) => codes,
        }
    }

    /// Resolves the codes into options, dropping repeated codes.
    pub fn resolve<T: ScreeningOption>(&self) -> Result<Vec<T>> {
        let codes = self.codes();
        if codes.is_empty() {
            return Err(OptionError::EmptyAxis { axis: T::AXIS });
        }
        codes
            .iter()
            .unique()
            .map(|&code| T::from_code(code))
            .collect()
    }
}

/// Requested choice on every axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningRequest {
    /// `representation` keyword
    pub representation: AxisChoice,
    /// `coupling` keyword
    pub coupling: AxisChoice,
    /// `ekincorrect` keyword
    pub ekin_correct: AxisChoice,
    /// `reflect` keyword, using the ekincorrect codes
    pub reflect: AxisChoice,
    /// `decoherence` keyword
    pub decoherence: AxisChoice,
    /// `hopping` keyword
    pub hopping: AxisChoice,
}

impl Default for ScreeningRequest {
    fn default() -> Self {
        Self {
            representation: AxisChoice::Fixed(1),
            coupling: AxisChoice::Fixed(3),
            ekin_correct: AxisChoice::Fixed(2),
            reflect: AxisChoice::Fixed(1),
            decoherence: AxisChoice::Fixed(2),
            hopping: AxisChoice::Fixed(2),
        }
    }
}

/// One fully specified set of surface-hopping options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterPoint {
    /// Electronic representation
    pub representation: Representation,
    /// Coupling quantity
    pub coupling: Coupling,
    /// Kinetic energy adjustment after a hop
    pub ekin_correct: EkinCorrect,
    /// Reflection at a frustrated hop
    pub reflect: EkinCorrect,
    /// Decoherence correction
    pub decoherence: Decoherence,
    /// Hopping probability scheme
    pub hopping: HoppingScheme,
}

impl ParameterPoint {
    /// Option codes in axis order.
    pub fn codes(&self) -> [u8; 6] {
        [
            self.representation.code(),
            self.coupling.code(),
            self.ekin_correct.code(),
            self.reflect.code(),
            self.decoherence.code(),
            self.hopping.code(),
        ]
    }
}

impl fmt::Display for ParameterPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}/{}",
            self.representation.name(),
            self.coupling.name(),
            self.ekin_correct.name(),
            self.reflect.name(),
            self.decoherence.name(),
            self.hopping.name()
        )
    }
}

/// Cartesian product of all requested axis options.
///
/// # Arguments
///
/// * `request` - choice on every axis
/// * `populated_multiplicities` - number of multiplicities holding at least
///   one state; below two, the representation axis is forced to MCH
///
/// # Returns
///
/// The points in axis order (representation varies slowest, hopping fastest).
/// Their number is the product of the resolved list lengths.
///
/// # Examples
///
/// ```
/// use lvcgym::parameter_space::{build_parameter_space, AxisChoice, ScreeningRequest};
///
/// let request = ScreeningRequest {
///     coupling: AxisChoice::Screen(vec![2, 3]),
///     hopping: AxisChoice::Screen(vec![2, 3]),
///     ..ScreeningRequest::default()
/// };
/// let points = build_parameter_space(&request, 2)?;
/// assert_eq!(points.len(), 4);
/// # Ok::<(), lvcgym::parameter_space::OptionError>(())
/// ```
pub fn build_parameter_space(
    request: &ScreeningRequest,
    populated_multiplicities: usize,
) -> Result<Vec<ParameterPoint>> {
    let mut representations: Vec<Representation> = request.representation.resolve()?;
    let couplings: Vec<Coupling> = request.coupling.resolve()?;
    let ekin_corrects: Vec<EkinCorrect> = request.ekin_correct.resolve()?;
    let reflects: Vec<EkinCorrect> = request.reflect.resolve()?;
    let decoherences: Vec<Decoherence> = request.decoherence.resolve()?;
    let hoppings: Vec<HoppingScheme> = request.hopping.resolve()?;

    check_requirements("ekincorrect", &ekin_corrects, &couplings)?;
    check_requirements("reflect", &reflects, &couplings)?;

    if populated_multiplicities < 2 && representations != [Representation::Mch] {
        warn!(
            "Only {} populated multiplicity: diagonal representation is not possible, using MCH",
            populated_multiplicities
        );
        representations = vec![Representation::Mch];
    }

    let points: Vec<ParameterPoint> = iproduct!(
        representations.iter().copied(),
        couplings.iter().copied(),
        ekin_corrects.iter().copied(),
        reflects.iter().copied(),
        decoherences.iter().copied(),
        hoppings.iter().copied()
    )
    .map(
        |(representation, coupling, ekin_correct, reflect, decoherence, hopping)| ParameterPoint {
            representation,
            coupling,
            ekin_correct,
            reflect,
            decoherence,
            hopping,
        },
    )
    .collect();

    info!(
        "The selection of screened parameters results in {} combinations",
        points.len()
    );
    Ok(points)
}

fn check_requirements(
    axis: &'static str,
    options: &[EkinCorrect],
    couplings: &[Coupling],
) -> Result<()> {
    for option in options {
        if let Some(required) = option.required_coupling() {
            if couplings.iter().any(|&c| c != required) {
                return Err(OptionError::MissingRequirement {
                    axis,
                    option: option.name(),
                    required: required.name(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request_is_single_point() {
        let points = build_parameter_space(&ScreeningRequest::default(), 2).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].codes(), [1, 3, 2, 1, 2, 2]);
        assert_eq!(points[0].decoherence.parameter(), Some(0.1));
    }

    #[test]
    fn test_product_count_and_order() {
        let request = ScreeningRequest {
            representation: AxisChoice::Screen(vec![1, 2]),
            coupling: AxisChoice::Screen(vec![2, 3]),
            hopping: AxisChoice::Screen(vec![1, 2, 3]),
            ..ScreeningRequest::default()
        };
        let points = build_parameter_space(&request, 3).unwrap();
        assert_eq!(points.len(), 12);
        assert_eq!(points[0].codes(), [1, 2, 2, 1, 2, 1]);
        assert_eq!(points[1].codes(), [1, 2, 2, 1, 2, 2]);
        assert_eq!(points[11].codes(), [2, 3, 2, 1, 2, 3]);
    }

    #[test]
    fn test_nacdt_is_unavailable() {
        let request = ScreeningRequest {
            coupling: AxisChoice::Screen(vec![1, 2]),
            ..ScreeningRequest::default()
        };
        assert_eq!(
            build_parameter_space(&request, 2),
            Err(OptionError::Unavailable {
                axis: "coupling",
                code: 1,
                name: "nacdt"
            })
        );
    }

    #[test]
    fn test_unknown_and_empty_axes_are_rejected() {
        let request = ScreeningRequest {
            hopping: AxisChoice::Fixed(7),
            ..ScreeningRequest::default()
        };
        assert!(matches!(
            build_parameter_space(&request, 2),
            Err(OptionError::UnknownCode { axis: "hopping", code: 7 })
        ));

        let request = ScreeningRequest {
            decoherence: AxisChoice::Screen(vec![]),
            ..ScreeningRequest::default()
        };
        assert_eq!(
            build_parameter_space(&request, 2),
            Err(OptionError::EmptyAxis {
                axis: "decoherence"
            })
        );
    }

    #[test]
    fn test_parallel_nac_requires_nacdr() {
        let request = ScreeningRequest {
            coupling: AxisChoice::Screen(vec![2, 3]),
            reflect: AxisChoice::Fixed(3),
            ..ScreeningRequest::default()
        };
        assert!(matches!(
            build_parameter_space(&request, 2),
            Err(OptionError::MissingRequirement { axis: "reflect", .. })
        ));

        let request = ScreeningRequest {
            coupling: AxisChoice::Fixed(2),
            ekin_correct: AxisChoice::Fixed(3),
            ..ScreeningRequest::default()
        };
        assert_eq!(build_parameter_space(&request, 2).unwrap().len(), 1);
    }

    #[test]
    fn test_single_multiplicity_forces_mch() {
        let request = ScreeningRequest {
            representation: AxisChoice::Screen(vec![1, 2]),
            ..ScreeningRequest::default()
        };
        let points = build_parameter_space(&request, 1).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].representation, Representation::Mch);
    }

    #[test]
    fn test_repeated_codes_are_screened_once() {
        let request = ScreeningRequest {
            hopping: AxisChoice::Screen(vec![2, 2, 3]),
            ..ScreeningRequest::default()
        };
        assert_eq!(build_parameter_space(&request, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_axis_choice_from_codes() {
        assert_eq!(AxisChoice::from_codes(vec![3]), AxisChoice::Fixed(3));
        assert_eq!(
            AxisChoice::from_codes(vec![1, 2]),
            AxisChoice::Screen(vec![1, 2])
        );
    }

    #[test]
    fn test_display_uses_option_names() {
        let point = build_parameter_space(&ScreeningRequest::default(), 2).unwrap()[0];
        assert_eq!(point.to_string(), "diagonal/overlap/parallel_vel/none/edc/sharc");
    }
}
