use crate::palette::{Palette, PaletteError, Rgb};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum DistributionMode {
    Horizontal,
    Vertical,
    Noise,
}

impl DistributionMode {
    pub(crate) const ALL: [DistributionMode; 3] = [
        DistributionMode::Horizontal,
        DistributionMode::Vertical,
        DistributionMode::Noise,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            DistributionMode::Horizontal => "horizontal",
            DistributionMode::Vertical => "vertical",
            DistributionMode::Noise => "noise",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Aspect {
    Square,
    Portrait,
    Landscape,
    /// Fractions of the available viewport, taken from the width/height fields.
    Viewport,
}

impl Aspect {
    pub(crate) const ALL: [Aspect; 4] = [
        Aspect::Square,
        Aspect::Portrait,
        Aspect::Landscape,
        Aspect::Viewport,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            Aspect::Square => "square",
            Aspect::Portrait => "portrait",
            Aspect::Landscape => "landscape",
            Aspect::Viewport => "viewport",
        }
    }
}

/// Everything a redraw reads.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Params {
    pub(crate) palette: Palette,
    pub(crate) division: u32,
    pub(crate) mode: DistributionMode,
    /// Probability of switching color at each sequential scan step.
    pub(crate) threshold: f32,
    /// Zoom applied to noise sample coordinates.
    pub(crate) noise_scale: f32,
    pub(crate) aspect: Aspect,
    pub(crate) width_frac: f32,
    pub(crate) height_frac: f32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            division: 30,
            mode: DistributionMode::Horizontal,
            threshold: 0.06,
            noise_scale: 0.06,
            aspect: Aspect::Viewport,
            width_frac: 0.5,
            height_frac: 0.8,
        }
    }
}

impl Params {
    /// Canvas size for a viewport: fixed shapes are the largest fit, the
    /// viewport aspect scales each axis by its fraction.
    pub(crate) fn canvas_size(&self, viewport: (u32, u32)) -> (u32, u32) {
        let (vw, vh) = (viewport.0 as f32, viewport.1 as f32);
        let (w, h) = match self.aspect {
            Aspect::Square => {
                let s = vw.min(vh);
                (s, s)
            }
            Aspect::Portrait => {
                let w = vw.min(vh * 2.0 / 3.0);
                (w, w * 1.5)
            }
            Aspect::Landscape => {
                let h = vh.min(vw * 2.0 / 3.0);
                (h * 1.5, h)
            }
            Aspect::Viewport => (
                vw * self.width_frac.clamp(0.0, 1.0),
                vh * self.height_frac.clamp(0.0, 1.0),
            ),
        };
        ((w.floor() as u32).min(viewport.0), (h.floor() as u32).min(viewport.1))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Field {
    Color(usize),
    Division,
    Mode,
    Threshold,
    NoiseScale,
    Aspect,
    Width,
    Height,
}

impl Field {
    /// Fields that change the canvas size, so the surface must be resized
    /// before the grid is recomputed.
    pub(crate) fn affects_geometry(self) -> bool {
        matches!(self, Field::Aspect | Field::Width | Field::Height)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Color(i) => write!(f, "color {}", i + 1),
            Field::Division => f.write_str("division"),
            Field::Mode => f.write_str("mode"),
            Field::Threshold => f.write_str("threshold"),
            Field::NoiseScale => f.write_str("noise scale"),
            Field::Aspect => f.write_str("aspect"),
            Field::Width => f.write_str("width"),
            Field::Height => f.write_str("height"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Value {
    Color(Rgb),
    Count(u32),
    Amount(f32),
    Mode(DistributionMode),
    Aspect(Aspect),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub(crate) enum ParamError {
    #[error("{field} expects {expected}, got {got:?}")]
    TypeMismatch {
        field: Field,
        expected: &'static str,
        got: Value,
    },
    #[error("division {value} outside {min}..={max}")]
    DivisionOutOfRange { value: u32, min: u32, max: u32 },
    #[error(transparent)]
    Palette(#[from] PaletteError),
}

/// Hard ceiling for any division, whatever the settings file says. Above it a
/// sequential cycle would paint millions of cells.
pub(crate) const MAX_DIVISION: u32 = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DivisionLimits {
    pub(crate) min: u32,
    pub(crate) max: u32,
}

impl DivisionLimits {
    /// Both bounds are kept within `1..=MAX_DIVISION` and the range is never
    /// inverted.
    pub(crate) fn new(min: u32, max: u32) -> Self {
        let min = min.clamp(1, MAX_DIVISION);
        Self {
            min,
            max: max.clamp(min, MAX_DIVISION),
        }
    }

    pub(crate) fn contains(self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl Default for DivisionLimits {
    fn default() -> Self {
        Self::new(2, 120)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct SubscriptionId(u64);

pub(crate) type Listener = Box<dyn FnMut(&Params, Field)>;

/// Single source of truth for the tunable values, with one "any change"
/// notification channel.
pub(crate) struct ParamStore {
    params: Params,
    limits: DivisionLimits,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl ParamStore {
    pub(crate) fn new(params: Params, limits: DivisionLimits) -> Result<Self, ParamError> {
        if !limits.contains(params.division) {
            return Err(ParamError::DivisionOutOfRange {
                value: params.division,
                min: limits.min,
                max: limits.max,
            });
        }
        Ok(Self {
            params,
            limits,
            listeners: Vec::new(),
            next_id: 0,
        })
    }

    pub(crate) fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn limits(&self) -> DivisionLimits {
        self.limits
    }

    pub(crate) fn get(&self, field: Field) -> Option<Value> {
        let p = &self.params;
        Some(match field {
            Field::Color(slot) => Value::Color(p.palette.get(slot)?),
            Field::Division => Value::Count(p.division),
            Field::Mode => Value::Mode(p.mode),
            Field::Threshold => Value::Amount(p.threshold),
            Field::NoiseScale => Value::Amount(p.noise_scale),
            Field::Aspect => Value::Aspect(p.aspect),
            Field::Width => Value::Amount(p.width_frac),
            Field::Height => Value::Amount(p.height_frac),
        })
    }

    /// Stores `value` and notifies every subscriber synchronously. Float
    /// fields are stored as given; clamping happens at the control binding.
    pub(crate) fn set(&mut self, field: Field, value: Value) -> Result<(), ParamError> {
        let mismatch = |expected| ParamError::TypeMismatch {
            field,
            expected,
            got: value,
        };
        let p = &mut self.params;
        match (field, value) {
            (Field::Color(slot), Value::Color(c)) => p.palette.set(slot, c)?,
            (Field::Color(_), _) => return Err(mismatch("a color")),
            (Field::Division, Value::Count(n)) => {
                if !self.limits.contains(n) {
                    return Err(ParamError::DivisionOutOfRange {
                        value: n,
                        min: self.limits.min,
                        max: self.limits.max,
                    });
                }
                p.division = n;
            }
            (Field::Division, _) => return Err(mismatch("a count")),
            (Field::Mode, Value::Mode(m)) => p.mode = m,
            (Field::Mode, _) => return Err(mismatch("a distribution mode")),
            (Field::Aspect, Value::Aspect(a)) => p.aspect = a,
            (Field::Aspect, _) => return Err(mismatch("an aspect")),
            (Field::Threshold, Value::Amount(v)) => p.threshold = v,
            (Field::NoiseScale, Value::Amount(v)) => p.noise_scale = v,
            (Field::Width, Value::Amount(v)) => p.width_frac = v,
            (Field::Height, Value::Amount(v)) => p.height_frac = v,
            (Field::Threshold | Field::NoiseScale | Field::Width | Field::Height, _) => {
                return Err(mismatch("an amount"))
            }
        }

        log::debug!("param {field} set to {value:?}");
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.params, field);
        }
        Ok(())
    }

    pub(crate) fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }
}
