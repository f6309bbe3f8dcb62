use crate::grid::shuffle_enabled;
use crate::palette::Rgb;
use crate::params::{Aspect, DistributionMode, DivisionLimits, Field, Params, Value};

/// Hue step applied to a swatch per key press.
const HUE_STEP: f32 = 15.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Button {
    Shuffle,
    Download,
}

impl Button {
    fn label(self) -> &'static str {
        match self {
            Button::Shuffle => "Shuffle",
            Button::Download => "Download",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ControlKind {
    Swatch { slot: usize },
    Slider { field: Field, min: f32, max: f32, step: f32 },
    Choice { field: Field, options: Vec<Value> },
    Button { button: Button, enabled: bool },
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Control {
    pub(crate) label: String,
    pub(crate) kind: ControlKind,
}

/// What the panel asks the application to do.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Command {
    Set(Field, Value),
    Shuffle,
    Download,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PanelAction {
    Up,
    Down,
    Decrease,
    Increase,
    Press,
    Hotkey(Button),
    Quit,
}

/// One rendered line of the panel.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PanelRow {
    pub(crate) label: String,
    pub(crate) value: String,
    pub(crate) selected: bool,
    pub(crate) enabled: bool,
    pub(crate) swatch: Option<Rgb>,
}

pub(crate) struct Panel {
    controls: Vec<Control>,
    cursor: usize,
    status: String,
}

impl Panel {
    pub(crate) fn new(params: &Params, limits: DivisionLimits) -> Self {
        let mut controls: Vec<Control> = params
            .palette
            .swatches()
            .iter()
            .enumerate()
            .map(|(slot, s)| Control {
                label: s.name.clone(),
                kind: ControlKind::Swatch { slot },
            })
            .collect();

        let slider = |label: &str, field, min, max, step| Control {
            label: label.to_string(),
            kind: ControlKind::Slider {
                field,
                min,
                max,
                step,
            },
        };
        controls.push(slider("Division", Field::Division, limits.min as f32, limits.max as f32, 1.0));
        controls.push(Control {
            label: "Mode".to_string(),
            kind: ControlKind::Choice {
                field: Field::Mode,
                options: DistributionMode::ALL.iter().map(|&m| Value::Mode(m)).collect(),
            },
        });
        controls.push(slider("Threshold", Field::Threshold, 0.0, 1.0, 0.01));
        controls.push(slider("Noise scale", Field::NoiseScale, 0.01, 0.5, 0.01));
        controls.push(Control {
            label: "Aspect".to_string(),
            kind: ControlKind::Choice {
                field: Field::Aspect,
                options: Aspect::ALL.iter().map(|&a| Value::Aspect(a)).collect(),
            },
        });
        controls.push(slider("Width", Field::Width, 0.1, 1.0, 0.05));
        controls.push(slider("Height", Field::Height, 0.1, 1.0, 0.05));
        for button in [Button::Shuffle, Button::Download] {
            controls.push(Control {
                label: button.label().to_string(),
                kind: ControlKind::Button {
                    button,
                    enabled: true,
                },
            });
        }

        let mut panel = Self {
            controls,
            cursor: 0,
            status: String::new(),
        };
        panel.sync(params);
        panel
    }

    #[cfg(test)]
    pub(crate) fn controls(&self) -> &[Control] {
        &self.controls
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn status(&self) -> &str {
        &self.status
    }

    pub(crate) fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Re-derives button state from the parameters.
    pub(crate) fn sync(&mut self, params: &Params) {
        self.set_enabled(Button::Shuffle, shuffle_enabled(params.mode));
    }

    pub(crate) fn set_enabled(&mut self, which: Button, on: bool) {
        for c in &mut self.controls {
            if let ControlKind::Button { button, enabled } = &mut c.kind {
                if *button == which {
                    *enabled = on;
                }
            }
        }
    }

    pub(crate) fn is_enabled(&self, which: Button) -> bool {
        self.controls.iter().any(|c| {
            matches!(c.kind, ControlKind::Button { button, enabled } if button == which && enabled)
        })
    }

    /// Turns a key action into a command. `None` means nothing to do, either
    /// because the action only moved the cursor or because it had no effect.
    pub(crate) fn handle(&mut self, action: PanelAction, params: &Params) -> Option<Command> {
        match action {
            PanelAction::Up => {
                self.cursor = self.cursor.checked_sub(1).unwrap_or(self.controls.len() - 1);
                None
            }
            PanelAction::Down => {
                self.cursor = (self.cursor + 1) % self.controls.len();
                None
            }
            PanelAction::Decrease => self.adjust(params, -1),
            PanelAction::Increase => self.adjust(params, 1),
            PanelAction::Press => match self.controls[self.cursor].kind {
                ControlKind::Button { button, .. } => self.press(button),
                _ => None,
            },
            PanelAction::Hotkey(button) => self.press(button),
            PanelAction::Quit => None,
        }
    }

    fn press(&self, button: Button) -> Option<Command> {
        if !self.is_enabled(button) {
            return None;
        }
        Some(match button {
            Button::Shuffle => Command::Shuffle,
            Button::Download => Command::Download,
        })
    }

    fn adjust(&self, params: &Params, direction: i32) -> Option<Command> {
        match &self.controls[self.cursor].kind {
            ControlKind::Swatch { slot } => {
                let c = params.palette.get(*slot)?;
                Some(Command::Set(
                    Field::Color(*slot),
                    Value::Color(c.rotate_hue(HUE_STEP * direction as f32)),
                ))
            }
            ControlKind::Slider {
                field,
                min,
                max,
                step,
            } => {
                let current = current_amount(params, *field)?;
                let next = snap(current + step * direction as f32, *min, *max, *step);
                if (next - current).abs() < f32::EPSILON {
                    return None;
                }
                let value = match field {
                    Field::Division => Value::Count(next.round() as u32),
                    _ => Value::Amount(next),
                };
                Some(Command::Set(*field, value))
            }
            ControlKind::Choice { field, options } => {
                let current = current_choice(params, *field)?;
                let i = options.iter().position(|o| *o == current).unwrap_or(0) as i32;
                let n = options.len() as i32;
                let next = options[(i + direction).rem_euclid(n) as usize];
                Some(Command::Set(*field, next))
            }
            ControlKind::Button { .. } => None,
        }
    }

    pub(crate) fn rows(&self, params: &Params) -> Vec<PanelRow> {
        self.controls
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let (value, enabled, swatch) = match &c.kind {
                    ControlKind::Swatch { slot } => {
                        let color = params.palette.get(*slot);
                        (color.map(|c| c.to_hex()).unwrap_or_default(), true, color)
                    }
                    ControlKind::Slider { field, step, .. } => {
                        let v = current_amount(params, *field).unwrap_or_default();
                        let text = if *step >= 1.0 {
                            format!("{v:.0}")
                        } else {
                            format!("{v:.2}")
                        };
                        (text, true, None)
                    }
                    ControlKind::Choice { field, .. } => {
                        let text = match current_choice(params, *field) {
                            Some(Value::Mode(m)) => m.label(),
                            Some(Value::Aspect(a)) => a.label(),
                            _ => "",
                        };
                        (text.to_string(), true, None)
                    }
                    ControlKind::Button { enabled, .. } => {
                        let text = if *enabled { "[enter]" } else { "[disabled]" };
                        (text.to_string(), *enabled, None)
                    }
                };
                PanelRow {
                    label: c.label.clone(),
                    value,
                    selected: i == self.cursor,
                    enabled,
                    swatch,
                }
            })
            .collect()
    }
}

fn current_amount(params: &Params, field: Field) -> Option<f32> {
    Some(match field {
        Field::Division => params.division as f32,
        Field::Threshold => params.threshold,
        Field::NoiseScale => params.noise_scale,
        Field::Width => params.width_frac,
        Field::Height => params.height_frac,
        _ => return None,
    })
}

fn current_choice(params: &Params, field: Field) -> Option<Value> {
    match field {
        Field::Mode => Some(Value::Mode(params.mode)),
        Field::Aspect => Some(Value::Aspect(params.aspect)),
        _ => None,
    }
}

/// Clamps to `[min, max]` and rounds onto the step grid anchored at `min`.
fn snap(v: f32, min: f32, max: f32, step: f32) -> f32 {
    let stepped = if step > 0.0 {
        min + ((v - min) / step).round() * step
    } else {
        v
    };
    stepped.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel_at(label: &str, params: &Params) -> Panel {
        let mut panel = Panel::new(params, DivisionLimits::default());
        while panel.controls()[panel.cursor()].label != label {
            panel.handle(PanelAction::Down, params);
        }
        panel
    }

    #[test]
    fn lists_one_swatch_per_slot_then_fields_then_buttons() {
        let p = Params::default();
        let panel = Panel::new(&p, DivisionLimits::default());
        let labels: Vec<&str> = panel.controls().iter().map(|c| c.label.as_str()).collect();
        assert_eq!(&labels[..5], &["Color 1", "Color 2", "Color 3", "Color 4", "Color 5"]);
        assert_eq!(labels.last(), Some(&"Download"));
        assert_eq!(labels.len(), 5 + 7 + 2);
    }

    #[test]
    fn cursor_wraps_both_ways() {
        let p = Params::default();
        let mut panel = Panel::new(&p, DivisionLimits::default());
        panel.handle(PanelAction::Up, &p);
        assert_eq!(panel.cursor(), panel.controls().len() - 1);
        panel.handle(PanelAction::Down, &p);
        assert_eq!(panel.cursor(), 0);
    }

    #[test]
    fn division_slider_steps_and_clamps() {
        let p = Params {
            division: 119,
            ..Params::default()
        };
        let mut panel = panel_at("Division", &p);
        assert_eq!(
            panel.handle(PanelAction::Increase, &p),
            Some(Command::Set(Field::Division, Value::Count(120)))
        );
        let at_max = Params {
            division: 120,
            ..Params::default()
        };
        assert_eq!(panel.handle(PanelAction::Increase, &at_max), None);
        assert_eq!(
            panel.handle(PanelAction::Decrease, &at_max),
            Some(Command::Set(Field::Division, Value::Count(119)))
        );
    }

    #[test]
    fn threshold_is_clamped_to_unit_range() {
        let p = Params {
            threshold: 0.995,
            ..Params::default()
        };
        let mut panel = panel_at("Threshold", &p);
        match panel.handle(PanelAction::Increase, &p) {
            Some(Command::Set(Field::Threshold, Value::Amount(v))) => assert!(v <= 1.0),
            other => panic!("unexpected {other:?}"),
        }
        let zero = Params {
            threshold: 0.0,
            ..Params::default()
        };
        assert_eq!(panel.handle(PanelAction::Decrease, &zero), None);
    }

    #[test]
    fn mode_choice_cycles_through_options() {
        let p = Params::default();
        let mut panel = panel_at("Mode", &p);
        assert_eq!(
            panel.handle(PanelAction::Increase, &p),
            Some(Command::Set(Field::Mode, Value::Mode(DistributionMode::Vertical)))
        );
        assert_eq!(
            panel.handle(PanelAction::Decrease, &p),
            Some(Command::Set(Field::Mode, Value::Mode(DistributionMode::Noise)))
        );
    }

    #[test]
    fn swatch_rotates_hue() {
        let mut p = Params::default();
        p.palette.set(0, Rgb::new(255, 0, 0)).unwrap();
        let mut panel = Panel::new(&p, DivisionLimits::default());
        assert_eq!(
            panel.handle(PanelAction::Increase, &p),
            Some(Command::Set(Field::Color(0), Value::Color(Rgb::new(255, 0, 0).rotate_hue(15.0))))
        );
    }

    #[test]
    fn shuffle_follows_noise_mode() {
        let mut p = Params::default();
        let mut panel = Panel::new(&p, DivisionLimits::default());
        assert!(panel.is_enabled(Button::Shuffle));
        assert_eq!(
            panel.handle(PanelAction::Hotkey(Button::Shuffle), &p),
            Some(Command::Shuffle)
        );

        p.mode = DistributionMode::Noise;
        panel.sync(&p);
        assert!(!panel.is_enabled(Button::Shuffle));
        assert!(panel.is_enabled(Button::Download));
        assert_eq!(panel.handle(PanelAction::Hotkey(Button::Shuffle), &p), None);

        p.mode = DistributionMode::Horizontal;
        panel.sync(&p);
        assert!(panel.is_enabled(Button::Shuffle));
    }

    #[test]
    fn a_panel_built_in_noise_mode_starts_disabled() {
        let p = Params {
            mode: DistributionMode::Noise,
            ..Params::default()
        };
        let panel = Panel::new(&p, DivisionLimits::default());
        assert!(!panel.is_enabled(Button::Shuffle));
        let row = panel
            .rows(&p)
            .into_iter()
            .find(|r| r.label == "Shuffle")
            .unwrap();
        assert!(!row.enabled);
    }

    #[test]
    fn press_only_fires_on_buttons() {
        let p = Params::default();
        let mut panel = Panel::new(&p, DivisionLimits::default());
        assert_eq!(panel.handle(PanelAction::Press, &p), None);
        let mut panel = panel_at("Download", &p);
        assert_eq!(panel.handle(PanelAction::Press, &p), Some(Command::Download));
    }

    #[test]
    fn rows_show_current_values() {
        let p = Params::default();
        let panel = Panel::new(&p, DivisionLimits::default());
        let rows = panel.rows(&p);
        assert!(rows[0].selected);
        assert_eq!(rows[0].value, "#e34231");
        assert_eq!(rows[0].swatch, Some(Rgb::new(0xe3, 0x42, 0x31)));
        let division = rows.iter().find(|r| r.label == "Division").unwrap();
        assert_eq!(division.value, "30");
        let mode = rows.iter().find(|r| r.label == "Mode").unwrap();
        assert_eq!(mode.value, "horizontal");
    }

    #[test]
    fn snap_respects_grid_and_bounds() {
        assert!((snap(0.37, 0.1, 1.0, 0.05) - 0.35).abs() < 1e-5);
        assert_eq!(snap(5.0, 0.1, 1.0, 0.05), 1.0);
        assert_eq!(snap(-1.0, 0.0, 1.0, 0.01), 0.0);
    }
}
