use crate::grid::CellSizing;
use crate::palette::{Palette, Rgb};
use crate::params::{Aspect, DistributionMode, DivisionLimits, Params};
use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub(crate) const EXPORT_FILE_NAME: &str = "kawano-artwork.png";

#[derive(Parser, Debug, Default)]
#[command(name = "kawano", about = "Parametric color-grid compositions in the terminal")]
pub(crate) struct Args {
    /// cells per axis (sequential modes double the long axis)
    #[arg(long)]
    pub(crate) division: Option<u32>,

    /// how colors are distributed over the grid
    #[arg(long, value_enum)]
    pub(crate) mode: Option<DistributionMode>,

    /// chance of switching color at each cell in sequential modes (0..1)
    #[arg(long)]
    pub(crate) threshold: Option<f32>,

    /// zoom of the noise field in noise mode
    #[arg(long)]
    pub(crate) noise_scale: Option<f32>,

    /// canvas shape
    #[arg(long, value_enum)]
    pub(crate) aspect: Option<Aspect>,

    /// fit cells to the canvas or keep them square
    #[arg(long, value_enum)]
    pub(crate) cell_sizing: Option<CellSizing>,

    /// seed for the color picks (random when absent)
    #[arg(long)]
    pub(crate) rng_seed: Option<u64>,

    /// seed for the noise field
    #[arg(long)]
    pub(crate) noise_seed: Option<u32>,

    /// physical pixels per canvas pixel in exported images
    #[arg(long)]
    pub(crate) density: Option<u32>,

    /// directory exported images are written to
    #[arg(long)]
    pub(crate) export_dir: Option<PathBuf>,

    /// log filter, env_logger syntax (e.g. "debug", "kawano=trace")
    #[arg(long)]
    pub(crate) log_level: Option<String>,

    /// log file (defaults to kawano.log in the data directory)
    #[arg(long)]
    pub(crate) log_file: Option<PathBuf>,

    /// do not write settings back on exit
    #[arg(long)]
    pub(crate) no_save: bool,

    /// draw one composition to this PNG and exit, without the terminal UI
    #[arg(long)]
    pub(crate) render: Option<PathBuf>,

    /// canvas width for --render
    #[arg(long, default_value_t = 600)]
    pub(crate) width: u32,

    /// canvas height for --render
    #[arg(long, default_value_t = 960)]
    pub(crate) height: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) palette: Palette,
    pub(crate) background: Rgb,
    pub(crate) division: u32,
    pub(crate) division_min: u32,
    pub(crate) division_max: u32,
    pub(crate) mode: DistributionMode,
    pub(crate) threshold: f32,
    pub(crate) noise_scale: f32,
    pub(crate) aspect: Aspect,
    pub(crate) width: f32,
    pub(crate) height: f32,
    pub(crate) cell_sizing: CellSizing,
    pub(crate) pixel_density: u32,
    pub(crate) rng_seed: Option<u64>,
    pub(crate) noise_seed: u32,
    pub(crate) export_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let p = Params::default();
        let limits = DivisionLimits::default();
        Self {
            palette: p.palette,
            background: Rgb::new(170, 170, 170),
            division: p.division,
            division_min: limits.min,
            division_max: limits.max,
            mode: p.mode,
            threshold: p.threshold,
            noise_scale: p.noise_scale,
            aspect: p.aspect,
            width: p.width_frac,
            height: p.height_frac,
            cell_sizing: CellSizing::default(),
            pixel_density: 5,
            rng_seed: None,
            noise_seed: 0xC0FFEE,
            export_dir: None,
        }
    }
}

impl Settings {
    pub(crate) fn limits(&self) -> DivisionLimits {
        DivisionLimits::new(self.division_min, self.division_max)
    }

    /// Pulls hand-edited or stale values back into range.
    pub(crate) fn sanitized(mut self) -> Self {
        let limits = self.limits();
        self.division_min = limits.min;
        self.division_max = limits.max;
        self.division = self.division.clamp(limits.min, limits.max);
        self.threshold = clamp_unit(self.threshold, 0.0);
        self.noise_scale = clamp_unit(self.noise_scale, 0.0);
        self.width = clamp_unit(self.width, 0.1);
        self.height = clamp_unit(self.height, 0.1);
        self.pixel_density = self.pixel_density.clamp(1, 16);
        self
    }

    /// Command-line values win over the settings file for this session.
    pub(crate) fn apply_args(&mut self, args: &Args) {
        if let Some(v) = args.division {
            self.division = v;
        }
        if let Some(v) = args.mode {
            self.mode = v;
        }
        if let Some(v) = args.threshold {
            self.threshold = v;
        }
        if let Some(v) = args.noise_scale {
            self.noise_scale = v;
        }
        if let Some(v) = args.aspect {
            self.aspect = v;
        }
        if let Some(v) = args.cell_sizing {
            self.cell_sizing = v;
        }
        if args.rng_seed.is_some() {
            self.rng_seed = args.rng_seed;
        }
        if let Some(v) = args.noise_seed {
            self.noise_seed = v;
        }
        if let Some(v) = args.density {
            self.pixel_density = v;
        }
        if args.export_dir.is_some() {
            self.export_dir = args.export_dir.clone();
        }
        *self = std::mem::take(self).sanitized();
    }

    pub(crate) fn to_params(&self) -> Params {
        Params {
            palette: self.palette.clone(),
            division: self.division,
            mode: self.mode,
            threshold: self.threshold,
            noise_scale: self.noise_scale,
            aspect: self.aspect,
            width_frac: self.width,
            height_frac: self.height,
        }
    }

    /// Keeps edits made in the panel for the next session.
    pub(crate) fn absorb(&mut self, p: &Params) {
        self.palette = p.palette.clone();
        self.division = p.division;
        self.mode = p.mode;
        self.threshold = p.threshold;
        self.noise_scale = p.noise_scale;
        self.aspect = p.aspect;
        self.width = p.width_frac;
        self.height = p.height_frac;
    }

    pub(crate) fn export_path(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(EXPORT_FILE_NAME)
    }
}

fn clamp_unit(v: f32, min: f32) -> f32 {
    if v.is_nan() {
        min
    } else {
        v.clamp(min, 1.0)
    }
}

pub(crate) struct Paths {
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "kawano", "Kawano")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    Ok(Paths {
        settings_path: dir.join("settings.json"),
        log_path: dir.join("kawano.log"),
    })
}

/// Missing or malformed files fall back to defaults.
pub(crate) fn load_settings(path: &Path) -> Settings {
    let Ok(s) = fs::read_to_string(path) else {
        return Settings::default();
    };
    match serde_json::from_str::<Settings>(&s) {
        Ok(v) => {
            log::info!("loaded settings from {}", path.display());
            v.sanitized()
        }
        Err(e) => {
            log::warn!("ignoring settings at {}: {e}", path.display());
            Settings::default()
        }
    }
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data).with_context(|| format!("writing {}", tmp.display()))?;
    // rename replaces an existing file in one step
    fs::rename(&tmp, path).with_context(|| format!("moving settings into {}", path.display()))?;
    log::info!("saved settings to {}", path.display());
    Ok(())
}
