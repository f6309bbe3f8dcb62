use crate::config::{load_settings, project_paths, save_settings_atomic, Args, Paths, Settings};
use crate::grid::GridRenderer;
use crate::input::{next_event, InputEvent};
use crate::logging::{init_logging, LoggingConfig};
use crate::noise::ValueNoise;
use crate::panel::{Command, Panel, PanelAction};
use crate::params::{ParamStore, Params, SubscriptionId};
use crate::render::{blit_surface, canvas_viewport, draw_panel, Terminal};
use crate::surface::PixelSurface;
use anyhow::{Context, Result};
use clap::Parser;
use crossterm::style::Color;
use rand::{rngs::StdRng, SeedableRng};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

type Renderer = GridRenderer<PixelSurface, ValueNoise>;

const CANVAS_BG: Color = Color::Black;

fn build_renderer(settings: &Settings, size: (u32, u32)) -> Renderer {
    let rng = match settings.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    GridRenderer::new(
        PixelSurface::new(size.0, size.1, settings.pixel_density),
        ValueNoise::new(settings.noise_seed),
        rng,
        settings.background,
        settings.cell_sizing,
    )
}

/// One full redraw, optionally preceded by a resize. Failures are reported on
/// the panel. Without a resize the previous image stays up; after one the
/// canvas is left blank at the new size.
fn run_cycle(renderer: &mut Renderer, panel: &mut Panel, params: &Params, resize: Option<(u32, u32)>) {
    if let Some((w, h)) = resize {
        renderer.resize(w, h);
    }
    match renderer.redraw(params) {
        Ok(report) => panel.set_status(format!(
            "#{} {} · {}x{} cells",
            report.cycle,
            report.mode.label(),
            report.layout.cols,
            report.layout.rows
        )),
        Err(e) => {
            log::warn!("redraw refused: {e}");
            panel.set_status(format!("not drawn: {e}"));
        }
    }
    panel.sync(params);
}

/// Records the new viewport for later geometry changes, then refits the
/// canvas to it and redraws.
fn relayout(
    current: &Cell<(u32, u32)>,
    viewport: (u32, u32),
    renderer: &mut Renderer,
    panel: &mut Panel,
    params: &Params,
) {
    current.set(viewport);
    run_cycle(renderer, panel, params, Some(params.canvas_size(viewport)));
}

pub(crate) struct App {
    settings: Settings,
    paths: Paths,
    save_on_exit: bool,
    store: ParamStore,
    redraw_on_change: SubscriptionId,
    renderer: Rc<RefCell<Renderer>>,
    panel: Rc<RefCell<Panel>>,
    viewport: Rc<Cell<(u32, u32)>>,
    term: Terminal,
    should_quit: bool,
}

impl App {
    fn init(settings: Settings, paths: Paths, save_on_exit: bool) -> Result<Self> {
        let mut store = ParamStore::new(settings.to_params(), settings.limits())
            .context("settings hold an invalid composition")?;

        let (cols, rows) = crossterm::terminal::size()?;
        let viewport = Rc::new(Cell::new(canvas_viewport(cols, rows)));
        let size = store.params().canvas_size(viewport.get());

        let renderer = Rc::new(RefCell::new(build_renderer(&settings, size)));
        let panel = Rc::new(RefCell::new(Panel::new(store.params(), store.limits())));

        let redraw_on_change = {
            let renderer = Rc::clone(&renderer);
            let panel = Rc::clone(&panel);
            let viewport = Rc::clone(&viewport);
            store.subscribe(Box::new(move |params, field| {
                let resize = field
                    .affects_geometry()
                    .then(|| params.canvas_size(viewport.get()));
                run_cycle(&mut renderer.borrow_mut(), &mut panel.borrow_mut(), params, resize);
            }))
        };

        // initial load
        run_cycle(&mut renderer.borrow_mut(), &mut panel.borrow_mut(), store.params(), None);

        let term = Terminal::begin()?;
        log::info!("started with {cols}x{rows} terminal, canvas {}x{}", size.0, size.1);

        Ok(Self {
            settings,
            paths,
            save_on_exit,
            store,
            redraw_on_change,
            renderer,
            panel,
            viewport,
            term,
            should_quit: false,
        })
    }

    fn run(&mut self) -> Result<()> {
        self.present()?;
        while !self.should_quit {
            match next_event(Duration::from_millis(250))? {
                Some(InputEvent::Action(PanelAction::Quit)) => self.should_quit = true,
                Some(InputEvent::Action(action)) => self.on_action(action),
                Some(InputEvent::Resize(..)) | None => {
                    if !self.term.resize_if_needed()? {
                        continue;
                    }
                    self.relayout();
                }
            }
            self.present()?;
        }
        Ok(())
    }

    fn relayout(&mut self) {
        relayout(
            &self.viewport,
            canvas_viewport(self.term.cols, self.term.rows),
            &mut self.renderer.borrow_mut(),
            &mut self.panel.borrow_mut(),
            self.store.params(),
        );
    }

    fn on_action(&mut self, action: PanelAction) {
        let command = self.panel.borrow_mut().handle(action, self.store.params());
        match command {
            Some(Command::Set(field, value)) => {
                let before = self.store.get(field);
                match self.store.set(field, value) {
                    Ok(()) => log::debug!("{field}: {before:?} -> {value:?}"),
                    Err(e) => {
                        log::warn!("rejected {field}: {e}");
                        self.panel.borrow_mut().set_status(e.to_string());
                    }
                }
            }
            Some(Command::Shuffle) => run_cycle(
                &mut self.renderer.borrow_mut(),
                &mut self.panel.borrow_mut(),
                self.store.params(),
                None,
            ),
            Some(Command::Download) => self.download(),
            None => {}
        }
    }

    fn download(&mut self) {
        let path = self.settings.export_path();
        let outcome = export_to(&self.renderer.borrow(), &path);
        let mut panel = self.panel.borrow_mut();
        match outcome {
            Ok(()) => panel.set_status(format!("saved {}", path.display())),
            Err(e) => {
                log::error!("{e:#}");
                panel.set_status(format!("export failed: {e}"));
            }
        }
    }

    fn present(&mut self) -> Result<()> {
        self.term.cur.clear(CANVAS_BG);
        blit_surface(&mut self.term.cur, self.renderer.borrow().surface(), CANVAS_BG);
        let panel = self.panel.borrow();
        let rows = panel.rows(self.store.params());
        draw_panel(&mut self.term.cur, &rows, panel.status());
        drop(panel);
        self.term.present()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.store.unsubscribe(self.redraw_on_change);
        log::info!("leaving after {} redraws", self.renderer.borrow().cycles());
        if !self.save_on_exit {
            return Ok(());
        }
        self.settings.absorb(self.store.params());
        save_settings_atomic(&self.paths.settings_path, &self.settings)
    }
}

fn export_to(renderer: &Renderer, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    renderer
        .export(path)
        .with_context(|| format!("exporting {}", path.display()))?;
    let (w, h) = renderer.surface().physical_size();
    log::info!("exported {w}x{h} image to {}", path.display());
    Ok(())
}

/// Draws one composition straight to a PNG, no terminal involved.
fn render_headless(settings: &Settings, out: &Path, size: (u32, u32)) -> Result<()> {
    let store = ParamStore::new(settings.to_params(), settings.limits())
        .context("settings hold an invalid composition")?;
    let mut renderer = build_renderer(settings, size);
    let report = renderer.redraw(store.params())?;
    log::info!(
        "headless cycle drew {} cells in {} mode at density {}",
        report.cells,
        report.mode.label(),
        renderer.surface().density()
    );
    export_to(&renderer, out)
}

pub(crate) fn run() -> Result<()> {
    let args = Args::parse();
    let paths = project_paths()?;
    init_logging(LoggingConfig {
        filter: args.log_level.clone(),
        file: Some(args.log_file.clone().unwrap_or_else(|| paths.log_path.clone())),
        allow_stderr: args.render.is_some(),
    });

    let mut settings = load_settings(&paths.settings_path);
    settings.apply_args(&args);

    if let Some(out) = &args.render {
        return render_headless(&settings, out, (args.width, args.height));
    }

    let mut app = App::init(settings, paths, !args.no_save)?;
    let result = app.run();
    let ended = app.term.end();
    let saved = app.shutdown();
    result.and(ended).and(saved)
}
