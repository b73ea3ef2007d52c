use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Order, Scanner, WalkScanner};
use crate::constants::*;
use crate::error::CatalogError;
use crate::geometry::Vec2;
use crate::slide::{Extent, Layout, Slide};
use crate::surface::{Decoder, Events, Rgb, Signal, Surface};
use crate::timing::{TickPacer, TransitionTimer};

#[derive(Debug, Clone)]
pub struct ShowSettings {
    pub interval: Duration,
    pub tick_rate: u32,
    pub max_speed: f32,
    pub layout: Layout,
    pub order: Order,
    pub background: Rgb,
    pub max_decode_attempts: u32,
    pub run_time: Option<Duration>,
}

impl Default for ShowSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs_f32(DISPLAY_DURATION),
            tick_rate: TICK_RATE,
            max_speed: MAX_SPEED,
            layout: Layout::default(),
            order: Order::Random,
            background: Rgb::new(0x18, 0x18, 0x18),
            max_decode_attempts: MAX_DECODE_ATTEMPTS,
            run_time: None,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Flow {
    Continue,
    Quit,
}

/// The two compositing layers. The background mirrors the foreground's
/// image at rest; only the foreground drifts.
pub struct Layers<I> {
    pub foreground: Slide<I>,
    pub background: Slide<I>,
}

/// Owns the catalog and both layers and drives them frame by frame.
pub struct Slideshow<I, S = WalkScanner> {
    catalog: Catalog<S>,
    settings: ShowSettings,
    layers: Option<Layers<I>>,

    timer: TransitionTimer,
    pacer: TickPacer,
    started: Instant,

    transitions: u64,
    frames: u64,
}

impl<I: Extent + Clone, S: Scanner> Slideshow<I, S> {
    /// Set up timers and load the first image. An empty catalog is not an
    /// error: the stage stays blank until images show up.
    pub fn init<D>(catalog: Catalog<S>, settings: ShowSettings, decoder: &mut D, now: Instant) -> Self
    where
        D: Decoder<Image = I>,
    {
        let mut show = Self {
            timer: TransitionTimer::new(settings.interval, now),
            pacer: TickPacer::new(settings.tick_rate, MAX_TICKS_PER_FRAME, now),
            catalog,
            settings,
            layers: None,
            started: now,
            transitions: 0,
            frames: 0,
        };
        if !show.transition(decoder) {
            warn!(root = %show.catalog.root().display(), "nothing to show yet, waiting for images");
        }
        show
    }

    /// Render until a quit signal (or the run-time limit). Frame pacing is
    /// the surface's job: `present` blocks until the next frame slot.
    pub fn run<B>(&mut self, backend: &mut B)
    where
        B: Surface<Image = I> + Decoder<Image = I> + Events,
    {
        info!(count = self.catalog.count(), interval = ?self.settings.interval, "slideshow running");
        while self.step(backend, Instant::now()) == Flow::Continue {}
    }

    /// One frame: input, drift, transition, composite.
    ///
    /// Drift runs before the transition so the ticks owed to the previous
    /// image do not move the new one: a fresh image is drawn at its reset
    /// coordinate on the frame it appears.
    pub fn step<B>(&mut self, backend: &mut B, now: Instant) -> Flow
    where
        B: Surface<Image = I> + Decoder<Image = I> + Events,
    {
        // --- Input ---
        let mut skip = false;
        while let Some(signal) = backend.poll() {
            match signal {
                Signal::Quit => return Flow::Quit,
                Signal::Next => skip = true,
                Signal::Refresh => self.refresh(),
            }
        }

        if let Some(limit) = self.settings.run_time {
            if now.saturating_duration_since(self.started) >= limit {
                info!(?limit, "run time reached");
                return Flow::Quit;
            }
        }

        // --- Drift ---
        let ticks = self.pacer.ticks(now);
        if let Some(layers) = &mut self.layers {
            for _ in 0..ticks {
                layers.foreground.advance();
            }
        }

        // --- Transition ---
        if skip {
            self.timer.restart(now);
            self.transition(backend);
        } else if self.timer.poll(now) {
            if self.catalog.is_empty() {
                self.refresh();
            }
            self.transition(backend);
        }

        // --- Composite ---
        self.composite(backend);
        self.frames += 1;
        Flow::Continue
    }

    /// Log a summary and hand the catalog back.
    pub fn shutdown(self) -> Catalog<S> {
        let seconds = self.started.elapsed().as_secs_f32();
        info!(
            transitions = self.transitions,
            frames = self.frames,
            seconds,
            "slideshow stopped"
        );
        self.catalog
    }

    pub fn layers(&self) -> Option<&Layers<I>> {
        self.layers.as_ref()
    }

    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    fn composite<F: Surface<Image = I>>(&self, surface: &mut F) {
        surface.fill_background(self.settings.background);
        if let Some(layers) = &self.layers {
            surface.blit(layers.background.image(), layers.background.placement());
            surface.blit(layers.foreground.image(), layers.foreground.placement());
        }
        surface.present();
    }

    /// Pick and decode a new image, skipping files that fail to decode.
    /// Returns whether an image was swapped in.
    fn transition<D: Decoder<Image = I>>(&mut self, decoder: &mut D) -> bool {
        for attempt in 1..=self.settings.max_decode_attempts {
            let path = match self.catalog.pick(self.settings.order) {
                Ok(path) => path.to_path_buf(),
                Err(CatalogError::Empty) => {
                    debug!("no images available");
                    return false;
                }
                Err(e) => {
                    warn!(error = %e, "cannot pick an image");
                    return false;
                }
            };

            match decoder.decode(&path) {
                Ok(image) => {
                    debug!(path = %path.display(), "next image");
                    self.show(image);
                    self.transitions += 1;
                    return true;
                }
                Err(e) => warn!(attempt, error = %e, "skipping image"),
            }
        }
        warn!(attempts = self.settings.max_decode_attempts, "no decodable image found, keeping the current one");
        false
    }

    fn show(&mut self, image: I) {
        let velocity = random_velocity(self.settings.max_speed, &mut rand::rng());
        match &mut self.layers {
            Some(layers) => {
                layers.foreground.set_image(image.clone());
                layers.background.set_image(image);
                layers.foreground.set_position(0.0, 0.0);
                layers.foreground.set_speed(velocity.x, velocity.y);
                layers.background.set_position(0.0, 0.0);
            }
            None => {
                let layout = self.settings.layout;
                self.layers = Some(Layers {
                    foreground: Slide::new(image.clone(), velocity).with_layout(layout),
                    background: Slide::new(image, Vec2::ZERO).with_layout(layout),
                });
            }
        }
    }

    fn refresh(&mut self) {
        if let Err(e) = self.catalog.refresh() {
            warn!(error = %e, "catalog refresh failed, keeping the previous list");
        }
    }
}

/// Uniform speed per axis in `[-max_speed, max_speed]`, with `max_speed`
/// capped at [`SPEED_LIMIT`].
pub fn random_velocity<R: Rng + ?Sized>(max_speed: f32, rng: &mut R) -> Vec2 {
    let max_speed = max_speed.min(SPEED_LIMIT);
    if max_speed.is_nan() || max_speed <= 0.0 {
        return Vec2::ZERO;
    }
    Vec2::new(
        rng.random_range(-max_speed..=max_speed),
        rng.random_range(-max_speed..=max_speed),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{HashSet, VecDeque};
    use std::io;
    use std::path::{Path, PathBuf};

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::catalog::CatalogOptions;
    use crate::error::DecodeError;
    use crate::geometry::{Placement, Size};
    use crate::state::SlideState;

    #[derive(Debug, Clone, PartialEq)]
    struct Pic {
        path: PathBuf,
        size: Size,
    }

    impl Extent for Pic {
        fn size(&self) -> Size {
            self.size
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Fill(Rgb),
        Blit(PathBuf, Placement),
        Present,
    }

    #[derive(Default)]
    struct FakeBackend {
        broken: HashSet<PathBuf>,
        decoded: Vec<PathBuf>,
        signals: VecDeque<Signal>,
        ops: Vec<Op>,
    }

    impl FakeBackend {
        fn frames(&self) -> Vec<&[Op]> {
            self.ops.split_inclusive(|op| *op == Op::Present).collect()
        }

        fn last_frame(&self) -> Vec<Op> {
            self.frames().last().map(|f| f.to_vec()).unwrap_or_default()
        }
    }

    impl Surface for FakeBackend {
        type Image = Pic;

        fn fill_background(&mut self, color: Rgb) {
            self.ops.push(Op::Fill(color));
        }

        fn blit(&mut self, image: &Pic, placement: Placement) {
            self.ops.push(Op::Blit(image.path.clone(), placement));
        }

        fn present(&mut self) {
            self.ops.push(Op::Present);
        }
    }

    impl Decoder for FakeBackend {
        type Image = Pic;

        fn decode(&mut self, path: &Path) -> Result<Pic, DecodeError> {
            self.decoded.push(path.to_path_buf());
            if self.broken.contains(path) {
                return Err(DecodeError::Malformed {
                    path: path.to_path_buf(),
                    reason: "truncated".to_string(),
                });
            }
            Ok(Pic {
                path: path.to_path_buf(),
                size: Size::new(320.0, 240.0),
            })
        }
    }

    impl Events for FakeBackend {
        fn poll(&mut self) -> Option<Signal> {
            self.signals.pop_front()
        }
    }

    struct FixedScanner(Vec<PathBuf>);

    impl Scanner for FixedScanner {
        fn scan(&self, _root: &Path, _options: &CatalogOptions) -> Result<Vec<PathBuf>, CatalogError> {
            Ok(self.0.clone())
        }
    }

    fn catalog(paths: &[&str]) -> Catalog<FixedScanner> {
        let scanner = FixedScanner(paths.iter().map(PathBuf::from).collect());
        Catalog::build_with(scanner, "/pics", CatalogOptions::default()).unwrap()
    }

    fn settings() -> ShowSettings {
        ShowSettings {
            interval: Duration::from_secs(2),
            tick_rate: 100,
            order: Order::Sequential,
            ..ShowSettings::default()
        }
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn init_shows_the_first_image_on_both_layers() {
        let mut backend = FakeBackend::default();
        let show = Slideshow::init(catalog(&["a.jpg", "b.jpg"]), settings(), &mut backend, Instant::now());

        let layers = show.layers().unwrap();
        assert_eq!(layers.foreground.image().path, PathBuf::from("a.jpg"));
        assert_eq!(layers.background.image().path, PathBuf::from("a.jpg"));
        assert_eq!(layers.background.state(), SlideState::AtRest);
        assert_eq!(show.transitions(), 1);
    }

    #[test]
    fn frame_composites_background_then_foreground() {
        let start = Instant::now();
        let mut backend = FakeBackend::default();
        let mut show = Slideshow::init(catalog(&["a.jpg"]), settings(), &mut backend, start);

        assert_eq!(show.step(&mut backend, start + ms(16)), Flow::Continue);

        let frame = backend.last_frame();
        assert_eq!(frame.len(), 4);
        assert_eq!(frame[0], Op::Fill(Rgb::new(0x18, 0x18, 0x18)));
        assert!(matches!(&frame[1], Op::Blit(path, _) if path == Path::new("a.jpg")));
        assert!(matches!(&frame[2], Op::Blit(path, _) if path == Path::new("a.jpg")));
        assert_eq!(frame[3], Op::Present);
    }

    #[test]
    fn only_the_foreground_drifts() {
        let start = Instant::now();
        let mut backend = FakeBackend::default();
        let mut show = Slideshow::init(catalog(&["a.jpg"]), settings(), &mut backend, start);
        show.layers.as_mut().unwrap().foreground.set_speed(1.0, 0.5);

        // 100 ticks per second: 150ms is 15 ticks.
        show.step(&mut backend, start + ms(150));

        let layers = show.layers().unwrap();
        assert_eq!(layers.foreground.internal_position(), Vec2::new(15.0, 7.5));
        assert_eq!(layers.foreground.position(), Vec2::new(14.0, 7.0));
        assert_eq!(layers.background.position(), Vec2::ZERO);
    }

    #[test]
    fn one_transition_per_interval() {
        let start = Instant::now();
        let mut backend = FakeBackend::default();
        let mut show = Slideshow::init(catalog(&["a.jpg", "b.jpg", "c.jpg"]), settings(), &mut backend, start);

        for t in (0..=2100).step_by(100) {
            show.step(&mut backend, start + ms(t));
        }
        assert_eq!(show.transitions(), 2);
        assert_eq!(backend.decoded, vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")]);
    }

    #[test]
    fn transition_resets_the_foreground_and_rests_the_background() {
        let start = Instant::now();
        let mut backend = FakeBackend::default();
        let mut show = Slideshow::init(catalog(&["a.jpg", "b.jpg"]), settings(), &mut backend, start);
        show.layers.as_mut().unwrap().foreground.set_speed(2.0, 2.0);
        show.step(&mut backend, start + ms(1000));
        assert_ne!(show.layers().unwrap().foreground.position(), Vec2::ZERO);

        show.step(&mut backend, start + ms(2000));

        let layers = show.layers().unwrap();
        assert_eq!(layers.foreground.image().path, PathBuf::from("b.jpg"));
        assert_eq!(layers.background.image().path, PathBuf::from("b.jpg"));
        assert_eq!(layers.background.velocity(), Vec2::ZERO);
        assert_eq!(layers.background.position(), Vec2::ZERO);
        // Drawn at the reset coordinate on the transition frame.
        assert_eq!(layers.foreground.position(), Vec2::ZERO);
        let speed = layers.foreground.velocity();
        assert!(speed.x.abs() <= MAX_SPEED && speed.y.abs() <= MAX_SPEED);
    }

    #[test]
    fn undecodable_images_are_skipped() {
        let mut backend = FakeBackend {
            broken: [PathBuf::from("bad.jpg"), PathBuf::from("worse.jpg")].into(),
            ..FakeBackend::default()
        };
        let show = Slideshow::init(
            catalog(&["bad.jpg", "worse.jpg", "good.jpg"]),
            settings(),
            &mut backend,
            Instant::now(),
        );

        assert_eq!(backend.decoded.len(), 3);
        assert_eq!(show.layers().unwrap().foreground.image().path, PathBuf::from("good.jpg"));
    }

    #[test]
    fn gives_up_after_max_attempts_and_keeps_the_current_image() {
        let start = Instant::now();
        let mut backend = FakeBackend::default();
        let settings = ShowSettings {
            max_decode_attempts: 2,
            ..settings()
        };
        let mut show = Slideshow::init(catalog(&["a.jpg", "b.jpg", "c.jpg"]), settings, &mut backend, start);
        backend.broken = [PathBuf::from("b.jpg"), PathBuf::from("c.jpg")].into();

        show.step(&mut backend, start + ms(2000));

        assert_eq!(backend.decoded.len(), 3);
        assert_eq!(show.layers().unwrap().foreground.image().path, PathBuf::from("a.jpg"));
        assert_eq!(show.transitions(), 1);
    }

    #[test]
    fn empty_catalog_renders_a_blank_stage() {
        let start = Instant::now();
        let mut backend = FakeBackend::default();
        let mut show = Slideshow::init(catalog(&[]), settings(), &mut backend, start);
        assert!(show.layers().is_none());

        for t in [16, 2000, 4000] {
            assert_eq!(show.step(&mut backend, start + ms(t)), Flow::Continue);
            assert_eq!(
                backend.last_frame(),
                vec![Op::Fill(Rgb::new(0x18, 0x18, 0x18)), Op::Present]
            );
        }
        assert!(backend.decoded.is_empty());
    }

    #[test]
    fn empty_catalog_recovers_after_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut backend = FakeBackend::default();
        let catalog = Catalog::build(dir.path(), CatalogOptions::default()).unwrap();
        let mut show = Slideshow::init(catalog, settings(), &mut backend, start);
        assert!(show.layers().is_none());

        std::fs::write(dir.path().join("late.png"), b"img").unwrap();
        show.step(&mut backend, start + ms(2000));

        assert!(show.layers().unwrap().foreground.image().path.ends_with("late.png"));
    }

    #[test]
    fn quit_signal_stops_the_loop() {
        let start = Instant::now();
        let mut backend = FakeBackend::default();
        let mut show = Slideshow::init(catalog(&["a.jpg"]), settings(), &mut backend, start);

        backend.signals.push_back(Signal::Quit);
        assert_eq!(show.step(&mut backend, start + ms(16)), Flow::Quit);
        assert!(backend.ops.is_empty());
    }

    #[test]
    fn next_signal_swaps_now_and_restarts_the_interval() {
        let start = Instant::now();
        let mut backend = FakeBackend::default();
        let mut show = Slideshow::init(catalog(&["a.jpg", "b.jpg", "c.jpg"]), settings(), &mut backend, start);

        backend.signals.push_back(Signal::Next);
        show.step(&mut backend, start + ms(1500));
        assert_eq!(show.layers().unwrap().foreground.image().path, PathBuf::from("b.jpg"));

        // Interval restarted at 1.5s: nothing at 2.0s, next swap at 3.5s.
        show.step(&mut backend, start + ms(2000));
        assert_eq!(show.transitions(), 2);
        show.step(&mut backend, start + ms(3500));
        assert_eq!(show.layers().unwrap().foreground.image().path, PathBuf::from("c.jpg"));
    }

    #[test]
    fn refresh_signal_rescans_the_catalog() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"img").unwrap();
        let start = Instant::now();
        let mut backend = FakeBackend::default();
        let catalog = Catalog::build(dir.path(), CatalogOptions::default()).unwrap();
        let mut show = Slideshow::init(catalog, settings(), &mut backend, start);

        std::fs::write(dir.path().join("b.jpg"), b"img").unwrap();
        backend.signals.push_back(Signal::Refresh);
        show.step(&mut backend, start + ms(16));

        assert_eq!(show.catalog().count(), 2);
    }

    #[test]
    fn run_time_limit_ends_the_show() {
        let start = Instant::now();
        let mut backend = FakeBackend::default();
        let settings = ShowSettings {
            run_time: Some(Duration::from_secs(5)),
            ..settings()
        };
        let mut show = Slideshow::init(catalog(&["a.jpg"]), settings, &mut backend, start);

        assert_eq!(show.step(&mut backend, start + ms(4999)), Flow::Continue);
        assert_eq!(show.step(&mut backend, start + ms(5000)), Flow::Quit);
        assert_eq!(show.shutdown().count(), 1);
    }

    #[test]
    fn random_velocity_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let v = random_velocity(0.25, &mut rng);
            assert!((-0.25..=0.25).contains(&v.x));
            assert!((-0.25..=0.25).contains(&v.y));
        }
        assert_eq!(random_velocity(0.0, &mut rng), Vec2::ZERO);
    }

    #[test]
    fn random_velocity_survives_extreme_limits() {
        let mut rng = StdRng::seed_from_u64(5);
        let v = random_velocity(3.0e38, &mut rng);
        assert!(v.x.abs() <= SPEED_LIMIT && v.y.abs() <= SPEED_LIMIT);
        assert!(random_velocity(f32::INFINITY, &mut rng).x.abs() <= SPEED_LIMIT);
        assert_eq!(random_velocity(f32::NAN, &mut rng), Vec2::ZERO);
    }

    #[test]
    fn every_step_presents_exactly_once() {
        let start = Instant::now();
        let mut backend = FakeBackend::default();
        let mut show = Slideshow::init(catalog(&["a.jpg", "b.jpg"]), settings(), &mut backend, start);
        backend.signals.extend([Signal::Next, Signal::Refresh]);

        for frame in 1..=10u64 {
            show.step(&mut backend, start + ms(frame * 300));
        }

        let presents = backend.ops.iter().filter(|op| **op == Op::Present).count();
        assert_eq!(presents, 10);
    }

    #[test]
    fn decode_errors_are_reported_not_fatal() {
        let err = DecodeError::Read {
            path: PathBuf::from("gone.jpg"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("gone.jpg"));
    }
}
