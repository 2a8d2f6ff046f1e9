//! Drag Race entry point
//!
//! The browser build drives a [`RaceSession`](drag_race::sim::RaceSession) from
//! `requestAnimationFrame`; the native build runs a headless demo race.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_race {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlCanvasElement, HtmlElement, KeyboardEvent, PointerEvent};

    use drag_race::audio::AudioManager;
    use drag_race::consts::{LANE_COUNT, STAGE_HEIGHT, STAGE_WIDTH};
    use drag_race::persistence::{KeyValueStore, LocalStore, MemoryStore};
    use drag_race::renderer::RenderState;
    use drag_race::sim::{Control, EffectKind, FrameSnapshot, RaceSession, RoundPhase, Viewport};
    use drag_race::{RaceTuning, Settings, SettingsToggle, Standings};

    /// Browser host holding the session and its outputs
    struct Race {
        session: RaceSession,
        render_state: Option<RenderState>,
        audio: AudioManager,
        settings: Settings,
        store: Box<dyn KeyValueStore>,
        canvas: HtmlCanvasElement,
        document: Document,
        last_time: f64,
        /// Feed is rebuilt only when it changed
        feed_dirty: bool,
    }

    impl Race {
        fn update(&mut self, dt: f32) {
            self.session.frame(dt);

            let requests = self.session.drain_requests();
            if !requests.is_empty() {
                self.audio.play_requests(&requests);
                self.feed_dirty = true;
            }
            if self.session.take_standings_dirty() {
                self.session.standings().save(self.store.as_mut());
            }
        }

        fn resize_if_needed(&mut self) {
            let Some(window) = web_sys::window() else { return };
            let dpr = window.device_pixel_ratio();
            let width = (self.canvas.client_width() as f64 * dpr) as u32;
            let height = (self.canvas.client_height() as f64 * dpr) as u32;
            if let Some(render_state) = &mut self.render_state {
                if render_state.size != (width, height) {
                    self.canvas.set_width(width);
                    self.canvas.set_height(height);
                    render_state.resize(width, height);
                }
            }
        }

        fn render(&mut self) {
            self.resize_if_needed();
            let snapshot = self.session.snapshot();
            if let Some(render_state) = &mut self.render_state {
                match render_state.render(&snapshot) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        render_state.resize(render_state.size.0, render_state.size.1);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => log::error!("Out of memory!"),
                    Err(e) => log::warn!("Render error: {e:?}"),
                }
            }
            update_hud(&self.document, &snapshot);
            update_pops(&self.document, &snapshot);
            if std::mem::take(&mut self.feed_dirty) {
                update_lists(&self.document, &snapshot);
            }
        }

        fn tap(&mut self, client_x: f32, client_y: f32) {
            self.audio.resume();
            let rect = self.canvas.get_bounding_client_rect();
            let viewport = Viewport::new(
                rect.left() as f32,
                rect.top() as f32,
                rect.width() as f32,
                rect.height() as f32,
            );
            if self.session.tap_client(&viewport, client_x, client_y).is_none() {
                log::debug!("Tap at ({client_x}, {client_y}) ignored");
            }
        }

        fn control(&mut self, control: Control) {
            self.audio.resume();
            if self.session.control(control) {
                log::info!("{control:?} -> {}", self.session.phase().as_str());
                self.feed_dirty = true;
            }
        }

        /// Operator settings keys: persist and apply without a reload
        fn change_settings(&mut self, toggle: SettingsToggle) {
            let change = self.settings.toggle(toggle);
            log::info!("Settings: {change}");
            self.settings.save(self.store.as_mut());
            self.session.apply_settings(&self.settings);
            self.audio.apply_settings(&self.settings);
        }
    }

    fn set_text(document: &Document, id: &str, text: &str) {
        if let Some(el) = document.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_class(document: &Document, id: &str, class: &str) {
        if let Some(el) = document.get_element_by_id(id) {
            if let Err(e) = el.set_attribute("class", class) {
                log::debug!("Could not set class on #{id}: {e:?}");
            }
        }
    }

    /// Round, clock, bank, phase banner
    fn update_hud(document: &Document, snapshot: &FrameSnapshot<'_>) {
        let hud = &snapshot.hud;
        set_text(document, "hud-round", &hud.round);
        set_text(document, "hud-time", &hud.time);
        set_text(document, "hud-bank", &hud.bank);
        set_text(document, "hud-wins", &hud.wins_total.to_string());
        set_text(
            document,
            "start-btn",
            if hud.phase == RoundPhase::Running {
                "Pause"
            } else {
                "Start"
            },
        );

        let banner = match (hud.phase, hud.winner) {
            (RoundPhase::Finished, Some(lane)) => Some(format!("Lane {} wins!", lane + 1)),
            (RoundPhase::TimeUp, _) => Some("Time's up!".to_string()),
            (RoundPhase::Paused, _) => Some("Paused".to_string()),
            (RoundPhase::Idle, _) => Some("Tap a lane to donate".to_string()),
            _ => None,
        };
        match banner {
            Some(text) => {
                set_text(document, "banner", &text);
                set_class(document, "banner", "");
            }
            None => set_class(document, "banner", "hidden"),
        }
    }

    fn set_style(style: &web_sys::CssStyleDeclaration, property: &str, value: &str) {
        if let Err(e) = style.set_property(property, value) {
            log::debug!("Could not set {property}: {e:?}");
        }
    }

    /// Pop-text lives in one DOM node per lane, mirroring the per-lane slot
    fn update_pops(document: &Document, snapshot: &FrameSnapshot<'_>) {
        for lane in 0..LANE_COUNT {
            let Some(el) = document
                .get_element_by_id(&format!("pop-{lane}"))
                .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            else {
                continue;
            };
            let pop = snapshot
                .effects
                .iter()
                .find(|e| e.kind == EffectKind::PopText && e.lane == lane);
            let style = el.style();
            match pop {
                Some(view) => {
                    el.set_text_content(view.text);
                    let left = (view.pos.x + snapshot.shake.x) / STAGE_WIDTH * 100.0;
                    let top = (view.pos.y + snapshot.shake.y) / STAGE_HEIGHT * 100.0;
                    set_style(&style, "left", &format!("{left:.2}%"));
                    set_style(&style, "top", &format!("{top:.2}%"));
                    set_style(&style, "opacity", &format!("{:.3}", view.opacity));
                    set_style(
                        &style,
                        "transform",
                        &format!("translate(-50%, -50%) scale({:.3})", view.scale),
                    );
                }
                None => set_style(&style, "opacity", "0"),
            }
        }
    }

    /// Donation feed and donor leaderboard
    fn update_lists(document: &Document, snapshot: &FrameSnapshot<'_>) {
        if let Some(feed) = document.get_element_by_id("feed") {
            feed.set_inner_html("");
            for entry in snapshot.feed {
                if let Ok(li) = document.create_element("li") {
                    li.set_text_content(Some(&format!(
                        "{}  {}  {}",
                        entry.headline(),
                        entry.message,
                        entry.amount_label()
                    )));
                    if let Err(e) = feed.append_child(&li) {
                        log::debug!("Could not append feed entry: {e:?}");
                    }
                }
            }
        }
        if let Some(donors) = document.get_element_by_id("donors") {
            donors.set_inner_html("");
            for (name, total) in &snapshot.top_donors {
                if let Ok(li) = document.create_element("li") {
                    li.set_text_content(Some(&format!("{name}  {total}")));
                    if let Err(e) = donors.append_child(&li) {
                        log::debug!("Could not append donor row: {e:?}");
                    }
                }
            }
        }
    }

    fn on_click(
        document: &Document,
        id: &str,
        race: Rc<RefCell<Race>>,
        control: Control,
    ) {
        if let Some(btn) = document.get_element_by_id(id) {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                race.borrow_mut().control(control);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_controls(document: &Document, race: Rc<RefCell<Race>>) {
        on_click(document, "start-btn", race.clone(), Control::StartPause);
        on_click(document, "reset-btn", race.clone(), Control::RestartRound);
        on_click(document, "next-btn", race.clone(), Control::NextRound);

        // Test donations: <button class="test-btn" data-lane="0" data-preset="2">
        if let Ok(buttons) = document.query_selector_all(".test-btn") {
            for i in 0..buttons.length() {
                let Some(btn) = buttons
                    .get(i)
                    .and_then(|node| node.dyn_into::<web_sys::Element>().ok())
                else {
                    continue;
                };
                let parse = |name: &str| {
                    btn.get_attribute(name)
                        .and_then(|v| v.parse::<usize>().ok())
                };
                let (Some(lane), Some(preset)) = (parse("data-lane"), parse("data-preset")) else {
                    log::warn!("Test button without lane/preset");
                    continue;
                };
                let race = race.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                    let mut r = race.borrow_mut();
                    r.audio.resume();
                    r.session.test_donation(lane, preset);
                });
                let _ =
                    btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
                closure.forget();
            }
        }
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, race: Rc<RefCell<Race>>) {
        {
            let race = race.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                event.prevent_default();
                race.borrow_mut()
                    .tap(event.client_x() as f32, event.client_y() as f32);
            });
            let _ = canvas
                .add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard: space start/pause, R restart, N next round, 1-6 test donation,
        // Q quality, T trails, P particles, M mute, V reduced motion
        if let Some(window) = web_sys::window() {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut r = race.borrow_mut();
                match event.key().as_str() {
                    " " => r.control(Control::StartPause),
                    "r" | "R" => r.control(Control::RestartRound),
                    "n" | "N" => r.control(Control::NextRound),
                    "q" | "Q" => r.change_settings(SettingsToggle::CycleQuality),
                    "t" | "T" => r.change_settings(SettingsToggle::Trails),
                    "p" | "P" => r.change_settings(SettingsToggle::Particles),
                    "m" | "M" => r.change_settings(SettingsToggle::Mute),
                    "v" | "V" => r.change_settings(SettingsToggle::ReducedMotion),
                    key => {
                        if let Some(lane) = key
                            .parse::<usize>()
                            .ok()
                            .filter(|n| (1..=LANE_COUNT).contains(n))
                        {
                            r.audio.resume();
                            let preset = if event.shift_key() { 2 } else { 0 };
                            r.session.test_donation(lane - 1, preset);
                        }
                    }
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(race: Rc<RefCell<Race>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            race_loop(race, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn race_loop(race: Rc<RefCell<Race>>, time: f64) {
        {
            let mut r = race.borrow_mut();
            let dt = if r.last_time > 0.0 {
                ((time - r.last_time) / 1000.0) as f32
            } else {
                0.0
            };
            r.last_time = time;

            r.update(dt);
            r.render();
        }

        request_animation_frame(race);
    }

    fn open_store() -> Box<dyn KeyValueStore> {
        match LocalStore::open() {
            Ok(store) => Box::new(store),
            Err(e) => {
                log::warn!("{e}; standings will not survive a reload");
                Box::new(MemoryStore::new())
            }
        }
    }

    async fn create_renderer(canvas: &HtmlCanvasElement) -> Result<RenderState, JsValue> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| JsValue::from_str(&format!("Failed to create surface: {e}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| JsValue::from_str(&format!("Failed to get adapter: {e}")))?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        RenderState::new(surface, &adapter, canvas.width(), canvas.height())
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub async fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Logger already set: {e}").into());
        }

        log::info!("Drag Race starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()?;

        let dpr = window.device_pixel_ratio();
        canvas.set_width((canvas.client_width() as f64 * dpr) as u32);
        canvas.set_height((canvas.client_height() as f64 * dpr) as u32);

        let store = open_store();
        let settings = Settings::load(store.as_ref());
        let tuning = RaceTuning::load(store.as_ref());
        let standings = Standings::load(store.as_ref());

        let seed = js_sys::Date::now() as u64;
        let session = RaceSession::new(seed, tuning, &settings).with_standings(&standings);

        let render_state = match create_renderer(&canvas).await {
            Ok(render_state) => Some(render_state),
            Err(e) => {
                log::error!("Rendering disabled: {e:?}");
                None
            }
        };

        let race = Rc::new(RefCell::new(Race {
            session,
            render_state,
            audio: AudioManager::new(&settings),
            settings,
            store,
            canvas: canvas.clone(),
            document: document.clone(),
            last_time: 0.0,
            feed_dirty: true,
        }));

        setup_input_handlers(&canvas, race.clone());
        setup_controls(&document, race.clone());

        set_class(&document, "loading", "hidden");
        request_animation_frame(race);

        log::info!("Drag Race running (seed {seed})");
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() -> Result<(), JsValue> {
    wasm_race::run().await
}

/// Headless demo: a few rounds of random taps, logged to stderr
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use drag_race::RaceTuning;
    use drag_race::Settings;
    use drag_race::consts::LANE_COUNT;
    use drag_race::sim::{EffectRequest, ROAD, RaceSession, RoundPhase};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    const FRAME_DT: f32 = 1.0 / 60.0;
    /// Seconds between simulated taps
    const TAP_INTERVAL: f32 = 0.2;
    const ROUNDS: u32 = 3;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // drag-race [seed] [tuning.json]
    let mut args = std::env::args().skip(1);
    let seed = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0xd7a6);
    let tuning = match args.next().map(std::fs::read_to_string) {
        Some(Ok(json)) => RaceTuning::from_json(&json),
        Some(Err(e)) => {
            log::warn!("Could not read tuning file: {e}");
            RaceTuning::default()
        }
        None => RaceTuning::default(),
    };
    let mut session = RaceSession::new(seed, tuning, &Settings::default());
    let mut rng = Pcg32::seed_from_u64(seed);

    log::info!("Headless demo: {ROUNDS} rounds, seed {seed}");

    let mut tap_timer = 0.0;
    let mut rounds_done = 0;
    // Hard stop in case a round never resolves
    let max_frames = (ROUNDS as f32 * (session.state.tuning.round_seconds + 10.0) / FRAME_DT) as u32;

    for _ in 0..max_frames {
        tap_timer += FRAME_DT;
        if session.phase() != RoundPhase::Finished && tap_timer >= TAP_INTERVAL {
            tap_timer = 0.0;
            let lane = rng.random_range(0..LANE_COUNT);
            let t = rng.random_range(0.05..0.95);
            session.tap(ROAD.project(lane, t).pos);
        }

        session.frame(FRAME_DT);
        for request in session.drain_requests() {
            match request {
                EffectRequest::Finish { lane } => {
                    let lanes = &session.state.lanes;
                    log::info!(
                        "Round {} won by lane {} (bank {}, wins {:?})",
                        session.state.round_number,
                        lane + 1,
                        session.state.bank,
                        lanes.iter().map(|l| l.wins).collect::<Vec<_>>()
                    );
                    rounds_done += 1;
                }
                EffectRequest::TimeUp => {
                    log::info!("Round {} timed out", session.state.round_number);
                    rounds_done += 1;
                    session.control(drag_race::sim::Control::NextRound);
                }
                _ => {}
            }
        }
        if rounds_done >= ROUNDS && session.pending_resets() == 0 {
            break;
        }
    }

    match serde_json::to_string_pretty(&session.standings()) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("Could not encode standings: {e}"),
    }
}
