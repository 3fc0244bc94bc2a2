//! Engine process wiring: single-instance gate, window and desktop
//! embedding, content source, control plane, and the event loop gluing
//! them together.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default telemetry push port when the shared config does not name one.
const DEFAULT_WS_PORT: u16 = 60601;

/// Foreground poll cadence.
#[cfg(windows)]
const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(2);

/// Initialize logging.
fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "livewall_engine=debug,livewall_config=debug,livewall_content=debug,livewall_control=debug,livewall_desktop=debug,livewall_supervisor=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(windows)]
pub fn run() {
    use std::sync::Arc;

    use livewall_config::{ConfigStore, EnginePaths};
    use livewall_content::{
        browser_args, device_id, ContentSource, HtmlSurface, VideoPlayer, BROWSER_ARGS_ENV,
    };
    use livewall_control::telemetry::{spawn_collector, spawn_push_server, TelemetryState};
    use livewall_control::{ControlContext, ControlServer};
    use livewall_desktop::{classify, EmbedController};
    use livewall_ipc::{command_channel, EngineCommand, EngineSession, RenderMode, SessionFlags};
    use livewall_supervisor::{
        exit_or_restart, SingleInstance, SupervisorError, INSTANCE_MUTEX_NAME,
    };
    use tao::event::{Event, WindowEvent};
    use tao::event_loop::{ControlFlow, EventLoopBuilder};
    use tao::platform::windows::WindowExtWindows;
    use tao::window::WindowBuilder;
    use tracing::{error, warn};

    init_logging();
    info!("livewall engine starting");

    let instance = match SingleInstance::acquire(INSTANCE_MUTEX_NAME) {
        Ok(guard) => guard,
        Err(SupervisorError::AlreadyRunning) => {
            warn!("another engine instance owns the desktop, exiting");
            SingleInstance::show_already_running_notice();
            return;
        }
        Err(err) => {
            error!(%err, "single-instance check failed");
            std::process::exit(1);
        }
    };

    livewall_desktop::win::set_dpi_awareness();
    let scale = livewall_desktop::win::display_scale();
    std::env::set_var(BROWSER_ARGS_ENV, browser_args(scale));

    let paths = match EnginePaths::from_exe() {
        Ok(p) => p,
        Err(err) => {
            error!(%err, "cannot locate engine root");
            std::process::exit(1);
        }
    };
    let store = ConfigStore::new(paths.app_config());
    let resolved = livewall_config::resolve(&store, &paths);
    info!(
        theme = %resolved.theme_id,
        mode = resolved.mode.name(),
        widget = resolved.widget_enabled,
        "theme resolved"
    );

    let mut session = EngineSession::new(resolved.mode);
    let flags = SessionFlags::shared();
    let (command_tx, command_rx) = command_channel();

    let configured_port = store.load().port;
    let ctx = Arc::new(ControlContext {
        auth_token: session.auth_token.clone(),
        paths: paths.clone(),
        store: ConfigStore::new(paths.app_config()),
        commands: command_tx.clone(),
        flags: Arc::clone(&flags),
    });
    let mut server = match ControlServer::bind(configured_port, ctx) {
        Ok(s) => s,
        Err(err) => {
            error!(%err, "control server bind failed");
            std::process::exit(1);
        }
    };
    session.http_port = server.bound_port();

    let mut push_handle = None;
    if resolved.widget_enabled {
        let telemetry = Arc::new(TelemetryState::default());
        let requested = store.load().ws_port.unwrap_or(DEFAULT_WS_PORT);
        match spawn_push_server(requested, session.auth_token.clone(), Arc::clone(&telemetry)) {
            Ok(handle) => {
                session.ws_port = Some(handle.port());
                if let Err(err) = spawn_collector(telemetry, std::process::id()) {
                    warn!(%err, "telemetry collector failed to start");
                }
                push_handle = Some(handle);
            }
            Err(err) => warn!(%err, "telemetry push server failed to start"),
        }
    }

    // Publish the real ports so the launcher can find us.
    let (http_port, ws_port) = (session.http_port, session.ws_port);
    if let Err(err) = store.update(|cfg| {
        cfg.port = http_port;
        cfg.ws_port = ws_port;
    }) {
        warn!(%err, "failed to publish ports to shared config");
    }

    let event_loop = EventLoopBuilder::<EngineCommand>::with_user_event().build();

    // Marshal control-plane commands onto the UI thread.
    let proxy = event_loop.create_proxy();
    let forward = std::thread::Builder::new()
        .name("command-forward".into())
        .spawn(move || {
            for command in command_rx.iter() {
                if proxy.send_event(command).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = forward {
        error!(%err, "failed to start command forwarder");
        std::process::exit(1);
    }

    let ticker_tx = command_tx;
    let ticker = std::thread::Builder::new()
        .name("poll-tick".into())
        .spawn(move || loop {
            std::thread::sleep(POLL_INTERVAL);
            if ticker_tx.send(EngineCommand::PollTick).is_err() {
                break;
            }
        });
    if let Err(err) = ticker {
        warn!(%err, "failed to start poll ticker");
    }

    let desktop = livewall_desktop::win::desktop_rect();
    let window = match WindowBuilder::new()
        .with_title("livewall")
        .with_decorations(false)
        .with_position(tao::dpi::PhysicalPosition::new(desktop.left, desktop.top))
        .with_inner_size(tao::dpi::PhysicalSize::new(
            desktop.width() as u32,
            desktop.height() as u32,
        ))
        .build(&event_loop)
    {
        Ok(w) => w,
        Err(err) => {
            error!(%err, "failed to create wallpaper window");
            std::process::exit(1);
        }
    };
    let surface_handle = window.hwnd() as isize;

    match livewall_desktop::win::attach(surface_handle, desktop) {
        Ok(mode) => info!(?mode, "desktop embedding established"),
        Err(err) => warn!(%err, "desktop embedding failed, staying at bottom of z-order"),
    }

    let root_url = format!("http://127.0.0.1:{}/", session.http_port);
    let device = device_id();
    let mut content: Option<ContentSource> = match resolved.mode {
        RenderMode::Html | RenderMode::Scene => {
            match HtmlSurface::attach(&window, &root_url, &session.auth_token, &device) {
                Ok(surface) if resolved.mode == RenderMode::Html => {
                    Some(ContentSource::Html(surface))
                }
                Ok(surface) => Some(ContentSource::Scene(surface)),
                Err(err) => {
                    error!(%err, "web surface failed, showing blank wallpaper");
                    None
                }
            }
        }
        RenderMode::Video => match resolved.media_file.as_deref() {
            Some(media) => match VideoPlayer::spawn(media, surface_handle, &resolved.video) {
                Ok(player) => Some(ContentSource::Video(player)),
                Err(err) => {
                    error!(%err, "video player failed, showing blank wallpaper");
                    None
                }
            },
            None => {
                error!("video mode without a media file, showing blank wallpaper");
                None
            }
        },
    };

    let mut controller = EmbedController::new();
    controller.mark_attached();
    let mut instance = Some(instance);

    event_loop.run(move |event, _target, control_flow| {
        *control_flow = ControlFlow::Wait;
        match event {
            Event::UserEvent(command) => match command {
                EngineCommand::Pause => {
                    if let Some(transition) = controller.manual_pause() {
                        apply_transition(&mut content, transition, surface_handle, desktop);
                    }
                }
                EngineCommand::Resume => {
                    if let Some(transition) = controller.manual_resume() {
                        apply_transition(&mut content, transition, surface_handle, desktop);
                    }
                }
                EngineCommand::PollTick => {
                    let foreground = livewall_desktop::win::foreground_snapshot();
                    let verdict = classify(foreground.as_ref(), surface_handle, desktop);
                    if let Some(transition) = controller.on_poll(verdict) {
                        apply_transition(&mut content, transition, surface_handle, desktop);
                    }
                }
                EngineCommand::Reload => {
                    info!("reload requested, restarting engine");
                    flags.request_restart();
                    *control_flow = ControlFlow::Exit;
                }
                EngineCommand::Quit => {
                    info!("quit requested");
                    *control_flow = ControlFlow::Exit;
                }
            },
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                window_id,
                ..
            } if window_id == window.id() => {
                *control_flow = ControlFlow::Exit;
            }
            Event::LoopDestroyed => {
                if let Some(source) = content.as_mut() {
                    source.stop();
                }
                server.shutdown();
                drop(push_handle.take());
                // Release the instance mutex before any replacement spawns.
                drop(instance.take());
                exit_or_restart(&flags, 0);
            }
            _ => {}
        }
    });
}

#[cfg(windows)]
fn apply_transition(
    content: &mut Option<livewall_content::ContentSource>,
    transition: livewall_desktop::Transition,
    surface_handle: isize,
    desktop: livewall_desktop::Rect,
) {
    use livewall_desktop::Transition;
    use tracing::warn;

    match transition {
        Transition::Pause => {
            if let Some(source) = content.as_mut() {
                source.pause();
            }
        }
        Transition::Resume => {
            // The shell can recreate its wallpaper host while we idle; a
            // resume re-asserts the embedding before playback continues.
            if let Err(err) = livewall_desktop::win::attach(surface_handle, desktop) {
                warn!(%err, "re-attach on resume failed");
            }
            if let Some(source) = content.as_mut() {
                source.resume();
            }
        }
    }
}

#[cfg(not(windows))]
pub fn run() {
    init_logging();
    info!(
        default_ws_port = DEFAULT_WS_PORT,
        "livewall engine only embeds into the Windows desktop; nothing to do on this platform"
    );
}
