use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;

use rm_ink::config::{Cli, Command, Config};
use rm_ink::device::DeviceProfile;
use rm_ink::sink::LogSink;
use rm_ink::{dump, input, ssh, Clock, Error, Pipeline};

const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const EXPIRY_TICK: Duration = Duration::from_millis(50);

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let default_filter = match cli.command {
        Some(Command::Dump { .. }) => "warn",
        _ => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = Config::load(&cli);
    config.validate()?;
    let device = resolve_device(&config)?;

    match cli.command {
        Some(Command::Dump { sensor }) => dump::run_dump(sensor, &config, device),
        Some(Command::Run) | None => run(config, device),
    }
}

fn resolve_device(config: &Config) -> Result<&'static DeviceProfile, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(model) = &config.model {
        return DeviceProfile::from_key(model).ok_or_else(|| format!("Unknown model '{}'", model).into());
    }
    if config.local {
        return DeviceProfile::detect_local();
    }
    let session = ssh::connect_for_detection(config)?;
    DeviceProfile::detect_via_ssh(&session)
}

fn run(config: Config, device: &'static DeviceProfile) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let pipeline = Arc::new(Pipeline::new(config.pipeline(device))?);
    let clock = Clock::start();

    log::info!(
        "rm-ink starting (device={}, source={}, pen={}, touch={}, palm_rejection={})",
        device.name,
        if config.local { "local".to_string() } else { config.host.clone() },
        if config.run_pen() { config.pen_device(device) } else { "off" },
        if config.run_touch() { config.touch_device(device) } else { "off" },
        if config.palm_rejection() {
            format!("on (grace {}ms)", config.palm_grace_ms)
        } else {
            "off".into()
        }
    );

    let dispatcher = pipeline.dispatcher();
    let worker = thread::spawn(move || {
        let mut sink = LogSink::new();
        dispatcher.run(&mut sink);
        log::info!("{} panel updates presented", sink.presented());
    });

    if let Err(e) = pipeline.clear_screen(clock.now()) {
        log::warn!("Initial clear not queued: {}", e);
    }

    {
        let pipeline = Arc::clone(&pipeline);
        thread::spawn(move || loop {
            thread::sleep(EXPIRY_TICK);
            if let Err(Error::Closed) = input::settle(&pipeline, pipeline.expire(clock.now())) {
                break;
            }
        });
    }

    let config = Arc::new(config);
    let mut handles = Vec::new();

    if config.run_pen() {
        let (config, pipeline) = (Arc::clone(&config), Arc::clone(&pipeline));
        handles.push(thread::spawn(move || loop {
            log::info!("[pen] thread starting…");
            if let Err(e) = input::run_pen(&config, device, &pipeline, &clock) {
                log::error!("[pen] {}", e);
            }
            log::warn!("[pen] disconnected, reconnecting in 2s…");
            thread::sleep(RECONNECT_DELAY);
        }));
    }

    if config.run_touch() {
        let (config, pipeline) = (Arc::clone(&config), Arc::clone(&pipeline));
        handles.push(thread::spawn(move || loop {
            log::info!("[touch] thread starting…");
            if let Err(e) = input::run_touch(&config, device, &pipeline, &clock) {
                log::error!("[touch] {}", e);
            }
            log::warn!("[touch] disconnected, reconnecting in 2s…");
            thread::sleep(RECONNECT_DELAY);
        }));
    }

    for handle in handles {
        if handle.join().is_err() {
            log::error!("Input thread panicked");
        }
    }

    pipeline.close();
    if worker.join().is_err() {
        log::error!("Refresh dispatcher panicked");
    }
    Ok(())
}
