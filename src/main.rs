mod config;

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use serde::Deserialize;

use tsc_pad::affine::{self, AffineParameters};
use tsc_pad::calibration::{CalibrationPattern, CalibrationPrompt, CalibrationSession};
use tsc_pad::geometry::{unzip_pairs, CalibrationPair, Point2D};
use tsc_pad::polling::{CancelToken, PollingError};
use tsc_pad::sensor::{SensorError, StreamSensor};
use tsc_pad::{store, CalibrationMatrix, PointerEvent, PointerEventKind, TouchPanel};

use config::{Cli, Command, Config};

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type InputSensor = StreamSensor<Box<dyn Read + Send>>;

// Pointer events buffered between the sampling loop and the printer
const EVENT_QUEUE_DEPTH: usize = 64;
const REOPEN_DELAY: Duration = Duration::from_secs(2);

fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    let filter = if matches!(cli.command, Some(Command::Dump)) { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let config = Config::load(&cli);
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    match &cli.command {
        None | Some(Command::Run) => run(&config),
        Some(Command::Calibrate { pattern }) => calibrate(&config, pattern.unwrap_or(config.pattern)),
        Some(Command::Solve { pairs, save }) => solve(&config, pairs, *save),
        Some(Command::Dump) => dump(&config),
    }
}

fn open_panel(config: &Config) -> io::Result<TouchPanel<InputSensor>> {
    let reader: Box<dyn Read + Send> = match &config.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin()),
    };
    Ok(TouchPanel::new(StreamSensor::new(reader), config.panel_settings()))
}

fn run(config: &Config) -> Result<(), BoxError> {
    log::info!(
        "tsc-pad starting (device={}, input={}, calibration={})",
        config.profile.name,
        config.describe_input(),
        config.calibration_file.display()
    );

    let cancel = CancelToken::new();
    let (mut tx, rx) = mpsc::sync_channel::<PointerEvent>(EVENT_QUEUE_DEPTH);

    let printer_cancel = cancel.clone();
    let printer = thread::spawn(move || {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for event in rx {
            if let Err(e) = writeln!(out, "{}", format_event(&event)).and_then(|_| out.flush()) {
                log::error!("[events] {}", e);
                printer_cancel.cancel();
                break;
            }
        }
    });

    loop {
        log::info!("[sampler] opening {}…", config.describe_input());
        let outcome = open_panel(config).map_err(SensorError::from).and_then(|mut panel| {
            if !panel.try_load_calibration(&config.calibration_file) {
                log::warn!("[sampler] uncalibrated, run `tsc-pad calibrate` first");
            }
            match panel.run(&mut tx, &cancel) {
                Err(PollingError::Sensor(e)) => Err(e),
                _ => Ok(()),
            }
        });

        // Sink closed or cancelled: nothing left to deliver to.
        let Err(e) = outcome else { break };
        log::error!("[sampler] {}", e);
        if config.input.is_none() || cancel.is_cancelled() {
            break;
        }
        log::warn!("[sampler] input lost, reopening in 2s…");
        thread::sleep(REOPEN_DELAY);
    }

    drop(tx);
    if printer.join().is_err() {
        log::error!("[events] printer thread panicked");
    }
    Ok(())
}

fn format_event(event: &PointerEvent) -> String {
    let kind = match event.phase {
        PointerEventKind::Down => "down",
        PointerEventKind::Move => "move",
        PointerEventKind::Up => "up",
    };
    format!(
        "{:<4}  x={:8.2}  y={:8.2}  p={:.3}",
        kind, event.position.x, event.position.y, event.pressure
    )
}

/// Prints calibration targets to the terminal.
struct TerminalPrompt;

impl CalibrationPrompt for TerminalPrompt {
    fn show_target(&mut self, index: usize, total: usize, target: Point2D) {
        eprintln!(
            "[{}/{}] Touch and release at screen ({:.0}, {:.0})",
            index + 1,
            total,
            target.x,
            target.y
        );
    }
}

fn calibrate(config: &Config, pattern: CalibrationPattern) -> Result<(), BoxError> {
    let mut panel = open_panel(config)?;
    let session = CalibrationSession::new(pattern, config.bounds, config.margin, config.capture);

    eprintln!(
        "Calibrating {} with {} points on a {}x{} screen (input {})\n",
        config.profile.name,
        pattern.point_count(),
        config.bounds.width,
        config.bounds.height,
        config.describe_input()
    );
    let params = panel.calibrate(&session, &mut TerminalPrompt, &CancelToken::new())?;
    print_params(&params);

    panel.save_calibration(&config.calibration_file)?;
    Ok(())
}

/// Recorded calibration points, one `[[pair]]` table each.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PairsFile {
    pair: Vec<CalibrationPair>,
}

fn parse_pairs(content: &str) -> Result<Vec<CalibrationPair>, toml::de::Error> {
    let file: PairsFile = toml::from_str(content)?;
    Ok(file.pair)
}

fn solve(config: &Config, path: &Path, save: bool) -> Result<(), BoxError> {
    let content = std::fs::read_to_string(path)?;
    let pairs = parse_pairs(&content)?;
    let (references, measured) = unzip_pairs(&pairs);
    let params = affine::solve(&references, &measured)?;
    log::info!("Solved from {} pairs in {}", pairs.len(), path.display());
    print_params(&params);

    if save {
        store::save(&config.calibration_file, &CalibrationMatrix::new(params, Utc::now()))?;
    }
    Ok(())
}

fn print_params(params: &AffineParameters) {
    println!("x = {:.9} * raw_x + {:.9} * raw_y + {:.6}", params.a, params.b, params.c);
    println!("y = {:.9} * raw_x + {:.9} * raw_y + {:.6}", params.d, params.e, params.f);
    println!("residual = {:.6}", params.residual);
}

fn dump(config: &Config) -> Result<(), BoxError> {
    let mut panel = open_panel(config)?;
    let calibrated = panel.try_load_calibration(&config.calibration_file);
    let calibration = panel.calibration();

    eprintln!(
        "Dumping accepted samples from {} ({}, Ctrl+C to stop):\n",
        config.describe_input(),
        if calibrated { "calibrated" } else { "uncalibrated" }
    );

    let sampler = panel.sampler_mut();
    let mut n = 0u64;
    loop {
        let sample = match sampler.sample() {
            Ok(sample) => sample,
            Err(SensorError::Disconnected) => {
                eprintln!("\nStream closed after {} samples", n);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        n += 1;
        let screen = calibration.load().transform(sample.position());
        println!(
            "{:6}  raw=({:5}, {:5})  p={:4} ({:.3})  screen=({:.1}, {:.1})",
            n,
            sample.x,
            sample.y,
            sample.pressure,
            sampler.pressure(),
            screen.x,
            screen.y
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs(
            r#"
[[pair]]
reference = { x = 50.0, y = 50.0 }
measured = { x = 410.0, y = 380.0 }

[[pair]]
reference = { x = 750.0, y = 50.0 }
measured = { x = 3650.0, y = 395.0 }
"#,
        )
        .unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].measured, Point2D::new(3650.0, 395.0));
        assert!(parse_pairs("[[pair]]\nreference = { x = 1.0, y = 2.0 }\n").is_err());
    }

    #[test]
    fn test_format_event() {
        let event = PointerEvent {
            phase: PointerEventKind::Down,
            position: Point2D::new(12.5, 400.0),
            pressure: 0.25,
        };
        assert_eq!(format_event(&event), "down  x=   12.50  y=  400.00  p=0.250");
    }
}
