//! monovox: OSC-controlled monophonic synthesizer.
//!
//! Listens for control datagrams on UDP port 4000, renders 128-frame
//! blocks at 44.1 kHz to the default output device, and pushes status to
//! the display collaborator on UDP port 4001.

mod audio;

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use color_eyre::eyre::WrapErr;

use monovox::engine::status::{StatusSink, UdpDisplay};
use monovox::engine::{with_retries, Engine, FailureClass, UdpControl};
use monovox::{CONTROL_PORT, DISPLAY_PORT};

/// Delay between resource-acquisition attempts.
const RETRY_DELAY: Duration = Duration::from_millis(500);
/// Pause before a fatal exit so the last diagnostic stays readable.
const FATAL_LINGER: Duration = Duration::from_secs(5);

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    // The termination flag is the only state visible outside the render
    // thread: both signals and the /quit command clear it, the loop polls
    // it once per block.
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::Relaxed))
            .wrap_err("failed to install termination handler")?;
    }

    // Display socket first, so every later diagnostic has somewhere to go.
    let mut display = match UdpDisplay::connect(DISPLAY_PORT) {
        Ok(display) => display,
        Err(err) => {
            log::error!("display socket setup failed: {err}");
            process::exit(FailureClass::ControlSocket.exit_code());
        }
    };
    display.set_line(2, "Init sockets...");

    let mut control = match with_retries("bind", RETRY_DELAY, &mut display, || {
        UdpControl::bind(CONTROL_PORT)
    }) {
        Ok(control) => control,
        Err(err) => {
            log::error!("control socket bind failed: {err}");
            fatal(&mut display, "bind:4000 FAIL", FailureClass::ControlSocket);
        }
    };
    display.set_line(2, "Sockets OK");

    let mut output = match with_retries("audio", RETRY_DELAY, &mut display, audio::open) {
        Ok(output) => output,
        Err(err) => {
            log::error!("audio device setup failed: {err}");
            fatal(&mut display, "audio FAIL", err.class());
        }
    };
    display.set_line(2, "Audio ready");

    let mut engine = Engine::new(running);
    display.set_led(engine.waveform().color());

    log::info!("listening on :{CONTROL_PORT}, display on :{DISPLAY_PORT}");

    match engine.run(&mut control, &mut output.queue, &mut display) {
        Ok(()) => {
            log::info!("clean shutdown");
            Ok(())
        }
        Err(class) => {
            // The loop already posted its diagnostic; leave it up briefly.
            thread::sleep(FATAL_LINGER);
            process::exit(class.exit_code());
        }
    }
}

fn fatal(display: &mut UdpDisplay, message: &str, class: FailureClass) -> ! {
    display.set_line(2, message);
    thread::sleep(FATAL_LINGER);
    process::exit(class.exit_code());
}
