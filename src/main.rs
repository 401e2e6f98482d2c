use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::{error, info};
use spin_sleep::LoopHelper;

use chip8_vm::config::{check_rate, Config, DEFAULT_INSTRUCTIONS_PER_SECOND};
use chip8_vm::display::{Framebuffer, MonoTermDisplay, SCREEN_HEIGHT};
use chip8_vm::input::{Keypad, TerminalKeyboard, KEY_HOLD_DURATION};
use chip8_vm::sound::{Mute, SimpleBeep, Sound};
use chip8_vm::Chip8Interpreter;

/// how often the screen is redrawn and the keyboard read
const FRAME_RATE: f64 = 60.0;

/// Run a CHIP-8 program in the terminal. Esc quits.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// program image to load at 0x200
    rom: PathBuf,

    /// instructions per second
    #[arg(long, default_value_t = DEFAULT_INSTRUCTIONS_PER_SECOND, value_parser = parse_rate)]
    ips: f64,

    /// how long a key counts as held after its last key event, in milliseconds
    #[arg(long, default_value_t = KEY_HOLD_DURATION.as_millis() as u64)]
    key_hold_ms: u64,

    /// no beeping
    #[arg(long)]
    mute: bool,

    /// seed the random number generator, for repeatable runs
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_rate(arg: &str) -> Result<f64, String> {
    let rate: f64 = arg.parse().map_err(|e| format!("{}", e))?;
    check_rate(rate).map_err(|e| e.to_string())?;
    Ok(rate)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();
    let config = Config::new(args.ips, args.seed)?;
    let rom = fs::read(&args.rom)?;
    info!("loading {}", args.rom.display());

    let framebuffer = Framebuffer::new();
    let keypad = Keypad::with_hold(Duration::from_millis(args.key_hold_ms));
    let sound: Box<dyn Sound + Send> = if args.mute {
        Box::new(Mute::new())
    } else {
        Box::new(SimpleBeep::new())
    };

    // the interpreter runs on its own thread; it reports back once the
    // program is loaded and then only if something fatal happens
    let (loaded_tx, loaded_rx) = mpsc::channel();
    let engine = {
        let mut display = framebuffer.clone();
        let mut input = keypad.clone();
        thread::Builder::new()
            .name("interpreter".to_string())
            .spawn(move || {
                let mut interpreter =
                    Chip8Interpreter::new(&mut display, &mut input, sound, config);
                let loaded = interpreter.load_program(&mut rom.as_slice());
                let ok = loaded.is_ok();
                let _ = loaded_tx.send(loaded);
                if ok {
                    interpreter.main_loop()
                } else {
                    Ok(())
                }
            })?
    };
    loaded_rx.recv()??;

    let mut keyboard = TerminalKeyboard::new(keypad.clone())?;
    let mut screen = MonoTermDisplay::new()?;
    let mut loop_helper = LoopHelper::builder().build_with_target_rate(FRAME_RATE);
    let outcome: Result<(), Box<dyn Error>> = loop {
        loop_helper.loop_start();
        if keyboard.read_events()? {
            keypad.cancel();
            break Ok(());
        }
        if engine.is_finished() {
            break match engine.join() {
                Ok(result) => result.map_err(Into::into),
                Err(_) => Err("interpreter thread panicked".into()),
            };
        }
        screen.draw(&framebuffer.snapshot())?;
        loop_helper.loop_sleep();
    };

    // leave raw mode, then shove some junk on stdout to stop the cli messing
    // up the last frame
    drop(keyboard);
    for _ in 0..SCREEN_HEIGHT / 4 {
        println!();
    }

    if let Err(e) = outcome {
        error!("{}", e);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("700"), Ok(700.0));
        assert!(parse_rate("0").is_err());
        assert!(parse_rate("-5").is_err());
        assert!(parse_rate("nan").is_err());
        assert!(parse_rate("inf").is_err());
        assert!(parse_rate("fast").is_err());
    }
}
