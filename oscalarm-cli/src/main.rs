//! Headless shell for the alarm engine: wires the UDP link to the engine,
//! applies command-line edits, then tails the runtime state to stdout.

use std::fs::File;
use std::io;
use std::time::Duration;

use crossbeam_channel::{unbounded, RecvTimeoutError};

use oscalarm_core::config::Store;
use oscalarm_core::{Engine, EngineConfig, EngineEvent, EngineHandle};
use oscalarm_net::OscLink;
use oscalarm_types::{AlarmSettings, RuntimeSnapshot};

const DEFAULT_LISTEN: &str = "127.0.0.1:9001";
const DEFAULT_PEER: &str = "127.0.0.1:9000";

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("oscalarm")
        .join("oscalarm.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = File::create(&log_path).unwrap_or_else(|_| {
        File::create("/tmp/oscalarm.log").expect("Cannot create log file")
    });

    WriteLogger::init(log_level, Config::default(), log_file)
        .expect("Failed to initialize logger");

    log::info!("oscalarm starting (log level: {:?})", log_level);
}

fn usage() -> ! {
    eprintln!(
        "usage: oscalarm [options]\n\
         \n\
         options:\n\
           --listen ADDR    bind address for inbound OSC (default {DEFAULT_LISTEN})\n\
           --peer ADDR      peer address for outbound OSC (default {DEFAULT_PEER})\n\
           --set HH:MM      set the alarm time before starting\n\
           --enable         arm the alarm before starting\n\
           --disable        disarm the alarm before starting\n\
           --json           emit state as JSON lines instead of text\n\
           -v, --verbose    debug logging\n\
           -h, --help       this message"
    );
    std::process::exit(2);
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

fn parse_time(s: &str) -> Option<(u32, u32)> {
    let (h, m) = s.split_once(':')?;
    Some((h.trim().parse().ok()?, m.trim().parse().ok()?))
}

fn main() -> io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        usage();
    }
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let listen = flag_value(&args, "--listen").unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    let peer = flag_value(&args, "--peer").unwrap_or_else(|| DEFAULT_PEER.to_string());
    let json = args.iter().any(|a| a == "--json");

    let set_time = match flag_value(&args, "--set") {
        Some(s) => match parse_time(&s) {
            Some(hm) => Some(hm),
            None => {
                eprintln!("invalid --set value '{}', expected HH:MM", s);
                usage();
            }
        },
        None => None,
    };
    let enable = args.iter().any(|a| a == "--enable");
    let disable = args.iter().any(|a| a == "--disable");
    if enable && disable {
        eprintln!("--enable and --disable are mutually exclusive");
        usage();
    }

    let store = Store::at_default_path();
    let (settings, policy) = store.load();

    let (inbound_tx, inbound_rx) = unbounded();
    let link = OscLink::open(&listen, &peer, inbound_tx)?;
    log::info!("listening on {}, peer {}", link.recv_addr(), peer);

    let engine = Engine::spawn(settings, policy, store, link, inbound_rx, EngineConfig::default());
    let handle = engine.handle();

    if set_time.is_some() || enable || disable {
        let mut edited = handle.settings();
        if let Some((hour, minute)) = set_time {
            edited = AlarmSettings { hour, minute, ..edited };
        }
        if enable {
            edited.enabled = true;
        }
        if disable {
            edited.enabled = false;
        }
        if let Err(e) = handle.set_settings(edited) {
            eprintln!("could not apply alarm settings: {}", e);
            std::process::exit(2);
        }
    }

    run(handle, json)
}

/// Tail the engine: wake on change events, poll at least once a second,
/// and print whenever the visible state moved.
fn run(handle: EngineHandle, json: bool) -> io::Result<()> {
    let events = handle.subscribe();
    let mut last_line = String::new();
    loop {
        match events.recv_timeout(Duration::from_secs(1)) {
            Ok(EngineEvent::PersistenceFailed(e)) => {
                eprintln!("warning: settings not saved: {}", e);
            }
            Ok(_) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let snap = handle.snapshot();
        let settings = handle.settings();
        let line = if json {
            serde_json::to_string(&snap)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        } else {
            status_line(&settings, &snap)
        };
        if line != last_line {
            println!("{}", line);
            last_line = line;
        }
    }
    Ok(())
}

fn status_line(settings: &AlarmSettings, snap: &RuntimeSnapshot) -> String {
    let mut line = format!(
        "{:02}:{:02} {} | {} | {}",
        settings.hour,
        settings.minute,
        if settings.enabled { "on" } else { "off" },
        snap.phase,
        snap.connection,
    );
    if let Some(at) = snap.next_fire_at {
        line.push_str(&format!(" | next {}", at.format("%Y-%m-%d %H:%M")));
    }
    if snap.snooze_count > 0 {
        line.push_str(&format!(" | snoozes {}", snap.snooze_count));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_times() {
        assert_eq!(parse_time("7:30"), Some((7, 30)));
        assert_eq!(parse_time("07:05"), Some((7, 5)));
        assert_eq!(parse_time("730"), None);
        assert_eq!(parse_time("a:b"), None);
    }

    #[test]
    fn flag_values_follow_their_flag() {
        let args: Vec<String> = ["oscalarm", "--peer", "10.0.0.2:9000"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(flag_value(&args, "--peer"), Some("10.0.0.2:9000".into()));
        assert_eq!(flag_value(&args, "--listen"), None);
    }

    #[test]
    fn status_line_shows_the_essentials() {
        let settings = AlarmSettings {
            hour: 7,
            minute: 0,
            enabled: true,
        };
        let snap = RuntimeSnapshot::at_rest();
        let line = status_line(&settings, &snap);
        assert!(line.starts_with("07:00 on | off | disconnected"));
    }
}
