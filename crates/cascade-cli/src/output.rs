//! Output formatting for CLI

use cascade_core::PlayerEvent;
use serde_json::json;

pub fn is_json(format: &str) -> bool {
    format.eq_ignore_ascii_case("json")
}

/// Print one session event in the selected format
pub fn print_event(event: &PlayerEvent, format: &str) {
    if is_json(format) {
        let value = match event {
            PlayerEvent::LoadedMetadata { duration } => {
                json!({"event": "loaded_metadata", "duration": duration})
            }
            PlayerEvent::Progress { percent } => {
                json!({"event": "progress", "percent": percent})
            }
            PlayerEvent::TimeUpdate { position, duration } => {
                json!({"event": "time_update", "position": position, "duration": duration})
            }
            PlayerEvent::Play => json!({"event": "play"}),
            PlayerEvent::Pause => json!({"event": "pause"}),
            PlayerEvent::Ended => json!({"event": "ended"}),
            PlayerEvent::Error => json!({"event": "error"}),
        };
        println!("{}", value);
        return;
    }

    match event {
        PlayerEvent::LoadedMetadata { duration } => match duration {
            Some(d) => println!("loaded metadata (duration {:.1}s)", d),
            None => println!("loaded metadata (live)"),
        },
        PlayerEvent::Progress { percent } => println!("progress {:.1}%", percent),
        PlayerEvent::TimeUpdate { position, duration } => match duration {
            Some(d) => println!("position {:.1}s / {:.1}s", position, d),
            None => println!("position {:.1}s", position),
        },
        PlayerEvent::Play => println!("playing"),
        PlayerEvent::Pause => println!("paused"),
        PlayerEvent::Ended => println!("ended"),
        PlayerEvent::Error => println!("playback failed"),
    }
}
