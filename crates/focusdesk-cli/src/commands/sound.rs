use clap::Subcommand;
use std::sync::Arc;

use focusdesk_core::storage::{Database, LocalStore};
use focusdesk_core::SoundPreference;

#[derive(Subcommand, Default)]
pub enum SoundAction {
    /// Print whether the completion chime is on
    #[default]
    Status,
    /// Turn the completion chime on
    On,
    /// Turn the completion chime off
    Off,
    /// Flip the completion chime
    Toggle,
}

pub fn run(action: SoundAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = LocalStore::new(Database::open()?);
    let sound = SoundPreference::load(Arc::new(store));

    let enabled = match action {
        SoundAction::Status => sound.enabled(),
        SoundAction::On => {
            sound.set(true);
            true
        }
        SoundAction::Off => {
            sound.set(false);
            false
        }
        SoundAction::Toggle => sound.toggle(),
    };
    println!("sound: {}", if enabled { "on" } else { "off" });
    Ok(())
}
