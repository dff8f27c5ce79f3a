use clap::Subcommand;
use focuspace_core::error::ValidationError;
use focuspace_core::{ambience, durations, ProfileStore, SqliteProfileStore};

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Print saved preferences as JSON
    Get {
        #[arg(long)]
        user: String,
    },
    /// Save the duration preset
    SetDuration {
        #[arg(long)]
        user: String,
        /// Preset id (see `focuspace presets`)
        id: String,
    },
    /// Save the background music track
    SetTrack {
        #[arg(long)]
        user: String,
        /// Track id (see `focuspace tracks`)
        id: String,
    },
    /// Save the background image
    SetBackground {
        #[arg(long)]
        user: String,
        url: String,
    },
    /// Save the visual effect
    SetEffect {
        #[arg(long)]
        user: String,
        /// Effect id (see `focuspace effects`)
        id: String,
    },
}

pub fn run(action: PrefsAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteProfileStore::open()?;

    match action {
        PrefsAction::Get { user } => {
            let snapshot = store.load(&user)?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            return Ok(());
        }
        PrefsAction::SetDuration { user, id } => {
            if durations::find(&id).is_none() {
                return Err(ValidationError::UnknownPreset(id).into());
            }
            store.set_duration(&user, &id)?;
        }
        PrefsAction::SetTrack { user, id } => {
            if ambience::find_track(&id).is_none() {
                return Err(ValidationError::UnknownTrack(id).into());
            }
            store.set_music_track(&user, &id)?;
        }
        PrefsAction::SetBackground { user, url } => {
            if url.trim().is_empty() {
                return Err(ValidationError::EmptyBackground.into());
            }
            store.set_background(&user, url.trim())?;
        }
        PrefsAction::SetEffect { user, id } => {
            if ambience::find_effect(&id).is_none() {
                return Err(ValidationError::UnknownEffect(id).into());
            }
            store.set_visual_effect(&user, &id)?;
        }
    }
    println!("ok");
    Ok(())
}
