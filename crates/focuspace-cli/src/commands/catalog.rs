use focuspace_core::{ambience, durations};

pub fn presets() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&durations::catalog())?);
    Ok(())
}

pub fn tracks() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&ambience::tracks())?);
    Ok(())
}

pub fn effects() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(ambience::effects())?);
    Ok(())
}
