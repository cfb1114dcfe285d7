//! Liquid Panel CLI
//!
//! Command-line front end for monitoring cooling devices and editing duty
//! profiles.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use liquid_panel::config::{self, AppConfig, PollSettings};
use liquid_panel::cooling::{OnConflict, StepTable, TempSource, target_duty};
use liquid_panel::device::{DeviceHandle, DeviceSet};
use liquid_panel::error::PanelError;
use liquid_panel::logger::init_logging;
use liquid_panel::panel::ControlPanel;
use liquid_panel::protocol::parse_status;
use liquid_panel::storage::{
    FileProfileStore, Profile, ProfileMode, ProfileStore, seed_default_profiles,
};
use liquid_panel::telemetry::TelemetryEvent;
use liquid_panel::utils::parsing::{parse_duty, parse_steps, validate_profile_name};
use liquid_panel::utils::sensors::SystemSensors;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Cooling device monitor and duty profile editor
#[derive(Parser, Debug)]
#[command(name = "liquid-panel-cli")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Device slot to act on (defaults to the configured active device)
    #[arg(short, long, global = true, conflicts_with = "serial")]
    device: Option<usize>,

    /// Select the device by serial number instead of slot
    #[arg(long, global = true)]
    serial: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List connected devices
    List,

    /// Show one status snapshot
    Status,

    /// Poll the device in the background and print updates until Ctrl+C
    Monitor {
        /// Poll interval in seconds (defaults to the configured interval)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// List the device's profiles
    Profiles {
        /// Write the built-in profiles if the device has none
        #[arg(long)]
        seed: bool,
    },

    /// Show a profile
    Show { name: String },

    /// Create a profile
    #[command(group(clap::ArgGroup::new("mode").required(true).args(["fixed", "steps"])))]
    Create {
        name: String,

        /// Fixed duty percentage (0-100)
        #[arg(long)]
        fixed: Option<String>,

        /// Curve steps as TEMP:DUTY pairs, e.g. "30:40,50:80"
        #[arg(long)]
        steps: Option<String>,
    },

    /// Add a step to a curve profile
    AddStep {
        name: String,
        temperature: i16,
        duty: i16,

        /// Replace the duty of an existing step with the same temperature
        #[arg(long)]
        overwrite: bool,
    },

    /// Change the step at INDEX
    UpdateStep {
        name: String,
        index: usize,
        temperature: i16,
        duty: i16,

        /// Replace another step that already uses the temperature
        #[arg(long)]
        overwrite: bool,
    },

    /// Remove the step at INDEX
    RemoveStep { name: String, index: usize },

    /// Delete a profile
    Delete { name: String },

    /// Apply a profile to a device channel
    Apply {
        name: String,

        /// Channel name, e.g. "Fan 1" or "Pump 1"
        #[arg(short, long)]
        channel: String,
    },

    /// Show the duty a profile targets at a temperature
    #[command(group(clap::ArgGroup::new("input").required(true).args(["temp", "source"])))]
    Duty {
        name: String,

        /// Temperature in °C
        #[arg(long)]
        temp: Option<f32>,

        /// Host sensor to read
        #[arg(long, value_parser = ["cpu", "gpu"])]
        source: Option<String>,
    },

    /// Diagnostic: list host temperature sensors
    Sensors,
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = config::load_config().context("Failed to load config")?;
    let devices = DeviceSet::simulated().context("Failed to initialize devices")?;
    let session = devices.clone();

    let result = select_device(&devices, &args, &config)
        .and_then(|device| run_command(args.command, devices, device, config));

    session.close();
    result
}

fn select_device(devices: &DeviceSet, args: &Args, config: &AppConfig) -> Result<usize> {
    match &args.serial {
        Some(serial) => devices
            .find_by_serial(serial)
            .with_context(|| format!("No device with serial '{}'", serial)),
        None => Ok(args.device.unwrap_or(config.active_device)),
    }
}

fn run_command(command: Command, devices: DeviceSet, device: usize, config: AppConfig) -> Result<()> {
    match command {
        Command::List => cmd_list(&devices),
        Command::Status => cmd_status(&devices, device),
        Command::Monitor { interval } => cmd_monitor(devices, device, &config, interval),
        Command::Profiles { seed } => cmd_profiles(&devices, device, &config, seed),
        Command::Show { name } => cmd_show(&devices, device, &config, &name),
        Command::Create { name, fixed, steps } => {
            cmd_create(&devices, device, &config, &name, fixed, steps)
        }
        Command::AddStep {
            name,
            temperature,
            duty,
            overwrite,
        } => cmd_add_step(&devices, device, &config, &name, temperature, duty, overwrite),
        Command::UpdateStep {
            name,
            index,
            temperature,
            duty,
            overwrite,
        } => cmd_update_step(
            &devices,
            device,
            &config,
            &name,
            index,
            temperature,
            duty,
            overwrite,
        ),
        Command::RemoveStep { name, index } => {
            cmd_remove_step(&devices, device, &config, &name, index)
        }
        Command::Delete { name } => cmd_delete(&devices, device, &config, &name),
        Command::Apply { name, channel } => cmd_apply(devices, device, config, &name, &channel),
        Command::Duty { name, temp, source } => {
            cmd_duty(&devices, device, &config, &name, temp, source)
        }
        Command::Sensors => cmd_sensors(),
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn open_device(devices: &DeviceSet, index: usize) -> Result<Arc<dyn DeviceHandle>> {
    devices
        .get(index)
        .with_context(|| format!("Failed to open device {}", index))
}

fn open_store(config: &AppConfig) -> Result<FileProfileStore> {
    let root = config
        .profiles_dir()
        .context("Failed to locate profile directory")?;
    Ok(FileProfileStore::new(root))
}

fn load_profile(
    devices: &DeviceSet,
    index: usize,
    config: &AppConfig,
    name: &str,
) -> Result<(FileProfileStore, Profile)> {
    validate_profile_name(name)?;
    let device = open_device(devices, index)?;
    let store = open_store(config)?;
    let profile = store
        .load(&device.info(), name)
        .with_context(|| format!("Failed to load profile '{}'", name))?;
    Ok((store, profile))
}

fn print_profile(profile: &Profile) {
    println!("📋 {} ({})", profile.name, profile.device_info);
    match &profile.mode {
        ProfileMode::StaticDuty(duty) => println!("   Fixed duty: {}%", duty),
        ProfileMode::Curve(steps) if steps.is_empty() => println!("   Curve: (no steps)"),
        ProfileMode::Curve(steps) => {
            println!("   Curve:");
            print!("{}", steps);
        }
    }
}

// =============================================================================
// Device Commands
// =============================================================================

fn cmd_list(devices: &DeviceSet) -> Result<()> {
    if devices.is_empty() {
        println!("❌ No devices found.");
        return Ok(());
    }

    println!("🔍 Found {} device(s):\n", devices.len());
    for (index, device) in devices.iter().enumerate() {
        let info = device.info();
        println!(
            "  [{}] {} (VID: {:04x}, PID: {:04x}, serial: {})",
            index,
            device.description(),
            info.vendor_id,
            info.product_id,
            device.serial_number().unwrap_or_else(|| "-".into())
        );
    }
    Ok(())
}

fn cmd_status(devices: &DeviceSet, index: usize) -> Result<()> {
    let device = open_device(devices, index)?;
    let lines = device.get_status().context("Failed to read status")?;
    let readouts = parse_status(&lines);

    println!("📊 {}", device.description());
    if readouts.is_empty() {
        println!("   (no components reported)");
    }
    for readout in readouts.values() {
        println!("   {}", readout);
    }
    Ok(())
}

fn cmd_monitor(
    devices: DeviceSet,
    index: usize,
    config: &AppConfig,
    interval: Option<u64>,
) -> Result<()> {
    let description = open_device(&devices, index)?.description();

    let mut settings = config.polling.clone();
    if let Some(secs) = interval {
        settings = PollSettings::new(
            std::time::Duration::from_secs(secs.max(1)),
            settings.discovery_interval(),
        );
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    // Setup Ctrl+C handler
    let token = CancellationToken::new();
    let t = token.clone();
    ctrlc::set_handler(move || t.cancel()).context("Failed to set Ctrl+C handler")?;

    println!("🌡️  Monitoring {} (Ctrl+C to stop)...", description);
    println!(
        "📡 Polling every {}s\n",
        settings.poll_interval().as_secs_f32()
    );

    runtime.block_on(async move {
        let mut panel = ControlPanel::new(devices, settings);
        panel.switch_device(index)?;

        loop {
            let event = tokio::select! {
                _ = token.cancelled() => break,
                event = panel.next_event() => event,
            };

            match event {
                Some(TelemetryEvent::ComponentsDiscovered { readouts, .. }) => {
                    println!("✅ Discovered {} component(s):", readouts.len());
                    for readout in readouts.values() {
                        println!("   {}", readout);
                    }
                }
                Some(TelemetryEvent::ComponentDiscovered { readout, .. }) => {
                    println!("➕ New component: {}", readout.component_name);
                }
                Some(TelemetryEvent::ComponentsUpdated { readouts, .. }) => {
                    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
                    for readout in readouts.values() {
                        println!("   {}", readout);
                    }
                }
                Some(TelemetryEvent::Stopped { .. }) | None => break,
            }
        }

        panel.shutdown().await;
        Ok::<(), PanelError>(())
    })?;

    println!("\n👋 Monitoring stopped.");
    Ok(())
}

// =============================================================================
// Profile Commands
// =============================================================================

fn cmd_profiles(devices: &DeviceSet, index: usize, config: &AppConfig, seed: bool) -> Result<()> {
    let device = open_device(devices, index)?;
    let info = device.info();
    let mut store = open_store(config)?;

    if seed {
        let written =
            seed_default_profiles(&mut store, &info).context("Failed to seed default profiles")?;
        if written > 0 {
            println!("✅ Created {} default profile(s)", written);
        }
    }

    let names = store.list(&info).context("Failed to list profiles")?;
    if names.is_empty() {
        println!("No profiles for {}. Use --seed to create the defaults.", info);
        return Ok(());
    }

    println!("📋 Profiles for {}:", info);
    for name in names {
        let marker = if config.active_profile.as_deref() == Some(name.as_str()) {
            "👉"
        } else {
            "  "
        };
        println!("{} {}", marker, name);
    }
    Ok(())
}

fn cmd_show(devices: &DeviceSet, index: usize, config: &AppConfig, name: &str) -> Result<()> {
    let (_, profile) = load_profile(devices, index, config, name)?;
    print_profile(&profile);
    Ok(())
}

fn cmd_create(
    devices: &DeviceSet,
    index: usize,
    config: &AppConfig,
    name: &str,
    fixed: Option<String>,
    steps: Option<String>,
) -> Result<()> {
    validate_profile_name(name)?;
    let info = open_device(devices, index)?.info();
    let mut store = open_store(config)?;

    if store.exists(&info, name)? {
        bail!("Profile '{}' already exists for {}", name, info);
    }

    let profile = match (fixed, steps) {
        (Some(duty), _) => Profile::fixed(name, &info, parse_duty(&duty)?)?,
        (None, Some(steps)) => {
            let table = StepTable::from_pairs(&parse_steps(&steps)?)?;
            Profile::curve(name, &info, table)
        }
        (None, None) => bail!("Pass --fixed or --steps"),
    };

    store.save(&profile).context("Failed to save profile")?;
    println!("✅ Created profile '{}'", name);
    print_profile(&profile);
    Ok(())
}

fn cmd_add_step(
    devices: &DeviceSet,
    index: usize,
    config: &AppConfig,
    name: &str,
    temperature: i16,
    duty: i16,
    overwrite: bool,
) -> Result<()> {
    let (mut store, mut profile) = load_profile(devices, index, config, name)?;
    let steps = profile.steps_mut()?;

    let row = match steps.add(temperature, duty) {
        Ok(row) => row,
        Err(PanelError::DuplicateTemperature { index: existing, .. }) if overwrite => {
            steps.update(temperature, duty, existing, OnConflict::Overwrite)?
        }
        Err(e @ PanelError::DuplicateTemperature { .. }) => {
            bail!("{}. Re-run with --overwrite to replace it.", e)
        }
        Err(e) => return Err(e.into()),
    };

    store.save(&profile).context("Failed to save profile")?;
    println!("✅ Step {}°C → {}% written at row {}", temperature, duty, row);
    print_profile(&profile);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_update_step(
    devices: &DeviceSet,
    index: usize,
    config: &AppConfig,
    name: &str,
    row: usize,
    temperature: i16,
    duty: i16,
    overwrite: bool,
) -> Result<()> {
    let (mut store, mut profile) = load_profile(devices, index, config, name)?;
    let on_conflict = if overwrite {
        OnConflict::Overwrite
    } else {
        OnConflict::Reject
    };

    let written = match profile
        .steps_mut()?
        .update(temperature, duty, row, on_conflict)
    {
        Ok(written) => written,
        Err(e @ PanelError::DuplicateTemperature { .. }) => {
            bail!("{}. Re-run with --overwrite to replace it.", e)
        }
        Err(e) => return Err(e.into()),
    };

    store.save(&profile).context("Failed to save profile")?;
    println!("✅ Row {} updated, now at row {}", row, written);
    print_profile(&profile);
    Ok(())
}

fn cmd_remove_step(
    devices: &DeviceSet,
    index: usize,
    config: &AppConfig,
    name: &str,
    row: usize,
) -> Result<()> {
    let (mut store, mut profile) = load_profile(devices, index, config, name)?;
    let removed = profile.steps_mut()?.remove(row)?;

    store.save(&profile).context("Failed to save profile")?;
    println!(
        "✅ Removed step {}°C → {}%",
        removed.temperature, removed.duty
    );
    print_profile(&profile);
    Ok(())
}

fn cmd_delete(devices: &DeviceSet, index: usize, config: &AppConfig, name: &str) -> Result<()> {
    validate_profile_name(name)?;
    let info = open_device(devices, index)?.info();
    let mut store = open_store(config)?;

    store
        .delete(&info, name)
        .with_context(|| format!("Failed to delete profile '{}'", name))?;
    println!("🗑️  Deleted profile '{}'", name);
    Ok(())
}

fn cmd_apply(
    devices: DeviceSet,
    index: usize,
    mut config: AppConfig,
    name: &str,
    channel: &str,
) -> Result<()> {
    let (_, profile) = load_profile(&devices, index, &config, name)?;
    let panel = ControlPanel::new(devices, config.polling.clone());

    match panel.apply_profile(index, &profile, channel) {
        Ok(()) => {}
        Err(e @ PanelError::NotSupportedByDevice { .. }) => {
            println!("⚠️  {}", e);
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to apply profile"),
    }

    config.active_device = index;
    config.active_profile = Some(profile.name.clone());
    config::save_config(&config).context("Failed to save config")?;

    println!("✅ Applied '{}' to {}", profile.name, channel);
    Ok(())
}

fn cmd_duty(
    devices: &DeviceSet,
    index: usize,
    config: &AppConfig,
    name: &str,
    temp: Option<f32>,
    source: Option<String>,
) -> Result<()> {
    let (_, profile) = load_profile(devices, index, config, name)?;

    let (temperature, label) = match (temp, source) {
        (Some(t), _) => (t, "given".to_string()),
        (None, Some(source)) => {
            let source = TempSource::from(source.as_str());
            let sensors = SystemSensors::new();
            let t = source
                .read(&sensors)
                .with_context(|| format!("No {} temperature sensor found", source))?;
            (t, source.to_string())
        }
        (None, None) => bail!("Pass --temp or --source"),
    };

    match target_duty(&profile.mode, temperature) {
        Some(duty) => println!(
            "🌡️  {:.1}°C ({}) → {}% with '{}'",
            temperature, label, duty, profile.name
        ),
        None => println!("⚠️  '{}' has no steps", profile.name),
    }
    Ok(())
}

// =============================================================================
// Diagnostics
// =============================================================================

fn cmd_sensors() -> Result<()> {
    println!("🔍 Scanning for system sensors...");
    let sensors = SystemSensors::new();
    let all = sensors.list_all();

    if all.is_empty() {
        println!("❌ No sensors detected. (Are you running as Admin?)");
        return Ok(());
    }

    println!("✅ Found {} sensors:\n", all.len());
    println!("{:<40} | {:<10}", "Label", "Temp");
    println!("{}", "─".repeat(53));
    for sensor in &all {
        let temp = sensor
            .temperature
            .map(|t| format!("{:.1}°C", t))
            .unwrap_or_else(|| "-".to_string());
        println!("{:<40} | {}", sensor.label, temp);
    }
    println!("{}", "─".repeat(53));

    let cpu = TempSource::Cpu.read(&sensors);
    let gpu = TempSource::Gpu.read(&sensors);
    println!(
        "CPU: {} | GPU: {}",
        cpu.map(|t| format!("{:.1}°C", t)).unwrap_or_else(|| "-".into()),
        gpu.map(|t| format!("{:.1}°C", t)).unwrap_or_else(|| "-".into())
    );
    Ok(())
}
