use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};

use nanoleaf_control_lib::control_interface::Aurora;
use nanoleaf_control_lib::led::led_color::{NamedColor, Rgb};
use nanoleaf_control_lib::util::auth::Auth;
use nanoleaf_control_lib::util::discovery::Discovery;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    handle_cli(cli).await
}

/// This struct defines the command line interface of the application
#[derive(Parser)]
#[clap(
    name = "nanoleaf_control",
    about = "Controls Nanoleaf Aurora light panels",
    version = "0.1.0"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

/// Supported output formats for the `discover` command.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    /// Plain text format.
    Plaintext,
    /// JSON format.
    Json,
    /// YAML format.
    Yaml,
}

/// Subcommands available for the CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Subcommand for operations on a paired Aurora
    #[clap(name = "device-call")]
    DeviceCall {
        /// Sets the IP address of the Aurora
        #[clap(long)]
        ip: String,

        /// Sets the auth token obtained with `pair`
        #[clap(long)]
        token: String,

        #[clap(subcommand)]
        action: DeviceAction,
    },
    /// Searches the local network for Auroras
    #[clap(name = "discover")]
    Discover {
        /// Output format (plaintext, json, yaml)
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Plaintext)]
        output: OutputFormat,

        /// How long to search, in seconds
        #[clap(short = 's', long = "seek", default_value_t = 30.0, value_parser = parse_seek)]
        seek: f64,
    },
    /// Requests a new auth token. Hold the power button for 5-7 seconds first.
    #[clap(name = "pair")]
    Pair {
        /// Sets the IP address of the Aurora
        #[clap(long)]
        ip: String,
    },
}

fn parse_seek(s: &str) -> Result<f64, &'static str> {
    match s.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(seconds),
        _ => Err("seek time must be a non-negative number of seconds"),
    }
}

/// Numeric state values that can be read and written directly.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum CliStateField {
    Brightness,
    Hue,
    Saturation,
    ColorTemperature,
}

/// Effect operations
#[derive(Subcommand)]
pub enum EffectAction {
    /// Lists the effects stored on the device.
    #[clap(name = "list")]
    List,
    /// Prints the active effect.
    #[clap(name = "current")]
    Current,
    /// Activates an effect by name.
    #[clap(name = "select")]
    Select { name: String },
    /// Activates a random effect other than the current one.
    #[clap(name = "random")]
    Random,
}

/// Actions available under the `device-call` subcommand
#[derive(Subcommand)]
pub enum DeviceAction {
    /// Prints the full device info.
    #[clap(name = "info")]
    Info,
    /// Turns the panels on.
    #[clap(name = "on")]
    On,
    /// Turns the panels off.
    #[clap(name = "off")]
    Off,
    /// Flips the power state.
    #[clap(name = "toggle")]
    Toggle,
    /// Reads a state value.
    #[clap(name = "get")]
    Get {
        #[clap(value_enum)]
        field: CliStateField,
    },
    /// Writes a state value.
    #[clap(name = "set")]
    Set {
        #[clap(value_enum)]
        field: CliStateField,
        value: u16,
    },
    /// Prints the current color.
    #[clap(name = "get-color")]
    GetColor,
    /// Sets the color by name or from `RRGGBB` hex.
    #[clap(name = "set-color")]
    SetColor {
        /// The color to display by name
        #[clap(value_enum)]
        color: Option<NamedColor>,

        /// The color as `RRGGBB` or `#RRGGBB`
        #[clap(long)]
        hex: Option<Rgb>,
    },
    /// Prints the panel layout.
    #[clap(name = "layout")]
    Layout,
    /// Subcommand for effects.
    #[clap(name = "effects")]
    Effects {
        #[clap(subcommand)]
        action: EffectAction,
    },
    /// Flashes the panels.
    #[clap(name = "identify")]
    Identify,
    /// Revokes the auth token on the device.
    #[clap(name = "delete-user")]
    DeleteUser,
}

fn required<T>(value: Option<T>, what: &str) -> Result<T> {
    value.ok_or_else(|| anyhow!("Failed to {}", what))
}

async fn get_state(aurora: &Aurora, field: CliStateField) -> Option<u16> {
    match field {
        CliStateField::Brightness => aurora.brightness().await,
        CliStateField::Hue => aurora.hue().await,
        CliStateField::Saturation => aurora.saturation().await,
        CliStateField::ColorTemperature => aurora.color_temperature().await,
    }
}

async fn set_state(aurora: &Aurora, field: CliStateField, value: u16) -> Option<()> {
    match field {
        CliStateField::Brightness => aurora.set_brightness(value).await,
        CliStateField::Hue => aurora.set_hue(value).await,
        CliStateField::Saturation => aurora.set_saturation(value).await,
        CliStateField::ColorTemperature => aurora.set_color_temperature(value).await,
    }
}

async fn handle_effect(aurora: &Aurora, action: EffectAction) -> Result<()> {
    match action {
        EffectAction::List => {
            let effects = required(aurora.effects_list().await, "read the effects list")?;
            for name in effects {
                println!("{}", name);
            }
        }
        EffectAction::Current => {
            let effect = required(aurora.effect().await, "read the active effect")?;
            println!("Current effect: {}", effect);
        }
        EffectAction::Select { name } => {
            required(aurora.set_effect(&name).await, "select the effect")?;
            println!("Effect set to {}", name);
        }
        EffectAction::Random => {
            let name = aurora.effect_random().await?;
            println!("Effect set to {}", name);
        }
    }
    Ok(())
}

async fn handle_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Discover { output, seek } => {
            let devices = Discovery::find_auroras(Duration::from_secs_f64(seek)).await;
            match output {
                OutputFormat::Plaintext => {
                    Discovery::pretty_print_devices(&devices);
                }
                OutputFormat::Json => {
                    let json = serde_json::to_string(&devices)?;
                    println!("{}", json);
                }
                OutputFormat::Yaml => {
                    let yaml = serde_yaml::to_string(&devices)?;
                    println!("{}", yaml);
                }
            }
        }
        Commands::Pair { ip } => {
            let token = required(Auth::pair(&ip).await, "pair with the Aurora")?;
            println!("{}", token);
        }
        Commands::DeviceCall { ip, token, action } => {
            let aurora = Aurora::new(&ip, &token);

            match action {
                DeviceAction::Info => {
                    let info = required(aurora.info().await, "read the device info")?;
                    println!("{}", serde_json::to_string_pretty(&info)?);
                }
                DeviceAction::On => {
                    required(aurora.set_on(true).await, "turn the panels on")?;
                    println!("Panels turned on.");
                }
                DeviceAction::Off => {
                    required(aurora.set_off(true).await, "turn the panels off")?;
                    println!("Panels turned off.");
                }
                DeviceAction::Toggle => {
                    required(aurora.toggle_on().await, "toggle the power")?;
                    println!("Power toggled.");
                }
                DeviceAction::Get { field } => {
                    let value = required(get_state(&aurora, field).await, "read the value")?;
                    println!("{:?}: {}", field, value);
                }
                DeviceAction::Set { field, value } => {
                    required(set_state(&aurora, field, value).await, "write the value")?;
                    println!("{:?} set to {}", field, value);
                }
                DeviceAction::GetColor => {
                    let color = required(aurora.rgb().await, "read the color")?;
                    println!("Current color: {}", color);
                }
                DeviceAction::SetColor { color, hex } => {
                    let color = match (color, hex) {
                        (Some(named), None) => Rgb::from(named),
                        (None, Some(rgb)) => rgb,
                        _ => return Err(anyhow!("Give either a color name or --hex")),
                    };
                    required(aurora.set_rgb(color).await, "set the color")?;
                    println!("Displayed color: {}", color);
                }
                DeviceAction::Layout => {
                    let layout = required(aurora.layout().await, "read the layout")?;
                    println!("Panel layout:\n{:#?}", layout);
                }
                DeviceAction::Effects { action } => {
                    handle_effect(&aurora, action).await?;
                }
                DeviceAction::Identify => {
                    required(aurora.identify().await, "identify the device")?;
                }
                DeviceAction::DeleteUser => {
                    required(aurora.delete_user().await, "delete the auth token")?;
                    println!("Auth token revoked.");
                }
            }
        }
    }

    Ok(())
}
