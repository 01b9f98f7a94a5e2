//! Line-oriented command parsing for the interactive panel.

use clockpanel_core::settings::{NtpServers, OverridePane, Pane, SettingsPatch};

pub const HELP: &str = "\
Commands:
  show                              print the current settings and status
  pane <NAME>                       DATE_TIME | TEMP_HUMI_TIME | PRES_TIME | TIME | IP_ADDR
  override <NAME>                   NORMAL | OFF | TEST
  brightness auto|<0-15>            automatic or fixed display brightness
  tz <area> <city>                  timezone (the clock reboots)
  ntp <host> [host] [host]          up to three NTP servers
  elev <meters>                     elevation used for pressure correction
  ambient on|off [channel] [key]    AmbientData upload
  set <field> <value>               send a raw field
  help                              this text
  quit                              exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    Help,
    Quit,
    Change(SettingsPatch),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("'{value}' is not a valid {what}")]
    InvalidValue { what: &'static str, value: String },

    #[error(transparent)]
    Settings(#[from] clockpanel_core::Error),
}

/// Parse one input line. Blank lines map to `Show`.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(Command::Show);
    };
    let args: Vec<&str> = words.collect();

    let command = match verb.to_ascii_lowercase().as_str() {
        "show" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "pane" => Command::Change(parse_pane(&args)?),
        "override" => Command::Change(parse_override(&args)?),
        "brightness" => Command::Change(parse_brightness(&args)?),
        "tz" => match args.as_slice() {
            [area, city] => Command::Change(SettingsPatch::timezone(*area, *city)),
            _ => return Err(CommandError::Usage("tz <area> <city>")),
        },
        "ntp" => {
            if args.is_empty() {
                return Err(CommandError::Usage("ntp <host> [host] [host]"));
            }
            let servers = NtpServers::new(args.iter().copied())?;
            Command::Change(SettingsPatch::ntp_servers(&servers))
        }
        "elev" => match args.as_slice() {
            [meters] => {
                let meters = meters.parse::<u16>().map_err(|_| invalid("elevation", meters))?;
                Command::Change(SettingsPatch::elevation(meters))
            }
            _ => return Err(CommandError::Usage("elev <meters>")),
        },
        "ambient" => Command::Change(parse_ambient(&args)?),
        "set" => match args.as_slice() {
            [field, value @ ..] if !value.is_empty() => {
                Command::Change(SettingsPatch::new().with(*field, value.join(" ")))
            }
            _ => return Err(CommandError::Usage("set <field> <value>")),
        },
        _ => return Err(CommandError::Unknown(verb.to_string())),
    };
    Ok(command)
}

fn invalid(what: &'static str, value: &str) -> CommandError {
    CommandError::InvalidValue {
        what,
        value: value.to_string(),
    }
}

fn parse_pane(args: &[&str]) -> Result<SettingsPatch, CommandError> {
    let [name] = args else {
        return Err(CommandError::Usage("pane <NAME>"));
    };
    let pane: Pane = name.to_ascii_uppercase().parse().unwrap_or(Pane::Invalid);
    if !pane.is_selectable() {
        return Err(invalid("pane", name));
    }
    Ok(SettingsPatch::pane(pane))
}

fn parse_override(args: &[&str]) -> Result<SettingsPatch, CommandError> {
    let [name] = args else {
        return Err(CommandError::Usage("override <NAME>"));
    };
    let pane = match name.to_ascii_uppercase().as_str() {
        "NORMAL" => OverridePane::Normal,
        "OFF" => OverridePane::Off,
        "TEST" => OverridePane::Test,
        _ => return Err(invalid("override pane", name)),
    };
    Ok(SettingsPatch::override_pane(pane))
}

fn parse_brightness(args: &[&str]) -> Result<SettingsPatch, CommandError> {
    match args {
        [mode] if mode.eq_ignore_ascii_case("auto") => Ok(SettingsPatch::auto_brightness(true)),
        [level] => {
            let level = level
                .parse::<u8>()
                .map_err(|_| invalid("brightness level", level))?;
            Ok(SettingsPatch::manual_brightness(level)?)
        }
        _ => Err(CommandError::Usage("brightness auto|<0-15>")),
    }
}

fn parse_ambient(args: &[&str]) -> Result<SettingsPatch, CommandError> {
    let (toggle, rest) = args
        .split_first()
        .ok_or(CommandError::Usage("ambient on|off [channel] [key]"))?;
    let enabled = match toggle.to_ascii_lowercase().as_str() {
        "on" => true,
        "off" => false,
        _ => return Err(invalid("ambient toggle", toggle)),
    };

    let mut patch = SettingsPatch::new().with("use_ambient", enabled);
    match rest {
        [] => {}
        [channel] => patch = patch.with("ambient_channelid", parse_channel(channel)?),
        [channel, key] => {
            patch = patch
                .with("ambient_channelid", parse_channel(channel)?)
                .with("ambient_writekey", key);
        }
        _ => return Err(CommandError::Usage("ambient on|off [channel] [key]")),
    }
    Ok(patch)
}

fn parse_channel(value: &str) -> Result<u32, CommandError> {
    value.parse().map_err(|_| invalid("ambient channel", value))
}
