use clockpanel_core::settings::{
    BrightnessPolicy, DisplayLevel, SettingsSnapshot, StatusSnapshot,
};

fn level(level: DisplayLevel) -> String {
    match level {
        DisplayLevel::Off => "off".to_string(),
        DisplayLevel::Level(n) => n.to_string(),
    }
}

pub fn settings(snapshot: &SettingsSnapshot) -> String {
    let brightness = match snapshot.brightness.policy() {
        BrightnessPolicy::Automatic => "auto".to_string(),
        BrightnessPolicy::Manual(l) => level(l),
    };
    let mut out = format!(
        "pane={} override={} brightness={} tz={} ntp={} elev={}m",
        snapshot.pane,
        snapshot.override_pane,
        brightness,
        snapshot.timezone(),
        snapshot.ntp.as_slice().join(","),
        snapshot.elev,
    );
    if let Some(ambient) = &snapshot.ambient {
        out.push_str(&format!(
            " ambient={}",
            if ambient.enabled {
                format!("on(channel {})", ambient.channel_id)
            } else {
                "off".to_string()
            }
        ));
    }
    if let Some(custom) = &snapshot.custom_server {
        out.push_str(&format!(
            " custom_server={}",
            if custom.enabled {
                custom.address.as_str()
            } else {
                "off"
            }
        ));
    }
    out
}

pub fn status(snapshot: &StatusSnapshot) -> String {
    format!(
        "display brightness={} adc={}",
        level(snapshot.level()),
        snapshot.adc
    )
}
