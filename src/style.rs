//! Lookup tables the map and calendar layers use to draw trip records.

use log::debug;

pub const FALLBACK_MODE_COLOR: &str = "#4c8b9c";
pub const FALLBACK_PURPOSE_ICON: &str = "circle";

/// Line color for a transport mode.
pub fn mode_color(mode: &str) -> &'static str {
    match mode {
        "Hiking" | "Walk" => "#dfba06",
        "LightRail" => "#37ab9e",
        "RegionalTrain" => "#da73a0",
        "Train" => "#cd3841",
        "Ecar" | "Car" => "#d48004",
        "Subway" => "#3d8eb4",
        "Tram" => "#2dabc4",
        "Bicycle" => "#8da433",
        "Airplane" => "#e8b100",
        "Bus" => "#5178ab",
        "Boat" => "#6d6db0",
        "Cablecar" | "KickScooter" => FALLBACK_MODE_COLOR,
        other => {
            debug!("No color for mode {:?}", other);
            FALLBACK_MODE_COLOR
        }
    }
}

/// Marker icon name for a stay purpose.
pub fn purpose_icon(purpose: &str) -> &'static str {
    match purpose {
        "errand" | "shopping" => "shopping-basket",
        "home" => "house",
        "study" => "graduation-cap",
        "wait" => "clock",
        "eat" => "utensils",
        "leisure" => "roller-coaster",
        "sport" => "bike",
        "family_friends" => "heart",
        "work" => "laptop",
        "medical_visit" => "stethoscope",
        "unknown" => FALLBACK_PURPOSE_ICON,
        other => {
            debug!("Unknown purpose {:?}", other);
            FALLBACK_PURPOSE_ICON
        }
    }
}

/// Human readable distance: kilometers with one decimal above 5 km,
/// whole meters otherwise.
pub fn format_distance(meters: i64) -> String {
    if meters > 5000 {
        format!("{:.1}km", meters as f64 / 1000.0)
    } else {
        format!("{}m", meters)
    }
}
