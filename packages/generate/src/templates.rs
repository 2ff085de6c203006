//! Free-text descriptions for maintenance requests.
//!
//! Each issue type has its own pool of report phrasings. A season-specific
//! remark is sometimes appended so monsoon tickets read differently from
//! winter ones.

use rand::Rng;
use rand::seq::SliceRandom as _;
use streetlights_entity_models::{IssueType, Season};

const BULB_FAILURE: &[&str] = &[
    "Light not working at all. Bulb appears completely dead. Residents complaining about dark street.",
    "Bulb flickering on and off throughout the night. Very annoying for nearby houses.",
    "LED bulb burnt out. Black marks visible on the glass. Needs immediate replacement.",
    "Light dims and then goes out after 30 minutes. Suspect thermal issue with bulb.",
    "Bulb making buzzing noise before dying. Now completely dark.",
    "Street light not turning on at dusk. Bulb may have failed.",
    "Light very dim, barely visible. Bulb near end of life.",
    "Bulb exploded during thunderstorm. Glass shards on ground. Safety hazard.",
    "Light turns on but immediately shuts off. Faulty bulb suspected.",
    "Old sodium vapor bulb flickering orange. Needs LED upgrade.",
    "Multiple residents reported this light stopped working last week.",
    "Light was working yesterday but found dead this morning.",
    "Bulb glowing very faint red color. Clearly malfunctioning.",
    "New bulb installed last month already failed. Quality issue?",
    "Light flickers when it gets cold at night. Thermal bulb problem.",
];

const WIRING: &[&str] = &[
    "Exposed wires visible near the pole base. Dangerous situation, needs urgent attention.",
    "Sparking observed from junction box during rain. Fire hazard!",
    "Underground cable damaged by road construction work. Light out.",
    "Loose connection causing intermittent power. Light goes on/off randomly.",
    "Burnt smell coming from electrical panel. Wiring overheated.",
    "Water ingress in wire conduit. Corrosion visible on connections.",
    "Rodent damage to wiring insulation. Exposed copper visible.",
    "Old wiring needs complete replacement. Frequent tripping issues.",
    "Short circuit occurred. Fuse blown multiple times this month.",
    "Cable joint failed after heavy rain. Connection box flooded.",
    "Electrical arcing sound heard from pole. Very concerning.",
    "Power cable cut during excavation work nearby.",
    "Junction box door missing. Wires exposed to weather.",
    "Timer circuit malfunction causing erratic on/off behavior.",
    "Ground fault detected. Light keeps tripping breaker.",
];

const POLE_DAMAGE: &[&str] = &[
    "Pole leaning dangerously after vehicle collision. Immediate attention needed!",
    "Rust and corrosion at pole base. Structural integrity compromised.",
    "Concrete pole cracked from ground level. May collapse soon.",
    "Pole hit by truck. Bent at 45 degree angle. Traffic hazard.",
    "Termite damage in wooden pole. Needs replacement.",
    "Storm damage - pole snapped in half. Wires hanging low.",
    "Vandalism - someone tried to cut the pole with saw.",
    "Foundation eroded by water drainage. Pole unstable.",
    "Paint peeling badly. Pole surface corroding underneath.",
    "Pole arm bracket broken. Light fixture hanging loose.",
    "Vehicle accident damaged pole yesterday night.",
    "Old wooden pole rotting from inside. Very weak.",
    "Metal pole rusted through at weld joint.",
    "Pole foundation undermined by nearby construction.",
    "Kids climbing pole caused bracket damage.",
];

const POWER_SUPPLY: &[&str] = &[
    "No power reaching the light. Upstream supply issue suspected.",
    "Voltage fluctuation damaging bulbs frequently. Need stabilizer.",
    "Power outage in area affecting multiple lights.",
    "Transformer overloaded. Lights dimming during peak hours.",
    "Circuit breaker keeps tripping. Overload condition.",
    "Low voltage supply causing dim lights. BESCOM issue.",
    "Phase imbalance affecting light performance.",
    "Power theft nearby might be causing voltage drop.",
    "Feeder cable fault. Whole street section dark.",
    "Electricity meter showing abnormal readings.",
    "Power supply interrupted after storm. Not restored yet.",
    "Main switch damaged by water seepage.",
    "Fuse burnt out at distribution panel.",
    "Underground power cable fault somewhere in section.",
    "BESCOM maintenance affected street lighting circuit.",
];

const SENSOR_FAILURE: &[&str] = &[
    "Photo sensor not working. Light stays on during daytime.",
    "Motion sensor stuck. Light never turns on anymore.",
    "Timer malfunction. Lights coming on at wrong times.",
    "Dusk sensor damaged by birds. Needs replacement.",
    "Smart controller not responding to commands.",
    "Ambient light sensor gives false readings. Light behavior erratic.",
    "PIR sensor broken. No motion detection happening.",
    "Rain sensor triggered false alarm. Light turned off.",
    "Temperature sensor faulty. Light overheating protection not working.",
    "Wireless controller lost connectivity. Cannot manage remotely.",
    "Sensor covered by tree leaves. Light thinks its daytime.",
    "Light stays on 24 hours. Automatic shutoff not working.",
    "Sensor lens cracked. Reading incorrect light levels.",
    "Smart meter communication failure. Usage data not updating.",
    "Controller firmware glitch. Light randomly cycles on/off.",
];

const MONSOON_REMARKS: &[&str] = &[
    " Heavy rain last night may have caused this.",
    " Waterlogging in area affecting electrical systems.",
    " Lightning strike nearby during storm.",
    " Flooding damaged underground components.",
    " Continuous rain for 3 days affecting many lights.",
    "",
];

const SUMMER_REMARKS: &[&str] = &[
    " Extreme heat may have caused overheating.",
    " Temperature was 42°C yesterday.",
    " Heat wave conditions affecting equipment.",
    " Thermal stress from high temperatures.",
    "",
    "",
];

const WINTER_REMARKS: &[&str] = &[
    " Cold weather affecting component performance.",
    " Morning fog and moisture accumulation.",
    " Dew condensation inside fixture.",
    "",
    "",
    "",
];

/// Report phrasings for one issue type.
#[must_use]
pub const fn templates_for(issue: IssueType) -> &'static [&'static str] {
    match issue {
        IssueType::BulbFailure => BULB_FAILURE,
        IssueType::Wiring => WIRING,
        IssueType::PoleDamage => POLE_DAMAGE,
        IssueType::PowerSupply => POWER_SUPPLY,
        IssueType::SensorFailure => SENSOR_FAILURE,
    }
}

const fn remarks_for(season: Season) -> &'static [&'static str] {
    match season {
        Season::Monsoon => MONSOON_REMARKS,
        Season::Summer => SUMMER_REMARKS,
        Season::Winter => WINTER_REMARKS,
    }
}

/// Total number of distinct report phrasings across all issue types.
#[must_use]
pub fn template_count() -> usize {
    IssueType::all().iter().map(|t| templates_for(*t).len()).sum()
}

/// Builds a description for a ticket of type `issue` reported in `season`.
pub fn describe<R: Rng + ?Sized>(rng: &mut R, issue: IssueType, season: Season) -> String {
    let base = templates_for(issue)
        .choose(rng)
        .copied()
        .unwrap_or("Fault reported.");
    let remark = remarks_for(season).choose(rng).copied().unwrap_or("");
    format!("{base}{remark}")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::SeedableRng as _;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn has_at_least_75_distinct_templates() {
        let all: BTreeSet<&str> = IssueType::all()
            .iter()
            .flat_map(|t| templates_for(*t).iter().copied())
            .collect();
        assert!(template_count() >= 75);
        assert_eq!(all.len(), template_count());
    }

    #[test]
    fn descriptions_come_from_the_issue_pool() {
        let mut rng = StdRng::seed_from_u64(8);
        for issue in IssueType::all() {
            for season in Season::all() {
                let text = describe(&mut rng, *issue, *season);
                assert!(text.ends_with(['.', '!', '?']), "{text}");
                assert!(
                    templates_for(*issue).iter().any(|t| text.starts_with(t)),
                    "{text} not from {issue}"
                );
            }
        }
    }
}
