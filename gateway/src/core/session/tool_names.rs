//! Display names for agent tools.

use phf::phf_map;

static DISPLAY_NAMES: phf::Map<&'static str, &'static str> = phf_map! {
    "consult_flight_specialist" => "Flight Specialist",
    "check_flight_availability_subagent" => "Flight Specialist",
    "consult_lifestyle_specialist" => "Lifestyle Specialist",
    "search_lifestyle_subagent" => "Lifestyle Specialist",
    "google_search" => "Lifestyle Specialist",
};

/// Human-readable name of a tool. Unknown tools keep their identifier.
pub fn display_name(tool: &str) -> &str {
    DISPLAY_NAMES.get(tool).copied().unwrap_or(tool)
}
