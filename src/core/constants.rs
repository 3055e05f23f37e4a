// Tick and timing
pub const TICK_SECONDS: f64 = 0.12;
pub const DOT_PERIOD_SECONDS: f64 = 1.0;

// Roster caps
pub const MAX_COMBATANTS: usize = 8;
pub const OVERCROWD_LIMIT: usize = MAX_COMBATANTS * 2;

// Hit resolution. Dodge chance: dodge / (100 + dodge + tohit), with tohit
// floored so massively negative accuracy cannot flip the ratio.
pub const TOHIT_FLOOR: f64 = -50.0;

// Damage reduction curves: base / (base + x) above zero, mirrored below.
pub const RESIST_CURVE_BASE: f64 = 50.0;
pub const DEFENSE_CURVE_BASE: f64 = 100.0;

// Stat paths consulted by the counter-damage step
pub const STAT_THORNS: &str = "thorns";
pub const STAT_REFLECT: &str = "reflect";

// A resource whose value feeds other mods re-applies its tree when it
// changes; mutually-feeding stats stop at this depth.
pub const MOD_CASCADE_DEPTH: usize = 8;

// Fallback id prefix for dots that arrive without one
pub const DOT_ID_PREFIX: &str = "dot_";
