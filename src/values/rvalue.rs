//! Common interface over every numeric container.

use crate::values::modifier::AnyMod;

/// Anything that yields a number and accepts named modifiers.
///
/// Mod application funnels through this trait so a stat path can resolve to
/// a plain stat, a formula value or a payload amount without the caller
/// caring which.
pub trait RValue {
    /// Current public value. Always finite.
    fn value(&self) -> f64;

    /// Unmodified base reading.
    fn base(&self) -> f64;

    fn set_base(&mut self, v: f64);

    /// Fold a one-shot adjustment into the base.
    fn apply(&mut self, amt: f64);

    /// Store or overwrite the modifier under its id.
    fn add_mod(&mut self, m: AnyMod);

    /// Drop the modifier stored under `id`; unknown ids are a no-op.
    fn remove_mods(&mut self, id: &str);
}
