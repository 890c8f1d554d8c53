//! Enumeration types for the Sociogenesis engine.
//!
//! Every "kind" that drives branching behavior is a closed enum so that each
//! subsystem matches exhaustively over it.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Institution kinds
// ---------------------------------------------------------------------------

/// The behavior a totem exerts on agents inside its radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum TotemKind {
    /// Attraction toward the center.
    Bond,
    /// Repulsion away from the center.
    Rift,
    /// Slowly rotating drift, deterministic per totem.
    Oracle,
    /// Passive marker; no force.
    Archive,
}

impl TotemKind {
    /// Every totem kind in declaration order.
    pub const ALL: [Self; 4] = [Self::Bond, Self::Rift, Self::Oracle, Self::Archive];

    /// Upper-case label used in chronicle messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bond => "BOND",
            Self::Rift => "RIFT",
            Self::Oracle => "ORACLE",
            Self::Archive => "ARCHIVE",
        }
    }
}

/// The prohibition a taboo zone enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum TabooKind {
    /// No agent may enter the zone.
    NoEnter,
    /// Agents of the target type may not mingle inside the zone.
    NoMix,
}

impl TabooKind {
    /// Upper-case label used in chronicle messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::NoEnter => "NO_ENTER",
            Self::NoMix => "NO_MIX",
        }
    }
}

/// The periodic behavior a ritual induces around its totem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum RitualKind {
    /// Agents converge on the totem.
    Gather,
    /// Agents circle the totem.
    Procession,
    /// Agents settle near the totem.
    Offering,
}

impl RitualKind {
    /// Upper-case label used in chronicle messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Gather => "GATHER",
            Self::Procession => "PROCESSION",
            Self::Offering => "OFFERING",
        }
    }
}

// ---------------------------------------------------------------------------
// Justice
// ---------------------------------------------------------------------------

/// Lifecycle state of a justice case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum CaseStatus {
    /// The case has been opened and awaits judgment.
    Open,
    /// Judgment was delivered.
    Resolved,
}

/// The judgment delivered when a case resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum CaseResolution {
    /// Retributive banishment from the zone.
    Punish,
    /// Restorative pull toward the nearest totem.
    Restore,
}

impl CaseResolution {
    /// Upper-case label used in chronicle messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Punish => "PUNISH",
            Self::Restore => "RESTORE",
        }
    }
}

/// Policy used to choose a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum JusticeMode {
    /// Retributive when the zone is crowded, restorative otherwise.
    #[default]
    Auto,
    /// Always punish.
    Retributive,
    /// Always restore.
    Restorative,
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// A transient behavioral role an agent can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum RoleKind {
    /// No role.
    #[default]
    Neutral,
    /// Chases an assigned taboo violator.
    Enforcer,
    /// Orbits the nearest taboo at a standoff distance.
    Vigilante,
    /// Advances on the nearest taboo it is not already inside.
    Resister,
}

// ---------------------------------------------------------------------------
// Economy
// ---------------------------------------------------------------------------

/// How the live resource field evolves between harvests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum ResourceMode {
    /// Regenerate toward the static hotspot base.
    #[default]
    Static,
    /// Ease toward a target derived from field samples.
    FieldDerived,
}

// ---------------------------------------------------------------------------
// Chronicle
// ---------------------------------------------------------------------------

/// Category of a chronicle entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum ChronicleKind {
    /// A totem was spawned by pattern detection.
    TotemEmerged,
    /// A taboo was spawned by pattern detection.
    TabooEmerged,
    /// A ritual was spawned by pattern detection.
    RitualEmerged,
    /// A justice case was resolved.
    Judgment,
    /// Many agents converted memes in one tick.
    ConversionWave,
    /// One meme holds a dominating share.
    CultDominance,
    /// Two memes split the population.
    SchismWarning,
    /// A high-prestige agent became the leader.
    LeaderEmerges,
    /// Mean energy stayed low for too long.
    Famine,
    /// The Gini coefficient jumped.
    InequalitySpike,
    /// Territorial control changed hands or share moved sharply.
    TerritoryShift,
    /// An institution was placed manually.
    InstitutionPlaced,
    /// An institution was removed manually.
    InstitutionRemoved,
    /// A preset replaced the institution lists.
    PresetLoaded,
}

impl ChronicleKind {
    /// Icon shown next to the entry by the presentation layer.
    pub const fn icon(self) -> &'static str {
        match self {
            Self::TotemEmerged => "🗿",
            Self::TabooEmerged => "⛔",
            Self::RitualEmerged => "🔥",
            Self::Judgment => "⚖",
            Self::ConversionWave => "🌊",
            Self::CultDominance => "👁",
            Self::SchismWarning => "⚡",
            Self::LeaderEmerges => "👑",
            Self::Famine => "🥀",
            Self::InequalitySpike => "📈",
            Self::TerritoryShift => "🚩",
            Self::InstitutionPlaced => "📌",
            Self::InstitutionRemoved => "✖",
            Self::PresetLoaded => "📜",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_serialize_in_screaming_case() {
        let json = serde_json::to_string(&TabooKind::NoEnter).unwrap_or_default();
        assert_eq!(json, "\"NO_ENTER\"");
        let json = serde_json::to_string(&ChronicleKind::TotemEmerged).unwrap_or_default();
        assert_eq!(json, "\"TOTEM_EMERGED\"");
    }

    #[test]
    fn labels_match_serialized_names() {
        for kind in TotemKind::ALL {
            let json = serde_json::to_string(&kind).unwrap_or_default();
            assert_eq!(json.trim_matches('"'), kind.label());
        }
    }

    #[test]
    fn defaults_are_neutral() {
        assert_eq!(JusticeMode::default(), JusticeMode::Auto);
        assert_eq!(RoleKind::default(), RoleKind::Neutral);
        assert_eq!(ResourceMode::default(), ResourceMode::Static);
    }
}
