//! Room snapshot model.
//!
//! Mirrors the server's room payload. Every value in here is server-derived;
//! the client only ever replaces a whole [`Room`], it never edits fields.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Maximum players per room.
pub const MAX_ROOM_PLAYERS: usize = 4;

/// Placeholder rendered for values the server withholds.
pub const HIDDEN_VALUE: &str = "???";

/// Coarse lifecycle stage of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Players are joining and toggling ready
    #[default]
    Waiting,
    /// Turns are being played
    Playing,
    /// A winner has been declared
    Finished,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Playing => "playing",
            Self::Finished => "finished",
        }
    }

    /// Check if the room can no longer change phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Phases only move forward: waiting → playing → finished.
    pub fn can_advance_to(&self, next: GamePhase) -> bool {
        self.rank() <= next.rank()
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Waiting => 0,
            Self::Playing => 1,
            Self::Finished => 2,
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four tradeable resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Gold,
    Wood,
    Stone,
    Food,
}

impl ResourceKind {
    /// All kinds in display order.
    pub const ALL: [ResourceKind; 4] = [Self::Gold, Self::Wood, Self::Stone, Self::Food];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Wood => "wood",
            Self::Stone => "stone",
            Self::Food => "food",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Gold => "💰",
            Self::Wood => "🪵",
            Self::Stone => "🪨",
            Self::Food => "🌾",
        }
    }
}

/// A bundle of resource amounts.
///
/// Used for a player's stockpile, battle loot, and both sides of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    pub gold: u64,
    pub wood: u64,
    pub stone: u64,
    pub food: u64,
}

impl Resources {
    pub fn new(gold: u64, wood: u64, stone: u64, food: u64) -> Self {
        Self {
            gold,
            wood,
            stone,
            food,
        }
    }

    pub fn get(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Gold => self.gold,
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
            ResourceKind::Food => self.food,
        }
    }

    pub fn set(&mut self, kind: ResourceKind, amount: u64) {
        match kind {
            ResourceKind::Gold => self.gold = amount,
            ResourceKind::Wood => self.wood = amount,
            ResourceKind::Stone => self.stone = amount,
            ResourceKind::Food => self.food = amount,
        }
    }

    /// Check if at least one amount is strictly positive.
    pub fn has_any(&self) -> bool {
        ResourceKind::ALL.iter().any(|k| self.get(*k) > 0)
    }

    /// Positive amounts only, in display order.
    pub fn nonzero(&self) -> impl Iterator<Item = (ResourceKind, u64)> + '_ {
        ResourceKind::ALL
            .iter()
            .map(|k| (*k, self.get(*k)))
            .filter(|(_, amount)| *amount > 0)
    }

    /// Render positive amounts as `💰50 🌾5`. Empty when nothing is positive.
    pub fn icon_summary(&self) -> String {
        self.nonzero()
            .map(|(kind, amount)| format!("{}{}", kind.icon(), amount))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Unit counts of an army.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Army {
    pub soldiers: u64,
    pub archers: u64,
    pub cavalry: u64,
}

impl Army {
    pub fn get(&self, unit: &UnitType) -> u64 {
        match unit {
            UnitType::Soldiers => self.soldiers,
            UnitType::Archers => self.archers,
            UnitType::Cavalry => self.cavalry,
            UnitType::Other(_) => 0,
        }
    }

    pub fn total(&self) -> u64 {
        self.soldiers
            .saturating_add(self.archers)
            .saturating_add(self.cavalry)
    }

    /// Render positive counts as `⚔️10 🐴3`.
    pub fn icon_summary(&self) -> String {
        UnitType::ALL
            .iter()
            .map(|unit| (unit, self.get(unit)))
            .filter(|(_, count)| *count > 0)
            .map(|(unit, count)| format!("{}{}", unit.icon(), count))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Building kinds. Unknown server keys are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildingType {
    Barracks,
    Farm,
    Mine,
    Wall,
    Other(String),
}

impl BuildingType {
    pub const ALL: [BuildingType; 4] = [Self::Barracks, Self::Farm, Self::Mine, Self::Wall];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Barracks => "barracks",
            Self::Farm => "farm",
            Self::Mine => "mine",
            Self::Wall => "wall",
            Self::Other(key) => key,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Barracks => "Barracks",
            Self::Farm => "Farm",
            Self::Mine => "Mine",
            Self::Wall => "Wall",
            Self::Other(key) => key,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Barracks => "🏰",
            Self::Farm => "🚜",
            Self::Mine => "⛏️",
            Self::Wall => "🧱",
            Self::Other(_) => "🏗️",
        }
    }
}

impl From<String> for BuildingType {
    fn from(key: String) -> Self {
        match key.as_str() {
            "barracks" => Self::Barracks,
            "farm" => Self::Farm,
            "mine" => Self::Mine,
            "wall" => Self::Wall,
            _ => Self::Other(key),
        }
    }
}

impl From<BuildingType> for String {
    fn from(kind: BuildingType) -> Self {
        match kind {
            BuildingType::Other(key) => key,
            known => known.as_str().to_string(),
        }
    }
}

/// Army unit kinds. Unknown server keys are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UnitType {
    Soldiers,
    Archers,
    Cavalry,
    Other(String),
}

impl UnitType {
    pub const ALL: [UnitType; 3] = [Self::Soldiers, Self::Archers, Self::Cavalry];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Soldiers => "soldiers",
            Self::Archers => "archers",
            Self::Cavalry => "cavalry",
            Self::Other(key) => key,
        }
    }

    /// Lowercase plural, as used in log sentences ("trained 5 archers").
    pub fn display_name(&self) -> &str {
        self.as_str()
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Soldiers => "⚔️",
            Self::Archers => "🏹",
            Self::Cavalry => "🐴",
            Self::Other(_) => "🪖",
        }
    }
}

impl From<String> for UnitType {
    fn from(key: String) -> Self {
        match key.as_str() {
            "soldiers" => Self::Soldiers,
            "archers" => Self::Archers,
            "cavalry" => Self::Cavalry,
            _ => Self::Other(key),
        }
    }
}

impl From<UnitType> for String {
    fn from(kind: UnitType) -> Self {
        match kind {
            UnitType::Other(key) => key,
            known => known.as_str().to_string(),
        }
    }
}

/// Technology kinds. Unknown server keys are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TechType {
    MilitaryTactics,
    AdvancedConstruction,
    TradeRoutes,
    Fortification,
    Other(String),
}

impl TechType {
    pub const ALL: [TechType; 4] = [
        Self::MilitaryTactics,
        Self::AdvancedConstruction,
        Self::TradeRoutes,
        Self::Fortification,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::MilitaryTactics => "military_tactics",
            Self::AdvancedConstruction => "advanced_construction",
            Self::TradeRoutes => "trade_routes",
            Self::Fortification => "fortification",
            Self::Other(key) => key,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::MilitaryTactics => "Military Tactics",
            Self::AdvancedConstruction => "Advanced Construction",
            Self::TradeRoutes => "Trade Routes",
            Self::Fortification => "Fortification",
            Self::Other(key) => key,
        }
    }
}

impl From<String> for TechType {
    fn from(key: String) -> Self {
        match key.as_str() {
            "military_tactics" => Self::MilitaryTactics,
            "advanced_construction" => Self::AdvancedConstruction,
            "trade_routes" => Self::TradeRoutes,
            "fortification" => Self::Fortification,
            _ => Self::Other(key),
        }
    }
}

impl From<TechType> for String {
    fn from(kind: TechType) -> Self {
        match kind {
            TechType::Other(key) => key,
            known => known.as_str().to_string(),
        }
    }
}

/// A player as pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,

    pub name: String,

    /// Stockpile. Absent or untrustworthy for anyone but the local player;
    /// read it through [`PlayerView`].
    #[serde(default)]
    pub resources: Option<Resources>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub army: Army,

    #[serde(default, deserialize_with = "null_as_default")]
    pub territories: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub buildings: BTreeMap<BuildingType, u32>,

    /// Each technology appears at most once
    #[serde(default, deserialize_with = "null_as_default")]
    pub technologies: BTreeSet<TechType>,

    #[serde(default)]
    pub victory_points: u32,

    /// Only meaningful while the room is waiting
    #[serde(default)]
    pub is_ready: bool,
}

impl Player {
    pub fn building_count(&self, building: &BuildingType) -> u32 {
        self.buildings.get(building).copied().unwrap_or(0)
    }

    pub fn has_technology(&self, tech: &TechType) -> bool {
        self.technologies.contains(tech)
    }

    /// Render buildings as `🚜2 🏗️1`, skipping zero counts.
    pub fn buildings_summary(&self) -> String {
        self.buildings
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(building, count)| format!("{}{}", building.icon(), count))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Read-only projection of a player from one viewer's perspective.
#[derive(Debug, Clone, Copy)]
pub struct PlayerView<'a> {
    pub player: &'a Player,
    pub is_self: bool,
}

impl<'a> PlayerView<'a> {
    /// The stockpile, only for the viewer's own player.
    pub fn resources(&self) -> Option<&'a Resources> {
        if self.is_self {
            self.player.resources.as_ref()
        } else {
            None
        }
    }

    /// Amount of one resource, or `???` when withheld.
    pub fn resource_label(&self, kind: ResourceKind) -> String {
        match self.resources() {
            Some(resources) => resources.get(kind).to_string(),
            None => HIDDEN_VALUE.to_string(),
        }
    }

    /// Army counts are public.
    pub fn army(&self) -> &'a Army {
        &self.player.army
    }
}

/// Full room snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Public room code
    pub code: String,

    /// Players by id
    #[serde(default, deserialize_with = "null_as_default")]
    pub players: BTreeMap<String, Player>,

    pub game_state: GamePhase,

    /// Player whose turn it is
    #[serde(default)]
    pub current_turn: Option<String>,

    #[serde(default = "first_turn")]
    pub turn_number: u32,

    /// Set once the game is finished
    #[serde(default)]
    pub winner: Option<String>,

    /// Informational; unparseable values decode as `None`
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<NaiveDateTime>,
}

fn first_turn() -> u32 {
    1
}

/// Decode `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept RFC 3339 (offset is converted to UTC) or naive ISO timestamps.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(serde_json::Value::as_str).and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(stamp) => Some(stamp.naive_utc()),
        Err(_) => raw.parse::<NaiveDateTime>().ok(),
    }
}

impl Room {
    /// Get a player.
    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    /// Get a player's display name.
    pub fn player_name(&self, player_id: &str) -> Option<&str> {
        self.player(player_id).map(|p| p.name.as_str())
    }

    /// Check if player is in the room.
    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Player whose turn it is, if any.
    pub fn current_player(&self) -> Option<&Player> {
        self.current_turn.as_deref().and_then(|id| self.player(id))
    }

    /// Declared winner, if any.
    pub fn winner_player(&self) -> Option<&Player> {
        self.winner.as_deref().and_then(|id| self.player(id))
    }

    /// View a player as `viewer_id` sees them.
    pub fn view(&self, player_id: &str, viewer_id: &str) -> Option<PlayerView<'_>> {
        self.player(player_id).map(|player| PlayerView {
            player,
            is_self: player_id == viewer_id,
        })
    }

    /// Every player except `viewer_id`, e.g. attack and trade targets.
    pub fn other_players<'a>(&'a self, viewer_id: &'a str) -> impl Iterator<Item = &'a Player> {
        self.players
            .iter()
            .filter(move |(id, _)| id.as_str() != viewer_id)
            .map(|(_, p)| p)
    }
}
