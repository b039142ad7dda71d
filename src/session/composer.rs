//! Outgoing action composition.
//!
//! Turns typed player intent into [`ClientMessage`]s, checking the few
//! preconditions the client can check on its own. Nothing here touches the
//! snapshot: results only ever come back through the dispatcher.
//!
//! Also holds the transient UI selection (chosen action menu, unit, quantity,
//! trade draft). It never feeds back into the snapshot.

use std::fmt;

use super::log::LogCategory;
use super::protocol::{Action, ActionKind, ClientMessage};
use super::room::{BuildingType, ResourceKind, Resources, Room, TechType, UnitType};

/// A frame ready to send plus the local line to log once it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub message: ClientMessage,
    pub echo: Option<(String, LogCategory)>,
}

impl Outgoing {
    fn silent(message: ClientMessage) -> Self {
        Self {
            message,
            echo: None,
        }
    }

    fn action(action: Action, echo: String, category: LogCategory) -> Self {
        Self {
            message: ClientMessage::GameAction { action },
            echo: Some((echo, category)),
        }
    }
}

/// Trade being drafted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TradeDraft {
    pub target: Option<String>,
    pub offer: Resources,
    pub request: Resources,
}

/// Client-side validation failures. Recovered locally, never sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    NoUnitSelected,
    NoTradeTarget,
    EmptyOffer,
    EmptyRequest,
    SelfTarget,
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoUnitSelected => write!(f, "Select a unit type to train"),
            Self::NoTradeTarget => write!(f, "Choose a player to trade with"),
            Self::EmptyOffer => write!(f, "Specify resources to offer"),
            Self::EmptyRequest => write!(f, "Specify resources to request"),
            Self::SelfTarget => write!(f, "You cannot target yourself"),
        }
    }
}

impl std::error::Error for ComposeError {}

/// Builds outgoing messages for one player.
#[derive(Debug, Clone)]
pub struct ActionComposer {
    self_id: String,
    selected_action: Option<ActionKind>,
    selected_unit: Option<UnitType>,
    quantity: u32,
    trade: TradeDraft,
}

impl ActionComposer {
    pub fn new(self_id: impl Into<String>) -> Self {
        Self {
            self_id: self_id.into(),
            selected_action: None,
            selected_unit: None,
            quantity: 1,
            trade: TradeDraft::default(),
        }
    }

    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    // Transient selection

    pub fn select_action(&mut self, kind: Option<ActionKind>) {
        self.selected_action = kind;
    }

    pub fn selected_action(&self) -> Option<ActionKind> {
        self.selected_action
    }

    pub fn select_unit(&mut self, unit: Option<UnitType>) {
        self.selected_unit = unit;
    }

    pub fn selected_unit(&self) -> Option<&UnitType> {
        self.selected_unit.as_ref()
    }

    /// Quantity to train; floors at 1.
    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity.max(1);
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn trade_draft(&self) -> &TradeDraft {
        &self.trade
    }

    pub fn set_trade_target(&mut self, target: Option<String>) {
        self.trade.target = target;
    }

    pub fn set_offer(&mut self, kind: ResourceKind, amount: u64) {
        self.trade.offer.set(kind, amount);
    }

    pub fn set_request(&mut self, kind: ResourceKind, amount: u64) {
        self.trade.request.set(kind, amount);
    }

    /// Drop every transient selection.
    pub fn clear_selection(&mut self) {
        self.selected_action = None;
        self.selected_unit = None;
        self.quantity = 1;
        self.trade = TradeDraft::default();
    }

    /// Players that can be attacked or traded with: everyone but us.
    pub fn targets<'a>(&'a self, room: &'a Room) -> Vec<(&'a str, &'a str)> {
        room.other_players(&self.self_id)
            .map(|p| (p.id.as_str(), p.name.as_str()))
            .collect()
    }

    // Builders

    /// Build; affordability is the server's call.
    pub fn build(&mut self, building_type: BuildingType) -> Outgoing {
        let echo = format!("Building {}...", building_type.display_name());
        self.selected_action = None;
        Outgoing::action(Action::Build { building_type }, echo, LogCategory::Info)
    }

    /// Train the currently selected unit in the selected quantity.
    pub fn train_selected(&mut self) -> Result<Outgoing, ComposeError> {
        let unit = self
            .selected_unit
            .clone()
            .ok_or(ComposeError::NoUnitSelected)?;
        let outgoing = self.train_army(unit, self.quantity);
        self.selected_unit = None;
        self.quantity = 1;
        Ok(outgoing)
    }

    pub fn train_army(&mut self, unit_type: UnitType, quantity: u32) -> Outgoing {
        let quantity = quantity.max(1);
        let echo = format!("Training {} {}...", quantity, unit_type.display_name());
        self.selected_action = None;
        Outgoing::action(
            Action::TrainArmy {
                unit_type,
                quantity,
            },
            echo,
            LogCategory::Info,
        )
    }

    pub fn research(&mut self, tech_type: TechType) -> Outgoing {
        let echo = format!("Researching {}...", tech_type.display_name());
        self.selected_action = None;
        Outgoing::action(Action::Research { tech_type }, echo, LogCategory::Info)
    }

    pub fn attack(
        &mut self,
        target_player_id: &str,
        target_name: Option<&str>,
    ) -> Result<Outgoing, ComposeError> {
        if target_player_id == self.self_id {
            return Err(ComposeError::SelfTarget);
        }

        let echo = format!("Attacking {}...", target_name.unwrap_or("a player"));
        self.selected_action = None;
        Ok(Outgoing::action(
            Action::Attack {
                target_player_id: target_player_id.to_string(),
            },
            echo,
            LogCategory::Battle,
        ))
    }

    /// Trade; both sides need at least one positive amount.
    pub fn trade(
        &mut self,
        target_player_id: Option<&str>,
        offer: Resources,
        request: Resources,
        target_name: Option<&str>,
    ) -> Result<Outgoing, ComposeError> {
        let target = target_player_id.ok_or(ComposeError::NoTradeTarget)?;
        if target == self.self_id {
            return Err(ComposeError::SelfTarget);
        }
        if !offer.has_any() {
            return Err(ComposeError::EmptyOffer);
        }
        if !request.has_any() {
            return Err(ComposeError::EmptyRequest);
        }

        let echo = format!("Trade offer sent to {}", target_name.unwrap_or("a player"));
        self.selected_action = None;
        Ok(Outgoing::action(
            Action::Trade {
                target_player_id: target.to_string(),
                offer,
                request,
            },
            echo,
            LogCategory::Info,
        ))
    }

    /// Submit the current trade draft; the draft is reset on success.
    pub fn submit_trade(&mut self, target_name: Option<&str>) -> Result<Outgoing, ComposeError> {
        let draft = self.trade.clone();
        let outgoing = self.trade(draft.target.as_deref(), draft.offer, draft.request, target_name)?;
        self.trade = TradeDraft::default();
        Ok(outgoing)
    }

    pub fn end_turn(&mut self) -> Outgoing {
        Outgoing::silent(ClientMessage::EndTurn)
    }

    pub fn set_ready(&mut self, ready: bool) -> Outgoing {
        Outgoing::silent(ClientMessage::PlayerReady { ready })
    }
}
