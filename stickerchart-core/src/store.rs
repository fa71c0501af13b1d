//! Application state, actions, and the reducer.
//!
//! All state changes go through [`reduce`], a pure function from the
//! current state and an [`Action`] to the next state plus the persistence
//! work it implies, described as [`Effect`]s. [`Store`] is the single owner
//! of the state and publishes every new state to subscribers.
//!
//! Actions carry the ids and timestamps they need, so reducing the same
//! action twice gives the same result. The `Action::*` constructors fill
//! those in.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::watch;

use crate::config::StickerConfig;
use crate::error::{Error, Result};
use crate::types::{Chart, ChartColor, Person, QuickAction, StickerEvent, Tab};

/// Everything the app shows outside of sticker history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub people: Vec<Person>,
    pub charts: Vec<Chart>,
    /// Stickers per chart id
    pub sticker_counts: HashMap<String, usize>,
    pub selected_person_id: Option<String>,
    pub selected_tab: Tab,
}

impl AppState {
    pub fn chart(&self, chart_id: &str) -> Option<&Chart> {
        self.charts.iter().find(|c| c.id == chart_id)
    }

    pub fn person(&self, person_id: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.id == person_id)
    }

    /// Charts for the selected person, or all charts when nobody is selected
    pub fn visible_charts(&self) -> Vec<&Chart> {
        match &self.selected_person_id {
            Some(person_id) => self
                .charts
                .iter()
                .filter(|c| c.person_id.as_deref() == Some(person_id.as_str()))
                .collect(),
            None => self.charts.iter().collect(),
        }
    }

    pub fn sticker_count(&self, chart_id: &str) -> usize {
        self.sticker_counts.get(chart_id).copied().unwrap_or(0)
    }

    fn chart_mut(&mut self, chart_id: &str) -> Result<&mut Chart> {
        self.charts
            .iter_mut()
            .find(|c| c.id == chart_id)
            .ok_or_else(|| Error::ChartNotFound(chart_id.to_string()))
    }
}

/// Something the user did.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddPerson {
        id: String,
        name: String,
        at: DateTime<Utc>,
    },
    RenamePerson {
        person_id: String,
        name: String,
    },
    SelectPerson {
        person_id: Option<String>,
    },
    CreateChart {
        id: String,
        name: String,
        color: ChartColor,
        person_id: Option<String>,
        at: DateTime<Utc>,
    },
    RenameChart {
        chart_id: String,
        name: String,
    },
    SetChartColor {
        chart_id: String,
        color: ChartColor,
    },
    DeleteChart {
        chart_id: String,
    },
    AddQuickAction {
        id: String,
        chart_id: String,
        name: String,
        sticker_count: u32,
        image_name: String,
    },
    RemoveQuickAction {
        chart_id: String,
        quick_action_id: String,
    },
    AddSticker {
        id: String,
        chart_id: String,
        image_name: String,
        at: DateTime<Utc>,
    },
    /// Award a quick action's stickers; ids are `{batch_id}-{n}` with `n`
    /// zero-padded so they sort in award order
    ApplyQuickAction {
        chart_id: String,
        quick_action_id: String,
        batch_id: String,
        at: DateTime<Utc>,
    },
    RemoveSticker {
        chart_id: String,
        sticker_id: String,
    },
    SelectTab(Tab),
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Action {
    pub fn add_person(name: impl Into<String>) -> Self {
        Action::AddPerson {
            id: new_id(),
            name: name.into(),
            at: Utc::now(),
        }
    }

    pub fn create_chart(
        name: impl Into<String>,
        color: ChartColor,
        person_id: Option<String>,
    ) -> Self {
        Action::CreateChart {
            id: new_id(),
            name: name.into(),
            color,
            person_id,
            at: Utc::now(),
        }
    }

    pub fn add_quick_action(
        chart_id: impl Into<String>,
        name: impl Into<String>,
        sticker_count: u32,
        image_name: impl Into<String>,
    ) -> Self {
        Action::AddQuickAction {
            id: new_id(),
            chart_id: chart_id.into(),
            name: name.into(),
            sticker_count,
            image_name: image_name.into(),
        }
    }

    pub fn add_sticker(chart_id: impl Into<String>, image_name: impl Into<String>) -> Self {
        Action::AddSticker {
            id: new_id(),
            chart_id: chart_id.into(),
            image_name: image_name.into(),
            at: Utc::now(),
        }
    }

    pub fn apply_quick_action(
        chart_id: impl Into<String>,
        quick_action_id: impl Into<String>,
    ) -> Self {
        Action::ApplyQuickAction {
            chart_id: chart_id.into(),
            quick_action_id: quick_action_id.into(),
            batch_id: new_id(),
            at: Utc::now(),
        }
    }
}

/// Persistence work produced by the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SavePerson(Person),
    /// Save the chart row; quick actions are saved separately
    SaveChart(Chart),
    DeleteChart {
        chart_id: String,
    },
    SaveQuickAction {
        quick_action: QuickAction,
        position: usize,
    },
    DeleteQuickAction {
        quick_action_id: String,
    },
    /// Insert stickers and record their local write time for sync
    InsertStickers {
        stickers: Vec<StickerEvent>,
        recorded_at: DateTime<Utc>,
    },
    DeleteSticker {
        chart_id: String,
        sticker_id: String,
    },
    SaveSelection {
        person_id: Option<String>,
        tab: Tab,
    },
}

fn validated_name(name: &str, what: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{} name must not be empty", what)));
    }
    Ok(trimmed.to_string())
}

fn validated_image(image_name: &str) -> Result<String> {
    validated_name(image_name, "sticker image")
}

/// Compute the next state for `action`.
///
/// On error the caller's state is untouched and no effects are produced.
pub fn reduce(
    state: &AppState,
    action: Action,
    config: &StickerConfig,
) -> Result<(AppState, Vec<Effect>)> {
    let mut next = state.clone();
    let effects = match action {
        Action::AddPerson { id, name, at } => {
            let person = Person {
                id,
                name: validated_name(&name, "person")?,
                created_at: at,
            };
            next.people.push(person.clone());
            vec![Effect::SavePerson(person)]
        }

        Action::RenamePerson { person_id, name } => {
            let name = validated_name(&name, "person")?;
            let person = next
                .people
                .iter_mut()
                .find(|p| p.id == person_id)
                .ok_or_else(|| Error::PersonNotFound(person_id.clone()))?;
            person.name = name;
            vec![Effect::SavePerson(person.clone())]
        }

        Action::SelectPerson { person_id } => {
            if let Some(id) = &person_id {
                if next.person(id).is_none() {
                    return Err(Error::PersonNotFound(id.clone()));
                }
            }
            next.selected_person_id = person_id.clone();
            vec![Effect::SaveSelection {
                person_id,
                tab: next.selected_tab,
            }]
        }

        Action::CreateChart {
            id,
            name,
            color,
            person_id,
            at,
        } => {
            if let Some(pid) = &person_id {
                if next.person(pid).is_none() {
                    return Err(Error::PersonNotFound(pid.clone()));
                }
            }
            let chart = Chart {
                id,
                person_id,
                name: validated_name(&name, "chart")?,
                color,
                created_at: at,
                quick_actions: Vec::new(),
            };
            next.sticker_counts.insert(chart.id.clone(), 0);
            next.charts.push(chart.clone());
            vec![Effect::SaveChart(chart)]
        }

        Action::RenameChart { chart_id, name } => {
            let name = validated_name(&name, "chart")?;
            let chart = next.chart_mut(&chart_id)?;
            chart.name = name;
            vec![Effect::SaveChart(chart.clone())]
        }

        Action::SetChartColor { chart_id, color } => {
            let chart = next.chart_mut(&chart_id)?;
            chart.color = color;
            vec![Effect::SaveChart(chart.clone())]
        }

        Action::DeleteChart { chart_id } => {
            if next.chart(&chart_id).is_none() {
                return Err(Error::ChartNotFound(chart_id));
            }
            next.charts.retain(|c| c.id != chart_id);
            next.sticker_counts.remove(&chart_id);
            vec![Effect::DeleteChart { chart_id }]
        }

        Action::AddQuickAction {
            id,
            chart_id,
            name,
            sticker_count,
            image_name,
        } => {
            let max = config.max_quick_action_count;
            if sticker_count == 0 || sticker_count > max {
                return Err(Error::Validation(format!(
                    "quick action sticker count must be between 1 and {}",
                    max
                )));
            }
            let quick_action = QuickAction {
                id,
                chart_id: chart_id.clone(),
                name: validated_name(&name, "quick action")?,
                sticker_count,
                image_name: validated_image(&image_name)?,
            };
            let chart = next.chart_mut(&chart_id)?;
            chart.quick_actions.push(quick_action.clone());
            vec![Effect::SaveQuickAction {
                quick_action,
                position: chart.quick_actions.len() - 1,
            }]
        }

        Action::RemoveQuickAction {
            chart_id,
            quick_action_id,
        } => {
            let chart = next.chart_mut(&chart_id)?;
            let before = chart.quick_actions.len();
            chart.quick_actions.retain(|qa| qa.id != quick_action_id);
            if chart.quick_actions.len() == before {
                return Err(Error::QuickActionNotFound(quick_action_id));
            }
            vec![Effect::DeleteQuickAction { quick_action_id }]
        }

        Action::AddSticker {
            id,
            chart_id,
            image_name,
            at,
        } => {
            let image_name = validated_image(&image_name)?;
            next.chart_mut(&chart_id)?;
            *next.sticker_counts.entry(chart_id.clone()).or_insert(0) += 1;
            vec![Effect::InsertStickers {
                stickers: vec![StickerEvent::new(id, chart_id, image_name)],
                recorded_at: at,
            }]
        }

        Action::ApplyQuickAction {
            chart_id,
            quick_action_id,
            batch_id,
            at,
        } => {
            let chart = next
                .chart(&chart_id)
                .ok_or_else(|| Error::ChartNotFound(chart_id.clone()))?;
            let quick_action = chart
                .quick_actions
                .iter()
                .find(|qa| qa.id == quick_action_id)
                .ok_or_else(|| Error::QuickActionNotFound(quick_action_id.clone()))?;

            let width = quick_action.sticker_count.to_string().len().max(2);
            let stickers: Vec<StickerEvent> = (0..quick_action.sticker_count)
                .map(|n| {
                    StickerEvent::new(
                        format!("{}-{:0width$}", batch_id, n, width = width),
                        chart_id.clone(),
                        quick_action.image_name.clone(),
                    )
                })
                .collect();
            *next.sticker_counts.entry(chart_id).or_insert(0) += stickers.len();
            vec![Effect::InsertStickers {
                stickers,
                recorded_at: at,
            }]
        }

        Action::RemoveSticker {
            chart_id,
            sticker_id,
        } => {
            next.chart_mut(&chart_id)?;
            let count = next
                .sticker_counts
                .get_mut(&chart_id)
                .filter(|count| **count > 0)
                .ok_or_else(|| Error::StickerNotFound(sticker_id.clone()))?;
            *count -= 1;
            vec![Effect::DeleteSticker {
                chart_id,
                sticker_id,
            }]
        }

        Action::SelectTab(tab) => {
            next.selected_tab = tab;
            vec![Effect::SaveSelection {
                person_id: next.selected_person_id.clone(),
                tab,
            }]
        }
    };

    Ok((next, effects))
}

/// Single owner of [`AppState`].
///
/// Subscribers get every new state through a watch channel; a dispatch that
/// leaves the state equal to the old one does not notify them.
pub struct Store {
    state: AppState,
    config: StickerConfig,
    sender: watch::Sender<AppState>,
}

impl Store {
    pub fn new(state: AppState, config: StickerConfig) -> Self {
        let (sender, _) = watch::channel(state.clone());
        Self {
            state,
            config,
            sender,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Receive every state published after this call
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.sender.subscribe()
    }

    /// Reduce `action`, publish the new state, and return its effects.
    pub fn dispatch(&mut self, action: Action) -> Result<Vec<Effect>> {
        let (next, effects) = reduce(&self.state, action, &self.config)?;
        if next != self.state {
            self.state = next;
            self.sender.send_replace(self.state.clone());
        }
        Ok(effects)
    }
}
