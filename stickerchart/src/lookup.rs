//! Resolve command-line references to people and charts.
//!
//! A reference matches by exact id, then by name (case-insensitive), then
//! by unique id prefix.

use anyhow::{bail, Result};
use stickerchart_core::{AppState, Chart, Person};

pub fn chart<'a>(state: &'a AppState, key: &str) -> Result<&'a Chart> {
    find(&state.charts, key, |c| &c.id, |c| &c.name, "chart")
}

pub fn person<'a>(state: &'a AppState, key: &str) -> Result<&'a Person> {
    find(&state.people, key, |p| &p.id, |p| &p.name, "person")
}

fn find<'a, T>(
    items: &'a [T],
    key: &str,
    id: impl Fn(&T) -> &String,
    name: impl Fn(&T) -> &String,
    what: &str,
) -> Result<&'a T> {
    if let Some(item) = items.iter().find(|item| id(*item) == key) {
        return Ok(item);
    }

    let by_name: Vec<&T> = items
        .iter()
        .filter(|item| name(*item).eq_ignore_ascii_case(key))
        .collect();
    match by_name.as_slice() {
        [item] => return Ok(*item),
        [] => {}
        _ => bail!("More than one {} is named '{}'; use its id", what, key),
    }

    let by_prefix: Vec<&T> = items
        .iter()
        .filter(|item| id(*item).starts_with(key))
        .collect();
    match by_prefix.as_slice() {
        [item] => Ok(*item),
        [] => bail!("No {} found matching '{}'", what, key),
        _ => bail!("'{}' matches more than one {} id", key, what),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stickerchart_core::ChartColor;

    fn chart_named(id: &str, name: &str) -> Chart {
        Chart {
            id: id.to_string(),
            person_id: None,
            name: name.to_string(),
            color: ChartColor::Blue,
            created_at: Utc::now(),
            quick_actions: vec![],
        }
    }

    fn state() -> AppState {
        AppState {
            charts: vec![
                chart_named("abc123", "Chores"),
                chart_named("abd456", "Reading"),
                chart_named("ffff", "Twin"),
                chart_named("eeee", "twin"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_lookup_order() {
        let state = state();
        assert_eq!(chart(&state, "abc123").unwrap().name, "Chores");
        assert_eq!(chart(&state, "reading").unwrap().id, "abd456");
        assert_eq!(chart(&state, "abc").unwrap().name, "Chores");
    }

    #[test]
    fn test_ambiguous_references_fail() {
        let state = state();
        assert!(chart(&state, "ab").is_err());
        assert!(chart(&state, "Twin").is_err());
        assert!(chart(&state, "zzz").is_err());
    }
}
