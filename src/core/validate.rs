//! Pre-run checks: unique unit names and acyclic open dependencies.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::warn;

use crate::config::CycleCheck;

use super::error::SchedulerError;
use super::pool::Pool;

/// Run every pre-run check over `pools`.
pub fn validate<'a, I>(pools: I, mode: CycleCheck) -> Result<(), SchedulerError>
where
    I: IntoIterator<Item = &'a Pool> + Clone,
{
    check_unique_names(pools.clone())?;
    for pool in pools {
        warn_unresolved(pool);
        match mode {
            CycleCheck::Full => check_cycles(pool)?,
            CycleCheck::Reciprocal => check_reciprocal(pool)?,
        }
    }
    Ok(())
}

/// Fail if any unit name appears more than once across `pools`.
///
/// The error lists every duplicated name once, sorted.
pub fn check_unique_names<'a, I>(pools: I) -> Result<(), SchedulerError>
where
    I: IntoIterator<Item = &'a Pool>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for pool in pools {
        for unit in pool.units() {
            *counts.entry(unit.name()).or_default() += 1;
        }
    }
    let duplicates: Vec<String> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(name, _)| name.to_string())
        .collect();
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(SchedulerError::DuplicateNames(duplicates))
    }
}

/// Fail if two units list each other as open dependencies.
pub fn check_reciprocal(pool: &Pool) -> Result<(), SchedulerError> {
    for unit in pool.units() {
        for dependency in pool.open_dependencies(unit) {
            let Some(target) = pool.unit(dependency) else {
                continue;
            };
            if target.dependencies().contains(unit.name()) {
                return Err(SchedulerError::CircularDependency(vec![
                    unit.name().to_string(),
                    target.name().to_string(),
                    unit.name().to_string(),
                ]));
            }
        }
    }
    Ok(())
}

/// Fail if the open dependency edges of `pool` contain any cycle.
pub fn check_cycles(pool: &Pool) -> Result<(), SchedulerError> {
    let edges: HashMap<&str, Vec<&str>> = pool
        .units()
        .iter()
        .map(|unit| (unit.name(), pool.open_dependencies(unit)))
        .collect();

    let mut done: HashSet<&str> = HashSet::new();
    for unit in pool.units() {
        let mut path = Vec::new();
        if let Some(cycle) = visit(unit.name(), &edges, &mut path, &mut done) {
            return Err(SchedulerError::CircularDependency(cycle));
        }
    }
    Ok(())
}

fn visit<'a>(
    node: &'a str,
    edges: &HashMap<&'a str, Vec<&'a str>>,
    path: &mut Vec<&'a str>,
    done: &mut HashSet<&'a str>,
) -> Option<Vec<String>> {
    if done.contains(node) {
        return None;
    }
    if let Some(start) = path.iter().position(|n| *n == node) {
        let mut cycle: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
        cycle.push(node.to_string());
        return Some(cycle);
    }
    path.push(node);
    for &next in edges.get(node).into_iter().flatten() {
        if let Some(cycle) = visit(next, edges, path, done) {
            return Some(cycle);
        }
    }
    path.pop();
    done.insert(node);
    None
}

/// Log dependencies that name no unit in the same pool.
fn warn_unresolved(pool: &Pool) {
    for unit in pool.units() {
        for dependency in unit.dependencies() {
            if pool.unit(dependency).is_none() {
                warn!(
                    pool = pool.name(),
                    worker = unit.name(),
                    dependency = dependency.as_str(),
                    "dependency not found in pool; ignoring"
                );
            }
        }
    }
}
