//! Skill dependency ordering.
//!
//! Skills name their prerequisites through `dependencies_name`, forming a
//! directed graph (dependent -> prerequisite). The depth of a skill is the
//! length of the longest prerequisite chain ending at it:
//!
//! - no dependencies: depth 1
//! - otherwise: 1 + the maximum depth of its dependencies
//!
//! The traversal is iterative, with an explicit stack of in-progress skills,
//! so deep chains cannot overflow the call stack and the active path is
//! available when a cycle is found.

use std::collections::HashMap;

use crate::config::CyclePolicy;
use crate::error::GraphError;
use crate::model::Skill;

/// Depth given to the repeated skill under [`CyclePolicy::Sentinel`].
pub const SENTINEL_DEPTH: u32 = 0;

/// Computes dependency depths over one language's skill set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkillGraphOrderer {
    policy: CyclePolicy,
}

impl SkillGraphOrderer {
    pub fn new(policy: CyclePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> CyclePolicy {
        self.policy
    }

    /// Assign `depth` to every skill in `skills`.
    ///
    /// Skills that already carry a depth are treated as resolved and are not
    /// recomputed. On error nothing is written back.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownDependency`] if a dependency name matches no
    /// skill. [`GraphError::CycleDetected`] on a cycle when the policy is
    /// [`CyclePolicy::Abort`]; the path runs from the top-level skill being
    /// resolved down to the repeated name.
    pub fn compute_depths(&self, skills: &mut [Skill]) -> Result<(), GraphError> {
        let deps = resolve_dependencies(skills)?;
        let n = skills.len();

        let mut depths: Vec<Option<u32>> = skills.iter().map(|s| s.depth).collect();
        let mut on_path = vec![false; n];

        for root in 0..n {
            if depths[root].is_some() {
                continue;
            }

            // (skill index, position of the next dependency to visit)
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            on_path[root] = true;

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;

                if let Some(&dep) = deps[node].get(frame.1) {
                    frame.1 += 1;
                    if depths[dep].is_some() {
                        continue;
                    }
                    if on_path[dep] {
                        match self.policy {
                            CyclePolicy::Abort => {
                                let mut path: Vec<String> = stack
                                    .iter()
                                    .map(|&(i, _)| skills[i].name.clone())
                                    .collect();
                                path.push(skills[dep].name.clone());
                                return Err(GraphError::CycleDetected { path });
                            }
                            CyclePolicy::Sentinel => {
                                tracing::warn!(
                                    skill = %skills[dep].name,
                                    depth = SENTINEL_DEPTH,
                                    "dependency cycle, assigning sentinel depth"
                                );
                                depths[dep] = Some(SENTINEL_DEPTH);
                            }
                        }
                        continue;
                    }
                    on_path[dep] = true;
                    stack.push((dep, 0));
                } else {
                    stack.pop();
                    on_path[node] = false;
                    if depths[node].is_none() {
                        let depth = deps[node]
                            .iter()
                            .map(|&d| depths[d].unwrap_or(SENTINEL_DEPTH))
                            .max()
                            .map_or(1, |deepest| deepest + 1);
                        depths[node] = Some(depth);
                    }
                }
            }
        }

        for (skill, depth) in skills.iter_mut().zip(depths) {
            skill.depth = depth;
        }
        tracing::debug!(skills = n, "computed skill depths");
        Ok(())
    }

    /// Learned skills sorted by ascending depth.
    ///
    /// Works on a copy of `skills`. Ties keep their input order.
    pub fn learned_in_order(&self, skills: &[Skill]) -> Result<Vec<Skill>, GraphError> {
        let mut ordered = skills.to_vec();
        self.compute_depths(&mut ordered)?;
        ordered.sort_by_key(|s| s.depth.unwrap_or(SENTINEL_DEPTH));
        ordered.retain(|s| s.learned);
        Ok(ordered)
    }
}

/// Map each skill's dependency names to indices into `skills`.
///
/// If two skills share a name the first one wins.
fn resolve_dependencies(skills: &[Skill]) -> Result<Vec<Vec<usize>>, GraphError> {
    let mut by_name: HashMap<&str, usize> = HashMap::with_capacity(skills.len());
    for (i, skill) in skills.iter().enumerate() {
        by_name.entry(skill.name.as_str()).or_insert(i);
    }

    skills
        .iter()
        .map(|skill| {
            skill
                .dependencies_name
                .iter()
                .map(|name| {
                    by_name
                        .get(name.as_str())
                        .copied()
                        .ok_or_else(|| GraphError::UnknownDependency {
                            skill: skill.name.clone(),
                            name: name.clone(),
                        })
                })
                .collect()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
