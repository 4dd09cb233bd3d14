/*
  Copyright 2017 Takashi Ogura

  Licensed under the Apache License, Version 2.0 (the "License");
  you may not use this file except in compliance with the License.
  You may obtain a copy of the License at

      http://www.apache.org/licenses/LICENSE-2.0

  Unless required by applicable law or agreed to in writing, software
  distributed under the License is distributed on an "AS IS" BASIS,
  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
  See the License for the specific language governing permissions and
  limitations under the License.
*/

//! Dual-tree RRT-connect over the constrained space, used as the default
//! search algorithm. One tree is rooted at every start configuration, the
//! other at every goal-region configuration; both grow toward states drawn
//! from the constrained sampler until they touch.

use crate::search::{SearchAlgorithm, SearchProblem, SolvedPath};
use crate::state_space::ConstrainedState;
use kdtree::distance::squared_euclidean;
use kdtree::KdTree;
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
enum ExtendStatus {
    Reached(usize),
    Advanced(usize),
    Trapped,
}

/// Node that contains a flattened state and its parent link. Roots (one per
/// start or goal configuration) have no parent.
#[derive(Debug, Clone)]
struct Node {
    parent_index: Option<usize>,
    data: Vec<f64>,
}

#[derive(Debug)]
struct Tree {
    kdtree: KdTree<f64, usize, Vec<f64>>,
    vertices: Vec<Node>,
    name: &'static str,
}

impl Tree {
    fn new(name: &'static str, dim: usize) -> Self {
        Tree {
            kdtree: KdTree::new(dim),
            vertices: Vec::new(),
            name,
        }
    }

    fn add_root(&mut self, q: &[f64]) {
        let index = self.vertices.len();
        self.kdtree.add(q.to_vec(), index).unwrap();
        self.vertices.push(Node {
            parent_index: None,
            data: q.to_vec(),
        });
    }

    fn add_vertex(&mut self, q: &[f64], parent_index: usize) -> usize {
        let index = self.vertices.len();
        self.kdtree.add(q.to_vec(), index).unwrap();
        self.vertices.push(Node {
            parent_index: Some(parent_index),
            data: q.to_vec(),
        });
        index
    }

    fn get_nearest_index(&self, q: &[f64]) -> usize {
        *self.kdtree.nearest(q, 1, &squared_euclidean).unwrap()[0].1
    }

    fn extend<FF>(&mut self, q_target: &[f64], extend_length: f64, is_free: &mut FF) -> ExtendStatus
    where
        FF: FnMut(&[f64]) -> bool,
    {
        let nearest_index = self.get_nearest_index(q_target);
        let nearest_q = &self.vertices[nearest_index].data;
        let diff_dist = squared_euclidean(q_target, nearest_q).sqrt();
        let q_new = if diff_dist < extend_length {
            q_target.to_vec()
        } else {
            nearest_q
                .iter()
                .zip(q_target)
                .map(|(near, target)| *near + (*target - *near) * extend_length / diff_dist)
                .collect::<Vec<_>>()
        };
        if is_free(&q_new) {
            let new_index = self.add_vertex(&q_new, nearest_index);
            if squared_euclidean(&q_new, q_target).sqrt() < extend_length {
                return ExtendStatus::Reached(new_index);
            }
            return ExtendStatus::Advanced(new_index);
        }
        ExtendStatus::Trapped
    }

    fn connect<FF>(&mut self, q_target: &[f64], extend_length: f64, is_free: &mut FF) -> ExtendStatus
    where
        FF: FnMut(&[f64]) -> bool,
    {
        loop {
            match self.extend(q_target, extend_length, is_free) {
                ExtendStatus::Trapped => return ExtendStatus::Trapped,
                ExtendStatus::Reached(index) => return ExtendStatus::Reached(index),
                ExtendStatus::Advanced(_) => {}
            };
        }
    }

    /// Ancestors of `index` up to (and including) its root, nearest first.
    /// The vertex itself is not included.
    fn get_until_root(&self, index: usize) -> Vec<Vec<f64>> {
        let mut nodes = Vec::new();
        let mut cur_index = index;
        while let Some(parent_index) = self.vertices[cur_index].parent_index {
            cur_index = parent_index;
            nodes.push(self.vertices[cur_index].data.clone())
        }
        nodes
    }
}

/// The default search algorithm: dual-tree RRT-connect with a wall-clock
/// budget and shortcut simplification.
#[derive(Debug)]
pub struct RrtConnect {
    /// Extension step in the flattened state space (radians dominate in
    /// practice). Also the resolution trajectory extraction densifies to.
    pub step_size: f64,

    /// Safety cap on search iterations; the wall-clock budget is normally
    /// the binding limit.
    pub max_try: usize,

    /// Print a timing summary after each query.
    pub debug: bool,
}

impl Default for RrtConnect {
    fn default() -> Self {
        Self {
            step_size: 3_f64.to_radians(),
            max_try: 10_000,
            debug: false,
        }
    }
}

impl RrtConnect {
    /// Walk the straight segment between two states at the native resolution
    /// and check every interior point.
    fn segment_valid(
        &self,
        problem: &SearchProblem,
        from: &ConstrainedState,
        to: &ConstrainedState,
    ) -> bool {
        let distance = problem.space.distance(from, to);
        let steps = (distance / self.step_size).ceil() as usize;
        for i in 1..steps {
            let t = i as f64 / steps as f64;
            if !problem.checker.is_valid(&problem.space.interpolate(from, to, t)) {
                return false;
            }
        }
        true
    }
}

impl SearchAlgorithm for RrtConnect {
    fn solve(&self, problem: &SearchProblem, budget: Duration) -> Option<SolvedPath> {
        let started = Instant::now();
        let deadline = started + budget;
        let dim = problem.space.dimension();

        let mut tree_a = Tree::new("start", dim);
        let mut tree_b = Tree::new("goal", dim);

        // Roots that fail validity would only seed unreachable or unusable
        // branches; drop them silently, like any other rejected state.
        for start in &problem.starts {
            if problem.checker.is_valid(start) {
                tree_a.add_root(&start.flatten());
            }
        }
        for goal in problem.goal.states() {
            if problem.checker.is_valid(goal) {
                tree_b.add_root(&goal.flatten());
            }
        }
        debug!(
            starts = tree_a.vertices.len(),
            goals = tree_b.vertices.len(),
            "search trees seeded"
        );
        if tree_a.vertices.is_empty() || tree_b.vertices.is_empty() {
            return None;
        }

        let mut sampler = (problem.sampler_factory)();
        let mut is_free = |flat: &[f64]| problem.checker.is_valid(&ConstrainedState::from_flat(flat));

        let mut solution = None;
        for _ in 0..self.max_try {
            if Instant::now() >= deadline {
                break;
            }
            let q_rand = sampler.sample().flatten();
            match tree_a.extend(&q_rand, self.step_size, &mut is_free) {
                ExtendStatus::Trapped => {}
                ExtendStatus::Advanced(new_index) | ExtendStatus::Reached(new_index) => {
                    let q_new = tree_a.vertices[new_index].data.clone();
                    if let ExtendStatus::Reached(reach_index) =
                        tree_b.connect(&q_new, self.step_size, &mut is_free)
                    {
                        let mut states = tree_a.get_until_root(new_index);
                        states.reverse();
                        states.push(q_new);
                        states.append(&mut tree_b.get_until_root(reach_index));
                        if tree_a.name == "goal" {
                            states.reverse();
                        }
                        solution = Some(SolvedPath {
                            states: states
                                .iter()
                                .map(|flat| ConstrainedState::from_flat(flat))
                                .collect(),
                        });
                        break;
                    }
                }
            }
            std::mem::swap(&mut tree_a, &mut tree_b);
        }

        if self.debug {
            println!(
                "RRT-connect took {:?}, {} + {} vertices, solved: {}",
                started.elapsed(),
                tree_a.vertices.len(),
                tree_b.vertices.len(),
                solution.is_some()
            );
        }
        solution
    }

    fn simplify(&self, problem: &SearchProblem, path: &mut SolvedPath, budget: Duration) {
        let deadline = Instant::now() + budget;
        let mut rng = rand::thread_rng();
        let mut misses = 0;
        while path.states.len() > 2 && misses < 100 {
            if Instant::now() >= deadline {
                break;
            }
            // Random shortcut attempt: bridge two non-adjacent states when
            // the straight segment between them revalidates.
            let i = rng.gen_range(0..path.states.len() - 2);
            let j = rng.gen_range(i + 2..path.states.len());
            if self.segment_valid(problem, &path.states[i], &path.states[j]) {
                path.states.drain(i + 1..j);
                misses = 0;
            } else {
                misses += 1;
            }
        }
    }

    fn resolution(&self) -> f64 {
        self.step_size
    }
}
